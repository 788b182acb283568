use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use anyhow::Context;
use serde::Deserialize;
use crate::common::{InferenceDevice, ModelVariant};

/// Runtime settings, loaded from an optional JSON file and then overridden by CLI flags.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub bind: SocketAddr,
    pub ort_lib_path: String,
    pub inference_device: InferenceDevice,
    /// Where downloaded `.onnx` weights are kept. `None` means the user cache dir.
    pub weights_dir: Option<PathBuf>,
    /// Base URL serving `<variant>.onnx`. Without it weights must already be in `weights_dir`.
    pub model_base_url: Option<String>,
    pub font_path: Option<PathBuf>,
    pub default_model: ModelVariant,
    pub conf_threshold: f32,
    pub iou_threshold: f32,
    /// Model input side when the ONNX graph has dynamic spatial axes.
    pub model_size: u32,
    /// Class names for models exported without `names` metadata.
    pub class_names: Option<Vec<String>>,
    /// Logs per-stage session timings at info level.
    pub profile: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8501)),
            ort_lib_path: String::new(),
            inference_device: InferenceDevice::CPU,
            weights_dir: None,
            model_base_url: None,
            font_path: None,
            default_model: ModelVariant::YoloV8n,
            conf_threshold: 0.25,
            iou_threshold: 0.45,
            model_size: 640,
            class_names: None,
            profile: false,
        }
    }
}

impl AppConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AppConfig = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !(0.0..=1.0).contains(&self.conf_threshold) {
            anyhow::bail!("conf_threshold must be within [0, 1], got {}", self.conf_threshold);
        }
        if !(0.0..=1.0).contains(&self.iou_threshold) {
            anyhow::bail!("iou_threshold must be within [0, 1], got {}", self.iou_threshold);
        }
        if self.model_size == 0 || self.model_size % 32 != 0 {
            anyhow::bail!("model_size must be a positive multiple of 32, got {}", self.model_size);
        }
        Ok(())
    }
}

impl fmt::Display for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bind Address: {}\n\
        OnnxRuntime Lib Path: {}\n\
        Inference Device: {}\n\
        Weights Dir: {}\n\
        Default Model: {}\n\
        Detection Threshold: {}\n\
        NMS IoU Threshold: {}\n\
        Profiling: {}",
               self.bind,
               if self.ort_lib_path.is_empty() { "<ORT_DYLIB_PATH>" } else { self.ort_lib_path.as_str() },
               self.inference_device,
               self.weights_dir.as_ref().map(|p| p.display().to_string()).unwrap_or("<cache dir>".to_string()),
               self.default_model,
               self.conf_threshold,
               self.iou_threshold,
               self.profile)
    }
}
