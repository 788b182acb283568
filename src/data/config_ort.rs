//! Options for building ONNX Runtime detectors.

use std::path::{Path, PathBuf};
use anyhow::Result;
use crate::common::{AppConfig, InferenceDevice};

#[derive(Debug, Clone)]
pub struct ConfigOrt {
    pub onnx_path: PathBuf,
    pub device: InferenceDevice,
    /// Square input resolution used when the model declares dynamic spatial axes.
    pub model_size: u32,
    pub iou: f32,
    /// Used when the model carries no `names` metadata.
    pub names: Option<Vec<String>>,
    pub profile: bool,
}

impl Default for ConfigOrt {
    fn default() -> Self {
        Self {
            onnx_path: PathBuf::new(),
            device: InferenceDevice::CPU,
            model_size: 640,
            iou: 0.45,
            names: None,
            profile: false,
        }
    }
}

impl ConfigOrt {
    pub fn new() -> Self {
        Default::default()
    }

    /// Seeds the options shared by every model from the application config.
    pub fn from_app_config(config: &AppConfig) -> Self {
        let options = Self::new()
            .with_device(config.inference_device)
            .with_iou(config.iou_threshold)
            .with_model_size(config.model_size)
            .with_profile(config.profile);
        match &config.class_names {
            Some(names) => options.with_names(names),
            None => options,
        }
    }

    pub fn with_model<P: AsRef<Path>>(mut self, onnx_path: P) -> Result<Self> {
        let onnx_path = onnx_path.as_ref();
        if !onnx_path.is_file() {
            anyhow::bail!("Model file not found: {}", onnx_path.display());
        }
        self.onnx_path = onnx_path.to_path_buf();
        Ok(self)
    }

    pub fn with_device(mut self, device_type: InferenceDevice) -> Self {
        self.device = device_type;
        self
    }

    pub fn with_model_size(mut self, n: u32) -> Self {
        self.model_size = n;
        self
    }

    pub fn with_iou(mut self, x: f32) -> Self {
        self.iou = x;
        self
    }

    pub fn with_names(mut self, names: &[String]) -> Self {
        self.names = Some(names.to_vec());
        self
    }

    pub fn with_profile(mut self, profile: bool) -> Self {
        self.profile = profile;
        self
    }
}
