//! On-disk weight cache. Every request builds a fresh detector from it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use anyhow::{anyhow, Context, Result};
use crate::common::{AppConfig, ModelVariant};
use crate::data::{create_directory, ConfigOrt, FsAccess};
use crate::detection_runners::inference_process::InferenceProcess;
use crate::detection_runners::{init_runtime, OrtYOLO};
use crate::handler::{Detector, ModelProvider};

#[derive(Debug, Clone)]
pub struct ModelStore {
    weights_dir: PathBuf,
    base_url: Option<String>,
    ort_options: ConfigOrt,
}

impl ModelStore {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let weights_dir = match &config.weights_dir {
            Some(dir) => {
                create_directory(dir)?;
                dir.clone()
            }
            None => FsAccess::Cache.path_with_subs(&["models"])?,
        };
        init_runtime(&config.ort_lib_path)?;

        log::info!("Model weights directory: {}", weights_dir.display());
        Ok(Self {
            weights_dir,
            base_url: config.model_base_url.clone(),
            ort_options: ConfigOrt::from_app_config(config),
        })
    }

    /// Cached weights for `variant`, downloading them first on a miss.
    pub fn weights_path(&self, variant: ModelVariant) -> Result<PathBuf> {
        let path = self.weights_dir.join(variant.weights_file_name());
        if path.is_file() {
            log::debug!("Using cached weights {}", path.display());
            return Ok(path);
        }

        let base_url = self.base_url.as_deref().ok_or_else(|| {
            anyhow!(
                "{} is not in {} and no model_base_url is configured",
                variant.weights_file_name(),
                self.weights_dir.display()
            )
        })?;
        download(&weights_url(base_url, variant), &path)?;
        Ok(path)
    }
}

impl ModelProvider for ModelStore {
    fn load(&self, variant: ModelVariant) -> Result<Box<dyn Detector>> {
        let weights = self.weights_path(variant)?;
        let options = self.ort_options.clone().with_model(&weights)?;
        let yolo = OrtYOLO::new(options)
            .with_context(|| format!("Failed to load {variant}"))?;
        Ok(Box::new(yolo))
    }
}

pub fn weights_url(base_url: &str, variant: ModelVariant) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), variant.weights_file_name())
}

/// Downloads to `<path>.part` and renames, so an interrupted transfer never looks cached.
fn download(url: &str, path: &Path) -> Result<()> {
    log::info!("📥 Downloading model from: {url}");

    let partial = path.with_extension("onnx.part");
    let response = ureq::get(url)
        .call()
        .with_context(|| format!("Failed to download {url}"))?;

    let mut reader = response.into_reader();
    let mut file = fs::File::create(&partial)?;
    let copied = io::copy(&mut reader, &mut file);
    drop(file);
    if let Err(e) = copied {
        let _ = fs::remove_file(&partial);
        return Err(e).with_context(|| format!("Interrupted while downloading {url}"));
    }
    fs::rename(&partial, path)?;

    log::info!("Model downloaded to: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &Path, base_url: Option<&str>) -> ModelStore {
        ModelStore {
            weights_dir: dir.to_path_buf(),
            base_url: base_url.map(str::to_string),
            ort_options: ConfigOrt::new(),
        }
    }

    #[test]
    fn weights_url_joins_base_and_file_name() {
        assert_eq!(
            weights_url("http://models.local/yolo/", ModelVariant::YoloV8s),
            "http://models.local/yolo/yolov8s.onnx"
        );
    }

    #[test]
    fn cached_weights_are_returned_without_download() {
        let dir = tempfile::tempdir().unwrap();
        let cached = dir.path().join("yolov8n.onnx");
        fs::write(&cached, b"onnx").unwrap();

        let path = store(dir.path(), None).weights_path(ModelVariant::YoloV8n).unwrap();
        assert_eq!(path, cached);
    }

    #[test]
    fn missing_weights_without_url_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = store(dir.path(), None).weights_path(ModelVariant::YoloV8m).unwrap_err();
        assert!(err.to_string().contains("yolov8m.onnx"));
    }
}
