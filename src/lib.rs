mod utils;
pub mod annotate;
pub mod common;
pub mod data;
pub mod detection_runners;
pub mod handler;
pub mod model_store;
pub mod web;

use std::sync::Arc;
use image::DynamicImage;
use crate::annotate::Annotator;
use crate::common::{AppConfig, Detection, ModelVariant};
use crate::data::ConfigOrt;
use crate::detection_runners::inference_process::InferenceProcess;
use crate::detection_runners::OrtYOLO;
use crate::model_store::ModelStore;

pub use crate::utils::COCO_NAMES;

/// Resolves (downloading if needed) and loads one model variant.
pub fn init_detector(config: &AppConfig, variant: ModelVariant) -> anyhow::Result<OrtYOLO> {
    let store = ModelStore::new(config)?;
    let weights = store.weights_path(variant)?;
    let options = ConfigOrt::from_app_config(config).with_model(&weights)?;

    log::info!("Initializing ORT session with ({}) execution provider", config.inference_device);
    OrtYOLO::new(options)
}

pub fn run_detection(yolo: &mut OrtYOLO, image: &DynamicImage, threshold: f32) -> anyhow::Result<Vec<Detection>> {
    Ok(yolo.run(image, threshold)?.into_detections())
}

/// Builds the shared web state from the config: weight store and annotator.
pub fn build_app_state(config: &AppConfig) -> anyhow::Result<web::AppState> {
    let store = ModelStore::new(config)?;
    let annotator = Annotator::new(config.font_path.as_deref())?;
    Ok(web::AppState::new(config, Arc::new(store), annotator))
}
