#![allow(dead_code)]

use std::sync::Arc;
use image::{DynamicImage, Rgb, RgbImage};
use parking_lot::Mutex;
use yolo_demo::common::{DetBox, Detection, ModelVariant};
use yolo_demo::handler::{DetectionRequest, Detector, ModelProvider};
use yolo_demo::web::pages::{FormDefaults, Original};

pub const DEFAULTS: FormDefaults = FormDefaults {
    model: ModelVariant::YoloV8n,
    threshold: 0.25,
    show_labels: true,
    show_conf: true,
};

const PNG_STUB: &[u8] = b"\x89PNG\r\n\x1a\n";

pub fn original() -> Original<'static> {
    Original {
        file_name: "street.png",
        mime: "image/png",
        bytes: PNG_STUB,
    }
}

pub fn request(threshold: f32) -> DetectionRequest {
    DetectionRequest {
        image: DynamicImage::from(RgbImage::from_pixel(100, 100, Rgb([0, 0, 0]))),
        file_name: "street.png".to_string(),
        model: ModelVariant::YoloV8n,
        threshold,
        show_labels: true,
        show_conf: true,
    }
}

pub fn dog_and_person() -> Vec<Detection> {
    vec![
        Detection::new(16, DetBox::new(10., 20., 70., 80.), Some("dog".to_string()), 0.873),
        Detection::new(0, DetBox::new(80., 10., 95., 60.), Some("person".to_string()), 0.312),
    ]
}

type Calls = Arc<Mutex<Vec<(ModelVariant, f32)>>>;

/// Stands in for the ONNX model: filters a fixed detection list at the requested threshold.
pub struct FakeProvider {
    detections: Vec<Detection>,
    detect_error: Option<String>,
    load_error: Option<String>,
    calls: Calls,
}

impl FakeProvider {
    pub fn returning(detections: Vec<Detection>) -> Self {
        Self { detections, detect_error: None, load_error: None, calls: Calls::default() }
    }

    pub fn failing(message: &str) -> Self {
        Self { detect_error: Some(message.to_string()), ..Self::returning(vec![]) }
    }

    pub fn failing_to_load(message: &str) -> Self {
        Self { load_error: Some(message.to_string()), ..Self::returning(vec![]) }
    }

    pub fn calls(&self) -> Vec<(ModelVariant, f32)> {
        self.calls.lock().clone()
    }
}

struct FakeDetector {
    variant: ModelVariant,
    detections: Vec<Detection>,
    error: Option<String>,
    calls: Calls,
}

impl Detector for FakeDetector {
    fn detect(&mut self, _image: &DynamicImage, threshold: f32) -> anyhow::Result<Vec<Detection>> {
        self.calls.lock().push((self.variant, threshold));
        if let Some(error) = &self.error {
            anyhow::bail!("{error}");
        }
        Ok(self
            .detections
            .iter()
            .filter(|d| d.confidence >= threshold)
            .cloned()
            .collect())
    }
}

impl ModelProvider for FakeProvider {
    fn load(&self, variant: ModelVariant) -> anyhow::Result<Box<dyn Detector>> {
        if let Some(error) = &self.load_error {
            anyhow::bail!("{error}");
        }
        Ok(Box::new(FakeDetector {
            variant,
            detections: self.detections.clone(),
            error: self.detect_error.clone(),
            calls: Arc::clone(&self.calls),
        }))
    }
}
