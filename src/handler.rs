//! Detection request/response flow: one synchronous model call per request,
//! mapped into display-ready rows and summary values.

use std::io::Cursor;
use std::time::{Duration, Instant};
use image::{DynamicImage, ImageFormat, RgbImage};
use crate::annotate::Annotator;
use crate::common::{Detection, ModelVariant};

/// Shown with every failure; model weights are fetched over the network on first use.
pub const NETWORK_HINT: &str =
    "Check your network connection: model weights are downloaded on first use.";

pub const DOWNLOAD_PREFIX: &str = "detected_";

/// Anything that turns an image into detections at a given confidence threshold.
pub trait Detector {
    fn detect(&mut self, image: &DynamicImage, threshold: f32) -> anyhow::Result<Vec<Detection>>;
}

/// Hands out a ready detector for a model variant.
pub trait ModelProvider: Send + Sync {
    fn load(&self, variant: ModelVariant) -> anyhow::Result<Box<dyn Detector>>;
}

#[derive(Debug, Clone)]
pub struct DetectionRequest {
    pub image: DynamicImage,
    pub file_name: String,
    pub model: ModelVariant,
    pub threshold: f32,
    pub show_labels: bool,
    pub show_conf: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectedObjectRecord {
    pub label: String,
    pub confidence: f32,
}

impl DetectedObjectRecord {
    /// Confidence as a percentage with one decimal, e.g. `87.3%`.
    pub fn percentage(&self) -> String {
        format_percentage(self.confidence)
    }
}

impl From<&Detection> for DetectedObjectRecord {
    fn from(detection: &Detection) -> Self {
        Self {
            label: detection.get_label(),
            confidence: detection.confidence,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DetectionResult {
    pub annotated: RgbImage,
    pub objects: Vec<DetectedObjectRecord>,
    pub elapsed: Duration,
    pub threshold: f32,
    pub model: ModelVariant,
    pub file_name: String,
}

impl DetectionResult {
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn inference_time(&self) -> String {
        format!("{:.2} seconds", self.elapsed.as_secs_f64())
    }

    pub fn threshold_used(&self) -> String {
        format!("{:.2}", self.threshold)
    }

    pub fn download_name(&self) -> String {
        download_file_name(&self.file_name)
    }

    pub fn annotated_png(&self) -> anyhow::Result<Vec<u8>> {
        encode_png(&self.annotated)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectionFailure {
    pub message: String,
}

impl DetectionFailure {
    pub fn new(cause: &anyhow::Error) -> Self {
        Self {
            message: format!("Detection failed: {cause:#}"),
        }
    }

    pub fn hint(&self) -> &'static str {
        NETWORK_HINT
    }
}

#[derive(Debug, Clone)]
pub enum DetectionOutcome {
    Detected(DetectionResult),
    NoObjects(DetectionResult),
    Failed(DetectionFailure),
}

impl DetectionOutcome {
    pub fn result(&self) -> Option<&DetectionResult> {
        match self {
            DetectionOutcome::Detected(result) | DetectionOutcome::NoObjects(result) => Some(result),
            DetectionOutcome::Failed(_) => None,
        }
    }
}

pub fn format_percentage(confidence: f32) -> String {
    format!("{:.1}%", confidence * 100.0)
}

pub fn download_file_name(original: &str) -> String {
    format!("{DOWNLOAD_PREFIX}{original}")
}

pub fn encode_png(image: &RgbImage) -> anyhow::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

/// Runs one detection request to completion. Never retries.
pub fn handle(request: DetectionRequest, provider: &dyn ModelProvider, annotator: &Annotator) -> DetectionOutcome {
    let DetectionRequest { image, file_name, model, threshold, show_labels, show_conf } = request;

    let detected = provider.load(model).and_then(|mut detector| {
        let start = Instant::now();
        let detections = detector.detect(&image, threshold)?;
        Ok((detections, start.elapsed()))
    });

    let (detections, elapsed) = match detected {
        Ok(detected) => detected,
        Err(e) => {
            log::error!("{model} detection on {file_name} failed: {e:#}");
            return DetectionOutcome::Failed(DetectionFailure::new(&e));
        }
    };

    log::info!(
        "{model} found {} objects in {file_name} at threshold {threshold} ({:.2?})",
        detections.len(),
        elapsed
    );

    let result = DetectionResult {
        annotated: annotator.plot(&image, &detections, show_labels, show_conf),
        objects: detections.iter().map(DetectedObjectRecord::from).collect(),
        elapsed,
        threshold,
        model,
        file_name,
    };

    if result.objects.is_empty() {
        DetectionOutcome::NoObjects(result)
    } else {
        DetectionOutcome::Detected(result)
    }
}
