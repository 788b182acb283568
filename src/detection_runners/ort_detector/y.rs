use crate::common::Detection;
use crate::detection_runners::ort_detector::nms;

/// Container for the inference results of one image.
#[derive(Clone, PartialEq, Default)]
pub struct Y {
    detections: Vec<Detection>,
}

impl std::fmt::Debug for Y {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut f = f.debug_struct("Y");
        if !self.detections.is_empty() {
            f.field("Detections", &self.detections);
        }
        f.finish()
    }
}

impl Y {
    /// Sets the detections of this result.
    pub fn with_detections(mut self, detections: Vec<Detection>) -> Self {
        self.detections = detections;
        self
    }

    pub fn into_detections(self) -> Vec<Detection> {
        self.detections
    }

    pub fn apply_nms(mut self, iou_threshold: f32) -> Self {
        nms::nms(&mut self.detections, iou_threshold);
        self
    }
}
