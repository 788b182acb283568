use crate::common::DetBox;
use crate::detection_runners::ort_detector::nms::Nms;

/// One predicted object instance.
#[derive(Default, Debug, Clone, PartialEq, PartialOrd)]
pub struct Detection {
    pub class_id: usize,
    pub bbox: DetBox,
    pub label: Option<String>,
    pub confidence: f32,
}

impl Nms for Detection {
    fn iou(&self, other: &Self) -> f32 {
        self.bbox.iou(&other.bbox)
    }

    fn confidence(&self) -> f32 {
        self.confidence
    }

    fn class_id(&self) -> usize {
        self.class_id
    }
}

impl Detection {
    pub fn new(class_id: usize, bbox: DetBox, label: Option<String>, confidence: f32) -> Self {
        Self {
            class_id,
            bbox,
            label,
            confidence,
        }
    }

    pub fn with_bbox(mut self, bbox: DetBox) -> Self {
        self.bbox = bbox;
        self
    }

    pub fn with_confidence(mut self, conf: f32) -> Self {
        self.confidence = conf;
        self
    }

    pub fn with_class_id(mut self, class_id: usize) -> Self {
        self.class_id = class_id;
        self
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn get_label(&self) -> String {
        self.label.clone().unwrap_or("Unknown".to_string())
    }
}
