use std::fmt;
use std::str::FromStr;
use serde::Deserialize;

/// The pretrained YOLOv8 detection checkpoints offered by the demo.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelVariant {
    #[default] YoloV8n,
    YoloV8s,
    YoloV8m,
    YoloV8l,
    YoloV8x,
}

// Hardcoded variant names. Storing the display spelling and the identifier.
const YOLOV8N: [&str; 2] = ["YOLOv8n", "yolov8n"];
const YOLOV8S: [&str; 2] = ["YOLOv8s", "yolov8s"];
const YOLOV8M: [&str; 2] = ["YOLOv8m", "yolov8m"];
const YOLOV8L: [&str; 2] = ["YOLOv8l", "yolov8l"];
const YOLOV8X: [&str; 2] = ["YOLOv8x", "yolov8x"];

impl ModelVariant {
    pub const ALL: [ModelVariant; 5] = [
        ModelVariant::YoloV8n,
        ModelVariant::YoloV8s,
        ModelVariant::YoloV8m,
        ModelVariant::YoloV8l,
        ModelVariant::YoloV8x,
    ];

    fn names(&self) -> [&'static str; 2] {
        match self {
            Self::YoloV8n => YOLOV8N,
            Self::YoloV8s => YOLOV8S,
            Self::YoloV8m => YOLOV8M,
            Self::YoloV8l => YOLOV8L,
            Self::YoloV8x => YOLOV8X,
        }
    }

    /// Human readable name, e.g. `YOLOv8n`.
    pub fn display_name(&self) -> &'static str {
        self.names()[0]
    }

    /// Identifier used in forms and file names, e.g. `yolov8n`.
    pub fn id(&self) -> &'static str {
        self.names()[1]
    }

    pub fn weights_file_name(&self) -> String {
        format!("{}.onnx", self.id())
    }

    /// Short hint shown next to the selector.
    pub fn description(&self) -> &'static str {
        match self {
            Self::YoloV8n => "nano, fastest",
            Self::YoloV8s => "small",
            Self::YoloV8m => "medium",
            Self::YoloV8l => "large",
            Self::YoloV8x => "extra large, most accurate",
        }
    }
}

impl FromStr for ModelVariant {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        let wanted = wanted.trim_end_matches(".onnx").trim_end_matches(".pt");
        Self::ALL
            .into_iter()
            .find(|variant| variant.id() == wanted)
            .ok_or_else(|| anyhow::anyhow!("Unknown model variant: {s}"))
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ids_and_checkpoint_names() {
        assert_eq!("yolov8s".parse::<ModelVariant>().unwrap(), ModelVariant::YoloV8s);
        assert_eq!("YOLOv8x".parse::<ModelVariant>().unwrap(), ModelVariant::YoloV8x);
        assert_eq!("yolov8n.pt".parse::<ModelVariant>().unwrap(), ModelVariant::YoloV8n);
        assert!("yolov5n".parse::<ModelVariant>().is_err());
    }

    #[test]
    fn weights_file_follows_id() {
        assert_eq!(ModelVariant::YoloV8m.weights_file_name(), "yolov8m.onnx");
    }
}
