use image::DynamicImage;
use crate::common::ModelVariant;
use crate::handler::DetectionRequest;
use crate::web::pages::{FormDefaults, PageKind};

pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Raw multipart fields of one submission.
#[derive(Debug, Default, Clone)]
pub struct UploadForm {
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
    pub model: Option<String>,
    pub threshold: Option<String>,
    pub show_labels: bool,
    pub show_conf: bool,
}

/// Why an upload never reached the detector.
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    NoFile,
    UnsupportedType(String),
    Undecodable(String),
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::NoFile => f.write_str("Please choose an image to upload."),
            Rejection::UnsupportedType(name) => write!(
                f,
                "{name} is not a supported image, use one of: {}",
                SUPPORTED_EXTENSIONS.join(", ")
            ),
            Rejection::Undecodable(name) => write!(f, "{name} could not be read as an image."),
        }
    }
}

pub fn extension(file_name: &str) -> Option<String> {
    std::path::Path::new(file_name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
}

pub fn is_supported_image(file_name: &str) -> bool {
    extension(file_name).is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

pub fn mime_for(file_name: &str) -> &'static str {
    match extension(file_name).as_deref() {
        Some("png") => "image/png",
        _ => "image/jpeg",
    }
}

impl UploadForm {
    /// Records a non-file field. Unknown names are ignored.
    pub fn set_text(&mut self, name: &str, value: String) {
        match name {
            "model" => self.model = Some(value),
            "threshold" => self.threshold = Some(value),
            "show_labels" => self.show_labels = true,
            "show_conf" => self.show_conf = true,
            _ => log::debug!("Ignoring form field {name}"),
        }
    }

    pub fn set_file(&mut self, file_name: String, bytes: Vec<u8>) {
        self.file_name = Some(file_name);
        self.bytes = bytes;
    }

    /// The uploaded file name, once it passed the extension filter.
    pub fn checked_file_name(&self) -> Result<&str, Rejection> {
        let name = match self.file_name.as_deref() {
            Some(name) if !name.is_empty() && !self.bytes.is_empty() => name,
            _ => return Err(Rejection::NoFile),
        };
        if !is_supported_image(name) {
            return Err(Rejection::UnsupportedType(name.to_string()));
        }
        Ok(name)
    }

    /// Builds the request for `kind`. The minimal page always uses the
    /// configured defaults; the advanced page takes the submitted values,
    /// falling back to defaults for anything missing or unparseable.
    pub fn into_request(self, kind: PageKind, defaults: &FormDefaults) -> Result<DetectionRequest, Rejection> {
        let file_name = self.checked_file_name()?.to_string();
        let image = decode(&self.bytes).ok_or_else(|| Rejection::Undecodable(file_name.clone()))?;

        let (model, threshold, show_labels, show_conf) = match kind {
            PageKind::Minimal => (defaults.model, defaults.threshold, true, true),
            PageKind::Advanced => (
                self.model
                    .as_deref()
                    .and_then(|m| m.parse::<ModelVariant>().ok())
                    .unwrap_or(defaults.model),
                self.threshold
                    .as_deref()
                    .and_then(|t| t.trim().parse::<f32>().ok())
                    .filter(|t| (0.0..=1.0).contains(t))
                    .unwrap_or(defaults.threshold),
                self.show_labels,
                self.show_conf,
            ),
        };

        Ok(DetectionRequest {
            image,
            file_name,
            model,
            threshold,
            show_labels,
            show_conf,
        })
    }
}

fn decode(bytes: &[u8]) -> Option<DynamicImage> {
    match image::load_from_memory(bytes) {
        Ok(image) => Some(image),
        Err(e) => {
            log::warn!("Failed to decode upload: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::encode_png;
    use image::{Rgb, RgbImage};

    fn defaults() -> FormDefaults {
        FormDefaults {
            model: ModelVariant::YoloV8n,
            threshold: 0.25,
            show_labels: true,
            show_conf: true,
        }
    }

    fn png() -> Vec<u8> {
        encode_png(&RgbImage::from_pixel(4, 4, Rgb([1, 2, 3]))).unwrap()
    }

    #[test]
    fn extension_filter_is_case_insensitive() {
        assert!(is_supported_image("cat.JPG"));
        assert!(is_supported_image("dog.jpeg"));
        assert!(is_supported_image("a.b.png"));
        assert!(!is_supported_image("clip.gif"));
        assert!(!is_supported_image("noextension"));
    }

    #[test]
    fn advanced_form_uses_submitted_values() {
        let mut form = UploadForm::default();
        form.set_file("street.png".to_string(), png());
        form.set_text("model", "yolov8l".to_string());
        form.set_text("threshold", "0.6".to_string());
        form.set_text("show_conf", "on".to_string());

        let request = form.into_request(PageKind::Advanced, &defaults()).unwrap();
        assert_eq!(request.model, ModelVariant::YoloV8l);
        assert_eq!(request.threshold, 0.6);
        assert!(!request.show_labels);
        assert!(request.show_conf);
        assert_eq!(request.file_name, "street.png");
    }

    #[test]
    fn bad_scalars_fall_back_to_defaults() {
        let mut form = UploadForm::default();
        form.set_file("street.png".to_string(), png());
        form.set_text("model", "resnet".to_string());
        form.set_text("threshold", "1.7".to_string());

        let request = form.into_request(PageKind::Advanced, &defaults()).unwrap();
        assert_eq!(request.model, ModelVariant::YoloV8n);
        assert_eq!(request.threshold, 0.25);
    }

    #[test]
    fn minimal_form_ignores_tuning_fields() {
        let mut form = UploadForm::default();
        form.set_file("street.png".to_string(), png());
        form.set_text("threshold", "0.9".to_string());

        let request = form.into_request(PageKind::Minimal, &defaults()).unwrap();
        assert_eq!(request.threshold, 0.25);
        assert!(request.show_labels && request.show_conf);
    }

    #[test]
    fn rejects_missing_unsupported_and_corrupt_uploads() {
        assert_eq!(
            UploadForm::default().into_request(PageKind::Minimal, &defaults()).unwrap_err(),
            Rejection::NoFile
        );

        let mut gif = UploadForm::default();
        gif.set_file("anim.gif".to_string(), vec![1, 2, 3]);
        assert_eq!(
            gif.into_request(PageKind::Minimal, &defaults()).unwrap_err(),
            Rejection::UnsupportedType("anim.gif".to_string())
        );

        let mut corrupt = UploadForm::default();
        corrupt.set_file("broken.jpg".to_string(), vec![0xff, 0xd8, 0x00]);
        assert_eq!(
            corrupt.into_request(PageKind::Minimal, &defaults()).unwrap_err(),
            Rejection::Undecodable("broken.jpg".to_string())
        );
    }
}
