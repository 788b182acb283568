mod config_ort;
mod filesystem_access;

pub use config_ort::ConfigOrt;
pub use filesystem_access::{create_directory, FsAccess};

pub use crate::detection_runners::ort_detector::input_wrapper::{X, Xs};
pub use crate::detection_runners::ort_detector::y::Y;

pub(crate) const CROSS_MARK: &str = "❌";
