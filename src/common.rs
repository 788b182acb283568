mod app_config;
mod det_box;
mod detection;
mod inference_device;
mod model_variant;

pub use app_config::*;
pub use det_box::*;
pub use detection::*;
pub use inference_device::*;
pub use model_variant::*;
