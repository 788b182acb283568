use std::fmt;
use std::str::FromStr;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum InferenceDevice {
    #[default] CPU,
    CUDA(usize),
    TensorRT(usize),
    CoreML(usize),
}

// Hardcoded device names. Storing the "proper" spelling and the lowercase version.
const CPU: [&str; 2] = ["CPU", "cpu"];
const CUDA: [&str; 2] = ["CUDA", "cuda"];
const TENSOR_RT: [&str; 2] = ["TensorRT", "tensorrt"];
const CORE_ML: [&str; 2] = ["CoreML", "coreml"];

impl InferenceDevice {
    pub fn from_name(device: &str, device_id: usize) -> Option<Self> {
        match device.to_lowercase().as_str() {
            "cpu" => Some(InferenceDevice::CPU),
            "cuda" => Some(InferenceDevice::CUDA(device_id)),
            "tensorrt" => Some(InferenceDevice::TensorRT(device_id)),
            "coreml" => Some(InferenceDevice::CoreML(device_id)),
            _ => None,
        }
    }

    pub fn str(&self) -> &'static str {
        match self {
            InferenceDevice::CPU => CPU[0],
            InferenceDevice::CUDA(_) => CUDA[0],
            InferenceDevice::TensorRT(_) => TENSOR_RT[0],
            InferenceDevice::CoreML(_) => CORE_ML[0],
        }
    }

    pub fn all_inference_devices() -> Vec<&'static str> {
        vec![CPU[1], CUDA[1], TENSOR_RT[1], CORE_ML[1]]
    }
}

/// Accepts `cpu`, `cuda`, `cuda:1`, `tensorrt:0`, ...
impl FromStr for InferenceDevice {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, id) = match s.split_once(':') {
            Some((name, id)) => (name, id.parse::<usize>()?),
            None => (s, 0),
        };
        Self::from_name(name, id).ok_or_else(|| {
            anyhow::anyhow!(
                "Unknown inference device `{s}`, expected one of: {}",
                Self::all_inference_devices().join(", ")
            )
        })
    }
}

impl fmt::Display for InferenceDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InferenceDevice::CPU => f.write_str(self.str()),
            InferenceDevice::CUDA(id)
            | InferenceDevice::TensorRT(id)
            | InferenceDevice::CoreML(id) => write!(f, "{}:{}", self.str(), id),
        }
    }
}

impl<'de> serde::Deserialize<'de> for InferenceDevice {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
