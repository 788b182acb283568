use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Instant;
use anyhow::Result;
use half::f16;
use ndarray::{Array, IxDyn};
use ort::{
    execution_providers::{ExecutionProvider,
                          CPUExecutionProvider,
                          CUDAExecutionProvider,
                          TensorRTExecutionProvider,
                          CoreMLExecutionProvider},
    session::builder::{GraphOptimizationLevel, SessionBuilder},
    session::{Session, SessionInputValue},
    tensor::TensorElementType,
    value::{DynValue, Value, ValueType},
};
use crate::common::InferenceDevice;
use crate::data::{ConfigOrt, Xs, X, CROSS_MARK};

static ORT_RUNTIME: OnceLock<()> = OnceLock::new();

/// Loads the ONNX Runtime shared library once per process.
///
/// An empty `ort_lib_path` defers to the `ORT_DYLIB_PATH` environment variable.
pub fn init_runtime(ort_lib_path: &str) -> Result<()> {
    if ORT_RUNTIME.get().is_some() {
        return Ok(());
    }

    let lib = runtime_library(ort_lib_path)?;
    log::info!("Loading ONNX Runtime from {}", lib.display());
    if let Err(e) = ort::init_from(lib.to_string_lossy()).with_name("yolo_demo").commit() {
        anyhow::bail!("{CROSS_MARK} Failed to load ONNX Runtime: {e:?}");
    }

    let _ = ORT_RUNTIME.set(());
    Ok(())
}

/// Resolves the runtime library path. `ort` panics on a missing library, so it is checked here.
fn runtime_library(ort_lib_path: &str) -> Result<PathBuf> {
    let path = if ort_lib_path.is_empty() {
        std::env::var_os("ORT_DYLIB_PATH").map(PathBuf::from).ok_or_else(|| {
            anyhow::anyhow!("{CROSS_MARK} No ONNX Runtime library configured, pass --ort-lib or set ORT_DYLIB_PATH")
        })?
    } else {
        PathBuf::from(ort_lib_path)
    };
    if !path.is_file() {
        anyhow::bail!("{CROSS_MARK} ONNX Runtime library not found: {}", path.display());
    }
    Ok(path)
}

/// Name, element type and shape of one model input or output. Dynamic axes are 0.
#[derive(Debug, Clone)]
struct TensorSlot {
    name: String,
    dtype: TensorElementType,
    dims: Vec<usize>,
}

impl TensorSlot {
    fn from_value_type(name: &str, value_type: &ValueType) -> Option<Self> {
        let dtype = value_type.tensor_type()?;
        let dims = value_type
            .tensor_shape()
            .map(|shape| shape.iter().map(|&d| d.max(0) as usize).collect())
            .unwrap_or_default();
        Some(Self { name: name.to_string(), dtype, dims })
    }
}

/// One ONNX Runtime session with its resolved I/O layout.
#[derive(Debug)]
pub struct OrtEngine {
    session: Session,
    inputs: Vec<TensorSlot>,
    outputs: Vec<TensorSlot>,
    profile: bool,
}

impl OrtEngine {
    pub fn new(config: &ConfigOrt) -> Result<Self> {
        let mut builder = Session::builder()?;
        let device = Self::register_device(&mut builder, config.device)?;

        let session = builder
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(&config.onnx_path)?;

        let inputs: Vec<TensorSlot> = session
            .inputs
            .iter()
            .filter_map(|i| TensorSlot::from_value_type(&i.name, &i.input_type))
            .collect();
        let outputs: Vec<TensorSlot> = session
            .outputs
            .iter()
            .filter_map(|o| TensorSlot::from_value_type(&o.name, &o.output_type))
            .collect();
        if inputs.is_empty() || outputs.is_empty() {
            anyhow::bail!("Model {} has no tensor inputs or outputs", config.onnx_path.display());
        }

        log::info!(
            "Backend: ONNXRuntime | Model: {} | Device: {} | Inputs: {:?} | Outputs: {:?}",
            model_file_name(&config.onnx_path),
            device,
            inputs.iter().map(|s| &s.dims).collect::<Vec<_>>(),
            outputs.iter().map(|s| &s.dims).collect::<Vec<_>>(),
        );

        Ok(Self { session, inputs, outputs, profile: config.profile })
    }

    /// Registers the provider for `wanted`. CUDA and CoreML fall back to CPU
    /// when unavailable, TensorRT is an error. Returns the device in use.
    fn register_device(builder: &mut SessionBuilder, wanted: InferenceDevice) -> Result<InferenceDevice> {
        let registered = match wanted {
            InferenceDevice::CPU => register(builder, CPUExecutionProvider::default(), "CPU"),
            InferenceDevice::TensorRT(id) => {
                let trt = TensorRTExecutionProvider::default()
                    .with_device_id(id as i32)
                    .with_engine_cache(true)
                    .with_engine_cache_path("trt-cache");
                register(builder, trt, "TensorRT")?;
                log::info!("🐢 Building the TensorRT engine may take a while on first load");
                return Ok(wanted);
            }
            InferenceDevice::CUDA(id) => {
                register(builder, CUDAExecutionProvider::default().with_device_id(id as i32), "CUDA")
            }
            InferenceDevice::CoreML(_) => {
                register(builder, CoreMLExecutionProvider::default().with_subgraphs(false), "CoreML")
            }
        };

        match registered {
            Ok(()) => Ok(wanted),
            Err(e) if wanted != InferenceDevice::CPU => {
                log::warn!("{e}, using CPU");
                register(builder, CPUExecutionProvider::default(), "CPU")?;
                Ok(InferenceDevice::CPU)
            }
            Err(e) => Err(e),
        }
    }

    fn to_input(x: X, dtype: TensorElementType) -> Result<SessionInputValue<'static>> {
        let value: DynValue = match dtype {
            TensorElementType::Float32 => Value::from_array(x.0)?.into_dyn(),
            TensorElementType::Float16 => Value::from_array(x.mapv(f16::from_f32))?.into_dyn(),
            _ => anyhow::bail!("Unsupported model input type: {dtype:?}"),
        };
        Ok(value.into())
    }

    fn to_f32(value: &DynValue, dtype: TensorElementType) -> Result<Array<f32, IxDyn>> {
        Ok(match dtype {
            TensorElementType::Float32 => value.try_extract_array::<f32>()?.to_owned(),
            TensorElementType::Float16 => value.try_extract_array::<f16>()?.mapv(f16::to_f32),
            _ => anyhow::bail!("Unsupported model output type: {dtype:?}"),
        })
    }

    pub fn run(&mut self, xs: Xs) -> Result<Xs> {
        let start = Instant::now();
        let feed = self
            .inputs
            .iter()
            .zip(xs)
            .map(|(slot, x)| Self::to_input(x, slot.dtype))
            .collect::<Result<Vec<_>>>()?;
        let t_feed = start.elapsed();

        let outputs = self.session.run(&feed[..])?;
        let t_run = start.elapsed() - t_feed;

        let mut ys = Xs::new();
        for slot in &self.outputs {
            let y = Self::to_f32(&outputs[slot.name.as_str()], slot.dtype)?;
            ys.push(X::from(y));
        }

        if self.profile {
            log::info!(
                "[Profile] feed: {:.2?} | inference: {:.2?} | to_f32: {:.2?}",
                t_feed,
                t_run,
                start.elapsed() - t_feed - t_run
            );
        }
        Ok(ys)
    }

    /// Spatial sides of the first input, `None` for dynamic axes.
    pub fn input_height(&self) -> Option<usize> {
        self.input_dim(2)
    }

    pub fn input_width(&self) -> Option<usize> {
        self.input_dim(3)
    }

    fn input_dim(&self, axis: usize) -> Option<usize> {
        self.inputs.first()?.dims.get(axis).copied().filter(|&d| d > 0)
    }

    /// Custom metadata entry of the model, e.g. `names`.
    pub fn try_fetch(&self, key: &str) -> Option<String> {
        self.session.metadata().ok()?.custom(key).ok().flatten()
    }
}

fn register<E: ExecutionProvider>(builder: &mut SessionBuilder, ep: E, name: &str) -> Result<()> {
    if !ep.is_available()? {
        anyhow::bail!("{CROSS_MARK} {name} execution provider not available");
    }
    ep.register(builder)
        .map_err(|e| anyhow::anyhow!("{CROSS_MARK} {name} initialization failed: {e:?}"))
}

/// File name of a model path, for log lines.
pub fn model_file_name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_runtime_library_is_an_error() {
        let err = init_runtime("/nonexistent/libonnxruntime.so").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/libonnxruntime.so"));
    }

    #[test]
    fn directory_is_not_a_runtime_library() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_string_lossy().into_owned();
        assert!(runtime_library(&path).is_err());
    }
}
