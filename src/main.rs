use std::net::SocketAddr;
use std::path::PathBuf;
use clap::Parser;
use yolo_demo::common::{AppConfig, InferenceDevice, ModelVariant};
use yolo_demo::data::FsAccess;

#[derive(Debug, Parser)]
#[command(name = "yolo-demo", version, about = "Upload an image, detect objects with YOLOv8")]
struct Args {
    /// JSON config file. Defaults to `<config dir>/yolo_demo/config.json` when present.
    #[arg(long, env = "YOLO_DEMO_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Path to the ONNX Runtime shared library.
    #[arg(long, env = "ORT_DYLIB_PATH")]
    ort_lib: Option<String>,

    /// cpu, cuda[:id], tensorrt[:id] or coreml
    #[arg(long)]
    device: Option<InferenceDevice>,

    #[arg(long)]
    weights_dir: Option<PathBuf>,

    #[arg(long)]
    model_base_url: Option<String>,

    /// TTF font used for box captions.
    #[arg(long)]
    font: Option<PathBuf>,

    #[arg(long)]
    model: Option<ModelVariant>,

    #[arg(long)]
    threshold: Option<f32>,

    /// Log per-stage ONNX Runtime timings.
    #[arg(long)]
    profile: bool,
}

impl Args {
    fn into_config(self) -> anyhow::Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::from_file(path)?,
            None => {
                let default_path = FsAccess::default_config_file()?;
                if default_path.is_file() {
                    AppConfig::from_file(&default_path)?
                } else {
                    AppConfig::default()
                }
            }
        };

        if let Some(bind) = self.bind { config.bind = bind; }
        if let Some(ort_lib) = self.ort_lib { config.ort_lib_path = ort_lib; }
        if let Some(device) = self.device { config.inference_device = device; }
        if let Some(dir) = self.weights_dir { config.weights_dir = Some(dir); }
        if let Some(url) = self.model_base_url { config.model_base_url = Some(url); }
        if let Some(font) = self.font { config.font_path = Some(font); }
        if let Some(model) = self.model { config.default_model = model; }
        if let Some(threshold) = self.threshold { config.conf_threshold = threshold; }
        if self.profile { config.profile = true; }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Args::parse().into_config()?;
    log::info!("Starting yolo-demo {}\n{}", env!("CARGO_PKG_VERSION"), config);

    let state = yolo_demo::build_app_state(&config)?;
    yolo_demo::web::serve(config.bind, state).await
}
