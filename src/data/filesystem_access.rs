//! Represents the directories the demo reads from and writes to.
use std::path::{Path, PathBuf};

const APP_DIR: &str = "yolo_demo";

#[derive(Debug)]
pub enum FsAccess {
    Cache,
    Config,
}

impl FsAccess {
    /// The `yolo_demo` directory under the platform cache or config dir.
    fn get_path(&self) -> anyhow::Result<PathBuf> {
        let base_path = match self {
            FsAccess::Cache => dirs::cache_dir(),
            FsAccess::Config => dirs::config_dir(),
        };

        let mut path = base_path.ok_or_else(|| {
            anyhow::anyhow!("Unsupported operating system. Supported OS: Linux, MacOS, Windows.")
        })?;

        path.push(APP_DIR);
        Ok(path)
    }

    /// Constructs a path to the `yolo_demo` directory with the provided subdirectories, creating it automatically.
    ///
    /// Examples:
    /// `~/.cache/yolo_demo/models`, `~/.config/yolo_demo`.
    pub fn path_with_subs(&self, subs: &[&str]) -> anyhow::Result<PathBuf> {
        let mut d = self.get_path()?;
        for sub in subs {
            d.push(sub);
        }
        create_directory(&d)?;
        Ok(d)
    }

    /// Default location of the JSON config file. Not created.
    pub fn default_config_file() -> anyhow::Result<PathBuf> {
        Ok(Self::Config.get_path()?.join("config.json"))
    }
}

/// Creates the specified directory if it does not exist.
pub fn create_directory(path: &Path) -> anyhow::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
