use addedat_models::ItemType;
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Base directory override from `ADDEDAT_BASE_PATH`, if set.
pub fn base_path_override() -> Option<PathBuf> {
    std::env::var("ADDEDAT_BASE_PATH")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
}

pub struct PathManager {
    config_dir: PathBuf,
    data_dir: PathBuf,
    log_dir: PathBuf,
}

impl PathManager {
    pub fn new() -> Result<Self> {
        let base_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
            .join("addedat");

        Ok(Self::with_base(base_dir))
    }

    /// Config files at the base level, data and logs in subdirectories.
    pub fn with_base(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        Self {
            config_dir: base.clone(),
            data_dir: base.join("data"),
            log_dir: base.join("logs"),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    pub fn credentials_file(&self) -> PathBuf {
        self.config_dir.join("credentials.toml")
    }

    /// Saved selection for one list (`selection-movie.json`, `selection-show.json`).
    pub fn selection_file(&self, item_type: ItemType) -> PathBuf {
        self.data_dir.join(format!("selection-{}.json", item_type.as_str()))
    }

    pub fn default_log_file(&self) -> PathBuf {
        self.log_dir.join("addedat.log")
    }

    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::create_dir_all(&self.log_dir)?;
        Ok(())
    }
}

impl Default for PathManager {
    fn default() -> Self {
        if let Some(base) = base_path_override() {
            return Self::with_base(base);
        }

        // Platform-specific paths (e.g. ~/.config/addedat on Linux), falling
        // back to the working directory when no config dir exists.
        Self::new().unwrap_or_else(|_| Self::with_base(PathBuf::from(".addedat")))
    }
}
