use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{CoreError, Result};
use crate::selection::SelectionStore;

/// JSON file holding one list's selection between CLI invocations.
#[derive(Debug, Clone)]
pub struct SelectionFile {
    path: PathBuf,
}

impl SelectionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or unreadable files yield an empty selection.
    pub fn load(&self) -> SelectionStore {
        if !self.path.exists() {
            debug!("No saved selection at {}", self.path.display());
            return SelectionStore::new();
        }

        match std::fs::read_to_string(&self.path) {
            Ok(content) => match serde_json::from_str::<SelectionStore>(&content) {
                Ok(store) => {
                    info!(
                        "Loaded selection from {} ({} selected)",
                        self.path.display(),
                        store.count_selected()
                    );
                    store
                }
                Err(e) => {
                    warn!(
                        "Saved selection at {} is corrupted: {}. Starting from an empty selection.",
                        self.path.display(),
                        e
                    );
                    SelectionStore::new()
                }
            },
            Err(e) => {
                warn!("Failed to read selection file {}: {}", self.path.display(), e);
                SelectionStore::new()
            }
        }
    }

    pub fn save(&self, store: &SelectionStore) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let json = serde_json::to_string_pretty(store).map_err(|e| CoreError::Serde {
            path: self.path.clone(),
            source: e,
        })?;
        std::fs::write(&self.path, json).map_err(|e| self.io_error(e))?;
        debug!(
            "Selection saved to {} ({} selected)",
            self.path.display(),
            store.count_selected()
        );
        Ok(())
    }

    pub fn remove(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path).map_err(|e| self.io_error(e))?;
        }
        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> CoreError {
        CoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
