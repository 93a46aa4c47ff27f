//! Recently opened files.
//!
//! The list is persisted as JSON under the platform config directory
//! (`<config>/pinnacle/recent_files.json`).

use crate::error::RecentFilesError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Maximum number of remembered paths.
pub const MAX_RECENT_FILES: usize = 10;

const FILE_NAME: &str = "recent_files.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredList {
    paths: Vec<PathBuf>,
}

/// Bounded most-recent-first list of opened paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentFiles {
    store: PathBuf,
    paths: Vec<PathBuf>,
}

impl RecentFiles {
    /// The default store location.
    pub fn default_store_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("pinnacle").join(FILE_NAME))
    }

    /// Loads the list from the default location.
    pub fn load() -> Result<Self, RecentFilesError> {
        let store = Self::default_store_path().ok_or(RecentFilesError::NoConfigDir)?;
        Self::with_path(store)
    }

    /// Loads the list stored at `store`. A missing file is an empty list.
    pub fn with_path(store: impl Into<PathBuf>) -> Result<Self, RecentFilesError> {
        let store = store.into();
        let paths = if store.exists() {
            let json = fs::read_to_string(&store).map_err(|source| RecentFilesError::Io {
                path: store.clone(),
                source,
            })?;
            let stored: StoredList = serde_json::from_str(&json).map_err(|source| RecentFilesError::Parse {
                path: store.clone(),
                source,
            })?;
            stored.paths
        } else {
            Vec::new()
        };

        let mut recent = Self {
            store,
            paths: Vec::new(),
        };
        // Re-pushing oldest first normalises a hand-edited file.
        for path in paths.into_iter().rev() {
            recent.insert(path);
        }
        Ok(recent)
    }

    /// Most recent first.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn store_path(&self) -> &Path {
        &self.store
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Moves `path` to the front and saves.
    pub fn push(&mut self, path: impl Into<PathBuf>) -> Result<(), RecentFilesError> {
        self.insert(path.into());
        self.save()
    }

    /// Forgets every path and saves.
    pub fn clear(&mut self) -> Result<(), RecentFilesError> {
        self.paths.clear();
        self.save()
    }

    pub fn save(&self) -> Result<(), RecentFilesError> {
        let io_err = |source| RecentFilesError::Io {
            path: self.store.clone(),
            source,
        };
        if let Some(parent) = self.store.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let stored = StoredList {
            paths: self.paths.clone(),
        };
        let json = serde_json::to_string_pretty(&stored).map_err(|source| RecentFilesError::Parse {
            path: self.store.clone(),
            source,
        })?;
        fs::write(&self.store, json).map_err(io_err)?;
        log::debug!("Saved {} recent file(s) to {}", self.paths.len(), self.store.display());
        Ok(())
    }

    fn insert(&mut self, path: PathBuf) {
        self.paths.retain(|p| p != &path);
        self.paths.insert(0, path);
        self.paths.truncate(MAX_RECENT_FILES);
    }
}
