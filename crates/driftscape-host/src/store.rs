//! JSON persistence for settings and scenes.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use driftscape_core::{AppSettings, Scene};
use serde::Serialize;
use serde::de::DeserializeOwned;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let text = fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| StoreError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let text = serde_json::to_string_pretty(value).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, text).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Application settings stored as a single JSON file.
#[derive(Debug, Clone)]
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads settings. A missing or unreadable file yields defaults.
    pub fn load(&self) -> AppSettings {
        if !self.path.exists() {
            tracing::info!("[store] No settings at {}, using defaults", self.path.display());
            return AppSettings::default();
        }
        match read_json(&self.path) {
            Ok(settings) => settings,
            Err(err) => {
                tracing::warn!("[store] {err}; using defaults");
                AppSettings::default()
            }
        }
    }

    pub fn save(&self, settings: &AppSettings) -> Result<(), StoreError> {
        write_json(&self.path, settings)?;
        tracing::debug!("[store] Saved settings to {}", self.path.display());
        Ok(())
    }
}

/// Whole scenes stored as JSON files.
#[derive(Debug, Clone)]
pub struct JsonSceneRepository {
    path: PathBuf,
}

impl JsonSceneRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    pub fn load(&self) -> Result<Option<Scene>, StoreError> {
        if !self.exists() {
            return Ok(None);
        }
        read_json(&self.path).map(Some)
    }

    pub fn save(&self, scene: &Scene) -> Result<(), StoreError> {
        write_json(&self.path, scene)
    }
}
