//! Configuration storage for station settings and calibration data.
//!
//! Provides a directory of named JSON documents. The station keeps its
//! nominal configuration and the calibration starting snapshot here; any
//! serde type can be stored.
//! All config is stored in ~/.beam_station/ by default.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from loading or saving configuration documents
#[derive(Error, Debug)]
pub enum ConfigStorageError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("HOME not set")]
    NoHome,
}

/// Configuration storage manager.
///
/// Manages loading and saving of configuration files from a single
/// directory (defaults to ~/.beam_station/).
#[derive(Debug, Clone)]
pub struct ConfigStorage {
    /// Root directory for all configuration (e.g., ~/.beam_station)
    root_path: PathBuf,
}

impl ConfigStorage {
    /// Create a new config storage with default path (~/.beam_station)
    pub fn new() -> Result<Self, ConfigStorageError> {
        let home = std::env::var("HOME").map_err(|_| ConfigStorageError::NoHome)?;
        Ok(Self {
            root_path: PathBuf::from(home).join(".beam_station"),
        })
    }

    /// Create a new config storage with custom root path
    pub fn with_path(root_path: impl Into<PathBuf>) -> Self {
        Self {
            root_path: root_path.into(),
        }
    }

    /// Get the root configuration path
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    /// Full path of a named document
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root_path.join(name)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).exists()
    }

    /// Load and deserialize a named document.
    pub fn load<T: DeserializeOwned>(&self, name: &str) -> Result<T, ConfigStorageError> {
        let path = self.path_for(name);
        if !path.exists() {
            return Err(ConfigStorageError::NotFound(path));
        }
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigStorageError::Io {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigStorageError::Json { path, source })
    }

    /// Load a named document, or `None` if it does not exist.
    ///
    /// A file that exists but cannot be parsed is still an error.
    pub fn load_optional<T: DeserializeOwned>(
        &self,
        name: &str,
    ) -> Result<Option<T>, ConfigStorageError> {
        match self.load(name) {
            Ok(value) => Ok(Some(value)),
            Err(ConfigStorageError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Serialize and save a named document as pretty JSON.
    ///
    /// Creates the root directory if it doesn't exist. The document is
    /// written to a temporary sibling first and renamed into place so
    /// readers never observe a partial file.
    /// Returns the path where the document was saved.
    pub fn save<T: Serialize>(&self, name: &str, value: &T) -> Result<PathBuf, ConfigStorageError> {
        std::fs::create_dir_all(&self.root_path).map_err(|source| ConfigStorageError::Io {
            path: self.root_path.clone(),
            source,
        })?;

        let path = self.path_for(name);
        let json = serde_json::to_string_pretty(value).map_err(|source| ConfigStorageError::Json {
            path: path.clone(),
            source,
        })?;

        let tmp = self.path_for(&format!(".{name}.tmp"));
        std::fs::write(&tmp, json).map_err(|source| ConfigStorageError::Io {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, &path).map_err(|source| ConfigStorageError::Io {
            path: path.clone(),
            source,
        })?;

        Ok(path)
    }
}
