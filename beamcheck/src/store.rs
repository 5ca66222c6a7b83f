//! Named configuration documents on disk

use shared::config_storage::ConfigStorage;

use crate::config::StationConfig;
use crate::error::StoreError;

/// Configuration the station runs with
pub const NOMINAL_CONFIG: &str = "config.json";

/// Starting point of every calibration session
pub const DEFAULT_CONFIG: &str = "default.json";

/// Load and save the station configuration documents.
///
/// Loaders hand out only configurations that pass
/// [`StationConfig::validate`].
pub trait ConfigPersistence {
    fn load_nominal(&self) -> Result<StationConfig, StoreError>;

    /// Calibration snapshot; the built-in defaults when none is stored
    fn load_default(&self) -> Result<StationConfig, StoreError>;

    fn save_nominal(&self, config: &StationConfig) -> Result<(), StoreError>;
}

/// Reject a loaded document that fails validation
pub fn validated(document: &'static str, config: StationConfig) -> Result<StationConfig, StoreError> {
    config
        .validate()
        .map_err(|source| StoreError::Invalid { document, source })?;
    Ok(config)
}

/// [`ConfigPersistence`] over a [`ConfigStorage`] directory
#[derive(Debug, Clone)]
pub struct ConfigFiles {
    storage: ConfigStorage,
}

impl ConfigFiles {
    pub fn new(storage: ConfigStorage) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &ConfigStorage {
        &self.storage
    }

    /// Nominal configuration, falling back to the defaults when absent
    pub fn load_or_default(&self) -> Result<StationConfig, StoreError> {
        let config = self
            .storage
            .load_optional(NOMINAL_CONFIG)?
            .unwrap_or_default();
        validated(NOMINAL_CONFIG, config)
    }
}

impl ConfigPersistence for ConfigFiles {
    fn load_nominal(&self) -> Result<StationConfig, StoreError> {
        validated(NOMINAL_CONFIG, self.storage.load(NOMINAL_CONFIG)?)
    }

    fn load_default(&self) -> Result<StationConfig, StoreError> {
        match self.storage.load_optional(DEFAULT_CONFIG)? {
            Some(config) => validated(DEFAULT_CONFIG, config),
            None => {
                log::warn!(
                    "{} missing, starting calibration from built-in defaults",
                    self.storage.path_for(DEFAULT_CONFIG).display()
                );
                Ok(StationConfig::default())
            }
        }
    }

    fn save_nominal(&self, config: &StationConfig) -> Result<(), StoreError> {
        let path = self.storage.save(NOMINAL_CONFIG, config)?;
        log::info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use tempfile::TempDir;

    #[test]
    fn test_missing_default_falls_back() {
        let dir = TempDir::new().unwrap();
        let files = ConfigFiles::new(ConfigStorage::with_path(dir.path()));

        assert_eq!(files.load_default().unwrap(), StationConfig::default());
        assert!(files.load_nominal().is_err());
        assert_eq!(files.load_or_default().unwrap(), StationConfig::default());
    }

    #[test]
    fn test_save_then_load_nominal() {
        let dir = TempDir::new().unwrap();
        let files = ConfigFiles::new(ConfigStorage::with_path(dir.path()));
        let mut config = StationConfig::default();
        config.calibration.y_calib_m = 7.5;

        files.save_nominal(&config).unwrap();
        assert_eq!(files.load_nominal().unwrap(), config);
        assert!(files.storage().exists(NOMINAL_CONFIG));
    }

    #[test]
    fn test_stored_default_is_used() {
        let dir = TempDir::new().unwrap();
        let storage = ConfigStorage::with_path(dir.path());
        let mut config = StationConfig::default();
        config.geometry.crop_w = 200;
        storage.save(DEFAULT_CONFIG, &config).unwrap();

        let files = ConfigFiles::new(storage);
        assert_eq!(files.load_default().unwrap().geometry.crop_w, 200);
    }

    #[test]
    fn test_inverted_exposure_limits_are_rejected() {
        let dir = TempDir::new().unwrap();
        let storage = ConfigStorage::with_path(dir.path());
        let mut config = StationConfig::default();
        config.autoexposure.enabled = true;
        config.autoexposure.exp_min = 5000.0;
        config.autoexposure.exp_max = 100.0;
        storage.save(DEFAULT_CONFIG, &config).unwrap();
        storage.save(NOMINAL_CONFIG, &config).unwrap();

        let files = ConfigFiles::new(storage);
        for result in [files.load_default(), files.load_nominal(), files.load_or_default()] {
            match result {
                Err(StoreError::Invalid {
                    source: ConfigError::Invalid(message),
                    ..
                }) => assert!(message.contains("exposure range"), "{message}"),
                other => panic!("expected validation failure, got {other:?}"),
            }
        }
    }
}
