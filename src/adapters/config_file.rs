//! JSON configuration file adapter.
//!
//! Implements [`ConfigPort`].  Missing sections fall back to
//! [`SystemConfig::default`]; the merged result is validated before it is
//! returned.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::info;

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::SystemConfig;

pub struct JsonConfigFile {
    path: PathBuf,
}

impl JsonConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigPort for JsonConfigFile {
    fn load(&self) -> Result<SystemConfig, ConfigError> {
        let text = std::fs::read_to_string(&self.path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ConfigError::NotFound(self.path.display().to_string()),
            _ => ConfigError::Corrupted(format!("{}: {}", self.path.display(), e)),
        })?;
        let config: SystemConfig = serde_json::from_str(&text)
            .map_err(|e| ConfigError::Corrupted(format!("{}: {}", self.path.display(), e)))?;
        config.validate()?;
        info!(
            "Config: loaded {} ({} bindings, {} relays)",
            self.path.display(),
            config.bindings.len(),
            config.relays.len()
        );
        Ok(config)
    }
}
