//! Bridge configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Threading model requested from the COM subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ApartmentModel {
    /// Single-threaded apartment (COINIT_APARTMENTTHREADED)
    #[default]
    Sta,
    /// Multi-threaded apartment (COINIT_MULTITHREADED)
    Mta,
}

/// One class to activate and the interfaces to probe on it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeTarget {
    pub clsid: String,
    #[serde(default)]
    pub interfaces: Vec<String>,
}

/// Configuration shared by the runtime binding, activation and the probe tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub apartment: ApartmentModel,
    /// CLSCTX flags passed to activation
    pub class_context: u32,
    pub log_level: String,
    pub probe: Vec<ProbeTarget>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            apartment: ApartmentModel::Sta,
            // CLSCTX_ALL
            class_context: 0x17,
            log_level: "info".to_string(),
            probe: Vec::new(),
        }
    }
}

impl BridgeConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        tracing::debug!("Loading bridge config from {:?}", path);
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
