#![forbid(unsafe_code)]

//! Registry configuration, read from TOML.
//!
//! ```toml
//! fips_only = true
//! fips_module_available = true
//! ```

use nyckel_core::Error;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
    /// Start the registry in FIPS-only mode.
    pub fips_only: bool,
    /// Whether the crypto backend is a FIPS-certified module.
    pub fips_module_available: bool,
}

impl RegistryConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, Error> {
        toml::from_str(text).map_err(|e| Error::Encoding(format!("invalid registry config: {e}")))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }
}
