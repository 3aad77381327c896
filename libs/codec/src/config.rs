//! # Engine Configuration
//!
//! Tuning knobs for compiled schemas. Defaults suit socket-sized fragments; a
//! deployment can override them from a TOML file.
//!
//! ```toml
//! join_copy_threshold = 128
//! pointer_id_base = 0x40000000
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors loading or validating an [`EngineConfig`]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read engine config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse engine config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid engine config: {0}")]
    Invalid(String),
}

/// Upper bound for the byte-by-byte join path; larger thresholds defeat its purpose
const MAX_JOIN_COPY_THRESHOLD: usize = 1 << 20;

/// Engine configuration shared by a schema and every parser it mints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fragmented buffers up to this many bytes are joined with a byte loop
    /// into a freshly sized destination; larger ones use a bulk join
    pub join_copy_threshold: usize,

    /// First resume id of the range reserved for conditional pointers;
    /// sequential resume ids (starting at 1) must stay below it
    pub pointer_id_base: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            join_copy_threshold: 64,
            pointer_id_base: 0x8000_0000,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document; missing keys take their defaults
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        // Id 0 is the halted state and sequential ids start at 1
        if self.pointer_id_base < 2 {
            return Err(ConfigError::Invalid(format!(
                "pointer_id_base must be at least 2, got {}",
                self.pointer_id_base
            )));
        }
        if self.join_copy_threshold > MAX_JOIN_COPY_THRESHOLD {
            return Err(ConfigError::Invalid(format!(
                "join_copy_threshold {} exceeds {}",
                self.join_copy_threshold, MAX_JOIN_COPY_THRESHOLD
            )));
        }
        Ok(())
    }
}
