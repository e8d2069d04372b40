//! Production settings, loadable from a TOML file.

use crate::production::Strategy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::num::NonZeroUsize;
use std::path::Path;
use thiserror::Error;

/// Upper bound on the number of symbols in a generation unless configured otherwise.
pub const DEFAULT_MAX_GENERATION_LEN: usize = 1 << 28;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileReadError(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Configuration for the production engine.
///
/// ```toml
/// workers = 8
/// strategy = "offset-precomputed"
/// max_generation_len = 100000000
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Size of the worker pool. `1` means sequential production.
    pub workers: usize,
    /// How a generation is split across workers.
    pub strategy: Strategy,
    /// Largest generation the engine will allocate; `None` disables the check.
    pub max_generation_len: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
            strategy: Strategy::default(),
            max_generation_len: Some(DEFAULT_MAX_GENERATION_LEN),
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: EngineConfig = toml::from_str(&content)?;
        Ok(config)
    }
}
