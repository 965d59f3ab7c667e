use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::LoadError;

/// Default file name looked up in the working directory.
pub const CONFIG_FILE: &str = "loadgraph.toml";

/// Top-level configuration loaded from `loadgraph.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub resolver: ResolverConfig,

    #[serde(default)]
    pub log: LogConfig,
}

/// Resolver settings from `[resolver]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Stabilization passes allowed before giving up. `0` means unbounded.
    #[serde(default = "default_max_iterations", rename = "max-iterations")]
    pub max_iterations: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
        }
    }
}

impl ResolverConfig {
    /// A config whose stabilization loop never gives up.
    pub fn unbounded() -> Self {
        Self { max_iterations: 0 }
    }

    pub fn iteration_limit(&self) -> Option<usize> {
        (self.max_iterations > 0).then_some(self.max_iterations)
    }
}

fn default_max_iterations() -> usize {
    64
}

/// Logging settings from `[log]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

fn default_filter() -> String {
    "warn".to_string()
}

impl Config {
    /// Load configuration from `path`, or return defaults if the file doesn't exist.
    pub fn load(path: &Path) -> miette::Result<Self> {
        if !path.is_file() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        Self::from_path(path)
    }

    /// Load configuration from an explicitly named file, which must exist.
    pub fn from_path(path: &Path) -> miette::Result<Self> {
        if !path.is_file() {
            return Err(LoadError::Config {
                message: format!("{} not found", path.display()),
            }
            .into());
        }
        let content = std::fs::read_to_string(path).map_err(|e| LoadError::Config {
            message: format!("Failed to read {}: {e}", path.display()),
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> miette::Result<Self> {
        toml::from_str(content).map_err(|e| {
            LoadError::Config {
                message: format!("Failed to parse config: {e}"),
            }
            .into()
        })
    }
}
