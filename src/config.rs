//! Shader system configuration

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{IoErrorContext, ShaderError, ShaderResult};

/// Shader system configuration
///
/// Every field has a default, so a config file only needs the keys it
/// changes:
///
/// ```toml
/// source_root = "assets/shaders"
/// max_texture_units = 32
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderConfig {
    /// Directory descriptor and stage paths are resolved against
    pub source_root: PathBuf,

    /// Passed as the transpose flag of every matrix upload
    pub transpose_matrices: bool,

    /// Texture units the driver offers; exceeding it only logs a warning
    pub max_texture_units: u8,

    /// Enable the file watcher
    pub hot_reload: bool,

    /// Debounce time in milliseconds
    pub debounce_ms: u64,
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self {
            source_root: PathBuf::from("shaders"),
            transpose_matrices: false,
            max_texture_units: 16,
            hot_reload: true,
            debounce_ms: 100,
        }
    }
}

impl ShaderConfig {
    /// Config rooted at `source_root`, defaults elsewhere
    pub fn with_source_root(source_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            ..Self::default()
        }
    }

    pub fn from_toml_str(text: &str) -> ShaderResult<Self> {
        Self::parse(text, "<inline>")
    }

    /// Load a TOML config file
    pub fn load(path: impl AsRef<Path>) -> ShaderResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).io_context(path)?;
        Self::parse(&text, &path.display().to_string())
    }

    fn parse(text: &str, origin: &str) -> ShaderResult<Self> {
        toml::from_str(text).map_err(|e| ShaderError::ConfigError {
            path: origin.to_string(),
            error: e.to_string(),
        })
    }

    /// Resolve a descriptor or stage path against `source_root`
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        self.source_root.join(path)
    }
}
