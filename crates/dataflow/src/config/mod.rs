//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::Result;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

impl PipelineConfig {
    /// Load configuration from a file. `.yaml`/`.yml` files are parsed as
    /// YAML, everything else as JSON.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                Self::from_yaml(&content)
            }
            _ => Self::from_json(&content),
        }
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: PipelineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

impl GlobalConfig {
    /// Append `path_supplement` to the process `PATH`. Call once at start-up,
    /// before any connection is opened.
    pub fn apply_path_supplement(&self) -> Result<()> {
        let Some(extra) = self.path_supplement.as_deref().filter(|s| !s.is_empty()) else {
            return Ok(());
        };
        let current = std::env::var_os("PATH");
        let joined = supplemented_path(current.as_deref(), extra)?;
        tracing::debug!("Appending {} to PATH", extra);
        std::env::set_var("PATH", joined);
        Ok(())
    }
}

/// Join `extra` (itself a PATH-style list) after the entries of `current`.
pub fn supplemented_path(current: Option<&std::ffi::OsStr>, extra: &str) -> Result<OsString> {
    let mut entries: Vec<PathBuf> = current
        .map(|p| std::env::split_paths(p).collect())
        .unwrap_or_default();
    entries.extend(std::env::split_paths(extra));
    std::env::join_paths(entries).map_err(|e| {
        crate::error::FlowError::Config(format!("invalid global.pathSupplement: {}", e))
    })
}
