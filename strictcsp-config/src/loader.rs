// Configuration file loaders

use std::fs;
use std::path::Path;
use tracing::debug;

use crate::config::StrictCspConfig;
use crate::error::{ConfigError, Result};

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Toml,
}

impl FileFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(FileFormat::Json),
            "toml" => Some(FileFormat::Toml),
            _ => None,
        }
    }
}

/// Configuration file loader
#[derive(Debug, Clone, Copy)]
pub struct ConfigLoader {
    format: FileFormat,
}

impl ConfigLoader {
    pub fn new(format: FileFormat) -> Self {
        Self { format }
    }

    /// Auto-detect format from file extension
    pub fn auto(path: impl AsRef<Path>) -> Result<Self> {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| ConfigError::LoadError("No file extension found".to_string()))?;

        let format = FileFormat::from_extension(ext)
            .ok_or_else(|| ConfigError::LoadError(format!("Unsupported format: {}", ext)))?;

        Ok(Self::new(format))
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    /// Load configuration from file
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<StrictCspConfig> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadError(format!("Failed to read {:?}: {}", path, e)))?;

        debug!(path = ?path, format = ?self.format, "Loading strict CSP configuration");
        self.parse(&content)
    }

    /// Parse configuration from string
    pub fn parse(&self, content: &str) -> Result<StrictCspConfig> {
        match self.format {
            FileFormat::Json => serde_json::from_str(content)
                .map_err(|e| ConfigError::ParseError(format!("JSON parse error: {}", e))),
            FileFormat::Toml => toml::from_str(content)
                .map_err(|e| ConfigError::ParseError(format!("TOML parse error: {}", e))),
        }
    }
}

impl StrictCspConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        ConfigLoader::new(FileFormat::Toml).parse(content)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        ConfigLoader::new(FileFormat::Json).parse(content)
    }

    /// Load a `.toml` or `.json` file, format chosen by extension.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::auto(path.as_ref())?.load_file(path)
    }

    /// Load a file, apply `STRICT_CSP_*` overrides and validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::load_file(path)?;
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }
}
