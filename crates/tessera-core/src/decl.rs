//! Declaration file formats shared by token and page loaders.

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::{CoreError, Result};

/// Supported declaration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclFormat {
    Toml,
    Yaml,
    Json,
}

impl DeclFormat {
    /// Detect the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("yaml" | "yml") => Ok(Self::Yaml),
            Some("json") => Ok(Self::Json),
            _ => Err(CoreError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    /// Whether the path has a recognized declaration extension.
    #[must_use]
    pub fn is_supported(path: &Path) -> bool {
        Self::from_path(path).is_ok()
    }
}

/// Deserialize declaration content in the given format.
pub fn read_value<T: DeserializeOwned>(content: &str, format: DeclFormat, path: &Path) -> Result<T> {
    match format {
        DeclFormat::Toml => toml::from_str(content).map_err(|e| CoreError::parse(path, e.to_string())),
        DeclFormat::Yaml => {
            serde_yaml::from_str(content).map_err(|e| CoreError::parse(path, e.to_string()))
        }
        DeclFormat::Json => {
            serde_json::from_str(content).map_err(|e| CoreError::parse(path, e.to_string()))
        }
    }
}
