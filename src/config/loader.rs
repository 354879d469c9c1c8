use std::path::Path;
use thiserror::Error;
use tokio::fs;

use crate::config::models::{ConfigurationFile, EndpointTable};
use crate::config::validation::{ConfigValidator, ValidationError};

/// Endpoint table bundled into the binary, used whenever the configured file is unusable.
const DEFAULT_ENDPOINTS: &[u8] = include_bytes!("default_endpoints.json");

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Config path is a directory: {0}")]
    IsDirectory(String),

    #[error("Failed to parse JSON config: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error(transparent)]
    ValidationError(#[from] ValidationError),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Deserialize and validate an endpoint configuration document.
pub fn parse_configuration(source: &[u8]) -> ConfigResult<ConfigurationFile> {
    let config: ConfigurationFile = serde_json::from_slice(source)?;
    ConfigValidator::validate(&config)?;
    Ok(config)
}

/// Load the endpoint table from `path`, failing on any problem.
pub async fn load_endpoints<P: AsRef<Path>>(path: P) -> ConfigResult<EndpointTable> {
    let path = path.as_ref();
    let metadata = fs::metadata(path).await?;
    if metadata.is_dir() {
        return Err(ConfigError::IsDirectory(path.display().to_string()));
    }
    let content = fs::read(path).await?;
    Ok(parse_configuration(&content)?.into_table())
}

/// The bundled endpoint table.
pub fn default_endpoints() -> EndpointTable {
    match parse_configuration(DEFAULT_ENDPOINTS) {
        Ok(config) => config.into_table(),
        Err(e) => {
            tracing::error!("Bundled default endpoint configuration is invalid: {}", e);
            EndpointTable::empty()
        }
    }
}

/// Load the endpoint table from `path`, falling back to the bundled default table
/// when the file is missing, a directory, unreadable or invalid.
pub async fn load_endpoints_or_default<P: AsRef<Path>>(path: P) -> EndpointTable {
    let path = path.as_ref();
    match load_endpoints(path).await {
        Ok(table) => {
            tracing::info!(
                path = %path.display(),
                endpoints = table.len(),
                "Loaded endpoint configuration"
            );
            table
        }
        Err(ConfigError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "Config file not found, loading from default config");
            default_endpoints()
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Loading from default config"
            );
            default_endpoints()
        }
    }
}
