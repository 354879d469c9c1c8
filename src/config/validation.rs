use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::models::{ConfigurationFile, EndpointMapping, SUPPORTED_VERSION};

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Configuration validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Unsupported configuration version: expected 1.0, got '{found}'")]
    UnsupportedVersion { found: String },

    #[error("Configuration requires at least one endpoint")]
    MissingEndpoints,

    #[error("Invalid field '{field}' on endpoint {index}: {message}")]
    InvalidField {
        index: usize,
        field: String,
        message: String,
    },

    #[error("Invalid URL on endpoint {index}: {url} - {reason}")]
    InvalidUrl {
        index: usize,
        url: String,
        reason: String,
    },

    #[error("Invalid listen address: {address} - {reason}")]
    InvalidListenAddress { address: String, reason: String },
}

pub type ValidationResult<T> = Result<T, ValidationError>;

/// Configuration validator with detailed error reporting
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate a complete endpoint configuration file.
    ///
    /// Every problem is collected so a broken file can be fixed in one pass.
    pub fn validate(config: &ConfigurationFile) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if config.version != SUPPORTED_VERSION {
            errors.push(ValidationError::UnsupportedVersion {
                found: config.version.clone(),
            });
        }

        if config.endpoints.is_empty() {
            errors.push(ValidationError::MissingEndpoints);
        } else {
            for (index, endpoint) in config.endpoints.iter().enumerate() {
                if let Err(mut endpoint_errors) = Self::validate_endpoint(index, endpoint) {
                    errors.append(&mut endpoint_errors);
                }
            }
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ValidationError::ValidationFailed {
                message: Self::format_multiple_errors(errors),
            }),
        }
    }

    /// Validate a single forwarding rule
    fn validate_endpoint(
        index: usize,
        endpoint: &EndpointMapping,
    ) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if endpoint.path_prefix.is_empty() {
            errors.push(ValidationError::InvalidField {
                index,
                field: "PathPrefix".to_string(),
                message: "must not be empty".to_string(),
            });
        }

        if endpoint.url_path_prefix.is_empty() {
            errors.push(ValidationError::InvalidField {
                index,
                field: "URLPathPrefix".to_string(),
                message: "must not be empty".to_string(),
            });
        }

        if let Err(e) = Self::validate_url(index, &endpoint.url_host) {
            errors.push(e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate URL format
    fn validate_url(index: usize, url_str: &str) -> ValidationResult<()> {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    return Err(ValidationError::InvalidUrl {
                        index,
                        url: url_str.to_string(),
                        reason: "URL must use http:// or https:// scheme".to_string(),
                    });
                }

                if url.host().is_none() {
                    return Err(ValidationError::InvalidUrl {
                        index,
                        url: url_str.to_string(),
                        reason: "URL must have a valid host".to_string(),
                    });
                }

                Ok(())
            }
            Err(e) => Err(ValidationError::InvalidUrl {
                index,
                url: url_str.to_string(),
                reason: format!("Invalid URL format: {e}"),
            }),
        }
    }

    /// Validate and parse a `host:port` listen address
    pub fn validate_listen_address(address: &str) -> ValidationResult<SocketAddr> {
        address
            .parse::<SocketAddr>()
            .map_err(|e| ValidationError::InvalidListenAddress {
                address: address.to_string(),
                reason: format!("Must be in format 'IP:PORT' (e.g., '0.0.0.0:8080'): {e}"),
            })
    }

    /// Format multiple validation errors into a single message
    fn format_multiple_errors(errors: Vec<ValidationError>) -> String {
        let mut message = format!("Found {} validation error(s):\n", errors.len());
        for (i, error) in errors.iter().enumerate() {
            message.push_str(&format!("  {}. {}\n", i + 1, error));
        }
        message
    }
}
