//! Error types shared across strata crates
//!
//! Errors are structured with fields so a failure names the thing that
//! broke (a config file, a field) rather than just a message.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for shared strata operations
#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// Validation error for user-supplied configuration
    #[error("validation error: {message}")]
    Validation {
        /// Description of what's invalid
        message: String,
        /// The invalid field path (e.g., "network.maxAzs")
        field: Option<String>,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
    },

    /// Configuration file could not be read or parsed
    #[error("config error [{}]: {message}", .path.display())]
    Config {
        /// Path of the config file
        path: PathBuf,
        /// Description of what failed
        message: String,
    },

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Description of what failed
        message: String,
        /// Context where the error occurred (e.g., "create_client")
        context: String,
    },
}

impl Error {
    /// Create a validation error with a field path
    pub fn validation_for_field(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
            field: Some(field.into()),
        }
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
        }
    }

    /// Create a config error for the given file
    pub fn config(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Config {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Create an internal error with context
    pub fn internal_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: context.into(),
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Kube { source } => {
                // Connection and timeout failures are transient; a 4xx
                // (unauthorized, forbidden, not found) will not fix itself
                !matches!(
                    source,
                    kube::Error::Api(ae) if (400..500).contains(&ae.code)
                )
            }
            Error::Validation { .. } => false,
            Error::Serialization { .. } => false,
            Error::Config { .. } => false,
            Error::Internal { .. } => true,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use kube::core::ErrorResponse;

    pub(crate) fn api_error(code: u16) -> Error {
        Error::from(kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: format!("request failed with {code}"),
            reason: "Forbidden".to_string(),
            code,
        }))
    }

    #[test]
    fn validation_errors_carry_field_path() {
        let err = Error::validation_for_field("network.maxAzs", "must be at least 1");
        match &err {
            Error::Validation { field, .. } => assert_eq!(field.as_deref(), Some("network.maxAzs")),
            _ => panic!("Expected Validation variant"),
        }
        assert!(err.to_string().contains("must be at least 1"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn config_error_names_the_file() {
        let err = Error::config("/etc/strata.yaml", "missing stage");
        assert!(err.to_string().contains("/etc/strata.yaml"));
        assert!(err.to_string().contains("missing stage"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn serialization_errors_are_not_retryable() {
        assert!(!Error::serialization("bad").is_retryable());
    }

    #[test]
    fn internal_errors_are_retryable() {
        let err = Error::internal_with_context("create_client", "connection reset");
        assert!(err.is_retryable());
        assert!(err.to_string().contains("[create_client]"));
    }

    #[test]
    fn client_errors_from_the_api_server_are_final() {
        assert!(!api_error(401).is_retryable());
        assert!(!api_error(403).is_retryable());
        assert!(!api_error(404).is_retryable());
    }

    #[test]
    fn server_errors_from_the_api_server_are_retried() {
        assert!(api_error(503).is_retryable());
        assert!(api_error(500).is_retryable());
        assert!(api_error(503).to_string().starts_with("kubernetes error:"));
    }
}
