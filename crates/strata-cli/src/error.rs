//! Error types for the CLI

use strata_compose::{ComposeError, ExecutionError};
use strata_manifest::{ChainApplyError, LoadError, TargetError};

/// CLI Result type
pub type Result<T> = std::result::Result<T, Error>;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] strata_common::Error),

    #[error("composition error: {0}")]
    Compose(#[from] ComposeError),

    #[error("plan execution failed: {0}")]
    Execution(#[from] ExecutionError),

    #[error("manifest load failed: {0}")]
    Load(#[from] LoadError),

    #[error("manifest apply failed: {0}")]
    Apply(#[from] ChainApplyError),

    #[error("cluster error: {0}")]
    Target(#[from] TargetError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("validation error: {message}")]
    Validation { message: String },
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
        }
    }
}
