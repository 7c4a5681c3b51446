//! Common types for strata: errors, YAML parsing, retry, and deployment config

#![deny(missing_docs)]

pub mod config;
pub mod error;
pub mod retry;
pub mod yaml;

pub use config::DeploymentConfig;
pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Field manager name used for server-side apply
pub const FIELD_MANAGER: &str = "strata";

/// Annotation recording a document's position-derived identity in the chain
pub const CHAIN_ID_ANNOTATION: &str = "strata.io/chain-id";

/// Annotation naming the document that must be applied before this one
pub const DEPENDS_ON_ANNOTATION: &str = "strata.io/depends-on";

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "STRATA_CONFIG";

/// Config file looked up in the working directory when nothing else is set
pub const DEFAULT_CONFIG_FILE: &str = "strata.yaml";
