//! Manifest load and apply errors

use std::path::PathBuf;

use thiserror::Error;

use crate::document::DocumentId;

/// A directory, file or document could not be turned into chain elements.
///
/// Every variant aborts the whole load: no partial chain is returned.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The directory itself could not be listed
    #[error("failed to read directory {}: {source}", .path.display())]
    ReadDirectory {
        /// Directory being listed
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// A manifest file could not be read
    #[error("failed to read {}: {source}", .path.display())]
    ReadFile {
        /// File being read
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// A manifest file is not a valid YAML stream
    #[error("failed to parse {}: {message}", .path.display())]
    Parse {
        /// File being parsed
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// A document parsed but lacks the identity fields every resource needs
    #[error("invalid document {index} in {}: {message}", .path.display())]
    InvalidDocument {
        /// File containing the document
        path: PathBuf,
        /// Index of the document among the file's non-empty documents
        index: usize,
        /// What is missing or malformed
        message: String,
    },

    /// Two documents would get the same chain identity
    #[error("duplicate document id '{id}' in {} and {}", .first.display(), .second.display())]
    DuplicateDocument {
        /// The colliding id
        id: DocumentId,
        /// File of the first occurrence
        first: PathBuf,
        /// File of the second occurrence
        second: PathBuf,
    },
}

/// Failure to apply a single document to the target cluster
#[derive(Debug, Error)]
pub enum TargetError {
    /// The cluster could not be reached or discovery failed
    #[error("cluster access failed: {0}")]
    Cluster(#[from] strata_common::Error),

    /// The API server does not serve the document's type
    #[error("unknown resource type {api_version}/{kind}")]
    UnknownKind {
        /// Document apiVersion
        api_version: String,
        /// Document kind
        kind: String,
    },

    /// The API server refused the document
    #[error("failed to apply {kind}/{name}: {message}")]
    Rejected {
        /// Document kind
        kind: String,
        /// Document metadata.name
        name: String,
        /// Server message
        message: String,
    },
}

impl TargetError {
    /// Create a rejection for `kind/name`
    pub fn rejected(
        kind: impl Into<String>,
        name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Rejected {
            kind: kind.into(),
            name: name.into(),
            message: message.into(),
        }
    }
}

/// A chain stopped at a rejected document
#[derive(Debug, Error)]
#[error("document '{id}' failed at position {} of {total}: {source}", .position + 1)]
pub struct ChainApplyError {
    /// Id of the failing document
    pub id: DocumentId,
    /// Zero-based position of the failing document
    pub position: usize,
    /// Chain length
    pub total: usize,
    /// Documents applied before the failure, in order; they are left in place
    pub applied: Vec<DocumentId>,
    /// Why the document failed
    #[source]
    pub source: TargetError,
}
