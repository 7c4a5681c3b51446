//! Ordered manifest loading and chained apply
//!
//! A directory of YAML manifests is flattened into one totally ordered
//! [`Chain`]: files in byte order of their names, documents in stream order
//! within each file. Applying the chain submits one document at a time, each
//! annotated with the identity of the document before it, and stops at the
//! first rejection.

#![deny(missing_docs)]

pub mod apply;
pub mod chain;
pub mod document;
pub mod error;
pub mod kube_target;
pub mod loader;

pub use apply::{apply_chain, ApplyReport, ManifestTarget};
pub use chain::{Chain, ChainLink};
pub use document::{Document, DocumentId};
pub use error::{ChainApplyError, LoadError, TargetError};
pub use kube_target::{create_client, KubeTarget};
pub use loader::{load_chain, load_chain_with, load_directory, load_directory_with, LoaderOptions};
