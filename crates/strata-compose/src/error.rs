//! Composition and execution errors
//!
//! Composition errors are configuration bugs found from in-memory graph
//! state. They are never retried and abort the whole composition.

use thiserror::Error;

use crate::provision::ProvisionError;

/// Error raised while building or resolving a composition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComposeError {
    /// An input references an external key or unit output that does not exist yet
    #[error("unit '{unit}' input '{input}' references unresolved {reference}")]
    UnresolvedInput {
        /// Unit being added
        unit: String,
        /// Name of the offending input slot
        input: String,
        /// Human-readable form of the reference (e.g. `output network.vpc`)
        reference: String,
    },

    /// A unit name was referenced that was never added
    #[error("unknown unit '{name}'")]
    UnknownUnit {
        /// The missing unit name
        name: String,
    },

    /// Adding a dependency would close a cycle
    #[error("dependency {dependent} -> {dependency} would create a cycle: {}", .path.join(" -> "))]
    Cycle {
        /// Unit that was to wait
        dependent: String,
        /// Unit that was to run first
        dependency: String,
        /// Existing ordering from `dependent` to `dependency`, each unit running before the next
        path: Vec<String>,
    },

    /// A unit never declared the requested output
    #[error("unit '{unit}' has no output '{output}'")]
    MissingOutput {
        /// Unit that was queried
        unit: String,
        /// Requested output slot
        output: String,
    },

    /// A unit with the same name was already added
    #[error("unit '{name}' already exists")]
    DuplicateUnit {
        /// The duplicated name
        name: String,
    },
}

impl ComposeError {
    /// Name of the unit the error is about
    pub fn unit(&self) -> &str {
        match self {
            ComposeError::UnresolvedInput { unit, .. } => unit,
            ComposeError::UnknownUnit { name } => name,
            ComposeError::Cycle { dependent, .. } => dependent,
            ComposeError::MissingOutput { unit, .. } => unit,
            ComposeError::DuplicateUnit { name } => name,
        }
    }
}

/// A unit failed to materialize during plan execution.
///
/// Units before `position` were materialized and are left in place;
/// units after it were not attempted.
#[derive(Debug, Error)]
#[error("unit '{unit}' failed at position {} of {total}: {source}", .position + 1)]
pub struct ExecutionError {
    /// Name of the failing unit
    pub unit: String,
    /// Zero-based position of the unit in the plan
    pub position: usize,
    /// Number of units in the plan
    pub total: usize,
    /// Names of units materialized before the failure
    pub completed: Vec<String>,
    /// Underlying provisioning failure
    #[source]
    pub source: ProvisionError,
}
