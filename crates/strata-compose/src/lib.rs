//! Stack composition for strata
//!
//! Independently defined infrastructure units (network, cluster, ingress
//! controller, DNS) are wired together through named outputs and explicit
//! ordering constraints. The composition is checked completely in memory
//! (unresolved inputs, unknown units, cycles) and resolved into a
//! deterministic plan before any provisioning call is made.
//!
//! # Public API
//!
//! - [`Composition`]: arena of units plus data and ordering edges
//! - [`Plan`]: the resolved, ordered list of units
//! - [`Provisioner`], [`execute_plan`]: hand the plan to a provisioning engine
//! - [`platform::standard_composition`]: network, cluster, controller, DNS and workloads

#![deny(missing_docs)]

pub mod composition;
pub mod error;
pub mod execute;
pub mod plan;
pub mod platform;
pub mod provision;
pub mod unit;

pub use composition::Composition;
pub use error::{ComposeError, ExecutionError};
pub use execute::{execute_plan, ExecutionReport};
pub use plan::{Plan, PlannedUnit};
pub use provision::{
    DryRunProvisioner, MaterializeRequest, Materialized, ProvisionError, Provisioner,
};
pub use unit::{Handle, InputRef, Unit, UnitKind, UnitSpec};

/// Result type for composition operations
pub type Result<T> = std::result::Result<T, ComposeError>;
