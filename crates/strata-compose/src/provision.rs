//! Provisioning engine boundary
//!
//! The engine that actually creates networks, clusters and DNS records is
//! external. It is reached through the [`Provisioner`] trait: the plan
//! executor hands it one unit at a time with inputs already resolved to
//! concrete values and gets back the unit's materialized outputs.
//!
//! Re-submitting a unit that is already materialized must be a no-op on the
//! engine side; that is what makes re-running a partially applied plan safe.

use std::collections::BTreeMap;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::unit::Unit;

/// Failure reported by the provisioning engine for a single unit
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProvisionError {
    /// The engine refused or failed to create the unit
    #[error("provisioning rejected: {message}")]
    Rejected {
        /// Engine-provided reason
        message: String,
    },

    /// The engine reported success but left out a declared output
    #[error("output '{output}' was not materialized")]
    MissingOutput {
        /// The absent output slot
        output: String,
    },

    /// An input could not be resolved to a value at execution time
    #[error("input '{input}' has no value: {reason}")]
    UnboundInput {
        /// Input slot on the unit
        input: String,
        /// Why no value was available
        reason: String,
    },
}

impl ProvisionError {
    /// Create a rejection with the engine's message
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }
}

/// Everything the engine needs to materialize one unit
#[derive(Debug, Clone, PartialEq)]
pub struct MaterializeRequest {
    /// Name of the deployment stack the unit belongs to
    pub stack: String,
    /// Zero-based position in the plan
    pub position: usize,
    /// The unit to materialize
    pub unit: Unit,
    /// Input slot → concrete value
    pub inputs: BTreeMap<String, Value>,
}

/// Outputs produced by a materialized unit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Materialized {
    /// Output slot → concrete value (ARN, id, endpoint, ...)
    pub outputs: BTreeMap<String, Value>,
}

impl Materialized {
    /// Build from `(slot, value)` pairs
    pub fn from_outputs<I, K, V>(outputs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self {
            outputs: outputs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// External engine that turns units into real infrastructure
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Create or update the unit and return its outputs.
    async fn materialize(
        &self,
        request: &MaterializeRequest,
    ) -> Result<Materialized, ProvisionError>;
}

/// Provisioner that only logs and fabricates deterministic handles.
///
/// Lets an operator walk the exact order and input wiring of a plan
/// without touching any cloud account.
#[derive(Debug, Clone, Default)]
pub struct DryRunProvisioner;

#[async_trait]
impl Provisioner for DryRunProvisioner {
    async fn materialize(
        &self,
        request: &MaterializeRequest,
    ) -> Result<Materialized, ProvisionError> {
        info!(
            stack = %request.stack,
            position = request.position + 1,
            unit = %request.unit.name,
            kind = %request.unit.kind,
            inputs = ?request.inputs,
            "dry-run: would materialize unit"
        );

        Ok(Materialized::from_outputs(request.unit.outputs.iter().map(
            |output| {
                (
                    output.clone(),
                    format!("dryrun://{}/{}/{}", request.stack, request.unit.name, output),
                )
            },
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::{UnitKind, UnitSpec};

    #[tokio::test]
    async fn dry_run_fabricates_every_declared_output() {
        let request = MaterializeRequest {
            stack: "dev-platform".to_string(),
            position: 0,
            unit: UnitSpec::new(UnitKind::Cluster, "cluster").into_unit(),
            inputs: BTreeMap::new(),
        };
        let materialized = DryRunProvisioner.materialize(&request).await.unwrap();
        assert_eq!(
            materialized.outputs.get("cluster"),
            Some(&Value::String("dryrun://dev-platform/cluster/cluster".to_string()))
        );
        assert!(materialized.outputs.contains_key("kubectl_role"));
        assert_eq!(materialized.outputs.len(), 2);
    }

    #[test]
    fn materialized_from_pairs() {
        let m = Materialized::from_outputs([("vpc", "vpc-123")]);
        assert_eq!(m.outputs["vpc"], "vpc-123");
    }
}
