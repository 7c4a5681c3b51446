//! Plan execution against a provisioning engine
//!
//! Units are submitted strictly in plan order, one at a time. Each unit's
//! inputs are bound to external configuration values or to outputs that
//! earlier units actually materialized. The first failure stops execution:
//! later units are not attempted and earlier ones are left in place.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{error, info};

use crate::error::ExecutionError;
use crate::plan::{Plan, PlannedUnit};
use crate::provision::{MaterializeRequest, Materialized, ProvisionError, Provisioner};
use crate::unit::InputRef;

/// Outcome of a fully executed plan
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionReport {
    /// `(unit name, outputs)` in the order units were materialized
    pub materialized: Vec<(String, Materialized)>,
}

impl ExecutionReport {
    /// Outputs of a materialized unit
    pub fn outputs_of(&self, unit: &str) -> Option<&Materialized> {
        self.materialized
            .iter()
            .find(|(name, _)| name == unit)
            .map(|(_, m)| m)
    }

    fn completed(&self) -> Vec<String> {
        self.materialized.iter().map(|(n, _)| n.clone()).collect()
    }
}

/// Materialize every unit of `plan` in order.
pub async fn execute_plan<P>(
    stack: &str,
    plan: &Plan,
    externals: &BTreeMap<String, String>,
    provisioner: &P,
) -> Result<ExecutionReport, ExecutionError>
where
    P: Provisioner + ?Sized,
{
    let total = plan.len();
    let mut report = ExecutionReport::default();

    for planned in plan {
        let fail = |source: ProvisionError, report: &ExecutionReport| {
            error!(
                unit = %planned.unit.name,
                position = planned.position + 1,
                total,
                error = %source,
                "unit failed, halting plan"
            );
            ExecutionError {
                unit: planned.unit.name.clone(),
                position: planned.position,
                total,
                completed: report.completed(),
                source,
            }
        };

        let inputs = bind_inputs(planned, externals, &report).map_err(|e| fail(e, &report))?;
        let request = MaterializeRequest {
            stack: stack.to_string(),
            position: planned.position,
            unit: planned.unit.clone(),
            inputs,
        };

        let materialized = provisioner
            .materialize(&request)
            .await
            .map_err(|e| fail(e, &report))?;

        if let Some(missing) = planned
            .unit
            .outputs
            .iter()
            .find(|o| !materialized.outputs.contains_key(*o))
        {
            return Err(fail(
                ProvisionError::MissingOutput {
                    output: missing.clone(),
                },
                &report,
            ));
        }

        info!(
            unit = %planned.unit.name,
            position = planned.position + 1,
            total,
            "unit materialized"
        );
        report
            .materialized
            .push((planned.unit.name.clone(), materialized));
    }

    Ok(report)
}

fn bind_inputs(
    planned: &PlannedUnit,
    externals: &BTreeMap<String, String>,
    report: &ExecutionReport,
) -> Result<BTreeMap<String, Value>, ProvisionError> {
    planned
        .unit
        .inputs
        .iter()
        .map(|(slot, source)| {
            let value = match source {
                InputRef::External { key } => externals
                    .get(key)
                    .map(|v| Value::String(v.clone()))
                    .ok_or_else(|| ProvisionError::UnboundInput {
                        input: slot.clone(),
                        reason: format!("external '{}' is not set", key),
                    })?,
                InputRef::Output(handle) => report
                    .outputs_of(&handle.unit)
                    .and_then(|m| m.outputs.get(&handle.output))
                    .cloned()
                    .ok_or_else(|| ProvisionError::UnboundInput {
                        input: slot.clone(),
                        reason: format!("{} was not materialized", handle),
                    })?,
            };
            Ok((slot.clone(), value))
        })
        .collect()
}
