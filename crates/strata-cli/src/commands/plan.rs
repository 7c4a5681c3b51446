//! Plan command

use std::path::Path;

use clap::{Args, ValueEnum};
use strata_compose::platform::standard_composition;
use strata_compose::{execute_plan, DryRunProvisioner, Plan};
use tracing::info;

use super::load_config;
use crate::Result;

/// How the plan is printed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One line per unit
    #[default]
    Text,
    /// The plan as JSON, for handing to a provisioning engine
    Json,
}

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Output format
    #[arg(long, short, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Walk the plan against a dry-run provisioner after printing it
    #[arg(long)]
    pub simulate: bool,
}

pub async fn run(args: PlanArgs, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let stack = config.stack_name();

    let composition = standard_composition(&config)?;
    let plan = composition.resolve()?;
    info!(stack = %stack, units = plan.len(), "resolved plan");

    println!("{}", render(&plan, args.output)?);

    if args.simulate {
        let report =
            execute_plan(&stack, &plan, composition.externals(), &DryRunProvisioner).await?;
        println!("simulated {} units for {}", report.materialized.len(), stack);
    }
    Ok(())
}

fn render(plan: &Plan, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Text => plan.to_string().trim_end().to_string(),
        OutputFormat::Json => serde_json::to_string_pretty(plan)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_common::DeploymentConfig;

    fn default_plan() -> Plan {
        standard_composition(&DeploymentConfig::default())
            .unwrap()
            .resolve()
            .unwrap()
    }

    #[test]
    fn text_output_lists_units_in_order() {
        let text = render(&default_plan(), OutputFormat::Text).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("network"));
        assert!(lines[2].contains("load-balancer-controller"));
        assert!(lines[3].contains("app-profile"));
    }

    #[test]
    fn json_output_parses_back() {
        let json = render(&default_plan(), OutputFormat::Json).unwrap();
        let plan: Plan = serde_json::from_str(&json).unwrap();
        assert_eq!(plan, default_plan());
    }
}
