//! Resolved deployment plan
//!
//! The plan is the handoff to the provisioning engine: units in an order
//! that satisfies every data and explicit edge, each with the names of the
//! units it waits for.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::unit::Unit;

/// One unit at its position in the plan
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedUnit {
    /// Zero-based position in the plan
    pub position: usize,
    /// The unit itself
    pub unit: Unit,
    /// Units that must complete first (data and explicit edges)
    pub prerequisites: Vec<String>,
}

/// Topologically ordered list of units
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    units: Vec<PlannedUnit>,
}

impl Plan {
    pub(crate) fn new(units: Vec<PlannedUnit>) -> Self {
        Self { units }
    }

    /// Planned units in order
    pub fn iter(&self) -> impl Iterator<Item = &PlannedUnit> {
        self.units.iter()
    }

    /// Look up a planned unit by name
    pub fn get(&self, name: &str) -> Option<&PlannedUnit> {
        self.units.iter().find(|p| p.unit.name == name)
    }

    /// Unit names in plan order
    pub fn names(&self) -> Vec<&str> {
        self.units.iter().map(|p| p.unit.name.as_str()).collect()
    }

    /// Number of units
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether the plan has no units
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl<'a> IntoIterator for &'a Plan {
    type Item = &'a PlannedUnit;
    type IntoIter = std::slice::Iter<'a, PlannedUnit>;

    fn into_iter(self) -> Self::IntoIter {
        self.units.iter()
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for planned in &self.units {
            write!(
                f,
                "{:>3}  {:<28} {:<12}",
                planned.position + 1,
                planned.unit.name,
                planned.unit.kind.to_string()
            )?;
            if !planned.prerequisites.is_empty() {
                write!(f, " after {}", planned.prerequisites.join(", "))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use crate::unit::{InputRef, UnitKind};
    use crate::Composition;

    fn two_unit_plan() -> super::Plan {
        let mut c = Composition::new(BTreeMap::new());
        c.add_unit(UnitKind::Network, "network", Vec::<(String, InputRef)>::new())
            .unwrap();
        c.add_unit(
            UnitKind::Cluster,
            "cluster",
            [("vpc", InputRef::output("network", "vpc"))],
        )
        .unwrap();
        c.resolve().unwrap()
    }

    #[test]
    fn display_lists_positions_and_prerequisites() {
        let text = two_unit_plan().to_string();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].trim_start().starts_with("1  network"));
        assert!(lines[1].contains("cluster"));
        assert!(lines[1].ends_with("after network"));
    }

    #[test]
    fn serializes_for_engine_handoff() {
        let plan = two_unit_plan();
        let json = serde_json::to_value(&plan).unwrap();
        let units = json["units"].as_array().unwrap();
        assert_eq!(units[1]["unit"]["name"], "cluster");
        assert_eq!(units[1]["prerequisites"][0], "network");
        assert_eq!(units[1]["unit"]["inputs"]["vpc"]["output"]["unit"], "network");

        let back: super::Plan = serde_json::from_value(json).unwrap();
        assert_eq!(back, plan);
    }
}
