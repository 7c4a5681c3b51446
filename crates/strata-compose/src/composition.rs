//! Composition graph
//!
//! Units live in an arena (`Vec<Unit>`) addressed by insertion index. Edges
//! are stored as per-unit prerequisite sets holding both the data edges
//! implied by output references and explicitly declared ordering edges.
//!
//! Inputs may only reference units added earlier, so data edges alone can
//! never form a cycle. Explicit edges are checked for reachability before
//! they are inserted; a rejected edge leaves the graph untouched.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, HashMap};

use tracing::{debug, trace};

use crate::error::ComposeError;
use crate::plan::{Plan, PlannedUnit};
use crate::unit::{Handle, InputRef, Unit, UnitKind, UnitSpec};
use crate::Result;

/// Ordered collection of units plus their data and explicit edges
#[derive(Clone, Debug, Default)]
pub struct Composition {
    units: Vec<Unit>,
    index: HashMap<String, usize>,
    /// prerequisites[i] = indices of units that must complete before unit i
    prerequisites: Vec<BTreeSet<usize>>,
    externals: BTreeMap<String, String>,
}

impl Composition {
    /// Create an empty composition over the given external configuration
    pub fn new(externals: BTreeMap<String, String>) -> Self {
        Self {
            externals,
            ..Default::default()
        }
    }

    /// Add a unit of `kind` with the kind's default outputs.
    ///
    /// Every input must name an external configuration key or an output
    /// of a unit added earlier.
    pub fn add_unit<I, K>(&mut self, kind: UnitKind, name: &str, inputs: I) -> Result<&Unit>
    where
        I: IntoIterator<Item = (K, InputRef)>,
        K: Into<String>,
    {
        let spec = inputs
            .into_iter()
            .fold(UnitSpec::new(kind, name), |spec, (slot, source)| {
                spec.input(slot, source)
            });
        self.add_unit_spec(spec)
    }

    /// Add a unit described by a [`UnitSpec`].
    pub fn add_unit_spec(&mut self, spec: UnitSpec) -> Result<&Unit> {
        if self.index.contains_key(&spec.name) {
            return Err(ComposeError::DuplicateUnit { name: spec.name });
        }

        let mut prerequisites = BTreeSet::new();
        for (slot, source) in &spec.inputs {
            match self.check_input(source) {
                Some(producer) => {
                    prerequisites.extend(producer);
                }
                None => {
                    return Err(ComposeError::UnresolvedInput {
                        unit: spec.name.clone(),
                        input: slot.clone(),
                        reference: source.to_string(),
                    });
                }
            }
        }

        let unit = spec.into_unit();
        let idx = self.units.len();
        debug!(
            unit = %unit.name,
            kind = %unit.kind,
            inputs = unit.inputs.len(),
            "added unit"
        );
        self.index.insert(unit.name.clone(), idx);
        self.units.push(unit);
        self.prerequisites.push(prerequisites);
        Ok(&self.units[idx])
    }

    /// Returns `Some(producer index)` for a resolvable input, `Some(None)`
    /// for a known external, `None` when unresolved.
    fn check_input(&self, source: &InputRef) -> Option<Option<usize>> {
        match source {
            InputRef::External { key } => self.externals.contains_key(key).then_some(None),
            InputRef::Output(handle) => {
                let idx = *self.index.get(&handle.unit)?;
                self.units[idx].has_output(&handle.output).then_some(Some(idx))
            }
        }
    }

    /// Require `dependency` to complete before `dependent` begins.
    ///
    /// Declaring an edge that already exists is a no-op.
    pub fn declare_dependency(&mut self, dependent: &str, dependency: &str) -> Result<()> {
        let to = self.lookup(dependent)?;
        let from = self.lookup(dependency)?;

        if let Some(path) = self.ordering_path(to, from) {
            return Err(ComposeError::Cycle {
                dependent: dependent.to_string(),
                dependency: dependency.to_string(),
                path: path.into_iter().map(|i| self.units[i].name.clone()).collect(),
            });
        }

        self.prerequisites[to].insert(from);
        self.units[to]
            .explicit_dependencies
            .insert(dependency.to_string());
        trace!(dependent, dependency, "declared dependency");
        Ok(())
    }

    /// If `first` already runs before (or is) `last`, return that ordering
    /// as a list of indices from `first` to `last`.
    fn ordering_path(&self, first: usize, last: usize) -> Option<Vec<usize>> {
        if first == last {
            return Some(vec![first]);
        }

        // DFS from `last` through prerequisites, looking for `first`
        let mut parent: HashMap<usize, usize> = HashMap::new();
        let mut stack = vec![last];
        let mut seen = BTreeSet::from([last]);

        while let Some(node) = stack.pop() {
            for &pre in &self.prerequisites[node] {
                if !seen.insert(pre) {
                    continue;
                }
                parent.insert(pre, node);
                if pre == first {
                    let mut path = vec![first];
                    let mut cur = first;
                    while let Some(&next) = parent.get(&cur) {
                        path.push(next);
                        cur = next;
                    }
                    return Some(path);
                }
                stack.push(pre);
            }
        }
        None
    }

    /// Topologically ordered plan of all units.
    ///
    /// Among units whose prerequisites are satisfied, the one added first
    /// is scheduled first, so the same sequence of calls always yields the
    /// same plan.
    pub fn resolve(&self) -> Result<Plan> {
        let n = self.units.len();
        let mut remaining: Vec<usize> = self.prerequisites.iter().map(BTreeSet::len).collect();
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (idx, pres) in self.prerequisites.iter().enumerate() {
            for &pre in pres {
                dependents[pre].push(idx);
            }
        }

        let mut ready: BinaryHeap<Reverse<usize>> = remaining
            .iter()
            .enumerate()
            .filter(|(_, count)| **count == 0)
            .map(|(idx, _)| Reverse(idx))
            .collect();

        let mut order = Vec::with_capacity(n);
        while let Some(Reverse(idx)) = ready.pop() {
            order.push(idx);
            for &dep in &dependents[idx] {
                remaining[dep] -= 1;
                if remaining[dep] == 0 {
                    ready.push(Reverse(dep));
                }
            }
        }

        if order.len() != n {
            // Edge insertion rejects cycles, so this only trips on a broken invariant
            let stuck: Vec<String> = (0..n)
                .filter(|i| remaining[*i] > 0)
                .map(|i| self.units[i].name.clone())
                .collect();
            return Err(ComposeError::Cycle {
                dependent: stuck.first().cloned().unwrap_or_default(),
                dependency: stuck.last().cloned().unwrap_or_default(),
                path: stuck,
            });
        }

        let units = order
            .iter()
            .enumerate()
            .map(|(position, &idx)| PlannedUnit {
                position,
                unit: self.units[idx].clone(),
                prerequisites: self.prerequisites[idx]
                    .iter()
                    .map(|&p| self.units[p].name.clone())
                    .collect(),
            })
            .collect();

        Ok(Plan::new(units))
    }

    /// Handle to `output` of `unit`, for wiring into later units.
    pub fn output_of(&self, unit: &str, output: &str) -> Result<Handle> {
        let idx = self.lookup(unit)?;
        if !self.units[idx].has_output(output) {
            return Err(ComposeError::MissingOutput {
                unit: unit.to_string(),
                output: output.to_string(),
            });
        }
        Ok(Handle::new(unit, output))
    }

    fn lookup(&self, name: &str) -> Result<usize> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| ComposeError::UnknownUnit {
                name: name.to_string(),
            })
    }

    /// Look up a unit by name
    pub fn unit(&self, name: &str) -> Option<&Unit> {
        self.index.get(name).map(|&idx| &self.units[idx])
    }

    /// Units in insertion order
    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.units.iter()
    }

    /// Names of units that must complete before `name`, in insertion order
    pub fn prerequisites_of(&self, name: &str) -> Result<Vec<&str>> {
        let idx = self.lookup(name)?;
        Ok(self.prerequisites[idx]
            .iter()
            .map(|&p| self.units[p].name.as_str())
            .collect())
    }

    /// External configuration scalars
    pub fn externals(&self) -> &BTreeMap<String, String> {
        &self.externals
    }

    /// Number of units
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether no units were added
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn externals() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("region".to_string(), "us-east-1".to_string()),
            ("domain_name".to_string(), "example.com".to_string()),
        ])
    }

    fn no_inputs() -> Vec<(String, InputRef)> {
        Vec::new()
    }

    fn names(plan: &Plan) -> Vec<&str> {
        plan.iter().map(|p| p.unit.name.as_str()).collect()
    }

    /// network → cluster → controller → dns, wired through outputs
    fn platform() -> Composition {
        let mut c = Composition::new(externals());
        c.add_unit(
            UnitKind::Network,
            "network",
            [("region", InputRef::external("region"))],
        )
        .unwrap();
        let vpc = c.output_of("network", "vpc").unwrap();
        c.add_unit(UnitKind::Cluster, "cluster", [("vpc", InputRef::from(vpc))])
            .unwrap();
        let cluster = c.output_of("cluster", "cluster").unwrap();
        c.add_unit(
            UnitKind::Controller,
            "controller",
            [("cluster", InputRef::from(cluster.clone()))],
        )
        .unwrap();
        let lb = c.output_of("controller", "load_balancer").unwrap();
        c.add_unit(
            UnitKind::Dns,
            "dns",
            [
                ("cluster", InputRef::from(cluster)),
                ("load_balancer", InputRef::from(lb)),
                ("domain_name", InputRef::external("domain_name")),
            ],
        )
        .unwrap();
        c
    }

    #[test]
    fn data_edges_order_the_plan() {
        let plan = platform().resolve().unwrap();
        assert_eq!(names(&plan), vec!["network", "cluster", "controller", "dns"]);
        assert_eq!(plan.get("dns").unwrap().prerequisites, vec!["cluster", "controller"]);
        assert!(plan.get("network").unwrap().prerequisites.is_empty());
    }

    #[test]
    fn ties_break_by_insertion_order() {
        let mut c = Composition::new(BTreeMap::new());
        for name in ["zeta", "alpha", "mid"] {
            c.add_unit(UnitKind::Custom("x".into()), name, no_inputs())
                .unwrap();
        }
        let plan = c.resolve().unwrap();
        assert_eq!(names(&plan), vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn explicit_edges_reorder_independent_units() {
        let mut c = Composition::new(BTreeMap::new());
        for name in ["a", "b", "c"] {
            c.add_unit(UnitKind::Custom("x".into()), name, no_inputs())
                .unwrap();
        }
        c.declare_dependency("a", "c").unwrap();
        let plan = c.resolve().unwrap();
        assert_eq!(names(&plan), vec!["b", "c", "a"]);
        assert!(c.unit("a").unwrap().explicit_dependencies.contains("c"));
    }

    #[test]
    fn every_edge_points_forward() {
        let mut c = platform();
        c.add_unit(UnitKind::Custom("monitoring".into()), "monitoring", no_inputs())
            .unwrap();
        c.declare_dependency("monitoring", "cluster").unwrap();
        c.declare_dependency("dns", "monitoring").unwrap();

        let plan = c.resolve().unwrap();
        for planned in plan.iter() {
            for pre in c.prerequisites_of(&planned.unit.name).unwrap() {
                let pre_pos = plan.get(pre).unwrap().position;
                assert!(
                    pre_pos < planned.position,
                    "{} must come before {}",
                    pre,
                    planned.unit.name
                );
            }
        }
        assert_eq!(
            names(&plan),
            vec!["network", "cluster", "controller", "monitoring", "dns"]
        );
    }

    #[test]
    fn resolve_is_deterministic_and_repeatable() {
        let first = platform().resolve().unwrap();
        let second = platform().resolve().unwrap();
        assert_eq!(first, second);

        let c = platform();
        assert_eq!(c.resolve().unwrap(), c.resolve().unwrap());
    }

    #[test]
    fn cycle_is_rejected_without_mutation() {
        let mut c = platform();
        let before = c.prerequisites_of("network").unwrap().len();

        let err = c.declare_dependency("network", "dns").unwrap_err();
        match &err {
            ComposeError::Cycle {
                dependent,
                dependency,
                path,
            } => {
                assert_eq!(dependent, "network");
                assert_eq!(dependency, "dns");
                assert_eq!(path.first().map(String::as_str), Some("network"));
                assert_eq!(path.last().map(String::as_str), Some("dns"));
            }
            other => panic!("expected cycle, got {other:?}"),
        }

        assert_eq!(c.prerequisites_of("network").unwrap().len(), before);
        assert!(c.unit("network").unwrap().explicit_dependencies.is_empty());
        assert_eq!(
            names(&c.resolve().unwrap()),
            vec!["network", "cluster", "controller", "dns"]
        );
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let mut c = platform();
        let err = c.declare_dependency("cluster", "cluster").unwrap_err();
        assert!(matches!(err, ComposeError::Cycle { .. }));
    }

    #[test]
    fn cycle_through_explicit_edges() {
        let mut c = Composition::new(BTreeMap::new());
        for name in ["a", "b", "c"] {
            c.add_unit(UnitKind::Custom("x".into()), name, no_inputs())
                .unwrap();
        }
        c.declare_dependency("b", "a").unwrap();
        c.declare_dependency("c", "b").unwrap();
        let err = c.declare_dependency("a", "c").unwrap_err();
        match err {
            ComposeError::Cycle { path, .. } => assert_eq!(path, vec!["a", "b", "c"]),
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn repeated_edge_is_noop() {
        let mut c = platform();
        c.declare_dependency("dns", "controller").unwrap();
        c.declare_dependency("dns", "controller").unwrap();
        assert_eq!(
            c.prerequisites_of("dns").unwrap(),
            vec!["cluster", "controller"]
        );
    }

    #[test]
    fn unknown_units_are_rejected() {
        let mut c = platform();
        assert_eq!(
            c.declare_dependency("dns", "ghost").unwrap_err(),
            ComposeError::UnknownUnit {
                name: "ghost".to_string()
            }
        );
        assert_eq!(
            c.declare_dependency("ghost", "dns").unwrap_err(),
            ComposeError::UnknownUnit {
                name: "ghost".to_string()
            }
        );
        assert!(matches!(
            c.output_of("ghost", "vpc"),
            Err(ComposeError::UnknownUnit { .. })
        ));
    }

    #[test]
    fn forward_references_are_unresolved() {
        let mut c = Composition::new(externals());
        let err = c
            .add_unit(
                UnitKind::Cluster,
                "cluster",
                [("vpc", InputRef::output("network", "vpc"))],
            )
            .unwrap_err();
        assert_eq!(
            err,
            ComposeError::UnresolvedInput {
                unit: "cluster".to_string(),
                input: "vpc".to_string(),
                reference: "output network.vpc".to_string(),
            }
        );
        assert!(c.is_empty());
    }

    #[test]
    fn undeclared_outputs_and_externals_are_unresolved() {
        let mut c = Composition::new(externals());
        c.add_unit(UnitKind::Network, "network", no_inputs())
            .unwrap();

        let err = c
            .add_unit(
                UnitKind::Cluster,
                "cluster",
                [("subnets", InputRef::output("network", "subnets"))],
            )
            .unwrap_err();
        assert!(matches!(err, ComposeError::UnresolvedInput { .. }));

        let err = c
            .add_unit(
                UnitKind::Cluster,
                "cluster",
                [("account", InputRef::external("account"))],
            )
            .unwrap_err();
        assert!(err.to_string().contains("external 'account'"));
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn missing_output_lookup() {
        let c = platform();
        assert_eq!(
            c.output_of("network", "hosted_zone").unwrap_err(),
            ComposeError::MissingOutput {
                unit: "network".to_string(),
                output: "hosted_zone".to_string(),
            }
        );
        assert_eq!(
            c.output_of("network", "vpc").unwrap(),
            Handle::new("network", "vpc")
        );
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut c = platform();
        let err = c
            .add_unit(UnitKind::Network, "network", no_inputs())
            .unwrap_err();
        assert_eq!(
            err,
            ComposeError::DuplicateUnit {
                name: "network".to_string()
            }
        );
        assert_eq!(c.len(), 4);
    }

    #[test]
    fn custom_outputs_via_spec() {
        let mut c = Composition::new(BTreeMap::new());
        c.add_unit_spec(UnitSpec::new(UnitKind::Custom("queue".into()), "jobs").output("queue_url"))
            .unwrap();
        let handle = c.output_of("jobs", "queue_url").unwrap();
        c.add_unit_spec(
            UnitSpec::new(UnitKind::Custom("worker".into()), "worker").input("queue", handle),
        )
        .unwrap();
        assert_eq!(c.prerequisites_of("worker").unwrap(), vec!["jobs"]);
    }

    #[test]
    fn empty_composition_resolves_to_empty_plan() {
        let plan = Composition::default().resolve().unwrap();
        assert!(plan.is_empty());
    }
}
