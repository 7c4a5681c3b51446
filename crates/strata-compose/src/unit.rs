//! Units: named, typed deployable components
//!
//! A unit is a plain data record. It says what it consumes (inputs), what it
//! produces (outputs) and what it must wait for; how it is materialized is
//! the provisioning engine's business.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of infrastructure a unit stands for
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    /// Virtual network (subnets, routing, NAT)
    Network,
    /// Managed Kubernetes control plane plus its worker capacity
    Cluster,
    /// In-cluster controller, e.g. the load balancer controller
    Controller,
    /// Hosted zone and records
    Dns,
    /// Anything else; declares its outputs explicitly
    Custom(String),
}

impl UnitKind {
    /// Output slots a unit of this kind produces without being told
    pub fn default_outputs(&self) -> &'static [&'static str] {
        match self {
            UnitKind::Network => &["vpc"],
            UnitKind::Cluster => &["cluster", "kubectl_role"],
            UnitKind::Controller => &["load_balancer", "service_account"],
            UnitKind::Dns => &["hosted_zone", "record"],
            UnitKind::Custom(_) => &[],
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitKind::Network => write!(f, "network"),
            UnitKind::Cluster => write!(f, "cluster"),
            UnitKind::Controller => write!(f, "controller"),
            UnitKind::Dns => write!(f, "dns"),
            UnitKind::Custom(kind) => write!(f, "{}", kind),
        }
    }
}

/// Symbolic reference to one output of one unit
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Handle {
    /// Producing unit
    pub unit: String,
    /// Output slot on that unit
    pub output: String,
}

impl Handle {
    /// Reference `unit.output`
    pub fn new(unit: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            output: output.into(),
        }
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.unit, self.output)
    }
}

/// Where an input value comes from
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InputRef {
    /// An externally supplied configuration scalar
    External {
        /// Key in the composition's external configuration
        key: String,
    },
    /// An output of a previously added unit
    Output(Handle),
}

impl InputRef {
    /// Reference an external configuration value
    pub fn external(key: impl Into<String>) -> Self {
        InputRef::External { key: key.into() }
    }

    /// Reference `unit.output`
    pub fn output(unit: impl Into<String>, output: impl Into<String>) -> Self {
        InputRef::Output(Handle::new(unit, output))
    }

    /// Producing unit, for output references
    pub fn producer(&self) -> Option<&str> {
        match self {
            InputRef::External { .. } => None,
            InputRef::Output(handle) => Some(&handle.unit),
        }
    }
}

impl From<Handle> for InputRef {
    fn from(handle: Handle) -> Self {
        InputRef::Output(handle)
    }
}

impl fmt::Display for InputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputRef::External { key } => write!(f, "external '{}'", key),
            InputRef::Output(handle) => write!(f, "output {}", handle),
        }
    }
}

/// A named, typed deployable component
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    /// Name, unique within a composition
    pub name: String,
    /// What the unit provisions
    pub kind: UnitKind,
    /// Input slot → source
    pub inputs: BTreeMap<String, InputRef>,
    /// Output slots other units may consume
    pub outputs: BTreeSet<String>,
    /// Resource-level settings passed through to the provisioning engine
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub properties: serde_json::Map<String, serde_json::Value>,
    /// Units that must complete first, beyond data dependencies
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub explicit_dependencies: BTreeSet<String>,
}

impl Unit {
    /// Whether this unit declares `output`
    pub fn has_output(&self, output: &str) -> bool {
        self.outputs.contains(output)
    }

    /// Units this one consumes outputs from
    pub fn data_dependencies(&self) -> BTreeSet<&str> {
        self.inputs.values().filter_map(InputRef::producer).collect()
    }
}

/// Builder for a unit that needs more than the default outputs.
#[derive(Clone, Debug)]
pub struct UnitSpec {
    pub(crate) kind: UnitKind,
    pub(crate) name: String,
    pub(crate) inputs: BTreeMap<String, InputRef>,
    pub(crate) outputs: BTreeSet<String>,
    pub(crate) properties: serde_json::Map<String, serde_json::Value>,
}

impl UnitSpec {
    /// Start a spec with the kind's default outputs
    pub fn new(kind: UnitKind, name: impl Into<String>) -> Self {
        let outputs = kind
            .default_outputs()
            .iter()
            .map(|o| o.to_string())
            .collect();
        Self {
            kind,
            name: name.into(),
            inputs: BTreeMap::new(),
            outputs,
            properties: serde_json::Map::new(),
        }
    }

    /// Wire input `name` to `source`
    pub fn input(mut self, name: impl Into<String>, source: impl Into<InputRef>) -> Self {
        self.inputs.insert(name.into(), source.into());
        self
    }

    /// Wire input `name` to external configuration `key`
    pub fn external(self, name: impl Into<String>, key: impl Into<String>) -> Self {
        self.input(name, InputRef::external(key))
    }

    /// Declare an extra output slot
    pub fn output(mut self, name: impl Into<String>) -> Self {
        self.outputs.insert(name.into());
        self
    }

    /// Attach a resource-level setting
    pub fn property(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub(crate) fn into_unit(self) -> Unit {
        Unit {
            name: self.name,
            kind: self.kind,
            inputs: self.inputs,
            outputs: self.outputs,
            properties: self.properties,
            explicit_dependencies: BTreeSet::new(),
        }
    }
}
