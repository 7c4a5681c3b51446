//! The standard platform stack
//!
//! Network, managed cluster with serverless capacity, load balancer
//! controller, a capacity profile for the application namespace, and
//! optionally DNS and the workload manifests:
//!
//! ```text
//! network ──▶ cluster ──▶ load-balancer-controller ──▶ dns
//!                │                   │
//!                └──▶ app-profile ───┴──▶ workloads
//! ```
//!
//! DNS declares explicit ordering on the cluster and the controller: the
//! record's alias target only exists once the controller has reconciled its
//! first ingress. Workloads wait for the app profile so their pods have
//! capacity to schedule onto, and for the controller so ingresses reconcile.

use serde_json::json;
use strata_common::config::keys;
use strata_common::DeploymentConfig;

use crate::unit::{UnitKind, UnitSpec};
use crate::{Composition, Result};

/// Unit name of the network
pub const NETWORK: &str = "network";
/// Unit name of the managed cluster
pub const CLUSTER: &str = "cluster";
/// Unit name of the load balancer controller
pub const CONTROLLER: &str = "load-balancer-controller";
/// Unit name of the application namespace's capacity profile
pub const PROFILE: &str = "app-profile";
/// Unit name of the DNS zone and record
pub const DNS: &str = "dns";
/// Unit name of the workload manifests applied to the cluster
pub const WORKLOADS: &str = "workloads";

/// Namespace the load balancer controller's service account lives in
const CONTROLLER_NAMESPACE: &str = "kube-system";
/// Alias record TTL, seconds
const RECORD_TTL_SECS: u64 = 60;

/// Build the standard composition for `config`.
pub fn standard_composition(config: &DeploymentConfig) -> Result<Composition> {
    let externals = config.externals();
    let has_external = |key: &str| externals.contains_key(key);

    let mut network = UnitSpec::new(UnitKind::Network, NETWORK)
        .property("cidr", config.network.cidr.clone())
        .property("maxAzs", config.network.max_azs)
        .property("enableDnsHostnames", true)
        .property("enableDnsSupport", true)
        .property("name", format!("{}-vpc", config.stack_name()));
    if has_external(keys::REGION) {
        network = network.external("region", keys::REGION);
    }
    let mut composition = Composition::new(externals.clone());
    composition.add_unit_spec(network)?;

    let vpc = composition.output_of(NETWORK, "vpc")?;
    let mut cluster = UnitSpec::new(UnitKind::Cluster, CLUSTER)
        .input("vpc", vpc)
        .property("kubernetesVersion", config.cluster.kubernetes_version.clone())
        .property("endpointAccess", config.cluster.endpoint_access.clone())
        .property("subnetType", "private-with-egress")
        .property(
            "profileSelectors",
            json!(config
                .cluster
                .profile_namespaces
                .iter()
                .map(|ns| json!({ "namespace": ns }))
                .collect::<Vec<_>>()),
        );
    if has_external(keys::CLUSTER_NAME) {
        cluster = cluster.external("cluster_name", keys::CLUSTER_NAME);
    }
    composition.add_unit_spec(cluster)?;

    let cluster_handle = composition.output_of(CLUSTER, "cluster")?;
    composition.add_unit_spec(
        UnitSpec::new(UnitKind::Controller, CONTROLLER)
            .input("cluster", cluster_handle.clone())
            .property("serviceAccountName", CONTROLLER)
            .property("serviceAccountNamespace", CONTROLLER_NAMESPACE),
    )?;

    composition.add_unit_spec(
        UnitSpec::new(UnitKind::Custom("profile".into()), PROFILE)
            .input("cluster", cluster_handle.clone())
            .output("profile")
            .property(
                "selectors",
                json!([{ "namespace": config.cluster.app_namespace }]),
            )
            .property("subnetType", "private-with-egress"),
    )?;

    if config.dns {
        let load_balancer = composition.output_of(CONTROLLER, "load_balancer")?;
        composition.add_unit_spec(
            UnitSpec::new(UnitKind::Dns, DNS)
                .input("cluster", cluster_handle.clone())
                .input("load_balancer", load_balancer)
                .external("domain_name", keys::DOMAIN_NAME)
                .external("subdomain_name", keys::SUBDOMAIN_NAME)
                .property("recordTtlSeconds", RECORD_TTL_SECS),
        )?;
        composition.declare_dependency(DNS, CLUSTER)?;
        composition.declare_dependency(DNS, CONTROLLER)?;
    }

    if !config.manifest_dirs.is_empty() {
        let dirs: Vec<String> = config
            .manifest_dirs
            .iter()
            .map(|dir| dir.display().to_string())
            .collect();
        composition.add_unit_spec(
            UnitSpec::new(UnitKind::Custom("manifests".into()), WORKLOADS)
                .input("cluster", cluster_handle)
                .property("manifestDirs", dirs),
        )?;
        composition.declare_dependency(WORKLOADS, PROFILE)?;
        composition.declare_dependency(WORKLOADS, CONTROLLER)?;
    }

    Ok(composition)
}
