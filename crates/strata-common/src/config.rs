//! Deployment configuration loaded from `strata.yaml`.
//!
//! The config file resolution chain (highest priority first):
//! 1. Explicit `--config` flag
//! 2. `STRATA_CONFIG` environment variable
//! 3. `./strata.yaml` in the working directory
//! 4. Built-in defaults when no file exists
//!
//! After the file is read, `STRATA_ACCOUNT`, `STRATA_REGION` and
//! `STRATA_STAGE` override the corresponding fields.
//!
//! Scalars such as account, region and domain names are opaque to the
//! composition: they are handed to units as external inputs unvalidated.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{yaml, Error, Result, CONFIG_ENV, DEFAULT_CONFIG_FILE};

const ACCOUNT_ENV: &str = "STRATA_ACCOUNT";
const REGION_ENV: &str = "STRATA_REGION";
const STAGE_ENV: &str = "STRATA_STAGE";

/// External input keys produced by [`DeploymentConfig::externals`]
pub mod keys {
    /// Cloud account identifier
    pub const ACCOUNT: &str = "account";
    /// Cloud region
    pub const REGION: &str = "region";
    /// Deployment stage tag (dev, staging, prod)
    pub const STAGE: &str = "stage";
    /// Base domain for DNS records
    pub const DOMAIN_NAME: &str = "domain_name";
    /// Subdomain delegated to the hosted zone
    pub const SUBDOMAIN_NAME: &str = "subdomain_name";
    /// Explicit managed cluster name
    pub const CLUSTER_NAME: &str = "cluster_name";
}

/// Top-level deployment configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DeploymentConfig {
    /// Cloud account identifier
    pub account: Option<String>,
    /// Cloud region
    pub region: Option<String>,
    /// Deployment stage tag
    pub stage: String,
    /// Project name, combined with the stage into the stack name
    pub project: String,
    /// Base domain name for the DNS unit
    pub domain_name: Option<String>,
    /// Subdomain name for the DNS unit
    pub subdomain_name: Option<String>,
    /// Managed cluster name (provider-generated when unset)
    pub cluster_name: Option<String>,
    /// Network unit settings
    pub network: NetworkConfig,
    /// Cluster unit settings
    pub cluster: ClusterConfig,
    /// Compose the DNS unit
    pub dns: bool,
    /// Directories of manifests applied to the cluster, in order
    pub manifest_dirs: Vec<PathBuf>,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            account: None,
            region: None,
            stage: "dev".to_string(),
            project: "platform".to_string(),
            domain_name: None,
            subdomain_name: None,
            cluster_name: None,
            network: NetworkConfig::default(),
            cluster: ClusterConfig::default(),
            dns: false,
            manifest_dirs: Vec::new(),
        }
    }
}

/// Virtual network settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworkConfig {
    /// Address range of the network
    pub cidr: String,
    /// Number of availability zones to spread subnets across
    pub max_azs: u32,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            cidr: "10.0.0.0/16".to_string(),
            max_azs: 2,
        }
    }
}

/// Managed Kubernetes control plane settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterConfig {
    /// Kubernetes version of the control plane
    pub kubernetes_version: String,
    /// API endpoint exposure (public, private, public-and-private)
    pub endpoint_access: String,
    /// Namespaces scheduled onto serverless capacity
    pub profile_namespaces: Vec<String>,
    /// Namespace application workloads run in; gets its own capacity profile
    pub app_namespace: String,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            kubernetes_version: "1.24".to_string(),
            endpoint_access: "public".to_string(),
            profile_namespaces: vec!["default".to_string(), "kube-system".to_string()],
            app_namespace: "apps".to_string(),
        }
    }
}

impl DeploymentConfig {
    /// Load configuration following the resolution chain and apply
    /// environment overrides.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = resolve_config_path(explicit, std::env::var(CONFIG_ENV).ok());
        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => {
                debug!("no config file found, using defaults");
                Self::default()
            }
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a YAML config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| Error::config(path, format!("failed to read: {}", e)))?;
        let mut config = Self::from_yaml(&data).map_err(|e| Error::config(path, e.to_string()))?;

        // Relative manifest directories are relative to the config file
        if let Some(base) = path.parent() {
            for dir in &mut config.manifest_dirs {
                if dir.is_relative() {
                    *dir = base.join(&*dir);
                }
            }
        }

        debug!(path = %path.display(), stage = %config.stage, "loaded deployment config");
        Ok(config)
    }

    /// Parse configuration from a YAML string. Empty input yields defaults.
    pub fn from_yaml(data: &str) -> Result<Self> {
        let value = yaml::parse_yaml(data)
            .map_err(|e| Error::serialization(format!("invalid YAML: {}", e)))?;
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value).map_err(|e| Error::serialization(e.to_string()))
    }

    /// Apply environment overrides using `lookup` to read variables.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(account) = non_empty(ACCOUNT_ENV) {
            self.account = Some(account);
        }
        if let Some(region) = non_empty(REGION_ENV) {
            self.region = Some(region);
        }
        if let Some(stage) = non_empty(STAGE_ENV) {
            self.stage = stage;
        }
    }

    /// Check structural settings the composition depends on.
    pub fn validate(&self) -> Result<()> {
        if self.stage.trim().is_empty() {
            return Err(Error::validation_for_field("stage", "must not be empty"));
        }
        if self.network.max_azs == 0 {
            return Err(Error::validation_for_field(
                "network.maxAzs",
                "must be at least 1",
            ));
        }
        if self.cluster.app_namespace.trim().is_empty() {
            return Err(Error::validation_for_field(
                "cluster.appNamespace",
                "must not be empty",
            ));
        }
        if self.dns && (self.domain_name.is_none() || self.subdomain_name.is_none()) {
            return Err(Error::validation_for_field(
                "dns",
                "domainName and subdomainName are required when dns is enabled",
            ));
        }
        Ok(())
    }

    /// Name of the top-level stack, e.g. `dev-platform`.
    pub fn stack_name(&self) -> String {
        format!("{}-{}", self.stage, self.project)
    }

    /// External configuration scalars handed to the composition.
    ///
    /// Only values that are set appear in the map.
    pub fn externals(&self) -> BTreeMap<String, String> {
        let mut externals = BTreeMap::new();
        externals.insert(keys::STAGE.to_string(), self.stage.clone());

        let optional = [
            (keys::ACCOUNT, &self.account),
            (keys::REGION, &self.region),
            (keys::DOMAIN_NAME, &self.domain_name),
            (keys::SUBDOMAIN_NAME, &self.subdomain_name),
            (keys::CLUSTER_NAME, &self.cluster_name),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                externals.insert(key.to_string(), value.clone());
            }
        }
        externals
    }
}

/// Resolve the config file path.
///
/// Returns `None` when neither an explicit path, the environment variable,
/// nor `./strata.yaml` points at a file.
pub fn resolve_config_path(explicit: Option<&Path>, env_value: Option<String>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Some(path) = env_value.filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }

    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
    local.is_file().then_some(local)
}
