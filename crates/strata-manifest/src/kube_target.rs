//! Server-side apply of chain elements to a Kubernetes cluster
//!
//! Resource types are resolved through API discovery so that custom
//! resources work the same way as built-in kinds. Discovery is cached and
//! only re-run when it may have gone stale: after a CRD was applied, and
//! once when a document's kind does not resolve.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use kube::api::{Api, DynamicObject, GroupVersionKind, Patch, PatchParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::discovery::{ApiCapabilities, ApiResource, Discovery, Scope};
use kube::{Client, Config};
#[cfg(test)]
use mockall::automock;
use serde_json::{Map, Value};
use strata_common::retry::{retry_with_backoff_if, RetryConfig};
use strata_common::{Error, CHAIN_ID_ANNOTATION, DEPENDS_ON_ANNOTATION, FIELD_MANAGER};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::apply::ManifestTarget;
use crate::chain::ChainLink;
use crate::document::Document;
use crate::error::TargetError;

/// Connection timeout for kube clients
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Read timeout for kube clients
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Create a kube client from an optional kubeconfig path.
///
/// Without a path the config is inferred (in-cluster, then `KUBECONFIG`,
/// then `~/.kube/config`).
pub async fn create_client(kubeconfig: Option<&Path>) -> Result<Client, Error> {
    let mut config = match kubeconfig {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path)
                .map_err(|e| client_error("failed to read kubeconfig", e))?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .map_err(|e| client_error("failed to load kubeconfig", e))?
        }
        None => Config::infer()
            .await
            .map_err(|e| client_error("failed to infer config", e))?,
    };
    config.connect_timeout = Some(DEFAULT_CONNECT_TIMEOUT);
    config.read_timeout = Some(DEFAULT_READ_TIMEOUT);

    Client::try_from(config).map_err(|e| client_error("failed to create client", e))
}

fn client_error(what: &str, e: impl std::fmt::Display) -> Error {
    Error::internal_with_context("create_client", format!("{what}: {e}"))
}

/// Served resource types, keyed by group, version and kind
#[derive(Clone, Debug, Default)]
pub struct ApiCatalog {
    resources: HashMap<(String, String, String), (ApiResource, ApiCapabilities)>,
}

impl ApiCatalog {
    /// Flatten a discovery run into a lookup table
    pub fn from_discovery(discovery: &Discovery) -> Self {
        let mut catalog = Self::default();
        for group in discovery.groups() {
            for version in group.versions() {
                for (resource, caps) in group.versioned_resources(version) {
                    catalog.insert(resource, caps);
                }
            }
        }
        catalog
    }

    /// Add or replace one resource type
    pub fn insert(&mut self, resource: ApiResource, caps: ApiCapabilities) {
        let key = (
            resource.group.clone(),
            resource.version.clone(),
            resource.kind.clone(),
        );
        self.resources.insert(key, (resource, caps));
    }

    /// Look up a resource type
    pub fn resolve(&self, gvk: &GroupVersionKind) -> Option<(ApiResource, ApiCapabilities)> {
        self.resources
            .get(&(gvk.group.clone(), gvk.version.clone(), gvk.kind.clone()))
            .cloned()
    }

    /// Number of resource types
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// True when nothing is served
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Where the set of served resource types comes from
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DiscoverySource: Send + Sync {
    /// Run a full discovery pass.
    async fn discover(&self) -> Result<ApiCatalog, Error>;
}

/// API discovery against a live cluster, retried with backoff
pub struct KubeDiscovery {
    client: Client,
    retry: RetryConfig,
}

impl KubeDiscovery {
    /// Discover through `client`
    pub fn new(client: Client) -> Self {
        Self {
            client,
            retry: RetryConfig {
                max_attempts: 5,
                initial_delay: Duration::from_secs(1),
                ..RetryConfig::default()
            },
        }
    }
}

#[async_trait]
impl DiscoverySource for KubeDiscovery {
    async fn discover(&self) -> Result<ApiCatalog, Error> {
        let discovery = retry_with_backoff_if(
            &self.retry,
            "api-discovery",
            || {
                let client = self.client.clone();
                async move { Discovery::new(client).run().await.map_err(Error::from) }
            },
            Error::is_retryable,
        )
        .await?;
        let catalog = ApiCatalog::from_discovery(&discovery);
        debug!(resources = catalog.len(), "api discovery complete");
        Ok(catalog)
    }
}

/// Cached discovery that refreshes only when it may be stale
///
/// The cache is dropped after a CRD is applied, and refreshed once when a
/// kind does not resolve against it.
pub struct DiscoveryCache<S> {
    source: S,
    cached: Mutex<Option<ApiCatalog>>,
}

impl<S: DiscoverySource> DiscoveryCache<S> {
    /// Empty cache over `source`; the first lookup runs discovery
    pub fn new(source: S) -> Self {
        Self {
            source,
            cached: Mutex::new(None),
        }
    }

    /// Resolve a GVK, refreshing discovery once if it is unknown.
    pub async fn resolve(
        &self,
        gvk: &GroupVersionKind,
    ) -> Result<Option<(ApiResource, ApiCapabilities)>, Error> {
        let mut cached = self.cached.lock().await;

        if let Some(catalog) = cached.as_ref() {
            if let Some(found) = catalog.resolve(gvk) {
                return Ok(Some(found));
            }
            debug!(
                kind = %gvk.kind,
                group = %gvk.group,
                "kind not in cached discovery, refreshing"
            );
        }

        let catalog = self.source.discover().await?;
        let found = catalog.resolve(gvk);
        *cached = Some(catalog);
        Ok(found)
    }

    /// Forget the cached catalog
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }

    /// Record that `doc` was accepted; CRDs change what the cluster serves.
    pub async fn note_applied(&self, doc: &Document) {
        if doc.is_crd() {
            info!(crd = %doc.name, "CRD applied, discovery will be refreshed");
            self.invalidate().await;
        }
    }
}

/// Which API endpoint a document is written through
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApiScope {
    /// Cluster-scoped kind; any namespace on the document is ignored
    Cluster,
    /// Namespaced kind with an explicit namespace
    Namespace(String),
    /// Namespaced kind without one; the client's default namespace
    DefaultNamespace,
}

/// Pick the endpoint for a kind with `scope` and a document namespace
pub fn api_scope(scope: &Scope, namespace: Option<&str>) -> ApiScope {
    match (scope, namespace) {
        (Scope::Cluster, _) => ApiScope::Cluster,
        (Scope::Namespaced, Some(ns)) => ApiScope::Namespace(ns.to_string()),
        (Scope::Namespaced, None) => ApiScope::DefaultNamespace,
    }
}

/// [`ManifestTarget`] that server-side applies documents to a cluster
pub struct KubeTarget {
    client: Client,
    discovery: DiscoveryCache<KubeDiscovery>,
}

impl KubeTarget {
    /// Target the cluster behind `client`
    pub fn new(client: Client) -> Self {
        Self {
            discovery: DiscoveryCache::new(KubeDiscovery::new(client.clone())),
            client,
        }
    }

    /// Connect using an optional kubeconfig path
    pub async fn connect(kubeconfig: Option<&Path>) -> Result<Self, TargetError> {
        Ok(Self::new(create_client(kubeconfig).await?))
    }
}

#[async_trait]
impl ManifestTarget for KubeTarget {
    async fn apply(&self, link: &ChainLink) -> Result<(), TargetError> {
        let doc = &link.document;
        let (group, version) = doc.group_version();
        let gvk = GroupVersionKind {
            group,
            version,
            kind: doc.kind.clone(),
        };

        let Some((resource, caps)) = self.discovery.resolve(&gvk).await? else {
            warn!(
                id = %doc.id,
                resource = %doc.display_name(),
                "resource type not served by cluster"
            );
            return Err(TargetError::UnknownKind {
                api_version: doc.api_version.clone(),
                kind: doc.kind.clone(),
            });
        };

        let client = self.client.clone();
        let api: Api<DynamicObject> = match api_scope(&caps.scope, doc.namespace.as_deref()) {
            ApiScope::Cluster => Api::all_with(client, &resource),
            ApiScope::Namespace(ns) => Api::namespaced_with(client, &ns, &resource),
            ApiScope::DefaultNamespace => Api::default_namespaced_with(client, &resource),
        };

        let payload = annotated_payload(link);
        let params = PatchParams::apply(FIELD_MANAGER).force();
        api.patch(&doc.name, &params, &Patch::Apply(&payload))
            .await
            .map_err(|e| TargetError::rejected(&doc.kind, &doc.name, e.to_string()))?;

        self.discovery.note_applied(doc).await;
        Ok(())
    }
}

/// The document with its chain identity and predecessor recorded as
/// annotations.
pub fn annotated_payload(link: &ChainLink) -> Value {
    let mut value = link.document.value.clone();
    let Some(metadata) = value.get_mut("metadata").and_then(Value::as_object_mut) else {
        return value;
    };

    let annotations = metadata
        .entry("annotations")
        .or_insert_with(|| Value::Object(Map::new()));
    if !annotations.is_object() {
        *annotations = Value::Object(Map::new());
    }
    if let Some(annotations) = annotations.as_object_mut() {
        annotations.insert(
            CHAIN_ID_ANNOTATION.to_string(),
            Value::String(link.document.id.to_string()),
        );
        match &link.predecessor {
            Some(prev) => {
                annotations.insert(
                    DEPENDS_ON_ANNOTATION.to_string(),
                    Value::String(prev.to_string()),
                );
            }
            None => {
                annotations.remove(DEPENDS_ON_ANNOTATION);
            }
        }
    }
    value
}
