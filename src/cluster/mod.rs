//! # Cluster Capability
//!
//! The small read/write surface the core needs from cluster storage. A real client
//! implements [`ClusterClient`] against the API server; [`InMemoryCluster`] serves
//! the command line and the tests from a snapshot.

use crate::domain::{Action, Change, Pod, ServiceObject, VirtualService};
use crate::errors::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Cluster reads and writes consumed by validation and synthesis
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// First VirtualService, in any namespace, carrying `label_key=label_value`
    async fn get_virtual_service_by_label(
        &self,
        label_key: &str,
        label_value: &str,
    ) -> Result<Option<VirtualService>>;

    /// Pods in `namespace` whose labels contain every selector entry
    async fn list_pods(
        &self,
        namespace: &str,
        selector: &BTreeMap<String, String>,
    ) -> Result<Vec<Pod>>;

    /// Service by namespace and name
    async fn get_service(&self, namespace: &str, name: &str) -> Result<Option<ServiceObject>>;

    /// Persist a new VirtualService and return it as stored
    async fn create(&self, object: &VirtualService) -> Result<VirtualService>;

    /// Replace an existing VirtualService and return it as stored
    async fn update(&self, object: &VirtualService) -> Result<VirtualService>;
}

impl Change {
    /// Perform this change and return the object as stored
    pub async fn apply(&self, cluster: &dyn ClusterClient) -> Result<VirtualService> {
        match self.action {
            Action::Create => cluster.create(&self.object).await,
            Action::Update => cluster.update(&self.object).await,
        }
    }
}

/// Serializable cluster state
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSnapshot {
    #[serde(default)]
    pub virtual_services: Vec<VirtualService>,
    #[serde(default)]
    pub pods: Vec<Pod>,
    #[serde(default)]
    pub services: Vec<ServiceObject>,
}

#[derive(Debug, Default)]
struct State {
    snapshot: ClusterSnapshot,
    next_id: u64,
    failing: Vec<String>,
}

/// Cluster held in memory
#[derive(Debug, Default)]
pub struct InMemoryCluster {
    state: Mutex<State>,
}

impl InMemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: ClusterSnapshot) -> Self {
        Self { state: Mutex::new(State { snapshot, next_id: 0, failing: Vec::new() }) }
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> Result<ClusterSnapshot> {
        Ok(self.lock("snapshot")?.snapshot.clone())
    }

    pub fn add_pod(&self, pod: Pod) -> Result<()> {
        self.lock("add pod")?.snapshot.pods.push(pod);
        Ok(())
    }

    pub fn add_service(&self, service: ServiceObject) -> Result<()> {
        self.lock("add service")?.snapshot.services.push(service);
        Ok(())
    }

    pub fn add_virtual_service(&self, object: VirtualService) -> Result<()> {
        self.lock("add virtual service")?.snapshot.virtual_services.push(object);
        Ok(())
    }

    /// Make every later call of `operation` fail with a cluster error.
    ///
    /// Operation names: `get_virtual_service_by_label`, `list_pods`, `get_service`,
    /// `create`, `update`.
    pub fn fail_on(&self, operation: &str) -> Result<()> {
        self.lock("fail_on")?.failing.push(operation.to_string());
        Ok(())
    }

    fn lock(&self, operation: &str) -> Result<MutexGuard<'_, State>> {
        self.state.lock().map_err(|_| Error::cluster(operation, "cluster state lock poisoned"))
    }

    /// Lock the state for a trait operation, honouring injected failures
    fn enter(&self, operation: &str) -> Result<MutexGuard<'_, State>> {
        let state = self.lock(operation)?;
        if state.failing.iter().any(|op| op == operation) {
            return Err(Error::cluster(operation, "injected failure"));
        }
        Ok(state)
    }
}

#[async_trait]
impl ClusterClient for InMemoryCluster {
    async fn get_virtual_service_by_label(
        &self,
        label_key: &str,
        label_value: &str,
    ) -> Result<Option<VirtualService>> {
        let state = self.enter("get_virtual_service_by_label")?;
        Ok(state
            .snapshot
            .virtual_services
            .iter()
            .find(|vs| vs.metadata.labels.get(label_key).map(String::as_str) == Some(label_value))
            .cloned())
    }

    async fn list_pods(
        &self,
        namespace: &str,
        selector: &BTreeMap<String, String>,
    ) -> Result<Vec<Pod>> {
        let state = self.enter("list_pods")?;
        Ok(state
            .snapshot
            .pods
            .iter()
            .filter(|pod| pod.metadata.namespace() == namespace)
            .filter(|pod| pod.metadata.matches_labels(selector))
            .cloned()
            .collect())
    }

    async fn get_service(&self, namespace: &str, name: &str) -> Result<Option<ServiceObject>> {
        let state = self.enter("get_service")?;
        Ok(state
            .snapshot
            .services
            .iter()
            .find(|svc| svc.metadata.namespace() == namespace && svc.metadata.name() == name)
            .cloned())
    }

    async fn create(&self, object: &VirtualService) -> Result<VirtualService> {
        let mut state = self.enter("create")?;
        state.next_id += 1;
        let id = state.next_id;

        let mut stored = object.clone();
        if stored.metadata.name().is_empty() {
            let prefix = stored.metadata.generate_name.clone().unwrap_or_default();
            if prefix.is_empty() {
                return Err(Error::cluster("create", "name or generateName is required"));
            }
            stored.metadata.name = Some(format!("{}{:05x}", prefix, id));
        }

        let exists = state.snapshot.virtual_services.iter().any(|vs| {
            vs.metadata.namespace() == stored.metadata.namespace()
                && vs.metadata.name() == stored.metadata.name()
        });
        if exists {
            return Err(Error::cluster(
                "create",
                format!(
                    "virtual service {}/{} already exists",
                    stored.metadata.namespace(),
                    stored.metadata.name()
                ),
            ));
        }

        stored.metadata.uid = Some(format!("uid-{}", id));
        stored.metadata.resource_version = Some("1".to_string());
        debug!(
            namespace = stored.metadata.namespace(),
            name = stored.metadata.name(),
            "Created virtual service"
        );
        state.snapshot.virtual_services.push(stored.clone());
        Ok(stored)
    }

    async fn update(&self, object: &VirtualService) -> Result<VirtualService> {
        let mut state = self.enter("update")?;
        let existing = state
            .snapshot
            .virtual_services
            .iter_mut()
            .find(|vs| {
                vs.metadata.namespace() == object.metadata.namespace()
                    && vs.metadata.name() == object.metadata.name()
            })
            .ok_or_else(|| {
                Error::cluster(
                    "update",
                    format!(
                        "virtual service {}/{} not found",
                        object.metadata.namespace(),
                        object.metadata.name()
                    ),
                )
            })?;

        let version = existing
            .metadata
            .resource_version
            .as_deref()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);

        let mut stored = object.clone();
        stored.metadata.uid = existing.metadata.uid.clone();
        stored.metadata.resource_version = Some((version + 1).to_string());
        *existing = stored.clone();
        debug!(
            namespace = stored.metadata.namespace(),
            name = stored.metadata.name(),
            "Updated virtual service"
        );
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Container, ObjectMeta};

    fn pod(name: &str, namespace: &str, app: &str) -> Pod {
        let mut pod = Pod {
            metadata: ObjectMeta::named(name, namespace).with_label("app", app),
            ..Default::default()
        };
        pod.spec.containers.push(Container::named("app"));
        pod
    }

    #[tokio::test]
    async fn list_pods_filters_namespace_and_labels() {
        let cluster = InMemoryCluster::new();
        cluster.add_pod(pod("a", "default", "web")).unwrap();
        cluster.add_pod(pod("b", "other", "web")).unwrap();
        cluster.add_pod(pod("c", "default", "db")).unwrap();

        let mut selector = BTreeMap::new();
        selector.insert("app".to_string(), "web".to_string());

        let pods = cluster.list_pods("default", &selector).await.unwrap();
        assert_eq!(pods.len(), 1);
        assert_eq!(pods[0].metadata.name(), "a");
    }

    #[tokio::test]
    async fn create_generates_name_and_identity() {
        let cluster = InMemoryCluster::new();
        let mut vs = VirtualService::default();
        vs.metadata.generate_name = Some("orders-".to_string());
        vs.metadata.namespace = Some("shop".to_string());

        let stored = cluster.create(&vs).await.unwrap();
        assert!(stored.metadata.name().starts_with("orders-"));
        assert!(stored.metadata.uid.is_some());
        assert_eq!(stored.metadata.resource_version.as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn update_keeps_uid_and_bumps_version() {
        let cluster = InMemoryCluster::new();
        let mut vs = VirtualService::default();
        vs.metadata = ObjectMeta::named("orders", "shop");
        let stored = cluster.create(&vs).await.unwrap();

        let mut changed = stored.clone();
        changed.spec.hosts = vec!["orders.example.com".to_string()];
        changed.metadata.uid = None;
        let updated = cluster.update(&changed).await.unwrap();

        assert_eq!(updated.metadata.uid, stored.metadata.uid);
        assert_eq!(updated.metadata.resource_version.as_deref(), Some("2"));
        assert_eq!(cluster.snapshot().unwrap().virtual_services[0].spec.hosts.len(), 1);
    }

    #[tokio::test]
    async fn update_of_missing_object_fails() {
        let cluster = InMemoryCluster::new();
        let mut vs = VirtualService::default();
        vs.metadata = ObjectMeta::named("ghost", "shop");
        let err = cluster.update(&vs).await.unwrap_err();
        assert!(err.is_cluster());
    }

    #[tokio::test]
    async fn injected_failures_surface_as_cluster_errors() {
        let cluster = InMemoryCluster::new();
        cluster.fail_on("list_pods").unwrap();
        let err = cluster.list_pods("default", &BTreeMap::new()).await.unwrap_err();
        assert!(err.is_cluster());
        assert!(cluster.get_service("default", "svc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn change_apply_dispatches_on_action() {
        let cluster = InMemoryCluster::new();
        let mut vs = VirtualService::default();
        vs.metadata = ObjectMeta::named("orders", "shop");

        let created = Change::create(vs).apply(&cluster).await.unwrap();
        let updated = Change::update(created.clone()).apply(&cluster).await.unwrap();
        assert_eq!(updated.metadata.uid, created.metadata.uid);
        assert_eq!(cluster.snapshot().unwrap().virtual_services.len(), 1);
    }

    #[tokio::test]
    async fn label_lookup_spans_namespaces() {
        let cluster = InMemoryCluster::new();
        let mut vs = VirtualService::default();
        vs.metadata = ObjectMeta::named("x", "elsewhere").with_label("owner", "rs.ns");
        cluster.add_virtual_service(vs).unwrap();

        let found = cluster.get_virtual_service_by_label("owner", "rs.ns").await.unwrap();
        assert_eq!(found.map(|vs| vs.metadata.namespace().to_string()), Some("elsewhere".into()));
        assert!(cluster.get_virtual_service_by_label("owner", "other").await.unwrap().is_none());
    }
}
