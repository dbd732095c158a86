//! Mesh sidecar injection check
//!
//! JWT rules are enforced by the mesh sidecar, so every pod behind the rule's
//! backend service must carry one.

use crate::cluster::ClusterClient;
use crate::domain::{AttributePath, Problem};
use crate::errors::Result;
use std::collections::BTreeMap;
use tracing::{debug, warn};

pub const EMPTY_SELECTOR: &str =
    "Service cannot have empty label selectors when the API Rule strategy is JWT";

/// Checks pods selected by a service for an injected sidecar
pub struct InjectionValidator<'a> {
    cluster: &'a dyn ClusterClient,
}

impl<'a> InjectionValidator<'a> {
    pub fn new(cluster: &'a dyn ClusterClient) -> Self {
        Self { cluster }
    }

    /// Validate the pods matching `selector` in `namespace`.
    ///
    /// Every matching pod is checked; pods are reported in listing order.
    pub async fn validate(
        &self,
        path: &AttributePath,
        selector: Option<&BTreeMap<String, String>>,
        namespace: &str,
    ) -> Result<Vec<Problem>> {
        let Some(selector) = selector else {
            return Ok(vec![path.field("injection").problem(EMPTY_SELECTOR)]);
        };

        let pods = self.cluster.list_pods(namespace, selector).await.map_err(|e| {
            warn!(namespace, error = %e, "Failed to list pods for injection check");
            e
        })?;

        let problems: Vec<Problem> = pods
            .iter()
            .filter(|pod| !pod.has_sidecar())
            .map(|pod| {
                path.problem(format!(
                    "Pod {}/{} does not have an injected istio sidecar",
                    pod.metadata.namespace(),
                    pod.metadata.name()
                ))
            })
            .collect();

        debug!(namespace, pods = pods.len(), problems = problems.len(), "Injection check finished");
        Ok(problems)
    }
}
