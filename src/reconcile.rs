//! # Reconciliation
//!
//! One pass over a rule set: validate, synthesize the change set when nothing is
//! wrong, and optionally write it to the cluster.

use crate::cluster::ClusterClient;
use crate::config::GatewayConfig;
use crate::domain::{Change, ExposureRuleSet, Problem, VirtualService};
use crate::errors::Result;
use crate::registry::HandlerRegistry;
use crate::synthesis::VirtualServiceProcessor;
use crate::validation::RuleSetValidator;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn, Instrument};

/// Result of one reconciliation pass
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ReconcileOutcome {
    /// The rule set was rejected; nothing was synthesized
    Invalid { problems: Vec<Problem> },
    /// Change set computed but not written
    Planned { changes: Vec<Change> },
    /// Change set written; `objects` are the stored results in change order
    Applied { changes: Vec<Change>, objects: Vec<VirtualService> },
}

impl ReconcileOutcome {
    pub fn is_invalid(&self) -> bool {
        matches!(self, ReconcileOutcome::Invalid { .. })
    }

    pub fn problems(&self) -> &[Problem] {
        match self {
            ReconcileOutcome::Invalid { problems } => problems,
            _ => &[],
        }
    }

    pub fn changes(&self) -> &[Change] {
        match self {
            ReconcileOutcome::Invalid { .. } => &[],
            ReconcileOutcome::Planned { changes } | ReconcileOutcome::Applied { changes, .. } => {
                changes
            }
        }
    }
}

/// Validator and processor sharing one handler registry
#[derive(Debug, Clone)]
pub struct Reconciler {
    validator: RuleSetValidator,
    processor: VirtualServiceProcessor,
}

impl Reconciler {
    pub fn new(config: GatewayConfig) -> Self {
        Self::with_registry(config, Arc::new(HandlerRegistry::default()))
    }

    pub fn with_registry(config: GatewayConfig, registry: Arc<HandlerRegistry>) -> Self {
        Self {
            validator: RuleSetValidator::with_registry(config.clone(), Arc::clone(&registry)),
            processor: VirtualServiceProcessor::with_registry(config, registry),
        }
    }

    /// Validate and synthesize without writing
    pub async fn plan(
        &self,
        cluster: &dyn ClusterClient,
        rule_set: &ExposureRuleSet,
    ) -> Result<ReconcileOutcome> {
        let span = crate::reconcile_span!(rule_set.name(), rule_set.namespace(), dry_run = true);
        self.plan_inner(cluster, rule_set).instrument(span).await
    }

    /// Validate, synthesize and write the change set
    pub async fn reconcile(
        &self,
        cluster: &dyn ClusterClient,
        rule_set: &ExposureRuleSet,
    ) -> Result<ReconcileOutcome> {
        let span = crate::reconcile_span!(rule_set.name(), rule_set.namespace(), dry_run = false);
        async {
            let changes = match self.plan_inner(cluster, rule_set).await? {
                ReconcileOutcome::Planned { changes } => changes,
                other => return Ok(other),
            };

            let mut objects = Vec::with_capacity(changes.len());
            for change in &changes {
                let stored = change
                    .apply(cluster)
                    .instrument(crate::cluster_span!(change.action))
                    .await
                    .inspect_err(|e| warn!(error = %e, action = %change.action, "Apply failed"))?;
                info!(
                    action = %change.action,
                    name = stored.metadata.name(),
                    namespace = stored.metadata.namespace(),
                    "Applied virtual service"
                );
                objects.push(stored);
            }
            Ok(ReconcileOutcome::Applied { changes, objects })
        }
        .instrument(span)
        .await
    }

    async fn plan_inner(
        &self,
        cluster: &dyn ClusterClient,
        rule_set: &ExposureRuleSet,
    ) -> Result<ReconcileOutcome> {
        let problems = self.validator.validate(cluster, rule_set).await?;
        if !problems.is_empty() {
            info!(problems = problems.len(), "Rule set rejected");
            return Ok(ReconcileOutcome::Invalid { problems });
        }

        let changes = self.processor.evaluate_reconciliation(cluster, rule_set).await?;
        debug!(changes = changes.len(), "Planned changes");
        Ok(ReconcileOutcome::Planned { changes })
    }

    pub fn validator(&self) -> &RuleSetValidator {
        &self.validator
    }

    pub fn processor(&self) -> &VirtualServiceProcessor {
        &self.processor
    }
}
