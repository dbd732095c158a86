//! # Route Synthesis
//!
//! Turns a validated exposure rule set into a single VirtualService and decides
//! whether it is created or updates the object already owned by the rule set.

pub mod routes;

pub use routes::{
    cors_policy, merge_candidates, method_match, uri_match, RouteCandidate, FORWARDED_HOST_HEADER,
};

use crate::cluster::ClusterClient;
use crate::config::GatewayConfig;
use crate::domain::{
    BackendService, Change, Destination, ExposureRuleSet, ObjectMeta, Rule, VirtualService,
    VirtualServiceSpec, LEGACY_OWNER_LABEL_KEY, OWNER_LABEL_KEY,
};
use crate::errors::{Error, Result};
use crate::registry::{
    AccessStrategy, BoundMutator, DestinationFamily, HandlerRegistry, RouteDraft,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Owner label keys, newest first
const OWNER_LABEL_KEYS: [&str; 2] = [OWNER_LABEL_KEY, LEGACY_OWNER_LABEL_KEY];

/// Builds VirtualServices from exposure rule sets
#[derive(Debug, Clone)]
pub struct VirtualServiceProcessor {
    config: GatewayConfig,
    registry: Arc<HandlerRegistry>,
}

impl VirtualServiceProcessor {
    pub fn new(config: GatewayConfig) -> Self {
        Self::with_registry(config, Arc::new(HandlerRegistry::default()))
    }

    pub fn with_registry(config: GatewayConfig, registry: Arc<HandlerRegistry>) -> Self {
        Self { config, registry }
    }

    /// Desired change set for `rule_set`; always exactly one change
    pub async fn evaluate_reconciliation(
        &self,
        cluster: &dyn ClusterClient,
        rule_set: &ExposureRuleSet,
    ) -> Result<Vec<Change>> {
        let desired = self.desired_virtual_service(rule_set)?;

        let change = match self.find_owned(cluster, rule_set).await? {
            Some(mut existing) => {
                existing.spec = desired.spec;
                existing.metadata.labels.remove(LEGACY_OWNER_LABEL_KEY);
                existing
                    .metadata
                    .labels
                    .insert(OWNER_LABEL_KEY.to_string(), rule_set.owner_label());
                Change::update(existing)
            }
            None => Change::create(desired),
        };

        debug!(
            rule_set = %rule_set.owner_label(),
            action = %change.action,
            routes = change.object.spec.http.len(),
            "Evaluated reconciliation"
        );
        Ok(vec![change])
    }

    /// VirtualService as it would be created for `rule_set`
    pub fn desired_virtual_service(&self, rule_set: &ExposureRuleSet) -> Result<VirtualService> {
        let spec = &rule_set.spec;
        let host = spec
            .host
            .as_deref()
            .filter(|h| !h.trim().is_empty())
            .ok_or_else(|| Error::invalid_rule_set("rule set has no host"))?;
        let host = self.config.effective_host(host);

        let families = self.destination_families(&spec.rules)?;
        let mut candidates = Vec::with_capacity(spec.rules.len());
        for (rule, family) in spec.rules.iter().zip(families) {
            candidates.push(self.candidate(rule_set, rule, family, &host)?);
        }

        let cors = cors_policy(&self.config.cors);
        let http = merge_candidates(candidates)
            .into_iter()
            .map(|candidate| candidate.into_http_route(&cors))
            .collect();

        let mut metadata = ObjectMeta {
            generate_name: Some(format!("{}-", rule_set.name())),
            namespace: Some(rule_set.namespace().to_string()),
            labels: self.config.management_labels.clone(),
            ..Default::default()
        };
        metadata.labels.insert(OWNER_LABEL_KEY.to_string(), rule_set.owner_label());

        Ok(VirtualService {
            metadata,
            spec: VirtualServiceSpec {
                hosts: vec![host],
                gateways: vec![spec.gateway.clone().unwrap_or_else(|| self.config.gateway.clone())],
                http,
            },
            ..Default::default()
        })
    }

    /// Family per rule, in rule order.
    ///
    /// A rule starts in its primary strategy's family. A promotable direct rule with a
    /// proxy-dependent mutator moves to the proxy family when another rule on the same
    /// path is proxied, so both share one route.
    fn destination_families(&self, rules: &[Rule]) -> Result<Vec<DestinationFamily>> {
        let strategies = rules
            .iter()
            .map(|rule| self.primary_strategy(rule))
            .collect::<Result<Vec<_>>>()?;

        let base: Vec<DestinationFamily> = strategies
            .iter()
            .map(|s| s.map_or(DestinationFamily::Direct, |s| s.family()))
            .collect();

        let proxied_paths: HashSet<&str> = rules
            .iter()
            .zip(&base)
            .filter(|(_, family)| **family == DestinationFamily::Proxy)
            .map(|(rule, _)| rule.path.as_str())
            .collect();

        rules
            .iter()
            .zip(strategies.iter().zip(base))
            .map(|(rule, (strategy, family))| {
                let promotable = strategy.is_some_and(|s| s.promotable());
                if family == DestinationFamily::Direct
                    && promotable
                    && proxied_paths.contains(rule.path.as_str())
                    && self.has_proxy_dependent_mutator(rule)?
                {
                    Ok(DestinationFamily::Proxy)
                } else {
                    Ok(family)
                }
            })
            .collect()
    }

    fn primary_strategy(&self, rule: &Rule) -> Result<Option<&dyn AccessStrategy>> {
        match rule.primary_strategy() {
            None => Ok(None),
            Some(handler) => self.registry.strategy(&handler.name).map(Some).ok_or_else(|| {
                Error::invalid_rule_set(format!("Unsupported accessStrategy: {}", handler.name))
            }),
        }
    }

    fn has_proxy_dependent_mutator(&self, rule: &Rule) -> Result<bool> {
        Ok(self.bind_mutators(rule)?.iter().any(|m| m.implementation.requires_proxy()))
    }

    fn bind_mutators<'a>(&'a self, rule: &'a Rule) -> Result<Vec<BoundMutator<'a>>> {
        rule.mutators
            .iter()
            .map(|handler| {
                self.registry
                    .mutator(&handler.name)
                    .map(|implementation| BoundMutator { handler, implementation })
                    .ok_or_else(|| {
                        Error::invalid_rule_set(format!("Unsupported mutator: {}", handler.name))
                    })
            })
            .collect()
    }

    fn candidate(
        &self,
        rule_set: &ExposureRuleSet,
        rule: &Rule,
        family: DestinationFamily,
        host: &str,
    ) -> Result<RouteCandidate> {
        let destination = match family {
            DestinationFamily::Direct => self.service_destination(rule_set, rule)?,
            DestinationFamily::Proxy => {
                Destination::new(self.config.proxy.host.clone(), u32::from(self.config.proxy.port))
            }
        };

        let mut draft = RouteDraft::new(family);
        draft.request_headers.insert(FORWARDED_HOST_HEADER.to_string(), host.to_string());
        if let Some(strategy) = self.primary_strategy(rule)? {
            strategy.contribute_route(&mut draft, &self.bind_mutators(rule)?)?;
        }

        let timeout = rule
            .timeout
            .or(rule_set.spec.timeout)
            .map(|t| t.as_duration())
            .unwrap_or_else(|| self.config.default_timeout());

        Ok(RouteCandidate {
            path: rule.path.clone(),
            methods: rule.unique_methods(),
            destination,
            request_headers: draft.request_headers,
            timeout,
        })
    }

    /// In-cluster address of the rule's backend; the rule override wins
    fn service_destination(&self, rule_set: &ExposureRuleSet, rule: &Rule) -> Result<Destination> {
        let service: &BackendService = rule
            .service
            .as_ref()
            .or(rule_set.spec.service.as_ref())
            .ok_or_else(|| Error::invalid_rule_set(format!("rule {} has no service", rule.path)))?;

        let name = service.name.as_deref().ok_or_else(|| {
            Error::invalid_rule_set(format!("rule {} has no service name", rule.path))
        })?;
        let port = service.port.ok_or_else(|| {
            Error::invalid_rule_set(format!("rule {} has no service port", rule.path))
        })?;
        let namespace = service.namespace.as_deref().unwrap_or(rule_set.namespace());

        Ok(Destination::new(format!("{}.{}.svc.cluster.local", name, namespace), port))
    }

    /// VirtualService owned by `rule_set`, found by the current or the legacy owner label
    async fn find_owned(
        &self,
        cluster: &dyn ClusterClient,
        rule_set: &ExposureRuleSet,
    ) -> Result<Option<VirtualService>> {
        let owner = rule_set.owner_label();
        for key in OWNER_LABEL_KEYS {
            if let Some(existing) = cluster.get_virtual_service_by_label(key, &owner).await? {
                return Ok(Some(existing));
            }
        }
        Ok(None)
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::InMemoryCluster;
    use crate::domain::{Action, Handler, RuleSetSpec, StringMatch, Timeout};

    fn rule(path: &str, methods: &[&str], strategy: &str) -> Rule {
        Rule {
            path: path.to_string(),
            methods: methods.iter().map(|m| m.to_string()).collect(),
            access_strategies: vec![Handler::new(strategy)],
            ..Default::default()
        }
    }

    fn rule_set(rules: Vec<Rule>) -> ExposureRuleSet {
        ExposureRuleSet {
            metadata: ObjectMeta::named("test-apirule", "some-namespace"),
            spec: RuleSetSpec {
                host: Some("myservice".to_string()),
                service: Some(BackendService::new("example-service", 8080)),
                rules,
                ..Default::default()
            },
        }
    }

    #[test]
    fn allow_routes_to_service() {
        let processor = VirtualServiceProcessor::new(GatewayConfig::default());
        let vs = processor
            .desired_virtual_service(&rule_set(vec![rule("/", &["GET"], "allow")]))
            .unwrap();

        assert_eq!(vs.spec.hosts, vec!["myservice.local.meshgate.dev"]);
        assert_eq!(vs.spec.gateways, vec!["meshgate-system/meshgate-gateway"]);
        assert_eq!(vs.spec.http.len(), 1);
        assert_eq!(
            vs.spec.http[0].route[0].destination,
            Destination::new("example-service.some-namespace.svc.cluster.local", 8080)
        );
        assert_eq!(
            vs.spec.http[0].request_headers().get(FORWARDED_HOST_HEADER).map(String::as_str),
            Some("myservice.local.meshgate.dev")
        );
    }

    #[test]
    fn noop_routes_to_proxy_even_with_service_override() {
        let config = GatewayConfig::default();
        let mut noop = rule("/", &["GET"], "noop");
        noop.service = Some(BackendService::new("other", 9000));
        let vs = VirtualServiceProcessor::new(config.clone())
            .desired_virtual_service(&rule_set(vec![noop]))
            .unwrap();
        assert_eq!(
            vs.spec.http[0].route[0].destination,
            Destination::new(config.proxy.host, u32::from(config.proxy.port))
        );
    }

    #[test]
    fn timeouts_resolve_rule_then_rule_set_then_default() {
        let mut with_rule_timeout = rule("/a", &["GET"], "allow");
        with_rule_timeout.timeout = Some(Timeout(20));
        let mut set = rule_set(vec![with_rule_timeout, rule("/b", &["GET"], "allow")]);

        let processor = VirtualServiceProcessor::new(GatewayConfig::default());
        let vs = processor.desired_virtual_service(&set).unwrap();
        assert_eq!(vs.spec.http[0].timeout.map(|t| t.as_secs()), Some(20));
        assert_eq!(vs.spec.http[1].timeout.map(|t| t.as_secs()), Some(180));

        set.spec.timeout = Some(Timeout(10));
        let vs = processor.desired_virtual_service(&set).unwrap();
        assert_eq!(vs.spec.http[0].timeout.map(|t| t.as_secs()), Some(20));
        assert_eq!(vs.spec.http[1].timeout.map(|t| t.as_secs()), Some(10));
    }

    #[test]
    fn unknown_strategy_is_an_error() {
        let processor = VirtualServiceProcessor::new(GatewayConfig::default());
        let err = processor
            .desired_virtual_service(&rule_set(vec![rule("/", &["GET"], "bearer")]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRuleSet(_)));
    }

    #[test]
    fn catch_all_path_is_prefix() {
        let processor = VirtualServiceProcessor::new(GatewayConfig::default());
        let vs = processor
            .desired_virtual_service(&rule_set(vec![rule("/*", &["GET"], "allow")]))
            .unwrap();
        assert_eq!(vs.spec.http[0].matches[0].uri, Some(StringMatch::Prefix("/".into())));
    }

    #[tokio::test]
    async fn create_then_update() {
        let cluster = InMemoryCluster::new();
        let processor = VirtualServiceProcessor::new(GatewayConfig::default());
        let set = rule_set(vec![rule("/", &["GET"], "allow")]);

        let changes = processor.evaluate_reconciliation(&cluster, &set).await.unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].action, Action::Create);
        let created = cluster.create(&changes[0].object).await.unwrap();

        let changes = processor.evaluate_reconciliation(&cluster, &set).await.unwrap();
        assert_eq!(changes[0].action, Action::Update);
        assert_eq!(changes[0].object.metadata.name, created.metadata.name);
        assert_eq!(changes[0].object.metadata.uid, created.metadata.uid);
    }
}
