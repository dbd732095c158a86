//! # Validation Module
//!
//! Rule-set validation in three layers:
//! 1. Structural checks on the rule set (host, services, rules, timeouts)
//! 2. Per-handler payload checks dispatched through the [`HandlerRegistry`]
//! 3. Checks spanning rules or reading the cluster (issuer consistency, sidecar injection)
//!
//! Validators never stop at the first finding. Configuration defects are returned as
//! [`Problem`]s; only cluster failures surface as errors.

pub mod handler;
pub mod injection;
pub mod rules;
pub mod scalars;

pub use handler::JwtHandlerValidator;
pub use injection::InjectionValidator;
pub use rules::RulesValidator;

use crate::cluster::ClusterClient;
use crate::config::GatewayConfig;
use crate::domain::{AttributePath, BackendService, ExposureRuleSet, Problem, Rule, Timeout};
use crate::errors::Result;
use crate::registry::{AccessStrategyKind, HandlerRegistry};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Upper bound for rule and rule-set timeouts, in seconds
pub const MAX_TIMEOUT_SECONDS: u32 = 3900;

const ALLOW_NOT_EXCLUSIVE: &str =
    "allow access strategy is not allowed in combination with other access strategies";

static HOST_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\*\.)?[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$")
        .expect("HOST_REGEX should be a valid regex pattern")
});

static HTTP_METHOD_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(GET|POST|PUT|DELETE|PATCH|HEAD|OPTIONS|TRACE|CONNECT)$")
        .expect("HTTP_METHOD_REGEX should be a valid regex pattern")
});

/// Validates a whole exposure rule set
#[derive(Debug, Clone)]
pub struct RuleSetValidator {
    config: GatewayConfig,
    registry: Arc<HandlerRegistry>,
}

impl RuleSetValidator {
    pub fn new(config: GatewayConfig) -> Self {
        Self::with_registry(config, Arc::new(HandlerRegistry::default()))
    }

    pub fn with_registry(config: GatewayConfig, registry: Arc<HandlerRegistry>) -> Self {
        Self { config, registry }
    }

    /// Run every check and return the accumulated problems
    pub async fn validate(
        &self,
        cluster: &dyn ClusterClient,
        rule_set: &ExposureRuleSet,
    ) -> Result<Vec<Problem>> {
        let spec_path = AttributePath::new(".spec");
        let rules_path = spec_path.field("rules");
        let spec = &rule_set.spec;

        let mut problems = Vec::new();
        problems.extend(self.check_host(&spec_path, spec.host.as_deref()));
        problems.extend(self.check_gateway(&spec_path, spec.gateway.as_deref()));
        if let Some(service) = &spec.service {
            problems.extend(check_service(&spec_path.field("service"), service));
        }
        problems.extend(check_timeout(&spec_path.field("timeout"), spec.timeout));

        if spec.rules.is_empty() {
            problems.push(rules_path.problem("No rules defined"));
        }

        let mut claimed = PathMethods::default();
        for (i, rule) in spec.rules.iter().enumerate() {
            let rule_path = rules_path.index(i);
            problems.extend(self.check_rule(&rule_path, rule, spec.service.is_some()));

            if claimed.claim(&rule.path, rule.unique_methods()) {
                problems
                    .push(rule_path.problem("multiple rules defined for the same path and method"));
            }
        }

        problems.extend(RulesValidator.validate(&rules_path, &spec.rules));
        problems.extend(self.check_injection(cluster, rule_set).await?);

        debug!(
            rule_set = %rule_set.owner_label(),
            problems = problems.len(),
            "Validated rule set"
        );
        Ok(problems)
    }

    fn check_host(&self, spec_path: &AttributePath, host: Option<&str>) -> Vec<Problem> {
        let path = spec_path.field("host");
        match host.map(str::trim) {
            None | Some("") => vec![path.problem("Host was not defined")],
            Some(host)
                if !HOST_REGEX.is_match(&self.config.effective_host(host).to_ascii_lowercase()) =>
            {
                vec![path.problem(format!("Host {} is not a valid host name", host))]
            }
            Some(_) => Vec::new(),
        }
    }

    fn check_gateway(&self, spec_path: &AttributePath, gateway: Option<&str>) -> Vec<Problem> {
        match gateway {
            Some(gateway) if !gateway.contains('/') => vec![spec_path
                .field("gateway")
                .problem("Gateway must be given as <namespace>/<name>")],
            _ => Vec::new(),
        }
    }

    fn check_rule(
        &self,
        rule_path: &AttributePath,
        rule: &Rule,
        has_default_service: bool,
    ) -> Vec<Problem> {
        let mut problems = Vec::new();

        if rule.path.trim().is_empty() {
            problems.push(rule_path.field("path").problem("path is empty"));
        } else if Regex::new(&rule.path).is_err() {
            problems
                .push(rule_path.field("path").problem("path is not a valid regular expression"));
        }

        for method in &rule.methods {
            if !HTTP_METHOD_REGEX.is_match(method) {
                problems.push(
                    rule_path
                        .field("methods")
                        .problem(format!("method {} is not supported", method)),
                );
            }
        }

        match &rule.service {
            Some(service) => problems.extend(check_service(&rule_path.field("service"), service)),
            None if !has_default_service => problems.push(
                rule_path
                    .field("service")
                    .problem("No service defined with no main service on spec level"),
            ),
            None => {}
        }

        problems.extend(check_timeout(&rule_path.field("timeout"), rule.timeout));

        let strategies_path = rule_path.field("accessStrategies");
        if rule.access_strategies.is_empty() {
            problems.push(strategies_path.problem("No accessStrategies defined"));
        }

        let combined = rule.access_strategies.len() > 1;
        for (j, strategy) in rule.access_strategies.iter().enumerate() {
            let strategy_path = strategies_path.index(j);
            if combined && strategy.name == AccessStrategyKind::Allow.as_str() {
                problems.push(strategy_path.field("handler").problem(ALLOW_NOT_EXCLUSIVE));
            }
            match self.registry.strategy(&strategy.name) {
                Some(implementation) => {
                    problems.extend(implementation.validate(&strategy_path, strategy))
                }
                None => problems.push(
                    strategy_path
                        .field("handler")
                        .problem(format!("Unsupported accessStrategy: {}", strategy.name)),
                ),
            }
        }

        for (j, mutator) in rule.mutators.iter().enumerate() {
            let mutator_path = rule_path.field("mutators").index(j);
            match self.registry.mutator(&mutator.name) {
                Some(implementation) => {
                    problems.extend(implementation.validate(&mutator_path, mutator))
                }
                None => problems.push(
                    mutator_path
                        .field("handler")
                        .problem(format!("Unsupported mutator: {}", mutator.name)),
                ),
            }
        }

        problems
    }

    /// Sidecar check for the service behind every rule using jwt
    async fn check_injection(
        &self,
        cluster: &dyn ClusterClient,
        rule_set: &ExposureRuleSet,
    ) -> Result<Vec<Problem>> {
        let injection = InjectionValidator::new(cluster);
        let mut problems = Vec::new();
        let mut checked = HashSet::new();

        for (i, rule) in rule_set.spec.rules.iter().enumerate() {
            let uses_jwt = rule
                .access_strategies
                .iter()
                .any(|s| s.name == AccessStrategyKind::Jwt.as_str());
            if !uses_jwt {
                continue;
            }

            let (service, path) = match (&rule.service, &rule_set.spec.service) {
                (Some(service), _) => {
                    (service, AttributePath::new(".spec.rules").index(i).field("service"))
                }
                (None, Some(service)) => (service, AttributePath::new(".spec.service")),
                (None, None) => continue,
            };
            let Some(name) = service.name.as_deref() else {
                continue;
            };
            let namespace = service.namespace.as_deref().unwrap_or(rule_set.namespace());
            if !checked.insert((namespace, name)) {
                continue;
            }

            // A service not yet deployed cannot be checked
            let Some(found) = cluster.get_service(namespace, name).await? else {
                debug!(namespace, service = name, "Service not found; skipping injection check");
                continue;
            };

            problems.extend(
                injection.validate(&path, found.spec.selector.as_ref(), namespace).await?,
            );
        }

        Ok(problems)
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

/// Methods claimed per rule path; `None` claims every method
#[derive(Debug, Default)]
struct PathMethods<'a>(HashMap<&'a str, Option<HashSet<String>>>);

impl<'a> PathMethods<'a> {
    /// Record `methods` for `path` and report an overlap with earlier rules.
    /// An empty method list stands for every method.
    fn claim(&mut self, path: &'a str, methods: Vec<String>) -> bool {
        let Some(claimed) = self.0.get_mut(path) else {
            self.0.insert(path, (!methods.is_empty()).then(|| methods.into_iter().collect()));
            return false;
        };

        match claimed {
            Some(set) if !methods.is_empty() => {
                methods.into_iter().fold(false, |overlap, method| !set.insert(method) || overlap)
            }
            _ => {
                *claimed = None;
                true
            }
        }
    }
}

fn check_service(path: &AttributePath, service: &BackendService) -> Vec<Problem> {
    let mut problems = Vec::new();
    if service.name.as_deref().map_or(true, |n| n.trim().is_empty()) {
        problems.push(path.field("name").problem("Service name is required"));
    }
    match service.port {
        None => problems.push(path.field("port").problem("Service port is required")),
        Some(port) if port == 0 || port > 65535 => {
            problems.push(path.field("port").problem("Service port must be between 1 and 65535"))
        }
        Some(_) => {}
    }
    problems
}

fn check_timeout(path: &AttributePath, timeout: Option<Timeout>) -> Option<Problem> {
    match timeout {
        Some(Timeout(seconds)) if seconds == 0 || seconds > MAX_TIMEOUT_SECONDS => Some(
            path.problem(format!("timeout must be between 1 and {} seconds", MAX_TIMEOUT_SECONDS)),
        ),
        _ => None,
    }
}
