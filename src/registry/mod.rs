//! # Handler Registry
//!
//! Access strategies and mutators are looked up by name and dispatched through
//! capability traits. The validators and the route synthesizer only talk to the
//! registry; nothing else switches on handler names.

mod builtin;

pub use builtin::{
    CookieMutator, HeaderMutator, JwtStrategy, NoConfigStrategy, PassThroughMutator,
    ProxyStrategy,
};

use crate::domain::{AttributePath, Handler, Problem};
use crate::errors::{Error, Result};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Where a rule's traffic is sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DestinationFamily {
    /// Straight to the rule's backend service
    Direct,
    /// Through the external authorization proxy
    Proxy,
}

/// Known access strategy names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessStrategyKind {
    Allow,
    Noop,
    Jwt,
    Oauth2Introspection,
    Oauth2ClientCredentials,
    CookieSession,
    Anonymous,
    Unauthorized,
}

impl AccessStrategyKind {
    pub const ALL: [AccessStrategyKind; 8] = [
        AccessStrategyKind::Allow,
        AccessStrategyKind::Noop,
        AccessStrategyKind::Jwt,
        AccessStrategyKind::Oauth2Introspection,
        AccessStrategyKind::Oauth2ClientCredentials,
        AccessStrategyKind::CookieSession,
        AccessStrategyKind::Anonymous,
        AccessStrategyKind::Unauthorized,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AccessStrategyKind::Allow => "allow",
            AccessStrategyKind::Noop => "noop",
            AccessStrategyKind::Jwt => "jwt",
            AccessStrategyKind::Oauth2Introspection => "oauth2_introspection",
            AccessStrategyKind::Oauth2ClientCredentials => "oauth2_client_credentials",
            AccessStrategyKind::CookieSession => "cookie_session",
            AccessStrategyKind::Anonymous => "anonymous",
            AccessStrategyKind::Unauthorized => "unauthorized",
        }
    }
}

impl fmt::Display for AccessStrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessStrategyKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::invalid_rule_set(format!("Unsupported accessStrategy: {}", s)))
    }
}

/// Known mutator names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutatorKind {
    Noop,
    Idtoken,
    Header,
    Cookie,
    Hydrator,
}

impl MutatorKind {
    pub const ALL: [MutatorKind; 5] = [
        MutatorKind::Noop,
        MutatorKind::Idtoken,
        MutatorKind::Header,
        MutatorKind::Cookie,
        MutatorKind::Hydrator,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MutatorKind::Noop => "noop",
            MutatorKind::Idtoken => "idtoken",
            MutatorKind::Header => "header",
            MutatorKind::Cookie => "cookie",
            MutatorKind::Hydrator => "hydrator",
        }
    }
}

impl fmt::Display for MutatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MutatorKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::invalid_rule_set(format!("Unsupported mutator: {}", s)))
    }
}

/// Route under construction for one rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDraft {
    pub family: DestinationFamily,
    pub request_headers: BTreeMap<String, String>,
}

impl RouteDraft {
    pub fn new(family: DestinationFamily) -> Self {
        Self { family, request_headers: BTreeMap::new() }
    }
}

/// A rule's mutator paired with its registered implementation
#[derive(Clone, Copy)]
pub struct BoundMutator<'a> {
    pub handler: &'a Handler,
    pub implementation: &'a dyn MutatorHandler,
}

/// Behaviour of one access strategy
pub trait AccessStrategy: Send + Sync + fmt::Debug {
    fn kind(&self) -> AccessStrategyKind;

    /// Validate the handler located at `path`; problems land under `<path>.config`
    fn validate(&self, path: &AttributePath, handler: &Handler) -> Vec<Problem>;

    /// Destination family of rules whose primary strategy is this one
    fn family(&self) -> DestinationFamily;

    /// Whether a direct rule carrying proxy-dependent mutators joins the proxy family
    /// when another rule on its path is proxied
    fn promotable(&self) -> bool {
        false
    }

    /// Add strategy-specific route settings, such as rendered mutators
    fn contribute_route(
        &self,
        _draft: &mut RouteDraft,
        _mutators: &[BoundMutator<'_>],
    ) -> Result<()> {
        Ok(())
    }
}

/// Behaviour of one mutator
pub trait MutatorHandler: Send + Sync + fmt::Debug {
    fn kind(&self) -> MutatorKind;

    fn validate(&self, path: &AttributePath, handler: &Handler) -> Vec<Problem>;

    /// Whether the mutator is only meaningful to the authorization proxy
    fn requires_proxy(&self) -> bool {
        false
    }

    /// Render request headers for routes that bypass the proxy
    fn contribute_headers(
        &self,
        _handler: &Handler,
        _headers: &mut BTreeMap<String, String>,
    ) -> Result<()> {
        Ok(())
    }
}

/// Name-keyed lookup of strategy and mutator implementations
#[derive(Debug, Clone)]
pub struct HandlerRegistry {
    strategies: HashMap<AccessStrategyKind, Arc<dyn AccessStrategy>>,
    mutators: HashMap<MutatorKind, Arc<dyn MutatorHandler>>,
}

impl HandlerRegistry {
    /// Registry without any handlers
    pub fn empty() -> Self {
        Self { strategies: HashMap::new(), mutators: HashMap::new() }
    }

    pub fn register_strategy(&mut self, strategy: Arc<dyn AccessStrategy>) {
        self.strategies.insert(strategy.kind(), strategy);
    }

    pub fn register_mutator(&mut self, mutator: Arc<dyn MutatorHandler>) {
        self.mutators.insert(mutator.kind(), mutator);
    }

    /// Strategy registered under `name`, if any
    pub fn strategy(&self, name: &str) -> Option<&dyn AccessStrategy> {
        let kind = name.parse::<AccessStrategyKind>().ok()?;
        self.strategies.get(&kind).map(|s| s.as_ref())
    }

    /// Mutator registered under `name`, if any
    pub fn mutator(&self, name: &str) -> Option<&dyn MutatorHandler> {
        let kind = name.parse::<MutatorKind>().ok()?;
        self.mutators.get(&kind).map(|m| m.as_ref())
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();

        registry.register_strategy(Arc::new(NoConfigStrategy::new(
            AccessStrategyKind::Allow,
            DestinationFamily::Direct,
        )));
        registry.register_strategy(Arc::new(JwtStrategy::default()));
        for kind in [
            AccessStrategyKind::Noop,
            AccessStrategyKind::Anonymous,
            AccessStrategyKind::Unauthorized,
        ] {
            registry
                .register_strategy(Arc::new(NoConfigStrategy::new(kind, DestinationFamily::Proxy)));
        }
        for kind in [
            AccessStrategyKind::Oauth2Introspection,
            AccessStrategyKind::Oauth2ClientCredentials,
            AccessStrategyKind::CookieSession,
        ] {
            registry.register_strategy(Arc::new(ProxyStrategy::new(kind)));
        }

        registry.register_mutator(Arc::new(PassThroughMutator::new(MutatorKind::Noop, false)));
        registry.register_mutator(Arc::new(PassThroughMutator::new(MutatorKind::Idtoken, true)));
        registry.register_mutator(Arc::new(PassThroughMutator::new(MutatorKind::Hydrator, true)));
        registry.register_mutator(Arc::new(HeaderMutator));
        registry.register_mutator(Arc::new(CookieMutator));

        registry
    }
}
