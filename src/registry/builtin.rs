//! Built-in access strategies and mutators

use super::{
    AccessStrategy, AccessStrategyKind, BoundMutator, DestinationFamily, MutatorHandler,
    MutatorKind, RouteDraft,
};
use crate::domain::{AttributePath, CookieMutatorConfig, Handler, HeaderMutatorConfig, Problem};
use crate::errors::{Error, Result};
use crate::validation::handler::{
    validate_cookie_mutator, validate_decodable, validate_header_mutator,
    validate_oauth2_introspection, validate_optional_object, validate_without_config,
    JwtHandlerValidator,
};
use std::collections::BTreeMap;

const COOKIE_HEADER: &str = "Cookie";

/// Headers owned by the gateway; mutators may not replace them
fn is_forwarded_header(name: &str) -> bool {
    name.to_ascii_lowercase().starts_with("x-forwarded-")
}

fn contains_header(headers: &BTreeMap<String, String>, name: &str) -> bool {
    headers.keys().any(|k| k.eq_ignore_ascii_case(name))
}

/// Strategy that takes no config
#[derive(Debug, Clone, Copy)]
pub struct NoConfigStrategy {
    kind: AccessStrategyKind,
    family: DestinationFamily,
}

impl NoConfigStrategy {
    pub fn new(kind: AccessStrategyKind, family: DestinationFamily) -> Self {
        Self { kind, family }
    }
}

impl AccessStrategy for NoConfigStrategy {
    fn kind(&self) -> AccessStrategyKind {
        self.kind
    }

    fn validate(&self, path: &AttributePath, handler: &Handler) -> Vec<Problem> {
        validate_without_config(path, handler)
    }

    fn family(&self) -> DestinationFamily {
        self.family
    }
}

/// JWT validated by the mesh itself; renders mutators on direct routes
#[derive(Debug, Clone, Copy, Default)]
pub struct JwtStrategy {
    validator: JwtHandlerValidator,
}

impl AccessStrategy for JwtStrategy {
    fn kind(&self) -> AccessStrategyKind {
        AccessStrategyKind::Jwt
    }

    fn validate(&self, path: &AttributePath, handler: &Handler) -> Vec<Problem> {
        self.validator.validate(path, handler)
    }

    fn family(&self) -> DestinationFamily {
        DestinationFamily::Direct
    }

    fn promotable(&self) -> bool {
        true
    }

    fn contribute_route(
        &self,
        draft: &mut RouteDraft,
        mutators: &[BoundMutator<'_>],
    ) -> Result<()> {
        if draft.family != DestinationFamily::Direct {
            return Ok(());
        }
        for bound in mutators {
            bound.implementation.contribute_headers(bound.handler, &mut draft.request_headers)?;
        }
        Ok(())
    }
}

/// Strategy enforced by the external authorization proxy
#[derive(Debug, Clone, Copy)]
pub struct ProxyStrategy {
    kind: AccessStrategyKind,
}

impl ProxyStrategy {
    pub fn new(kind: AccessStrategyKind) -> Self {
        Self { kind }
    }
}

impl AccessStrategy for ProxyStrategy {
    fn kind(&self) -> AccessStrategyKind {
        self.kind
    }

    fn validate(&self, path: &AttributePath, handler: &Handler) -> Vec<Problem> {
        match self.kind {
            AccessStrategyKind::Oauth2Introspection => validate_oauth2_introspection(path, handler),
            _ => validate_optional_object(path, handler),
        }
    }

    fn family(&self) -> DestinationFamily {
        DestinationFamily::Proxy
    }
}

/// Mutator with nothing to render into the routing object
#[derive(Debug, Clone, Copy)]
pub struct PassThroughMutator {
    kind: MutatorKind,
    requires_proxy: bool,
}

impl PassThroughMutator {
    pub fn new(kind: MutatorKind, requires_proxy: bool) -> Self {
        Self { kind, requires_proxy }
    }
}

impl MutatorHandler for PassThroughMutator {
    fn kind(&self) -> MutatorKind {
        self.kind
    }

    fn validate(&self, path: &AttributePath, handler: &Handler) -> Vec<Problem> {
        validate_decodable(path, handler)
    }

    fn requires_proxy(&self) -> bool {
        self.requires_proxy
    }
}

/// Injects fixed request headers
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderMutator;

impl MutatorHandler for HeaderMutator {
    fn kind(&self) -> MutatorKind {
        MutatorKind::Header
    }

    fn validate(&self, path: &AttributePath, handler: &Handler) -> Vec<Problem> {
        validate_header_mutator(path, handler)
    }

    fn contribute_headers(
        &self,
        handler: &Handler,
        headers: &mut BTreeMap<String, String>,
    ) -> Result<()> {
        let config: HeaderMutatorConfig = decode(handler)?;
        for (name, value) in config.headers {
            if is_forwarded_header(&name) && contains_header(headers, &name) {
                continue;
            }
            headers.insert(name, value);
        }
        Ok(())
    }
}

/// Appends cookies to the `Cookie` request header
#[derive(Debug, Clone, Copy, Default)]
pub struct CookieMutator;

impl MutatorHandler for CookieMutator {
    fn kind(&self) -> MutatorKind {
        MutatorKind::Cookie
    }

    fn validate(&self, path: &AttributePath, handler: &Handler) -> Vec<Problem> {
        validate_cookie_mutator(path, handler)
    }

    fn contribute_headers(
        &self,
        handler: &Handler,
        headers: &mut BTreeMap<String, String>,
    ) -> Result<()> {
        let config: CookieMutatorConfig = decode(handler)?;
        let rendered = config.render();
        if rendered.is_empty() {
            return Ok(());
        }

        let key = headers
            .keys()
            .find(|k| k.eq_ignore_ascii_case(COOKIE_HEADER))
            .cloned()
            .unwrap_or_else(|| COOKIE_HEADER.to_string());
        let value = match headers.get(&key) {
            Some(existing) if !existing.is_empty() => format!("{}; {}", existing, rendered),
            _ => rendered,
        };
        headers.insert(key, value);
        Ok(())
    }
}

fn decode<T: serde::de::DeserializeOwned + Default>(handler: &Handler) -> Result<T> {
    match handler.config.as_ref().filter(|raw| !raw.is_empty()) {
        Some(raw) => raw
            .decode()
            .map_err(|e| Error::serialization(format!("{} mutator config", handler.name), e)),
        None => Ok(T::default()),
    }
}
