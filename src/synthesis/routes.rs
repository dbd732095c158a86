//! Route candidates and merging
//!
//! Every rule yields one candidate route. Candidates that agree on path, destination
//! and request headers collapse into one entry with the union of their methods.

use crate::config::CorsConfig;
use crate::domain::{
    CorsPolicy, Destination, Headers, HttpMatchRequest, HttpRoute, HttpRouteDestination,
    StringMatch, CATCH_ALL_PATH,
};
use std::collections::BTreeMap;
use std::time::Duration;

/// Request header carrying the exposed host
pub const FORWARDED_HOST_HEADER: &str = "x-forwarded-host";

/// URI matcher for a rule path; `/*` is the catch-all prefix
pub fn uri_match(path: &str) -> StringMatch {
    if path == CATCH_ALL_PATH {
        StringMatch::Prefix("/".to_string())
    } else {
        StringMatch::Regex(path.to_string())
    }
}

/// Method matcher; `None` matches every method
pub fn method_match(methods: &[String]) -> Option<StringMatch> {
    if methods.is_empty() {
        None
    } else {
        Some(StringMatch::Regex(format!("^({})$", methods.join("|"))))
    }
}

/// CORS policy copied from the gateway configuration
pub fn cors_policy(cors: &CorsConfig) -> CorsPolicy {
    CorsPolicy {
        allow_origins: cors.allow_origins.iter().cloned().map(StringMatch::Regex).collect(),
        allow_methods: cors.allow_methods.clone(),
        allow_headers: cors.allow_headers.clone(),
    }
}

/// One rule's route before merging
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteCandidate {
    pub path: String,
    /// Empty means every method
    pub methods: Vec<String>,
    pub destination: Destination,
    pub request_headers: BTreeMap<String, String>,
    pub timeout: Duration,
}

impl RouteCandidate {
    fn merges_with(&self, other: &RouteCandidate) -> bool {
        self.path == other.path
            && self.destination == other.destination
            && self.request_headers == other.request_headers
    }

    fn absorb(&mut self, other: RouteCandidate) {
        if self.methods.is_empty() || other.methods.is_empty() {
            self.methods.clear();
            return;
        }
        for method in other.methods {
            if !self.methods.contains(&method) {
                self.methods.push(method);
            }
        }
    }

    pub fn into_http_route(self, cors: &CorsPolicy) -> HttpRoute {
        HttpRoute {
            matches: vec![HttpMatchRequest {
                uri: Some(uri_match(&self.path)),
                method: method_match(&self.methods),
            }],
            route: vec![HttpRouteDestination { destination: self.destination, weight: None }],
            headers: if self.request_headers.is_empty() {
                None
            } else {
                Some(Headers::set_request(self.request_headers))
            },
            cors_policy: Some(cors.clone()),
            timeout: Some(self.timeout),
        }
    }
}

/// Merge candidates in rule order; the first candidate of a group keeps its
/// match, destination and timeout
pub fn merge_candidates(candidates: Vec<RouteCandidate>) -> Vec<RouteCandidate> {
    let mut merged: Vec<RouteCandidate> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        match merged.iter_mut().find(|existing| existing.merges_with(&candidate)) {
            Some(existing) => existing.absorb(candidate),
            None => merged.push(candidate),
        }
    }
    merged
}
