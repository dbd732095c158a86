//! Common test utilities for all integration tests.
//!
//! Rule-set builders, handler payloads and a fixed gateway configuration.

#![allow(dead_code)]
#![allow(clippy::duplicate_mod)]

use meshgate::config::{CorsConfig, GatewayConfig, ProxyTarget};
use meshgate::domain::{
    BackendService, Container, ExposureRuleSet, Handler, ObjectMeta, Pod, RawConfig, Rule,
    RuleSetSpec, ServiceObject, ServiceSpec,
};
use serde_json::{json, Value};
use std::collections::BTreeMap;

pub const API_NAME: &str = "test-apirule";
pub const API_NAMESPACE: &str = "some-namespace";
pub const API_PATH: &str = "/.*";
pub const HEADERS_API_PATH: &str = "/headers";
pub const SERVICE_NAME: &str = "example-service";
pub const SERVICE_PORT: u32 = 8080;
pub const SERVICE_HOST: &str = "myservice.mydomain.com";
pub const PROXY_HOST: &str = "auth-proxy.auth-system.svc.cluster.local";
pub const PROXY_PORT: u16 = 4455;
pub const JWT_ISSUER: &str = "https://issuer.test/";
pub const JWKS_URI: &str = "file://.well-known/jwks.json";
pub const TEST_LABEL_KEY: &str = "app.kubernetes.io/managed-by";
pub const TEST_LABEL_VALUE: &str = "meshgate-tests";

/// Gateway configuration shared by the integration tests
pub fn test_config() -> GatewayConfig {
    let mut management_labels = BTreeMap::new();
    management_labels.insert(TEST_LABEL_KEY.to_string(), TEST_LABEL_VALUE.to_string());

    GatewayConfig {
        default_domain: "mydomain.com".to_string(),
        gateway: "gateway-system/shared-gateway".to_string(),
        proxy: ProxyTarget { host: PROXY_HOST.to_string(), port: PROXY_PORT },
        cors: CorsConfig {
            allow_origins: vec!["https://example.com".to_string()],
            allow_methods: vec!["GET".to_string(), "POST".to_string()],
            allow_headers: vec!["Authorization".to_string()],
        },
        management_labels,
        default_timeout_seconds: 180,
    }
}

pub fn service_fqdn(name: &str, namespace: &str) -> String {
    format!("{}.{}.svc.cluster.local", name, namespace)
}

pub fn raw(value: Value) -> RawConfig {
    RawConfig::from_value(&value)
}

pub fn handler(name: &str) -> Handler {
    Handler::new(name)
}

pub fn handler_with(name: &str, config: Value) -> Handler {
    Handler::with_config(name, raw(config))
}

/// JWT handler with one authentication per issuer
pub fn jwt_handler(issuers: &[&str]) -> Handler {
    let authentications: Vec<Value> =
        issuers.iter().map(|issuer| json!({"issuer": issuer, "jwksUri": JWKS_URI})).collect();
    handler_with("jwt", json!({ "authentications": authentications }))
}

/// JWT handler whose single authentication reads the token from `header`
pub fn jwt_from_header(issuer: &str, header: &str) -> Handler {
    handler_with(
        "jwt",
        json!({"authentications": [
            {"issuer": issuer, "jwksUri": JWKS_URI, "fromHeaders": [{"name": header}]}
        ]}),
    )
}

/// Legacy proxy-style JWT payload
pub fn legacy_jwt_handler() -> Handler {
    handler_with(
        "jwt",
        json!({"trusted_issuers": [JWT_ISSUER], "jwks": [], "required_scope": ["read", "write"]}),
    )
}

pub fn rule(
    path: &str,
    methods: &[&str],
    mutators: Vec<Handler>,
    strategies: Vec<Handler>,
) -> Rule {
    Rule {
        path: path.to_string(),
        methods: methods.iter().map(|m| m.to_string()).collect(),
        access_strategies: strategies,
        mutators,
        ..Default::default()
    }
}

pub fn rule_set(rules: Vec<Rule>) -> ExposureRuleSet {
    ExposureRuleSet {
        metadata: ObjectMeta::named(API_NAME, API_NAMESPACE),
        spec: RuleSetSpec {
            host: Some("myservice".to_string()),
            service: Some(BackendService::new(SERVICE_NAME, SERVICE_PORT)),
            rules,
            ..Default::default()
        },
    }
}

pub fn pod(name: &str, namespace: &str, labels: &[(&str, &str)], containers: &[&str]) -> Pod {
    let mut metadata = ObjectMeta::named(name, namespace);
    for (key, value) in labels {
        metadata = metadata.with_label(*key, *value);
    }
    let mut pod = Pod { metadata, ..Default::default() };
    pod.spec.containers = containers.iter().map(|c| Container::named(*c)).collect();
    pod
}

pub fn service_object(name: &str, namespace: &str, selector: &[(&str, &str)]) -> ServiceObject {
    ServiceObject {
        metadata: ObjectMeta::named(name, namespace),
        spec: ServiceSpec {
            selector: Some(
                selector.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            ),
        },
    }
}

pub fn selector(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}
