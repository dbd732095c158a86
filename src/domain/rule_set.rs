//! Exposure rule set types
//!
//! The declarative input of the controller: a host, a default backend service and
//! an ordered list of path/method rules with their access strategies and mutators.

use super::meta::{owner_label_value, ObjectMeta};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::time::Duration;

/// Path value that synthesizes a prefix match on `/`
pub const CATCH_ALL_PATH: &str = "/*";

/// Top-level exposure rule set
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExposureRuleSet {
    #[serde(default)]
    pub metadata: ObjectMeta,
    pub spec: RuleSetSpec,
}

impl ExposureRuleSet {
    pub fn name(&self) -> &str {
        self.metadata.name()
    }

    pub fn namespace(&self) -> &str {
        self.metadata.namespace()
    }

    /// Value of the owner label on routing objects synthesized from this rule set
    pub fn owner_label(&self) -> String {
        owner_label_value(self.name(), self.namespace())
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RuleSetSpec {
    /// Exposed host, either an FQDN or a bare subdomain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Default backend for rules without an override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<BackendService>,

    /// Gateway reference `<namespace>/<name>`; falls back to the configured gateway
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Timeout>,

    #[serde(default)]
    pub rules: Vec<Rule>,
}

/// Backend service reference. Every field may be omitted in the input.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BackendService {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u32>,
}

impl BackendService {
    pub fn new(name: impl Into<String>, port: u32) -> Self {
        Self { name: Some(name.into()), namespace: None, port: Some(port) }
    }

    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

/// A single path/method rule
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub path: String,

    #[serde(default)]
    pub methods: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<BackendService>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Timeout>,

    #[serde(default)]
    pub access_strategies: Vec<Handler>,

    #[serde(default)]
    pub mutators: Vec<Handler>,
}

impl Rule {
    /// Methods in declaration order with duplicates dropped
    pub fn unique_methods(&self) -> Vec<String> {
        let mut methods: Vec<String> = Vec::with_capacity(self.methods.len());
        for method in &self.methods {
            if !methods.contains(method) {
                methods.push(method.clone());
            }
        }
        methods
    }

    /// The first access strategy decides the destination family
    pub fn primary_strategy(&self) -> Option<&Handler> {
        self.access_strategies.first()
    }
}

/// A named access strategy or mutator with its opaque configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Handler {
    #[serde(alias = "handler")]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<RawConfig>,
}

impl Handler {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), config: None }
    }

    pub fn with_config(name: impl Into<String>, config: RawConfig) -> Self {
        Self { name: name.into(), config: Some(config) }
    }

    /// Raw payload bytes, empty when no config was supplied
    pub fn config_bytes(&self) -> &[u8] {
        self.config.as_ref().map(RawConfig::as_bytes).unwrap_or_default()
    }

    /// True for an absent, blank, `null` or `{}` payload
    pub fn config_is_empty(&self) -> bool {
        self.config.as_ref().map_or(true, RawConfig::is_empty)
    }
}

/// Serialized handler configuration, decoded per declared handler name.
///
/// In rule-set documents the config is an inline object; it is kept as JSON bytes so
/// malformed payloads survive until validation reports them.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RawConfig(Vec<u8>);

impl RawConfig {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn from_value(value: &serde_json::Value) -> Self {
        Self(value.to_string().into_bytes())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        let trimmed = String::from_utf8_lossy(&self.0);
        let trimmed = trimmed.trim();
        if trimmed.is_empty() || trimmed == "null" {
            return true;
        }
        matches!(
            serde_json::from_slice::<serde_json::Value>(&self.0),
            Ok(serde_json::Value::Object(map)) if map.is_empty()
        )
    }

    /// Decode the payload into a typed config
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.0)
    }
}

impl fmt::Debug for RawConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawConfig({})", String::from_utf8_lossy(&self.0))
    }
}

impl Serialize for RawConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match serde_json::from_slice::<serde_json::Value>(&self.0) {
            Ok(value) => value.serialize(serializer),
            Err(_) => serializer.serialize_str(&String::from_utf8_lossy(&self.0)),
        }
    }
}

impl<'de> Deserialize<'de> for RawConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

/// Route timeout in whole seconds
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timeout(pub u32);

impl Timeout {
    pub fn as_duration(self) -> Duration {
        Duration::from_secs(u64::from(self.0))
    }
}

impl From<u32> for Timeout {
    fn from(seconds: u32) -> Self {
        Self(seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn raw_config_empty_variants() {
        assert!(Handler::new("jwt").config_is_empty());
        assert!(RawConfig::from_bytes("").is_empty());
        assert!(RawConfig::from_bytes("  ").is_empty());
        assert!(RawConfig::from_bytes("null").is_empty());
        assert!(RawConfig::from_bytes("{}").is_empty());
        assert!(!RawConfig::from_bytes("/abc]").is_empty());
        assert!(!RawConfig::from_value(&json!({"a": 1})).is_empty());
    }

    #[test]
    fn rule_set_loads_from_yaml() {
        let yaml = r#"
metadata:
  name: orders
  namespace: shop
spec:
  host: orders
  service:
    name: orders-svc
    port: 8080
  timeout: 10
  rules:
    - path: /api/.*
      methods: [GET, POST, GET]
      accessStrategies:
        - handler: jwt
          config:
            authentications:
              - issuer: https://issuer.example.com
                jwksUri: https://issuer.example.com/jwks
      mutators:
        - handler: header
          config:
            headers:
              x-api: v1
"#;
        let rule_set: ExposureRuleSet = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(rule_set.owner_label(), "orders.shop");
        assert_eq!(rule_set.spec.timeout, Some(Timeout(10)));

        let rule = &rule_set.spec.rules[0];
        assert_eq!(rule.unique_methods(), vec!["GET", "POST"]);
        assert_eq!(rule.primary_strategy().map(|h| h.name.as_str()), Some("jwt"));

        let config: serde_json::Value = rule.access_strategies[0]
            .config
            .as_ref()
            .unwrap()
            .decode()
            .unwrap();
        assert_eq!(
            config["authentications"][0]["issuer"],
            json!("https://issuer.example.com")
        );
    }

    #[test]
    fn raw_config_serializes_inline() {
        let handler = Handler::with_config("header", RawConfig::from_value(&json!({"x": 1})));
        let value = serde_json::to_value(&handler).unwrap();
        assert_eq!(value, json!({"name": "header", "config": {"x": 1}}));
    }
}
