//! Object metadata shared by rule sets, routing objects and cluster objects

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label key recording which rule set owns a routing object
pub const OWNER_LABEL_KEY: &str = "rules.meshgate.io/v1beta1";

/// Owner label key written by earlier releases; still recognized on lookup
pub const LEGACY_OWNER_LABEL_KEY: &str = "rules.meshgate.io/v1alpha1";

/// Subset of Kubernetes object metadata the core reads and writes
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generate_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
}

impl ObjectMeta {
    /// Metadata with a name and namespace
    pub fn named(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self { name: Some(name.into()), namespace: Some(namespace.into()), ..Default::default() }
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    pub fn namespace(&self) -> &str {
        self.namespace.as_deref().unwrap_or_default()
    }

    /// Add a label, builder style
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Whether every selector entry is present in this object's labels
    pub fn matches_labels(&self, selector: &BTreeMap<String, String>) -> bool {
        selector.iter().all(|(k, v)| self.labels.get(k) == Some(v))
    }
}

/// Owner label value `<name>.<namespace>` for a rule set
pub fn owner_label_value(name: &str, namespace: &str) -> String {
    format!("{}.{}", name, namespace)
}
