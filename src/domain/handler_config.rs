//! Typed payloads for access strategies and mutators
//!
//! Handler configs travel as [`RawConfig`](super::RawConfig) bytes and are decoded
//! into these types by name.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// An explicit `null` list decodes as empty
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<Vec<T>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Current JWT access-strategy configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JwtConfig {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub authentications: Vec<JwtAuthentication>,

    /// Entries may be `null` in the input; those are reported, not dropped
    #[serde(default, deserialize_with = "null_as_empty")]
    pub authorizations: Vec<Option<JwtAuthorization>>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JwtAuthentication {
    #[serde(default)]
    pub issuer: String,

    #[serde(default)]
    pub jwks_uri: String,

    #[serde(default, deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    pub from_headers: Vec<JwtHeader>,

    /// Query parameter names
    #[serde(default, deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    pub from_params: Vec<String>,
}

impl JwtAuthentication {
    /// Where the token is read from; compared across rules sharing an issuer
    pub fn token_location(&self) -> TokenLocation {
        TokenLocation {
            from_headers: self.from_headers.clone(),
            from_params: self.from_params.clone(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JwtHeader {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

/// Token-location shape of one authentication
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenLocation {
    pub from_headers: Vec<JwtHeader>,
    pub from_params: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JwtAuthorization {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_scopes: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audiences: Option<Vec<String>>,
}

/// Settings understood by the external proxy's token introspection handler
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Oauth2IntrospectionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub introspection_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_scope: Option<Vec<String>>,
}

/// Config of the `header` mutator
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HeaderMutatorConfig {
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

/// Config of the `cookie` mutator
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CookieMutatorConfig {
    #[serde(default)]
    pub cookies: BTreeMap<String, String>,
}

impl CookieMutatorConfig {
    /// `name=value` pairs joined by `"; "`
    pub fn render(&self) -> String {
        self.cookies.iter().map(|(k, v)| format!("{}={}", k, v)).collect::<Vec<_>>().join("; ")
    }
}
