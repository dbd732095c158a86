//! # Configuration Settings
//!
//! Process-wide settings consumed by the validators and the route synthesizer.
//! Values are passed into constructors; nothing here is global.

use crate::errors::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use validator::Validate;

static DNS_NAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$")
        .expect("DNS_NAME_REGEX should be a valid regex pattern")
});

/// Timeout applied to routes when neither the rule nor the rule set sets one
pub const DEFAULT_ROUTE_TIMEOUT_SECONDS: u32 = 180;

/// Gateway-wide configuration for rule validation and route synthesis
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GatewayConfig {
    /// Domain appended to hosts that carry no domain component
    #[validate(length(min = 1, message = "Default domain cannot be empty"))]
    pub default_domain: String,

    /// Gateway reference used when a rule set does not name one
    #[validate(length(min = 1, message = "Gateway cannot be empty"))]
    pub gateway: String,

    /// Authorization proxy receiving traffic for legacy access strategies
    #[validate(nested)]
    pub proxy: ProxyTarget,

    /// CORS policy copied onto every synthesized route
    #[validate(nested)]
    pub cors: CorsConfig,

    /// Labels stamped on every created routing object
    pub management_labels: BTreeMap<String, String>,

    /// Route timeout fallback in seconds
    #[validate(range(
        min = 1,
        max = 3900,
        message = "Default timeout must be between 1 and 3900 seconds"
    ))]
    pub default_timeout_seconds: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        let mut management_labels = BTreeMap::new();
        management_labels
            .insert("app.kubernetes.io/managed-by".to_string(), "meshgate".to_string());

        Self {
            default_domain: "local.meshgate.dev".to_string(),
            gateway: "meshgate-system/meshgate-gateway".to_string(),
            proxy: ProxyTarget::default(),
            cors: CorsConfig::default(),
            management_labels,
            default_timeout_seconds: DEFAULT_ROUTE_TIMEOUT_SECONDS,
        }
    }
}

impl GatewayConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(Error::from)?;
        self.validate_custom()
    }

    /// Checks the validator derive cannot express
    fn validate_custom(&self) -> Result<()> {
        if !DNS_NAME_REGEX.is_match(&self.default_domain) {
            return Err(Error::config(format!(
                "Default domain '{}' is not a valid DNS name",
                self.default_domain
            )));
        }

        if !self.gateway.contains('/') {
            return Err(Error::config("Gateway must be given as <namespace>/<name>"));
        }

        for origin in &self.cors.allow_origins {
            Regex::new(origin).map_err(|e| {
                Error::config(format!("Invalid CORS origin regex '{}': {}", origin, e))
            })?;
        }

        Ok(())
    }

    /// Host as exposed: hosts without a domain component get the default domain
    pub fn effective_host(&self, host: &str) -> String {
        if host.contains('.') {
            host.to_string()
        } else {
            format!("{}.{}", host, self.default_domain)
        }
    }

    /// Route timeout fallback as a Duration
    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.default_timeout_seconds))
    }

    /// Create GatewayConfig from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let default_domain =
            std::env::var("MESHGATE_DEFAULT_DOMAIN").unwrap_or(defaults.default_domain);

        let gateway = std::env::var("MESHGATE_GATEWAY").unwrap_or(defaults.gateway);

        let proxy = ProxyTarget {
            host: std::env::var("MESHGATE_PROXY_HOST").unwrap_or(defaults.proxy.host),
            port: match std::env::var("MESHGATE_PROXY_PORT") {
                Ok(value) => value
                    .parse()
                    .map_err(|e| Error::config(format!("Invalid proxy port: {}", e)))?,
                Err(_) => defaults.proxy.port,
            },
        };

        let cors = CorsConfig {
            allow_origins: csv_var("MESHGATE_CORS_ALLOW_ORIGINS")
                .unwrap_or(defaults.cors.allow_origins),
            allow_methods: csv_var("MESHGATE_CORS_ALLOW_METHODS")
                .unwrap_or(defaults.cors.allow_methods),
            allow_headers: csv_var("MESHGATE_CORS_ALLOW_HEADERS")
                .unwrap_or(defaults.cors.allow_headers),
        };

        let management_labels = match std::env::var("MESHGATE_MANAGEMENT_LABELS") {
            Ok(value) => parse_labels(&value)?,
            Err(_) => defaults.management_labels,
        };

        let default_timeout_seconds = match std::env::var("MESHGATE_DEFAULT_TIMEOUT_SECONDS") {
            Ok(value) => value
                .parse()
                .map_err(|e| Error::config(format!("Invalid default timeout: {}", e)))?,
            Err(_) => defaults.default_timeout_seconds,
        };

        let config = Self {
            default_domain,
            gateway,
            proxy,
            cors,
            management_labels,
            default_timeout_seconds,
        };
        config.validate()?;
        Ok(config)
    }
}

/// In-cluster authorization proxy address
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq, Eq)]
pub struct ProxyTarget {
    /// Fully qualified service host
    #[validate(length(min = 1, message = "Proxy host cannot be empty"))]
    pub host: String,

    /// Service port
    #[validate(range(min = 1, message = "Proxy port must be between 1 and 65535"))]
    pub port: u16,
}

impl Default for ProxyTarget {
    fn default() -> Self {
        Self { host: "auth-proxy.meshgate-system.svc.cluster.local".to_string(), port: 4455 }
    }
}

/// CORS policy applied to synthesized routes
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq, Eq)]
pub struct CorsConfig {
    /// Allowed origins, each a regex
    pub allow_origins: Vec<String>,

    /// Allowed methods
    #[validate(length(min = 1, message = "At least one CORS method must be allowed"))]
    pub allow_methods: Vec<String>,

    /// Allowed request headers
    pub allow_headers: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origins: vec![".*".to_string()],
            allow_methods: ["GET", "POST", "PUT", "DELETE", "PATCH"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            allow_headers: ["Authorization", "Content-Type", "*"]
                .iter()
                .map(|h| h.to_string())
                .collect(),
        }
    }
}

/// Logging configuration for the binary
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Enable JSON structured logging
    pub json_logging: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { log_level: "info".to_string(), json_logging: false }
    }
}

impl LoggingConfig {
    /// Create LoggingConfig from environment variables
    pub fn from_env() -> Self {
        let log_level =
            std::env::var("MESHGATE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let json_logging = std::env::var("MESHGATE_JSON_LOGS")
            .map(|s| s.to_lowercase() == "true" || s == "1")
            .unwrap_or(false);

        Self { log_level, json_logging }
    }
}

fn csv_var(name: &str) -> Option<Vec<String>> {
    std::env::var(name).ok().map(|value| {
        value.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect()
    })
}

fn parse_labels(value: &str) -> Result<BTreeMap<String, String>> {
    let mut labels = BTreeMap::new();
    for pair in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (key, val) = pair
            .split_once('=')
            .ok_or_else(|| Error::config(format!("Invalid label '{}', expected key=value", pair)))?;
        labels.insert(key.trim().to_string(), val.trim().to_string());
    }
    Ok(labels)
}
