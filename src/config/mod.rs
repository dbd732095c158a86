//! # Configuration Management
//!
//! Gateway-wide settings (default domain, gateway reference, authorization proxy,
//! CORS, management labels) and logging settings, loaded from the environment.

pub mod settings;

pub use settings::{
    CorsConfig, GatewayConfig, LoggingConfig, ProxyTarget, DEFAULT_ROUTE_TIMEOUT_SECONDS,
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_config_from_env() {
        env::set_var("MESHGATE_DEFAULT_DOMAIN", "example.com");
        env::set_var("MESHGATE_PROXY_PORT", "8080");
        env::set_var("MESHGATE_CORS_ALLOW_METHODS", "GET, POST");
        env::set_var("MESHGATE_MANAGEMENT_LABELS", "team=edge");

        let config = GatewayConfig::from_env().unwrap();
        assert_eq!(config.default_domain, "example.com");
        assert_eq!(config.proxy.port, 8080);
        assert_eq!(config.cors.allow_methods, vec!["GET", "POST"]);
        assert_eq!(config.management_labels.get("team").map(String::as_str), Some("edge"));

        env::remove_var("MESHGATE_DEFAULT_DOMAIN");
        env::remove_var("MESHGATE_PROXY_PORT");
        env::remove_var("MESHGATE_CORS_ALLOW_METHODS");
        env::remove_var("MESHGATE_MANAGEMENT_LABELS");
    }
}
