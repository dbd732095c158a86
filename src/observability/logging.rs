//! # Structured Logging
//!
//! Span macros and startup logging built on the tracing ecosystem.

/// Create a tracing span for one reconciliation of a rule set.
///
/// Each span carries a fresh `reconcile_id` so log lines from concurrent
/// reconciliations can be told apart.
///
/// ```rust,ignore
/// let span = reconcile_span!("orders", "shop");
/// let span = reconcile_span!("orders", "shop", dry_run = true);
/// ```
#[macro_export]
macro_rules! reconcile_span {
    ($name:expr, $namespace:expr) => {
        tracing::info_span!(
            "reconcile",
            rule_set = %$name,
            namespace = %$namespace,
            reconcile_id = %uuid::Uuid::new_v4()
        )
    };
    ($name:expr, $namespace:expr, $($field:tt)*) => {
        tracing::info_span!(
            "reconcile",
            rule_set = %$name,
            namespace = %$namespace,
            reconcile_id = %uuid::Uuid::new_v4(),
            $($field)*
        )
    };
}

/// Create a tracing span for a cluster write
#[macro_export]
macro_rules! cluster_span {
    ($action:expr) => {
        tracing::debug_span!(
            "cluster_write",
            action = %$action,
            operation_id = %uuid::Uuid::new_v4()
        )
    };
    ($action:expr, $($field:tt)*) => {
        tracing::debug_span!(
            "cluster_write",
            action = %$action,
            operation_id = %uuid::Uuid::new_v4(),
            $($field)*
        )
    };
}

/// Log configuration at startup
pub fn log_config_info(config: &crate::config::GatewayConfig) {
    tracing::info!(
        default_domain = %config.default_domain,
        gateway = %config.gateway,
        proxy = %format!("{}:{}", config.proxy.host, config.proxy.port),
        default_timeout_seconds = config.default_timeout_seconds,
        "Meshgate gateway configuration"
    );
}
