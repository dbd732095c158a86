//! # Meshgate
//!
//! Validation and mesh-route synthesis for declarative API exposure rules.
//!
//! An exposure rule set names a host, a backend service and a list of rules; each
//! rule pairs a path and methods with access strategies and mutators. This crate
//! checks rule sets for defects and turns acceptable ones into a single Istio
//! `VirtualService`, created or updated through a pluggable cluster client.
//!
//! ## Architecture
//!
//! ```text
//! ExposureRuleSet → RuleSetValidator → VirtualServiceProcessor → Change set
//!                        ↓                      ↓                    ↓
//!                  HandlerRegistry        HandlerRegistry      ClusterClient
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use meshgate::{GatewayConfig, InMemoryCluster, Reconciler, Result};
//!
//! # async fn run(rule_set: meshgate::domain::ExposureRuleSet) -> Result<()> {
//! let cluster = InMemoryCluster::new();
//! let outcome = Reconciler::new(GatewayConfig::default()).reconcile(&cluster, &rule_set).await?;
//! println!("{} problems", outcome.problems().len());
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod cluster;
pub mod config;
pub mod domain;
pub mod errors;
pub mod observability;
pub mod reconcile;
pub mod registry;
pub mod synthesis;
pub mod validation;

// Re-export commonly used types and traits
pub use cluster::{ClusterClient, ClusterSnapshot, InMemoryCluster};
pub use config::{GatewayConfig, LoggingConfig};
pub use errors::{Error, Result};
pub use reconcile::{ReconcileOutcome, Reconciler};
pub use registry::HandlerRegistry;
pub use synthesis::VirtualServiceProcessor;
pub use validation::RuleSetValidator;

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
