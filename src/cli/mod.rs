//! # Command Line Interface
//!
//! Offline validation and rendering of exposure rule sets. Cluster state comes from
//! an optional snapshot file; without one the cluster is empty.

pub mod output;

use crate::cluster::{ClusterSnapshot, InMemoryCluster};
use crate::config::{GatewayConfig, LoggingConfig};
use crate::domain::ExposureRuleSet;
use crate::observability::{init_logging, log_config_info};
use crate::reconcile::{ReconcileOutcome, Reconciler};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use output::{print_changes, print_problems, OutputFormat};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "meshgate")]
#[command(about = "Validate exposure rule sets and render their mesh routes")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate a rule set and list its problems
    #[command(
        after_help = "EXAMPLES:\n    # Validate against an empty cluster\n    meshgate validate --file rule-set.yaml\n\n    # Validate against a cluster snapshot\n    meshgate validate --file rule-set.yaml --cluster snapshot.yaml"
    )]
    Validate {
        /// Path to the rule set (YAML or JSON)
        #[arg(short, long, value_name = "FILE")]
        file: PathBuf,

        /// Path to a cluster snapshot (YAML or JSON)
        #[arg(long, value_name = "FILE")]
        cluster: Option<PathBuf>,

        /// Output format (json, yaml, or table)
        #[arg(short, long, default_value = "table", value_parser = ["json", "yaml", "table"])]
        output: String,
    },

    /// Render the change set a rule set reconciles to
    #[command(
        after_help = "EXAMPLES:\n    # Render as YAML\n    meshgate render --file rule-set.yaml\n\n    # Render as JSON, updating an object from the snapshot\n    meshgate render --file rule-set.yaml --cluster snapshot.yaml --output json"
    )]
    Render {
        /// Path to the rule set (YAML or JSON)
        #[arg(short, long, value_name = "FILE")]
        file: PathBuf,

        /// Path to a cluster snapshot (YAML or JSON)
        #[arg(long, value_name = "FILE")]
        cluster: Option<PathBuf>,

        /// Output format (json, yaml, or table)
        #[arg(short, long, default_value = "yaml", value_parser = ["json", "yaml", "table"])]
        output: String,
    },
}

/// Run CLI commands
pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    let mut logging = LoggingConfig::from_env();
    if cli.verbose {
        logging.log_level = "debug".to_string();
    }
    init_logging(&logging)?;

    let config = GatewayConfig::from_env().context("Invalid gateway configuration")?;
    log_config_info(&config);

    let code = execute(cli.command, config).await?;
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

/// Execute one command and return the process exit code
pub async fn execute(command: Commands, config: GatewayConfig) -> Result<i32> {
    match command {
        Commands::Validate { file, cluster, output } => {
            let format = OutputFormat::from_str(&output)?;
            let (rule_set, cluster) = load_inputs(&file, cluster.as_deref())?;

            let problems =
                Reconciler::new(config).validator().validate(&cluster, &rule_set).await?;
            print_problems(&problems, format)?;
            Ok(if problems.is_empty() { 0 } else { 1 })
        }

        Commands::Render { file, cluster, output } => {
            let format = OutputFormat::from_str(&output)?;
            let (rule_set, cluster) = load_inputs(&file, cluster.as_deref())?;

            match Reconciler::new(config).plan(&cluster, &rule_set).await? {
                ReconcileOutcome::Invalid { problems } => {
                    eprintln!("Rule set {} is invalid", rule_set.owner_label());
                    print_problems(&problems, format)?;
                    Ok(1)
                }
                outcome => {
                    print_changes(outcome.changes(), format)?;
                    Ok(0)
                }
            }
        }
    }
}

fn load_inputs(
    rule_set: &Path,
    snapshot: Option<&Path>,
) -> Result<(ExposureRuleSet, InMemoryCluster)> {
    let rule_set: ExposureRuleSet = load_document(rule_set)?;
    let snapshot: ClusterSnapshot = match snapshot {
        Some(path) => load_document(path)?,
        None => ClusterSnapshot::default(),
    };
    Ok((rule_set, InMemoryCluster::from_snapshot(snapshot)))
}

/// Read a YAML or JSON document; JSON is a subset of YAML
pub fn load_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    serde_yaml::from_str(&contents)
        .with_context(|| format!("Failed to parse document: {}", path.display()))
}
