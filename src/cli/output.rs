//! Shared output formatting utilities for CLI commands
//!
//! JSON and YAML go through serde; tables are rendered per data type.

use crate::domain::{Change, Problem};
use anyhow::{Context, Result};
use serde::Serialize;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
    Table,
}

impl OutputFormat {
    /// Parse output format from string
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "yaml" => Ok(OutputFormat::Yaml),
            "table" => Ok(OutputFormat::Table),
            _ => anyhow::bail!(
                "Unsupported output format: '{}'. Use 'json', 'yaml', or 'table'.",
                s
            ),
        }
    }
}

/// Print data as JSON
pub fn print_json<T: Serialize>(data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data).context("Failed to serialize to JSON")?;
    println!("{}", json);
    Ok(())
}

/// Print data as YAML
pub fn print_yaml<T: Serialize>(data: &T) -> Result<()> {
    let yaml = serde_yaml::to_string(data).context("Failed to serialize to YAML")?;
    println!("{}", yaml);
    Ok(())
}

/// Print problems in the requested format
pub fn print_problems(problems: &[Problem], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(&problems),
        OutputFormat::Yaml => print_yaml(&problems),
        OutputFormat::Table => {
            print_problems_table(problems);
            Ok(())
        }
    }
}

/// Print a change set in the requested format
pub fn print_changes(changes: &[Change], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(&changes),
        OutputFormat::Yaml => print_yaml(&changes),
        OutputFormat::Table => {
            print_changes_table(changes);
            Ok(())
        }
    }
}

fn print_problems_table(problems: &[Problem]) {
    if problems.is_empty() {
        println!("No problems found");
        return;
    }

    print_table_header(&[("Attribute", 50), ("Message", 60)]);
    for problem in problems {
        println!("{:<50} {}", truncate(&problem.attribute_path, 48), problem.message);
    }
}

fn print_changes_table(changes: &[Change]) {
    print_table_header(&[("Action", 8), ("Name", 30), ("Host", 40), ("Routes", 6)]);
    for change in changes {
        let metadata = &change.object.metadata;
        let name = match metadata.name() {
            "" => metadata.generate_name.clone().unwrap_or_default(),
            name => name.to_string(),
        };
        println!(
            "{:<8} {:<30} {:<40} {:<6}",
            change.action,
            truncate(&name, 28),
            truncate(&change.object.spec.hosts.join(","), 38),
            change.object.spec.http.len()
        );
    }
}

/// Truncate string to maximum length with ellipsis
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Print a table header
pub fn print_table_header(columns: &[(&str, usize)]) {
    println!();
    let mut header = String::new();
    for (name, width) in columns {
        header.push_str(&format!("{:<width$} ", name, width = width));
    }
    println!("{}", header.trim());

    let total_width: usize = columns.iter().map(|(_, w)| w + 1).sum();
    println!("{}", "-".repeat(total_width.saturating_sub(1)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::from_str("json").unwrap(), OutputFormat::Json);
        assert_eq!(OutputFormat::from_str("YAML").unwrap(), OutputFormat::Yaml);
        assert_eq!(OutputFormat::from_str("table").unwrap(), OutputFormat::Table);
        assert!(OutputFormat::from_str("xml").is_err());
    }

    #[test]
    fn test_print_problems() {
        let problems = vec![Problem::new(".spec.host", "Host was not defined")];
        for format in [OutputFormat::Json, OutputFormat::Yaml, OutputFormat::Table] {
            assert!(print_problems(&problems, format).is_ok());
        }
        assert!(print_problems(&[], OutputFormat::Table).is_ok());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 8), "hello...");
        assert_eq!(truncate("hello", 3), "...");
    }
}
