//! Validation problems and attribute paths
//!
//! A [`Problem`] is a user-facing configuration defect located by a dotted/bracketed
//! attribute path such as `.spec.rules[0].accessStrategies[1].config`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single configuration defect found while validating a rule set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    /// Locator into the rule set
    pub attribute_path: String,
    /// Human-readable message; matched literally by downstream tooling
    pub message: String,
}

impl Problem {
    pub fn new(attribute_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { attribute_path: attribute_path.into(), message: message.into() }
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.attribute_path, self.message)
    }
}

/// Builder for `<prefix><.field>*<[index]>*` locators.
///
/// The prefix is used verbatim and may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AttributePath(String);

impl AttributePath {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self(prefix.into())
    }

    /// Append `.name`
    pub fn field(&self, name: &str) -> Self {
        Self(format!("{}.{}", self.0, name))
    }

    /// Append `[index]`
    pub fn index(&self, index: usize) -> Self {
        Self(format!("{}[{}]", self.0, index))
    }

    /// Build a problem located at this path
    pub fn problem(&self, message: impl Into<String>) -> Problem {
        Problem::new(self.0.clone(), message)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AttributePath {
    fn from(prefix: &str) -> Self {
        Self::new(prefix)
    }
}
