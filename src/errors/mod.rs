//! # Error Handling
//!
//! Infrastructure and programming errors for meshgate. Configuration defects found in
//! a rule set are *not* errors: they are reported as [`crate::domain::Problem`] values
//! by the validators. Everything in this module aborts the current call.

/// Custom result type for meshgate operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for meshgate
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Failure talking to the cluster store (read or write)
    #[error("Cluster error during {operation}: {message}")]
    Cluster { operation: String, message: String },

    /// Startup configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {context}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// Synthesis met input that validation should have rejected
    #[error("Invalid rule set: {0}")]
    InvalidRuleSet(String),
}

impl Error {
    /// Create a new cluster error
    pub fn cluster<O: Into<String>, S: Into<String>>(operation: O, message: S) -> Self {
        Self::Cluster { operation: operation.into(), message: message.into() }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a serialization error with context
    pub fn serialization<S: Into<String>>(context: S, source: serde_json::Error) -> Self {
        Self::Serialization { context: context.into(), source }
    }

    /// Create an invalid rule set error
    pub fn invalid_rule_set<S: Into<String>>(message: S) -> Self {
        Self::InvalidRuleSet(message.into())
    }

    /// Whether the error came from the cluster store
    pub fn is_cluster(&self) -> bool {
        matches!(self, Self::Cluster { .. })
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages = Vec::new();

        for (field, field_errors) in errors.field_errors() {
            for error in field_errors {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| error.code.to_string());
                messages.push(format!("{}: {}", field, message));
            }
        }

        if messages.is_empty() {
            messages.push(errors.to_string());
        }

        Self::Config(messages.join(", "))
    }
}
