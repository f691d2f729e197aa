//! Error types for the mundler library.
//!
//! Structured error types that preserve context through the resolution and
//! bundling pipeline. Per-bundle failures carry the bundle name so that one
//! bundle's configuration mistake never reads like a global crash.

use std::io;

use thiserror::Error;

/// Main result type for mundler operations.
pub type Result<T> = std::result::Result<T, MundlerError>;

/// Error type for all mundler operations.
#[derive(Error, Debug)]
pub enum MundlerError {
    /// I/O related errors (file reads, artifact writes)
    #[error("I/O error: {message}")]
    Io {
        /// Human-readable error message
        message: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Configuration errors, with the offending bundle when known
    #[error("Configuration error{}: {message}", bundle_suffix(.bundle))]
    Config {
        /// Error description
        message: String,
        /// Bundle the error belongs to
        bundle: Option<String>,
    },

    /// Glob pattern expansion errors
    #[error("Glob error for pattern '{pattern}': {message}")]
    Glob {
        /// Pattern that failed to compile or expand
        pattern: String,
        /// Error description
        message: String,
    },

    /// Serialization/deserialization errors (config file, project manifest)
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error description
        message: String,
        /// Underlying serialization error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Pre/post task hook failures
    #[error("Task '{task}' failed: {message}")]
    Task {
        /// The task command that failed
        task: String,
        /// Error description
        message: String,
    },

    /// Bundling failures scoped to a single bundle
    #[error("Bundle '{bundle}' failed: {message}")]
    Bundle {
        /// Bundle name
        bundle: String,
        /// Error description
        message: String,
    },

    /// File watcher setup or delivery errors
    #[error("Watch error: {message}")]
    Watch {
        /// Error description
        message: String,
        /// Underlying watcher error
        #[source]
        source: Option<notify::Error>,
    },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal {
        /// Error description
        message: String,
    },
}

fn bundle_suffix(bundle: &Option<String>) -> String {
    match bundle {
        Some(name) => format!(" in bundle '{name}'"),
        None => String::new(),
    }
}

impl MundlerError {
    /// Create a new I/O error with context
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            bundle: None,
        }
    }

    /// Create a new configuration error scoped to a bundle
    pub fn config_bundle(message: impl Into<String>, bundle: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            bundle: Some(bundle.into()),
        }
    }

    /// Create a new glob error
    pub fn glob(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Glob {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    /// Create a new task error
    pub fn task(task: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Task {
            task: task.into(),
            message: message.into(),
        }
    }

    /// Create a new bundle error
    pub fn bundle(bundle: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Bundle {
            bundle: bundle.into(),
            message: message.into(),
        }
    }

    /// Create a new watch error
    pub fn watch(message: impl Into<String>) -> Self {
        Self::Watch {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

// Implement From traits for common error types
impl From<io::Error> for MundlerError {
    fn from(err: io::Error) -> Self {
        Self::io("I/O operation failed", err)
    }
}

impl From<serde_json::Error> for MundlerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: format!("JSON deserialization failed: {err}"),
            source: Some(Box::new(err)),
        }
    }
}

impl From<serde_yaml::Error> for MundlerError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization {
            message: format!("YAML deserialization failed: {err}"),
            source: Some(Box::new(err)),
        }
    }
}

impl From<glob::PatternError> for MundlerError {
    fn from(err: glob::PatternError) -> Self {
        Self::glob("<unknown>", err.to_string())
    }
}

impl From<notify::Error> for MundlerError {
    fn from(err: notify::Error) -> Self {
        Self::Watch {
            message: err.to_string(),
            source: Some(err),
        }
    }
}
