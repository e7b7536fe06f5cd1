//! Error types for artifact reconciliation and generation

use std::path::PathBuf;

use thiserror::Error;

/// Result type for artifact operations
pub type Result<T> = std::result::Result<T, ArtifactError>;

/// Artifact errors
#[derive(Error, Debug)]
pub enum ArtifactError {
    /// Committed artifacts are stale and the user did not agree to update them.
    ///
    /// Distinct from I/O failures so callers can tell "environment broken"
    /// apart from "schema needs fixing".
    #[error("Committed schema artifacts are out of date (exit code {code})")]
    Exit { code: i32 },

    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Prompt error: {0}")]
    Prompt(#[source] std::io::Error),

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Failed to start client generator `{command}`: {source}")]
    GeneratorSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Client generator `{command}` failed with {status}: {stderr}")]
    Generator {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("Config error: {0}")]
    Config(#[from] config_crate::ConfigError),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ArtifactError {
    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit status a CLI should terminate with for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            ArtifactError::Exit { code } => *code,
            _ => 1,
        }
    }

    /// Whether this is the unconfirmed-drift condition rather than a failure
    pub fn is_unconfirmed_drift(&self) -> bool {
        matches!(self, ArtifactError::Exit { .. })
    }
}
