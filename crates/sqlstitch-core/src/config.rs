//! Configuration schema (sqlstitch.toml)

use serde::{Deserialize, Serialize};

use crate::diagnostic::DiagnosticKind;

/// SQL dialect configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectConfig {
    /// Generic ANSI SQL
    Generic,

    /// SQLite
    Sqlite,

    /// DuckDB
    DuckDb,

    /// PostgreSQL
    Postgres,

    /// MySQL
    MySql,

    /// Microsoft SQL Server
    MsSql,

    /// Snowflake
    Snowflake,
}

impl Default for DialectConfig {
    fn default() -> Self {
        Self::Generic
    }
}

/// Error-pattern rule supplied through configuration
///
/// Appended to the built-in diagnostic tables, so new backends and new
/// message shapes need no code changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternConfig {
    /// Backend identifier the pattern applies to, e.g. "duckdb"
    pub backend: String,

    /// Regular expression matched against the raw driver message.
    /// A named capture group `ident` extracts the offending identifier.
    pub pattern: String,

    /// Kind reported when the pattern matches
    pub kind: DiagnosticKind,
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// SQL dialect used when tokenizing queries and snippet bodies
    #[serde(default)]
    pub dialect: DialectConfig,

    /// Minimum similarity ratio for "did you mean" suggestions,
    /// between 0.0 and 1.0
    #[serde(default = "default_suggestion_threshold")]
    pub suggestion_threshold: f64,

    /// Extra diagnostic patterns appended to the built-in tables
    #[serde(default)]
    pub diagnostics: Vec<PatternConfig>,
}

fn default_suggestion_threshold() -> f64 {
    0.5
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dialect: DialectConfig::default(),
            suggestion_threshold: default_suggestion_threshold(),
            diagnostics: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Load config from TOML file
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save config to TOML file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        let toml =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, toml).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Invalid diagnostic pattern: {0}")]
    InvalidPattern(String),
}
