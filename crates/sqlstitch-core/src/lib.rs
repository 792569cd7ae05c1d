//! sqlstitch core
//!
//! Domain types shared by every sqlstitch crate: the snippet record,
//! diagnostics, composition errors and the engine configuration.

pub mod config;
pub mod diagnostic;
pub mod error;
pub mod snippet;

pub use config::{ConfigError, DialectConfig, EngineConfig, PatternConfig};
pub use diagnostic::{Diagnostic, DiagnosticKind};
pub use error::CompositionError;
pub use snippet::Snippet;
