//! sqlstitch engine
//!
//! The composition engine behind sqlstitch:
//! - `Session` ties a snippet store, a catalog and diagnostics together
//! - Root queries are scanned, resolved and rewritten into WITH clauses
//! - Backend failures are matched against per-backend pattern tables
//!   and turned into actionable diagnostics

pub mod diagnostics;
pub mod session;
pub mod similarity;

pub use diagnostics::{DiagnosticRules, ErrorPattern};
pub use session::{Composed, ComposeWarning, ExecuteError, Execution, Session};
pub use similarity::{closest_match, levenshtein, similarity_ratio};
