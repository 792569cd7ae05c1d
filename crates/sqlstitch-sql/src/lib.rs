//! SQL scanning and assembly
//!
//! This crate handles:
//! - Tokenizing SQL using datafusion-sqlparser-rs
//! - Finding table-position references without building an AST
//! - Classifying statements by their leading keyword
//! - Assembling snippets into a WITH clause ahead of a root query

pub mod classify;
pub mod compose;
pub mod scanner;

pub use classify::{classify, starts_with_cte, QueryType};
pub use compose::{compose_query, quote_ident};
pub use scanner::{ReferenceScanner, ScanError};
