//! Composition pipeline errors

use thiserror::Error;

/// Fatal conditions that abort composition of a root query.
///
/// Skips (non-SELECT roots, roots with their own WITH clause) are not
/// errors; they surface as warnings on the composed result instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompositionError {
    /// Dependency resolution hit a reference cycle. The path names every
    /// member once, in traversal order.
    #[error("circular dependency between snippets: {}", .0.join(" -> "))]
    Cycle(Vec<String>),

    /// An explicit snippet list was combined with a root query that
    /// already opens its own WITH clause.
    #[error("Cannot use an explicit snippet list with CTEs, remove the explicit snippets and re-run the query")]
    ExplicitWithOnCte,

    /// An explicit snippet list named a snippet that is not stored.
    #[error("\"{name}\" is not a stored snippet{}", suggestion_suffix(.suggestion))]
    UnknownSnippet {
        name: String,
        suggestion: Option<String>,
    },

    /// The root query could not be tokenized.
    #[error("failed to scan query: {0}")]
    InvalidSql(String),
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(name) => format!(", did you mean \"{}\"?", name),
        None => String::new(),
    }
}
