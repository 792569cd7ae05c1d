//! Diagnostics for backend execution failures
//!
//! IMPORTANT: Diagnostic kind codes are stable.
//! NEVER rename or remove codes - they are part of the public API.
//! Add new kinds with new names only.

use serde::{Deserialize, Serialize};

/// Guidance line shown when a failing identifier is a stored snippet.
const SNIPPET_HINT: &str = "If using snippets, you may pass the explicit snippet list.";

/// Classified failure category (v1)
///
/// These codes are STABLE. Do NOT rename or remove them - only add new
/// ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticKind {
    /// The backend rejected a table or relation name
    TableNotFound,

    /// The backend rejected a function name
    FunctionNotFound,

    /// Any other backend failure, passed through verbatim
    RuntimeError,
}

impl DiagnosticKind {
    /// Get the kind as a stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TableNotFound => "TABLE_NOT_FOUND",
            Self::FunctionNotFound => "FUNCTION_NOT_FOUND",
            Self::RuntimeError => "RUNTIME_ERROR",
        }
    }
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A structured explanation of a backend failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Failure category
    pub kind: DiagnosticKind,

    /// Identifier the backend rejected, when one could be determined
    pub offending_identifier: Option<String>,

    /// Closest known table or snippet name, when one is similar enough
    pub suggestion: Option<String>,

    /// Whether the rendered message should point at the snippet mechanism
    pub snippet_hint: bool,

    /// Raw driver message, verbatim
    pub raw_message: String,
}

impl Diagnostic {
    /// Create a diagnostic with just a kind and the raw driver message
    pub fn new(kind: DiagnosticKind, raw_message: impl Into<String>) -> Self {
        Self {
            kind,
            offending_identifier: None,
            suggestion: None,
            snippet_hint: false,
            raw_message: raw_message.into(),
        }
    }

    /// Set the identifier the backend rejected
    pub fn with_offending_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.offending_identifier = Some(identifier.into());
        self
    }

    /// Set the "did you mean" suggestion
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Mark the failure as snippet-related
    pub fn with_snippet_hint(mut self) -> Self {
        self.snippet_hint = true;
        self
    }

    /// Render the user-facing message.
    ///
    /// Sections appear in a fixed order: the snippet hint, the missing
    /// table line with its suggestion, then the raw driver message. A
    /// diagnostic with no sections renders the raw message alone.
    pub fn render(&self) -> String {
        let mut sections: Vec<String> = Vec::new();

        if self.snippet_hint {
            sections.push(SNIPPET_HINT.to_string());
        }

        if self.kind == DiagnosticKind::TableNotFound {
            if let Some(identifier) = &self.offending_identifier {
                let mut section = format!("There is no table with name '{}'.", identifier);
                if let Some(suggestion) = &self.suggestion {
                    section.push_str(&format!("\nDid you mean: '{}'", suggestion));
                }
                sections.push(section);
            }
        }

        if sections.is_empty() {
            return self.raw_message.clone();
        }

        sections.push(format!(
            "Original error message from DB driver:\n{}",
            self.raw_message
        ));
        sections.join("\n\n")
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render())
    }
}
