//! Snippet domain model

use serde::{Deserialize, Serialize};

/// A named, reusable SELECT fragment.
///
/// Dependencies are captured once, when the snippet is saved, and are
/// never recomputed afterwards. Re-saving another snippet later does not
/// change this record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    /// Name exactly as the user spelled it (never case-folded)
    pub name: String,

    /// SELECT body with trailing semicolons stripped
    pub body: String,

    /// Names of other snippets this body references
    pub dependencies: Vec<String>,
}

impl Snippet {
    /// Create a snippet with no recorded dependencies
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
            dependencies: Vec::new(),
        }
    }

    /// Set the recorded dependencies
    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// True when this snippet directly depends on `name`
    pub fn depends_on(&self, name: &str) -> bool {
        self.dependencies.iter().any(|dep| dep == name)
    }
}
