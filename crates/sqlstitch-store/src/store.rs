//! Snippet storage
//!
//! Insertion-ordered store of named SELECT fragments. Dependencies are
//! captured once at save time by intersecting the scanned body with the
//! names already stored, so re-saving one snippet never rewrites the
//! records of others.

use std::collections::{HashMap, HashSet, VecDeque};

use thiserror::Error;

use sqlstitch_core::{DialectConfig, Snippet};
use sqlstitch_sql::{classify, QueryType, ReferenceScanner, ScanError};

/// Named snippet store with insertion-ordered listing
pub struct SnippetStore {
    /// Scanner used for dependency capture and body classification
    scanner: ReferenceScanner,

    /// Names in save order; re-saving keeps the original position
    names: Vec<String>,

    /// Snippet records by name
    snippets: HashMap<String, Snippet>,
}

impl SnippetStore {
    /// Create a store scanning with the generic dialect
    pub fn new() -> Self {
        Self {
            scanner: ReferenceScanner::new(),
            names: Vec::new(),
            snippets: HashMap::new(),
        }
    }

    /// Create a store scanning with the given dialect
    pub fn with_dialect(dialect: DialectConfig) -> Self {
        Self {
            scanner: ReferenceScanner::from_dialect(dialect),
            names: Vec::new(),
            snippets: HashMap::new(),
        }
    }

    /// Save a snippet, replacing any previous record under the same name.
    ///
    /// The body must be SELECT-shaped and is normalized by stripping
    /// trailing semicolons. When `explicit` is `Some` and non-empty it
    /// replaces scanned dependency inference and every listed name other
    /// than the snippet's own must already be stored; an empty list
    /// means "infer". Inference records a dependency for each scanned
    /// reference that names a stored snippet, or the snippet itself so
    /// a self-reference later resolves as a cycle of length one.
    pub fn save(
        &mut self,
        name: &str,
        body: &str,
        explicit: Option<&[String]>,
    ) -> Result<(), SaveError> {
        if !is_valid_identifier(name) {
            return Err(SaveError::InvalidIdentifier {
                name: name.to_string(),
            });
        }

        let body = normalize_body(body);
        let tokens = self.scanner.tokenize(&body)?;
        let query_type = classify(&tokens);
        if query_type != Some(QueryType::Select) {
            return Err(SaveError::NonSelectBody {
                name: name.to_string(),
                query_type,
            });
        }

        let dependencies = match explicit {
            Some(list) if !list.is_empty() => {
                let mut deps: Vec<String> = Vec::new();
                for dep in list {
                    if dep.as_str() != name && !self.snippets.contains_key(dep.as_str()) {
                        return Err(SaveError::UnknownDependency { name: dep.clone() });
                    }
                    if !deps.contains(dep) {
                        deps.push(dep.clone());
                    }
                }
                deps
            }
            _ => {
                let mut deps = ReferenceScanner::scan_tokens(&tokens);
                deps.retain(|dep| dep.as_str() == name || self.snippets.contains_key(dep.as_str()));
                deps
            }
        };

        tracing::debug!(
            "saved snippet '{}' ({} dependencies)",
            name,
            dependencies.len()
        );

        let snippet = Snippet::new(name, body).with_dependencies(dependencies);
        if !self.snippets.contains_key(name) {
            self.names.push(name.to_string());
        }
        self.snippets.insert(name.to_string(), snippet);
        Ok(())
    }

    /// Look up a snippet by name
    pub fn get(&self, name: &str) -> Option<&Snippet> {
        self.snippets.get(name)
    }

    /// True when a snippet with this exact name is stored
    pub fn contains(&self, name: &str) -> bool {
        self.snippets.contains_key(name)
    }

    /// Stored names in save order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Stored snippets in save order
    pub fn snippets(&self) -> impl Iterator<Item = &Snippet> {
        self.names.iter().filter_map(|name| self.snippets.get(name))
    }

    /// Number of stored snippets
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True when nothing is stored
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Snippets that directly depend on `name`, in store order.
    /// A snippet depending on itself is not its own dependent.
    pub fn dependents(&self, name: &str) -> Vec<String> {
        self.names
            .iter()
            .filter(|other| {
                other.as_str() != name
                    && self
                        .snippets
                        .get(other.as_str())
                        .is_some_and(|snippet| snippet.depends_on(name))
            })
            .cloned()
            .collect()
    }

    /// All snippets that depend on `name` directly or transitively.
    pub fn transitive_dependents(&self, name: &str) -> Vec<String> {
        let mut visited: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<String> = VecDeque::new();
        let mut result = Vec::new();

        for dependent in self.dependents(name) {
            queue.push_back(dependent);
        }

        while let Some(current) = queue.pop_front() {
            if !visited.insert(current.clone()) {
                continue;
            }
            for dependent in self.dependents(&current) {
                if !visited.contains(&dependent) {
                    queue.push_back(dependent);
                }
            }
            result.push(current);
        }

        result
    }

    /// Remove a snippet nothing else depends on.
    pub fn remove(&mut self, name: &str) -> Result<Snippet, RemoveError> {
        if !self.snippets.contains_key(name) {
            return Err(RemoveError::NotFound {
                name: name.to_string(),
            });
        }
        let dependents = self.dependents(name);
        if !dependents.is_empty() {
            return Err(RemoveError::HasDependents {
                name: name.to_string(),
                dependents,
            });
        }
        self.remove_force(name).ok_or(RemoveError::NotFound {
            name: name.to_string(),
        })
    }

    /// Remove a snippet even when other snippets depend on it.
    ///
    /// Dependents keep their recorded dependency; resolving them later
    /// simply no longer expands the removed name.
    pub fn remove_force(&mut self, name: &str) -> Option<Snippet> {
        let snippet = self.snippets.remove(name)?;
        self.names.retain(|other| other != name);
        Some(snippet)
    }

    /// Remove a snippet together with everything that depends on it,
    /// directly or transitively. Returns the removed names.
    pub fn remove_force_all(&mut self, name: &str) -> Vec<String> {
        if !self.snippets.contains_key(name) {
            return Vec::new();
        }
        let mut removed = vec![name.to_string()];
        removed.extend(self.transitive_dependents(name));
        for doomed in &removed {
            self.snippets.remove(doomed);
        }
        self.names.retain(|other| !removed.contains(other));
        removed
    }
}

impl Default for SnippetStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Snippet names are identifier-shaped: a letter or underscore first,
/// letters, digits or underscores after.
fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Trim the body and strip any trailing semicolons.
fn normalize_body(body: &str) -> String {
    let mut trimmed = body.trim();
    while let Some(shorter) = trimmed.strip_suffix(';') {
        trimmed = shorter.trim_end();
    }
    trimmed.to_string()
}

/// Save failure types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SaveError {
    /// The name is not identifier-shaped
    #[error("\"{name}\" is not a valid snippet identifier")]
    InvalidIdentifier { name: String },

    /// The body does not classify as a SELECT
    #[error("snippet \"{name}\" is not a SELECT statement")]
    NonSelectBody {
        name: String,
        query_type: Option<QueryType>,
    },

    /// An explicit dependency list named a snippet that is not stored
    #[error("\"{name}\" is not a stored snippet")]
    UnknownDependency { name: String },

    /// The body could not be tokenized
    #[error(transparent)]
    Scan(#[from] ScanError),
}

/// Removal failure types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoveError {
    /// No snippet under this name
    #[error("\"{name}\" is not a stored snippet")]
    NotFound { name: String },

    /// Other snippets still depend on this one
    #[error("snippet \"{name}\" is used by: {}", .dependents.join(", "))]
    HasDependents {
        name: String,
        dependents: Vec<String>,
    },
}
