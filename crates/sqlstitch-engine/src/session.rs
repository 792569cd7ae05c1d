//! Composition sessions
//!
//! `Session` is the façade over the whole pipeline: scan the root
//! query, decide whether composition applies, resolve snippet
//! dependencies, render the WITH clause and, on request, execute the
//! result and diagnose any backend failure. One session owns one
//! snippet store bound to one catalog; callers needing concurrency
//! serialize access themselves.

use serde::{Deserialize, Serialize};

use sqlstitch_catalog::{BackendError, Catalog, Executor, RowSet};
use sqlstitch_core::{CompositionError, ConfigError, Diagnostic, DiagnosticKind, EngineConfig};
use sqlstitch_sql::{
    classify, compose_query, starts_with_cte, QueryType, ReferenceScanner, ScanError,
};
use sqlstitch_store::{resolve, SaveError, SnippetStore};

use crate::diagnostics::DiagnosticRules;
use crate::similarity::closest_match;

/// Why snippet expansion was skipped for an otherwise accepted root.
///
/// Skips are not failures: the root is passed through unchanged and the
/// warning travels with the composed result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComposeWarning {
    /// The root statement is not SELECT-shaped
    NonSelectRoot {
        query_type: Option<QueryType>,
        snippets: Vec<String>,
    },

    /// The root opens its own WITH clause
    CteRoot { snippets: Vec<String> },
}

impl std::fmt::Display for ComposeWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonSelectRoot { snippets, .. } => write!(
                f,
                "Your query is using the following snippets: {}. The query is not a \
                 SELECT type query and as snippets only work with SELECT queries, \
                 CTE generation is disabled",
                snippets.join(", ")
            ),
            Self::CteRoot { snippets } => write!(
                f,
                "Your query is using one or more of the following snippets: {}. \
                 sqlstitch does not support snippet expansion within CTEs yet, \
                 CTE generation is disabled",
                snippets.join(", ")
            ),
        }
    }
}

/// Outcome of composing one root query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Composed {
    /// Final statement, with the generated WITH clause when snippets
    /// were expanded
    pub sql: String,

    /// Snippet names expanded into the WITH clause, dependency-first
    pub snippets: Vec<String>,

    /// Every reference the root query scans to, snippet or not
    pub referenced: Vec<String>,

    /// Set when expansion was skipped rather than performed
    pub warning: Option<ComposeWarning>,
}

/// A composed statement together with the rows it produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    /// Rows returned by the backend
    pub rows: RowSet,

    /// How the executed statement was put together
    pub composed: Composed,
}

/// Execution failure types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecuteError {
    /// Composition failed before anything reached the backend
    #[error(transparent)]
    Composition(#[from] CompositionError),

    /// The backend rejected the composed statement
    #[error("{diagnostic}")]
    Backend { diagnostic: Diagnostic },
}

/// One composition session: a snippet store bound to a catalog, a SQL
/// dialect and a set of diagnostic pattern tables.
pub struct Session<C: Catalog> {
    store: SnippetStore,
    catalog: C,
    config: EngineConfig,
    scanner: ReferenceScanner,
    rules: DiagnosticRules,
}

impl<C: Catalog> Session<C> {
    /// Create a session with the default configuration
    pub fn new(catalog: C) -> Self {
        Self {
            store: SnippetStore::new(),
            catalog,
            config: EngineConfig::default(),
            scanner: ReferenceScanner::new(),
            rules: DiagnosticRules::builtin(),
        }
    }

    /// Create a session from a configuration: dialect for scanning,
    /// suggestion threshold, and extra diagnostic patterns.
    pub fn with_config(catalog: C, config: EngineConfig) -> Result<Self, ConfigError> {
        let rules = DiagnosticRules::with_patterns(&config.diagnostics)?;
        Ok(Self {
            store: SnippetStore::with_dialect(config.dialect),
            catalog,
            scanner: ReferenceScanner::from_dialect(config.dialect),
            rules,
            config,
        })
    }

    /// The snippet store backing this session
    pub fn store(&self) -> &SnippetStore {
        &self.store
    }

    /// Mutable store access for management operations (removal, listing)
    pub fn store_mut(&mut self) -> &mut SnippetStore {
        &mut self.store
    }

    /// The catalog this session resolves collisions against
    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// The active configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Mutable diagnostic tables, for registering backends at runtime
    pub fn diagnostics_mut(&mut self) -> &mut DiagnosticRules {
        &mut self.rules
    }

    /// Save a snippet, inferring dependencies from its body
    pub fn save_snippet(&mut self, name: &str, body: &str) -> Result<(), SaveError> {
        self.store.save(name, body, None)
    }

    /// Save a snippet with an explicit dependency list
    pub fn save_snippet_with(
        &mut self,
        name: &str,
        body: &str,
        dependencies: &[String],
    ) -> Result<(), SaveError> {
        self.store.save(name, body, Some(dependencies))
    }

    /// Compose a root query against the stored snippets, without
    /// executing anything.
    ///
    /// When `explicit` is non-empty it replaces reference inference as
    /// the starting set and every listed name must be stored. Expansion
    /// is skipped, with a warning on the result, when the root is not
    /// SELECT-shaped or opens its own WITH clause; it fails outright
    /// when an explicit list is combined with a WITH root, names an
    /// unknown snippet, or resolution finds a cycle. Nothing is cached:
    /// every call re-scans and re-resolves.
    pub fn compose(
        &self,
        root: &str,
        explicit: Option<&[String]>,
    ) -> Result<Composed, CompositionError> {
        let tokens = match self.scanner.tokenize(root) {
            Ok(tokens) => tokens,
            Err(ScanError::Tokenize(message)) => return Err(CompositionError::InvalidSql(message)),
        };
        let referenced = ReferenceScanner::scan_tokens(&tokens);
        let cte_root = starts_with_cte(&tokens);

        let roots: Vec<String> = match explicit {
            Some(list) if !list.is_empty() => {
                if cte_root {
                    return Err(CompositionError::ExplicitWithOnCte);
                }
                let mut roots: Vec<String> = Vec::new();
                for name in list {
                    if !self.store.contains(name) {
                        return Err(CompositionError::UnknownSnippet {
                            name: name.clone(),
                            suggestion: closest_match(
                                name,
                                self.store.names().iter().map(String::as_str),
                                self.config.suggestion_threshold,
                            ),
                        });
                    }
                    if !roots.contains(name) {
                        roots.push(name.clone());
                    }
                }
                roots
            }
            // A referenced name shadowed by a live table is not a
            // snippet use; the table wins silently.
            _ => referenced
                .iter()
                .filter(|name| self.store.contains(name) && !self.catalog.table_exists(name))
                .cloned()
                .collect(),
        };

        if roots.is_empty() {
            return Ok(Composed {
                sql: root.to_string(),
                snippets: Vec::new(),
                referenced,
                warning: None,
            });
        }

        let query_type = classify(&tokens);
        if query_type != Some(QueryType::Select) {
            let warning = ComposeWarning::NonSelectRoot {
                query_type,
                snippets: roots,
            };
            tracing::warn!("{}", warning);
            return Ok(Composed {
                sql: root.to_string(),
                snippets: Vec::new(),
                referenced,
                warning: Some(warning),
            });
        }

        if cte_root {
            let warning = ComposeWarning::CteRoot { snippets: roots };
            tracing::warn!("{}", warning);
            return Ok(Composed {
                sql: root.to_string(),
                snippets: Vec::new(),
                referenced,
                warning: Some(warning),
            });
        }

        let resolved = resolve(&roots, &self.store, &self.catalog)?;
        let sql = compose_query(root, &resolved);
        tracing::debug!("composed query with {} snippet(s)", resolved.len());
        Ok(Composed {
            sql,
            snippets: resolved.iter().map(|s| s.name.clone()).collect(),
            referenced,
            warning: None,
        })
    }

    /// Compose and run a root query on the given executor.
    ///
    /// Composition failures never reach the backend. Backend failures
    /// come back classified against the executor's pattern table.
    pub fn execute(
        &self,
        root: &str,
        explicit: Option<&[String]>,
        executor: &dyn Executor,
    ) -> Result<Execution, ExecuteError> {
        let composed = self.compose(root, explicit)?;
        match executor.run(&composed.sql) {
            Ok(rows) => Ok(Execution { rows, composed }),
            Err(error) => {
                let diagnostic = self.diagnose_failure(&error, &composed.referenced);
                Err(ExecuteError::Backend { diagnostic })
            }
        }
    }

    /// Explain a backend failure.
    ///
    /// `referenced` is the set of names the failing query scanned to;
    /// it supplies the fallback offender when the driver message carries
    /// no identifier, and decides whether snippet guidance applies.
    pub fn diagnose_failure(&self, error: &BackendError, referenced: &[String]) -> Diagnostic {
        let (kind, captured) = self.rules.classify(&error.backend, &error.message);
        let mut diagnostic = Diagnostic::new(kind, error.message.clone());

        match kind {
            DiagnosticKind::TableNotFound => {
                let offending = captured.or_else(|| {
                    referenced
                        .iter()
                        .find(|name| {
                            !self.store.contains(name) && !self.catalog.table_exists(name)
                        })
                        .cloned()
                });
                if let Some(offending) = offending {
                    if self.store.contains(&offending) {
                        diagnostic = diagnostic.with_snippet_hint();
                    }
                    if let Some(suggestion) = self.suggest(&offending) {
                        diagnostic = diagnostic.with_suggestion(suggestion);
                    }
                    diagnostic = diagnostic.with_offending_identifier(offending);
                }
            }
            DiagnosticKind::FunctionNotFound => {
                if referenced.iter().any(|name| self.store.contains(name)) {
                    diagnostic = diagnostic.with_snippet_hint();
                }
                if let Some(offending) = captured {
                    diagnostic = diagnostic.with_offending_identifier(offending);
                }
            }
            DiagnosticKind::RuntimeError => {}
        }

        diagnostic
    }

    /// Best "did you mean" candidate for a missing name: catalog tables
    /// first, then snippet names, at the configured threshold.
    fn suggest(&self, target: &str) -> Option<String> {
        let tables = self.catalog.all_table_names();
        closest_match(
            target,
            tables
                .iter()
                .map(String::as_str)
                .chain(self.store.names().iter().map(String::as_str)),
            self.config.suggestion_threshold,
        )
    }
}
