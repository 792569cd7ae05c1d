//! Backend error pattern tables
//!
//! Maps raw driver messages onto diagnostic kinds. The mapping is data,
//! not code: each backend has an ordered list of regex patterns, the
//! first match wins, and configuration can append more patterns without
//! touching the resolver.

use std::collections::HashMap;

use regex::Regex;

use sqlstitch_core::{ConfigError, DiagnosticKind, PatternConfig};

/// Built-in per-backend patterns, in match order.
///
/// A named capture group `ident` extracts the offending identifier;
/// patterns without one (oracle) fall back to the engine's
/// referenced-name heuristic.
const BUILTIN_PATTERNS: &[(&str, &str, DiagnosticKind)] = &[
    (
        "sqlite",
        r"no such table:\s*(?P<ident>\S+)",
        DiagnosticKind::TableNotFound,
    ),
    (
        "sqlite",
        r"no such function:\s*(?P<ident>\S+)",
        DiagnosticKind::FunctionNotFound,
    ),
    (
        "duckdb",
        r"(?:Scalar|Aggregate|Table) Function with name (?P<ident>\S+) does not exist",
        DiagnosticKind::FunctionNotFound,
    ),
    (
        "duckdb",
        r"Table with name (?P<ident>\S+) does not exist",
        DiagnosticKind::TableNotFound,
    ),
    (
        "postgresql",
        r#"relation "(?P<ident>[^"]+)" does not exist"#,
        DiagnosticKind::TableNotFound,
    ),
    (
        "postgresql",
        r"function (?P<ident>[A-Za-z_][\w$.]*)\(.*\) does not exist",
        DiagnosticKind::FunctionNotFound,
    ),
    (
        "mysql",
        r"Table '(?:[^'.]+\.)?(?P<ident>[^'.]+)' doesn't exist",
        DiagnosticKind::TableNotFound,
    ),
    (
        "mysql",
        r"FUNCTION (?:[\w$]+\.)?(?P<ident>[\w$]+) does not exist",
        DiagnosticKind::FunctionNotFound,
    ),
    (
        "mssql",
        r"Invalid object name '(?P<ident>[^']+)'",
        DiagnosticKind::TableNotFound,
    ),
    (
        "mssql",
        r"'(?P<ident>[^']+)' is not a recognized built-in function name",
        DiagnosticKind::FunctionNotFound,
    ),
    (
        "snowflake",
        r"Object '(?P<ident>[^']+)' does not exist",
        DiagnosticKind::TableNotFound,
    ),
    (
        "snowflake",
        r"Unknown function (?P<ident>[\w$.]+)",
        DiagnosticKind::FunctionNotFound,
    ),
    // ORA-00942 carries no identifier in the message
    ("oracle", r"ORA-00942", DiagnosticKind::TableNotFound),
];

/// Backend-agnostic fallback patterns, tried after the backend table.
/// Function shapes come first: "Table Function ... does not exist"
/// must not classify as a missing table.
const FALLBACK_PATTERNS: &[(&str, DiagnosticKind)] = &[
    (
        r"(?i)no such function:?\s*(?P<ident>\S+)",
        DiagnosticKind::FunctionNotFound,
    ),
    (
        r"(?i)function .* does not exist",
        DiagnosticKind::FunctionNotFound,
    ),
    (r"(?i)unknown function", DiagnosticKind::FunctionNotFound),
    (
        r"(?i)no such table:?\s*(?P<ident>\S+)",
        DiagnosticKind::TableNotFound,
    ),
    (
        r"(?i)table .* (?:does not exist|doesn't exist|not found)",
        DiagnosticKind::TableNotFound,
    ),
    (
        r#"(?i)relation "(?P<ident>[^"]+)" does not exist"#,
        DiagnosticKind::TableNotFound,
    ),
];

/// One ordered rule: a message regex and the kind it classifies to
#[derive(Debug, Clone)]
pub struct ErrorPattern {
    pattern: Regex,
    kind: DiagnosticKind,
}

impl ErrorPattern {
    /// Compile a pattern. A named capture group `ident` extracts the
    /// offending identifier.
    pub fn new(pattern: &str, kind: DiagnosticKind) -> Result<Self, ConfigError> {
        let pattern = Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern(e.to_string()))?;
        Ok(Self { pattern, kind })
    }

    /// The kind this pattern classifies to
    pub fn kind(&self) -> DiagnosticKind {
        self.kind
    }

    /// `Some(capture)` when the message matches; the capture itself is
    /// `None` when the pattern has no `ident` group.
    fn matches(&self, message: &str) -> Option<Option<String>> {
        let captures = self.pattern.captures(message)?;
        Some(captures.name("ident").map(|m| m.as_str().to_string()))
    }
}

/// Per-backend ordered pattern tables with a generic fallback
#[derive(Debug, Clone)]
pub struct DiagnosticRules {
    backends: HashMap<String, Vec<ErrorPattern>>,
    fallback: Vec<ErrorPattern>,
}

impl DiagnosticRules {
    /// The built-in tables: sqlite, duckdb, postgresql, mysql, mssql,
    /// snowflake and oracle, plus backend-agnostic fallbacks.
    pub fn builtin() -> Self {
        let mut backends: HashMap<String, Vec<ErrorPattern>> = HashMap::new();
        for (backend, pattern, kind) in BUILTIN_PATTERNS {
            let compiled = ErrorPattern {
                pattern: Regex::new(pattern).expect("valid built-in pattern"),
                kind: *kind,
            };
            backends.entry((*backend).to_string()).or_default().push(compiled);
        }

        let fallback = FALLBACK_PATTERNS
            .iter()
            .map(|(pattern, kind)| ErrorPattern {
                pattern: Regex::new(pattern).expect("valid built-in pattern"),
                kind: *kind,
            })
            .collect();

        Self { backends, fallback }
    }

    /// Built-in tables plus config-supplied patterns.
    pub fn with_patterns(extra: &[PatternConfig]) -> Result<Self, ConfigError> {
        let mut rules = Self::builtin();
        for config in extra {
            rules.register(&config.backend, ErrorPattern::new(&config.pattern, config.kind)?);
        }
        Ok(rules)
    }

    /// Append a pattern to a backend's table, creating the table if the
    /// backend is new.
    pub fn register(&mut self, backend: &str, pattern: ErrorPattern) {
        self.backends.entry(backend.to_string()).or_default().push(pattern);
    }

    /// Classify a raw driver message.
    ///
    /// Returns the kind and, when a pattern captured one, the offending
    /// identifier. Unmatched messages classify as runtime errors.
    pub fn classify(&self, backend: &str, message: &str) -> (DiagnosticKind, Option<String>) {
        let table = self.backends.get(backend).map(Vec::as_slice).unwrap_or(&[]);
        for pattern in table.iter().chain(self.fallback.iter()) {
            if let Some(ident) = pattern.matches(message) {
                return (pattern.kind, ident);
            }
        }
        (DiagnosticKind::RuntimeError, None)
    }
}

impl Default for DiagnosticRules {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_messages() {
        let rules = DiagnosticRules::builtin();
        assert_eq!(
            rules.classify("sqlite", "no such table: snip"),
            (DiagnosticKind::TableNotFound, Some("snip".to_string()))
        );
        assert_eq!(
            rules.classify("sqlite", "no such function: upperr"),
            (DiagnosticKind::FunctionNotFound, Some("upperr".to_string()))
        );
    }

    #[test]
    fn duckdb_messages() {
        let rules = DiagnosticRules::builtin();
        assert_eq!(
            rules.classify("duckdb", "Catalog Error: Table with name snip does not exist!"),
            (DiagnosticKind::TableNotFound, Some("snip".to_string()))
        );
        assert_eq!(
            rules.classify(
                "duckdb",
                "Catalog Error: Scalar Function with name getenv does not exist!"
            ),
            (DiagnosticKind::FunctionNotFound, Some("getenv".to_string()))
        );
        // "Table Function" is a function miss, not a table miss
        assert_eq!(
            rules
                .classify(
                    "duckdb",
                    "Catalog Error: Table Function with name read_csvx does not exist!"
                )
                .0,
            DiagnosticKind::FunctionNotFound
        );
    }

    #[test]
    fn postgresql_messages() {
        let rules = DiagnosticRules::builtin();
        assert_eq!(
            rules.classify("postgresql", "ERROR: relation \"usrs\" does not exist"),
            (DiagnosticKind::TableNotFound, Some("usrs".to_string()))
        );
        assert_eq!(
            rules.classify(
                "postgresql",
                "ERROR: function uppr(text) does not exist"
            ),
            (DiagnosticKind::FunctionNotFound, Some("uppr".to_string()))
        );
    }

    #[test]
    fn mysql_strips_schema_prefix() {
        let rules = DiagnosticRules::builtin();
        assert_eq!(
            rules.classify("mysql", "Table 'shop.ordrs' doesn't exist"),
            (DiagnosticKind::TableNotFound, Some("ordrs".to_string()))
        );
        assert_eq!(
            rules.classify("mysql", "FUNCTION shop.uppr does not exist"),
            (DiagnosticKind::FunctionNotFound, Some("uppr".to_string()))
        );
    }

    #[test]
    fn mssql_and_snowflake_messages() {
        let rules = DiagnosticRules::builtin();
        assert_eq!(
            rules.classify("mssql", "Invalid object name 'usrs'."),
            (DiagnosticKind::TableNotFound, Some("usrs".to_string()))
        );
        assert_eq!(
            rules.classify("snowflake", "SQL compilation error: Object 'USRS' does not exist or not authorized."),
            (DiagnosticKind::TableNotFound, Some("USRS".to_string()))
        );
    }

    #[test]
    fn oracle_table_error_has_no_capture() {
        let rules = DiagnosticRules::builtin();
        assert_eq!(
            rules.classify("oracle", "ORA-00942: table or view does not exist"),
            (DiagnosticKind::TableNotFound, None)
        );
    }

    #[test]
    fn unknown_backend_uses_fallback() {
        let rules = DiagnosticRules::builtin();
        assert_eq!(
            rules.classify("somedb", "no such table: metrics"),
            (DiagnosticKind::TableNotFound, Some("metrics".to_string()))
        );
        assert_eq!(
            rules.classify("somedb", "Unknown function FOO at line 3").0,
            DiagnosticKind::FunctionNotFound
        );
    }

    #[test]
    fn unmatched_messages_are_runtime_errors() {
        let rules = DiagnosticRules::builtin();
        assert_eq!(
            rules.classify("duckdb", "Out of Memory Error: could not allocate block"),
            (DiagnosticKind::RuntimeError, None)
        );
    }

    #[test]
    fn registered_patterns_extend_a_backend() {
        let mut rules = DiagnosticRules::builtin();
        rules.register(
            "quackdb",
            ErrorPattern::new(r"MISSING TABLE \[(?P<ident>[^\]]+)\]", DiagnosticKind::TableNotFound)
                .unwrap(),
        );

        assert_eq!(
            rules.classify("quackdb", "MISSING TABLE [events]"),
            (DiagnosticKind::TableNotFound, Some("events".to_string()))
        );
    }

    #[test]
    fn config_patterns_append_after_builtins() {
        let configs = vec![PatternConfig {
            backend: "duckdb".to_string(),
            pattern: r"Binder Error: (?P<ident>\S+)".to_string(),
            kind: DiagnosticKind::RuntimeError,
        }];
        let rules = DiagnosticRules::with_patterns(&configs).unwrap();

        // built-ins still win for their shapes
        assert_eq!(
            rules.classify("duckdb", "Table with name x does not exist").0,
            DiagnosticKind::TableNotFound
        );
        // the appended pattern catches what they miss
        assert_eq!(
            rules.classify("duckdb", "Binder Error: ambiguous reference").0,
            DiagnosticKind::RuntimeError
        );
    }

    #[test]
    fn invalid_config_pattern_is_reported() {
        let configs = vec![PatternConfig {
            backend: "duckdb".to_string(),
            pattern: "broken(".to_string(),
            kind: DiagnosticKind::RuntimeError,
        }];
        assert!(matches!(
            DiagnosticRules::with_patterns(&configs),
            Err(ConfigError::InvalidPattern(_))
        ));
    }
}
