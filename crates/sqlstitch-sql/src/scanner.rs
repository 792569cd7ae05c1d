//! Lexical reference scanning
//!
//! Finds the identifiers a statement uses in table position without
//! building a syntax tree. Scanning runs over the raw token stream from
//! datafusion-sqlparser-rs, so comments and string literals arrive as
//! dedicated tokens and can never produce a reference.

use std::collections::HashSet;

use sqlparser::dialect::{
    Dialect, DuckDbDialect, GenericDialect, MsSqlDialect, MySqlDialect, PostgreSqlDialect,
    SQLiteDialect, SnowflakeDialect,
};
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::{Token, Tokenizer, Word};

use sqlstitch_core::DialectConfig;

/// Keywords that introduce a table-position identifier.
const REFERENCE_KEYWORDS: &[Keyword] = &[
    Keyword::FROM,
    Keyword::JOIN,
    Keyword::INTO,
    Keyword::UPDATE,
    Keyword::TABLE,
];

/// Keywords that can never be a bare table name, even though the
/// tokenizer tags them as words.
const STRUCTURAL_KEYWORDS: &[Keyword] = &[
    Keyword::SELECT,
    Keyword::WHERE,
    Keyword::GROUP,
    Keyword::ORDER,
    Keyword::HAVING,
    Keyword::UNION,
    Keyword::EXCEPT,
    Keyword::INTERSECT,
    Keyword::LIMIT,
    Keyword::OFFSET,
    Keyword::INNER,
    Keyword::LEFT,
    Keyword::RIGHT,
    Keyword::FULL,
    Keyword::CROSS,
    Keyword::OUTER,
    Keyword::NATURAL,
    Keyword::LATERAL,
    Keyword::ON,
    Keyword::USING,
    Keyword::AS,
    Keyword::WITH,
    Keyword::SET,
    Keyword::VALUES,
    Keyword::CASE,
    Keyword::WHEN,
    Keyword::END,
    Keyword::NOT,
    Keyword::EXISTS,
    Keyword::IF,
    Keyword::CASCADE,
    Keyword::RESTRICT,
];

/// How names are captured after a reference keyword.
#[derive(Clone, Copy, PartialEq, Eq)]
enum CaptureContext {
    /// FROM: comma-separated list, `name(` is a table function
    List,
    /// JOIN: single name, `name(` is a table function
    Single,
    /// INTO / UPDATE / TABLE: single target, `name(` is a column list
    Target,
}

/// Tokenizer-backed reference scanner with configurable dialect
pub struct ReferenceScanner {
    dialect: Box<dyn Dialect>,
}

impl ReferenceScanner {
    /// Create a scanner with the default (generic) dialect
    pub fn new() -> Self {
        Self {
            dialect: Box::new(GenericDialect {}),
        }
    }

    /// Create a scanner for SQLite
    pub fn sqlite() -> Self {
        Self {
            dialect: Box::new(SQLiteDialect {}),
        }
    }

    /// Create a scanner for DuckDB
    pub fn duckdb() -> Self {
        Self {
            dialect: Box::new(DuckDbDialect {}),
        }
    }

    /// Create a scanner for PostgreSQL
    pub fn postgres() -> Self {
        Self {
            dialect: Box::new(PostgreSqlDialect {}),
        }
    }

    /// Create a scanner for MySQL
    pub fn mysql() -> Self {
        Self {
            dialect: Box::new(MySqlDialect {}),
        }
    }

    /// Create a scanner for Microsoft SQL Server
    pub fn mssql() -> Self {
        Self {
            dialect: Box::new(MsSqlDialect {}),
        }
    }

    /// Create a scanner for Snowflake
    pub fn snowflake() -> Self {
        Self {
            dialect: Box::new(SnowflakeDialect {}),
        }
    }

    /// Create a scanner from a dialect config
    pub fn from_dialect(dialect: DialectConfig) -> Self {
        match dialect {
            DialectConfig::Generic => Self::new(),
            DialectConfig::Sqlite => Self::sqlite(),
            DialectConfig::DuckDb => Self::duckdb(),
            DialectConfig::Postgres => Self::postgres(),
            DialectConfig::MySql => Self::mysql(),
            DialectConfig::MsSql => Self::mssql(),
            DialectConfig::Snowflake => Self::snowflake(),
        }
    }

    /// Tokenize a statement, dropping whitespace and comment tokens.
    pub fn tokenize(&self, sql: &str) -> Result<Vec<Token>, ScanError> {
        let tokens = Tokenizer::new(&*self.dialect, sql)
            .tokenize()
            .map_err(|e| ScanError::Tokenize(e.to_string()))?;

        Ok(tokens
            .into_iter()
            .filter(|token| !matches!(token, Token::Whitespace(_)))
            .collect())
    }

    /// Scan a statement for table-position references.
    pub fn scan(&self, sql: &str) -> Result<Vec<String>, ScanError> {
        let tokens = self.tokenize(sql)?;
        Ok(Self::scan_tokens(&tokens))
    }

    /// Scan an already-tokenized statement.
    ///
    /// Candidates appear after FROM, JOIN, INTO, UPDATE and TABLE.
    /// Compound names are re-joined on `.`, the first occurrence wins,
    /// and names declared as CTEs in the statement itself are removed
    /// since they resolve locally.
    pub fn scan_tokens(tokens: &[Token]) -> Vec<String> {
        let locals = cte_names(tokens);
        let mut refs: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        let mut i = 0;
        while i < tokens.len() {
            if let Token::Word(word) = &tokens[i] {
                if word.quote_style.is_none() && REFERENCE_KEYWORDS.contains(&word.keyword) {
                    let context = match word.keyword {
                        Keyword::FROM => CaptureContext::List,
                        Keyword::JOIN => CaptureContext::Single,
                        _ => CaptureContext::Target,
                    };
                    i = capture_references(tokens, i + 1, context, &mut refs, &mut seen);
                    continue;
                }
            }
            i += 1;
        }

        refs.retain(|name| !locals.contains(name));
        refs
    }
}

impl Default for ReferenceScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Capture one name, or a comma-separated list of names, after a
/// reference keyword. Returns the index scanning should resume from.
fn capture_references(
    tokens: &[Token],
    start: usize,
    context: CaptureContext,
    refs: &mut Vec<String>,
    seen: &mut HashSet<String>,
) -> usize {
    let mut i = start;
    loop {
        // IF [NOT] EXISTS between CREATE/DROP TABLE and the name
        while is_unquoted_keyword(tokens.get(i), &[Keyword::IF, Keyword::NOT, Keyword::EXISTS]) {
            i += 1;
        }

        let Some((name, after_name)) = read_object_name(tokens, i) else {
            return i;
        };

        // In FROM/JOIN position a name followed by `(` is a table
        // function call, not a table
        if context != CaptureContext::Target
            && matches!(tokens.get(after_name), Some(Token::LParen))
        {
            return after_name;
        }

        if seen.insert(name.clone()) {
            refs.push(name);
        }
        i = after_name;

        if context != CaptureContext::List {
            return i;
        }

        // skip an optional `AS alias` or bare alias before a comma
        if is_unquoted_keyword(tokens.get(i), &[Keyword::AS]) {
            i += 1;
        }
        if let Some((_, after_alias)) = read_object_name(tokens, i) {
            i = after_alias;
        }
        if matches!(tokens.get(i), Some(Token::Comma)) {
            i += 1;
            continue;
        }
        return i;
    }
}

/// Read a possibly-dotted object name starting at `start`.
///
/// Returns the joined name and the index of the first token past it.
pub(crate) fn read_object_name(tokens: &[Token], start: usize) -> Option<(String, usize)> {
    let mut parts: Vec<String> = Vec::new();
    let mut i = start;
    loop {
        match tokens.get(i) {
            Some(Token::Word(word)) if is_name_part(word) => {
                parts.push(word.value.clone());
                i += 1;
            }
            _ => break,
        }
        if matches!(tokens.get(i), Some(Token::Period)) {
            i += 1;
            continue;
        }
        break;
    }
    if parts.is_empty() {
        None
    } else {
        Some((parts.join("."), i))
    }
}

fn is_name_part(word: &Word) -> bool {
    word.quote_style.is_some()
        || (!STRUCTURAL_KEYWORDS.contains(&word.keyword)
            && !REFERENCE_KEYWORDS.contains(&word.keyword))
}

fn is_unquoted_keyword(token: Option<&Token>, keywords: &[Keyword]) -> bool {
    matches!(
        token,
        Some(Token::Word(word)) if word.quote_style.is_none() && keywords.contains(&word.keyword)
    )
}

/// Collect every name declared as a CTE anywhere in the statement.
pub(crate) fn cte_names(tokens: &[Token]) -> HashSet<String> {
    let mut names = HashSet::new();
    let mut i = 0;
    while i < tokens.len() {
        if is_unquoted_keyword(tokens.get(i), &[Keyword::WITH]) {
            collect_with_clause(tokens, i + 1, &mut names);
        }
        i += 1;
    }
    names
}

/// Walk a WITH clause starting right after the WITH keyword, recording
/// the declared names. Returns the index of the statement body that
/// follows the clause.
///
/// Only commits a name once the full `name [ (columns) ] AS ( body )`
/// shape is present, so table hints like `WITH (NOLOCK)` record nothing.
pub(crate) fn collect_with_clause(
    tokens: &[Token],
    start: usize,
    names: &mut HashSet<String>,
) -> usize {
    let mut i = start;
    if is_unquoted_keyword(tokens.get(i), &[Keyword::RECURSIVE]) {
        i += 1;
    }
    loop {
        let Some((name, mut j)) = read_object_name(tokens, i) else {
            return i;
        };
        if name.contains('.') {
            return i;
        }
        if matches!(tokens.get(j), Some(Token::LParen)) {
            j = skip_parens(tokens, j);
        }
        if !is_unquoted_keyword(tokens.get(j), &[Keyword::AS]) {
            return i;
        }
        j += 1;
        // postgres MATERIALIZED / NOT MATERIALIZED hint
        while is_unquoted_keyword(tokens.get(j), &[Keyword::NOT, Keyword::MATERIALIZED]) {
            j += 1;
        }
        if !matches!(tokens.get(j), Some(Token::LParen)) {
            return i;
        }
        j = skip_parens(tokens, j);
        names.insert(name);
        i = j;
        if matches!(tokens.get(i), Some(Token::Comma)) {
            i += 1;
            continue;
        }
        return i;
    }
}

/// Skip a balanced parenthesized group. `start` must point at the
/// opening paren; returns the index just past the matching close.
fn skip_parens(tokens: &[Token], start: usize) -> usize {
    let mut depth = 0usize;
    let mut i = start;
    while i < tokens.len() {
        match tokens[i] {
            Token::LParen => depth += 1,
            Token::RParen => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return i + 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    i
}

/// Scanner error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    /// The tokenizer rejected the input, e.g. an unterminated string
    #[error("Failed to tokenize SQL: {0}")]
    Tokenize(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(sql: &str) -> Vec<String> {
        ReferenceScanner::new().scan(sql).unwrap()
    }

    #[test]
    fn scan_simple_from() {
        assert_eq!(scan("SELECT * FROM users"), vec!["users"]);
    }

    #[test]
    fn scan_joins() {
        assert_eq!(
            scan("SELECT * FROM orders o JOIN customers c ON o.cid = c.id"),
            vec!["orders", "customers"]
        );
    }

    #[test]
    fn scan_comma_list() {
        assert_eq!(scan("SELECT * FROM a, b, c WHERE a.x = b.x"), vec!["a", "b", "c"]);
        assert_eq!(scan("SELECT * FROM a one, b two"), vec!["a", "b"]);
    }

    #[test]
    fn scan_dotted_names() {
        assert_eq!(scan("SELECT * FROM analytics.daily"), vec!["analytics.daily"]);
        assert_eq!(scan("SELECT * FROM penguins.csv"), vec!["penguins.csv"]);
    }

    #[test]
    fn scan_quoted_names() {
        assert_eq!(scan(r#"SELECT * FROM "My Table""#), vec!["My Table"]);
    }

    #[test]
    fn scan_ignores_comments_and_strings() {
        let sql = "SELECT 'from fake_table' AS note -- from commented_table\nFROM real_table /* from another */";
        assert_eq!(scan(sql), vec!["real_table"]);
    }

    #[test]
    fn scan_deduplicates_in_first_appearance_order() {
        assert_eq!(
            scan("SELECT * FROM a JOIN b ON a.x = b.x JOIN a ON a.y = b.y"),
            vec!["a", "b"]
        );
    }

    #[test]
    fn scan_excludes_own_cte_names() {
        let sql = "WITH langs AS (SELECT * FROM language_lt2) SELECT * FROM langs";
        assert_eq!(scan(sql), vec!["language_lt2"]);
    }

    #[test]
    fn scan_excludes_nested_cte_names() {
        let sql = "CREATE TABLE out AS (WITH inner_rows AS (SELECT * FROM src) SELECT * FROM inner_rows)";
        assert_eq!(scan(sql), vec!["out", "src"]);
    }

    #[test]
    fn scan_insert_and_create_targets() {
        assert_eq!(
            scan("INSERT INTO target (a, b) SELECT a, b FROM source"),
            vec!["target", "source"]
        );
        assert_eq!(
            scan("CREATE TABLE IF NOT EXISTS copy AS SELECT * FROM original"),
            vec!["copy", "original"]
        );
        assert_eq!(scan("DROP TABLE IF EXISTS stale"), vec!["stale"]);
        assert_eq!(scan("UPDATE accounts SET balance = 0"), vec!["accounts"]);
    }

    #[test]
    fn scan_skips_table_functions() {
        assert_eq!(
            scan("SELECT * FROM read_csv('data.csv') JOIN lookup ON true"),
            vec!["lookup"]
        );
    }

    #[test]
    fn scan_skips_derived_tables() {
        assert_eq!(scan("SELECT * FROM (SELECT * FROM inner_table) t"), vec!["inner_table"]);
    }

    #[test]
    fn scan_is_case_sensitive() {
        assert_eq!(scan("SELECT * FROM Users JOIN users ON true"), vec!["Users", "users"]);
    }

    #[test]
    fn scan_subquery_references() {
        let sql = "SELECT * FROM a WHERE x IN (SELECT x FROM b)";
        assert_eq!(scan(sql), vec!["a", "b"]);
    }

    #[test]
    fn scan_recursive_cte_name_excluded() {
        let sql = "WITH RECURSIVE cnt AS (SELECT 1 AS n UNION ALL SELECT n + 1 FROM cnt WHERE n < 5) SELECT * FROM cnt";
        assert!(scan(sql).is_empty());
    }

    #[test]
    fn scan_cte_with_column_list() {
        let sql = "WITH t(a, b) AS (SELECT 1, 2 FROM base) SELECT * FROM t";
        assert_eq!(scan(sql), vec!["base"]);
    }

    #[test]
    fn tokenize_rejects_unterminated_string() {
        let scanner = ReferenceScanner::new();
        assert!(matches!(
            scanner.scan("SELECT 'oops FROM t"),
            Err(ScanError::Tokenize(_))
        ));
    }

    #[test]
    fn dialect_constructors_scan_alike() {
        let sql = "SELECT * FROM metrics";
        for scanner in [
            ReferenceScanner::new(),
            ReferenceScanner::sqlite(),
            ReferenceScanner::duckdb(),
            ReferenceScanner::postgres(),
            ReferenceScanner::mysql(),
            ReferenceScanner::mssql(),
            ReferenceScanner::snowflake(),
        ] {
            assert_eq!(scanner.scan(sql).unwrap(), vec!["metrics"]);
        }
    }

    #[test]
    fn from_dialect_roundtrip() {
        let scanner = ReferenceScanner::from_dialect(DialectConfig::DuckDb);
        assert_eq!(scanner.scan("SELECT * FROM t").unwrap(), vec!["t"]);
    }
}
