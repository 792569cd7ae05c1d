//! Statement type classification
//!
//! Coarse classification by leading keyword, with one level of WITH
//! unwrapped so `WITH ... SELECT` still counts as a SELECT.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::Token;

use crate::scanner::collect_with_clause;

/// Coarse statement category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    Select,
    Insert,
    Update,
    Delete,
    Create,
    Drop,
    Alter,
    Explain,
    Show,
    Describe,
    Truncate,
}

impl QueryType {
    fn from_keyword(keyword: Keyword) -> Option<Self> {
        match keyword {
            Keyword::SELECT => Some(Self::Select),
            // VALUES produces rows like a SELECT and is legal inside a CTE
            Keyword::VALUES => Some(Self::Select),
            Keyword::INSERT => Some(Self::Insert),
            Keyword::UPDATE => Some(Self::Update),
            Keyword::DELETE => Some(Self::Delete),
            Keyword::CREATE => Some(Self::Create),
            Keyword::DROP => Some(Self::Drop),
            Keyword::ALTER => Some(Self::Alter),
            Keyword::EXPLAIN => Some(Self::Explain),
            Keyword::SHOW => Some(Self::Show),
            Keyword::DESCRIBE => Some(Self::Describe),
            Keyword::TRUNCATE => Some(Self::Truncate),
            _ => None,
        }
    }

    /// True for the only category that composes
    pub fn is_select(&self) -> bool {
        matches!(self, Self::Select)
    }
}

impl std::fmt::Display for QueryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Select => "select",
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Create => "create",
            Self::Drop => "drop",
            Self::Alter => "alter",
            Self::Explain => "explain",
            Self::Show => "show",
            Self::Describe => "describe",
            Self::Truncate => "truncate",
        };
        write!(f, "{}", name)
    }
}

/// Classify a token stream by its leading statement keyword.
///
/// One leading WITH clause is skipped, so `WITH a AS (...) SELECT ...`
/// classifies as a SELECT and `WITH a AS (...) INSERT ...` as an INSERT.
/// Returns `None` for statements that start with something other than a
/// recognized statement keyword.
pub fn classify(tokens: &[Token]) -> Option<QueryType> {
    let mut i = 0;
    if leading_keyword(tokens, 0) == Some(Keyword::WITH) {
        let mut names = HashSet::new();
        i = collect_with_clause(tokens, 1, &mut names);
    }
    QueryType::from_keyword(leading_keyword(tokens, i)?)
}

/// True when the statement's first token opens a WITH clause.
pub fn starts_with_cte(tokens: &[Token]) -> bool {
    leading_keyword(tokens, 0) == Some(Keyword::WITH)
}

fn leading_keyword(tokens: &[Token], index: usize) -> Option<Keyword> {
    match tokens.get(index) {
        Some(Token::Word(word)) if word.quote_style.is_none() => Some(word.keyword),
        _ => None,
    }
}
