//! CTE assembly
//!
//! Renders resolved snippets into a WITH clause ahead of a root query.

use sqlparser::keywords::ALL_KEYWORDS;

use sqlstitch_core::Snippet;

/// Build the final statement `WITH s1 AS (b1), s2 AS (b2), ... root`.
///
/// Snippets must already be in dependency-first order. If the root
/// itself opens with a WITH clause (the engine normally refuses those,
/// but this function is usable on its own) the generated clauses are
/// merged ahead of the user's so the statement keeps a single WITH
/// keyword.
pub fn compose_query(root: &str, snippets: &[&Snippet]) -> String {
    if snippets.is_empty() {
        return root.to_string();
    }

    let clauses: Vec<String> = snippets
        .iter()
        .map(|snippet| format!("{} AS ({})", quote_ident(&snippet.name), snippet.body))
        .collect();

    match split_leading_with(root) {
        Some((prefix, rest)) => format!(
            "{}WITH {}, {}",
            prefix,
            clauses.join(", "),
            rest.trim_start()
        ),
        None => format!("WITH {} {}", clauses.join(", "), root),
    }
}

/// Quote a snippet name when it cannot stand bare in a WITH clause.
///
/// Identifier-shaped names pass through untouched unless they collide
/// with a SQL keyword; anything else is double-quoted with embedded
/// quotes doubled.
pub fn quote_ident(name: &str) -> String {
    if is_plain_identifier(name) {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return false;
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return false;
    }
    let upper = name.to_ascii_uppercase();
    ALL_KEYWORDS.binary_search(&upper.as_str()).is_err()
}

/// Split off a leading WITH keyword, returning the prefix before it
/// (whitespace and comments) and the remainder after it.
fn split_leading_with(sql: &str) -> Option<(&str, &str)> {
    let bytes = sql.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_whitespace() {
            i += 1;
            continue;
        }
        if bytes[i..].starts_with(b"--") {
            while i < bytes.len() && bytes[i] != b'\n' {
                i += 1;
            }
            continue;
        }
        if bytes[i..].starts_with(b"/*") {
            match sql[i + 2..].find("*/") {
                Some(end) => {
                    i += end + 4;
                    continue;
                }
                None => return None,
            }
        }
        break;
    }
    let rest = &sql[i..];
    if rest.len() < 4 || !rest.as_bytes()[..4].eq_ignore_ascii_case(b"with") {
        return None;
    }
    // bytes 0..4 are ASCII after the match, so slicing at 4 is safe
    let boundary = rest[4..].chars().next();
    match boundary {
        Some(c) if c.is_alphanumeric() || c == '_' => None,
        _ => Some((&sql[..i], &rest[4..])),
    }
}
