//! SQL statement normalization, so that cosmetic differences (whitespace,
//! comments, keyword case) between two textually-different but equivalent
//! statements still fingerprint identically.

use crate::{fingerprint, Value};
use lazy_static::lazy_static;
use regex::Regex;

const KEYWORDS: &[&str] = &[
    "SELECT", "FROM", "WHERE", "INSERT", "INTO", "VALUES", "UPDATE", "SET", "DELETE", "JOIN",
    "LEFT", "RIGHT", "INNER", "OUTER", "ON", "GROUP", "BY", "ORDER", "HAVING", "LIMIT", "OFFSET",
    "AND", "OR", "NOT", "NULL", "AS", "DISTINCT", "UNION", "ALL", "WITH", "CREATE", "TABLE",
    "DROP", "ALTER", "TRUNCATE", "IN", "EXISTS", "LIKE", "BETWEEN", "CASE", "WHEN", "THEN",
    "ELSE", "END",
];

const WRITE_KEYWORDS: &[&str] = &["INSERT", "UPDATE", "DELETE", "DROP", "ALTER", "TRUNCATE"];

lazy_static! {
    static ref LINE_COMMENT: Regex = Regex::new(r"--[^\n]*").unwrap();
    static ref BLOCK_COMMENT: Regex = Regex::new(r"(?s)/\*.*?\*/").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref OPERATOR_SPACING: Regex = Regex::new(r"\s*(<>|!=|<=|>=|=|<|>)\s*").unwrap();
}

/// Strips comments, collapses whitespace, normalizes comparison-operator
/// spacing, and uppercases the fixed keyword set in [`KEYWORDS`].
pub fn normalize(sql: &str) -> String {
    let no_line_comments = LINE_COMMENT.replace_all(sql, "");
    let no_comments = BLOCK_COMMENT.replace_all(&no_line_comments, "");
    let spaced_operators = OPERATOR_SPACING.replace_all(&no_comments, " $1 ");
    let collapsed = WHITESPACE.replace_all(&spaced_operators, " ");
    let trimmed = collapsed.trim();

    trimmed
        .split(' ')
        .map(|token| {
            let upper = token.to_uppercase();
            if KEYWORDS.contains(&upper.as_str()) {
                upper
            } else {
                token.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// `true` iff the normalized statement (with a `WITH` CTE prelude unwrapped
/// by searching for any write keyword anywhere in the text) starts with or
/// contains a write keyword per spec §4.7.
pub fn is_write(sql: &str) -> bool {
    let normalized = normalize(sql);
    let upper = normalized.to_uppercase();
    let first_token = upper.split_whitespace().next().unwrap_or("");

    if WRITE_KEYWORDS.contains(&first_token) {
        return true;
    }
    if first_token == "WITH" {
        return WRITE_KEYWORDS
            .iter()
            .any(|kw| upper.split_whitespace().any(|tok| tok == *kw));
    }
    false
}

/// `fingerprint(normalize(sql))`.
pub fn sql_fingerprint(sql: &str) -> String {
    fingerprint(&Value::String(normalize(sql)))
}

/// `fingerprint(params)`, treating the params as whatever positional list
/// or named map the caller provided.
pub fn params_fingerprint(params: &Value) -> String {
    fingerprint(params)
}
