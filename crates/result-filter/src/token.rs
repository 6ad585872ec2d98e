//! Query tokenizer
//!
//! Splitting is done by hand rather than with one monolithic regex so
//! the escaping rules stay auditable in isolation: first split on
//! unescaped commas, then split each clause on its first `=`.

/// Split a query into clauses on unescaped commas.
///
/// The escape sequence `\,` yields a literal comma inside a clause
/// value. Any other backslash sequence is kept verbatim.
pub(crate) fn split_clauses(query: &str) -> Vec<String> {
    let mut clauses = Vec::new();
    let mut current = String::new();
    let mut chars = query.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&',') => {
                chars.next();
                current.push(',');
            }
            ',' => {
                clauses.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    clauses.push(current);
    clauses
}

/// Split one clause into its key and raw value.
///
/// The key must be non-empty and word-only (`[A-Za-z0-9_]`), followed
/// by `=` and the remainder of the clause (which may be empty).
pub(crate) fn split_key_value(clause: &str) -> Option<(&str, &str)> {
    let (key, value) = clause.split_once('=')?;
    if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    Some((key, value))
}

/// Escape literal commas in a value for canonical rendering.
pub(crate) fn escape_value(value: &str) -> String {
    value.replace(',', "\\,")
}
