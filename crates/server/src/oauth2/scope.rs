//! Scope parsing and authorization for the client credentials grant.
//!
//! A client's allowed scopes are its ceiling. A request either names a subset
//! of that ceiling or names nothing at all, in which case the whole ceiling is
//! granted. Comparison is case-insensitive throughout.

use crate::error::AuthError;

/// Case-insensitive scope comparison.
pub fn scope_eq(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

/// Split a request's `scope` parameter on whitespace, dropping empty entries.
pub fn parse_requested(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| s.split_whitespace().map(String::from).collect())
        .unwrap_or_default()
}

/// Parse a stored allowed-scope list. Whitespace and commas both separate entries.
pub fn parse_allowed(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn dedup_ignore_case<'a>(scopes: impl IntoIterator<Item = &'a String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for scope in scopes {
        if !out.iter().any(|seen| scope_eq(seen, scope)) {
            out.push(scope.clone());
        }
    }
    out
}

/// Decide which scopes a token may carry.
///
/// Returns the requested scopes (first spelling of each kept) when any were
/// requested, otherwise the full allowed set. Fails with
/// [`AuthError::UnauthorizedScope`] naming every requested scope outside the
/// ceiling.
pub fn grant(requested: &[String], allowed: &[String]) -> Result<Vec<String>, AuthError> {
    if requested.is_empty() {
        return Ok(allowed.to_vec());
    }

    let rejected: Vec<&String> = requested
        .iter()
        .filter(|r| !allowed.iter().any(|a| scope_eq(a, r)))
        .collect();
    if !rejected.is_empty() {
        return Err(AuthError::UnauthorizedScope(dedup_ignore_case(rejected)));
    }

    Ok(dedup_ignore_case(requested))
}
