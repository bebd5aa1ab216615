//! Path prefix matching.
//!
//! # Design Decisions
//! - Prefix matching is case-insensitive, so "/API/v1" is routed by a pool
//!   configured with "/api"
//! - No regex to guarantee O(n) matching

/// Returns true if `path` begins with `pattern`, ignoring ASCII case.
///
/// A pattern of "/" matches every request path.
pub fn matches(pattern: &str, path: &str) -> bool {
    match path.get(..pattern.len()) {
        Some(head) => head.eq_ignore_ascii_case(pattern),
        None => false,
    }
}
