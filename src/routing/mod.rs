//! Request routing subsystem.
//!
//! Pools are scanned in configured order and the first whose prefix matches
//! the request path wins; ordering is therefore caller-controlled.

pub mod matcher;

pub use matcher::matches;
