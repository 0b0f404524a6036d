//! Access guard for mutating calls.
//!
//! # Responsibility
//! - Gate every mutation on a non-blank actor identifier.
//!
//! # Invariants
//! - One predicate, no roles or permission variants.
//! - Reads bypass the guard entirely.

/// Returns the trimmed actor when it names an authenticated session.
///
/// `None` means the mutation must be rejected before any side effect.
pub fn authorized_actor(actor: &str) -> Option<&str> {
    let trimmed = actor.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}
