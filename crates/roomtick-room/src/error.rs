//! Error types for the room layer.

/// Errors that can occur while building room identifiers.
///
/// Registry operations themselves never fail: unknown identifiers are
/// no-ops or lookups that return `None`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// The identifier was empty.
    #[error("room identifier must not be empty")]
    EmptyId,
}
