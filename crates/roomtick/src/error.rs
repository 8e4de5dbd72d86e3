//! Unified error type for Roomtick.

use roomtick_room::RoomError;
use roomtick_tick::TickError;

/// Top-level error that wraps the sub-crate errors.
///
/// The `#[from]` conversions let `?` lift sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum RoomtickError {
    /// An invalid room identifier.
    #[error(transparent)]
    Room(#[from] RoomError),

    /// An invalid stepper configuration.
    #[error(transparent)]
    Tick(#[from] TickError),

    /// The driver task ended abnormally, usually because a room panicked
    /// inside `step`.
    #[error("room driver failed: {0}")]
    DriverFailed(String),
}
