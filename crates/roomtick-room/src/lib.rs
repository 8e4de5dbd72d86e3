//! Room registry for Roomtick.
//!
//! Maps room identifiers to live room instances. The registry owns every
//! room it creates; a room is reachable only through it and is handed back
//! to the caller when destroyed.
//!
//! # Key types
//!
//! - [`Room`]: the trait room implementations provide
//! - [`Occupant`]: what the registry needs to know about a joining player
//! - [`RoomRegistry`]: creates, looks up, steps and destroys rooms
//! - [`RoomId`] / [`RoomTag`]: identifier and per-instance identity

mod error;
mod id;
mod registry;
mod room;

pub use error::RoomError;
pub use id::{RoomId, RoomTag};
pub use registry::{JoinOutcome, RoomRegistry};
pub use room::{Occupant, Room, RoomSeed};
