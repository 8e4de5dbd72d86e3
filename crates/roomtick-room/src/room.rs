//! The `Room` and `Occupant` traits: what the registry needs from its
//! collaborators.
//!
//! The registry never looks inside a room. It constructs rooms, forwards
//! joins, and calls [`Room::step`] when the scheduler says so.

use std::time::Duration;

use crate::{RoomId, RoomTag};

/// Construction input for a new room.
#[derive(Debug, Clone)]
pub struct RoomSeed {
    /// Identity of the instance being created. The room should keep it and
    /// return it from [`Room::tag`].
    pub tag: RoomTag,
}

impl RoomSeed {
    pub fn id(&self) -> &RoomId {
        self.tag.id()
    }
}

/// A player as seen by the registry.
pub trait Occupant {
    /// The room instance this player currently occupies, if any.
    ///
    /// Rooms update this in [`Room::on_player_join`]; the registry only
    /// reads it.
    fn current_room(&self) -> Option<&RoomTag>;
}

/// An isolated simulation partition managed by a [`RoomRegistry`](crate::RoomRegistry).
///
/// Panics raised by `on_player_join` or `step` are not caught; they
/// propagate to whoever called into the registry.
pub trait Room: Send + 'static {
    /// Settings shared by every room a registry creates.
    type Config: Send + Sync + 'static;

    /// The player type that joins this room.
    type Player: Occupant + Send;

    /// Creates a room ready to accept joins and steps immediately.
    fn open(seed: RoomSeed, config: &Self::Config) -> Self;

    /// The tag this room was opened with.
    fn tag(&self) -> &RoomTag;

    /// The room's identifier. Never changes.
    fn id(&self) -> &RoomId {
        self.tag().id()
    }

    /// Adds a player. Implementations are expected to point the player's
    /// [`Occupant::current_room`] at [`Room::tag`].
    fn on_player_join(&mut self, player: &mut Self::Player);

    /// Advances the simulation by one fixed step.
    ///
    /// `fixed_dt` is always the scheduler's constant step; simulation should
    /// use it. `real_dt` is the wall time since the previous advance and is
    /// the same for every step of that advance.
    fn step(&mut self, fixed_dt: Duration, real_dt: Duration);
}
