//! Room registry: creates, tracks, steps and destroys rooms.

use std::time::Duration;

use indexmap::IndexMap;

use crate::{Occupant, Room, RoomId, RoomSeed, RoomTag};

/// What [`RoomRegistry::ensure_room`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The room did not exist; it was created and the player joined it.
    Created,
    /// The room existed and the player was forwarded to it.
    Joined,
    /// The player already occupies this room instance. Nothing happened.
    AlreadyPresent,
}

/// Single source of truth mapping room identifiers to live rooms.
///
/// # Concurrency note
///
/// Not synchronized. The scheduler owns one registry behind a lock so that
/// stepping every room and mutating the map never interleave.
///
/// Rooms are kept in creation order and stepped in that order.
pub struct RoomRegistry<R: Room> {
    rooms: IndexMap<RoomId, R>,
    config: R::Config,
}

impl<R: Room> RoomRegistry<R> {
    /// Creates an empty registry. `config` is passed to every
    /// [`Room::open`].
    pub fn new(config: R::Config) -> Self {
        Self {
            rooms: IndexMap::new(),
            config,
        }
    }

    /// Joins `player` to room `id`, creating the room on first use.
    ///
    /// Re-requesting the room instance the player already occupies is a
    /// no-op. The identifier is not validated here; see [`RoomId::new`].
    pub fn ensure_room(&mut self, id: &RoomId, player: &mut R::Player) -> JoinOutcome {
        if let Some(room) = self.rooms.get_mut(id) {
            if player.current_room() == Some(room.tag()) {
                return JoinOutcome::AlreadyPresent;
            }
            room.on_player_join(player);
            return JoinOutcome::Joined;
        }

        tracing::info!(room_id = %id, "loading room");
        let room = R::open(
            RoomSeed {
                tag: RoomTag::allocate(id.clone()),
            },
            &self.config,
        );
        // Fully constructed before it becomes visible.
        let room = self.rooms.entry(id.clone()).or_insert(room);
        room.on_player_join(player);
        JoinOutcome::Created
    }

    /// Looks up a room. `None` if no room is registered under `id`.
    pub fn get_room(&self, id: &RoomId) -> Option<&R> {
        self.rooms.get(id)
    }

    pub fn get_room_mut(&mut self, id: &RoomId) -> Option<&mut R> {
        self.rooms.get_mut(id)
    }

    /// Removes a room and hands it back. Unknown identifiers are a no-op.
    ///
    /// The registry does no teardown; dropping the returned room is the
    /// caller's business.
    pub fn destroy_room(&mut self, id: &RoomId) -> Option<R> {
        let room = self.rooms.shift_remove(id)?;
        tracing::info!(room_id = %id, "unloading room");
        Some(room)
    }

    /// Runs one fixed step on every registered room, in creation order.
    /// Returns the number of rooms stepped.
    pub fn step_all(&mut self, fixed_dt: Duration, real_dt: Duration) -> usize {
        for room in self.rooms.values_mut() {
            room.step(fixed_dt, real_dt);
        }
        self.rooms.len()
    }

    pub fn contains(&self, id: &RoomId) -> bool {
        self.rooms.contains_key(id)
    }

    /// Number of live rooms.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Identifiers of all live rooms, in creation order.
    pub fn ids(&self) -> impl Iterator<Item = &RoomId> {
        self.rooms.keys()
    }

    /// Tags of all live rooms, in creation order.
    pub fn tags(&self) -> impl Iterator<Item = &RoomTag> {
        self.rooms.values().map(|room| room.tag())
    }

    pub fn config(&self) -> &R::Config {
        &self.config
    }
}
