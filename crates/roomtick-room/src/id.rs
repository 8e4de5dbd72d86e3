//! Room identity types.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::RoomError;

/// Counter for room instance numbers, shared by every registry in the
/// process so tags never repeat.
static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// Externally supplied room identifier.
///
/// Case-sensitive and stable for the lifetime of a room. Serializes as a
/// bare string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Builds an identifier, rejecting the empty string.
    pub fn new(id: impl Into<String>) -> Result<Self, RoomError> {
        let id = id.into();
        if id.is_empty() {
            return Err(RoomError::EmptyId);
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for RoomId {
    type Err = RoomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for RoomId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of one room instance.
///
/// Two rooms created under the same [`RoomId`] (one destroyed, the next
/// created later) carry different tags. Players remember the tag of the room
/// they occupy, not just its identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomTag {
    id: RoomId,
    instance: u64,
}

impl RoomTag {
    /// Allocates a tag for a new instance of `id`.
    pub(crate) fn allocate(id: RoomId) -> Self {
        Self {
            id,
            instance: NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    /// Process-unique instance number.
    pub fn instance(&self) -> u64 {
        self.instance
    }
}

impl fmt::Display for RoomTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.id, self.instance)
    }
}
