//! Identifiers used throughout StakeMatch.
//!
//! Match ids use UUIDv7 for time-ordered sorting. Actor ids are whatever
//! UUID the host platform assigns to a connected actor. Zone, arena and
//! loadout ids are configuration keys.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// MatchId
// ---------------------------------------------------------------------------

/// Unique match identifier. Uses UUIDv7 for time-ordered sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct MatchId(pub Uuid);

impl MatchId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    #[must_use]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Short code shown to participants and in log lines.
    ///
    /// Taken from the random tail of the UUID so that matches created in
    /// the same millisecond still get distinct codes.
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0.as_bytes()[12..])
    }
}

impl Default for MatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "match:{}", self.short())
    }
}

// ---------------------------------------------------------------------------
// ActorId
// ---------------------------------------------------------------------------

/// Identifier of an actor on the host platform (participant or spectator).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ActorId(pub Uuid);

impl ActorId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }
}

impl Default for ActorId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// String keys
// ---------------------------------------------------------------------------

macro_rules! string_key {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            #[must_use]
            pub fn new(key: impl Into<String>) -> Self {
                Self(key.into())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(key: &str) -> Self {
                Self(key.to_string())
            }
        }

        impl From<String> for $name {
            fn from(key: String) -> Self {
                Self(key)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_key!(
    /// Name of a zone (world / level instance) on the host platform.
    ZoneId
);

string_key!(
    /// Configuration key of an arena.
    ArenaId
);

string_key!(
    /// Configuration key of an equipment loadout.
    LoadoutId
);

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_id_uniqueness() {
        let a = MatchId::new();
        let b = MatchId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn match_id_ordering() {
        let a = MatchId::new();
        let b = MatchId::new();
        assert!(a < b);
    }

    #[test]
    fn match_id_short_code() {
        let id = MatchId::from_bytes([0xAB; 16]);
        assert_eq!(id.short(), "abababab");
        assert_eq!(format!("{id}"), "match:abababab");
    }

    #[test]
    fn string_keys_display_and_compare() {
        let zone = ZoneId::from("arena_desert");
        assert_eq!(zone.as_str(), "arena_desert");
        assert_eq!(format!("{zone}"), "arena_desert");
        assert_eq!(ArenaId::new("desert"), ArenaId::from("desert"));
    }

    #[test]
    fn string_keys_serialize_transparently() {
        let json = serde_json::to_string(&LoadoutId::from("knight")).unwrap();
        assert_eq!(json, "\"knight\"");
    }
}
