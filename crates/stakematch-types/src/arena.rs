//! Arena configuration.

use serde::{Deserialize, Serialize};

use crate::{ArenaId, Location, LoadoutId, Sides, ZoneId};

/// How an arena zone is restored after a match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ZoneResetPolicy {
    /// Copy a pristine template zone over the arena zone.
    CloneFrom { source: ZoneId },
    /// Regenerate the arena zone from its generator.
    Regenerate,
    /// Unload the zone and let the next load start from disk.
    #[default]
    Unload,
}

/// A contested zone plus where each side starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArenaConfig {
    pub id: ArenaId,
    pub display_name: String,
    pub zone: ZoneId,
    /// Fixed starting positions inside `zone`.
    pub spawns: Sides<Location>,
    /// Used by the emergency re-teleport. Falls back to the zone spawn.
    #[serde(default)]
    pub fallback_spawn: Option<Location>,
    #[serde(default)]
    pub reset: ZoneResetPolicy,
    /// Loadouts usable in this arena. Empty means any.
    #[serde(default)]
    pub allowed_loadouts: Vec<LoadoutId>,
}

impl ArenaConfig {
    #[must_use]
    pub fn allows_loadout(&self, loadout: &LoadoutId) -> bool {
        self.allowed_loadouts.is_empty() || self.allowed_loadouts.contains(loadout)
    }
}
