//! Configuration types for the orchestrator and the arena catalog.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    constants, ArenaConfig, ArenaId, Loadout, LoadoutId, Location, Result, StakematchError, Ticks,
};

/// Top-level orchestrator configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub timing: PhaseTiming,
    pub retry: RetryTiming,
    pub wager: WagerPolicy,
    pub relocation: RelocationSettings,
}

/// Countdowns, fight clock and settlement delays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseTiming {
    pub pre_teleport_secs: u32,
    pub in_zone_countdown_secs: u32,
    pub max_fight_secs: u32,
    /// Remaining seconds at which the fight clock is announced.
    pub time_checkpoints: Vec<u32>,
    pub arrival_verify_delay: Ticks,
    pub emergency_verify_delay: Ticks,
    /// Moves into the zone before the match is cancelled (initial + emergency).
    pub arrival_max_attempts: u32,
    /// Gap between moving a recipient out and delivering their payout.
    pub distribute_delay: Ticks,
    pub cleanup_delay: Ticks,
    pub zone_reset_delay: Ticks,
    pub draw_vote_window: Ticks,
}

impl Default for PhaseTiming {
    fn default() -> Self {
        Self {
            pre_teleport_secs: constants::DEFAULT_PRE_TELEPORT_SECS,
            in_zone_countdown_secs: constants::DEFAULT_IN_ZONE_COUNTDOWN_SECS,
            max_fight_secs: constants::DEFAULT_MAX_FIGHT_SECS,
            time_checkpoints: constants::DEFAULT_TIMER_CHECKPOINTS.to_vec(),
            arrival_verify_delay: Ticks::from_secs(constants::DEFAULT_ARRIVAL_VERIFY_SECS),
            emergency_verify_delay: Ticks::from_secs(constants::DEFAULT_EMERGENCY_VERIFY_SECS),
            arrival_max_attempts: constants::MAX_ARRIVAL_ATTEMPTS,
            distribute_delay: Ticks(constants::DEFAULT_DISTRIBUTE_DELAY_TICKS),
            cleanup_delay: Ticks::from_secs(constants::DEFAULT_CLEANUP_DELAY_SECS),
            zone_reset_delay: Ticks::from_secs(constants::DEFAULT_ZONE_RESET_DELAY_SECS),
            draw_vote_window: Ticks::from_secs(constants::DEFAULT_DRAW_VOTE_SECS),
        }
    }
}

/// Bounded-retry settings for equipment, returns and payouts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryTiming {
    pub loadout_first_verify: Ticks,
    pub loadout_interval: Ticks,
    pub loadout_max_attempts: u32,
    pub return_verify_delay: Ticks,
    pub return_max_attempts: u32,
    /// How long to wait before retrying a payout whose recipient is still in the arena.
    pub payout_defer_interval: Ticks,
    pub payout_max_deferrals: u32,
}

impl Default for RetryTiming {
    fn default() -> Self {
        Self {
            loadout_first_verify: Ticks(constants::DEFAULT_LOADOUT_FIRST_VERIFY_TICKS),
            loadout_interval: Ticks(constants::DEFAULT_LOADOUT_RETRY_INTERVAL_TICKS),
            loadout_max_attempts: constants::MAX_LOADOUT_ATTEMPTS,
            return_verify_delay: Ticks(constants::DEFAULT_RETURN_VERIFY_TICKS),
            return_max_attempts: constants::MAX_RETURN_ATTEMPTS,
            payout_defer_interval: Ticks(constants::DEFAULT_DISTRIBUTE_DELAY_TICKS),
            payout_max_deferrals: constants::MAX_PAYOUT_DEFERRALS,
        }
    }
}

/// Minimum-wager and capacity checks run before any inventory is touched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WagerPolicy {
    /// A wager passes if it has at least this many stacks in total...
    pub min_items: usize,
    /// ...or at least this much currency in total.
    pub min_currency: Decimal,
    /// Reject when a side could not hold the opponent's stake.
    pub check_inventory_space: bool,
}

impl Default for WagerPolicy {
    fn default() -> Self {
        Self {
            min_items: constants::DEFAULT_MIN_WAGER_ITEMS,
            min_currency: Decimal::ZERO,
            check_inventory_space: true,
        }
    }
}

/// Where people go when their original position is no longer usable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelocationSettings {
    /// Spawn of the main zone, used when an original zone is gone.
    pub main_spawn: Location,
    /// Returns below `min_height + safety_floor` go to the zone spawn.
    pub safety_floor: f64,
    /// Drift (blocks) tolerated when verifying a return.
    pub return_tolerance: f64,
}

impl Default for RelocationSettings {
    fn default() -> Self {
        Self {
            main_spawn: Location::new("world", 0.0, 64.0, 0.0),
            safety_floor: constants::DEFAULT_SAFETY_FLOOR,
            return_tolerance: constants::DEFAULT_RETURN_TOLERANCE,
        }
    }
}

// ---------------------------------------------------------------------------
// Arena catalog
// ---------------------------------------------------------------------------

/// Arenas and loadouts known to the orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArenaCatalog {
    #[serde(default)]
    pub arenas: BTreeMap<ArenaId, ArenaConfig>,
    #[serde(default)]
    pub loadouts: BTreeMap<LoadoutId, Loadout>,
}

impl ArenaCatalog {
    /// Parse a catalog from JSON and check that keys match the embedded ids.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let catalog: Self = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn validate(&self) -> Result<()> {
        for (key, arena) in &self.arenas {
            if *key != arena.id {
                return Err(StakematchError::Configuration(format!(
                    "arena key {key} does not match id {}",
                    arena.id
                )));
            }
            for (_, spawn) in arena.spawns.iter() {
                if spawn.zone != arena.zone {
                    return Err(StakematchError::Configuration(format!(
                        "arena {key}: spawn in zone {} instead of {}",
                        spawn.zone, arena.zone
                    )));
                }
            }
            for loadout in &arena.allowed_loadouts {
                if !self.loadouts.contains_key(loadout) {
                    return Err(StakematchError::Configuration(format!(
                        "arena {key}: unknown loadout {loadout}"
                    )));
                }
            }
        }
        for (key, loadout) in &self.loadouts {
            if *key != loadout.id {
                return Err(StakematchError::Configuration(format!(
                    "loadout key {key} does not match id {}",
                    loadout.id
                )));
            }
        }
        Ok(())
    }

    pub fn insert_arena(&mut self, arena: ArenaConfig) {
        self.arenas.insert(arena.id.clone(), arena);
    }

    pub fn insert_loadout(&mut self, loadout: Loadout) {
        self.loadouts.insert(loadout.id.clone(), loadout);
    }

    #[must_use]
    pub fn arena(&self, id: &ArenaId) -> Option<&ArenaConfig> {
        self.arenas.get(id)
    }

    #[must_use]
    pub fn loadout(&self, id: &LoadoutId) -> Option<&Loadout> {
        self.loadouts.get(id)
    }
}
