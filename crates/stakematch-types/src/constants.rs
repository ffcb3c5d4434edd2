//! System-wide constants for the StakeMatch duel engine.
//!
//! Durations are in seconds unless the name ends in `_TICKS`.

/// Server ticks per wall-clock second.
pub const TICKS_PER_SECOND: u64 = 20;

/// Countdown before participants are moved into the arena zone.
pub const DEFAULT_PRE_TELEPORT_SECS: u32 = 5;

/// Countdown inside the arena zone before the fight starts.
pub const DEFAULT_IN_ZONE_COUNTDOWN_SECS: u32 = 10;

/// Maximum fight duration before the match is settled as a timeout draw.
pub const DEFAULT_MAX_FIGHT_SECS: u32 = 600;

/// Remaining-time checkpoints announced during the fight.
pub const DEFAULT_TIMER_CHECKPOINTS: [u32; 3] = [60, 30, 10];

/// Delay between `moveIn` and the first arrival check.
pub const DEFAULT_ARRIVAL_VERIFY_SECS: u32 = 2;

/// Delay between the emergency re-teleport and the final arrival check.
pub const DEFAULT_EMERGENCY_VERIFY_SECS: u32 = 1;

/// Delay between moving a recipient out of the zone and delivering stake.
pub const DEFAULT_DISTRIBUTE_DELAY_TICKS: u64 = 10;

/// Delay between settlement and registry cleanup.
pub const DEFAULT_CLEANUP_DELAY_SECS: u32 = 4;

/// Delay between settlement and the arena zone reset.
pub const DEFAULT_ZONE_RESET_DELAY_SECS: u32 = 7;

/// How long a mutual-draw proposal stays open.
pub const DEFAULT_DRAW_VOTE_SECS: u32 = 30;

/// Delay before the first loadout verification.
pub const DEFAULT_LOADOUT_FIRST_VERIFY_TICKS: u64 = 4;

/// Interval between loadout verification attempts.
pub const DEFAULT_LOADOUT_RETRY_INTERVAL_TICKS: u64 = 10;

/// Hard cap on loadout apply attempts.
pub const MAX_LOADOUT_ATTEMPTS: u32 = 3;

/// Delay before a return trip is verified.
pub const DEFAULT_RETURN_VERIFY_TICKS: u64 = 10;

/// Hard cap on return-trip attempts (initial move plus one retry).
pub const MAX_RETURN_ATTEMPTS: u32 = 2;

/// Hard cap on arrival attempts (initial move plus one emergency re-teleport).
pub const MAX_ARRIVAL_ATTEMPTS: u32 = 2;

/// How many times a payout may be postponed while the recipient is still
/// inside the contested zone.
pub const MAX_PAYOUT_DEFERRALS: u32 = 5;

/// Returns below `zone.min_height + SAFETY_FLOOR` use the zone spawn instead.
pub const DEFAULT_SAFETY_FLOOR: f64 = 5.0;

/// Allowed drift (blocks) between the requested and the observed return position.
pub const DEFAULT_RETURN_TOLERANCE: f64 = 3.0;

/// Minimum number of staked items across both sides (when currency is below its minimum).
pub const DEFAULT_MIN_WAGER_ITEMS: usize = 1;

/// Settlement idempotency cache size (number of match ids to remember).
pub const SETTLEMENT_IDEMPOTENCY_CACHE_SIZE: usize = 10_000;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "StakeMatch";
