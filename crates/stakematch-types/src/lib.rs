//! # stakematch-types
//!
//! Shared types, errors, and configuration for the **StakeMatch** duel engine.
//!
//! This crate is the leaf dependency of the workspace: every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`MatchId`], [`ActorId`], [`ZoneId`], [`ArenaId`], [`LoadoutId`]
//! - **Time**: [`Tick`], [`Ticks`] (server ticks, 20 per second)
//! - **Geometry**: [`Location`], [`ZoneInfo`]
//! - **Stake model**: [`ItemStack`], [`Wager`], [`Stake`], [`HeldStakes`], [`Payout`], [`StakeCustody`]
//! - **Arena model**: [`ArenaConfig`], [`ZoneResetPolicy`], [`Loadout`], [`Slot`]
//! - **Match model**: [`Agreement`], [`MatchRecord`], [`Phase`], [`MatchState`], [`Outcome`]
//! - **Configuration**: [`OrchestratorConfig`], [`PhaseTiming`], [`WagerPolicy`], [`ArenaCatalog`]
//! - **Collaborators**: [`Environment`], [`ZoneProvisioner`], [`StatsService`]
//! - **Errors**: [`StakematchError`] with `SM_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults
//!
//! With the `test-helpers` feature, [`sim`] provides an in-memory
//! environment, zone provisioner and stats sink for tests.

pub mod agreement;
pub mod arena;
pub mod config;
pub mod constants;
pub mod error;
pub mod geometry;
pub mod ids;
pub mod item;
pub mod loadout;
pub mod notice;
pub mod phase;
pub mod ports;
pub mod record;
pub mod sides;
pub mod time;
pub mod wager;

#[cfg(any(test, feature = "test-helpers"))]
pub mod sim;

// Re-export all primary types at crate root for ergonomic imports:
//   use stakematch_types::{MatchRecord, Phase, Wager, ...};

pub use agreement::*;
pub use arena::*;
pub use config::*;
pub use error::*;
pub use geometry::*;
pub use ids::*;
pub use item::*;
pub use loadout::*;
pub use notice::*;
pub use phase::*;
pub use ports::*;
pub use record::*;
pub use sides::*;
pub use time::*;
pub use wager::*;

// Constants are accessed via `stakematch_types::constants::FOO`
// (not re-exported to avoid name collisions).
