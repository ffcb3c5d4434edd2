//! # stakematch-orchestrator
//!
//! Drives staked 1-vs-1 matches from agreement to cleanup on the host's
//! server tick.
//!
//! - [`MatchOrchestrator`]: the entry points (`start_match`, `tick`,
//!   `end_match`, draw votes, eliminations, spectators, shutdown)
//! - [`TeleportCoordinator`]: moves in and out, arrival and return checks
//! - [`EquipmentApplier`]: loadout application with bounded verification
//! - [`ZoneInbox`]: thread-safe hand-off of zone provisioner callbacks
//!
//! ## Match Lifecycle
//!
//! ```text
//! LoadingZone ─► SecuringStake ─► PreTeleportCountdown ─► VerifyingArrival
//!      │               │                                        │
//!      └── Cancelled ◄─┴────────────────────────────────────────┤
//!                                                               ▼
//!                        Ended ◄── Fighting ◄── InZoneCountdown
//! ```
//!
//! Any live phase settles to `Ended` (win, draw, forfeit, shutdown).
//! Settlement happens at most once per match; stake is conserved across
//! every path, including aborts and immediate shutdown.

pub mod equipment;
pub mod orchestrator;
mod settlement;
pub mod teleport;
pub mod zone;

pub use equipment::EquipmentApplier;
pub use orchestrator::{MatchOrchestrator, MatchTask};
pub use stakematch_settlement::Finality;
pub use teleport::{RelocationPolicy, ReturnOutcome, TeleportCoordinator, TeleportMarker};
pub use zone::{ZoneInbox, ZonePurpose, ZoneReport};
