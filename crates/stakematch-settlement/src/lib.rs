//! # stakematch-settlement
//!
//! **Finality Plane**: deciding where a match's stake goes, exactly once.
//!
//! ## Architecture
//!
//! When a match ends, the orchestrator:
//! 1. Records finality once ([`SettlementGuard`]: decided or cancelled)
//! 2. Plans payouts from the held stakes and the outcome ([`plan_payouts`])
//! 3. Delivers them through escrow, recording each delivery in the
//!    [`StakeLedger`]
//! 4. Verifies conservation when the match is cleaned up
//! 5. Restores the arena zone per its [`ZoneResetAction`]
//!
//! Nothing here touches the environment; this crate only decides and
//! accounts.

pub mod conservation;
pub mod finality;
pub mod payout;
pub mod zone_reset;

pub use conservation::{StakeLedger, StakeTotals};
pub use finality::{Finality, SettlementGuard};
pub use payout::plan_payouts;
pub use zone_reset::ZoneResetAction;
