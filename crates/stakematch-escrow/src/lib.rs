//! # stakematch-escrow
//!
//! **Ingress plane**: who is committed to which match, and where the
//! wagered stake lives.
//!
//! ## Architecture
//!
//! 1. **MatchRegistry**: authoritative map of active matches plus the
//!    actor → match membership index, serialized under one mutex
//! 2. **Escrow**: validates wagers before anything is touched, removes
//!    stakes into match custody, and delivers them back out
//!
//! ## Stake Flow
//!
//! ```text
//! Agreement → Escrow.validate() → MatchRegistry.register()
//!     → Escrow.reserve()  (items removed, currency withdrawn, custody = Held)
//!     → settlement        (custody = Payable)
//!     → Escrow.deliver()  (items given / dropped, currency deposited)
//! ```
//!
//! Every failure after the first removal rolls back what was taken.

pub mod escrow;
pub mod registry;

pub use escrow::{DeliveryReport, Escrow};
pub use registry::MatchRegistry;
