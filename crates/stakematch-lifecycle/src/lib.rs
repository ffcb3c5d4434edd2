//! # stakematch-lifecycle
//!
//! **Pure lifecycle core for StakeMatch.**
//!
//! Everything in this crate is data in, data out:
//!
//! - **Phase machine**: [`advance`] maps `(phase, event)` to the next phase
//!   plus a list of [`Effect`]s for the orchestrator to perform
//! - **Scheduler**: delayed continuations stored as values, keyed by match,
//!   cancellable per match and sealable during shutdown
//! - **Bounded retry**: one attempt counter reused for equipment, arrival
//!   and return verification
//!
//! No environment access, no clocks, no threads. The orchestrator owns the
//! tick and feeds it in.

pub mod machine;
pub mod retry;
pub mod scheduler;

pub use machine::{Effect, Event, Transition, Wake, advance};
pub use retry::{BoundedRetry, RetryStep};
pub use scheduler::{ScheduledTask, Scheduler};
