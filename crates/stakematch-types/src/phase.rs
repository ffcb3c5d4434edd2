//! Match phases, externally visible states and outcomes.
//!
//! ```text
//!  LoadingZone ──► SecuringStake ──► PreTeleportCountdown ──► VerifyingArrival ──► InZoneCountdown ──► Fighting ──► Ended
//!       │               │                                           │
//!       └───────────────┴───────────────────────────────────────────┴──► Cancelled
//! ```
//!
//! [`Phase`] is the fine-grained internal state driven by the lifecycle
//! machine. [`MatchState`] is the coarse state reported to the outside.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{ActorId, Tick};

/// Internal match phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Waiting for the zone provisioner to report the arena zone.
    LoadingZone,
    /// Zone is ready; stakes are being removed from the participants.
    SecuringStake,
    /// Counting down before participants are moved into the zone.
    PreTeleportCountdown { remaining: u32 },
    /// Participants were moved; waiting to confirm arrival. `attempt`
    /// counts moves made so far (1 = initial, 2 = emergency re-teleport).
    VerifyingArrival { attempt: u32 },
    /// Counting down inside the zone.
    InZoneCountdown { remaining: u32 },
    /// Combat is live.
    Fighting { started_at: Tick },
    /// Settled with an outcome.
    Ended,
    /// Aborted before the fight; stakes returned.
    Cancelled,
}

impl Phase {
    #[must_use]
    pub fn state(&self) -> MatchState {
        match self {
            Phase::LoadingZone
            | Phase::SecuringStake
            | Phase::PreTeleportCountdown { .. }
            | Phase::VerifyingArrival { .. } => MatchState::StartingPreTeleport,
            Phase::InZoneCountdown { .. } => MatchState::StartingInZoneCountdown,
            Phase::Fighting { .. } => MatchState::Fighting,
            Phase::Ended => MatchState::Ended,
            Phase::Cancelled => MatchState::Cancelled,
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }

    #[must_use]
    pub fn is_fighting(&self) -> bool {
        matches!(self, Phase::Fighting { .. })
    }
}

/// Externally visible match state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchState {
    StartingPreTeleport,
    StartingInZoneCountdown,
    Fighting,
    Ended,
    Cancelled,
}

impl MatchState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, MatchState::Ended | MatchState::Cancelled)
    }

    #[must_use]
    pub fn is_starting(self) -> bool {
        matches!(
            self,
            MatchState::StartingPreTeleport | MatchState::StartingInZoneCountdown
        )
    }
}

impl fmt::Display for MatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MatchState::StartingPreTeleport => "STARTING_PRETELEPORT",
            MatchState::StartingInZoneCountdown => "STARTING_INZONE_COUNTDOWN",
            MatchState::Fighting => "FIGHTING",
            MatchState::Ended => "ENDED",
            MatchState::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

/// Why a match ended without a winner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrawReason {
    /// Both participants accepted a draw vote.
    Agreed,
    /// The fight clock ran out.
    Timeout,
    /// Both participants were eliminated in the same tick.
    DoubleElimination,
    /// The orchestrator was stopped.
    Shutdown,
    /// An external caller declared the draw.
    Declared,
}

/// How a match was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Win { winner: ActorId, loser: ActorId },
    Draw(DrawReason),
}

impl Outcome {
    #[must_use]
    pub fn winner(&self) -> Option<ActorId> {
        match self {
            Outcome::Win { winner, .. } => Some(*winner),
            Outcome::Draw(_) => None,
        }
    }

    #[must_use]
    pub fn is_draw(&self) -> bool {
        matches!(self, Outcome::Draw(_))
    }
}

/// Why a match was cancelled before the fight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbortReason {
    /// The arena zone could not be provisioned.
    ZoneUnavailable,
    /// Stake could not be removed from a participant.
    StakeRejected,
    /// A participant did not arrive in the zone after the emergency re-teleport.
    TeleportFailed,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AbortReason::ZoneUnavailable => "zone unavailable",
            AbortReason::StakeRejected => "stake rejected",
            AbortReason::TeleportFailed => "teleport failed",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_map_to_states() {
        assert_eq!(Phase::LoadingZone.state(), MatchState::StartingPreTeleport);
        assert_eq!(
            Phase::VerifyingArrival { attempt: 2 }.state(),
            MatchState::StartingPreTeleport
        );
        assert_eq!(
            Phase::InZoneCountdown { remaining: 3 }.state(),
            MatchState::StartingInZoneCountdown
        );
        assert!(Phase::Cancelled.is_terminal());
        assert!(!Phase::Fighting { started_at: Tick(0) }.is_terminal());
    }

    #[test]
    fn state_display_names() {
        assert_eq!(
            MatchState::StartingInZoneCountdown.to_string(),
            "STARTING_INZONE_COUNTDOWN"
        );
        assert_eq!(MatchState::Ended.to_string(), "ENDED");
    }

    #[test]
    fn outcome_winner() {
        let w = ActorId::new();
        let l = ActorId::new();
        assert_eq!(Outcome::Win { winner: w, loser: l }.winner(), Some(w));
        assert!(Outcome::Draw(DrawReason::Timeout).is_draw());
    }
}
