//! Structured announcements sent to actors.
//!
//! The orchestrator never formats text. Each [`Notice`] is handed to the
//! environment, which localizes and renders it however the host prefers.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AbortReason, ActorId, ArenaId, DrawReason, MatchId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Notice {
    // --- Start-up ---
    /// The arena zone is being prepared.
    PreparingArena { arena: ArenaId },
    /// Both sides offered nothing; the match is for honor only.
    NoWagerMode,
    /// Seconds left before the move into the arena.
    TeleportCountdown { seconds: u32 },
    /// Invitation sent to everyone else on the server.
    SpectateInvite {
        match_id: MatchId,
        challenger: ActorId,
        opponent: ActorId,
        arena: ArenaId,
    },
    /// Seconds left before combat starts.
    FightCountdown { seconds: u32 },
    Fight,
    /// The loadout could not be confirmed; the fight goes ahead anyway.
    LoadoutUnverified,

    // --- Fight ---
    TimeRemaining { seconds: u32 },
    TimeUp,
    DrawProposed { by: ActorId },
    DrawProposalSent,
    DrawProposalWithdrawn,
    DrawDenied { by: ActorId },
    DrawExpired,

    // --- Result ---
    Victory { opponent: ActorId },
    Defeat { opponent: ActorId },
    Draw(DrawReason),
    /// Winnings or a refund reached the actor.
    StakeDelivered { items: usize, currency: Decimal },
    /// The inventory was full; this many stacks were dropped at the actor's feet.
    ItemsDropped { stacks: usize },

    // --- Failures ---
    /// The match was cancelled before the fight.
    Failure(AbortReason),
    /// The orchestrator is stopping; the match was cancelled as a draw.
    ShutdownCancelled,
}
