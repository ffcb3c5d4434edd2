//! Error types for the StakeMatch duel engine.
//!
//! All errors use the `SM_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Match / registry errors
//! - 2xx: Escrow errors (funds, inventory, custody)
//! - 3xx: Zone provisioning errors
//! - 4xx: Relocation errors
//! - 5xx: Equipment errors
//! - 6xx: Settlement errors
//! - 9xx: General / internal errors

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{ActorId, ArenaId, LoadoutId, MatchId, MatchState, ZoneId};

/// Central error enum for all StakeMatch operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StakematchError {
    // =================================================================
    // Match / Registry Errors (1xx)
    // =================================================================
    /// No active match with this id.
    #[error("SM_ERR_100: Match not found: {0}")]
    MatchNotFound(MatchId),

    /// The actor is already committed to an active match.
    #[error("SM_ERR_101: Actor {actor} is already in {existing}")]
    AlreadyInMatch { actor: ActorId, existing: MatchId },

    /// Both sides of an agreement name the same actor.
    #[error("SM_ERR_102: An actor cannot duel themselves: {0}")]
    SelfMatch(ActorId),

    /// The agreement references an arena that is not in the catalog.
    #[error("SM_ERR_103: Unknown arena: {0}")]
    UnknownArena(ArenaId),

    /// The agreement references a loadout that is not in the catalog.
    #[error("SM_ERR_104: Unknown loadout: {0}")]
    UnknownLoadout(LoadoutId),

    /// The actor does not take part in this match.
    #[error("SM_ERR_105: Actor {actor} is not a participant of {match_id}")]
    NotParticipant { actor: ActorId, match_id: MatchId },

    /// The operation is not valid in the match's current state.
    #[error("SM_ERR_106: Wrong match state: expected {expected}, got {actual}")]
    WrongState {
        expected: MatchState,
        actual: MatchState,
    },

    /// A draw-vote operation was rejected.
    #[error("SM_ERR_107: Draw vote rejected: {reason}")]
    DrawVote { reason: String },

    /// The host platform cannot resolve the actor (disconnected, unknown).
    #[error("SM_ERR_108: Actor unavailable: {0}")]
    ActorUnavailable(ActorId),

    // =================================================================
    // Escrow Errors (2xx)
    // =================================================================
    /// The combined wager is below the configured minimum.
    #[error("SM_ERR_200: Wager below minimum: {items} items (min {min_items}), currency {currency} (min {min_currency})")]
    BelowMinimumWager {
        items: usize,
        min_items: usize,
        currency: Decimal,
        min_currency: Decimal,
    },

    /// The actor cannot cover the currency side of the wager.
    #[error("SM_ERR_201: Insufficient funds for {actor}: need {needed}, have {available}")]
    InsufficientFunds {
        actor: ActorId,
        needed: Decimal,
        available: Decimal,
    },

    /// The actor cannot hold the opponent's stake if they win.
    #[error("SM_ERR_202: Insufficient inventory space for {0}")]
    InsufficientInventorySpace(ActorId),

    /// The actor no longer holds the items they offered.
    #[error("SM_ERR_203: Staked items missing from inventory of {0}")]
    MissingStakeItems(ActorId),

    /// The economy rejected a withdrawal.
    #[error("SM_ERR_204: Withdrawal failed for {actor}: {reason}")]
    Withdrawal { actor: ActorId, reason: String },

    /// The economy rejected a deposit.
    #[error("SM_ERR_205: Deposit failed for {actor}: {reason}")]
    Deposit { actor: ActorId, reason: String },

    /// Items could not be removed from the actor's inventory.
    #[error("SM_ERR_206: Item removal failed for {0}")]
    ItemRemoval(ActorId),

    /// Stake custody is not in the state the operation needs.
    #[error("SM_ERR_207: Stake custody violation: {reason}")]
    CustodyViolation { reason: String },

    /// A currency stake was offered but no economy is available.
    #[error("SM_ERR_208: Economy unavailable for currency stake")]
    EconomyUnavailable,

    // =================================================================
    // Zone Errors (3xx)
    // =================================================================
    /// The zone could not be loaded, cloned or regenerated.
    #[error("SM_ERR_300: Zone unavailable: {zone}: {reason}")]
    ZoneUnavailable { zone: ZoneId, reason: String },

    // =================================================================
    // Relocation Errors (4xx)
    // =================================================================
    /// The environment refused to relocate the actor.
    #[error("SM_ERR_400: Relocation failed for {actor}: {reason}")]
    RelocationFailed { actor: ActorId, reason: String },

    /// The actor is not in the zone they were sent to.
    #[error("SM_ERR_401: Actor {actor} not in zone {expected}")]
    NotInZone { actor: ActorId, expected: ZoneId },

    // =================================================================
    // Equipment Errors (5xx)
    // =================================================================
    /// Loadout could not be verified after every attempt.
    #[error("SM_ERR_500: Loadout {loadout} unverified for {actor} after {attempts} attempts")]
    EquipmentUnverified {
        actor: ActorId,
        loadout: LoadoutId,
        attempts: u32,
    },

    // =================================================================
    // Settlement Errors (6xx)
    // =================================================================
    /// The match has already been settled (idempotency guard).
    #[error("SM_ERR_600: Match already settled: {0}")]
    AlreadySettled(MatchId),

    /// Stake conservation invariant violated. Critical.
    #[error("SM_ERR_601: Stake conservation violated for {match_id}: {reason}")]
    StakeConservation { match_id: MatchId, reason: String },

    /// Settlement could not complete.
    #[error("SM_ERR_602: Settlement failed: {reason}")]
    SettlementFailed { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("SM_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("SM_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid catalog, missing fields, etc.).
    #[error("SM_ERR_902: Configuration error: {0}")]
    Configuration(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, StakematchError>;

impl From<serde_json::Error> for StakematchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
