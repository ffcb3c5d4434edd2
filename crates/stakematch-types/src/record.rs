//! The authoritative state of one active match.
//!
//! A [`MatchRecord`] is created by `start_match`, owned by the registry and
//! mutated only by the lifecycle driver (phase) and the settlement path
//! (outcome, custody). Wagers and original locations are captured at
//! construction and have no setters.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    ActorId, Agreement, ArenaId, HeldStakes, LoadoutId, Location, MatchId, Outcome, Payout, Phase,
    Result, Side, Sides, Stake, StakeCustody, StakematchError, Tick, Wager, ZoneId, ZoneInfo,
};

/// An open mutual-draw proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawVote {
    pub initiator: ActorId,
    pub expires_at: Tick,
}

/// A non-participant attached to a match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spectator {
    /// Where the spectator stood when they attached.
    pub origin: Location,
    /// Set once the spectate flow has moved them into the arena zone.
    pub relocated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: MatchId,
    pub participants: Sides<ActorId>,
    pub arena: ArenaId,
    pub zone: ZoneId,
    pub loadouts: Sides<LoadoutId>,
    pub phase: Phase,
    pub created_at: DateTime<Utc>,
    /// Filled in when the zone provisioner reports ready.
    pub zone_info: Option<ZoneInfo>,
    pub outcome: Option<Outcome>,
    pub draw_vote: Option<DrawVote>,
    /// Participants reported eliminated during the fight.
    pub eliminated: BTreeSet<ActorId>,
    pub spectators: BTreeMap<ActorId, Spectator>,
    wagers: Sides<Wager>,
    origins: Sides<Location>,
    custody: StakeCustody,
}

impl MatchRecord {
    #[must_use]
    pub fn new(
        id: MatchId,
        agreement: &Agreement,
        zone: ZoneId,
        origins: Sides<Location>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let custody = if agreement.is_no_wager() {
            StakeCustody::NoWager
        } else {
            StakeCustody::Pending
        };
        Self {
            id,
            participants: agreement.participants.clone(),
            arena: agreement.arena.clone(),
            zone,
            loadouts: agreement.loadouts.clone(),
            phase: Phase::LoadingZone,
            created_at,
            zone_info: None,
            outcome: None,
            draw_vote: None,
            eliminated: BTreeSet::new(),
            spectators: BTreeMap::new(),
            wagers: agreement.wagers.clone(),
            origins,
            custody,
        }
    }

    // =================================================================
    // Participants
    // =================================================================

    #[must_use]
    pub fn side_of(&self, actor: ActorId) -> Option<Side> {
        self.participants.side_of(&actor)
    }

    #[must_use]
    pub fn is_participant(&self, actor: ActorId) -> bool {
        self.participants.contains(&actor)
    }

    #[must_use]
    pub fn opponent_of(&self, actor: ActorId) -> Option<ActorId> {
        self.side_of(actor)
            .map(|side| *self.participants.get(side.other()))
    }

    /// Participants followed by spectators.
    #[must_use]
    pub fn members(&self) -> Vec<ActorId> {
        let mut all = vec![self.participants.challenger, self.participants.opponent];
        all.extend(self.spectators.keys().copied());
        all
    }

    #[must_use]
    pub fn wagers(&self) -> &Sides<Wager> {
        &self.wagers
    }

    #[must_use]
    pub fn origins(&self) -> &Sides<Location> {
        &self.origins
    }

    /// Where `actor` stood before the match touched them.
    #[must_use]
    pub fn origin_of(&self, actor: ActorId) -> Option<&Location> {
        match self.side_of(actor) {
            Some(side) => Some(self.origins.get(side)),
            None => self.spectators.get(&actor).map(|s| &s.origin),
        }
    }

    #[must_use]
    pub fn no_wager_mode(&self) -> bool {
        matches!(self.custody, StakeCustody::NoWager)
    }

    // =================================================================
    // Stake custody
    // =================================================================

    #[must_use]
    pub fn custody(&self) -> &StakeCustody {
        &self.custody
    }

    /// Record that both wagers have been removed from their owners.
    pub fn hold_stakes(&mut self) -> Result<&HeldStakes> {
        if !matches!(self.custody, StakeCustody::Pending) {
            return Err(StakematchError::CustodyViolation {
                reason: format!("{}: hold requested while {:?}", self.id, self.custody),
            });
        }
        let held = self
            .participants
            .clone()
            .map(|side, owner| Stake {
                owner,
                wager: self.wagers.get(side).clone(),
            });
        self.custody = StakeCustody::Held(held);
        match &self.custody {
            StakeCustody::Held(held) => Ok(held),
            _ => Err(StakematchError::Internal("custody changed during hold".into())),
        }
    }

    #[must_use]
    pub fn held(&self) -> Option<&HeldStakes> {
        match &self.custody {
            StakeCustody::Held(held) => Some(held),
            _ => None,
        }
    }

    /// Move held stakes out of the match (abort path). Leaves `Disbursed`.
    pub fn take_held(&mut self) -> Option<HeldStakes> {
        if !matches!(self.custody, StakeCustody::Held(_)) {
            return None;
        }
        match std::mem::replace(&mut self.custody, StakeCustody::Disbursed) {
            StakeCustody::Held(held) => Some(held),
            _ => None,
        }
    }

    /// Replace held stakes with the payouts that settle them.
    pub fn stage_payouts(&mut self, payouts: Vec<Payout>) -> Result<()> {
        if !matches!(self.custody, StakeCustody::Held(_)) {
            return Err(StakematchError::CustodyViolation {
                reason: format!("{}: payouts staged while {:?}", self.id, self.custody),
            });
        }
        self.custody = if payouts.is_empty() {
            StakeCustody::Disbursed
        } else {
            StakeCustody::Payable(payouts)
        };
        Ok(())
    }

    /// Take the payout addressed to `recipient`, if one is still pending.
    pub fn take_payout(&mut self, recipient: ActorId) -> Option<Payout> {
        let StakeCustody::Payable(payouts) = &mut self.custody else {
            return None;
        };
        let index = payouts.iter().position(|p| p.recipient == recipient)?;
        let payout = payouts.remove(index);
        if payouts.is_empty() {
            self.custody = StakeCustody::Disbursed;
        }
        Some(payout)
    }

    /// Take every pending payout.
    pub fn drain_payouts(&mut self) -> Vec<Payout> {
        if !matches!(self.custody, StakeCustody::Payable(_)) {
            return Vec::new();
        }
        match std::mem::replace(&mut self.custody, StakeCustody::Disbursed) {
            StakeCustody::Payable(payouts) => payouts,
            _ => Vec::new(),
        }
    }

    #[must_use]
    pub fn payout_recipients(&self) -> Vec<ActorId> {
        match &self.custody {
            StakeCustody::Payable(payouts) => payouts.iter().map(|p| p.recipient).collect(),
            _ => Vec::new(),
        }
    }

    /// Abandon a reservation that never completed. Only valid while `Pending`.
    pub fn release_pending(&mut self) {
        if matches!(self.custody, StakeCustody::Pending) {
            self.custody = StakeCustody::Disbursed;
        }
    }

    #[cfg(any(test, feature = "test-helpers"))]
    pub fn dummy(agreement: &Agreement) -> Self {
        let origins = agreement
            .participants
            .clone()
            .map(|_, _| Location::new("world", 0.0, 64.0, 0.0));
        Self::new(
            MatchId::new(),
            agreement,
            ZoneId::from("test_arena"),
            origins,
            Utc::now(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ItemStack, PayoutKind};
    use rust_decimal::Decimal;

    fn staked_agreement() -> Agreement {
        let mut agreement = Agreement::dummy(ActorId::new(), ActorId::new());
        agreement.wagers = Sides::new(
            Wager::new(vec![ItemStack::new("netherite_sword", 1)], Decimal::new(100, 0)),
            Wager::new(vec![], Decimal::new(50, 0)),
        );
        agreement
    }

    #[test]
    fn no_wager_record_never_holds() {
        let agreement = Agreement::dummy(ActorId::new(), ActorId::new());
        let mut record = MatchRecord::dummy(&agreement);
        assert!(record.no_wager_mode());
        assert!(record.hold_stakes().is_err());
        assert!(record.take_held().is_none());
    }

    #[test]
    fn custody_moves_forward_only() {
        let agreement = staked_agreement();
        let mut record = MatchRecord::dummy(&agreement);
        assert_eq!(record.custody(), &StakeCustody::Pending);

        let held = record.hold_stakes().unwrap().clone();
        assert_eq!(held.challenger.owner, agreement.participants.challenger);
        assert!(record.hold_stakes().is_err());

        let winner = agreement.participants.opponent;
        record
            .stage_payouts(vec![Payout {
                recipient: winner,
                wager: held.challenger.wager.combined(&held.opponent.wager),
                kind: PayoutKind::Winnings,
            }])
            .unwrap();
        assert!(record.take_held().is_none());
        assert_eq!(record.payout_recipients(), vec![winner]);

        assert!(record.take_payout(agreement.participants.challenger).is_none());
        let payout = record.take_payout(winner).unwrap();
        assert_eq!(payout.wager.currency, Decimal::new(150, 0));
        assert_eq!(record.custody(), &StakeCustody::Disbursed);
    }

    #[test]
    fn take_held_leaves_disbursed() {
        let mut record = MatchRecord::dummy(&staked_agreement());
        record.hold_stakes().unwrap();
        let held = record.take_held().unwrap();
        assert_eq!(held.opponent.wager.currency, Decimal::new(50, 0));
        assert_eq!(record.custody(), &StakeCustody::Disbursed);
        assert!(record.stage_payouts(vec![]).is_err());
    }

    #[test]
    fn opponent_and_origin_lookup() {
        let agreement = staked_agreement();
        let mut record = MatchRecord::dummy(&agreement);
        let (a, b) = (agreement.participants.challenger, agreement.participants.opponent);
        assert_eq!(record.opponent_of(a), Some(b));
        assert_eq!(record.opponent_of(ActorId::new()), None);

        let spectator = ActorId::new();
        record.spectators.insert(
            spectator,
            Spectator {
                origin: Location::new("lobby", 1.0, 70.0, 1.0),
                relocated: false,
            },
        );
        assert_eq!(record.origin_of(spectator).unwrap().zone.as_str(), "lobby");
        assert_eq!(record.members().len(), 3);
    }
}
