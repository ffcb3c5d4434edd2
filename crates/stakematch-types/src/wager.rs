//! Wagers, escrowed stakes and payouts.
//!
//! ```text
//!   Agreement ──► Wager (per side, immutable)
//!                   │ reserve (items removed, currency withdrawn)
//!                   ▼
//!   StakeCustody:  Pending ──► Held(Sides<Stake>) ──► Payable(Vec<Payout>) ──► Disbursed
//!                     │              │ abort: refund all
//!                     └──────────────┴──────────────────────────────────────► Disbursed
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{ActorId, ItemStack, Sides};

/// What one side puts on the line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wager {
    #[serde(default)]
    pub items: Vec<ItemStack>,
    #[serde(default)]
    pub currency: Decimal,
}

impl Wager {
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn new(items: Vec<ItemStack>, currency: Decimal) -> Self {
        Self { items, currency }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.currency.is_zero()
    }

    /// Number of stacks offered.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Combine two wagers into one (items concatenated, currency summed).
    #[must_use]
    pub fn combined(&self, other: &Wager) -> Wager {
        let mut items = self.items.clone();
        items.extend(other.items.iter().cloned());
        Wager {
            items,
            currency: self.currency + other.currency,
        }
    }
}

/// A wager that has been removed from its owner and is held by a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stake {
    pub owner: ActorId,
    pub wager: Wager,
}

/// Both stakes, held by the match between reservation and settlement.
pub type HeldStakes = Sides<Stake>;

/// Why a payout is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayoutKind {
    /// Combined stake delivered to the winner.
    Winnings,
    /// An owner's own stake returned.
    Refund,
}

/// A pending delivery to one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub recipient: ActorId,
    pub wager: Wager,
    pub kind: PayoutKind,
}

/// Where a match's stake currently is.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StakeCustody {
    /// Both sides offered nothing; escrow never runs.
    NoWager,
    /// Wagers agreed but not yet removed from the participants.
    #[default]
    Pending,
    /// Removed from participants and owned by the match.
    Held(HeldStakes),
    /// Settled; waiting for delivery to the listed recipients.
    Payable(Vec<Payout>),
    /// Everything delivered (or nothing was ever taken).
    Disbursed,
}

impl StakeCustody {
    /// True while the match owns stake that has not reached a recipient.
    #[must_use]
    pub fn owns_stake(&self) -> bool {
        matches!(self, Self::Held(_) | Self::Payable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_wager() {
        assert!(Wager::none().is_empty());
        assert!(!Wager::new(vec![], Decimal::new(1, 0)).is_empty());
        assert!(!Wager::new(vec![ItemStack::new("stone", 1)], Decimal::ZERO).is_empty());
    }

    #[test]
    fn combined_sums_both_sides() {
        let a = Wager::new(vec![ItemStack::new("sword", 1)], Decimal::new(100, 0));
        let b = Wager::new(vec![], Decimal::new(50, 0));
        let c = a.combined(&b);
        assert_eq!(c.items.len(), 1);
        assert_eq!(c.currency, Decimal::new(150, 0));
    }

    #[test]
    fn custody_ownership() {
        assert!(!StakeCustody::Pending.owns_stake());
        assert!(StakeCustody::Payable(vec![]).owns_stake());
        assert!(!StakeCustody::Disbursed.owns_stake());
    }
}
