//! Stake conservation ledger.
//!
//! Invariant checked when a match is cleaned up:
//! ```text
//! ∀ item kind: Σ reserved == Σ released (given + dropped)
//! currency:    Σ reserved == Σ deposited + Σ undelivered
//! ```
//!
//! Undelivered currency (a deposit the economy refused) still balances
//! the ledger but is reported at `error` level, since a person is owed it.

use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use stakematch_types::{ItemStack, MatchId, Result, Sides, StakematchError, Wager, tally};
use tracing::error;

/// Item counts per ledger key plus a currency amount.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeTotals {
    pub items: BTreeMap<String, u64>,
    pub currency: Decimal,
}

impl StakeTotals {
    #[must_use]
    pub fn of_wager(wager: &Wager) -> Self {
        Self {
            items: tally(&wager.items),
            currency: wager.currency,
        }
    }

    pub fn add_items(&mut self, items: &[ItemStack]) {
        for (key, n) in tally(items) {
            *self.items.entry(key).or_insert(0) += n;
        }
    }

    pub fn add(&mut self, other: &StakeTotals) {
        for (key, n) in &other.items {
            *self.items.entry(key.clone()).or_insert(0) += n;
        }
        self.currency += other.currency;
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.values().all(|n| *n == 0) && self.currency.is_zero()
    }
}

#[derive(Debug, Default)]
struct LedgerEntry {
    reserved: StakeTotals,
    /// Items handed out plus currency actually deposited.
    released: StakeTotals,
    undelivered: Decimal,
}

/// Per-match reservation and release accounting.
#[derive(Debug, Default)]
pub struct StakeLedger {
    entries: HashMap<MatchId, LedgerEntry>,
}

impl StakeLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record both wagers as taken into custody.
    pub fn record_reserved(&mut self, id: MatchId, wagers: &Sides<Wager>) {
        let entry = self.entries.entry(id).or_default();
        for (_, wager) in wagers.iter() {
            entry.reserved.add(&StakeTotals::of_wager(wager));
        }
    }

    /// Record stake leaving custody.
    pub fn record_released(
        &mut self,
        id: MatchId,
        items: &[ItemStack],
        deposited: Decimal,
        undelivered: Decimal,
    ) {
        let entry = self.entries.entry(id).or_default();
        entry.released.add_items(items);
        entry.released.currency += deposited;
        entry.undelivered += undelivered;
        if !undelivered.is_zero() {
            error!(match_id = %id, amount = %undelivered, "stake currency undelivered");
        }
    }

    #[must_use]
    pub fn is_tracked(&self, id: MatchId) -> bool {
        self.entries.contains_key(&id)
    }

    #[must_use]
    pub fn reserved(&self, id: MatchId) -> StakeTotals {
        self.entries
            .get(&id)
            .map(|e| e.reserved.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn undelivered(&self, id: MatchId) -> Decimal {
        self.entries.get(&id).map_or(Decimal::ZERO, |e| e.undelivered)
    }

    /// Check that everything reserved for `id` has been released.
    ///
    /// # Errors
    /// [`StakematchError::StakeConservation`] on any mismatch.
    pub fn verify(&self, id: MatchId) -> Result<()> {
        let Some(entry) = self.entries.get(&id) else {
            return Ok(());
        };
        let mut kinds: Vec<&String> = entry.reserved.items.keys().collect();
        kinds.extend(entry.released.items.keys());
        kinds.sort();
        kinds.dedup();
        for kind in kinds {
            let reserved = entry.reserved.items.get(kind).copied().unwrap_or(0);
            let released = entry.released.items.get(kind).copied().unwrap_or(0);
            if reserved != released {
                return Err(StakematchError::StakeConservation {
                    match_id: id,
                    reason: format!("{kind}: reserved {reserved} != released {released}"),
                });
            }
        }
        let accounted = entry.released.currency + entry.undelivered;
        if entry.reserved.currency != accounted {
            return Err(StakematchError::StakeConservation {
                match_id: id,
                reason: format!(
                    "currency: reserved {} != deposited {} + undelivered {}",
                    entry.reserved.currency, entry.released.currency, entry.undelivered
                ),
            });
        }
        Ok(())
    }

    /// Verify and forget `id`. The entry is dropped even when the check fails.
    pub fn close(&mut self, id: MatchId) -> Result<()> {
        let result = self.verify(id);
        self.entries.remove(&id);
        result
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
