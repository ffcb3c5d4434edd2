//! Exactly-once finality for matches.
//!
//! A match reaches finality once, either decided (win or draw) or
//! cancelled before the fight. The registry record's terminal phase covers
//! the live match; [`SettlementGuard`] outlives the record, so an
//! `end_match` arriving after cleanup is still answered correctly.
//!
//! Only the most recent [`SETTLEMENT_IDEMPOTENCY_CACHE_SIZE`] finalized
//! matches are remembered.

use std::collections::{HashMap, VecDeque};

use stakematch_types::constants::SETTLEMENT_IDEMPOTENCY_CACHE_SIZE;
use stakematch_types::{AbortReason, MatchId, Outcome, Result, StakematchError};

/// How a match was finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finality {
    Decided(Outcome),
    Cancelled(AbortReason),
}

pub struct SettlementGuard {
    finalized: HashMap<MatchId, Finality>,
    /// Oldest first; trimmed past `capacity`.
    history: VecDeque<MatchId>,
    capacity: usize,
}

impl SettlementGuard {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            finalized: HashMap::with_capacity(capacity),
            history: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record finality for `id`.
    ///
    /// # Errors
    /// [`StakematchError::AlreadySettled`] if `id` was already finalized;
    /// the first finality is kept.
    pub fn finalize(&mut self, id: MatchId, finality: Finality) -> Result<()> {
        if self.finalized.contains_key(&id) {
            return Err(StakematchError::AlreadySettled(id));
        }
        while self.history.len() >= self.capacity {
            let Some(retired) = self.history.pop_front() else {
                break;
            };
            self.finalized.remove(&retired);
        }
        self.finalized.insert(id, finality);
        self.history.push_back(id);
        Ok(())
    }

    #[must_use]
    pub fn is_settled(&self, id: &MatchId) -> bool {
        self.finalized.contains_key(id)
    }

    #[must_use]
    pub fn finality(&self, id: &MatchId) -> Option<Finality> {
        self.finalized.get(id).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.finalized.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.finalized.is_empty()
    }
}

impl Default for SettlementGuard {
    fn default() -> Self {
        Self::with_capacity(SETTLEMENT_IDEMPOTENCY_CACHE_SIZE)
    }
}
