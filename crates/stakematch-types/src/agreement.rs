//! Finalized two-party agreement handed to `start_match`.
//!
//! Negotiation happens elsewhere; by the time an [`Agreement`] exists both
//! sides have accepted it. The orchestrator only re-checks that the arena
//! and loadouts still exist and that each side can still cover its wager.

use serde::{Deserialize, Serialize};

use crate::{ActorId, ArenaId, LoadoutId, Sides, Wager};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agreement {
    pub participants: Sides<ActorId>,
    pub arena: ArenaId,
    pub loadouts: Sides<LoadoutId>,
    pub wagers: Sides<Wager>,
}

impl Agreement {
    /// Both sides offered nothing.
    #[must_use]
    pub fn is_no_wager(&self) -> bool {
        self.wagers.challenger.is_empty() && self.wagers.opponent.is_empty()
    }

    #[cfg(any(test, feature = "test-helpers"))]
    pub fn dummy(challenger: ActorId, opponent: ActorId) -> Self {
        Self {
            participants: Sides::new(challenger, opponent),
            arena: ArenaId::from("test_arena"),
            loadouts: Sides::new(LoadoutId::from("test_kit"), LoadoutId::from("test_kit")),
            wagers: Sides::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ItemStack;
    use rust_decimal::Decimal;

    #[test]
    fn no_wager_detection() {
        let mut agreement = Agreement::dummy(ActorId::new(), ActorId::new());
        assert!(agreement.is_no_wager());
        agreement.wagers.opponent = Wager::new(vec![ItemStack::new("gold_ingot", 3)], Decimal::ZERO);
        assert!(!agreement.is_no_wager());
    }
}
