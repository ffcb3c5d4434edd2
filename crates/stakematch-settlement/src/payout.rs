//! Payout planning: who receives which part of the held stake.
//!
//! - Win: the combined stake goes to the winner; the loser gets nothing.
//! - Draw (agreed, timeout, double elimination, shutdown): every owner gets
//!   their own stake back.
//!
//! Empty wagers produce no payout.

use stakematch_types::{HeldStakes, Outcome, Payout, PayoutKind, Result, StakematchError};

/// Plan the payouts that settle `held` under `outcome`.
///
/// # Errors
/// `SettlementFailed` if the winner does not own either stake.
pub fn plan_payouts(held: &HeldStakes, outcome: &Outcome) -> Result<Vec<Payout>> {
    match outcome {
        Outcome::Win { winner, .. } => {
            if held.challenger.owner != *winner && held.opponent.owner != *winner {
                return Err(StakematchError::SettlementFailed {
                    reason: format!("winner {winner} owns neither stake"),
                });
            }
            let combined = held.challenger.wager.combined(&held.opponent.wager);
            if combined.is_empty() {
                return Ok(Vec::new());
            }
            Ok(vec![Payout {
                recipient: *winner,
                wager: combined,
                kind: PayoutKind::Winnings,
            }])
        }
        Outcome::Draw(_) => Ok([&held.challenger, &held.opponent]
            .into_iter()
            .filter(|stake| !stake.wager.is_empty())
            .map(|stake| Payout {
                recipient: stake.owner,
                wager: stake.wager.clone(),
                kind: PayoutKind::Refund,
            })
            .collect()),
    }
}
