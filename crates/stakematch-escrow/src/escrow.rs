//! Escrow: moves wagered stake between participants and match custody.
//!
//! - `validate` runs every check that does not mutate anything: minimum
//!   wager, economy availability, funds, items present, room for the
//!   opponent's stake.
//! - `reserve` re-runs those checks, since inventories can change between
//!   `start_match` and the zone becoming ready, then removes items and
//!   withdraws currency side by side. If any
//!   step fails, everything already taken is returned before the error is
//!   propagated, so a failed reservation leaves inventories untouched.
//! - `deliver` / `refund` hand stake back out. Items that do not fit are
//!   dropped at the recipient's feet; a rejected deposit is reported, not
//!   retried.

use rust_decimal::Decimal;
use stakematch_types::{
    ActorId, Agreement, Environment, HeldStakes, ItemStack, MatchRecord, Payout, PayoutKind,
    Result, Side, Sides, StakematchError, Wager, WagerPolicy,
};
use tracing::{error, info, warn};

/// What actually reached a recipient.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeliveryReport {
    pub recipient: Option<ActorId>,
    /// Stacks placed into the inventory.
    pub given: Vec<ItemStack>,
    /// Stacks that did not fit and were dropped on the ground.
    pub dropped: Vec<ItemStack>,
    pub deposited: Decimal,
    /// Currency the economy refused to take.
    pub undelivered: Decimal,
}

impl DeliveryReport {
    fn for_recipient(recipient: ActorId) -> Self {
        Self {
            recipient: Some(recipient),
            ..Self::default()
        }
    }

    /// Every item handed over, in inventory or on the ground.
    #[must_use]
    pub fn items(&self) -> Vec<ItemStack> {
        self.given.iter().chain(self.dropped.iter()).cloned().collect()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.undelivered.is_zero()
    }

    pub fn merge(&mut self, other: DeliveryReport) {
        self.given.extend(other.given);
        self.dropped.extend(other.dropped);
        self.deposited += other.deposited;
        self.undelivered += other.undelivered;
    }
}

/// Stake mover for all matches. Holds only policy; custody lives in
/// each [`MatchRecord`].
#[derive(Debug, Clone, Default)]
pub struct Escrow {
    policy: WagerPolicy,
}

impl Escrow {
    #[must_use]
    pub fn new(policy: WagerPolicy) -> Self {
        Self { policy }
    }

    #[must_use]
    pub fn policy(&self) -> &WagerPolicy {
        &self.policy
    }

    // =================================================================
    // Validation
    // =================================================================

    /// Check an agreement without touching any inventory.
    ///
    /// A no-wager agreement always passes.
    ///
    /// # Errors
    /// `BelowMinimumWager`, `EconomyUnavailable`, `MissingStakeItems`,
    /// `InsufficientFunds` or `InsufficientInventorySpace`.
    pub fn validate<E: Environment>(&self, env: &E, agreement: &Agreement) -> Result<()> {
        if agreement.is_no_wager() {
            return Ok(());
        }
        self.check_wagers(env, &agreement.participants, &agreement.wagers)
    }

    /// Minimums, economy, coverage and room for the opponent's stake.
    /// Touches nothing.
    fn check_wagers<E: Environment>(
        &self,
        env: &E,
        participants: &Sides<ActorId>,
        wagers: &Sides<Wager>,
    ) -> Result<()> {
        let items = wagers.challenger.item_count() + wagers.opponent.item_count();
        let currency = wagers.challenger.currency + wagers.opponent.currency;
        if items < self.policy.min_items && currency < self.policy.min_currency {
            return Err(StakematchError::BelowMinimumWager {
                items,
                min_items: self.policy.min_items,
                currency,
                min_currency: self.policy.min_currency,
            });
        }
        if currency > Decimal::ZERO && !env.economy_enabled() {
            return Err(StakematchError::EconomyUnavailable);
        }

        for (side, actor) in participants.iter() {
            Self::check_can_cover(env, *actor, wagers.get(side))?;
        }

        if self.policy.check_inventory_space {
            for (side, actor) in participants.iter() {
                let opponents_items = &wagers.get(side.other()).items;
                if !env.can_fit(*actor, opponents_items) {
                    return Err(StakematchError::InsufficientInventorySpace(*actor));
                }
            }
        }
        Ok(())
    }

    fn check_can_cover<E: Environment>(env: &E, actor: ActorId, wager: &Wager) -> Result<()> {
        if !wager.items.is_empty() && !env.has_items(actor, &wager.items) {
            return Err(StakematchError::MissingStakeItems(actor));
        }
        if wager.currency > Decimal::ZERO {
            let available = env.balance(actor);
            if available < wager.currency {
                return Err(StakematchError::InsufficientFunds {
                    actor,
                    needed: wager.currency,
                    available,
                });
            }
        }
        Ok(())
    }

    // =================================================================
    // Reservation
    // =================================================================

    /// Move both wagers into match custody.
    ///
    /// No-op for a no-wager match. On failure every removed item and
    /// withdrawn coin is returned and custody stays `Pending`.
    pub fn reserve<E: Environment>(&self, env: &mut E, record: &mut MatchRecord) -> Result<()> {
        if record.no_wager_mode() {
            return Ok(());
        }
        let participants = record.participants.clone();
        let wagers = record.wagers().clone();
        // Inventories may have changed while the zone loaded.
        if let Err(e) = self.check_wagers(env, &participants, &wagers) {
            warn!(match_id = %record.id, error = %e, "stake re-check failed before reservation");
            return Err(e);
        }

        let mut taken: Vec<(ActorId, Wager)> = Vec::with_capacity(2);
        for side in Side::BOTH {
            let actor = *participants.get(side);
            let wager = wagers.get(side);
            if let Err(e) = Self::take(env, actor, wager) {
                warn!(match_id = %record.id, participant = %actor, error = %e, "stake reservation failed, rolling back");
                for (owner, wager) in taken {
                    self.return_to(env, owner, wager);
                }
                return Err(e);
            }
            taken.push((actor, wager.clone()));
        }

        record.hold_stakes()?;
        info!(
            match_id = %record.id,
            challenger_items = wagers.challenger.item_count(),
            challenger_currency = %wagers.challenger.currency,
            opponent_items = wagers.opponent.item_count(),
            opponent_currency = %wagers.opponent.currency,
            "stakes reserved"
        );
        Ok(())
    }

    /// Remove one side's wager. Either both parts are taken or neither.
    fn take<E: Environment>(env: &mut E, actor: ActorId, wager: &Wager) -> Result<()> {
        Self::check_can_cover(env, actor, wager)?;
        if !wager.items.is_empty() {
            env.remove_items(actor, &wager.items)?;
        }
        if wager.currency > Decimal::ZERO {
            if let Err(e) = env.withdraw(actor, wager.currency) {
                let leftovers = env.give_items(actor, wager.items.clone());
                if !leftovers.is_empty() {
                    env.drop_items(actor, leftovers);
                }
                return Err(e);
            }
        }
        Ok(())
    }

    // =================================================================
    // Delivery
    // =================================================================

    /// Hand a payout to its recipient.
    pub fn deliver<E: Environment>(&self, env: &mut E, payout: Payout) -> DeliveryReport {
        let recipient = payout.recipient;
        let report = self.return_to(env, recipient, payout.wager);
        match payout.kind {
            PayoutKind::Winnings => info!(
                recipient = %recipient,
                items = report.given.len() + report.dropped.len(),
                currency = %report.deposited,
                "winnings delivered"
            ),
            PayoutKind::Refund => info!(
                recipient = %recipient,
                items = report.given.len() + report.dropped.len(),
                currency = %report.deposited,
                "stake refunded"
            ),
        }
        report
    }

    /// Return each owner's own stake (abort path).
    pub fn refund<E: Environment>(&self, env: &mut E, held: HeldStakes) -> DeliveryReport {
        let mut total = DeliveryReport::default();
        for stake in [held.challenger, held.opponent] {
            let report = self.deliver(
                env,
                Payout {
                    recipient: stake.owner,
                    wager: stake.wager,
                    kind: PayoutKind::Refund,
                },
            );
            total.merge(report);
        }
        total
    }

    fn return_to<E: Environment>(&self, env: &mut E, actor: ActorId, wager: Wager) -> DeliveryReport {
        let mut report = DeliveryReport::for_recipient(actor);

        if !wager.items.is_empty() {
            let offered = wager.items.clone();
            let leftovers = env.give_items(actor, wager.items);
            if !leftovers.is_empty() {
                warn!(recipient = %actor, stacks = leftovers.len(), "inventory full, dropping stake items at feet");
                env.drop_items(actor, leftovers.clone());
            }
            report.given = subtract(&offered, &leftovers);
            report.dropped = leftovers;
        }

        if wager.currency > Decimal::ZERO {
            match env.deposit(actor, wager.currency) {
                Ok(()) => report.deposited = wager.currency,
                Err(e) => {
                    error!(recipient = %actor, amount = %wager.currency, error = %e, "currency deposit failed");
                    report.undelivered = wager.currency;
                }
            }
        }
        report
    }
}

/// `offered` minus one occurrence of each stack in `leftovers`.
fn subtract(offered: &[ItemStack], leftovers: &[ItemStack]) -> Vec<ItemStack> {
    let mut remaining = leftovers.to_vec();
    offered
        .iter()
        .filter(|item| {
            if let Some(pos) = remaining.iter().position(|l| l == *item) {
                remaining.swap_remove(pos);
                false
            } else {
                true
            }
        })
        .cloned()
        .collect()
}
