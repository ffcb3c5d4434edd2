//! Loadout application with bounded verification.
//!
//! `apply` clears the actor's inventory and armor, then fills each slot
//! the loadout names. Some hosts drop slot writes made in the same tick as
//! a relocation, so the result is verified a few ticks later and applied
//! again, at most `loadout_max_attempts` times in total. A loadout that
//! never verifies is logged; the fight goes ahead.

use stakematch_lifecycle::{BoundedRetry, RetryStep};
use stakematch_types::{
    ActorId, Environment, Loadout, RetryTiming, StakematchError, Ticks, slot_satisfied,
};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct EquipmentApplier {
    timing: RetryTiming,
}

impl EquipmentApplier {
    #[must_use]
    pub fn new(timing: RetryTiming) -> Self {
        Self { timing }
    }

    /// Delay between the first apply and its check.
    #[must_use]
    pub fn first_verify_delay(&self) -> Ticks {
        self.timing.loadout_first_verify
    }

    pub fn apply<E: Environment>(&self, env: &mut E, actor: ActorId, loadout: &Loadout) {
        env.clear_equipment(actor);
        for (slot, item) in loadout.slots() {
            env.set_slot(actor, slot, item.clone());
        }
        debug!(actor = %actor, loadout = %loadout.id, slots = loadout.slot_count(), "loadout applied");
    }

    /// True if every slot the loadout names holds what it should.
    #[must_use]
    pub fn verify<E: Environment>(&self, env: &E, actor: ActorId, loadout: &Loadout) -> bool {
        loadout
            .slots()
            .all(|(slot, expected)| slot_satisfied(env.slot(actor, slot).as_ref(), expected))
    }

    /// Check the loadout after `attempt` applies. On `RetryAfter` the
    /// loadout has already been applied again.
    pub fn check<E: Environment>(
        &self,
        env: &mut E,
        actor: ActorId,
        loadout: &Loadout,
        attempt: u32,
    ) -> RetryStep {
        let mut retry = BoundedRetry::resumed(
            self.timing.loadout_max_attempts,
            self.timing.loadout_interval,
            attempt,
        );
        let step = retry.check(self.verify(env, actor, loadout));
        match step {
            RetryStep::Verified => {
                debug!(actor = %actor, loadout = %loadout.id, attempt, "loadout verified");
            }
            RetryStep::RetryAfter(_) => self.apply(env, actor, loadout),
            RetryStep::Exhausted { attempts } => {
                let err = StakematchError::EquipmentUnverified {
                    actor,
                    loadout: loadout.id.clone(),
                    attempts,
                };
                warn!(error = %err, "loadout unverified, match proceeds");
            }
        }
        step
    }
}
