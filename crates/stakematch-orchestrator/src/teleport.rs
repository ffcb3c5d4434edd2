//! Relocation of participants into and out of the arena zone.
//!
//! Per participant and match:
//! ```text
//!   NotMoved ──move_in──► Moved ──verify ok──► Verified
//!                           │ verify fail
//!                           ▼
//!                         Failed ──emergency_move_in──► Moved
//! ```
//!
//! Failures before the fight are fatal for the match
//! ([`RelocationPolicy::AbortOnFailure`]). Failures on the way home are
//! logged and left to the host ([`RelocationPolicy::LogOnFailure`]).

use std::collections::HashMap;

use stakematch_lifecycle::{BoundedRetry, RetryStep};
use stakematch_types::{
    ActorId, Environment, Location, MatchId, RelocationSettings, Result, RetryTiming, Sides,
    StakematchError, ZoneId,
};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeleportMarker {
    NotMoved,
    Moved,
    Verified,
    Failed,
}

/// What a relocation failure means for the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelocationPolicy {
    /// Propagate the error; the caller aborts the match.
    AbortOnFailure,
    /// Log and carry on.
    LogOnFailure,
}

/// Result of sending someone home.
#[derive(Debug, Clone, PartialEq)]
pub enum ReturnOutcome {
    /// Relocated to this location; verify it later.
    Relocated(Location),
    /// Incapacitated: the host's recovery flow should use this location.
    Deferred(Location),
    /// Offline or refused by the environment.
    Unavailable,
}

#[derive(Debug)]
pub struct TeleportCoordinator {
    settings: RelocationSettings,
    retry: RetryTiming,
    markers: HashMap<MatchId, HashMap<ActorId, TeleportMarker>>,
}

impl TeleportCoordinator {
    #[must_use]
    pub fn new(settings: RelocationSettings, retry: RetryTiming) -> Self {
        Self {
            settings,
            retry,
            markers: HashMap::new(),
        }
    }

    #[must_use]
    pub fn marker(&self, match_id: MatchId, actor: ActorId) -> TeleportMarker {
        self.markers
            .get(&match_id)
            .and_then(|m| m.get(&actor))
            .copied()
            .unwrap_or(TeleportMarker::NotMoved)
    }

    /// True once `actor` has been sent into the zone of `match_id`.
    #[must_use]
    pub fn was_moved(&self, match_id: MatchId, actor: ActorId) -> bool {
        self.marker(match_id, actor) != TeleportMarker::NotMoved
    }

    pub fn forget(&mut self, match_id: MatchId) {
        self.markers.remove(&match_id);
    }

    fn mark(&mut self, match_id: MatchId, actor: ActorId, marker: TeleportMarker) {
        self.markers
            .entry(match_id)
            .or_default()
            .insert(actor, marker);
    }

    /// Relocate one actor, applying `policy` on failure. Returns whether
    /// the environment accepted the move.
    pub fn relocate<E: Environment>(
        &self,
        env: &mut E,
        actor: ActorId,
        to: &Location,
        policy: RelocationPolicy,
    ) -> Result<bool> {
        match env.relocate(actor, to) {
            Ok(()) => Ok(true),
            Err(e) => match policy {
                RelocationPolicy::AbortOnFailure => Err(e),
                RelocationPolicy::LogOnFailure => {
                    warn!(actor = %actor, zone = %to.zone, error = %e, "relocation failed");
                    Ok(false)
                }
            },
        }
    }

    // =================================================================
    // Into the arena
    // =================================================================

    /// Move both participants to their spawns.
    pub fn move_in<E: Environment>(
        &mut self,
        env: &mut E,
        match_id: MatchId,
        participants: &Sides<ActorId>,
        spawns: &Sides<Location>,
    ) -> Result<()> {
        for (side, actor) in participants.iter() {
            if let Err(e) = self.relocate(env, *actor, spawns.get(side), RelocationPolicy::AbortOnFailure) {
                self.mark(match_id, *actor, TeleportMarker::Failed);
                return Err(e);
            }
            self.mark(match_id, *actor, TeleportMarker::Moved);
        }
        info!(match_id = %match_id, "participants teleported into arena");
        Ok(())
    }

    /// Mark each participant verified or failed. True if both are in `zone`.
    pub fn verify_arrival<E: Environment>(
        &mut self,
        env: &E,
        match_id: MatchId,
        participants: &Sides<ActorId>,
        zone: &ZoneId,
    ) -> bool {
        let mut all_arrived = true;
        for (_, actor) in participants.iter() {
            let arrived = env.location(*actor).is_some_and(|loc| loc.zone == *zone);
            if arrived {
                self.mark(match_id, *actor, TeleportMarker::Verified);
            } else {
                self.mark(match_id, *actor, TeleportMarker::Failed);
                all_arrived = false;
            }
        }
        all_arrived
    }

    /// Send every participant that is not verified to `target`.
    pub fn emergency_move_in<E: Environment>(
        &mut self,
        env: &mut E,
        match_id: MatchId,
        participants: &Sides<ActorId>,
        target: &Location,
    ) -> Result<()> {
        for (_, actor) in participants.iter() {
            if self.marker(match_id, *actor) == TeleportMarker::Verified {
                continue;
            }
            warn!(match_id = %match_id, participant = %actor, zone = %target.zone, "arrival not confirmed, emergency re-teleport");
            self.relocate(env, *actor, target, RelocationPolicy::AbortOnFailure)?;
            self.mark(match_id, *actor, TeleportMarker::Moved);
        }
        Ok(())
    }

    // =================================================================
    // Back home
    // =================================================================

    /// Where someone whose original position was `origin` should go now.
    #[must_use]
    pub fn resolve_return<E: Environment>(&self, env: &E, origin: &Location) -> Location {
        let Some(info) = env.zone_info(&origin.zone) else {
            debug!(zone = %origin.zone, "original zone unloaded, using main spawn");
            return self.settings.main_spawn.clone();
        };
        if origin.y < info.min_height + self.settings.safety_floor {
            debug!(zone = %origin.zone, y = origin.y, "original position below safety floor, using zone spawn");
            return info.spawn;
        }
        origin.clone()
    }

    pub fn move_back<E: Environment>(&self, env: &mut E, actor: ActorId, origin: &Location) -> ReturnOutcome {
        let target = self.resolve_return(env, origin);
        if env.is_incapacitated(actor) {
            debug!(actor = %actor, "incapacitated, return deferred to recovery flow");
            return ReturnOutcome::Deferred(target);
        }
        match self.relocate(env, actor, &target, RelocationPolicy::LogOnFailure) {
            Ok(true) => ReturnOutcome::Relocated(target),
            Ok(false) | Err(_) => ReturnOutcome::Unavailable,
        }
    }

    /// Check a return trip made `attempt` moves ago. On `RetryAfter` the
    /// actor has already been moved again. A refused retry move ends the
    /// check as `Exhausted`.
    pub fn verify_return<E: Environment>(
        &self,
        env: &mut E,
        actor: ActorId,
        target: &Location,
        attempt: u32,
    ) -> RetryStep {
        let arrived = env
            .location(actor)
            .is_some_and(|loc| loc.is_within(target, self.settings.return_tolerance));
        let mut retry = BoundedRetry::resumed(
            self.retry.return_max_attempts,
            self.retry.return_verify_delay,
            attempt,
        );
        let step = retry.check(arrived);
        match step {
            RetryStep::Verified => {}
            RetryStep::RetryAfter(_) => {
                match self.relocate(env, actor, target, RelocationPolicy::LogOnFailure) {
                    Ok(true) => {
                        warn!(actor = %actor, zone = %target.zone, attempt, "return drifted beyond tolerance, retrying");
                    }
                    Ok(false) | Err(_) => {
                        warn!(actor = %actor, zone = %target.zone, attempt, "return drifted and the retry move was refused, giving up");
                        return RetryStep::Exhausted { attempts: attempt };
                    }
                }
            }
            RetryStep::Exhausted { attempts } => {
                let err = StakematchError::NotInZone {
                    actor,
                    expected: target.zone.clone(),
                };
                warn!(actor = %actor, attempts, error = %err, "return unverified, giving up");
            }
        }
        step
    }

    #[must_use]
    pub fn return_verify_delay(&self) -> stakematch_types::Ticks {
        self.retry.return_verify_delay
    }
}
