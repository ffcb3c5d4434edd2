//! Ending matches: settlement, aborts, cleanup and shutdown.
//!
//! Settlement order for a decided match:
//!
//! 1. phase → Ended, outcome recorded (no-op if already terminal)
//! 2. idempotency guard marked, pending tasks cancelled
//! 3. combat state restored, outcome announced
//! 4. held stakes replaced by staged payouts
//! 5. participants moved home, return verification scheduled
//! 6. payouts delivered `distribute_delay` later, once the recipient has
//!    left the arena
//! 7. stats recorded, zone reset and cleanup scheduled
//!
//! Every path that removes a match goes through [`MatchOrchestrator::cleanup`],
//! which flushes anything still owned by the match before closing its
//! ledger entry.

use stakematch_escrow::DeliveryReport;
use stakematch_lifecycle::{Event, advance};
use stakematch_settlement::{Finality, ZoneResetAction, plan_payouts};
use stakematch_types::{
    AbortReason, ActorId, DrawReason, Environment, HeldStakes, Location, MatchId, MatchRecord,
    Notice, Outcome, Payout, Result, Sides, StakematchError, StatsService, ZoneProvisioner,
};
use tracing::{debug, error, info, warn};

use crate::orchestrator::{MatchOrchestrator, MatchTask};
use crate::teleport::ReturnOutcome;
use crate::zone::ZonePurpose;

impl<E: Environment, Z: ZoneProvisioner, S: StatsService> MatchOrchestrator<E, Z, S> {
    /// End a match with a winner or as a draw.
    ///
    /// Returns `Ok(false)` if the match was already settled.
    ///
    /// # Errors
    /// - `SettlementFailed` if neither a winner nor `is_draw` is given
    /// - `NotParticipant` if the winner is not in the match
    /// - `MatchNotFound` for an id that was never settled here
    pub fn end_match(&mut self, id: MatchId, winner: Option<ActorId>, is_draw: bool) -> Result<bool> {
        if is_draw {
            return self.settle(id, Outcome::Draw(DrawReason::Declared));
        }
        let winner = winner.ok_or_else(|| StakematchError::SettlementFailed {
            reason: "decisive result without a winner".into(),
        })?;
        let Some(loser) = self.registry.with_match(id, |m| m.opponent_of(winner)) else {
            return self.missing_match(id);
        };
        let loser = loser.ok_or(StakematchError::NotParticipant {
            actor: winner,
            match_id: id,
        })?;
        self.settle(id, Outcome::Win { winner, loser })
    }

    fn missing_match(&self, id: MatchId) -> Result<bool> {
        if self.guard.is_settled(&id) {
            debug!(match_id = %id, "settlement repeated after cleanup");
            Ok(false)
        } else {
            Err(StakematchError::MatchNotFound(id))
        }
    }

    pub(crate) fn settle(&mut self, id: MatchId, outcome: Outcome) -> Result<bool> {
        let now = self.scheduler.now();
        let timing = &self.config.timing;
        let Some(entered) = self.registry.with_match_mut(id, |m| {
            if m.phase.is_terminal() {
                return false;
            }
            m.phase = advance(m.phase, Event::Settle, now, timing).phase;
            m.outcome = Some(outcome);
            m.draw_vote = None;
            true
        }) else {
            return self.missing_match(id);
        };
        if !entered {
            debug!(match_id = %id, "match already over, settlement skipped");
            return Ok(false);
        }
        if let Err(e) = self.guard.finalize(id, Finality::Decided(outcome)) {
            error!(match_id = %id, error = %e, "duplicate settlement blocked");
            return Ok(false);
        }
        self.scheduler.cancel_match(id);

        let Some(record) = self.registry.snapshot(id) else {
            return Ok(false);
        };
        info!(match_id = %id, outcome = ?outcome, "match settled");

        for (_, actor) in record.participants.iter() {
            self.env.reset_after_match(*actor);
            self.env.clear_status_effects(*actor);
        }
        self.announce_outcome(&record.participants, &outcome);

        let recipients = self.stage_payouts(id, &outcome);
        self.return_participants(&record);

        let delay = self.config.timing.distribute_delay;
        for recipient in recipients {
            self.scheduler.schedule(
                id,
                delay,
                MatchTask::DeliverPayout {
                    recipient,
                    deferrals: 0,
                },
            );
        }

        self.record_stats(&record, &outcome);
        self.schedule_zone_reset(&record);
        self.scheduler
            .schedule(id, self.config.timing.cleanup_delay, MatchTask::Cleanup);
        Ok(true)
    }

    fn announce_outcome(&mut self, participants: &Sides<ActorId>, outcome: &Outcome) {
        match *outcome {
            Outcome::Win { winner, loser } => {
                self.env.notify(winner, Notice::Victory { opponent: loser });
                self.env.notify(loser, Notice::Defeat { opponent: winner });
            }
            Outcome::Draw(reason) => self.notify_participants(participants, &Notice::Draw(reason)),
        }
    }

    /// Turn held stakes into payouts. Returns the recipients.
    fn stage_payouts(&mut self, id: MatchId, outcome: &Outcome) -> Vec<ActorId> {
        let staged = self.registry.with_match_mut(id, |m| {
            let Some(held) = m.held().cloned() else {
                m.release_pending();
                return Ok::<_, StakematchError>(Vec::new());
            };
            let payouts = plan_payouts(&held, outcome).or_else(|e| {
                warn!(match_id = %id, error = %e, "payout plan rejected, refunding both sides");
                plan_payouts(&held, &Outcome::Draw(DrawReason::Declared))
            })?;
            m.stage_payouts(payouts)?;
            Ok(m.payout_recipients())
        });
        match staged {
            Some(Ok(recipients)) => recipients,
            Some(Err(e)) => {
                error!(match_id = %id, error = %e, "payouts could not be staged");
                Vec::new()
            }
            None => Vec::new(),
        }
    }

    fn return_participants(&mut self, record: &MatchRecord) {
        for (side, actor) in record.participants.iter() {
            if self.teleport.was_moved(record.id, *actor) {
                self.return_member(record.id, *actor, record.origins().get(side));
            }
        }
    }

    /// Move one member home and schedule the return check.
    pub(crate) fn return_member(&mut self, id: MatchId, actor: ActorId, origin: &Location) {
        match self.teleport.move_back(&mut self.env, actor, origin) {
            ReturnOutcome::Relocated(target) => {
                let delay = self.teleport.return_verify_delay();
                self.scheduler.schedule(
                    id,
                    delay,
                    MatchTask::VerifyReturn {
                        actor,
                        target,
                        attempt: 1,
                    },
                );
            }
            ReturnOutcome::Deferred(target) => {
                self.respawns.insert(actor, target);
            }
            ReturnOutcome::Unavailable => {
                warn!(match_id = %id, actor = %actor, "could not move actor home");
            }
        }
    }

    fn record_stats(&mut self, record: &MatchRecord, outcome: &Outcome) {
        let results = match *outcome {
            Outcome::Win { winner, loser } => {
                vec![self.stats.record_win(winner), self.stats.record_loss(loser)]
            }
            Outcome::Draw(_) => record
                .participants
                .iter()
                .map(|(_, actor)| self.stats.record_draw(*actor))
                .collect(),
        };
        for e in results.into_iter().filter_map(std::result::Result::err) {
            warn!(match_id = %record.id, error = %e, "stats update failed");
        }
    }

    // =================================================================
    // Delivery
    // =================================================================

    /// Deliver one staged payout, waiting while the recipient is still in
    /// the arena zone.
    pub(crate) fn deliver_payout(&mut self, id: MatchId, recipient: ActorId, deferrals: u32) {
        let Some(zone) = self.registry.with_match(id, |m| m.zone.clone()) else {
            return;
        };
        let in_arena = self
            .env
            .location(recipient)
            .is_some_and(|loc| loc.zone == zone);
        if in_arena {
            if deferrals < self.config.retry.payout_max_deferrals {
                self.scheduler.schedule(
                    id,
                    self.config.retry.payout_defer_interval,
                    MatchTask::DeliverPayout {
                        recipient,
                        deferrals: deferrals + 1,
                    },
                );
                return;
            }
            warn!(match_id = %id, recipient = %recipient, deferrals, "recipient still in arena, delivering anyway");
        }
        let Some(payout) = self
            .registry
            .with_match_mut(id, |m| m.take_payout(recipient))
            .flatten()
        else {
            return;
        };
        self.hand_over(id, payout);
    }

    fn hand_over(&mut self, id: MatchId, payout: Payout) {
        let recipient = payout.recipient;
        let report = self.escrow.deliver(&mut self.env, payout);
        self.record_release(id, &report);
        self.env.notify(
            recipient,
            Notice::StakeDelivered {
                items: report.given.len() + report.dropped.len(),
                currency: report.deposited,
            },
        );
        if !report.dropped.is_empty() {
            self.env.notify(
                recipient,
                Notice::ItemsDropped {
                    stacks: report.dropped.len(),
                },
            );
        }
    }

    fn refund_held(&mut self, id: MatchId, held: HeldStakes) {
        let report = self.escrow.refund(&mut self.env, held);
        self.record_release(id, &report);
    }

    fn record_release(&mut self, id: MatchId, report: &DeliveryReport) {
        if self.ledger.is_tracked(id) {
            self.ledger
                .record_released(id, &report.items(), report.deposited, report.undelivered);
        }
    }

    // =================================================================
    // Abort & cleanup
    // =================================================================

    /// Cancel a match before the fight: notify, move home, refund, clean up.
    pub(crate) fn abort(&mut self, id: MatchId, reason: AbortReason) {
        if let Err(e) = self.guard.finalize(id, Finality::Cancelled(reason)) {
            debug!(match_id = %id, error = %e, "abort after settlement");
        }
        self.scheduler.cancel_match(id);
        let Some((record, held)) = self.registry.with_match_mut(id, |m| {
            let held = m.take_held();
            m.release_pending();
            (m.clone(), held)
        }) else {
            return;
        };
        error!(match_id = %id, reason = %reason, phase = ?record.phase, "match cancelled");

        self.notify_participants(&record.participants, &Notice::Failure(reason));
        // Home first, so overflow lands outside the arena.
        self.return_participants(&record);
        if let Some(held) = held {
            self.refund_held(id, held);
        }
        if record.zone_info.is_some() {
            self.schedule_zone_reset(&record);
        }
        self.cleanup(id);
    }

    fn schedule_zone_reset(&mut self, record: &MatchRecord) {
        let Some(arena) = self.catalog.arena(&record.arena) else {
            warn!(match_id = %record.id, arena = %record.arena, "arena vanished, zone not reset");
            return;
        };
        let action = ZoneResetAction::for_arena(arena);
        self.scheduler.schedule(
            record.id,
            self.config.timing.zone_reset_delay,
            MatchTask::ZoneReset(action),
        );
    }

    pub(crate) fn reset_zone(&mut self, id: MatchId, action: ZoneResetAction) {
        info!(match_id = %id, zone = %action.zone(), action = ?action, "resetting arena zone");
        match action {
            ZoneResetAction::Clone { source, target } => {
                let on_ready = self.inbox.callback(id, target.clone(), ZonePurpose::Reset);
                self.provisioner.clone_zone(&source, &target, on_ready);
            }
            ZoneResetAction::Regenerate(zone) => self.provisioner.regenerate_zone(&zone),
            ZoneResetAction::Unload(zone) => self.provisioner.unload_zone(&zone),
        }
    }

    /// Remove a match from the registry after flushing anything it still
    /// owns. Scheduled zone resets and return checks for the match survive.
    /// Respawn locations of actors who went offline are dropped.
    pub(crate) fn cleanup(&mut self, id: MatchId) {
        let Some(mut record) = self.registry.remove(id) else {
            return;
        };
        for payout in record.drain_payouts() {
            warn!(match_id = %id, recipient = %payout.recipient, "flushing undelivered payout at cleanup");
            self.hand_over(id, payout);
        }
        if let Some(held) = record.take_held() {
            warn!(match_id = %id, "refunding stake still held at cleanup");
            self.refund_held(id, held);
        }
        for (actor, spectator) in std::mem::take(&mut record.spectators) {
            if spectator.relocated {
                self.return_member(id, actor, &spectator.origin);
            }
        }
        self.teleport.forget(id);
        let env = &self.env;
        self.respawns.retain(|actor, _| env.location(*actor).is_some());
        if let Err(e) = self.ledger.close(id) {
            error!(match_id = %id, error = %e, "stake conservation check failed");
        }
        info!(match_id = %id, outcome = ?record.outcome, "match cleaned up");
    }

    // =================================================================
    // Shutdown
    // =================================================================

    /// Stop every match. Returns how many were registered.
    ///
    /// Non-immediate: every live match settles as a shutdown draw through
    /// the normal path, including delayed delivery and zone reset.
    ///
    /// Immediate: all tasks are sealed, stakes refunded and members moved
    /// home synchronously, and every match is cleaned up before returning.
    /// Zones are left as they are.
    pub fn stop_all_matches(&mut self, immediate: bool) -> usize {
        let ids = self.registry.ids();
        warn!(matches = ids.len(), immediate, "stopping all matches");
        if immediate {
            self.scheduler.seal_all();
            for id in &ids {
                self.shutdown_match(*id);
            }
        } else {
            for id in &ids {
                self.announce_shutdown(*id);
                if let Err(e) = self.settle(*id, Outcome::Draw(DrawReason::Shutdown)) {
                    debug!(match_id = %id, error = %e, "shutdown settlement skipped");
                }
            }
        }
        ids.len()
    }

    fn announce_shutdown(&mut self, id: MatchId) {
        let Some(members) = self.registry.with_match(id, MatchRecord::members) else {
            return;
        };
        for actor in members {
            self.env.notify(actor, Notice::ShutdownCancelled);
        }
    }

    fn shutdown_match(&mut self, id: MatchId) {
        let now = self.scheduler.now();
        let timing = &self.config.timing;
        let Some((was_live, record, held)) = self.registry.with_match_mut(id, |m| {
            let was_live = !m.phase.is_terminal();
            let mut held = None;
            if was_live {
                m.phase = advance(m.phase, Event::Settle, now, timing).phase;
                m.outcome = Some(Outcome::Draw(DrawReason::Shutdown));
                m.draw_vote = None;
                held = m.take_held();
                m.release_pending();
            }
            (was_live, m.clone(), held)
        }) else {
            return;
        };
        self.announce_shutdown(id);

        if was_live {
            let finality = Finality::Decided(Outcome::Draw(DrawReason::Shutdown));
            if let Err(e) = self.guard.finalize(id, finality) {
                debug!(match_id = %id, error = %e, "shutdown after settlement");
            }
            for (_, actor) in record.participants.iter() {
                self.env.reset_after_match(*actor);
                self.env.clear_status_effects(*actor);
            }
            self.return_participants(&record);
            if let Some(held) = held {
                self.refund_held(id, held);
            }
            self.record_stats(&record, &Outcome::Draw(DrawReason::Shutdown));
        }
        self.cleanup(id);
    }
}
