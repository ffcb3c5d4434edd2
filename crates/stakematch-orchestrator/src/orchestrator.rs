//! The match orchestrator: one instance per server, driven by the tick.
//!
//! ```text
//!   start_match ──► registry + zone request
//!        │
//!   tick() ──► drain zone reports ──► advance(phase, event) ──► effects
//!        │                                                      │
//!        └──► run due MatchTasks ◄──── Scheduler ◄──────────────┘
//! ```
//!
//! All mutation of match state happens inside `tick()` or one of the
//! public entry points, which the host calls from its tick thread. Zone
//! callbacks arrive through the [`ZoneInbox`] and are only looked at at
//! the start of the next tick.
//!
//! Settlement (`end_match`, aborts, cleanup, shutdown) lives in
//! `settlement.rs` as a second `impl` block.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::Utc;
use stakematch_escrow::{Escrow, MatchRegistry};
use stakematch_lifecycle::{Effect, Event, RetryStep, ScheduledTask, Scheduler, Wake, advance};
use stakematch_settlement::{Finality, SettlementGuard, StakeLedger, ZoneResetAction};
use stakematch_types::{
    AbortReason, ActorId, Agreement, ArenaCatalog, DrawReason, DrawVote, Environment, Location,
    MatchId, MatchRecord, MatchState, Notice, OrchestratorConfig, Outcome, Phase, Result, Sides,
    StakematchError, StatsService, Tick, Ticks, ZoneProvisioner,
};
use tracing::{debug, error, info, warn};

use crate::equipment::EquipmentApplier;
use crate::teleport::TeleportCoordinator;
use crate::zone::{ZoneInbox, ZonePurpose, ZoneReport};

/// A delayed continuation owned by one match.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchTask {
    /// Countdown second, arrival check or fight clock.
    Phase(Wake),
    VerifyLoadout { actor: ActorId, attempt: u32 },
    DeliverPayout { recipient: ActorId, deferrals: u32 },
    VerifyReturn {
        actor: ActorId,
        target: Location,
        attempt: u32,
    },
    /// Decide the outcome one tick after an elimination, so that two
    /// eliminations in the same tick become a draw.
    ResolveElimination {
        victim: ActorId,
        eliminator: Option<ActorId>,
    },
    DrawVoteExpiry { initiator: ActorId },
    ZoneReset(ZoneResetAction),
    Cleanup,
}

pub struct MatchOrchestrator<E, Z, S> {
    pub(crate) config: OrchestratorConfig,
    pub(crate) catalog: ArenaCatalog,
    pub(crate) registry: Arc<MatchRegistry>,
    pub(crate) escrow: Escrow,
    pub(crate) env: E,
    pub(crate) provisioner: Z,
    pub(crate) stats: S,
    pub(crate) scheduler: Scheduler<MatchTask>,
    pub(crate) inbox: ZoneInbox,
    pub(crate) teleport: TeleportCoordinator,
    pub(crate) equipment: EquipmentApplier,
    pub(crate) guard: SettlementGuard,
    pub(crate) ledger: StakeLedger,
    /// Safe return locations for eliminated actors, consumed by the host's
    /// respawn handler. Offline actors are swept at cleanup.
    pub(crate) respawns: HashMap<ActorId, Location>,
}

impl<E: Environment, Z: ZoneProvisioner, S: StatsService> MatchOrchestrator<E, Z, S> {
    pub fn new(
        config: OrchestratorConfig,
        catalog: ArenaCatalog,
        env: E,
        provisioner: Z,
        stats: S,
    ) -> Self {
        Self {
            escrow: Escrow::new(config.wager.clone()),
            teleport: TeleportCoordinator::new(config.relocation.clone(), config.retry.clone()),
            equipment: EquipmentApplier::new(config.retry.clone()),
            registry: Arc::new(MatchRegistry::new()),
            scheduler: Scheduler::new(),
            inbox: ZoneInbox::new(),
            guard: SettlementGuard::default(),
            ledger: StakeLedger::new(),
            respawns: HashMap::new(),
            config,
            catalog,
            env,
            provisioner,
            stats,
        }
    }

    // =================================================================
    // Ingress
    // =================================================================

    /// Start a match from a finalized agreement.
    ///
    /// Re-checks that the arena and loadouts exist and that both sides can
    /// still cover their wagers, snapshots both positions, registers the
    /// match and requests the arena zone. Nothing is removed from anyone
    /// until the zone is ready.
    ///
    /// # Errors
    /// `UnknownArena`, `UnknownLoadout`, `SelfMatch`, `AlreadyInMatch`,
    /// `ActorUnavailable` or any escrow validation error.
    pub fn start_match(&mut self, agreement: Agreement) -> Result<MatchId> {
        let arena = self
            .catalog
            .arena(&agreement.arena)
            .ok_or_else(|| StakematchError::UnknownArena(agreement.arena.clone()))?;
        for (_, loadout) in agreement.loadouts.iter() {
            if self.catalog.loadout(loadout).is_none() || !arena.allows_loadout(loadout) {
                return Err(StakematchError::UnknownLoadout(loadout.clone()));
            }
        }
        let zone = arena.zone.clone();

        let participants = agreement.participants.clone();
        if participants.challenger == participants.opponent {
            return Err(StakematchError::SelfMatch(participants.challenger));
        }
        for (_, actor) in participants.iter() {
            if let Some(existing) = self.registry.lookup_by_participant(*actor) {
                return Err(StakematchError::AlreadyInMatch {
                    actor: *actor,
                    existing,
                });
            }
        }

        self.escrow.validate(&self.env, &agreement)?;

        let origin = |actor: ActorId| {
            self.env
                .location(actor)
                .ok_or(StakematchError::ActorUnavailable(actor))
        };
        let origins = Sides::new(origin(participants.challenger)?, origin(participants.opponent)?);

        let record = MatchRecord::new(MatchId::new(), &agreement, zone.clone(), origins, Utc::now());
        let no_wager = record.no_wager_mode();
        let id = self.registry.register(record)?;
        info!(
            match_id = %id,
            challenger = %participants.challenger,
            opponent = %participants.opponent,
            arena = %agreement.arena,
            no_wager,
            "match started"
        );

        self.notify_participants(
            &participants,
            &Notice::PreparingArena {
                arena: agreement.arena.clone(),
            },
        );
        if no_wager {
            self.notify_participants(&participants, &Notice::NoWagerMode);
        }

        let on_ready = self.inbox.callback(id, zone.clone(), ZonePurpose::Arena);
        self.provisioner.load_zone(&zone, on_ready);
        Ok(id)
    }

    // =================================================================
    // Tick
    // =================================================================

    /// Advance the clock by one tick and run everything that became due.
    pub fn tick(&mut self) -> Tick {
        let now = self.scheduler.advance();
        for report in self.inbox.drain() {
            self.on_zone_report(report);
        }
        while let Some(task) = self.scheduler.pop_due() {
            self.run_task(task);
        }
        now
    }

    /// Run `n` ticks.
    pub fn run_ticks(&mut self, n: u64) -> Tick {
        for _ in 0..n {
            self.tick();
        }
        self.scheduler.now()
    }

    fn on_zone_report(&mut self, report: ZoneReport) {
        let ZoneReport {
            match_id,
            zone,
            purpose,
            result,
        } = report;
        match (purpose, result) {
            (ZonePurpose::Arena, Ok(layout)) => {
                let known = self
                    .registry
                    .with_match_mut(match_id, |m| m.zone_info = Some(layout))
                    .is_some();
                if !known {
                    debug!(match_id = %match_id, zone = %zone, "zone ready for a match that is gone");
                    return;
                }
                info!(match_id = %match_id, zone = %zone, "arena zone ready");
                self.drive(match_id, Event::ZoneReady);
            }
            (ZonePurpose::Arena, Err(reason)) => {
                let err = StakematchError::ZoneUnavailable { zone, reason };
                error!(match_id = %match_id, error = %err, "arena zone failed to load");
                self.drive(match_id, Event::ZoneFailed);
            }
            (ZonePurpose::Reset, Ok(_)) => {
                info!(match_id = %match_id, zone = %zone, "arena zone restored");
            }
            (ZonePurpose::Reset, Err(reason)) => {
                warn!(match_id = %match_id, zone = %zone, reason = %reason, "arena zone reset failed");
            }
        }
    }

    // =================================================================
    // Phase machine
    // =================================================================

    /// Feed `event` to the match and carry out every resulting effect,
    /// including events those effects produce.
    pub(crate) fn drive(&mut self, id: MatchId, event: Event) {
        let mut pending = VecDeque::from([event]);
        while let Some(event) = pending.pop_front() {
            let now = self.scheduler.now();
            let timing = &self.config.timing;
            let Some((from, transition)) = self.registry.with_match_mut(id, |m| {
                let from = m.phase;
                let transition = advance(from, event, now, timing);
                m.phase = transition.phase;
                (from, transition)
            }) else {
                debug!(match_id = %id, ?event, "event for unknown match ignored");
                return;
            };
            if transition.phase != from {
                debug!(match_id = %id, from = ?from, to = ?transition.phase, "phase transition");
            }
            for effect in transition.effects {
                if let Some(next) = self.apply_effect(id, effect) {
                    pending.push_back(next);
                }
            }
        }
    }

    fn apply_effect(&mut self, id: MatchId, effect: Effect) -> Option<Event> {
        let record = self.registry.snapshot(id)?;
        match effect {
            Effect::Notify(notice) => {
                self.notify_participants(&record.participants, &notice);
                None
            }
            Effect::InviteSpectators => {
                let invite = Notice::SpectateInvite {
                    match_id: id,
                    challenger: record.participants.challenger,
                    opponent: record.participants.opponent,
                    arena: record.arena.clone(),
                };
                self.env.broadcast_except(&record.members(), invite);
                None
            }
            Effect::ReserveStakes => Some(self.reserve_stakes(id)),
            Effect::MoveIn => self.move_in(&record),
            Effect::EmergencyMoveIn => self.emergency_move_in(&record),
            Effect::Schedule { delay, wake } => {
                self.scheduler.schedule(id, delay, MatchTask::Phase(wake));
                None
            }
            Effect::ApplyLoadouts => {
                self.start_fight(&record);
                None
            }
            Effect::Abort(reason) => {
                self.abort(id, reason);
                None
            }
            Effect::TimeoutDraw => {
                info!(match_id = %id, "fight clock expired");
                if let Err(e) = self.settle(id, Outcome::Draw(DrawReason::Timeout)) {
                    error!(match_id = %id, error = %e, "timeout settlement failed");
                }
                None
            }
        }
    }

    fn reserve_stakes(&mut self, id: MatchId) -> Event {
        let escrow = &self.escrow;
        let env = &mut self.env;
        let reserved = self.registry.with_match_mut(id, |m| {
            escrow
                .reserve(env, m)
                .map(|()| (m.no_wager_mode(), m.wagers().clone()))
        });
        match reserved {
            Some(Ok((no_wager, wagers))) => {
                if !no_wager {
                    self.ledger.record_reserved(id, &wagers);
                }
                Event::StakeSecured
            }
            Some(Err(e)) => {
                error!(match_id = %id, error = %e, "stake reservation failed");
                Event::StakeRejected
            }
            None => Event::StakeRejected,
        }
    }

    fn move_in(&mut self, record: &MatchRecord) -> Option<Event> {
        let Some(arena) = self.catalog.arena(&record.arena) else {
            error!(match_id = %record.id, arena = %record.arena, "arena vanished from catalog");
            return Some(Event::Abort(AbortReason::TeleportFailed));
        };
        let spawns = arena.spawns.clone();
        match self
            .teleport
            .move_in(&mut self.env, record.id, &record.participants, &spawns)
        {
            Ok(()) => None,
            Err(e) => {
                error!(match_id = %record.id, error = %e, "teleport into arena failed");
                Some(Event::Abort(AbortReason::TeleportFailed))
            }
        }
    }

    fn emergency_move_in(&mut self, record: &MatchRecord) -> Option<Event> {
        let target = self
            .catalog
            .arena(&record.arena)
            .and_then(|a| a.fallback_spawn.clone())
            .or_else(|| record.zone_info.as_ref().map(|z| z.spawn.clone()))
            .or_else(|| self.env.zone_info(&record.zone).map(|z| z.spawn));
        let Some(target) = target else {
            error!(match_id = %record.id, zone = %record.zone, "no fallback spawn for emergency teleport");
            return Some(Event::Abort(AbortReason::TeleportFailed));
        };
        match self
            .teleport
            .emergency_move_in(&mut self.env, record.id, &record.participants, &target)
        {
            Ok(()) => None,
            Err(e) => {
                error!(match_id = %record.id, error = %e, "emergency teleport failed");
                Some(Event::Abort(AbortReason::TeleportFailed))
            }
        }
    }

    fn start_fight(&mut self, record: &MatchRecord) {
        for (side, actor) in record.participants.iter() {
            self.env.prepare_for_combat(*actor);
            self.env.clear_status_effects(*actor);
            let Some(loadout) = self.catalog.loadout(record.loadouts.get(side)) else {
                warn!(match_id = %record.id, loadout = %record.loadouts.get(side), "loadout vanished from catalog");
                continue;
            };
            self.equipment.apply(&mut self.env, *actor, loadout);
            self.scheduler.schedule(
                record.id,
                self.equipment.first_verify_delay(),
                MatchTask::VerifyLoadout {
                    actor: *actor,
                    attempt: 1,
                },
            );
        }
        info!(match_id = %record.id, "fight started");
    }

    // =================================================================
    // Scheduled tasks
    // =================================================================

    fn run_task(&mut self, task: ScheduledTask<MatchTask>) {
        let ScheduledTask { owner: id, task, .. } = task;
        match task {
            MatchTask::Phase(wake) => match wake.event() {
                Some(event) => self.drive(id, event),
                None => self.check_arrival(id),
            },
            MatchTask::VerifyLoadout { actor, attempt } => self.verify_loadout(id, actor, attempt),
            MatchTask::DeliverPayout {
                recipient,
                deferrals,
            } => self.deliver_payout(id, recipient, deferrals),
            MatchTask::VerifyReturn {
                actor,
                target,
                attempt,
            } => {
                if let RetryStep::RetryAfter(delay) =
                    self.teleport.verify_return(&mut self.env, actor, &target, attempt)
                {
                    self.scheduler.schedule(
                        id,
                        delay,
                        MatchTask::VerifyReturn {
                            actor,
                            target,
                            attempt: attempt + 1,
                        },
                    );
                }
            }
            MatchTask::ResolveElimination { victim, eliminator } => {
                self.resolve_elimination(id, victim, eliminator);
            }
            MatchTask::DrawVoteExpiry { initiator } => self.expire_draw_vote(id, initiator),
            MatchTask::ZoneReset(action) => self.reset_zone(id, action),
            MatchTask::Cleanup => self.cleanup(id),
        }
    }

    fn check_arrival(&mut self, id: MatchId) {
        let Some((participants, zone)) = self
            .registry
            .with_match(id, |m| (m.participants.clone(), m.zone.clone()))
        else {
            return;
        };
        let all_arrived = self
            .teleport
            .verify_arrival(&self.env, id, &participants, &zone);
        if all_arrived {
            info!(match_id = %id, zone = %zone, "arrival verified");
        }
        self.drive(id, Event::ArrivalChecked { all_arrived });
    }

    fn verify_loadout(&mut self, id: MatchId, actor: ActorId, attempt: u32) {
        let Some(Some(loadout_id)) = self.registry.with_match(id, |m| {
            m.side_of(actor)
                .filter(|_| m.phase.is_fighting())
                .map(|side| m.loadouts.get(side).clone())
        }) else {
            return;
        };
        let Some(loadout) = self.catalog.loadout(&loadout_id) else {
            return;
        };
        match self.equipment.check(&mut self.env, actor, loadout, attempt) {
            RetryStep::Verified => {}
            RetryStep::RetryAfter(delay) => {
                self.scheduler.schedule(
                    id,
                    delay,
                    MatchTask::VerifyLoadout {
                        actor,
                        attempt: attempt + 1,
                    },
                );
            }
            RetryStep::Exhausted { .. } => self.env.notify(actor, Notice::LoadoutUnverified),
        }
    }

    // =================================================================
    // Draw votes
    // =================================================================

    /// Open a draw proposal, or withdraw the actor's own open proposal.
    ///
    /// # Errors
    /// `DrawVote` if the actor is not a participant or the opponent's
    /// proposal is already open; `WrongState` outside the fight.
    pub fn propose_draw(&mut self, actor: ActorId) -> Result<()> {
        let (id, opponent) = self.fighting_match_of(actor)?;
        let now = self.scheduler.now();
        let window = self.config.timing.draw_vote_window;
        let opened = self
            .registry
            .with_match_mut(id, |m| match m.draw_vote {
                Some(vote) if vote.initiator == actor => {
                    m.draw_vote = None;
                    Ok(false)
                }
                Some(_) => Err(StakematchError::DrawVote {
                    reason: "the opponent's proposal is already open".into(),
                }),
                None => {
                    m.draw_vote = Some(DrawVote {
                        initiator: actor,
                        expires_at: now + window,
                    });
                    Ok(true)
                }
            })
            .ok_or(StakematchError::MatchNotFound(id))??;

        if opened {
            self.env.notify(actor, Notice::DrawProposalSent);
            self.env.notify(opponent, Notice::DrawProposed { by: actor });
            self.scheduler
                .schedule(id, window, MatchTask::DrawVoteExpiry { initiator: actor });
            info!(match_id = %id, initiator = %actor, "draw proposed");
        } else {
            self.env.notify(actor, Notice::DrawProposalWithdrawn);
            self.env.notify(opponent, Notice::DrawProposalWithdrawn);
            debug!(match_id = %id, initiator = %actor, "draw proposal withdrawn");
        }
        Ok(())
    }

    /// Accept the opponent's open proposal; the match ends as an agreed draw.
    pub fn accept_draw(&mut self, actor: ActorId) -> Result<bool> {
        let (id, _) = self.fighting_match_of(actor)?;
        self.open_vote_against(id, actor)?;
        info!(match_id = %id, accepted_by = %actor, "draw accepted");
        self.settle(id, Outcome::Draw(DrawReason::Agreed))
    }

    pub fn deny_draw(&mut self, actor: ActorId) -> Result<()> {
        let (id, opponent) = self.fighting_match_of(actor)?;
        self.open_vote_against(id, actor)?;
        self.registry.with_match_mut(id, |m| m.draw_vote = None);
        self.env.notify(actor, Notice::DrawDenied { by: actor });
        self.env.notify(opponent, Notice::DrawDenied { by: actor });
        debug!(match_id = %id, denied_by = %actor, "draw denied");
        Ok(())
    }

    /// The open vote, if it was proposed by someone other than `actor`.
    fn open_vote_against(&self, id: MatchId, actor: ActorId) -> Result<DrawVote> {
        let vote = self
            .registry
            .with_match(id, |m| m.draw_vote)
            .flatten()
            .ok_or_else(|| StakematchError::DrawVote {
                reason: "no open proposal".into(),
            })?;
        if vote.initiator == actor {
            return Err(StakematchError::DrawVote {
                reason: "cannot answer your own proposal".into(),
            });
        }
        Ok(vote)
    }

    fn expire_draw_vote(&mut self, id: MatchId, initiator: ActorId) {
        let now = self.scheduler.now();
        let expired = self
            .registry
            .with_match_mut(id, |m| match m.draw_vote {
                Some(vote) if vote.initiator == initiator && vote.expires_at <= now => {
                    m.draw_vote = None;
                    Some(m.participants.clone())
                }
                _ => None,
            })
            .flatten();
        if let Some(participants) = expired {
            self.notify_participants(&participants, &Notice::DrawExpired);
            debug!(match_id = %id, initiator = %initiator, "draw proposal expired");
        }
    }

    fn fighting_match_of(&self, actor: ActorId) -> Result<(MatchId, ActorId)> {
        let (id, phase, opponent) =
            self.participant_match(actor)
                .ok_or_else(|| StakematchError::DrawVote {
                    reason: format!("{actor} is not a participant of any match"),
                })?;
        if !phase.is_fighting() {
            return Err(StakematchError::WrongState {
                expected: MatchState::Fighting,
                actual: phase.state(),
            });
        }
        Ok((id, opponent))
    }

    /// Match, phase and opponent of a participant. Spectators get `None`.
    fn participant_match(&self, actor: ActorId) -> Option<(MatchId, Phase, ActorId)> {
        let id = self.registry.lookup_by_participant(actor)?;
        self.registry
            .with_match(id, |m| m.opponent_of(actor).map(|o| (id, m.phase, o)))
            .flatten()
    }

    // =================================================================
    // Forfeit & eliminations
    // =================================================================

    /// The actor gives up (surrender, disconnect); the opponent wins.
    /// Returns `false` if the actor is not in a live match.
    pub fn forfeit(&mut self, actor: ActorId) -> Result<bool> {
        let Some((id, phase, opponent)) = self.participant_match(actor) else {
            return Ok(false);
        };
        if phase.is_terminal() {
            return Ok(false);
        }
        info!(match_id = %id, participant = %actor, "participant forfeited");
        self.settle(
            id,
            Outcome::Win {
                winner: opponent,
                loser: actor,
            },
        )
    }

    /// A participant was eliminated during the fight.
    ///
    /// Stores a safe return location for the host's respawn flow, then
    /// decides the outcome one tick later. Returns `false` if the victim is
    /// not fighting.
    pub fn report_elimination(&mut self, victim: ActorId, eliminator: Option<ActorId>) -> bool {
        let Some((id, phase, _)) = self.participant_match(victim) else {
            return false;
        };
        if !phase.is_fighting() {
            return false;
        }
        let origin = self
            .registry
            .with_match_mut(id, |m| {
                m.eliminated.insert(victim);
                m.origin_of(victim).cloned()
            })
            .flatten();
        if let Some(origin) = origin {
            let target = self.teleport.resolve_return(&self.env, &origin);
            self.respawns.insert(victim, target);
        }
        self.scheduler.schedule(
            id,
            Ticks::ONE,
            MatchTask::ResolveElimination { victim, eliminator },
        );
        debug!(match_id = %id, victim = %victim, "elimination reported");
        true
    }

    fn resolve_elimination(&mut self, id: MatchId, victim: ActorId, eliminator: Option<ActorId>) {
        let Some((phase, participants, eliminated)) = self
            .registry
            .with_match(id, |m| (m.phase, m.participants.clone(), m.eliminated.len()))
        else {
            return;
        };
        if !phase.is_fighting() {
            return;
        }
        let both_down = eliminated >= 2
            || participants
                .iter()
                .all(|(_, actor)| self.env.is_incapacitated(*actor));
        let outcome = if both_down {
            Outcome::Draw(DrawReason::DoubleElimination)
        } else {
            let Some(opponent) = participants
                .side_of(&victim)
                .map(|side| *participants.get(side.other()))
            else {
                return;
            };
            let winner = eliminator
                .filter(|e| *e != victim && participants.contains(e))
                .unwrap_or(opponent);
            Outcome::Win {
                winner,
                loser: victim,
            }
        };
        if let Err(e) = self.settle(id, outcome) {
            error!(match_id = %id, error = %e, "elimination settlement failed");
        }
    }

    /// Hand the stored return location to the host's respawn handler.
    pub fn take_respawn_location(&mut self, actor: ActorId) -> Option<Location> {
        self.respawns.remove(&actor)
    }

    // =================================================================
    // Combat gating
    // =================================================================

    /// Whether `attacker` may damage `victim`.
    ///
    /// Spectators never deal or take damage. Participants of the same match
    /// may only hurt each other while fighting. Everyone else is unaffected.
    #[must_use]
    pub fn combat_allowed(&self, attacker: ActorId, victim: ActorId) -> bool {
        let attacker_match = self.registry.lookup_by_participant(attacker);
        let victim_match = self.registry.lookup_by_participant(victim);
        for (actor, id) in [(attacker, attacker_match), (victim, victim_match)] {
            let spectating = id.is_some_and(|id| {
                self.registry
                    .with_match(id, |m| m.spectators.contains_key(&actor))
                    .unwrap_or(false)
            });
            if spectating {
                return false;
            }
        }
        match (attacker_match, victim_match) {
            (Some(a), Some(b)) if a == b => self
                .registry
                .phase_of(a)
                .is_some_and(|phase| phase.is_fighting()),
            _ => true,
        }
    }

    // =================================================================
    // Spectators
    // =================================================================

    /// Attach a spectator to a live match, remembering where they stand.
    pub fn add_spectator(&mut self, id: MatchId, actor: ActorId) -> Result<()> {
        let origin = self
            .env
            .location(actor)
            .ok_or(StakematchError::ActorUnavailable(actor))?;
        self.registry.attach_spectator(id, actor, origin)?;
        info!(match_id = %id, spectator = %actor, "spectator added");
        Ok(())
    }

    /// Detach a spectator, returning them home if they were moved.
    pub fn remove_spectator(&mut self, actor: ActorId) -> bool {
        let Some(id) = self.registry.lookup_by_participant(actor) else {
            return false;
        };
        let Some(spectator) = self.registry.detach_spectator(id, actor) else {
            return false;
        };
        if spectator.relocated {
            self.return_member(id, actor, &spectator.origin);
        }
        debug!(match_id = %id, spectator = %actor, "spectator removed");
        true
    }

    /// Record that the spectate flow moved `actor` into the arena zone.
    pub fn mark_relocated(&mut self, actor: ActorId) -> bool {
        let Some(id) = self.registry.lookup_by_participant(actor) else {
            return false;
        };
        self.registry
            .with_match_mut(id, |m| {
                m.spectators
                    .get_mut(&actor)
                    .map(|s| s.relocated = true)
                    .is_some()
            })
            .unwrap_or(false)
    }

    // =================================================================
    // Helpers & queries
    // =================================================================

    pub(crate) fn notify_participants(&mut self, participants: &Sides<ActorId>, notice: &Notice) {
        for (_, actor) in participants.iter() {
            self.env.notify(*actor, notice.clone());
        }
    }

    #[must_use]
    pub fn active_match_count(&self) -> usize {
        self.registry.len()
    }

    #[must_use]
    pub fn match_of(&self, actor: ActorId) -> Option<MatchId> {
        self.registry.lookup_by_participant(actor)
    }

    #[must_use]
    pub fn is_committed(&self, actor: ActorId) -> bool {
        self.registry.is_committed(actor)
    }

    #[must_use]
    pub fn phase_of(&self, id: MatchId) -> Option<Phase> {
        self.registry.phase_of(id)
    }

    #[must_use]
    pub fn state_of(&self, id: MatchId) -> Option<MatchState> {
        self.phase_of(id).map(|p| p.state())
    }

    #[must_use]
    pub fn snapshot(&self, id: MatchId) -> Option<MatchRecord> {
        self.registry.snapshot(id)
    }

    #[must_use]
    pub fn is_settled(&self, id: MatchId) -> bool {
        self.guard.is_settled(&id)
    }

    /// How the match ended, while it is still remembered.
    #[must_use]
    pub fn finality_of(&self, id: MatchId) -> Option<Finality> {
        self.guard.finality(&id)
    }

    #[must_use]
    pub fn registry(&self) -> Arc<MatchRegistry> {
        Arc::clone(&self.registry)
    }

    #[must_use]
    pub fn now(&self) -> Tick {
        self.scheduler.now()
    }

    /// Scheduled tasks still pending for `id`.
    #[must_use]
    pub fn pending_tasks(&self, id: MatchId) -> Vec<MatchTask> {
        self.scheduler.tasks_of(id).map(|(_, t)| t.clone()).collect()
    }

    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    #[must_use]
    pub fn environment(&self) -> &E {
        &self.env
    }

    pub fn environment_mut(&mut self) -> &mut E {
        &mut self.env
    }

    #[must_use]
    pub fn provisioner(&self) -> &Z {
        &self.provisioner
    }

    pub fn provisioner_mut(&mut self) -> &mut Z {
        &mut self.provisioner
    }

    #[must_use]
    pub fn stats(&self) -> &S {
        &self.stats
    }

    pub fn stats_mut(&mut self) -> &mut S {
        &mut self.stats
    }
}
