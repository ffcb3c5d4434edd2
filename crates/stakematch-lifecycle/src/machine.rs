//! The match phase machine.
//!
//! [`advance`] is a pure function: given the current [`Phase`], an
//! [`Event`] and the current tick, it returns the next phase and the
//! [`Effect`]s the orchestrator must carry out. It never touches the
//! environment, the registry or the scheduler.
//!
//! ```text
//!  LoadingZone ─ZoneReady─► SecuringStake ─StakeSecured─► PreTeleportCountdown{n}
//!      │ZoneFailed              │StakeRejected                 │CountdownElapsed (n → 0)
//!      ▼                        ▼                              ▼
//!  Cancelled ◄──────────── Cancelled        VerifyingArrival{attempt} ─ok─► InZoneCountdown{n}
//!      ▲                                         │ fail, retry: EmergencyMoveIn   │ (n → 0)
//!      └──────────── fail, exhausted ────────────┘                                ▼
//!                                                             Fighting{started_at} ─Settle─► Ended
//! ```
//!
//! Events that do not apply to the current phase are ignored: the phase is
//! returned unchanged with no effects. Terminal phases ignore everything.

use stakematch_types::{AbortReason, Notice, Phase, PhaseTiming, Tick, Ticks};

use crate::retry::{BoundedRetry, RetryStep};

/// Inputs to the phase machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// The zone provisioner reported the arena zone ready.
    ZoneReady,
    /// The zone provisioner failed.
    ZoneFailed,
    /// Escrow removed both stakes (or there was nothing to remove).
    StakeSecured,
    /// Escrow could not remove a stake.
    StakeRejected,
    /// One second of a countdown passed.
    CountdownElapsed,
    /// Result of an arrival check.
    ArrivalChecked { all_arrived: bool },
    /// One second of the fight clock passed.
    FightClock,
    /// The settlement path took over.
    Settle,
    /// An internal failure cancelled the match.
    Abort(AbortReason),
}

/// Which continuation a scheduled wake-up drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    Countdown,
    VerifyArrival,
    FightClock,
}

impl Wake {
    /// The event this wake-up feeds back into the machine. Arrival checks
    /// need the environment, so they have none.
    #[must_use]
    pub fn event(self) -> Option<Event> {
        match self {
            Wake::Countdown => Some(Event::CountdownElapsed),
            Wake::FightClock => Some(Event::FightClock),
            Wake::VerifyArrival => None,
        }
    }
}

/// Work for the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Tell both participants.
    Notify(Notice),
    /// Invite everyone else to spectate.
    InviteSpectators,
    /// Remove both stakes from the participants.
    ReserveStakes,
    /// Move both participants to their arena spawns.
    MoveIn,
    /// Move participants that did not arrive to the fallback spawn.
    EmergencyMoveIn,
    Schedule { delay: Ticks, wake: Wake },
    /// Prepare both participants for combat and apply their loadouts.
    ApplyLoadouts,
    /// Cancel the match, return stakes, notify.
    Abort(AbortReason),
    /// The fight clock ran out without an outcome.
    TimeoutDraw,
}

/// Result of one [`advance`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub phase: Phase,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn to(phase: Phase, effects: Vec<Effect>) -> Self {
        Self { phase, effects }
    }

    fn ignored(phase: Phase) -> Self {
        Self {
            phase,
            effects: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_noop(&self, from: Phase) -> bool {
        self.phase == from && self.effects.is_empty()
    }
}

const ONE_SECOND: Ticks = Ticks::from_secs(1);

/// Compute the next phase and the effects to perform.
#[must_use]
pub fn advance(phase: Phase, event: Event, now: Tick, timing: &PhaseTiming) -> Transition {
    if phase.is_terminal() {
        return Transition::ignored(phase);
    }

    match (phase, event) {
        (_, Event::Settle) => Transition::to(Phase::Ended, Vec::new()),

        (
            Phase::LoadingZone
            | Phase::SecuringStake
            | Phase::PreTeleportCountdown { .. }
            | Phase::VerifyingArrival { .. }
            | Phase::InZoneCountdown { .. },
            Event::Abort(reason),
        ) => Transition::to(Phase::Cancelled, vec![Effect::Abort(reason)]),

        (Phase::LoadingZone, Event::ZoneReady) => {
            Transition::to(Phase::SecuringStake, vec![Effect::ReserveStakes])
        }
        (Phase::LoadingZone, Event::ZoneFailed) => Transition::to(
            Phase::Cancelled,
            vec![Effect::Abort(AbortReason::ZoneUnavailable)],
        ),

        (Phase::SecuringStake, Event::StakeSecured) => {
            let mut effects = vec![Effect::InviteSpectators];
            let next = pre_teleport(timing.pre_teleport_secs, timing, &mut effects);
            Transition::to(next, effects)
        }
        (Phase::SecuringStake, Event::StakeRejected) => Transition::to(
            Phase::Cancelled,
            vec![Effect::Abort(AbortReason::StakeRejected)],
        ),

        (Phase::PreTeleportCountdown { remaining }, Event::CountdownElapsed) => {
            let mut effects = Vec::new();
            let next = pre_teleport(remaining.saturating_sub(1), timing, &mut effects);
            Transition::to(next, effects)
        }

        (Phase::VerifyingArrival { attempt }, Event::ArrivalChecked { all_arrived }) => {
            let mut retry = BoundedRetry::resumed(
                timing.arrival_max_attempts,
                timing.emergency_verify_delay,
                attempt,
            );
            match retry.check(all_arrived) {
                RetryStep::Verified => {
                    let mut effects = Vec::new();
                    let next = in_zone(timing.in_zone_countdown_secs, now, &mut effects);
                    Transition::to(next, effects)
                }
                RetryStep::RetryAfter(delay) => Transition::to(
                    Phase::VerifyingArrival {
                        attempt: retry.attempts(),
                    },
                    vec![
                        Effect::EmergencyMoveIn,
                        Effect::Schedule {
                            delay,
                            wake: Wake::VerifyArrival,
                        },
                    ],
                ),
                RetryStep::Exhausted { .. } => Transition::to(
                    Phase::Cancelled,
                    vec![Effect::Abort(AbortReason::TeleportFailed)],
                ),
            }
        }

        (Phase::InZoneCountdown { remaining }, Event::CountdownElapsed) => {
            let mut effects = Vec::new();
            let next = in_zone(remaining.saturating_sub(1), now, &mut effects);
            Transition::to(next, effects)
        }

        (Phase::Fighting { started_at }, Event::FightClock) => {
            let elapsed = now.since(started_at).as_secs();
            let remaining = u64::from(timing.max_fight_secs).saturating_sub(elapsed);
            if remaining == 0 {
                return Transition::to(
                    phase,
                    vec![Effect::Notify(Notice::TimeUp), Effect::TimeoutDraw],
                );
            }
            let mut effects = Vec::new();
            if let Ok(secs) = u32::try_from(remaining) {
                if timing.time_checkpoints.contains(&secs) {
                    effects.push(Effect::Notify(Notice::TimeRemaining { seconds: secs }));
                }
            }
            effects.push(Effect::Schedule {
                delay: ONE_SECOND,
                wake: Wake::FightClock,
            });
            Transition::to(phase, effects)
        }

        _ => Transition::ignored(phase),
    }
}

/// Enter (or continue) the pre-teleport countdown with `remaining` seconds left.
fn pre_teleport(remaining: u32, timing: &PhaseTiming, effects: &mut Vec<Effect>) -> Phase {
    if remaining == 0 {
        effects.push(Effect::MoveIn);
        effects.push(Effect::Schedule {
            delay: timing.arrival_verify_delay,
            wake: Wake::VerifyArrival,
        });
        return Phase::VerifyingArrival { attempt: 1 };
    }
    effects.push(Effect::Notify(Notice::TeleportCountdown { seconds: remaining }));
    effects.push(Effect::Schedule {
        delay: ONE_SECOND,
        wake: Wake::Countdown,
    });
    Phase::PreTeleportCountdown { remaining }
}

/// Enter (or continue) the in-zone countdown with `remaining` seconds left.
fn in_zone(remaining: u32, now: Tick, effects: &mut Vec<Effect>) -> Phase {
    if remaining == 0 {
        effects.push(Effect::ApplyLoadouts);
        effects.push(Effect::Notify(Notice::Fight));
        effects.push(Effect::Schedule {
            delay: ONE_SECOND,
            wake: Wake::FightClock,
        });
        return Phase::Fighting { started_at: now };
    }
    effects.push(Effect::Notify(Notice::FightCountdown { seconds: remaining }));
    effects.push(Effect::Schedule {
        delay: ONE_SECOND,
        wake: Wake::Countdown,
    });
    Phase::InZoneCountdown { remaining }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn timing() -> PhaseTiming {
        PhaseTiming::default()
    }

    fn schedules(t: &Transition) -> Vec<(Ticks, Wake)> {
        t.effects
            .iter()
            .filter_map(|e| match e {
                Effect::Schedule { delay, wake } => Some((*delay, *wake)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn zone_ready_reserves_stake() {
        let t = advance(Phase::LoadingZone, Event::ZoneReady, Tick(0), &timing());
        assert_eq!(t.phase, Phase::SecuringStake);
        assert_eq!(t.effects, vec![Effect::ReserveStakes]);
    }

    #[test]
    fn zone_failure_cancels_without_touching_stake() {
        let t = advance(Phase::LoadingZone, Event::ZoneFailed, Tick(0), &timing());
        assert_eq!(t.phase, Phase::Cancelled);
        assert_eq!(t.effects, vec![Effect::Abort(AbortReason::ZoneUnavailable)]);
    }

    #[test]
    fn stake_secured_starts_pre_teleport_countdown() {
        let t = advance(Phase::SecuringStake, Event::StakeSecured, Tick(0), &timing());
        assert_eq!(t.phase, Phase::PreTeleportCountdown { remaining: 5 });
        assert_eq!(t.effects[0], Effect::InviteSpectators);
        assert!(t
            .effects
            .contains(&Effect::Notify(Notice::TeleportCountdown { seconds: 5 })));
        assert_eq!(schedules(&t), vec![(Ticks(20), Wake::Countdown)]);
    }

    #[test]
    fn full_countdown_reaches_fight() {
        let timing = timing();
        let mut now = Tick(0);
        let mut phase = advance(Phase::SecuringStake, Event::StakeSecured, now, &timing).phase;

        // Five pre-teleport seconds.
        for _ in 0..5 {
            now = now + Ticks(20);
            phase = advance(phase, Event::CountdownElapsed, now, &timing).phase;
        }
        assert_eq!(phase, Phase::VerifyingArrival { attempt: 1 });

        now = now + timing.arrival_verify_delay;
        let t = advance(phase, Event::ArrivalChecked { all_arrived: true }, now, &timing);
        assert_eq!(t.phase, Phase::InZoneCountdown { remaining: 10 });
        phase = t.phase;

        let mut saw_fight = false;
        for _ in 0..10 {
            now = now + Ticks(20);
            let t = advance(phase, Event::CountdownElapsed, now, &timing);
            if t.effects.contains(&Effect::ApplyLoadouts) {
                saw_fight = true;
                assert!(t.effects.contains(&Effect::Notify(Notice::Fight)));
            }
            phase = t.phase;
        }
        assert!(saw_fight);
        assert_eq!(phase, Phase::Fighting { started_at: now });
    }

    #[test]
    fn countdown_reaching_zero_moves_in() {
        let t = advance(
            Phase::PreTeleportCountdown { remaining: 1 },
            Event::CountdownElapsed,
            Tick(100),
            &timing(),
        );
        assert_eq!(t.phase, Phase::VerifyingArrival { attempt: 1 });
        assert_eq!(t.effects[0], Effect::MoveIn);
        assert_eq!(schedules(&t), vec![(Ticks(40), Wake::VerifyArrival)]);
    }

    #[test]
    fn missed_arrival_gets_one_emergency_teleport() {
        let timing = timing();
        let t = advance(
            Phase::VerifyingArrival { attempt: 1 },
            Event::ArrivalChecked { all_arrived: false },
            Tick(0),
            &timing,
        );
        assert_eq!(t.phase, Phase::VerifyingArrival { attempt: 2 });
        assert_eq!(t.effects[0], Effect::EmergencyMoveIn);
        assert_eq!(schedules(&t), vec![(Ticks(20), Wake::VerifyArrival)]);

        let t = advance(t.phase, Event::ArrivalChecked { all_arrived: false }, Tick(20), &timing);
        assert_eq!(t.phase, Phase::Cancelled);
        assert_eq!(t.effects, vec![Effect::Abort(AbortReason::TeleportFailed)]);
    }

    #[test]
    fn fight_clock_announces_checkpoints_and_times_out() {
        let mut timing = timing();
        timing.max_fight_secs = 61;
        let start = Tick(1_000);
        let phase = Phase::Fighting { started_at: start };

        let t = advance(phase, Event::FightClock, start + Ticks::from_secs(1), &timing);
        assert!(t
            .effects
            .contains(&Effect::Notify(Notice::TimeRemaining { seconds: 60 })));

        let t = advance(phase, Event::FightClock, start + Ticks::from_secs(2), &timing);
        assert_eq!(schedules(&t), vec![(Ticks(20), Wake::FightClock)]);
        assert_eq!(t.effects.len(), 1);

        let t = advance(phase, Event::FightClock, start + Ticks::from_secs(61), &timing);
        assert_eq!(t.phase, phase);
        assert_eq!(
            t.effects,
            vec![Effect::Notify(Notice::TimeUp), Effect::TimeoutDraw]
        );
    }

    #[test]
    fn settle_ends_from_any_live_phase() {
        for phase in [
            Phase::LoadingZone,
            Phase::PreTeleportCountdown { remaining: 3 },
            Phase::InZoneCountdown { remaining: 2 },
            Phase::Fighting { started_at: Tick(0) },
        ] {
            let t = advance(phase, Event::Settle, Tick(5), &timing());
            assert_eq!(t.phase, Phase::Ended);
            assert!(t.effects.is_empty());
        }
    }

    #[test]
    fn terminal_phases_ignore_everything() {
        for phase in [Phase::Ended, Phase::Cancelled] {
            for event in [
                Event::ZoneReady,
                Event::CountdownElapsed,
                Event::FightClock,
                Event::Settle,
                Event::Abort(AbortReason::TeleportFailed),
            ] {
                let t = advance(phase, event, Tick(0), &timing());
                assert!(t.is_noop(phase), "{phase:?} reacted to {event:?}");
            }
        }
    }

    #[test]
    fn stale_events_are_ignored() {
        let phase = Phase::Fighting { started_at: Tick(0) };
        let t = advance(phase, Event::CountdownElapsed, Tick(20), &timing());
        assert!(t.is_noop(phase));
        let t = advance(phase, Event::Abort(AbortReason::TeleportFailed), Tick(20), &timing());
        assert!(t.is_noop(phase));
        let t = advance(Phase::LoadingZone, Event::StakeSecured, Tick(0), &timing());
        assert!(t.is_noop(Phase::LoadingZone));
    }

    #[test]
    fn zero_length_countdowns_skip_straight_through() {
        let mut timing = timing();
        timing.pre_teleport_secs = 0;
        timing.in_zone_countdown_secs = 0;
        let t = advance(Phase::SecuringStake, Event::StakeSecured, Tick(0), &timing);
        assert_eq!(t.phase, Phase::VerifyingArrival { attempt: 1 });
        let t = advance(t.phase, Event::ArrivalChecked { all_arrived: true }, Tick(40), &timing);
        assert_eq!(t.phase, Phase::Fighting { started_at: Tick(40) });
    }
}
