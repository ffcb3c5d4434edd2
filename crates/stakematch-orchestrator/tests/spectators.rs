//! Integration test: spectators and combat gating.

mod common;

use common::*;
use stakematch_types::{Location, Notice, StakematchError, Wager, ZoneId};

#[test]
fn combat_is_gated_by_phase_and_role() {
    let mut h = Harness::new();
    let (x, y) = (h.x, h.y);
    let watcher = h.world_mut().spawn_actor(origin_x(), dec(0));
    let stranger = h.world_mut().spawn_actor(origin_y(), dec(0));

    // No match: nothing to gate.
    assert!(h.orch.combat_allowed(x, y));

    let id = h.start(Wager::none(), Wager::none());
    h.orch.add_spectator(id, watcher).unwrap();
    assert!(!h.orch.combat_allowed(x, y), "no damage before the fight");

    h.run_until_fighting(id);
    assert!(h.orch.combat_allowed(x, y));
    assert!(h.orch.combat_allowed(y, x));
    assert!(!h.orch.combat_allowed(watcher, x));
    assert!(!h.orch.combat_allowed(x, watcher));
    assert!(h.orch.combat_allowed(stranger, x));

    h.orch.end_match(id, None, true).unwrap();
    assert!(!h.orch.combat_allowed(x, y), "no damage after the fight");
}

#[test]
fn spectators_are_invited_and_returned() {
    let mut h = Harness::new();
    let watcher = h.world_mut().spawn_actor(origin_x(), dec(0));
    let id = h.start(Wager::none(), Wager::none());
    h.orch.tick();

    // Invite goes to everyone except the participants.
    assert!(h
        .world()
        .notices_of(watcher)
        .iter()
        .any(|n| matches!(n, Notice::SpectateInvite { match_id, .. } if *match_id == id)));
    assert!(!h
        .world()
        .notices_of(h.x)
        .iter()
        .any(|n| matches!(n, Notice::SpectateInvite { .. })));

    h.orch.add_spectator(id, watcher).unwrap();
    assert!(h.orch.is_committed(watcher));
    assert_eq!(h.orch.match_of(watcher), Some(id));

    // The spectate flow moves them in and tells us.
    h.world_mut().actor_mut(watcher).location = Location::new(ZONE, 0.0, 70.0, 0.0);
    assert!(h.orch.mark_relocated(watcher));

    h.run_until_fighting(id);
    h.orch.end_match(id, Some(h.x), false).unwrap();
    h.run_until_gone(id);

    assert!(!h.orch.is_committed(watcher));
    assert_eq!(h.location_of(watcher), origin_x());
}

#[test]
fn spectator_can_leave_early() {
    let mut h = Harness::new();
    let watcher = h.world_mut().spawn_actor(origin_x(), dec(0));
    let id = h.start(Wager::none(), Wager::none());
    h.orch.add_spectator(id, watcher).unwrap();
    h.world_mut().actor_mut(watcher).location = Location::new(ZONE, 0.0, 70.0, 0.0);
    h.orch.mark_relocated(watcher);

    assert!(h.orch.remove_spectator(watcher));
    assert!(!h.orch.is_committed(watcher));
    assert_eq!(h.location_of(watcher).zone, ZoneId::from("world"));
    assert!(!h.orch.remove_spectator(watcher));
}

#[test]
fn spectator_attach_rules() {
    let mut h = Harness::new();
    let (x, y) = (h.x, h.y);
    let id = h.start(Wager::none(), Wager::none());

    assert!(matches!(
        h.orch.add_spectator(id, x),
        Err(StakematchError::AlreadyInMatch { .. })
    ));

    h.run_until_fighting(id);
    h.orch.end_match(id, Some(y), false).unwrap();
    let late = h.world_mut().spawn_actor(origin_x(), dec(0));
    assert!(matches!(
        h.orch.add_spectator(id, late),
        Err(StakematchError::MatchNotFound(_))
    ));
}
