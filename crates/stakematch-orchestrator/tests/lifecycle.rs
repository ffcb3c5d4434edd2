//! Integration test: match lifecycle from agreement to cleanup.
//!
//! LoadingZone → SecuringStake → countdowns → Fighting → Ended, plus the
//! cancellation paths (zone failure, teleport failure) and start checks.

mod common;

use common::*;
use stakematch_orchestrator::{Finality, MatchTask};
use stakematch_types::sim::ZoneCall;
use stakematch_types::{
    AbortReason, ArenaCatalog, ArenaId, ItemStack, MatchState, Notice, Phase, StakematchError,
    Wager, ZoneId,
};

// =====================================================================
// Happy path
// =====================================================================

#[test]
fn no_wager_match_runs_to_cleanup() {
    let mut h = Harness::new();
    let (x, y) = (h.x, h.y);
    let id = h.start(Wager::none(), Wager::none());

    assert_eq!(h.orch.phase_of(id), Some(Phase::LoadingZone));
    assert!(h.orch.is_committed(x));
    assert!(h.world().received(x, &Notice::NoWagerMode));
    assert!(h.world().received(y, &Notice::PreparingArena {
        arena: ArenaId::from(ARENA)
    }));

    h.run_until_fighting(id);
    assert!(h.in_arena(x) && h.in_arena(y));
    assert!(h.world().received(x, &Notice::TeleportCountdown { seconds: 1 }));
    assert!(h.world().received(y, &Notice::FightCountdown { seconds: 1 }));
    assert!(h.world().received(x, &Notice::Fight));

    // Loadout replaced the inventory for the fight.
    assert_eq!(h.world().count_of(x, "iron_sword"), 1);
    assert_eq!(h.world().count_of(x, "diamond_sword"), 0);

    assert!(h.orch.end_match(id, Some(x), false).unwrap());
    assert_eq!(h.orch.state_of(id), Some(MatchState::Ended));
    assert!(h.world().received(x, &Notice::Victory { opponent: y }));
    assert!(h.world().received(y, &Notice::Defeat { opponent: x }));
    assert_eq!(h.orch.stats().wins, vec![x]);
    assert_eq!(h.orch.stats().losses, vec![y]);

    // Combat snapshot restored, both home.
    assert_eq!(h.world().count_of(x, "diamond_sword"), 1);
    assert_eq!(h.world().count_of(x, "iron_sword"), 0);
    assert_eq!(h.location_of(x), origin_x());
    assert_eq!(h.location_of(y), origin_y());

    h.run_until_gone(id);
    assert_eq!(h.orch.active_match_count(), 0);
    assert!(!h.orch.is_committed(x));
    assert!(!h.orch.is_committed(y));

    // Zone reset survives cleanup.
    h.orch.run_ticks(40);
    let clone = ZoneCall::Clone {
        source: ZoneId::from(TEMPLATE),
        target: ZoneId::from(ZONE),
    };
    assert_eq!(h.orch.provisioner().count(&clone), 1);
}

#[test]
fn stakes_leave_inventories_before_teleport() {
    let mut h = Harness::new();
    let (x, y) = (h.x, h.y);
    let id = h.start_staked();

    // Nothing is touched while the zone loads.
    assert_eq!(h.world().count_of(x, "diamond_sword"), 1);
    assert_eq!(h.world().balance_of(x), dec(500));

    h.orch.tick();
    assert!(matches!(
        h.orch.phase_of(id),
        Some(Phase::PreTeleportCountdown { .. })
    ));
    assert_eq!(h.world().count_of(x, "diamond_sword"), 0);
    assert_eq!(h.world().balance_of(x), dec(400));
    assert_eq!(h.world().balance_of(y), dec(450));
    assert!(!h.world().broadcasts.is_empty(), "spectate invite broadcast");
}

#[test]
fn fight_loadout_is_verified_and_retried() {
    let mut h = Harness::new();
    let x = h.x;
    let id = h.start(Wager::none(), Wager::none());
    h.run_until_fighting(id);

    // Next verification finds dropped slots and re-applies.
    h.world_mut().actor_mut(x).slots.clear();
    h.orch.run_ticks(5);
    assert_eq!(h.world().count_of(x, "iron_sword"), 1);
    assert!(!h.world().received(x, &Notice::LoadoutUnverified));
}

// =====================================================================
// Start checks
// =====================================================================

#[test]
fn start_rejects_bad_agreements() {
    let mut h = Harness::new();
    let (x, y) = (h.x, h.y);

    let mut self_match = h.agreement(Wager::none(), Wager::none());
    self_match.participants.opponent = x;
    assert!(matches!(
        h.orch.start_match(self_match),
        Err(StakematchError::SelfMatch(_))
    ));

    let mut unknown = h.agreement(Wager::none(), Wager::none());
    unknown.arena = ArenaId::from("volcano");
    assert!(matches!(
        h.orch.start_match(unknown),
        Err(StakematchError::UnknownArena(_))
    ));

    let broke = h.agreement(Wager::none(), Wager::new(vec![], dec(10_000)));
    assert!(matches!(
        h.orch.start_match(broke),
        Err(StakematchError::InsufficientFunds { .. })
    ));

    let missing = h.agreement(Wager::none(), Wager::new(vec![ItemStack::new("elytra", 1)], dec(0)));
    assert!(matches!(
        h.orch.start_match(missing),
        Err(StakematchError::MissingStakeItems(a)) if a == y
    ));
    assert_eq!(h.orch.active_match_count(), 0);

    let id = h.start(Wager::none(), Wager::none());
    let again = h.agreement(Wager::none(), Wager::none());
    assert!(matches!(
        h.orch.start_match(again),
        Err(StakematchError::AlreadyInMatch { existing, .. }) if existing == id
    ));
}

// =====================================================================
// Cancellation
// =====================================================================

#[test]
fn zone_failure_cancels_without_touching_anyone() {
    let mut h = Harness::manual_zones();
    let (x, y) = (h.x, h.y);
    let id = h.start_staked();
    assert_eq!(h.orch.provisioner().pending(), 1);

    h.orch.provisioner_mut().fail_all("disk full");
    h.orch.tick();

    assert_eq!(h.orch.active_match_count(), 0);
    assert!(h.orch.is_settled(id));
    assert!(h.world().received(x, &Notice::Failure(AbortReason::ZoneUnavailable)));
    assert!(h.world().received(y, &Notice::Failure(AbortReason::ZoneUnavailable)));
    assert_eq!(h.world().count_of(x, "diamond_sword"), 1);
    assert_eq!(h.world().balance_of(x), dec(500));
    assert_eq!(h.world().balance_of(y), dec(500));
    assert!(h.world().relocations.is_empty());

    // Never loaded, so never reset.
    h.orch.run_ticks(100);
    assert_eq!(h.orch.provisioner().calls.len(), 1);
    assert!(!h.orch.end_match(id, Some(x), false).unwrap());
}

#[test]
fn inventory_filled_while_zone_loads_cancels_match() {
    let mut h = Harness::manual_zones();
    let (x, y) = (h.x, h.y);
    let id = h.start_staked();

    // Y no longer has room for X's sword when the zone comes up.
    let dirt = (0..36).map(|_| ItemStack::new("dirt", 64)).collect();
    h.world_mut().grant(y, dirt);
    let mut world = std::mem::take(h.world_mut());
    h.orch.provisioner_mut().succeed_all(&mut world);
    *h.world_mut() = world;
    h.orch.tick();

    assert!(h.orch.snapshot(id).is_none());
    assert_eq!(
        h.orch.finality_of(id),
        Some(Finality::Cancelled(AbortReason::StakeRejected))
    );
    assert!(h.world().received(x, &Notice::Failure(AbortReason::StakeRejected)));
    assert!(h.world().received(y, &Notice::Failure(AbortReason::StakeRejected)));
    assert_eq!(h.world().count_of(x, "diamond_sword"), 1);
    assert_eq!(h.world().ground_count("diamond_sword"), 0);
    assert_eq!(h.world().balance_of(x), dec(500));
    assert_eq!(h.world().balance_of(y), dec(500));
    assert!(h.world().relocations.is_empty());
}

#[test]
fn late_zone_ready_starts_countdown() {
    let mut h = Harness::manual_zones();
    let id = h.start(Wager::none(), Wager::none());
    h.orch.run_ticks(30);
    assert_eq!(h.orch.phase_of(id), Some(Phase::LoadingZone));

    let mut world = std::mem::take(h.world_mut());
    h.orch.provisioner_mut().succeed_all(&mut world);
    *h.world_mut() = world;

    h.run_until_fighting(id);
}

#[test]
fn missed_arrival_gets_emergency_teleport() {
    let mut h = Harness::new();
    let (x, y) = (h.x, h.y);
    // First move into the arena is silently ignored.
    h.world_mut().stuck.insert(x, 1);
    let id = h.start(Wager::none(), Wager::none());

    h.run_until_fighting(id);
    assert!(h.in_arena(x) && h.in_arena(y));
    let moves_x = h.world().relocations.iter().filter(|(a, _)| *a == x).count();
    let moves_y = h.world().relocations.iter().filter(|(a, _)| *a == y).count();
    assert_eq!(moves_x, 2);
    assert_eq!(moves_y, 1);
}

#[test]
fn repeated_missed_arrival_cancels_and_refunds() {
    let mut h = Harness::new();
    let (x, y) = (h.x, h.y);
    h.world_mut().stuck.insert(x, 10);
    let id = h.start_staked();

    assert!(h.run_until(200, |o| o.snapshot(id).is_none()));
    assert!(h.world().received(x, &Notice::Failure(AbortReason::TeleportFailed)));
    assert!(h.world().received(y, &Notice::Failure(AbortReason::TeleportFailed)));

    // Stakes back, Y (who did arrive) sent home.
    assert_eq!(h.world().count_of(x, "diamond_sword"), 1);
    assert_eq!(h.world().balance_of(x), dec(500));
    assert_eq!(h.world().balance_of(y), dec(500));
    assert_eq!(h.location_of(y), origin_y());
    assert!(!h.in_arena(x));

    // The zone was loaded, so it is reset.
    h.orch.run_ticks(80);
    let clone = ZoneCall::Clone {
        source: ZoneId::from(TEMPLATE),
        target: ZoneId::from(ZONE),
    };
    assert_eq!(h.orch.provisioner().count(&clone), 1);
}

#[test]
fn cancelled_refund_overflow_lands_at_home() {
    let mut h = Harness::new();
    let (x, y) = (h.x, h.y);
    h.world_mut().stuck.insert(y, 10);
    let id = h.start_staked();
    h.orch.run_ticks(2);
    assert!(h.orch.snapshot(id).unwrap().custody().owns_stake());

    // X's freed sword slot is taken while the match runs.
    let dirt = (0..35).map(|_| ItemStack::new("dirt", 64)).collect();
    h.world_mut().grant(x, dirt);

    assert!(h.run_until(200, |o| o.snapshot(id).is_none()));
    assert_eq!(h.location_of(x), origin_x());
    assert_eq!(h.world().count_of(x, "diamond_sword"), 0);
    let dropped: Vec<_> = h
        .world()
        .ground
        .iter()
        .filter(|(_, stack)| stack.kind == "diamond_sword")
        .map(|(at, _)| at.zone.clone())
        .collect();
    assert_eq!(dropped, vec![ZoneId::from("world")]);
}

#[test]
fn settled_match_drops_its_pending_tasks() {
    let mut h = Harness::new();
    let x = h.x;
    let id = h.start(Wager::none(), Wager::none());
    h.run_until_fighting(id);
    assert!(h
        .orch
        .pending_tasks(id)
        .iter()
        .any(|t| matches!(t, MatchTask::VerifyLoadout { .. })));

    h.orch.forfeit(x).unwrap();
    let pending = h.orch.pending_tasks(id);
    assert!(pending.iter().all(|t| !matches!(
        t,
        MatchTask::VerifyLoadout { .. } | MatchTask::Phase(_)
    )));
    assert!(pending.contains(&MatchTask::Cleanup));
}

// =====================================================================
// Catalog
// =====================================================================

#[test]
fn catalog_from_json_matches_fixture() {
    let json = serde_json::json!({
        "arenas": {
            ARENA: {
                "id": ARENA,
                "display_name": "Desert",
                "zone": ZONE,
                "spawns": {
                    "challenger": { "zone": ZONE, "x": 5.0, "y": 64.0, "z": 0.0 },
                    "opponent": { "zone": ZONE, "x": -5.0, "y": 64.0, "z": 0.0 }
                },
                "reset": { "mode": "clone_from", "source": TEMPLATE }
            }
        },
        "loadouts": {
            KIT: {
                "id": KIT,
                "display_name": "Knight",
                "armor": { "chestplate": { "kind": "iron_chestplate", "amount": 1 } },
                "inventory": { "0": { "kind": "iron_sword", "amount": 1 } }
            }
        }
    });
    let parsed = ArenaCatalog::from_json_str(&json.to_string()).unwrap();
    assert_eq!(parsed, catalog());

    let broken = json.to_string().replace(r#""id":"desert""#, r#""id":"canyon""#);
    assert!(matches!(
        ArenaCatalog::from_json_str(&broken),
        Err(StakematchError::Configuration(_))
    ));
}
