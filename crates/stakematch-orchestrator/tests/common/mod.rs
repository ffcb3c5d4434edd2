//! Shared fixtures: a one-arena catalog, a short-timed config and a
//! harness wrapping the orchestrator over the in-memory world.

#![allow(dead_code)]

use rust_decimal::Decimal;
use stakematch_orchestrator::MatchOrchestrator;
use stakematch_types::sim::{ManualProvisioner, ProvisionMode, RecordingStats, SimWorld};
use stakematch_types::{
    ActorId, Agreement, ArenaCatalog, ArenaConfig, ArenaId, ArmorSlot, ItemStack, Loadout,
    LoadoutId, Location, MatchId, MatchState, OrchestratorConfig, PhaseTiming, Sides, Ticks,
    Wager, ZoneId, ZoneResetPolicy,
};
use tracing_subscriber::EnvFilter;

pub const ARENA: &str = "desert";
pub const ZONE: &str = "arena_desert";
pub const TEMPLATE: &str = "desert_template";
pub const KIT: &str = "knight";

pub type Orchestrator = MatchOrchestrator<SimWorld, ManualProvisioner, RecordingStats>;

pub fn dec(n: i64) -> Decimal {
    Decimal::new(n, 0)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// One-second countdowns, a three-second fight and short settlement delays.
pub fn fast_config() -> OrchestratorConfig {
    OrchestratorConfig {
        timing: PhaseTiming {
            pre_teleport_secs: 1,
            in_zone_countdown_secs: 1,
            max_fight_secs: 3,
            time_checkpoints: vec![2],
            arrival_verify_delay: Ticks(2),
            emergency_verify_delay: Ticks(2),
            cleanup_delay: Ticks(40),
            zone_reset_delay: Ticks(60),
            draw_vote_window: Ticks(100),
            ..PhaseTiming::default()
        },
        ..OrchestratorConfig::default()
    }
}

pub fn knight() -> Loadout {
    Loadout::new(KIT, "Knight")
        .with_armor(ArmorSlot::Chestplate, ItemStack::new("iron_chestplate", 1))
        .with_item(0, ItemStack::new("iron_sword", 1))
}

pub fn catalog() -> ArenaCatalog {
    let mut catalog = ArenaCatalog::default();
    catalog.insert_arena(ArenaConfig {
        id: ArenaId::from(ARENA),
        display_name: "Desert".into(),
        zone: ZoneId::from(ZONE),
        spawns: Sides::new(
            Location::new(ZONE, 5.0, 64.0, 0.0),
            Location::new(ZONE, -5.0, 64.0, 0.0),
        ),
        fallback_spawn: None,
        reset: ZoneResetPolicy::CloneFrom {
            source: ZoneId::from(TEMPLATE),
        },
        allowed_loadouts: vec![],
    });
    catalog.insert_loadout(knight());
    catalog
}

pub fn origin_x() -> Location {
    Location::new("world", 10.0, 64.0, 10.0)
}

pub fn origin_y() -> Location {
    Location::new("world", -10.0, 64.0, -10.0)
}

/// X starts with a diamond sword and two gold ingots, both with 500 coins.
pub struct Harness {
    pub orch: Orchestrator,
    pub x: ActorId,
    pub y: ActorId,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(fast_config(), ProvisionMode::AutoSucceed)
    }

    pub fn with_config(config: OrchestratorConfig) -> Self {
        Self::build(config, ProvisionMode::AutoSucceed)
    }

    pub fn manual_zones() -> Self {
        Self::build(fast_config(), ProvisionMode::Manual)
    }

    fn build(config: OrchestratorConfig, mode: ProvisionMode) -> Self {
        init_tracing();
        let mut world = SimWorld::new();
        if mode == ProvisionMode::AutoSucceed {
            world.load(ManualProvisioner::layout(&ZoneId::from(ZONE)));
        }
        let x = world.spawn_actor(origin_x(), dec(500));
        let y = world.spawn_actor(origin_y(), dec(500));
        world.grant(
            x,
            vec![
                ItemStack::new("diamond_sword", 1),
                ItemStack::new("gold_ingot", 2),
            ],
        );
        let orch = MatchOrchestrator::new(
            config,
            catalog(),
            world,
            ManualProvisioner::new(mode),
            RecordingStats::default(),
        );
        Self { orch, x, y }
    }

    pub fn world(&self) -> &SimWorld {
        self.orch.environment()
    }

    pub fn world_mut(&mut self) -> &mut SimWorld {
        self.orch.environment_mut()
    }

    pub fn agreement(&self, x_wager: Wager, y_wager: Wager) -> Agreement {
        Agreement {
            participants: Sides::new(self.x, self.y),
            arena: ArenaId::from(ARENA),
            loadouts: Sides::new(LoadoutId::from(KIT), LoadoutId::from(KIT)),
            wagers: Sides::new(x_wager, y_wager),
        }
    }

    pub fn start(&mut self, x_wager: Wager, y_wager: Wager) -> MatchId {
        let agreement = self.agreement(x_wager, y_wager);
        self.orch.start_match(agreement).expect("match starts")
    }

    /// X bets the sword and 100 coins, Y bets 50 coins.
    pub fn start_staked(&mut self) -> MatchId {
        self.start(
            Wager::new(vec![ItemStack::new("diamond_sword", 1)], dec(100)),
            Wager::new(vec![], dec(50)),
        )
    }

    /// Tick until `pred` holds, at most `max` ticks.
    pub fn run_until(&mut self, max: u64, mut pred: impl FnMut(&Orchestrator) -> bool) -> bool {
        for _ in 0..max {
            if pred(&self.orch) {
                return true;
            }
            self.orch.tick();
        }
        pred(&self.orch)
    }

    pub fn run_until_fighting(&mut self, id: MatchId) {
        assert!(
            self.run_until(200, |o| o.state_of(id) == Some(MatchState::Fighting)),
            "match never reached the fight"
        );
    }

    /// Run until the match has been cleaned up.
    pub fn run_until_gone(&mut self, id: MatchId) {
        assert!(
            self.run_until(400, |o| o.snapshot(id).is_none()),
            "match never cleaned up"
        );
    }

    pub fn location_of(&self, actor: ActorId) -> Location {
        self.world().actor(actor).location.clone()
    }

    pub fn in_arena(&self, actor: ActorId) -> bool {
        self.location_of(actor).zone.as_str() == ZONE
    }
}
