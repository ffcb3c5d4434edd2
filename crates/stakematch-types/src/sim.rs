//! Deterministic in-memory collaborators for tests.
//!
//! [`SimWorld`] implements [`Environment`] with fault injection,
//! [`ManualProvisioner`] holds zone callbacks until a test completes them,
//! [`RecordingStats`] remembers every stats call.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;

use crate::{
    ActorId, Environment, ItemStack, Location, Notice, Result, Slot, StakematchError,
    StatsService, ZoneCallback, ZoneId, ZoneInfo, ZoneProvisioner,
};

// ---------------------------------------------------------------------------
// SimWorld
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SimActor {
    pub location: Location,
    pub slots: BTreeMap<Slot, ItemStack>,
    pub balance: Decimal,
    pub incapacitated: bool,
    pub online: bool,
    pub in_combat: bool,
    pub notices: Vec<Notice>,
    saved_slots: Option<BTreeMap<Slot, ItemStack>>,
}

#[derive(Debug, Clone)]
pub struct SimWorld {
    pub actors: BTreeMap<ActorId, SimActor>,
    /// Loaded zones.
    pub zones: BTreeMap<ZoneId, ZoneInfo>,
    pub economy: bool,
    pub inventory_size: u16,
    /// Items dropped on the ground.
    pub ground: Vec<(Location, ItemStack)>,
    pub broadcasts: Vec<Notice>,
    /// Relocations to silently ignore, per actor.
    pub stuck: BTreeMap<ActorId, u32>,
    /// Relocations that land this far off target (x axis), per actor.
    pub drift: BTreeMap<ActorId, f64>,
    /// `set_slot` calls to silently ignore, per actor.
    pub slot_faults: BTreeMap<ActorId, u32>,
    pub set_slot_calls: BTreeMap<ActorId, u32>,
    pub failing_deposits: BTreeSet<ActorId>,
    pub failing_withdrawals: BTreeSet<ActorId>,
    pub relocations: Vec<(ActorId, Location)>,
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl SimWorld {
    #[must_use]
    pub fn new() -> Self {
        let mut zones = BTreeMap::new();
        let world = ZoneId::from("world");
        zones.insert(
            world.clone(),
            ZoneInfo {
                zone: world,
                spawn: Location::new("world", 0.0, 64.0, 0.0),
                min_height: -64.0,
            },
        );
        Self {
            actors: BTreeMap::new(),
            zones,
            economy: true,
            inventory_size: 36,
            ground: Vec::new(),
            broadcasts: Vec::new(),
            stuck: BTreeMap::new(),
            drift: BTreeMap::new(),
            slot_faults: BTreeMap::new(),
            set_slot_calls: BTreeMap::new(),
            failing_deposits: BTreeSet::new(),
            failing_withdrawals: BTreeSet::new(),
            relocations: Vec::new(),
        }
    }

    /// Add an online actor standing at `location` with `balance`.
    pub fn spawn_actor(&mut self, location: Location, balance: Decimal) -> ActorId {
        let id = ActorId::new();
        self.actors.insert(
            id,
            SimActor {
                location,
                slots: BTreeMap::new(),
                balance,
                incapacitated: false,
                online: true,
                in_combat: false,
                notices: Vec::new(),
                saved_slots: None,
            },
        );
        id
    }

    pub fn load(&mut self, info: ZoneInfo) {
        self.zones.insert(info.zone.clone(), info);
    }

    pub fn unload(&mut self, zone: &ZoneId) {
        self.zones.remove(zone);
    }

    #[must_use]
    pub fn actor(&self, id: ActorId) -> &SimActor {
        &self.actors[&id]
    }

    pub fn actor_mut(&mut self, id: ActorId) -> &mut SimActor {
        self.actors.get_mut(&id).expect("unknown sim actor")
    }

    pub fn grant(&mut self, id: ActorId, items: Vec<ItemStack>) {
        let leftovers = self.give_items(id, items);
        assert!(leftovers.is_empty(), "sim inventory full");
    }

    /// Every stack in the actor's inventory (armor included).
    #[must_use]
    pub fn items_of(&self, id: ActorId) -> Vec<ItemStack> {
        self.actor(id).slots.values().cloned().collect()
    }

    #[must_use]
    pub fn count_of(&self, id: ActorId, kind: &str) -> u64 {
        self.actor(id)
            .slots
            .values()
            .filter(|i| i.kind == kind)
            .map(|i| u64::from(i.amount))
            .sum()
    }

    #[must_use]
    pub fn balance_of(&self, id: ActorId) -> Decimal {
        self.actor(id).balance
    }

    #[must_use]
    pub fn notices_of(&self, id: ActorId) -> &[Notice] {
        &self.actor(id).notices
    }

    #[must_use]
    pub fn received(&self, id: ActorId, notice: &Notice) -> bool {
        self.notices_of(id).contains(notice)
    }

    #[must_use]
    pub fn ground_count(&self, kind: &str) -> u64 {
        self.ground
            .iter()
            .filter(|(_, i)| i.kind == kind)
            .map(|(_, i)| u64::from(i.amount))
            .sum()
    }

    fn free_slot(&self, id: ActorId) -> Option<u16> {
        let slots = &self.actors.get(&id)?.slots;
        (0..self.inventory_size).find(|n| !slots.contains_key(&Slot::Inventory(*n)))
    }

    fn free_slot_count(&self, id: ActorId) -> usize {
        self.actors.get(&id).map_or(0, |a| {
            (0..self.inventory_size)
                .filter(|n| !a.slots.contains_key(&Slot::Inventory(*n)))
                .count()
        })
    }
}

impl Environment for SimWorld {
    fn location(&self, actor: ActorId) -> Option<Location> {
        self.actors
            .get(&actor)
            .filter(|a| a.online)
            .map(|a| a.location.clone())
    }

    fn is_incapacitated(&self, actor: ActorId) -> bool {
        self.actors.get(&actor).is_some_and(|a| a.incapacitated)
    }

    fn relocate(&mut self, actor: ActorId, to: &Location) -> Result<()> {
        if !self.actors.get(&actor).is_some_and(|a| a.online) {
            return Err(StakematchError::ActorUnavailable(actor));
        }
        if !self.zones.contains_key(&to.zone) {
            return Err(StakematchError::RelocationFailed {
                actor,
                reason: format!("zone {} not loaded", to.zone),
            });
        }
        self.relocations.push((actor, to.clone()));
        if let Some(n) = self.stuck.get_mut(&actor) {
            if *n > 0 {
                *n -= 1;
                return Ok(());
            }
        }
        let mut target = to.clone();
        if let Some(dx) = self.drift.get(&actor) {
            target.x += dx;
        }
        self.actor_mut(actor).location = target;
        Ok(())
    }

    fn zone_info(&self, zone: &ZoneId) -> Option<ZoneInfo> {
        self.zones.get(zone).cloned()
    }

    fn prepare_for_combat(&mut self, actor: ActorId) {
        if let Some(a) = self.actors.get_mut(&actor) {
            a.in_combat = true;
            if a.saved_slots.is_none() {
                a.saved_slots = Some(a.slots.clone());
            }
        }
    }

    fn reset_after_match(&mut self, actor: ActorId) {
        if let Some(a) = self.actors.get_mut(&actor) {
            a.in_combat = false;
            if let Some(saved) = a.saved_slots.take() {
                a.slots = saved;
            }
        }
    }

    fn clear_status_effects(&mut self, _actor: ActorId) {}

    fn has_items(&self, actor: ActorId, items: &[ItemStack]) -> bool {
        let Some(a) = self.actors.get(&actor) else {
            return false;
        };
        let mut needed: BTreeMap<String, u64> = crate::item::tally(items);
        for held in a.slots.values() {
            if let Some(n) = needed.get_mut(&held.ledger_key()) {
                *n = n.saturating_sub(u64::from(held.amount));
            }
        }
        needed.values().all(|n| *n == 0)
    }

    fn can_fit(&self, actor: ActorId, items: &[ItemStack]) -> bool {
        self.free_slot_count(actor) >= items.len()
    }

    fn remove_items(&mut self, actor: ActorId, items: &[ItemStack]) -> Result<()> {
        if !self.has_items(actor, items) {
            return Err(StakematchError::ItemRemoval(actor));
        }
        let a = self.actor_mut(actor);
        for wanted in items {
            let mut left = wanted.amount;
            let keys: Vec<Slot> = a
                .slots
                .iter()
                .filter(|(_, i)| i.is_similar(wanted))
                .map(|(s, _)| *s)
                .collect();
            for key in keys {
                if left == 0 {
                    break;
                }
                if let Some(stack) = a.slots.get_mut(&key) {
                    let take = stack.amount.min(left);
                    stack.amount -= take;
                    left -= take;
                    if stack.amount == 0 {
                        a.slots.remove(&key);
                    }
                }
            }
        }
        Ok(())
    }

    fn give_items(&mut self, actor: ActorId, items: Vec<ItemStack>) -> Vec<ItemStack> {
        let mut leftovers = Vec::new();
        for item in items {
            match self.free_slot(actor) {
                Some(n) => {
                    self.actor_mut(actor).slots.insert(Slot::Inventory(n), item);
                }
                None => leftovers.push(item),
            }
        }
        leftovers
    }

    fn drop_items(&mut self, actor: ActorId, items: Vec<ItemStack>) {
        let at = self.actor(actor).location.clone();
        self.ground.extend(items.into_iter().map(|i| (at.clone(), i)));
    }

    fn clear_equipment(&mut self, actor: ActorId) {
        if let Some(a) = self.actors.get_mut(&actor) {
            a.slots.clear();
        }
    }

    fn set_slot(&mut self, actor: ActorId, slot: Slot, item: ItemStack) {
        *self.set_slot_calls.entry(actor).or_insert(0) += 1;
        if let Some(n) = self.slot_faults.get_mut(&actor) {
            if *n > 0 {
                *n -= 1;
                return;
            }
        }
        if let Some(a) = self.actors.get_mut(&actor) {
            a.slots.insert(slot, item);
        }
    }

    fn slot(&self, actor: ActorId, slot: Slot) -> Option<ItemStack> {
        self.actors.get(&actor)?.slots.get(&slot).cloned()
    }

    fn economy_enabled(&self) -> bool {
        self.economy
    }

    fn balance(&self, actor: ActorId) -> Decimal {
        self.actors.get(&actor).map_or(Decimal::ZERO, |a| a.balance)
    }

    fn withdraw(&mut self, actor: ActorId, amount: Decimal) -> Result<()> {
        if self.failing_withdrawals.contains(&actor) {
            return Err(StakematchError::Withdrawal {
                actor,
                reason: "economy rejected withdrawal".into(),
            });
        }
        let a = self.actor_mut(actor);
        if a.balance < amount {
            return Err(StakematchError::InsufficientFunds {
                actor,
                needed: amount,
                available: a.balance,
            });
        }
        a.balance -= amount;
        Ok(())
    }

    fn deposit(&mut self, actor: ActorId, amount: Decimal) -> Result<()> {
        if self.failing_deposits.contains(&actor) {
            return Err(StakematchError::Deposit {
                actor,
                reason: "economy rejected deposit".into(),
            });
        }
        self.actor_mut(actor).balance += amount;
        Ok(())
    }

    fn notify(&mut self, actor: ActorId, notice: Notice) {
        if let Some(a) = self.actors.get_mut(&actor) {
            a.notices.push(notice);
        }
    }

    fn broadcast_except(&mut self, except: &[ActorId], notice: Notice) {
        self.broadcasts.push(notice.clone());
        for (id, a) in &mut self.actors {
            if a.online && !except.contains(id) {
                a.notices.push(notice.clone());
            }
        }
    }
}

// ---------------------------------------------------------------------------
// ManualProvisioner
// ---------------------------------------------------------------------------

/// How [`ManualProvisioner`] answers load / clone requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProvisionMode {
    /// Hold callbacks until the test completes them.
    #[default]
    Manual,
    /// Succeed immediately with a default zone layout.
    AutoSucceed,
    /// Fail immediately.
    AutoFail,
}

/// A provisioner call, as recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoneCall {
    Load(ZoneId),
    Unload(ZoneId),
    Regenerate(ZoneId),
    Clone { source: ZoneId, target: ZoneId },
}

#[derive(Debug, Default)]
pub struct ManualProvisioner {
    pub mode: ProvisionMode,
    pub calls: Vec<ZoneCall>,
    pending: Vec<ZoneCallback>,
}

impl ManualProvisioner {
    #[must_use]
    pub fn new(mode: ProvisionMode) -> Self {
        Self {
            mode,
            calls: Vec::new(),
            pending: Vec::new(),
        }
    }

    /// Default layout reported for `zone`: spawn at the origin, floor at 0.
    #[must_use]
    pub fn layout(zone: &ZoneId) -> ZoneInfo {
        ZoneInfo {
            zone: zone.clone(),
            spawn: Location::new(zone.clone(), 0.0, 64.0, 0.0),
            min_height: 0.0,
        }
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Complete every held callback successfully and mark the zones loaded.
    pub fn succeed_all(&mut self, world: &mut SimWorld) {
        for cb in self.pending.drain(..) {
            let info = Self::layout(cb.zone());
            world.load(info.clone());
            cb.succeed(info);
        }
    }

    pub fn fail_all(&mut self, reason: &str) {
        for cb in self.pending.drain(..) {
            cb.fail(reason);
        }
    }

    fn answer(&mut self, cb: ZoneCallback) {
        match self.mode {
            ProvisionMode::Manual => self.pending.push(cb),
            ProvisionMode::AutoSucceed => {
                let info = Self::layout(cb.zone());
                cb.succeed(info);
            }
            ProvisionMode::AutoFail => cb.fail("provisioning disabled"),
        }
    }

    #[must_use]
    pub fn count(&self, call: &ZoneCall) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }
}

impl ZoneProvisioner for ManualProvisioner {
    fn load_zone(&mut self, zone: &ZoneId, on_ready: ZoneCallback) {
        self.calls.push(ZoneCall::Load(zone.clone()));
        self.answer(on_ready);
    }

    fn unload_zone(&mut self, zone: &ZoneId) {
        self.calls.push(ZoneCall::Unload(zone.clone()));
    }

    fn regenerate_zone(&mut self, zone: &ZoneId) {
        self.calls.push(ZoneCall::Regenerate(zone.clone()));
    }

    fn clone_zone(&mut self, source: &ZoneId, target: &ZoneId, on_ready: ZoneCallback) {
        self.calls.push(ZoneCall::Clone {
            source: source.clone(),
            target: target.clone(),
        });
        self.answer(on_ready);
    }
}

// ---------------------------------------------------------------------------
// RecordingStats
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone)]
pub struct RecordingStats {
    pub wins: Vec<ActorId>,
    pub losses: Vec<ActorId>,
    pub draws: Vec<ActorId>,
    /// Every call fails after recording.
    pub failing: bool,
}

impl RecordingStats {
    fn outcome(&self) -> Result<()> {
        if self.failing {
            Err(StakematchError::Internal("stats backend offline".into()))
        } else {
            Ok(())
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.wins.len() + self.losses.len() + self.draws.len()
    }
}

impl StatsService for RecordingStats {
    fn record_win(&mut self, actor: ActorId) -> Result<()> {
        self.wins.push(actor);
        self.outcome()
    }

    fn record_loss(&mut self, actor: ActorId) -> Result<()> {
        self.losses.push(actor);
        self.outcome()
    }

    fn record_draw(&mut self, actor: ActorId) -> Result<()> {
        self.draws.push(actor);
        self.outcome()
    }
}
