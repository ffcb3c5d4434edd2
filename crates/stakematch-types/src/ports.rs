//! External collaborators.
//!
//! The orchestrator owns no world state of its own. Everything it reads or
//! mutates on the host (positions, inventories, balances, zones, stats)
//! goes through these traits, so hosts and tests plug in their own.
//!
//! All `Environment` calls happen on the tick thread. `ZoneProvisioner`
//! may complete its callbacks from any thread.

use std::fmt;

use rust_decimal::Decimal;

use crate::{ActorId, ItemStack, Location, Notice, Result, Slot, ZoneId, ZoneInfo};

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// The live world: actors, positions, inventories and currency.
pub trait Environment {
    // --- Actors & positions ---

    /// Current position, or `None` if the actor is offline / unknown.
    fn location(&self, actor: ActorId) -> Option<Location>;

    /// True while the actor is dead / downed and owned by the host's own
    /// recovery flow.
    fn is_incapacitated(&self, actor: ActorId) -> bool;

    fn relocate(&mut self, actor: ActorId, to: &Location) -> Result<()>;

    /// Metadata for a loaded zone, `None` if the zone is not loaded.
    fn zone_info(&self, zone: &ZoneId) -> Option<ZoneInfo>;

    /// Put the actor into combat mode (health, hunger, game mode).
    fn prepare_for_combat(&mut self, actor: ActorId);

    /// Undo `prepare_for_combat`.
    fn reset_after_match(&mut self, actor: ActorId);

    fn clear_status_effects(&mut self, actor: ActorId);

    // --- Inventory ---

    fn has_items(&self, actor: ActorId, items: &[ItemStack]) -> bool;

    fn can_fit(&self, actor: ActorId, items: &[ItemStack]) -> bool;

    /// All-or-nothing removal.
    fn remove_items(&mut self, actor: ActorId, items: &[ItemStack]) -> Result<()>;

    /// Adds as much as fits and returns whatever did not.
    fn give_items(&mut self, actor: ActorId, items: Vec<ItemStack>) -> Vec<ItemStack>;

    /// Drop items on the ground at the actor's position.
    fn drop_items(&mut self, actor: ActorId, items: Vec<ItemStack>);

    /// Empty inventory and armor slots.
    fn clear_equipment(&mut self, actor: ActorId);

    fn set_slot(&mut self, actor: ActorId, slot: Slot, item: ItemStack);

    fn slot(&self, actor: ActorId, slot: Slot) -> Option<ItemStack>;

    // --- Currency ---

    fn economy_enabled(&self) -> bool;

    fn balance(&self, actor: ActorId) -> Decimal;

    fn withdraw(&mut self, actor: ActorId, amount: Decimal) -> Result<()>;

    fn deposit(&mut self, actor: ActorId, amount: Decimal) -> Result<()>;

    // --- Messaging ---

    fn notify(&mut self, actor: ActorId, notice: Notice);

    /// Send to every online actor not in `except`.
    fn broadcast_except(&mut self, except: &[ActorId], notice: Notice);
}

// ---------------------------------------------------------------------------
// Zone provisioning
// ---------------------------------------------------------------------------

/// Result delivered to a [`ZoneCallback`].
pub type ZoneLoadResult = std::result::Result<ZoneInfo, String>;

type ZoneFn = Box<dyn FnOnce(ZoneLoadResult) + Send>;

/// One-shot completion handle passed to a [`ZoneProvisioner`].
///
/// `complete` consumes the handle, so it fires at most once. A handle that
/// is dropped without completing reports a failure, so the waiting match is
/// never left in limbo.
pub struct ZoneCallback {
    zone: ZoneId,
    on_ready: Option<ZoneFn>,
}

impl ZoneCallback {
    pub fn new(zone: ZoneId, on_ready: impl FnOnce(ZoneLoadResult) + Send + 'static) -> Self {
        Self {
            zone,
            on_ready: Some(Box::new(on_ready)),
        }
    }

    #[must_use]
    pub fn zone(&self) -> &ZoneId {
        &self.zone
    }

    pub fn complete(mut self, result: ZoneLoadResult) {
        if let Some(f) = self.on_ready.take() {
            f(result);
        }
    }

    pub fn succeed(self, info: ZoneInfo) {
        self.complete(Ok(info));
    }

    pub fn fail(self, reason: impl Into<String>) {
        self.complete(Err(reason.into()));
    }
}

impl Drop for ZoneCallback {
    fn drop(&mut self) {
        if let Some(f) = self.on_ready.take() {
            f(Err(format!("zone {} callback dropped without completing", self.zone)));
        }
    }
}

impl fmt::Debug for ZoneCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZoneCallback")
            .field("zone", &self.zone)
            .field("pending", &self.on_ready.is_some())
            .finish()
    }
}

/// Asynchronous zone lifecycle on the host.
pub trait ZoneProvisioner {
    fn load_zone(&mut self, zone: &ZoneId, on_ready: ZoneCallback);

    fn unload_zone(&mut self, zone: &ZoneId);

    fn regenerate_zone(&mut self, zone: &ZoneId);

    /// Replace `target` with a copy of `source`.
    fn clone_zone(&mut self, source: &ZoneId, target: &ZoneId, on_ready: ZoneCallback);
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Win / loss / draw counters. Failures are logged by the caller and
/// otherwise ignored.
pub trait StatsService {
    fn record_win(&mut self, actor: ActorId) -> Result<()>;

    fn record_loss(&mut self, actor: ActorId) -> Result<()>;

    fn record_draw(&mut self, actor: ActorId) -> Result<()>;
}

/// Stats sink that records nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoStats;

impl StatsService for NoStats {
    fn record_win(&mut self, _actor: ActorId) -> Result<()> {
        Ok(())
    }

    fn record_loss(&mut self, _actor: ActorId) -> Result<()> {
        Ok(())
    }

    fn record_draw(&mut self, _actor: ActorId) -> Result<()> {
        Ok(())
    }
}
