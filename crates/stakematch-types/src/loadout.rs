//! Equipment loadouts applied to both participants before the fight.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{ItemStack, LoadoutId};

/// Armor slots, head to feet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArmorSlot {
    Helmet,
    Chestplate,
    Leggings,
    Boots,
}

/// An addressable equipment slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Slot {
    Armor(ArmorSlot),
    Inventory(u16),
}

/// A named set of items placed into specific slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loadout {
    pub id: LoadoutId,
    pub display_name: String,
    #[serde(default)]
    pub armor: BTreeMap<ArmorSlot, ItemStack>,
    #[serde(default)]
    pub inventory: BTreeMap<u16, ItemStack>,
}

impl Loadout {
    #[must_use]
    pub fn new(id: impl Into<LoadoutId>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            armor: BTreeMap::new(),
            inventory: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_armor(mut self, slot: ArmorSlot, item: ItemStack) -> Self {
        self.armor.insert(slot, item);
        self
    }

    #[must_use]
    pub fn with_item(mut self, index: u16, item: ItemStack) -> Self {
        self.inventory.insert(index, item);
        self
    }

    /// Every specified slot with its item, armor first.
    pub fn slots(&self) -> impl Iterator<Item = (Slot, &ItemStack)> {
        self.armor
            .iter()
            .map(|(s, i)| (Slot::Armor(*s), i))
            .chain(self.inventory.iter().map(|(n, i)| (Slot::Inventory(*n), i)))
    }

    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.armor.len() + self.inventory.len()
    }
}

/// True if `actual` is similar to `expected` with at least the same amount.
#[must_use]
pub fn slot_satisfied(actual: Option<&ItemStack>, expected: &ItemStack) -> bool {
    actual.is_some_and(|a| a.is_similar(expected) && a.amount >= expected.amount)
}
