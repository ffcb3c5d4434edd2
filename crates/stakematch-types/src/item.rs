//! Item stacks as seen by escrow and the loadout applier.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A stack of identical items.
///
/// `tag` carries whatever extra identity the host attaches to an item
/// (enchantments, custom names). Two stacks are "similar" when kind and tag
/// match; amounts may differ.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemStack {
    pub kind: String,
    pub amount: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl ItemStack {
    #[must_use]
    pub fn new(kind: impl Into<String>, amount: u32) -> Self {
        Self {
            kind: kind.into(),
            amount,
            tag: None,
        }
    }

    #[must_use]
    pub fn tagged(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    #[must_use]
    pub fn is_similar(&self, other: &ItemStack) -> bool {
        self.kind == other.kind && self.tag == other.tag
    }

    /// Key used for conservation accounting.
    #[must_use]
    pub fn ledger_key(&self) -> String {
        match &self.tag {
            Some(tag) => format!("{}#{tag}", self.kind),
            None => self.kind.clone(),
        }
    }
}

/// Sum item amounts per ledger key.
#[must_use]
pub fn tally(items: &[ItemStack]) -> BTreeMap<String, u64> {
    let mut totals = BTreeMap::new();
    for item in items {
        *totals.entry(item.ledger_key()).or_insert(0) += u64::from(item.amount);
    }
    totals
}
