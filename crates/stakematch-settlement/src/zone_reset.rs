//! Arena zone restoration after a match.

use serde::{Deserialize, Serialize};
use stakematch_types::{ArenaConfig, ZoneId, ZoneResetPolicy};

/// The provisioner call that restores an arena zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoneResetAction {
    /// Copy `source` over `target`.
    Clone { source: ZoneId, target: ZoneId },
    Regenerate(ZoneId),
    Unload(ZoneId),
}

impl ZoneResetAction {
    /// Pick the action for `arena`. A clone source equal to the arena zone
    /// itself degrades to a plain unload.
    #[must_use]
    pub fn for_arena(arena: &ArenaConfig) -> Self {
        match &arena.reset {
            ZoneResetPolicy::CloneFrom { source } if *source != arena.zone => Self::Clone {
                source: source.clone(),
                target: arena.zone.clone(),
            },
            ZoneResetPolicy::CloneFrom { .. } | ZoneResetPolicy::Unload => {
                Self::Unload(arena.zone.clone())
            }
            ZoneResetPolicy::Regenerate => Self::Regenerate(arena.zone.clone()),
        }
    }

    #[must_use]
    pub fn zone(&self) -> &ZoneId {
        match self {
            Self::Clone { target, .. } => target,
            Self::Regenerate(zone) | Self::Unload(zone) => zone,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stakematch_types::{ArenaId, Location, Sides};

    fn arena(reset: ZoneResetPolicy) -> ArenaConfig {
        ArenaConfig {
            id: ArenaId::from("desert"),
            display_name: "Desert".into(),
            zone: ZoneId::from("arena_desert"),
            spawns: Sides::new(
                Location::new("arena_desert", 5.0, 64.0, 0.0),
                Location::new("arena_desert", -5.0, 64.0, 0.0),
            ),
            fallback_spawn: None,
            reset,
            allowed_loadouts: vec![],
        }
    }

    #[test]
    fn clone_targets_arena_zone() {
        let action = ZoneResetAction::for_arena(&arena(ZoneResetPolicy::CloneFrom {
            source: ZoneId::from("desert_template"),
        }));
        assert_eq!(
            action,
            ZoneResetAction::Clone {
                source: ZoneId::from("desert_template"),
                target: ZoneId::from("arena_desert"),
            }
        );
        assert_eq!(action.zone().as_str(), "arena_desert");
    }

    #[test]
    fn self_clone_becomes_unload() {
        let action = ZoneResetAction::for_arena(&arena(ZoneResetPolicy::CloneFrom {
            source: ZoneId::from("arena_desert"),
        }));
        assert_eq!(action, ZoneResetAction::Unload(ZoneId::from("arena_desert")));
    }

    #[test]
    fn regenerate_and_unload() {
        assert_eq!(
            ZoneResetAction::for_arena(&arena(ZoneResetPolicy::Regenerate)),
            ZoneResetAction::Regenerate(ZoneId::from("arena_desert"))
        );
        assert_eq!(
            ZoneResetAction::for_arena(&arena(ZoneResetPolicy::Unload)),
            ZoneResetAction::Unload(ZoneId::from("arena_desert"))
        );
    }
}
