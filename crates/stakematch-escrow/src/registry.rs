//! Match registry: the single source of truth for participant commitment.
//!
//! Every compound operation (register both participants, attach a
//! spectator, remove a match and all of its members) runs under one
//! `parking_lot::Mutex`, so membership and match records never disagree.
//! The registry is shared as `Arc<MatchRegistry>`.

use std::collections::HashMap;

use parking_lot::Mutex;
use stakematch_types::{
    ActorId, Location, MatchId, MatchRecord, Phase, Result, Spectator, StakematchError,
};
use tracing::debug;

#[derive(Debug, Default)]
struct RegistryInner {
    matches: HashMap<MatchId, MatchRecord>,
    /// Participants and spectators → match.
    members: HashMap<ActorId, MatchId>,
}

#[derive(Debug, Default)]
pub struct MatchRegistry {
    inner: Mutex<RegistryInner>,
}

impl MatchRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new match.
    ///
    /// # Errors
    /// - `SelfMatch` if both sides are the same actor
    /// - `AlreadyInMatch` if either participant is already committed
    pub fn register(&self, record: MatchRecord) -> Result<MatchId> {
        let (a, b) = (record.participants.challenger, record.participants.opponent);
        if a == b {
            return Err(StakematchError::SelfMatch(a));
        }

        let mut inner = self.inner.lock();
        for actor in [a, b] {
            if let Some(existing) = inner.members.get(&actor) {
                return Err(StakematchError::AlreadyInMatch {
                    actor,
                    existing: *existing,
                });
            }
        }

        let id = record.id;
        inner.members.insert(a, id);
        inner.members.insert(b, id);
        inner.matches.insert(id, record);
        debug!(match_id = %id, challenger = %a, opponent = %b, "match registered");
        Ok(id)
    }

    /// Match the actor is committed to, as participant or spectator. O(1).
    #[must_use]
    pub fn lookup_by_participant(&self, actor: ActorId) -> Option<MatchId> {
        self.inner.lock().members.get(&actor).copied()
    }

    #[must_use]
    pub fn is_committed(&self, actor: ActorId) -> bool {
        self.inner.lock().members.contains_key(&actor)
    }

    #[must_use]
    pub fn contains(&self, id: MatchId) -> bool {
        self.inner.lock().matches.contains_key(&id)
    }

    /// Read a match under the lock.
    pub fn with_match<R>(&self, id: MatchId, f: impl FnOnce(&MatchRecord) -> R) -> Option<R> {
        self.inner.lock().matches.get(&id).map(f)
    }

    /// Mutate a match under the lock.
    ///
    /// Membership cannot change through this handle; use
    /// [`attach_spectator`](Self::attach_spectator) and
    /// [`remove`](Self::remove) for that.
    pub fn with_match_mut<R>(
        &self,
        id: MatchId,
        f: impl FnOnce(&mut MatchRecord) -> R,
    ) -> Option<R> {
        self.inner.lock().matches.get_mut(&id).map(f)
    }

    /// Clone of the current record.
    #[must_use]
    pub fn snapshot(&self, id: MatchId) -> Option<MatchRecord> {
        self.with_match(id, Clone::clone)
    }

    #[must_use]
    pub fn phase_of(&self, id: MatchId) -> Option<Phase> {
        self.with_match(id, |m| m.phase)
    }

    /// Attach a spectator to a live match.
    ///
    /// # Errors
    /// - `MatchNotFound` if the match is gone or already terminal
    /// - `AlreadyInMatch` if the actor is committed anywhere
    pub fn attach_spectator(&self, id: MatchId, actor: ActorId, origin: Location) -> Result<()> {
        let mut inner = self.inner.lock();
        if let Some(existing) = inner.members.get(&actor) {
            return Err(StakematchError::AlreadyInMatch {
                actor,
                existing: *existing,
            });
        }
        let record = inner
            .matches
            .get_mut(&id)
            .filter(|m| !m.phase.is_terminal())
            .ok_or(StakematchError::MatchNotFound(id))?;
        record.spectators.insert(
            actor,
            Spectator {
                origin,
                relocated: false,
            },
        );
        inner.members.insert(actor, id);
        debug!(match_id = %id, spectator = %actor, "spectator attached");
        Ok(())
    }

    /// Detach a spectator. Returns its entry if it was attached to `id`.
    pub fn detach_spectator(&self, id: MatchId, actor: ActorId) -> Option<Spectator> {
        let mut inner = self.inner.lock();
        if inner.members.get(&actor) != Some(&id) {
            return None;
        }
        let spectator = inner.matches.get_mut(&id)?.spectators.remove(&actor)?;
        inner.members.remove(&actor);
        Some(spectator)
    }

    /// Remove a match and unregister every participant and spectator.
    pub fn remove(&self, id: MatchId) -> Option<MatchRecord> {
        let mut inner = self.inner.lock();
        let record = inner.matches.remove(&id)?;
        for actor in record.members() {
            if inner.members.get(&actor) == Some(&id) {
                inner.members.remove(&actor);
            }
        }
        debug!(match_id = %id, "match removed from registry");
        Some(record)
    }

    /// Ids of every registered match.
    #[must_use]
    pub fn ids(&self) -> Vec<MatchId> {
        let mut ids: Vec<MatchId> = self.inner.lock().matches.keys().copied().collect();
        ids.sort();
        ids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().matches.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().matches.is_empty()
    }

    /// Number of actors currently committed.
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.inner.lock().members.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stakematch_types::Agreement;
    use std::sync::Arc;

    fn record(a: ActorId, b: ActorId) -> MatchRecord {
        MatchRecord::dummy(&Agreement::dummy(a, b))
    }

    fn lobby() -> Location {
        Location::new("world", 5.0, 64.0, 5.0)
    }

    #[test]
    fn register_and_lookup() {
        let reg = MatchRegistry::new();
        let (a, b) = (ActorId::new(), ActorId::new());
        let id = reg.register(record(a, b)).unwrap();
        assert_eq!(reg.lookup_by_participant(a), Some(id));
        assert_eq!(reg.lookup_by_participant(b), Some(id));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn participant_can_only_be_in_one_match() {
        let reg = MatchRegistry::new();
        let (a, b, c) = (ActorId::new(), ActorId::new(), ActorId::new());
        let first = reg.register(record(a, b)).unwrap();
        let err = reg.register(record(c, b)).unwrap_err();
        assert_eq!(
            err,
            StakematchError::AlreadyInMatch {
                actor: b,
                existing: first
            }
        );
        assert!(!reg.is_committed(c));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn self_match_rejected() {
        let reg = MatchRegistry::new();
        let a = ActorId::new();
        assert!(matches!(
            reg.register(record(a, a)),
            Err(StakematchError::SelfMatch(_))
        ));
    }

    #[test]
    fn remove_unregisters_participants_and_spectators() {
        let reg = MatchRegistry::new();
        let (a, b, s) = (ActorId::new(), ActorId::new(), ActorId::new());
        let id = reg.register(record(a, b)).unwrap();
        reg.attach_spectator(id, s, lobby()).unwrap();
        assert_eq!(reg.member_count(), 3);

        let removed = reg.remove(id).unwrap();
        assert_eq!(removed.spectators.len(), 1);
        assert_eq!(reg.member_count(), 0);
        assert!(reg.lookup_by_participant(s).is_none());
        assert!(reg.remove(id).is_none());
    }

    #[test]
    fn spectator_cannot_be_a_participant_elsewhere() {
        let reg = MatchRegistry::new();
        let (a, b, c, d) = (ActorId::new(), ActorId::new(), ActorId::new(), ActorId::new());
        let first = reg.register(record(a, b)).unwrap();
        let _second = reg.register(record(c, d)).unwrap();
        assert!(reg.attach_spectator(first, c, lobby()).is_err());

        let s = ActorId::new();
        reg.attach_spectator(first, s, lobby()).unwrap();
        assert!(reg.register(record(s, ActorId::new())).is_err());

        assert!(reg.detach_spectator(first, s).is_some());
        assert!(reg.detach_spectator(first, s).is_none());
        assert!(!reg.is_committed(s));
    }

    #[test]
    fn terminal_match_refuses_spectators() {
        let reg = MatchRegistry::new();
        let id = reg.register(record(ActorId::new(), ActorId::new())).unwrap();
        reg.with_match_mut(id, |m| m.phase = Phase::Ended);
        assert!(matches!(
            reg.attach_spectator(id, ActorId::new(), lobby()),
            Err(StakematchError::MatchNotFound(_))
        ));
    }

    #[test]
    fn concurrent_registration_is_exclusive() {
        let reg = Arc::new(MatchRegistry::new());
        let shared = ActorId::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let reg = Arc::clone(&reg);
                std::thread::spawn(move || reg.register(record(shared, ActorId::new())).is_ok())
            })
            .collect();
        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(wins, 1);
        assert_eq!(reg.len(), 1);
    }
}
