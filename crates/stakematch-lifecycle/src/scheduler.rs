//! Tick scheduler for delayed match continuations.
//!
//! Tasks are plain values (`T`), not closures, so they can be inspected,
//! cancelled and dropped without running. Every task belongs to one match.
//!
//! ```text
//!   schedule(m, delay, t) ──► queue[(now + delay, seq)] = (m, t)
//!                              index[m] += (now + delay, seq)
//!   advance()             ──► now += 1
//!   pop_due()             ──► earliest entry with at <= now (FIFO within a tick)
//!   cancel_match(m)       ──► drop every entry of m
//!   seal_all()            ──► drop everything, refuse any further schedule
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};

use stakematch_types::{MatchId, Tick, Ticks};
use tracing::trace;

/// A task popped from the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTask<T> {
    pub owner: MatchId,
    pub due: Tick,
    pub task: T,
}

type Key = (Tick, u64);

#[derive(Debug)]
pub struct Scheduler<T> {
    now: Tick,
    next_seq: u64,
    queue: BTreeMap<Key, (MatchId, T)>,
    index: HashMap<MatchId, BTreeSet<Key>>,
    sealed_all: bool,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            now: Tick(0),
            next_seq: 0,
            queue: BTreeMap::new(),
            index: HashMap::new(),
            sealed_all: false,
        }
    }

    #[must_use]
    pub fn now(&self) -> Tick {
        self.now
    }

    /// Move the clock forward by one tick.
    pub fn advance(&mut self) -> Tick {
        self.now = self.now + Ticks::ONE;
        self.now
    }

    /// Queue `task` for `owner` to run `delay` ticks from now.
    ///
    /// Returns `false` (and drops the task) once the scheduler is sealed.
    pub fn schedule(&mut self, owner: MatchId, delay: Ticks, task: T) -> bool {
        if self.sealed_all {
            trace!(match_id = %owner, "schedule refused: sealed");
            return false;
        }
        let key = (self.now + delay, self.next_seq);
        self.next_seq += 1;
        self.queue.insert(key, (owner, task));
        self.index.entry(owner).or_default().insert(key);
        true
    }

    /// Drop every pending task of `owner`. Returns how many were dropped.
    pub fn cancel_match(&mut self, owner: MatchId) -> usize {
        let Some(keys) = self.index.remove(&owner) else {
            return 0;
        };
        for key in &keys {
            self.queue.remove(key);
        }
        keys.len()
    }

    /// Cancel every task and refuse all further scheduling.
    pub fn seal_all(&mut self) -> usize {
        self.sealed_all = true;
        let dropped = self.queue.len();
        self.queue.clear();
        self.index.clear();
        dropped
    }

    /// Pop the earliest task due at or before the current tick.
    pub fn pop_due(&mut self) -> Option<ScheduledTask<T>> {
        let (&key, _) = self.queue.first_key_value()?;
        if key.0 > self.now {
            return None;
        }
        let (owner, task) = self.queue.remove(&key)?;
        if let Some(keys) = self.index.get_mut(&owner) {
            keys.remove(&key);
            if keys.is_empty() {
                self.index.remove(&owner);
            }
        }
        Some(ScheduledTask {
            owner,
            due: key.0,
            task,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Pending tasks of `owner`, earliest first.
    pub fn tasks_of(&self, owner: MatchId) -> impl Iterator<Item = (Tick, &T)> {
        self.index
            .get(&owner)
            .into_iter()
            .flat_map(|keys| keys.iter())
            .filter_map(|key| self.queue.get(key).map(|(_, t)| (key.0, t)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain<T>(s: &mut Scheduler<T>) -> Vec<T> {
        std::iter::from_fn(|| s.pop_due().map(|t| t.task)).collect()
    }

    #[test]
    fn tasks_fire_in_due_order_then_fifo() {
        let mut s = Scheduler::new();
        let m = MatchId::new();
        s.schedule(m, Ticks(2), "late");
        s.schedule(m, Ticks(1), "early-a");
        s.schedule(m, Ticks(1), "early-b");
        assert!(drain(&mut s).is_empty());
        s.advance();
        assert_eq!(drain(&mut s), vec!["early-a", "early-b"]);
        s.advance();
        assert_eq!(drain(&mut s), vec!["late"]);
        assert!(s.is_empty());
    }

    #[test]
    fn zero_delay_runs_on_current_tick() {
        let mut s = Scheduler::new();
        let m = MatchId::new();
        s.schedule(m, Ticks::ZERO, 1);
        let task = s.pop_due().unwrap();
        assert_eq!(task.due, Tick(0));
        assert_eq!(task.owner, m);
    }

    #[test]
    fn cancel_is_scoped_to_one_match() {
        let mut s = Scheduler::new();
        let a = MatchId::new();
        let b = MatchId::new();
        s.schedule(a, Ticks(1), 'a');
        s.schedule(a, Ticks(5), 'a');
        s.schedule(b, Ticks(1), 'b');
        assert_eq!(s.cancel_match(a), 2);
        assert_eq!(s.tasks_of(a).count(), 0);
        assert_eq!(s.tasks_of(b).count(), 1);
        s.advance();
        assert_eq!(drain(&mut s), vec!['b']);
    }

    #[test]
    fn seal_all_blocks_everything() {
        let mut s = Scheduler::new();
        s.schedule(MatchId::new(), Ticks(1), ());
        s.schedule(MatchId::new(), Ticks(1), ());
        assert_eq!(s.seal_all(), 2);
        assert!(!s.schedule(MatchId::new(), Ticks(1), ()));
        assert!(s.is_empty());
    }

    #[test]
    fn tasks_of_lists_pending_in_order() {
        let mut s = Scheduler::new();
        let m = MatchId::new();
        s.schedule(m, Ticks(7), "b");
        s.schedule(m, Ticks(2), "a");
        let listed: Vec<_> = s.tasks_of(m).map(|(_, t)| *t).collect();
        assert_eq!(listed, vec!["a", "b"]);
    }
}
