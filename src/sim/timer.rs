//! Cooperative timer scheduler
//!
//! Delayed and repeating effects are timer entries advanced by elapsed frame
//! time. The scheduler only decides *when* an entry is due; the owner drains
//! due entries with [`Scheduler::next_due`] and runs them, so actions can
//! schedule and cancel entries freely while a pass is being drained.
//!
//! An entry fires at most once per [`Scheduler::advance`] even when several
//! intervals have elapsed. Gameplay cadence (enemy fire, spawn rate) assumes
//! the fixed frame budget rather than catching up after a stall.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Handle returned by [`Scheduler::schedule`], used for cancellation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerId(u64);

/// How many times an entry fires before it is removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Repeat {
    Forever,
    Times(u32),
}

#[derive(Debug, Clone)]
struct TimerEntry<A> {
    id: TimerId,
    interval_ms: u32,
    action: A,
    repeat: Repeat,
    fired: u32,
    elapsed_ms: u32,
}

impl<A> TimerEntry<A> {
    fn finished(&self) -> bool {
        matches!(self.repeat, Repeat::Times(n) if self.fired >= n)
    }
}

/// A due entry handed back to the owner
#[derive(Debug, Clone, PartialEq)]
pub struct Fired<A> {
    pub id: TimerId,
    pub action: A,
}

#[derive(Debug, Clone)]
pub struct Scheduler<A> {
    entries: Vec<TimerEntry<A>>,
    due: VecDeque<Fired<A>>,
    next_id: u64,
}

impl<A> Default for Scheduler<A> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            due: VecDeque::new(),
            next_id: 1,
        }
    }
}

impl<A: Clone> Scheduler<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action to run every `interval_ms`
    pub fn schedule(&mut self, interval_ms: u32, action: A, repeat: Repeat) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.entries.push(TimerEntry {
            id,
            interval_ms,
            action,
            repeat,
            fired: 0,
            elapsed_ms: 0,
        });
        id
    }

    pub fn every(&mut self, interval_ms: u32, action: A) -> TimerId {
        self.schedule(interval_ms, action, Repeat::Forever)
    }

    pub fn once(&mut self, delay_ms: u32, action: A) -> TimerId {
        self.schedule(delay_ms, action, Repeat::Times(1))
    }

    /// Remove an entry and any pending firing of it. Unknown ids are ignored.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.entries.len() + self.due.len();
        self.entries.retain(|e| e.id != id);
        self.due.retain(|f| f.id != id);
        before != self.entries.len() + self.due.len()
    }

    pub fn contains(&self, id: TimerId) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    /// Accumulate elapsed time and queue every entry that became due.
    ///
    /// Finite entries that reach their repeat count are removed here, before
    /// their final action runs.
    pub fn advance(&mut self, elapsed_ms: u32) {
        for entry in &mut self.entries {
            entry.elapsed_ms = entry.elapsed_ms.saturating_add(elapsed_ms);
            if entry.elapsed_ms >= entry.interval_ms {
                entry.elapsed_ms -= entry.interval_ms;
                entry.fired += 1;
                self.due.push_back(Fired {
                    id: entry.id,
                    action: entry.action.clone(),
                });
            }
        }
        self.entries.retain(|e| !e.finished());
    }

    /// Next action queued by the last [`advance`](Self::advance), in
    /// registration order
    pub fn next_due(&mut self) -> Option<Fired<A>> {
        self.due.pop_front()
    }

    /// Drop every entry (stage transitions)
    pub fn clear(&mut self) {
        self.entries.clear();
        self.due.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of times an entry has fired so far (None once removed)
    #[cfg(test)]
    pub(crate) fn fire_count(&self, id: TimerId) -> Option<u32> {
        self.entries.iter().find(|e| e.id == id).map(|e| e.fired)
    }
}
