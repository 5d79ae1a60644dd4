// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # State module
//!
//! The observable state value of one executor, its publication channel and
//! the bounded ring of post-success snapshots used as rollback targets.
//! Only the consumer task mutates the store; everyone else observes it
//! through the watch channel.
//!

use crate::action::StateValue;

use tokio::sync::watch;
use tracing::debug;

use std::collections::VecDeque;
use std::time::Instant;

/// A state value captured after a successful execution.
#[derive(Clone, Debug)]
pub struct StateSnapshot<S: StateValue> {
    /// The captured value.
    pub value: S,
    /// When it was captured.
    pub taken_at: Instant,
}

impl<S: StateValue> StateSnapshot<S> {
    fn new(value: S) -> Self {
        Self {
            value,
            taken_at: Instant::now(),
        }
    }
}

/// Fixed-capacity FIFO ring of post-success snapshots. The oldest entry is
/// evicted on overflow.
#[derive(Debug)]
pub struct History<S: StateValue> {
    entries: VecDeque<StateSnapshot<S>>,
    capacity: usize,
}

impl<S: StateValue> History<S> {
    /// Creates an empty history. Capacity below one is clamped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Number of retained snapshots.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True while nothing has been committed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recent snapshot, if any.
    pub fn last(&self) -> Option<&StateSnapshot<S>> {
        self.entries.back()
    }

    /// Oldest retained snapshot, if any.
    pub fn oldest(&self) -> Option<&StateSnapshot<S>> {
        self.entries.front()
    }

    /// Appends a snapshot, evicting the oldest once full.
    pub fn push(&mut self, snapshot: StateSnapshot<S>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(snapshot);
    }
}

/// Holds the current observable value, the channel publishing it and the
/// rollback history.
#[derive(Debug)]
pub struct StateStore<S: StateValue> {
    current: S,
    history: History<S>,
    tx: watch::Sender<S>,
}

impl<S: StateValue> StateStore<S> {
    /// Creates a store publishing `initial` and seeded with it as snapshot
    /// zero, so a failure before any success still has a rollback target.
    ///
    /// # Returns
    ///
    /// The store and the first subscription to its watch channel.
    ///
    pub fn new(initial: S, capacity: usize) -> (Self, watch::Receiver<S>) {
        let (tx, rx) = watch::channel(initial.clone());
        let mut history = History::new(capacity);
        history.push(StateSnapshot::new(initial.clone()));
        (
            Self {
                current: initial,
                history,
                tx,
            },
            rx,
        )
    }

    /// The value subscribers currently observe.
    pub fn current(&self) -> &S {
        &self.current
    }

    /// Read access to the snapshot ring.
    pub fn history(&self) -> &History<S> {
        &self.history
    }

    /// Records `new` as a post-success snapshot and publishes it.
    pub fn commit(&mut self, new: S) {
        self.history.push(StateSnapshot::new(new.clone()));
        self.current = new.clone();
        let _ = self.tx.send(new);
    }

    /// Publishes a transient value without recording it. Error states
    /// never enter the history.
    pub fn publish_error(&mut self, value: S) {
        self.current = value.clone();
        let _ = self.tx.send(value);
    }

    /// Restores the most recent post-success snapshot as current and
    /// publishes it. The snapshot stays in the history, so consecutive
    /// failures keep restoring the same last-good value.
    pub fn rollback_to_last(&mut self) -> Option<S> {
        let value = self.history.last().map(|snapshot| snapshot.value.clone())?;
        debug!("Restoring the last committed state");
        self.current = value.clone();
        let _ = self.tx.send(value.clone());
        Some(value)
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_history_bound() {
        let mut history = History::new(5);
        for i in 0..8u32 {
            history.push(StateSnapshot::new(i));
        }
        // Capacity 5 after 8 pushes: 0, 1 and 2 are gone.
        assert_eq!(history.len(), 5);
        assert_eq!(history.oldest().map(|s| s.value), Some(3));
        assert_eq!(history.last().map(|s| s.value), Some(7));
    }

    #[tokio::test]
    async fn test_commit_publishes_and_records() {
        let (mut store, rx) = StateStore::new(0u32, 5);
        store.commit(1);
        store.commit(2);
        assert_eq!(*store.current(), 2);
        assert_eq!(*rx.borrow(), 2);
        // Seed plus two commits.
        assert_eq!(store.history().len(), 3);
    }

    #[tokio::test]
    async fn test_error_state_is_not_recorded() {
        let (mut store, rx) = StateStore::new(0u32, 5);
        store.commit(1);
        store.publish_error(99);
        assert_eq!(*rx.borrow(), 99);
        assert_eq!(store.history().last().map(|s| s.value), Some(1));
        assert_eq!(store.rollback_to_last(), Some(1));
        assert_eq!(*rx.borrow(), 1);
    }

    #[tokio::test]
    async fn test_rollback_before_any_success() {
        let (mut store, _rx) = StateStore::new(7u32, 5);
        assert_eq!(store.rollback_to_last(), Some(7));
        assert_eq!(*store.current(), 7);
    }

    #[tokio::test]
    async fn test_consecutive_rollbacks_restore_same_value() {
        let (mut store, _rx) = StateStore::new(0u32, 5);
        store.commit(1);
        store.publish_error(90);
        assert_eq!(store.rollback_to_last(), Some(1));
        store.publish_error(91);
        assert_eq!(store.rollback_to_last(), Some(1));
        assert_eq!(*store.current(), 1);
    }
}
