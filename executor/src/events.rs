// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Events module
//!
//! Lifecycle events published by an executor instance and the broadcast
//! bus carrying them to any number of observers.
//!

use serde::{Deserialize, Serialize};

use tokio::sync::broadcast;

/// What happened inside an executor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ExecutorEvent {
    /// A submission entered the mailbox.
    Accepted,
    /// An equal submission collapsed into the pending entry.
    Coalesced,
    /// A newer distinct submission replaced the pending entry.
    Superseded,
    /// The ready queue overflowed and its oldest entry was dropped.
    DroppedOldest,
    /// A non-blocking submission found the gate held.
    Rejected,
    /// An action left the mailbox and began executing.
    Started,
    /// The action succeeded and its state was committed.
    Committed,
    /// The deadline elapsed before the action finished.
    TimedOut,
    /// The action failed.
    Failed {
        /// Rendered failure message.
        reason: String,
    },
    /// The last committed state was restored after the grace delay.
    RolledBack,
    /// The execution ended by cancellation.
    Cancelled,
    /// The consumer task stopped.
    Detached,
}

/// Broadcast fan-out for executor events.
///
/// Publishing with no subscribers is not an error. Slow subscribers may
/// observe a lagged gap and should skip it.
#[derive(Clone, Debug)]
pub struct EventBus {
    tx: broadcast::Sender<ExecutorEvent>,
}

impl EventBus {
    /// Creates a bus with room for `capacity` undelivered events.
    /// Capacity below one is clamped to one.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to current subscribers.
    pub fn publish(&self, event: ExecutorEvent) {
        let _ = self.tx.send(event);
    }

    /// Opens a new subscription.
    pub fn subscribe(&self) -> broadcast::Receiver<ExecutorEvent> {
        self.tx.subscribe()
    }
}
