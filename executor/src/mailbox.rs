// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Mailbox module
//!
//! Bounded coalescing inbox feeding the consumer task. A submission first
//! rides out a quiescence window: while the window is open an equal
//! submission collapses into the pending entry and a distinct one replaces
//! it, restarting the window. Matured entries wait in a bounded ready
//! queue delivered in FIFO order; overflow drops the oldest entry, never
//! the newest and never the caller.
//!
//! Duplicate collapse is scoped to the un-matured pending entry. A repeat
//! of an already delivered action is a new intent and runs again.
//!

use crate::action::Action;
use crate::events::{EventBus, ExecutorEvent};

use tokio::sync::Notify;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A submission waiting out its quiescence window.
struct Pending<A> {
    action: A,
    matures_at: Instant,
}

struct Inner<A> {
    pending: Option<Pending<A>>,
    ready: VecDeque<A>,
    closed: bool,
}

/// Bounded inbox with quiescence coalescing and drop-oldest overflow.
///
/// Handles are cheap to clone; all of them feed the single consumer that
/// calls [`ActionMailbox::recv`].
pub struct ActionMailbox<A: Action> {
    inner: Arc<Mutex<Inner<A>>>,
    notify: Arc<Notify>,
    bus: EventBus,
    capacity: usize,
    window: Duration,
}

impl<A: Action> Clone for ActionMailbox<A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            notify: self.notify.clone(),
            bus: self.bus.clone(),
            capacity: self.capacity,
            window: self.window,
        }
    }
}

impl<A: Action> ActionMailbox<A> {
    /// Creates a mailbox. Capacity below one is clamped to one; a zero
    /// window delivers every submission immediately.
    pub fn new(capacity: usize, window: Duration, bus: EventBus) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                pending: None,
                ready: VecDeque::new(),
                closed: false,
            })),
            notify: Arc::new(Notify::new()),
            bus,
            capacity: capacity.max(1),
            window,
        }
    }

    /// Accepts `action` for eventual delivery without ever blocking.
    ///
    /// # Returns
    ///
    /// `false` only when the mailbox is closed. A full queue drops its
    /// oldest entry instead of refusing the newest.
    ///
    pub fn submit(&self, action: A) -> bool {
        let Ok(mut inner) = self.inner.lock() else {
            return false;
        };
        if inner.closed {
            return false;
        }
        self.graduate_due(&mut inner);
        match inner.pending.as_mut() {
            Some(pending) if pending.action == action => {
                // Anti-spam collapse: the original schedule stands.
                debug!("Mailbox collapsed an equal submission");
                self.bus.publish(ExecutorEvent::Coalesced);
            }
            Some(pending) => {
                debug!("Mailbox superseded the pending submission");
                pending.action = action;
                pending.matures_at = Instant::now() + self.window;
                self.bus.publish(ExecutorEvent::Superseded);
            }
            None => {
                if self.window.is_zero() {
                    self.push_ready(&mut inner, action);
                } else {
                    inner.pending = Some(Pending {
                        action,
                        matures_at: Instant::now() + self.window,
                    });
                }
                self.bus.publish(ExecutorEvent::Accepted);
            }
        }
        drop(inner);
        self.notify.notify_one();
        true
    }

    /// Delivers the next matured action to the single consumer.
    ///
    /// # Returns
    ///
    /// `None` once the mailbox is closed and its ready queue drained.
    ///
    pub async fn recv(&self) -> Option<A> {
        loop {
            let notified = self.notify.notified();
            let wait_until = {
                let Ok(mut inner) = self.inner.lock() else {
                    return None;
                };
                self.graduate_due(&mut inner);
                if let Some(action) = inner.ready.pop_front() {
                    return Some(action);
                }
                if inner.closed {
                    return None;
                }
                inner.pending.as_ref().map(|pending| pending.matures_at)
            };
            match wait_until {
                Some(at) => {
                    tokio::select! {
                        _ = notified => {}
                        _ = sleep_until(at) => {}
                    }
                }
                None => notified.await,
            }
        }
    }

    /// Closes the mailbox: the pending entry is discarded, matured entries
    /// remain deliverable and further submissions are refused.
    pub fn close(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.closed = true;
            inner.pending = None;
        }
        self.notify.notify_one();
    }

    /// True once the mailbox is closed.
    pub fn is_closed(&self) -> bool {
        self.inner.lock().map_or(true, |inner| inner.closed)
    }

    /// Matured actions waiting for the consumer.
    pub fn ready_len(&self) -> usize {
        self.inner.lock().map_or(0, |inner| inner.ready.len())
    }

    /// Moves a pending entry whose window elapsed into the ready queue.
    fn graduate_due(&self, inner: &mut Inner<A>) {
        let due = inner
            .pending
            .as_ref()
            .map_or(false, |pending| Instant::now() >= pending.matures_at);
        if due {
            if let Some(pending) = inner.pending.take() {
                self.push_ready(inner, pending.action);
            }
        }
    }

    fn push_ready(&self, inner: &mut Inner<A>, action: A) {
        if inner.ready.len() == self.capacity {
            warn!("Mailbox is full, dropping the oldest pending action");
            inner.ready.pop_front();
            self.bus.publish(ExecutorEvent::DroppedOldest);
        }
        inner.ready.push_back(action);
    }
}
