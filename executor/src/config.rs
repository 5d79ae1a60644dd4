// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Configuration module
//!

use std::time::Duration;

/// Tuning knobs for one executor instance.
///
/// `Default` is the interactive profile; the named constructors cover the
/// other deployment shapes that were observed in practice.
#[derive(Clone, Debug)]
pub struct ExecutorConfig {
    /// Owner name used in logs and events.
    pub label: String,
    /// Wall-clock bound for one action execution.
    pub deadline: Duration,
    /// Quiet time required after the last submission before delivery.
    /// Zero delivers immediately and disables duplicate collapse.
    pub quiescence: Duration,
    /// Matured actions the mailbox holds before dropping the oldest.
    pub mailbox_capacity: usize,
    /// Post-success snapshots the store keeps as rollback targets.
    pub history_capacity: usize,
    /// Delay between publishing an error state and rolling back.
    pub grace: Duration,
    /// Capacity of the lifecycle event channel.
    pub bus_capacity: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self::interactive()
    }
}

impl ExecutorConfig {
    /// Profile for UI intent streams: debounced, queued, 10 s deadline.
    pub fn interactive() -> Self {
        Self {
            label: "executor".to_owned(),
            deadline: Duration::from_secs(10),
            quiescence: Duration::from_millis(300),
            mailbox_capacity: 64,
            history_capacity: 5,
            grace: Duration::from_secs(2),
            bus_capacity: 64,
        }
    }

    /// Profile for navigation effects: single slot, no debounce, 2 s
    /// deadline. Rapid repeats of the same command are legitimate here,
    /// so duplicate collapse stays off and in-flight exclusion alone
    /// limits spamming.
    pub fn navigation() -> Self {
        Self {
            deadline: Duration::from_secs(2),
            quiescence: Duration::ZERO,
            mailbox_capacity: 1,
            ..Self::interactive()
        }
    }

    /// Profile for repository calls: no debounce, 10 s deadline.
    pub fn repository() -> Self {
        Self {
            quiescence: Duration::ZERO,
            ..Self::interactive()
        }
    }

    /// Replaces the label used in logs and events.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}
