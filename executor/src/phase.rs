// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Phase module
//!

use serde::{Deserialize, Serialize};

/// Where an executor currently is in its recovery cycle.
///
/// Legal transitions:
/// - `Idle` to `Executing` when a delivered action acquires the gate.
/// - `Executing` to `Idle` after a committed success or a cancellation.
/// - `Executing` to `Error` after a timeout or failure.
/// - `Error` to `Idle` once the grace delay elapsed and rollback applied.
///
/// There is no terminal phase; the cycle runs for the lifetime of the
/// owner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutorPhase {
    /// No action in flight.
    Idle,
    /// Exactly one action in flight.
    Executing,
    /// A failure was published and rollback is pending.
    Error,
}

impl ExecutorPhase {
    /// True if moving from `self` to `to` is a legal edge.
    pub fn can_transition(&self, to: ExecutorPhase) -> bool {
        matches!(
            (self, to),
            (ExecutorPhase::Idle, ExecutorPhase::Executing)
                | (ExecutorPhase::Executing, ExecutorPhase::Idle)
                | (ExecutorPhase::Executing, ExecutorPhase::Error)
                | (ExecutorPhase::Error, ExecutorPhase::Idle)
        )
    }
}
