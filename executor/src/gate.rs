// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Gate module
//!
//! Mutual exclusion for action execution. The consumer loop waits in
//! [`ExecutionGate::acquire`]; synchronous callers probe with
//! [`ExecutionGate::try_acquire`] and treat `None` as an ordinary
//! rejection instead of waiting.
//!

use crate::error::ExecutorError;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use std::sync::Arc;

/// One-permit gate ensuring at most one action is in flight per executor
/// instance. Waiters are served in arrival order.
#[derive(Clone, Debug)]
pub struct ExecutionGate {
    permits: Arc<Semaphore>,
}

/// Proof of exclusive execution rights. Dropping it reopens the gate.
#[derive(Debug)]
pub struct ExecutionPermit {
    _permit: OwnedSemaphorePermit,
}

impl ExecutionGate {
    /// Creates an open gate.
    pub fn new() -> Self {
        Self {
            permits: Arc::new(Semaphore::new(1)),
        }
    }

    /// Non-blocking probe. `None` means an execution is in flight.
    pub fn try_acquire(&self) -> Option<ExecutionPermit> {
        self.permits
            .clone()
            .try_acquire_owned()
            .ok()
            .map(|permit| ExecutionPermit { _permit: permit })
    }

    /// Waits until the gate is free.
    pub async fn acquire(&self) -> Result<ExecutionPermit, ExecutorError> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ExecutorError::GateClosed)?;
        Ok(ExecutionPermit { _permit: permit })
    }

    /// True while no execution holds the gate.
    pub fn is_free(&self) -> bool {
        self.permits.available_permits() > 0
    }
}

impl Default for ExecutionGate {
    fn default() -> Self {
        Self::new()
    }
}
