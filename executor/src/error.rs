// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Errors module
//!
//! Failure taxonomy for action bodies and runtime faults of the executor
//! machinery itself.
//!

use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::time::Duration;

/// Failures raised by an action body or imposed on it by the supervisor.
#[derive(Clone, Debug, Error, PartialEq, Serialize, Deserialize)]
pub enum ActionError {
    /// The deadline elapsed before the action finished.
    #[error("Action exceeded its deadline of {0:?}.")]
    Timeout(Duration),
    /// The owner was torn down or the execution cancelled. Not a failure:
    /// no error state is published and no rollback happens.
    #[error("Action was cancelled.")]
    Cancelled,
    /// Network or IO class failure that a retry may fix.
    #[error("Transient failure: {0}")]
    Transient(String),
    /// Domain failure that retrying will not fix.
    #[error("Operation failure: {0}")]
    Operation(String),
}

impl ActionError {
    /// True for the cancellation variant.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ActionError::Cancelled)
    }

    /// True for failures worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, ActionError::Transient(_))
    }
}

/// Runtime faults of the executor machinery.
#[derive(Clone, Debug, Error, PartialEq, Serialize, Deserialize)]
pub enum ExecutorError {
    /// A submission arrived after the mailbox was closed.
    #[error("Mailbox is closed.")]
    MailboxClosed,
    /// The consumer task was already started once.
    #[error("Consumer task was already started.")]
    AlreadyAttached,
    /// The execution gate was closed.
    #[error("Execution gate is closed.")]
    GateClosed,
}
