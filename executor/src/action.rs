// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Action module
//!
//! Collaborators describe their work as equality-comparable [`Action`]
//! values and implement [`ActionHandler`] to compute the next observable
//! state for each one. The handler lives inside the consumer task of its
//! executor and sees one action at a time.
//!

use crate::error::ActionError;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use std::fmt::Debug;

/// One requested state-mutating operation. Implementations are plain value
/// types; equality is what the mailbox uses to collapse duplicates.
pub trait Action: Debug + Clone + PartialEq + Send + Sync + 'static {}

/// Observable state values owned by the call site. Implemented for every
/// suitable type, no marker impl is required.
pub trait StateValue: Debug + Clone + Send + Sync + 'static {}

impl<S> StateValue for S where S: Debug + Clone + Send + Sync + 'static {}

/// Execution context handed to an action body.
///
/// Carries the cancellation token for this execution, a child of the owner
/// token. Long-running bodies should call [`ActionScope::checkpoint`] at
/// convenient points so owner teardown and deadline kills are observed
/// promptly.
#[derive(Clone, Debug)]
pub struct ActionScope {
    token: CancellationToken,
}

impl ActionScope {
    /// Creates a scope for `token`. The executor builds one per execution;
    /// build your own when driving an `ExecutionSupervisor` directly.
    pub fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    /// Cancellation token for this execution.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// True once this execution has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Returns [`ActionError::Cancelled`] once this execution has been
    /// cancelled, `Ok` otherwise.
    pub fn checkpoint(&self) -> Result<(), ActionError> {
        if self.token.is_cancelled() {
            Err(ActionError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Computes state transitions for an owner's actions.
#[async_trait]
pub trait ActionHandler: Send + Sync + Sized + 'static {
    /// Action variants this handler accepts.
    type Action: Action;

    /// Observable state the owner publishes.
    type State: StateValue;

    /// Computes the next state for `action`, starting from `state`.
    ///
    /// # Arguments
    ///
    /// - action: The delivered action.
    /// - state: The current observable value.
    /// - scope: Execution context with the cancellation token.
    ///
    /// # Returns
    ///
    /// The next state to commit, or the failure to recover from.
    ///
    async fn handle_action(
        &mut self,
        action: Self::Action,
        state: Self::State,
        scope: &ActionScope,
    ) -> Result<Self::State, ActionError>;

    /// Transient error-state value published while recovery is pending,
    /// built from the current value and the failure message. The default
    /// keeps the current value unchanged.
    fn error_state(&self, state: Self::State, _reason: &str) -> Self::State {
        state
    }
}
