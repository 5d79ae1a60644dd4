// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! Repository facade.
//!
//! Serialized, retried, deadline-bounded execution for ad-hoc data-access
//! operations that are not worth modelling as a handler.
//!

use executor::{
    ActionError, ActionScope, ExecutionGate, ExecutionSupervisor,
    ExecutorConfig, RetryContext, RetryCoordinator,
};

use tokio_util::sync::CancellationToken;
use tracing::debug;

use std::future::Future;

/// Gate, supervisor and retry coordinator bundled for repository calls.
///
/// Calls are admitted one at a time in arrival order. Each admitted call
/// runs under the retry coordinator, and the deadline bounds the whole
/// retried sequence rather than each attempt. [`Repository::close`]
/// cancels the running call and refuses the rest.
pub struct Repository {
    label: String,
    gate: ExecutionGate,
    supervisor: ExecutionSupervisor,
    retry: RetryCoordinator,
    token: CancellationToken,
}

impl Default for Repository {
    fn default() -> Self {
        Self::new()
    }
}

impl Repository {
    /// Creates a repository with the repository profile and default
    /// retries.
    pub fn new() -> Self {
        Self::with(ExecutorConfig::repository(), RetryCoordinator::default())
    }

    /// Creates a repository with an explicit profile and retry policy.
    pub fn with(config: ExecutorConfig, retry: RetryCoordinator) -> Self {
        Self {
            label: config.label,
            gate: ExecutionGate::new(),
            supervisor: ExecutionSupervisor::new(config.deadline),
            retry,
            token: CancellationToken::new(),
        }
    }

    /// Runs `operation` behind the gate, retrying every failure except
    /// cancellation.
    ///
    /// # Arguments
    ///
    /// * `operation` - Called once per attempt with the retry context.
    ///
    /// # Errors
    ///
    /// The last attempt's error, [`ActionError::Timeout`] if the deadline
    /// elapsed, or [`ActionError::Cancelled`] after [`Repository::close`].
    pub async fn call<R, F, Fut>(&self, operation: F) -> Result<R, ActionError>
    where
        F: FnMut(RetryContext) -> Fut,
        Fut: Future<Output = Result<R, ActionError>>,
    {
        self.call_if(|error| !error.is_cancelled(), operation).await
    }

    /// Like [`Repository::call`], retrying only failures that `retry_if`
    /// accepts.
    pub async fn call_if<R, P, F, Fut>(
        &self,
        retry_if: P,
        operation: F,
    ) -> Result<R, ActionError>
    where
        P: FnMut(&ActionError) -> bool,
        F: FnMut(RetryContext) -> Fut,
        Fut: Future<Output = Result<R, ActionError>>,
    {
        let _permit = tokio::select! {
            biased;
            _ = self.token.cancelled() => {
                return Err(ActionError::Cancelled)
            }
            permit = self.gate.acquire() => {
                permit.map_err(|_| ActionError::Cancelled)?
            }
        };
        debug!("{}: call admitted", self.label);

        let scope = ActionScope::new(self.token.child_token());
        self.supervisor
            .run(
                &self.token,
                &scope,
                self.retry.execute_if(scope.token(), retry_if, operation),
            )
            .await
            .into_result()
    }

    /// True while a call is running.
    pub fn is_busy(&self) -> bool {
        !self.gate.is_free()
    }

    /// Cancels the running call and refuses every later one.
    pub fn close(&self) {
        self.token.cancel();
    }
}

impl Drop for Repository {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
