// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Supervisor module
//!
//! Runs one action body under a deadline and converts every way it can
//! end into an [`ExecutionOutcome`]. Failures and panics are contained
//! here: nothing raised by a body reaches the caller, so one bad action
//! never takes down the consumer loop.
//!

use crate::action::ActionScope;
use crate::error::ActionError;

use futures::FutureExt;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

/// How one supervised execution ended.
#[derive(Debug, PartialEq)]
pub enum ExecutionOutcome<R> {
    /// The body finished and produced a value.
    Success(R),
    /// The deadline elapsed before the body finished.
    Timeout(Duration),
    /// Owner teardown or cooperative cancellation ended the execution.
    Cancelled,
    /// The body failed or panicked.
    Failed(ActionError),
}

impl<R> ExecutionOutcome<R> {
    /// True for the success variant.
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Success(_))
    }

    /// Collapses the outcome into a typed result.
    pub fn into_result(self) -> Result<R, ActionError> {
        match self {
            ExecutionOutcome::Success(value) => Ok(value),
            ExecutionOutcome::Timeout(deadline) => {
                Err(ActionError::Timeout(deadline))
            }
            ExecutionOutcome::Cancelled => Err(ActionError::Cancelled),
            ExecutionOutcome::Failed(error) => Err(error),
        }
    }
}

/// Deadline-bounded, failure-isolating runner for one action body.
#[derive(Clone, Debug)]
pub struct ExecutionSupervisor {
    deadline: Duration,
}

impl ExecutionSupervisor {
    /// Creates a supervisor enforcing `deadline` per execution.
    pub fn new(deadline: Duration) -> Self {
        Self { deadline }
    }

    /// The configured per-execution deadline.
    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Drives `body` to an outcome.
    ///
    /// `owner` is the teardown token of the executor's owner; `scope` is
    /// the execution context handed to the body, holding a child token.
    /// A deadline kill or an owner teardown cancels the scope token so
    /// work spawned by the body winds down too.
    ///
    /// # Returns
    ///
    /// The classified outcome. A cooperative `Err(Cancelled)` from the
    /// body counts as `Cancelled`, not as a failure.
    ///
    pub async fn run<R, F>(
        &self,
        owner: &CancellationToken,
        scope: &ActionScope,
        body: F,
    ) -> ExecutionOutcome<R>
    where
        F: Future<Output = Result<R, ActionError>>,
    {
        let guarded = AssertUnwindSafe(body).catch_unwind();
        tokio::select! {
            biased;
            _ = owner.cancelled() => {
                scope.token().cancel();
                debug!("Execution cancelled by owner teardown");
                ExecutionOutcome::Cancelled
            }
            result = timeout(self.deadline, guarded) => match result {
                Err(_) => {
                    scope.token().cancel();
                    warn!(
                        "Execution exceeded its deadline of {:?}",
                        self.deadline
                    );
                    ExecutionOutcome::Timeout(self.deadline)
                }
                Ok(Err(payload)) => {
                    let reason = panic_reason(payload);
                    error!("Execution panicked: {}", reason);
                    ExecutionOutcome::Failed(ActionError::Operation(reason))
                }
                Ok(Ok(Ok(value))) => ExecutionOutcome::Success(value),
                Ok(Ok(Err(error))) if error.is_cancelled() => {
                    debug!("Execution observed cancellation");
                    ExecutionOutcome::Cancelled
                }
                Ok(Ok(Err(error))) => {
                    debug!("Execution failed: {}", error);
                    ExecutionOutcome::Failed(error)
                }
            }
        }
    }
}

/// Renders a panic payload into a failure reason.
fn panic_reason(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "action panicked".to_owned()
    }
}
