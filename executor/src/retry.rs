// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Retry module
//!
//! Bounded exponential-backoff retry around a single operation. The delay
//! after failed attempt `n` (0-based) is
//! `min(initial_delay * factor^n, max_delay)`. Cancellation is never
//! retried and short-circuits immediately, including out of a backoff
//! sleep.
//!

use crate::error::ActionError;

use backoff::backoff::Backoff as InnerBackoff;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use std::future::Future;
use std::time::Duration;

/// What the coordinator knows when it starts an attempt.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryContext {
    /// 0-based index of the attempt about to run.
    pub attempt: usize,
    /// Error from the previous attempt, if any.
    pub last_error: Option<ActionError>,
    /// Backoff delay slept before this attempt, if any.
    pub waited: Option<Duration>,
}

impl RetryContext {
    fn first() -> Self {
        Self {
            attempt: 0,
            last_error: None,
            waited: None,
        }
    }
}

/// Retries an operation with exponential backoff, bounded in attempts and
/// delay.
#[derive(Clone, Debug)]
pub struct RetryCoordinator {
    max_retries: usize,
    initial_delay: Duration,
    max_delay: Duration,
    factor: f64,
}

impl Default for RetryCoordinator {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            factor: 2.0,
        }
    }
}

impl RetryCoordinator {
    /// Creates a coordinator. `max_retries` bounds total attempts and is
    /// clamped to at least one.
    pub fn new(
        max_retries: usize,
        initial_delay: Duration,
        max_delay: Duration,
        factor: f64,
    ) -> Self {
        Self {
            max_retries: max_retries.max(1),
            initial_delay,
            max_delay,
            factor,
        }
    }

    /// Total attempts this coordinator allows.
    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    /// Delay slept after failed attempt `attempt` (0-based).
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let mut backoff = self.backoff();
        let mut delay = backoff.next_backoff().unwrap_or(self.max_delay);
        for _ in 0..attempt {
            delay = backoff.next_backoff().unwrap_or(self.max_delay);
        }
        delay
    }

    /// Drives `operation` to success or to the last error, retrying every
    /// failure except cancellation.
    ///
    /// # Arguments
    ///
    /// - token: Cancels a pending backoff sleep and stops retrying.
    /// - operation: Called once per attempt with the current context.
    ///
    /// # Returns
    ///
    /// The first success, or the error of the last allowed attempt.
    ///
    pub async fn execute<R, F, Fut>(
        &self,
        token: &CancellationToken,
        operation: F,
    ) -> Result<R, ActionError>
    where
        F: FnMut(RetryContext) -> Fut,
        Fut: Future<Output = Result<R, ActionError>>,
    {
        self.execute_if(token, |error| !error.is_cancelled(), operation)
            .await
    }

    /// Like [`RetryCoordinator::execute`], retrying only failures that
    /// `retry_if` accepts. Cancellation is never retried regardless of the
    /// predicate.
    pub async fn execute_if<R, F, Fut, P>(
        &self,
        token: &CancellationToken,
        mut retry_if: P,
        mut operation: F,
    ) -> Result<R, ActionError>
    where
        F: FnMut(RetryContext) -> Fut,
        Fut: Future<Output = Result<R, ActionError>>,
        P: FnMut(&ActionError) -> bool,
    {
        let mut backoff = self.backoff();
        let mut context = RetryContext::first();
        loop {
            match operation(context.clone()).await {
                Ok(value) => return Ok(value),
                Err(error) if error.is_cancelled() => {
                    debug!(
                        "Attempt {} was cancelled, not retrying",
                        context.attempt
                    );
                    return Err(error);
                }
                Err(error) => {
                    let exhausted = context.attempt + 1 >= self.max_retries;
                    if exhausted || !retry_if(&error) {
                        warn!(
                            "Attempt {} failed: {}. Giving up.",
                            context.attempt, error
                        );
                        return Err(error);
                    }
                    let delay =
                        backoff.next_backoff().unwrap_or(self.max_delay);
                    debug!(
                        "Attempt {} failed: {}. Retrying in {:?}.",
                        context.attempt, error, delay
                    );
                    tokio::select! {
                        _ = token.cancelled() => {
                            return Err(ActionError::Cancelled)
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                    context.attempt += 1;
                    context.last_error = Some(error);
                    context.waited = Some(delay);
                }
            }
        }
    }

    fn backoff(&self) -> backoff::ExponentialBackoff {
        backoff::ExponentialBackoff {
            current_interval: self.initial_delay,
            initial_interval: self.initial_delay,
            randomization_factor: 0.0,
            multiplier: self.factor,
            max_interval: self.max_delay,
            max_elapsed_time: None,
            ..backoff::ExponentialBackoff::default()
        }
    }
}
