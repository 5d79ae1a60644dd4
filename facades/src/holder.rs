// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! State holder facade.
//!

use executor::{
    ActionExecutor, ActionHandler, ExecutorConfig, ExecutorError,
    ExecutorEvent, ExecutorPhase,
};

use tokio::sync::{broadcast, watch};

/// Debounced, fail-safe holder for one piece of interactive state.
///
/// Wraps an [`ActionExecutor`] in the interactive profile: dispatched
/// intents settle for the quiescence window, collapse when repeated and
/// run strictly one at a time. Reads never block on a running intent.
pub struct StateHolder<H: ActionHandler> {
    executor: ActionExecutor<H>,
}

impl<H: ActionHandler> StateHolder<H> {
    /// Creates a holder with the interactive profile.
    pub fn new(handler: H, initial: H::State) -> Self {
        Self::with_config(handler, initial, ExecutorConfig::interactive())
    }

    /// Creates a holder with an explicit profile.
    pub fn with_config(
        handler: H,
        initial: H::State,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            executor: ActionExecutor::new(handler, initial, config),
        }
    }

    /// Starts consuming dispatched intents.
    ///
    /// # Errors
    ///
    /// [`ExecutorError::AlreadyAttached`] if called more than once.
    pub fn attach(&mut self) -> Result<(), ExecutorError> {
        self.executor.attach()
    }

    /// Stops consuming and cancels any running intent.
    pub async fn detach(&mut self) {
        self.executor.detach().await;
    }

    /// Dispatches a state intent through the debouncing mailbox.
    ///
    /// # Returns
    ///
    /// False once the holder is detached.
    pub fn dispatch(&self, action: H::Action) -> bool {
        self.executor.submit(action)
    }

    /// The current state, committed or error.
    pub fn current(&self) -> H::State {
        self.executor.current()
    }

    /// Watches every published state.
    pub fn state(&self) -> watch::Receiver<H::State> {
        self.executor.subscribe()
    }

    /// The current phase.
    pub fn phase(&self) -> ExecutorPhase {
        self.executor.phase()
    }

    /// Watches phase changes.
    pub fn phases(&self) -> watch::Receiver<ExecutorPhase> {
        self.executor.subscribe_phase()
    }

    /// Opens a lifecycle event subscription.
    pub fn events(&self) -> broadcast::Receiver<ExecutorEvent> {
        self.executor.subscribe_events()
    }
}
