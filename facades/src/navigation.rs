// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! Navigation coordinator facade.
//!

use executor::{
    ActionExecutor, ActionHandler, ExecutorConfig, ExecutorError,
    ExecutorEvent,
};

use tokio::sync::{broadcast, watch};
use tracing::debug;

/// Single-flight coordinator for navigation transitions.
///
/// Wraps an [`ActionExecutor`] in the navigation profile: no debounce, a
/// 2 s deadline and a single queue slot. A command submitted while a
/// transition runs is refused rather than queued, so hammering a button
/// cannot schedule a pile of transitions; a deliberate repeat once the
/// transition finished runs normally.
pub struct NavigationCoordinator<H: ActionHandler> {
    executor: ActionExecutor<H>,
}

impl<H: ActionHandler> NavigationCoordinator<H> {
    /// Creates a coordinator with the navigation profile.
    pub fn new(handler: H, initial: H::State) -> Self {
        Self::with_config(handler, initial, ExecutorConfig::navigation())
    }

    /// Creates a coordinator with an explicit profile.
    pub fn with_config(
        handler: H,
        initial: H::State,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            executor: ActionExecutor::new(handler, initial, config),
        }
    }

    /// Starts consuming transitions.
    ///
    /// # Errors
    ///
    /// [`ExecutorError::AlreadyAttached`] if called more than once.
    pub fn attach(&mut self) -> Result<(), ExecutorError> {
        self.executor.attach()
    }

    /// Stops consuming and cancels any running transition.
    pub async fn detach(&mut self) {
        self.executor.detach().await;
    }

    /// Runs a transition now, or refuses if one is already running.
    ///
    /// # Returns
    ///
    /// False if the command was refused.
    pub fn navigate(&self, action: H::Action) -> bool {
        let accepted = self.executor.try_submit(action);
        if !accepted {
            debug!("Navigation refused, a transition is running");
        }
        accepted
    }

    /// Queues a transition behind the running one. The queue holds a
    /// single slot; an older queued transition is dropped for a newer one.
    pub fn enqueue(&self, action: H::Action) -> bool {
        self.executor.submit(action)
    }

    /// True while a transition is running.
    pub fn is_transitioning(&self) -> bool {
        self.executor.is_busy()
    }

    /// The current navigation state.
    pub fn current(&self) -> H::State {
        self.executor.current()
    }

    /// Watches every published navigation state.
    pub fn state(&self) -> watch::Receiver<H::State> {
        self.executor.subscribe()
    }

    /// Opens a lifecycle event subscription.
    pub fn events(&self) -> broadcast::Receiver<ExecutorEvent> {
        self.executor.subscribe_events()
    }
}
