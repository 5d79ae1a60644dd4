// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Executor module
//!
//! The public handle over one serialized action pipeline. The handle
//! accepts submissions and exposes read channels; all execution happens in
//! the consumer task spawned by [`ActionExecutor::attach`].
//!

use crate::action::ActionHandler;
use crate::config::ExecutorConfig;
use crate::error::ExecutorError;
use crate::events::{EventBus, ExecutorEvent};
use crate::gate::ExecutionGate;
use crate::mailbox::ActionMailbox;
use crate::phase::ExecutorPhase;
use crate::state::StateStore;
use crate::supervisor::ExecutionSupervisor;
use crate::worker::{DirectDispatch, ExecutorWorker};

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Handle to a fail-safe serialized executor.
///
/// Submissions go through the debouncing mailbox with [`ActionExecutor::submit`]
/// or bypass it with [`ActionExecutor::try_submit`], which refuses instead of
/// queuing when an action is already in flight. State, phase and lifecycle
/// events are observed through the subscription channels.
///
/// Dropping the handle tears the consumer task down.
pub struct ActionExecutor<H: ActionHandler> {
    label: String,
    mailbox: ActionMailbox<H::Action>,
    direct_tx: mpsc::UnboundedSender<DirectDispatch<H::Action>>,
    gate: ExecutionGate,
    state_rx: watch::Receiver<H::State>,
    phase_rx: watch::Receiver<ExecutorPhase>,
    bus: EventBus,
    token: CancellationToken,
    seed: Option<ExecutorWorker<H>>,
    task: Option<JoinHandle<()>>,
}

impl<H: ActionHandler> ActionExecutor<H> {
    /// Builds an executor around `handler`, seeded with `initial` as the
    /// first committed state. Nothing runs until [`ActionExecutor::attach`].
    pub fn new(handler: H, initial: H::State, config: ExecutorConfig) -> Self {
        let ExecutorConfig {
            label,
            deadline,
            quiescence,
            mailbox_capacity,
            history_capacity,
            grace,
            bus_capacity,
        } = config;

        let bus = EventBus::new(bus_capacity);
        let mailbox =
            ActionMailbox::new(mailbox_capacity, quiescence, bus.clone());
        let gate = ExecutionGate::new();
        let (store, state_rx) = StateStore::new(initial, history_capacity);
        let (phase_tx, phase_rx) = watch::channel(ExecutorPhase::Idle);
        let (direct_tx, direct_rx) = mpsc::unbounded_channel();
        let token = CancellationToken::new();

        let seed = ExecutorWorker {
            label: label.clone(),
            handler,
            store,
            mailbox: mailbox.clone(),
            direct: direct_rx,
            gate: gate.clone(),
            phase_tx,
            bus: bus.clone(),
            token: token.clone(),
            grace,
            supervisor: ExecutionSupervisor::new(deadline),
        };

        Self {
            label,
            mailbox,
            direct_tx,
            gate,
            state_rx,
            phase_rx,
            bus,
            token,
            seed: Some(seed),
            task: None,
        }
    }

    /// Spawns the consumer task.
    ///
    /// # Errors
    ///
    /// [`ExecutorError::AlreadyAttached`] if the task was already spawned,
    /// including after a detach.
    pub fn attach(&mut self) -> Result<(), ExecutorError> {
        let Some(worker) = self.seed.take() else {
            return Err(ExecutorError::AlreadyAttached);
        };
        debug!("{}: attaching consumer task", self.label);
        self.task = Some(tokio::spawn(worker.run()));
        Ok(())
    }

    /// True while the consumer task is spawned and not yet detached.
    pub fn is_attached(&self) -> bool {
        self.task.is_some()
    }

    /// Stops consuming, cancels any in-flight action and waits for the
    /// consumer task to finish. Queued submissions are discarded.
    pub async fn detach(&mut self) {
        debug!("{}: detaching", self.label);
        self.token.cancel();
        self.mailbox.close();
        if let Some(task) = self.task.take() {
            if let Err(error) = task.await {
                warn!(
                    "{}: consumer task ended abnormally: {}",
                    self.label, error
                );
            }
        }
    }

    /// Submits through the mailbox. The action is delivered once the
    /// quiescence window elapses with no newer submission.
    ///
    /// # Returns
    ///
    /// False if the mailbox is closed.
    pub fn submit(&self, action: H::Action) -> bool {
        self.mailbox.submit(action)
    }

    /// Submits for immediate execution, refusing instead of queuing.
    ///
    /// # Returns
    ///
    /// False if an action is already in flight or the executor is gone;
    /// a refusal publishes [`ExecutorEvent::Rejected`].
    pub fn try_submit(&self, action: H::Action) -> bool {
        let Some(permit) = self.gate.try_acquire() else {
            debug!("{}: busy, refusing {:?}", self.label, action);
            self.bus.publish(ExecutorEvent::Rejected);
            return false;
        };
        match self.direct_tx.send(DirectDispatch { action, permit }) {
            Ok(()) => {
                self.bus.publish(ExecutorEvent::Accepted);
                true
            }
            Err(error) => {
                warn!("{}: direct dispatch failed: {}", self.label, error);
                false
            }
        }
    }

    /// The current state. Equals the last committed state except while an
    /// error state is published during recovery.
    pub fn current(&self) -> H::State {
        self.state_rx.borrow().clone()
    }

    /// Watches every published state, committed or error. A value
    /// published before the call is still pending on the new receiver,
    /// so the first `changed().await` resolves immediately with the
    /// latest one.
    pub fn subscribe(&self) -> watch::Receiver<H::State> {
        self.state_rx.clone()
    }

    /// The current phase.
    pub fn phase(&self) -> ExecutorPhase {
        *self.phase_rx.borrow()
    }

    /// Watches phase changes.
    pub fn subscribe_phase(&self) -> watch::Receiver<ExecutorPhase> {
        self.phase_rx.clone()
    }

    /// Opens a lifecycle event subscription, e.g. to feed a
    /// [`crate::EventSink`].
    pub fn subscribe_events(&self) -> broadcast::Receiver<ExecutorEvent> {
        self.bus.subscribe()
    }

    /// True while an action is in flight.
    pub fn is_busy(&self) -> bool {
        !self.gate.is_free()
    }

    /// The teardown token. Cancelled on detach and on drop.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }
}

impl<H: ActionHandler> Drop for ActionExecutor<H> {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::action::{Action, ActionScope};
    use crate::error::ActionError;

    use async_trait::async_trait;

    use std::time::Duration;

    #[derive(Clone, Debug, PartialEq)]
    struct Step(u32);

    impl Action for Step {}

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Tally {
        total: u32,
    }

    struct TallyHandler;

    #[async_trait]
    impl ActionHandler for TallyHandler {
        type Action = Step;
        type State = Tally;

        async fn handle_action(
            &mut self,
            action: Step,
            state: Tally,
            _scope: &ActionScope,
        ) -> Result<Tally, ActionError> {
            Ok(Tally {
                total: state.total + action.0,
            })
        }
    }

    fn quick_config() -> ExecutorConfig {
        let mut config = ExecutorConfig::interactive().with_label("test");
        config.quiescence = Duration::from_millis(10);
        config
    }

    #[tokio::test]
    async fn test_attach_is_one_shot() {
        let mut executor =
            ActionExecutor::new(TallyHandler, Tally::default(), quick_config());
        assert!(!executor.is_attached());
        assert!(executor.attach().is_ok());
        assert!(executor.is_attached());
        assert_eq!(executor.attach(), Err(ExecutorError::AlreadyAttached));

        executor.detach().await;
        assert!(!executor.is_attached());
        assert_eq!(executor.attach(), Err(ExecutorError::AlreadyAttached));
    }

    #[tokio::test]
    async fn test_submission_before_attach_runs_after() {
        let mut executor =
            ActionExecutor::new(TallyHandler, Tally::default(), quick_config());
        assert!(executor.submit(Step(3)));
        assert_eq!(executor.current(), Tally { total: 0 });

        executor.attach().expect("first attach");
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(executor.current(), Tally { total: 3 });
        assert_eq!(executor.phase(), ExecutorPhase::Idle);

        executor.detach().await;
    }

    #[tokio::test]
    async fn test_submit_after_detach_is_refused() {
        let mut executor =
            ActionExecutor::new(TallyHandler, Tally::default(), quick_config());
        executor.attach().expect("first attach");
        executor.detach().await;
        assert!(!executor.submit(Step(1)));
    }
}
