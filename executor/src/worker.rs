// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Worker module
//!
//! The consumer task behind an executor handle. The worker is the only
//! place that runs the action handler and the only place that mutates the
//! state store, which is what makes execution strictly serial: each
//! outcome is fully applied before the next delivery is taken.
//!

use crate::action::{ActionHandler, ActionScope};
use crate::events::{EventBus, ExecutorEvent};
use crate::gate::{ExecutionGate, ExecutionPermit};
use crate::mailbox::ActionMailbox;
use crate::phase::ExecutorPhase;
use crate::state::StateStore;
use crate::supervisor::{ExecutionOutcome, ExecutionSupervisor};

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use std::time::Duration;

/// A submission that bypassed the mailbox. The permit was acquired by the
/// submitter, so the worker must not acquire a second one.
pub(crate) struct DirectDispatch<A> {
    pub(crate) action: A,
    pub(crate) permit: ExecutionPermit,
}

/// Consumer half of an executor. Owns the handler, the state store and the
/// phase channel; everything else is shared with the handle.
pub(crate) struct ExecutorWorker<H: ActionHandler> {
    pub(crate) label: String,
    pub(crate) handler: H,
    pub(crate) store: StateStore<H::State>,
    pub(crate) mailbox: ActionMailbox<H::Action>,
    pub(crate) direct: mpsc::UnboundedReceiver<DirectDispatch<H::Action>>,
    pub(crate) gate: ExecutionGate,
    pub(crate) phase_tx: watch::Sender<ExecutorPhase>,
    pub(crate) bus: EventBus,
    pub(crate) token: CancellationToken,
    pub(crate) grace: Duration,
    pub(crate) supervisor: ExecutionSupervisor,
}

impl<H: ActionHandler> ExecutorWorker<H> {
    /// Runs until teardown or until both intake channels close.
    ///
    /// Direct dispatches are drained before mailbox deliveries: their
    /// permit is already held, so letting one wait behind a mailbox
    /// delivery that itself waits for the gate would wedge the loop.
    pub(crate) async fn run(mut self) {
        debug!("{}: worker attached", self.label);
        loop {
            tokio::select! {
                biased;
                _ = self.token.cancelled() => break,
                dispatch = self.direct.recv() => {
                    match dispatch {
                        Some(DirectDispatch { action, permit }) => {
                            self.execute(action, permit).await;
                        }
                        None => break,
                    }
                }
                delivered = self.mailbox.recv() => {
                    match delivered {
                        Some(action) => self.run_delivered(action).await,
                        None => break,
                    }
                }
            }
        }
        self.bus.publish(ExecutorEvent::Detached);
        debug!("{}: worker detached", self.label);
    }

    /// Acquires the gate for a mailbox delivery, yielding to any direct
    /// dispatch that arrives first with the permit in hand.
    async fn run_delivered(&mut self, action: H::Action) {
        loop {
            tokio::select! {
                biased;
                _ = self.token.cancelled() => return,
                dispatch = self.direct.recv() => {
                    match dispatch {
                        Some(DirectDispatch { action: direct, permit }) => {
                            self.execute(direct, permit).await;
                        }
                        None => {
                            if let Ok(permit) = self.gate.acquire().await {
                                self.execute(action, permit).await;
                            }
                            return;
                        }
                    }
                }
                permit = self.gate.acquire() => {
                    if let Ok(permit) = permit {
                        self.execute(action, permit).await;
                    }
                    return;
                }
            }
        }
    }

    /// Runs one action under the supervisor and applies the outcome.
    /// The permit is held until the outcome is fully applied, recovery
    /// included, so nothing else can start in between.
    async fn execute(&mut self, action: H::Action, _permit: ExecutionPermit) {
        debug!("{}: executing {:?}", self.label, action);
        self.set_phase(ExecutorPhase::Executing);
        self.bus.publish(ExecutorEvent::Started);

        let scope = ActionScope::new(self.token.child_token());
        let owner = self.token.clone();
        let supervisor = self.supervisor.clone();
        let before = self.store.current().clone();
        let outcome = supervisor
            .run(&owner, &scope, self.handler.handle_action(action, before, &scope))
            .await;

        match outcome {
            ExecutionOutcome::Success(next) => {
                self.store.commit(next);
                self.bus.publish(ExecutorEvent::Committed);
                self.set_phase(ExecutorPhase::Idle);
            }
            ExecutionOutcome::Cancelled => {
                debug!("{}: execution cancelled", self.label);
                self.bus.publish(ExecutorEvent::Cancelled);
                self.set_phase(ExecutorPhase::Idle);
            }
            ExecutionOutcome::Timeout(deadline) => {
                self.bus.publish(ExecutorEvent::TimedOut);
                self.recover(format!("deadline of {:?} elapsed", deadline))
                    .await;
            }
            ExecutionOutcome::Failed(failure) => {
                self.bus.publish(ExecutorEvent::Failed {
                    reason: failure.to_string(),
                });
                self.recover(failure.to_string()).await;
            }
        }
    }

    /// Error phase: publish the handler's fallback rendering, hold for the
    /// grace delay, then restore the last committed state. Teardown cuts
    /// the delay short but never skips the rollback.
    async fn recover(&mut self, reason: String) {
        error!("{}: {}. Entering error phase.", self.label, reason);
        self.set_phase(ExecutorPhase::Error);
        let fallback = self
            .handler
            .error_state(self.store.current().clone(), &reason);
        self.store.publish_error(fallback);

        tokio::select! {
            _ = self.token.cancelled() => {}
            _ = tokio::time::sleep(self.grace) => {}
        }

        if self.store.rollback_to_last().is_some() {
            self.bus.publish(ExecutorEvent::RolledBack);
        }
        self.set_phase(ExecutorPhase::Idle);
    }

    fn set_phase(&self, next: ExecutorPhase) {
        self.phase_tx.send_if_modified(|phase| {
            if *phase == next {
                return false;
            }
            if !phase.can_transition(next) {
                warn!(
                    "{}: refused phase change {:?} -> {:?}",
                    self.label, phase, next
                );
                return false;
            }
            *phase = next;
            true
        });
    }
}
