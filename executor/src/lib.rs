// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Relay Executor
//!
//! A fail-safe, strictly serialized action executor for stateful services in
//! Rust. This library runs user-defined actions one at a time against a
//! private state value, survives failures, timeouts and panics inside those
//! actions, and always converges back to a known-good state without manual
//! intervention.
//!
//! ## Overview
//!
//! Interactive systems accumulate the same failure patterns over and over:
//! two mutations interleave and corrupt shared state, a burst of duplicate
//! intents runs an expensive effect several times, one hung call wedges the
//! pipeline forever, and an unhandled error leaves the state machine in a
//! shape nothing can recover from. This crate packages one answer to all of
//! them behind a single handle.
//!
//! Every submission flows through the same pipeline:
//!
//! - A debouncing mailbox absorbs bursts, collapses consecutive duplicates
//!   and bounds queued work, dropping the oldest entry on overflow.
//! - An execution gate admits exactly one action at a time; callers either
//!   queue behind it or get an immediate refusal, never a second runner.
//! - A supervisor bounds each execution with a deadline and contains
//!   failures and panics so the consumer task itself never dies.
//! - A state store publishes every committed state and keeps a bounded
//!   history of snapshots as rollback targets.
//! - A recovery policy publishes a typed error state, waits out a grace
//!   delay and rolls back to the last committed snapshot.
//!
//! Cancellation is cooperative and never treated as a failure: tearing an
//! executor down mid-action neither publishes an error state nor rolls
//! anything back.
//!
//! ## Getting Started
//!
//! ```ignore
//! use executor::{
//!     Action, ActionExecutor, ActionHandler, ActionScope, ActionError,
//!     ExecutorConfig,
//! };
//! use async_trait::async_trait;
//!
//! // Define the actions your executor runs.
//! #[derive(Clone, Debug, PartialEq)]
//! enum CounterAction {
//!     Add(u64),
//!     Reset,
//! }
//!
//! impl Action for CounterAction {}
//!
//! // Define the state they act on.
//! #[derive(Clone, Debug, Default)]
//! struct Counter {
//!     value: u64,
//! }
//!
//! // Implement the handler: take the current state, return the next one.
//! struct CounterHandler;
//!
//! #[async_trait]
//! impl ActionHandler for CounterHandler {
//!     type Action = CounterAction;
//!     type State = Counter;
//!
//!     async fn handle_action(
//!         &mut self,
//!         action: CounterAction,
//!         state: Counter,
//!         scope: &ActionScope,
//!     ) -> Result<Counter, ActionError> {
//!         scope.checkpoint()?;
//!         match action {
//!             CounterAction::Add(n) => Ok(Counter { value: state.value + n }),
//!             CounterAction::Reset => Ok(Counter::default()),
//!         }
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut executor = ActionExecutor::new(
//!         CounterHandler,
//!         Counter::default(),
//!         ExecutorConfig::interactive().with_label("counter"),
//!     );
//!     executor.attach().expect("freshly built executors attach once");
//!
//!     // Bursts collapse in the mailbox; only the settled intent runs.
//!     executor.submit(CounterAction::Add(1));
//!     executor.submit(CounterAction::Add(1));
//!
//!     // Watch states as they are published.
//!     let mut states = executor.subscribe();
//!     while states.changed().await.is_ok() {
//!         println!("counter is now {}", states.borrow().value);
//!     }
//!
//!     executor.detach().await;
//! }
//! ```
//!
//! ## Choosing a Profile
//!
//! [`ExecutorConfig`] ships three profiles. `interactive()` debounces
//! bursts for 300 ms and queues up to 64 matured actions, for UI intent
//! streams. `navigation()` disables the debounce, keeps a single queue
//! slot and shortens the deadline to 2 s, for transition effects where a
//! repeated command is a legitimate repeat. `repository()` disables the
//! debounce and keeps the long deadline, for data-access calls that are
//! usually wrapped in retries instead.
//!
//! ## Standalone Pieces
//!
//! The pipeline stages are ordinary types and can be used on their own:
//! [`RetryCoordinator`] wraps any fallible future in bounded exponential
//! backoff, [`ExecutionGate`] is a one-permit admission gate with a
//! non-blocking probe, and [`ExecutionSupervisor`] classifies a single
//! execution into success, failure, timeout or cancellation.
//!

// Private modules containing the implementation
mod action;
mod config;
mod error;
mod events;
mod executor;
mod gate;
mod mailbox;
mod phase;
mod retry;
mod sink;
mod state;
mod supervisor;
mod worker;

//
// Core Executor Types
//

/// Marker trait for values that can be submitted to an executor.
///
/// Actions are compared for the mailbox's duplicate collapse and cloned
/// when a submission is logged, so the trait requires `Clone`, `Debug` and
/// `PartialEq` on top of the usual thread-safety bounds.
pub use action::Action;

/// The user-supplied execution logic of an executor.
///
/// A handler receives one action at a time together with the current state
/// and returns the next state. Handlers never run concurrently with
/// themselves; the executor guarantees strict serialization.
///
/// See [`ActionExecutor`] for how handlers are hosted.
pub use action::ActionHandler;

/// Per-execution context handed to a running action.
///
/// Carries the cancellation token scoped to this execution. Long actions
/// should call [`ActionScope::checkpoint`] between steps to observe
/// deadline kills and teardown cooperatively.
pub use action::ActionScope;

/// Marker trait for state values an executor manages.
///
/// Blanket-implemented for any `Clone + Debug + Send + Sync + 'static`
/// type.
pub use action::StateValue;

/// Handle to a fail-safe serialized executor.
///
/// Built from a handler, an initial state and an [`ExecutorConfig`];
/// consuming starts with [`ActionExecutor::attach`] and ends with
/// [`ActionExecutor::detach`] or drop.
pub use executor::ActionExecutor;

//
// Configuration
//

/// Tuning knobs for one executor instance, with profiles for interactive,
/// navigation and repository workloads.
pub use config::ExecutorConfig;

//
// Error Handling
//

/// Failure of one action execution, as seen by handlers and callers.
///
/// Distinguishes timeouts, cancellation, transient faults worth retrying
/// and plain operation failures. Cancellation is deliberately an error
/// variant so it can flow through `Result` plumbing, but the executor
/// never treats it as a failure.
pub use error::ActionError;

/// Failure of the executor machinery itself, distinct from action
/// failures.
pub use error::ExecutorError;

//
// Pipeline Stages
//

/// Debouncing, duplicate-collapsing intake queue.
///
/// Embedded in every executor and usable standalone. Submissions mature
/// after a quiescence window; consecutive equal submissions collapse into
/// one delivery while the window is open.
pub use mailbox::ActionMailbox;

/// One-permit admission gate serializing executions.
///
/// Blocking waiters are served in arrival order; [`ExecutionGate::try_acquire`]
/// probes without queuing for callers that prefer refusal over waiting.
pub use gate::ExecutionGate;

/// Proof of gate admission, releasing the gate on drop.
pub use gate::ExecutionPermit;

/// Deadline-bounded, failure-isolating runner for one action body.
///
/// Panics inside the body are contained and rendered as failures; deadline
/// kills and owner teardown cancel the execution scope.
pub use supervisor::ExecutionSupervisor;

/// Classified result of one supervised execution.
pub use supervisor::ExecutionOutcome;

/// Bounded exponential-backoff retry around a single operation.
///
/// Delay after failed attempt `n` is `min(initial * factor^n, max)`;
/// cancellation short-circuits and is never retried.
pub use retry::RetryCoordinator;

/// What a retried operation knows about previous attempts.
pub use retry::RetryContext;

//
// State Management
//

/// Current state plus a bounded ring of committed snapshots.
///
/// Owned by the executor's consumer task; observers read through the watch
/// channel returned at construction.
pub use state::StateStore;

/// One committed state together with the instant it was taken.
pub use state::StateSnapshot;

/// Bounded ring of snapshots, evicting the oldest when full.
pub use state::History;

/// Where an executor currently is in its recovery cycle.
pub use phase::ExecutorPhase;

//
// Event System
//

/// Lifecycle events published by an executor instance.
///
/// Covers intake (accepted, coalesced, superseded, dropped, rejected),
/// execution (started, committed, timed out, failed, cancelled) and
/// recovery (rolled back), plus consumer teardown.
pub use events::ExecutorEvent;

/// Broadcast fan-out carrying [`ExecutorEvent`] values to observers.
pub use events::EventBus;

/// Event sink container that connects an executor's event stream to a
/// subscriber implementation.
///
/// See [`Subscriber`] for event processing implementation patterns.
pub use sink::EventSink;

/// Trait for components that process events published by executors.
///
/// See [`EventSink`] for connecting subscribers to event streams.
pub use sink::Subscriber;
