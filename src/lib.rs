

//! Core library for the Relay framework.
//! Provides the foundational components for building fail-safe, serialized action pipelines.
//! This library includes the executor core, the retry and recovery machinery, and ready-made facades.
//! It is designed to be modular and extensible, allowing developers to build custom actions and state types.

pub use executor::{
    Action, ActionError, ActionExecutor, ActionHandler, ActionMailbox,
    ActionScope, EventBus, EventSink, ExecutionGate, ExecutionOutcome,
    ExecutionPermit, ExecutionSupervisor, ExecutorConfig, ExecutorError,
    ExecutorEvent, ExecutorPhase, History, RetryContext, RetryCoordinator,
    StateSnapshot, StateStore, StateValue, Subscriber,
};

pub use facades::{NavigationCoordinator, Repository, StateHolder};
