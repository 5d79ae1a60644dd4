// Integration tests for failure recovery and cancellation

use executor::{
    Action, ActionError, ActionExecutor, ActionHandler, ActionScope,
    ExecutorConfig, ExecutorEvent, ExecutorPhase,
};
use async_trait::async_trait;

use tracing_test::traced_test;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

// Defines commands covering the failure modes under test.
#[derive(Debug, Clone, PartialEq)]
pub enum ChaosCommand {
    Work(u64),
    Fail,
    Hang(u64),
    Panic,
}

impl Action for ChaosCommand {}

// Defines the state the commands act on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChaosState {
    pub committed: usize,
    pub degraded: bool,
}

// Handler that tracks how many executions overlap.
pub struct ChaosHandler {
    pub in_flight: Arc<AtomicUsize>,
    pub peak: Arc<AtomicUsize>,
}

impl ChaosHandler {
    fn new() -> Self {
        Self {
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl ActionHandler for ChaosHandler {
    type Action = ChaosCommand;
    type State = ChaosState;

    async fn handle_action(
        &mut self,
        action: ChaosCommand,
        state: ChaosState,
        scope: &ActionScope,
    ) -> Result<ChaosState, ActionError> {
        match action {
            ChaosCommand::Work(millis) => {
                let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(current, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(millis)).await;
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(ChaosState {
                    committed: state.committed + 1,
                    degraded: false,
                })
            }
            ChaosCommand::Fail => {
                Err(ActionError::Operation("storage refused".to_owned()))
            }
            ChaosCommand::Hang(millis) => {
                tokio::time::sleep(Duration::from_millis(millis)).await;
                scope.checkpoint()?;
                Ok(state)
            }
            ChaosCommand::Panic => panic!("handler exploded"),
        }
    }

    fn error_state(&self, state: ChaosState, _reason: &str) -> ChaosState {
        ChaosState {
            degraded: true,
            ..state
        }
    }
}

fn chaos_executor(
    grace_ms: u64,
) -> (ActionExecutor<ChaosHandler>, Arc<AtomicUsize>) {
    let handler = ChaosHandler::new();
    let peak = handler.peak.clone();
    let mut config = ExecutorConfig::interactive().with_label("chaos");
    config.quiescence = Duration::ZERO;
    config.grace = Duration::from_millis(grace_ms);
    let executor = ActionExecutor::new(handler, ChaosState::default(), config);
    (executor, peak)
}

#[tokio::test]
#[traced_test]
async fn test_executions_never_overlap() {
    let (mut executor, peak) = chaos_executor(50);
    executor.attach().unwrap();

    for _ in 0..5 {
        assert!(executor.submit(ChaosCommand::Work(30)));
    }
    tokio::time::sleep(Duration::from_millis(400)).await;

    assert_eq!(executor.current().committed, 5);
    assert_eq!(peak.load(Ordering::SeqCst), 1);

    executor.detach().await;
}

#[tokio::test]
#[traced_test]
async fn test_failure_publishes_error_state_then_rolls_back() {
    let (mut executor, _peak) = chaos_executor(80);
    executor.attach().unwrap();

    // Commit once so rollback has a target beyond the initial state.
    executor.submit(ChaosCommand::Work(5));
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(executor.current().committed, 1);

    // A new subscriber replays the latest value immediately; consume it
    // so the next change observed is the failure publication.
    let mut states = executor.subscribe();
    assert_eq!(
        *states.borrow_and_update(),
        ChaosState {
            committed: 1,
            degraded: false
        }
    );

    let started = Instant::now();
    executor.submit(ChaosCommand::Fail);

    // First publication after the replay is the degraded rendering of the
    // failure.
    states.changed().await.unwrap();
    assert_eq!(
        *states.borrow_and_update(),
        ChaosState {
            committed: 1,
            degraded: true
        }
    );
    assert_eq!(executor.phase(), ExecutorPhase::Error);

    // Next is the rollback to the last committed state, held back by the
    // grace delay.
    states.changed().await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(80));
    assert_eq!(
        *states.borrow_and_update(),
        ChaosState {
            committed: 1,
            degraded: false
        }
    );
    tokio::time::sleep(Duration::from_millis(40)).await;
    assert_eq!(executor.phase(), ExecutorPhase::Idle);

    executor.detach().await;
}

#[tokio::test]
#[traced_test]
async fn test_deadline_elapses_into_recovery() {
    let handler = ChaosHandler::new();
    let mut config = ExecutorConfig::interactive().with_label("chaos");
    config.quiescence = Duration::ZERO;
    config.deadline = Duration::from_millis(60);
    config.grace = Duration::from_millis(30);
    let mut executor =
        ActionExecutor::new(handler, ChaosState::default(), config);
    let mut events = executor.subscribe_events();
    executor.attach().unwrap();

    executor.submit(ChaosCommand::Hang(500));
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(executor.current(), ChaosState::default());
    assert_eq!(executor.phase(), ExecutorPhase::Idle);

    let mut timed_out = false;
    let mut rolled_back = false;
    while let Ok(event) = events.try_recv() {
        match event {
            ExecutorEvent::TimedOut => timed_out = true,
            ExecutorEvent::RolledBack => rolled_back = true,
            _ => {}
        }
    }
    assert!(timed_out);
    assert!(rolled_back);

    executor.detach().await;
}

#[tokio::test]
#[traced_test]
async fn test_panic_is_contained_and_the_next_action_runs() {
    let (mut executor, _peak) = chaos_executor(20);
    let mut events = executor.subscribe_events();
    executor.attach().unwrap();

    executor.submit(ChaosCommand::Panic);
    tokio::time::sleep(Duration::from_millis(150)).await;

    let mut failure_reason = None;
    while let Ok(event) = events.try_recv() {
        if let ExecutorEvent::Failed { reason } = event {
            failure_reason = Some(reason);
        }
    }
    let reason = failure_reason.expect("the panic surfaces as a failure");
    assert!(reason.contains("handler exploded"));

    // The consumer survived and keeps executing.
    executor.submit(ChaosCommand::Work(5));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(executor.current().committed, 1);
    assert_eq!(executor.phase(), ExecutorPhase::Idle);

    executor.detach().await;
}

#[tokio::test]
#[traced_test]
async fn test_detach_cancels_without_failure_handling() {
    let (mut executor, _peak) = chaos_executor(2_000);
    let mut events = executor.subscribe_events();
    executor.attach().unwrap();

    executor.submit(ChaosCommand::Hang(10_000));
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert!(executor.is_busy());

    let started = Instant::now();
    executor.detach().await;
    assert!(started.elapsed() < Duration::from_millis(500));

    // Cancellation is not a failure: no error state, no rollback.
    assert_eq!(executor.current(), ChaosState::default());

    let mut cancelled = false;
    let mut detached = false;
    while let Ok(event) = events.try_recv() {
        match event {
            ExecutorEvent::Cancelled => cancelled = true,
            ExecutorEvent::Detached => detached = true,
            ExecutorEvent::Failed { .. }
            | ExecutorEvent::TimedOut
            | ExecutorEvent::RolledBack => {
                panic!("teardown must not look like a failure")
            }
            _ => {}
        }
    }
    assert!(cancelled);
    assert!(detached);
}
