// Integration tests for the executor pipeline

use executor::{
    Action, ActionError, ActionExecutor, ActionHandler, ActionScope,
    ExecutorConfig, ExecutorEvent, ExecutorPhase,
};
use async_trait::async_trait;

use tracing_test::traced_test;

use std::sync::{Arc, Mutex};
use std::time::Duration;

// Defines the command under test.
#[derive(Debug, Clone, PartialEq)]
pub enum DocCommand {
    Insert(String),
    Clear,
}

impl Action for DocCommand {}

// Defines the state the commands act on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub content: String,
    pub revision: usize,
}

// Handler that records every executed command.
pub struct DocHandler {
    pub executed: Arc<Mutex<Vec<DocCommand>>>,
}

#[async_trait]
impl ActionHandler for DocHandler {
    type Action = DocCommand;
    type State = Document;

    async fn handle_action(
        &mut self,
        action: DocCommand,
        state: Document,
        _scope: &ActionScope,
    ) -> Result<Document, ActionError> {
        self.executed.lock().unwrap().push(action.clone());
        let content = match action {
            DocCommand::Insert(text) => format!("{}{}", state.content, text),
            DocCommand::Clear => String::new(),
        };
        Ok(Document {
            content,
            revision: state.revision + 1,
        })
    }
}

fn executor_with_window(
    window_ms: u64,
    executed: Arc<Mutex<Vec<DocCommand>>>,
) -> ActionExecutor<DocHandler> {
    let mut config = ExecutorConfig::interactive().with_label("doc");
    config.quiescence = Duration::from_millis(window_ms);
    ActionExecutor::new(DocHandler { executed }, Document::default(), config)
}

#[tokio::test]
#[traced_test]
async fn test_submissions_commit_in_order() {
    let executed = Arc::new(Mutex::new(Vec::new()));
    let mut executor = executor_with_window(5, executed.clone());
    executor.attach().unwrap();

    assert!(executor.submit(DocCommand::Insert("a".to_owned())));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(executor.submit(DocCommand::Insert("b".to_owned())));
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(
        executor.current(),
        Document {
            content: "ab".to_owned(),
            revision: 2
        }
    );
    assert_eq!(executor.phase(), ExecutorPhase::Idle);
    assert_eq!(executed.lock().unwrap().len(), 2);

    executor.detach().await;
}

#[tokio::test]
#[traced_test]
async fn test_queued_backlog_runs_fifo() {
    let executed = Arc::new(Mutex::new(Vec::new()));
    let mut executor = executor_with_window(0, executed.clone());

    // Queue a backlog before the consumer exists.
    executor.submit(DocCommand::Insert("a".to_owned()));
    executor.submit(DocCommand::Insert("b".to_owned()));
    executor.submit(DocCommand::Clear);
    executor.attach().unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(
        *executed.lock().unwrap(),
        vec![
            DocCommand::Insert("a".to_owned()),
            DocCommand::Insert("b".to_owned()),
            DocCommand::Clear,
        ]
    );
    let state = executor.current();
    assert_eq!(state.content, "");
    assert_eq!(state.revision, 3);

    executor.detach().await;
}

#[tokio::test]
#[traced_test]
async fn test_rapid_burst_runs_only_the_last() {
    let executed = Arc::new(Mutex::new(Vec::new()));
    let mut executor = executor_with_window(150, executed.clone());
    executor.attach().unwrap();

    executor.submit(DocCommand::Insert("a".to_owned()));
    executor.submit(DocCommand::Insert("b".to_owned()));
    executor.submit(DocCommand::Clear);
    tokio::time::sleep(Duration::from_millis(400)).await;

    assert_eq!(*executed.lock().unwrap(), vec![DocCommand::Clear]);
    assert_eq!(executor.current().revision, 1);

    executor.detach().await;
}

#[tokio::test]
#[traced_test]
async fn test_consecutive_duplicates_collapse() {
    let executed = Arc::new(Mutex::new(Vec::new()));
    let mut executor = executor_with_window(120, executed.clone());
    let mut events = executor.subscribe_events();
    executor.attach().unwrap();

    let save = DocCommand::Insert("save".to_owned());
    executor.submit(save.clone());
    executor.submit(save.clone());
    executor.submit(save.clone());
    tokio::time::sleep(Duration::from_millis(350)).await;

    assert_eq!(*executed.lock().unwrap(), vec![save]);

    let mut coalesced = 0;
    while let Ok(event) = events.try_recv() {
        if event == ExecutorEvent::Coalesced {
            coalesced += 1;
        }
    }
    assert_eq!(coalesced, 2);

    executor.detach().await;
}

#[tokio::test]
#[traced_test]
async fn test_repeat_after_settling_runs_again() {
    let executed = Arc::new(Mutex::new(Vec::new()));
    let mut executor = executor_with_window(30, executed.clone());
    executor.attach().unwrap();

    let save = DocCommand::Insert("save".to_owned());
    executor.submit(save.clone());
    tokio::time::sleep(Duration::from_millis(150)).await;
    executor.submit(save.clone());
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert_eq!(*executed.lock().unwrap(), vec![save.clone(), save]);
    assert_eq!(executor.current().revision, 2);

    executor.detach().await;
}

#[tokio::test]
#[traced_test]
async fn test_single_slot_overflow_keeps_newest() {
    let executed = Arc::new(Mutex::new(Vec::new()));
    let mut config = ExecutorConfig::navigation().with_label("doc");
    config.quiescence = Duration::from_millis(5);
    let handler = DocHandler {
        executed: executed.clone(),
    };
    let mut executor =
        ActionExecutor::new(handler, Document::default(), config);
    let mut events = executor.subscribe_events();

    // No consumer yet, so maturation happens on the submit path and the
    // single ready slot must evict.
    executor.submit(DocCommand::Insert("a".to_owned()));
    tokio::time::sleep(Duration::from_millis(20)).await;
    executor.submit(DocCommand::Insert("b".to_owned()));
    tokio::time::sleep(Duration::from_millis(20)).await;
    executor.submit(DocCommand::Clear);
    tokio::time::sleep(Duration::from_millis(20)).await;

    executor.attach().unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(*executed.lock().unwrap(), vec![DocCommand::Clear]);

    let mut dropped = 0;
    while let Ok(event) = events.try_recv() {
        if event == ExecutorEvent::DroppedOldest {
            dropped += 1;
        }
    }
    assert_eq!(dropped, 2);

    executor.detach().await;
}
