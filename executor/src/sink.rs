

//! Event sink and subscriber pattern implementation.
//!
//! Sinks run in separate tasks and receive lifecycle events from an executor
//! via its broadcast channel, allowing observers to react to submissions,
//! commits, failures and recoveries without touching the executor itself.

use crate::events::ExecutorEvent;

use async_trait::async_trait;
use tokio::sync::broadcast::{Receiver as EventReceiver, error::RecvError};

use tracing::debug;

/// A sink that receives executor events and notifies a subscriber.
/// The sink runs in its own task and processes events asynchronously.
pub struct EventSink {
    /// The subscriber that will be notified of events.
    subscriber: Box<dyn Subscriber>,
    /// The broadcast receiver for executor events.
    event_receiver: EventReceiver<ExecutorEvent>,
}

impl EventSink {
    /// Creates a new sink with the given event receiver and subscriber.
    ///
    /// # Arguments
    ///
    /// * `event_receiver` - Broadcast receiver subscribed to an executor's event channel.
    /// * `subscriber` - Implementation of the Subscriber trait that will process events.
    ///
    /// # Returns
    ///
    /// Returns a new sink instance ready to be run.
    ///
    pub fn new(
        event_receiver: EventReceiver<ExecutorEvent>,
        subscriber: impl Subscriber,
    ) -> Self {
        EventSink {
            subscriber: Box::new(subscriber),
            event_receiver,
        }
    }

    /// Runs the sink's event processing loop.
    /// This method will block and continuously process events until the
    /// event channel is closed. Should be spawned in a separate task.
    ///
    /// # Behavior
    ///
    /// - Receives events from the broadcast channel.
    /// - Notifies the subscriber of each event.
    /// - Handles lagged events by catching up (skips missed events).
    /// - Exits when the event channel is closed.
    ///
    pub async fn run(&mut self) {
        loop {
            match self.event_receiver.recv().await {
                Ok(event) => {
                    debug!(
                        "Received event: {:?}. Notify to the subscriber.",
                        event
                    );
                    self.subscriber.notify(event).await;
                }
                Err(error) => {
                    match error {
                        RecvError::Closed => break,
                        RecvError::Lagged(_) => {
                            // A lagging receiver drops the oldest events and
                            // keeps going with whatever is still buffered.
                            continue;
                        }
                    }
                }
            }
        }
    }
}

/// Trait for types that can receive and process executor events.
/// Implement this trait to define custom event processing logic
/// that will be invoked by a sink for each event received.
#[async_trait]
pub trait Subscriber: Send + Sync + 'static {
    /// Called when an event is received by the sink.
    ///
    /// # Arguments
    ///
    /// * `event` - The event to process.
    ///
    async fn notify(&self, event: ExecutorEvent);
}
