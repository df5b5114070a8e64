//! Run-progress notifications.
//!
//! The engine emits a [`RunEvent`] at every observable transition (workflow
//! loaded, action started/skipped, revision persisted, run suspended,
//! terminal state). A [`NotificationBus`] broadcasts them to pluggable
//! sinks: [`TracingSink`] logs through `tracing`, [`ChannelSink`] forwards to
//! a flume channel for embedders that push progress to clients.
//!
//! This is observability only. Clients that need authoritative state watch
//! the persisted content rows; every state transition the engine makes is
//! also an ordinary store write.

use chrono::{DateTime, Utc};
use flume::{Receiver, Sender};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio::{sync::oneshot, task};
use tracing::info;

/// One observable moment in a workflow run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunEvent {
    pub run_id: String,
    pub content_id: String,
    /// Short machine-readable label ("action", "suspend", "terminal", ...).
    pub scope: String,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl RunEvent {
    pub fn new(
        run_id: impl Into<String>,
        content_id: impl Into<String>,
        scope: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            content_id: content_id.into(),
            scope: scope.into(),
            message: message.into(),
            at: Utc::now(),
        }
    }
}

/// Receives run events broadcast by the bus.
pub trait EventSink: Send + Sync {
    fn handle(&mut self, event: &RunEvent);
}

/// Sink that logs events through `tracing`.
#[derive(Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn handle(&mut self, event: &RunEvent) {
        info!(
            run_id = %event.run_id,
            content_id = %event.content_id,
            scope = %event.scope,
            "{}",
            event.message
        );
    }
}

/// Sink that forwards events into a flume channel.
pub struct ChannelSink {
    sender: Sender<RunEvent>,
}

impl ChannelSink {
    pub fn new(sender: Sender<RunEvent>) -> Self {
        Self { sender }
    }
}

impl EventSink for ChannelSink {
    fn handle(&mut self, event: &RunEvent) {
        // Receiver gone means nobody is watching; drop silently.
        let _ = self.sender.send(event.clone());
    }
}

struct ListenerState {
    shutdown: oneshot::Sender<()>,
    handle: task::JoinHandle<()>,
}

/// Broadcasts run events to registered sinks from a background task.
pub struct NotificationBus {
    sinks: Arc<Mutex<Vec<Box<dyn EventSink>>>>,
    channel: (Sender<RunEvent>, Receiver<RunEvent>),
    listener: Mutex<Option<ListenerState>>,
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::with_sink(TracingSink)
    }
}

impl NotificationBus {
    pub fn with_sink<S: EventSink + 'static>(sink: S) -> Self {
        Self::with_sinks(vec![Box::new(sink)])
    }

    pub fn with_sinks(sinks: Vec<Box<dyn EventSink>>) -> Self {
        Self {
            sinks: Arc::new(Mutex::new(sinks)),
            channel: flume::unbounded(),
            listener: Mutex::new(None),
        }
    }

    /// Add a sink after construction (per-request streaming).
    pub fn add_sink<S: EventSink + 'static>(&self, sink: S) {
        if let Ok(mut sinks) = self.sinks.lock() {
            sinks.push(Box::new(sink));
        }
    }

    /// Sender handle for producers.
    pub fn sender(&self) -> Sender<RunEvent> {
        self.channel.0.clone()
    }

    /// Spawn the background dispatch task. Idempotent.
    pub fn listen(&self) {
        let mut guard = match self.listener.lock() {
            Ok(guard) => guard,
            Err(_) => return,
        };
        if guard.is_some() {
            return;
        }

        let receiver = self.channel.1.clone();
        let sinks = Arc::clone(&self.sinks);
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let handle = task::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    recv = receiver.recv_async() => match recv {
                        Err(_) => break,
                        Ok(event) => {
                            if let Ok(mut sinks) = sinks.lock() {
                                for sink in sinks.iter_mut() {
                                    sink.handle(&event);
                                }
                            }
                        }
                    }
                }
            }
        });

        *guard = Some(ListenerState {
            shutdown: shutdown_tx,
            handle,
        });
    }

    /// Stop the dispatch task, draining nothing further.
    pub async fn shutdown(&self) {
        let state = match self.listener.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };
        if let Some(state) = state {
            let _ = state.shutdown.send(());
            let _ = state.handle.await;
        }
    }
}

impl Drop for NotificationBus {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.listener.lock() {
            if let Some(state) = guard.take() {
                let _ = state.shutdown.send(());
                state.handle.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn events_reach_channel_sink() {
        let (tx, rx) = flume::unbounded();
        let bus = NotificationBus::with_sink(ChannelSink::new(tx));
        bus.listen();

        let sender = bus.sender();
        sender
            .send(RunEvent::new("run-1", "7", "action", "grammar_review started"))
            .unwrap();

        let event = tokio::time::timeout(Duration::from_secs(1), rx.recv_async())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.run_id, "run-1");
        assert_eq!(event.scope, "action");
        bus.shutdown().await;
    }

    #[tokio::test]
    async fn listen_is_idempotent() {
        let bus = NotificationBus::default();
        bus.listen();
        bus.listen();
        bus.shutdown().await;
    }

    #[tokio::test]
    async fn drop_stops_the_listener() {
        let (tx, rx) = flume::unbounded();
        let bus = NotificationBus::with_sink(ChannelSink::new(tx));
        bus.listen();
        let sender = bus.sender();

        sender
            .send(RunEvent::new("run-1", "7", "action", "started"))
            .unwrap();
        let delivered = tokio::time::timeout(Duration::from_secs(1), rx.recv_async())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(delivered.run_id, "run-1");

        drop(bus);
        tokio::task::yield_now().await;

        // The listener is gone; events sent afterwards never reach the sink.
        let _ = sender.send(RunEvent::new("run-1", "7", "action", "after drop"));
        let late = tokio::time::timeout(Duration::from_millis(100), rx.recv_async()).await;
        assert!(late.is_err());
    }
}
