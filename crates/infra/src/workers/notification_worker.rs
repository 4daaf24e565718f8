use std::collections::{HashSet, VecDeque};
use std::io;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use serde_json::Value as JsonValue;
use tracing::{debug, warn};
use uuid::Uuid;

use fiberstock_events::{EventBus, EventEnvelope, Subscription};

use crate::notifications::{NotificationSink, notification_for};

const SEEN_EVENT_CAPACITY: usize = 4096;

/// Handle to control and join a background worker.
#[derive(Debug)]
pub struct WorkerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    /// Request graceful shutdown and wait for the worker to stop.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

/// Background consumer that turns stock events into notifications.
///
/// - Subscribes to the bus before returning, so nothing published afterwards is missed
/// - Skips envelopes whose `event_id` it has already handled (at-least-once delivery)
/// - Logs and drops decode or sink failures; nothing propagates to the writer
#[derive(Debug)]
pub struct NotificationWorker;

impl NotificationWorker {
    pub fn spawn<B, K>(bus: &B, sink: K, poll_interval: Duration) -> io::Result<WorkerHandle>
    where
        B: EventBus<EventEnvelope<JsonValue>>,
        K: NotificationSink,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let sub = bus.subscribe();

        let join = thread::Builder::new()
            .name("notification-worker".to_string())
            .spawn(move || worker_loop(sub, shutdown_rx, sink, poll_interval))?;

        Ok(WorkerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
        })
    }
}

/// Event ids already handled, bounded to the most recent `capacity`.
#[derive(Debug)]
struct SeenEvents {
    ids: HashSet<Uuid>,
    order: VecDeque<Uuid>,
    capacity: usize,
}

impl SeenEvents {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            ids: HashSet::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Returns `false` if `id` was seen before.
    fn insert(&mut self, id: Uuid) -> bool {
        if !self.ids.insert(id) {
            return false;
        }
        self.order.push_back(id);
        if self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.ids.remove(&oldest);
            }
        }
        true
    }
}

fn worker_loop<K: NotificationSink>(
    sub: Subscription<EventEnvelope<JsonValue>>,
    shutdown_rx: mpsc::Receiver<()>,
    sink: K,
    tick: Duration,
) {
    let mut seen = SeenEvents::with_capacity(SEEN_EVENT_CAPACITY);

    loop {
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        match sub.recv_timeout(tick) {
            Ok(envelope) => {
                if !seen.insert(envelope.event_id()) {
                    debug!(event_id = %envelope.event_id(), "skipping redelivered envelope");
                    continue;
                }

                match notification_for(&envelope) {
                    Ok(Some(notification)) => {
                        if let Err(err) = sink.deliver(&notification) {
                            warn!(subject = %notification.subject, error = %err, "notification delivery failed");
                        }
                    }
                    Ok(None) => {}
                    Err(err) => {
                        warn!(event_type = envelope.event_type(), error = %err, "undecodable event payload");
                    }
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
}
