//! A single-process message bus built from `tokio::sync` primitives.
//!
//! The reference implementation runs each AIPerf service as a separate OS
//! process wired together over ZMQ. This workspace runs every service as a
//! task within one process, so the bus need not cross a process boundary;
//! [`LocalBus`] gives the same three communication patterns the reference
//! implementation's ZMQ proxies provide - publish/subscribe, push/pull, and
//! request/reply - over channels, following the same
//! `tokio::sync::{broadcast, mpsc, RwLock}` choice a single-process pipeline
//! would use for its internal event fan-out.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use aiperf_core::Message;
use tokio::sync::{broadcast, mpsc, oneshot, Mutex, RwLock};
use uuid::Uuid;

use crate::error::{BusError, BusResult};
use crate::topic::Topic;

const BROADCAST_CAPACITY: usize = 4096;
const PULL_QUEUE_CAPACITY: usize = 1024;

/// The shared bus every service instance holds a clone of. Cloning is cheap:
/// every field is an `Arc`-backed handle to the same underlying channels.
#[derive(Clone)]
struct QueueHandle {
    tx: mpsc::Sender<Message>,
    rx: Arc<Mutex<mpsc::Receiver<Message>>>,
}

#[derive(Clone)]
pub struct LocalBus {
    broadcast: broadcast::Sender<Arc<Message>>,
    pull_queues: Arc<RwLock<HashMap<String, QueueHandle>>>,
    pending_replies: Arc<Mutex<HashMap<Uuid, oneshot::Sender<Message>>>>,
}

impl LocalBus {
    pub fn new() -> Self {
        let (broadcast, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            broadcast,
            pull_queues: Arc::new(RwLock::new(HashMap::new())),
            pending_replies: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    // ---- publish / subscribe --------------------------------------------

    /// Publishes `message` to every current subscriber. Matches the
    /// reference implementation's fire-and-forget pub/sub semantics: if no
    /// subscriber is listening, the message is simply dropped.
    pub fn publish(&self, message: Message) {
        let _ = self.broadcast.send(Arc::new(message));
    }

    /// Returns a stream-like handle that yields every published message
    /// matching `topic`, in publish order.
    pub fn subscribe(&self, topic: Topic) -> Subscription {
        Subscription {
            topic,
            rx: self.broadcast.subscribe(),
        }
    }

    // ---- push / pull ------------------------------------------------------

    /// Returns the handle for `queue`, creating it with the default
    /// capacity if this is the first reference to that name. Safe to call
    /// concurrently from any number of pushers and pullers.
    async fn queue_handle(&self, queue: &str) -> QueueHandle {
        if let Some(handle) = self.pull_queues.read().await.get(queue) {
            return handle.clone();
        }
        let mut queues = self.pull_queues.write().await;
        if let Some(handle) = queues.get(queue) {
            return handle.clone();
        }
        let (tx, rx) = mpsc::channel(PULL_QUEUE_CAPACITY);
        let handle = QueueHandle {
            tx,
            rx: Arc::new(Mutex::new(rx)),
        };
        queues.insert(queue.to_string(), handle.clone());
        handle
    }

    /// Pushes `message` onto `queue`, backpressuring the caller if the
    /// queue is full - this is the credit-drop distribution path, so the
    /// scheduler naturally stalls rather than over-issuing work.
    pub async fn push(&self, queue: &str, message: Message) -> BusResult<()> {
        let handle = self.queue_handle(queue).await;
        handle.tx.send(message).await.map_err(|_| BusError::ChannelClosed)
    }

    /// Returns a pull consumer for `queue`. Multiple callers pulling the
    /// same queue name compete for messages round-robin, the way multiple
    /// workers compete for credit drops.
    pub async fn pull_queue(&self, queue: &str) -> PullQueue {
        let handle = self.queue_handle(queue).await;
        PullQueue { rx: handle.rx }
    }

    // ---- request / reply --------------------------------------------------

    /// Sends `message` and awaits exactly one reply tagged with
    /// `reply_id`, or times out after `timeout`.
    pub async fn request(&self, reply_id: Uuid, message: Message, timeout: Duration) -> BusResult<Message> {
        let (tx, rx) = oneshot::channel();
        self.pending_replies.lock().await.insert(reply_id, tx);
        self.publish(message);

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(BusError::PeerClosed),
            Err(_) => {
                self.pending_replies.lock().await.remove(&reply_id);
                Err(BusError::Timeout(timeout))
            }
        }
    }

    /// Delivers `reply` to whoever is awaiting `reply_id`. A reply for an
    /// id nobody is waiting on (already timed out, or never requested) is
    /// dropped silently.
    pub async fn reply(&self, reply_id: Uuid, reply: Message) {
        if let Some(tx) = self.pending_replies.lock().await.remove(&reply_id) {
            let _ = tx.send(reply);
        }
    }
}

impl Default for LocalBus {
    fn default() -> Self {
        Self::new()
    }
}

/// A topic-filtered view onto the bus's broadcast channel.
pub struct Subscription {
    topic: Topic,
    rx: broadcast::Receiver<Arc<Message>>,
}

impl Subscription {
    /// Awaits the next message matching this subscription's topic,
    /// silently skipping any lagged-and-dropped messages the underlying
    /// broadcast channel reports.
    pub async fn recv(&mut self) -> BusResult<Arc<Message>> {
        loop {
            match self.rx.recv().await {
                Ok(message) if self.topic.matches(&message) => return Ok(message),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return Err(BusError::ChannelClosed),
            }
        }
    }
}

/// A consumer handle for a named push/pull queue.
pub struct PullQueue {
    rx: Arc<Mutex<mpsc::Receiver<Message>>>,
}

impl PullQueue {
    pub async fn pull(&self) -> BusResult<Message> {
        let mut rx = self.rx.lock().await;
        rx.recv().await.ok_or(BusError::ChannelClosed)
    }
}

impl Clone for PullQueue {
    fn clone(&self) -> Self {
        Self { rx: self.rx.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aiperf_core::models::MessagePayload;
    use aiperf_core::{MessageType, ServiceType};

    fn heartbeat(service_type: ServiceType, service_id: &str) -> Message {
        Message {
            message_type: MessageType::Heartbeat,
            service_type,
            service_id: service_id.to_string(),
            payload: MessagePayload::Heartbeat,
        }
    }

    #[tokio::test]
    async fn subscriber_receives_matching_publish_only() {
        let bus = LocalBus::new();
        let mut sub = bus.subscribe(Topic::Any(MessageType::Heartbeat));

        bus.publish(heartbeat(ServiceType::Worker, "worker_1"));
        bus.publish(Message {
            message_type: MessageType::Command,
            service_type: ServiceType::Controller,
            service_id: "ctrl".to_string(),
            payload: MessagePayload::Empty,
        });

        let received = sub.recv().await.unwrap();
        assert_eq!(received.message_type, MessageType::Heartbeat);
    }

    #[tokio::test]
    async fn push_pull_round_trips() {
        let bus = LocalBus::new();
        bus.push("credits", heartbeat(ServiceType::Worker, "worker_1")).await.unwrap();

        let queue = bus.pull_queue("credits").await;
        let message = queue.pull().await.unwrap();
        assert_eq!(message.service_id, "worker_1");
    }

    #[tokio::test]
    async fn multiple_pullers_share_one_queue() {
        let bus = LocalBus::new();
        let q1 = bus.pull_queue("credits").await;
        let q2 = q1.clone();

        bus.push("credits", heartbeat(ServiceType::Worker, "a")).await.unwrap();
        bus.push("credits", heartbeat(ServiceType::Worker, "b")).await.unwrap();

        let first = q1.pull().await.unwrap();
        let second = q2.pull().await.unwrap();
        assert_ne!(first.service_id, second.service_id);
    }

    #[tokio::test]
    async fn request_reply_round_trips() {
        let bus = LocalBus::new();
        let reply_id = Uuid::new_v4();
        let bus_clone = bus.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            bus_clone.reply(reply_id, heartbeat(ServiceType::RecordsManager, "rm")).await;
        });

        let reply = bus
            .request(reply_id, heartbeat(ServiceType::Controller, "ctrl"), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(reply.service_id, "rm");
    }

    #[tokio::test]
    async fn request_times_out_without_reply() {
        let bus = LocalBus::new();
        let reply_id = Uuid::new_v4();
        let err = bus
            .request(reply_id, heartbeat(ServiceType::Controller, "ctrl"), Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, BusError::Timeout(_)));
    }
}
