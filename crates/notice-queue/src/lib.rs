//! Typed publish/subscribe envelopes for the notification queue and the
//! per-channel delivery queues.
//!
//! The dispatcher and producer talk to queues only through [`Envelope`]
//! plus the [`Publisher`] trait; [`ChannelBroker`] is an in-memory
//! reference implementation for the producer/dispatcher test suites and
//! the CLI demo, exposing its own `receive`/`ack`/`nack` inherent
//! methods as the only consumption side this workspace's core needs,
//! the queue-adapter equivalent of this workspace's in-memory-vs-
//! real-backend storage split.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A published message: a schema version, a UTC wall-clock timestamp, a
/// producer id, and an opaque typed payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub schema_version: String,
    pub published_at: DateTime<Utc>,
    pub producer_id: String,
    pub payload: T,
}

/// Publish side of a typed queue.
pub trait Publisher<T>: Send + Sync {
    fn publish(&self, schema_version: &str, producer_id: &str, payload: T) -> Result<()>;
}

/// A delivered message awaiting ack/nack. Held by value; the caller
/// acks or nacks it exactly once via the originating [`ChannelBroker`].
#[derive(Debug, Clone)]
pub struct Delivery<T> {
    pub id: u64,
    pub envelope: Envelope<T>,
}

/// In-memory broker: a `VecDeque` behind a `Mutex`, redelivery on nack.
/// Not ordered across producers beyond FIFO publish order; a nacked
/// message is requeued at the back, matching "redelivered according to
/// the queue's retry policy" without modeling a specific
/// backoff — callers needing delay should pair this with
/// `notice-retry`.
pub struct ChannelBroker<T> {
    queue: Mutex<VecDeque<(u64, Envelope<T>)>>,
    next_id: AtomicU64,
}

impl<T> Default for ChannelBroker<T> {
    fn default() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl<T: Clone> ChannelBroker<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages currently queued (not counting in-flight
    /// deliveries that haven't been acked or nacked).
    pub fn len(&self) -> usize {
        self.queue.lock().expect("queue poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pop the next message, if any. The message stays "in flight"
    /// conceptually until the caller calls [`Self::ack`] or
    /// [`Self::nack`]; this reference broker does not track in-flight
    /// state beyond that — a crashed consumer simply never acks or
    /// nacks, which a real broker would eventually redeliver via a
    /// visibility timeout this in-memory stand-in does not model.
    pub fn receive(&self) -> Option<Delivery<T>> {
        let mut queue = self.queue.lock().expect("queue poisoned");
        queue.pop_front().map(|(id, envelope)| Delivery { id, envelope })
    }

    /// Acknowledge a delivery. No-op here since `receive` already
    /// removed it from the queue; kept as an explicit call site so
    /// callers' ack/nack logic doesn't change when swapped for a real
    /// broker that tracks in-flight messages.
    pub fn ack(&self, _delivery: &Delivery<T>) {}

    /// Negatively acknowledge a delivery: requeue it at the back.
    pub fn nack(&self, delivery: Delivery<T>) {
        let mut queue = self.queue.lock().expect("queue poisoned");
        queue.push_back((delivery.id, delivery.envelope));
    }
}

impl<T: Clone + Send + Sync> Publisher<T> for ChannelBroker<T> {
    fn publish(&self, schema_version: &str, producer_id: &str, payload: T) -> Result<()> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let envelope = Envelope {
            schema_version: schema_version.to_string(),
            published_at: Utc::now(),
            producer_id: producer_id.to_string(),
            payload,
        };
        self.queue.lock().expect("queue poisoned").push_back((id, envelope));
        Ok(())
    }
}
