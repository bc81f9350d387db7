//! Message queue abstraction with per-key ordering.
//!
//! Producers publish keyed messages; consumers process them with at-least-once
//! semantics. Two messages with the same key are always delivered to the same
//! logical consumer in publish order, which is what lets the processor make
//! grouping decisions without cross-task coordination. The in-memory
//! [`memory::MemoryQueue`] is the reference implementation; a Kafka-backed one
//! would map keys to topic partitions the same way.

pub mod memory;

#[cfg(test)]
mod tests;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A keyed message on the queue.
#[derive(Debug, Clone)]
pub struct Message {
    /// Partition key. Messages sharing a key are delivered in publish order.
    pub key: Vec<u8>,
    /// Serialized payload.
    pub value: Vec<u8>,
    /// Optional metadata carried alongside the payload.
    pub headers: HashMap<String, String>,
}

/// Errors surfaced by queue implementations.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// The queue has been shut down; no further publishes are accepted.
    #[error("Queue: closed")]
    Closed,

    /// `start` was called twice on the same consumer.
    #[error("Queue: consumer already started")]
    AlreadyStarted,
}

/// Convenience `Result` alias for queue operations.
pub type Result<T> = std::result::Result<T, QueueError>;

/// Callback invoked for each consumed message.
///
/// Returning `Ok` acknowledges the message. Returning an error marks the
/// delivery as failed; what happens next is implementation policy (redelivery,
/// dead-letter, or log-and-continue for the in-memory queue).
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: Message) -> anyhow::Result<()>;
}

/// Publishes messages onto the queue.
///
/// Implementations must be safe for concurrent use. `publish` blocks when the
/// queue is full (backpressure is surfaced as waiting, never as a silent
/// drop) and returns once the message has been accepted.
#[async_trait]
pub trait Producer: Send + Sync {
    async fn publish(&self, message: Message) -> Result<()>;

    /// Stops accepting publishes. Idempotent.
    async fn close(&self) -> Result<()>;
}

/// Consumes messages from the queue.
#[async_trait]
pub trait Consumer: Send + Sync {
    /// Runs the consume loop, invoking `handler` for each message with
    /// per-key ordering. Within one partition handling is strictly
    /// sequential; across partitions handlers run concurrently.
    ///
    /// Blocks until `cancel` fires or the queue is closed and drained.
    async fn start(&self, cancel: CancellationToken, handler: Arc<dyn MessageHandler>)
        -> Result<()>;

    /// Stops the queue. Idempotent.
    async fn close(&self) -> Result<()>;
}
