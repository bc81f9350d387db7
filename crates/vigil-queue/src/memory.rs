//! Partitioned in-memory queue for tests, development, and single-node runs.

use async_trait::async_trait;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::{Consumer, Message, MessageHandler, Producer, QueueError, Result};

/// In-memory implementation of both [`Producer`] and [`Consumer`].
///
/// Messages are spread over a fixed set of bounded channels by a stable hash
/// of the key, and each channel is drained by exactly one task, so per-key
/// publish order is preserved end to end. A full partition makes `publish`
/// wait, which is the backpressure contract.
pub struct MemoryQueue {
    /// `None` once the queue is closed; dropping the senders lets consumer
    /// tasks drain whatever is buffered and then exit.
    senders: RwLock<Option<Vec<mpsc::Sender<Message>>>>,
    /// Taken exactly once by `start`.
    receivers: Mutex<Option<Vec<mpsc::Receiver<Message>>>>,
}

impl MemoryQueue {
    /// Creates a queue with `partitions` ordered lanes, each buffering up to
    /// `buffer_size` messages before `publish` blocks.
    pub fn new(partitions: usize, buffer_size: usize) -> Self {
        let partitions = partitions.max(1);
        let buffer_size = buffer_size.max(1);
        let mut senders = Vec::with_capacity(partitions);
        let mut receivers = Vec::with_capacity(partitions);
        for _ in 0..partitions {
            let (tx, rx) = mpsc::channel(buffer_size);
            senders.push(tx);
            receivers.push(rx);
        }
        Self {
            senders: RwLock::new(Some(senders)),
            receivers: Mutex::new(Some(receivers)),
        }
    }

    /// Stable within-process mapping of key bytes to a partition index.
    /// Cross-process stability lives in the key itself, not here.
    fn partition_index(key: &[u8], partitions: usize) -> usize {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() % partitions as u64) as usize
    }

    /// Stops accepting publishes and lets started consumers drain what is
    /// buffered, then exit. Idempotent.
    pub fn shutdown(&self) {
        self.senders.write().unwrap().take();
    }
}

#[async_trait]
impl Producer for MemoryQueue {
    async fn publish(&self, message: Message) -> Result<()> {
        // Clone the lane sender under the lock, then send outside it so a
        // full partition blocks only this publisher.
        let sender = {
            let senders = self.senders.read().unwrap();
            match senders.as_ref() {
                Some(senders) => {
                    let index = Self::partition_index(&message.key, senders.len());
                    senders[index].clone()
                }
                None => return Err(QueueError::Closed),
            }
        };
        sender.send(message).await.map_err(|_| QueueError::Closed)
    }

    async fn close(&self) -> Result<()> {
        self.shutdown();
        Ok(())
    }
}

#[async_trait]
impl Consumer for MemoryQueue {
    async fn start(
        &self,
        cancel: CancellationToken,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<()> {
        let receivers = self
            .receivers
            .lock()
            .unwrap()
            .take()
            .ok_or(QueueError::AlreadyStarted)?;

        let mut workers = JoinSet::new();
        for (partition, mut rx) in receivers.into_iter().enumerate() {
            let handler = Arc::clone(&handler);
            let cancel = cancel.clone();
            workers.spawn(async move {
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        received = rx.recv() => {
                            let message = match received {
                                Some(message) => message,
                                None => break,
                            };
                            if let Err(error) = handler.handle(message).await {
                                // At-least-once, log-and-continue policy: an
                                // unrecoverable handler failure counts as
                                // consumed rather than wedging the lane.
                                tracing::error!(partition, error = %error, "message handler failed");
                            }
                        }
                    }
                }
                tracing::debug!(partition, "partition consumer stopped");
            });
        }

        while workers.join_next().await.is_some() {}
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.shutdown();
        Ok(())
    }
}
