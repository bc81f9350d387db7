use crate::memory::MemoryQueue;
use crate::{Consumer, Message, MessageHandler, Producer, QueueError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn make_message(key: &str, value: &str) -> Message {
    Message {
        key: key.as_bytes().to_vec(),
        value: value.as_bytes().to_vec(),
        headers: HashMap::new(),
    }
}

/// Records (key, value) pairs in arrival order.
struct Recorder {
    seen: Mutex<Vec<(String, String)>>,
}

impl Recorder {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            seen: Mutex::new(Vec::new()),
        })
    }

    fn seen(&self) -> Vec<(String, String)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageHandler for Recorder {
    async fn handle(&self, message: Message) -> anyhow::Result<()> {
        let key = String::from_utf8_lossy(&message.key).to_string();
        let value = String::from_utf8_lossy(&message.value).to_string();
        if value == "boom" {
            anyhow::bail!("simulated handler failure");
        }
        self.seen.lock().unwrap().push((key, value));
        Ok(())
    }
}

#[tokio::test]
async fn preserves_per_key_publish_order() {
    let queue = Arc::new(MemoryQueue::new(4, 256));
    let keys = ["alpha", "bravo", "charlie", "delta"];

    // Interleave publishes across keys.
    for seq in 0..25u32 {
        for key in keys {
            queue.publish(make_message(key, &seq.to_string())).await.unwrap();
        }
    }

    // Close first so the drain-and-exit path terminates `start`.
    queue.shutdown();
    let recorder = Recorder::new();
    queue
        .start(CancellationToken::new(), recorder.clone())
        .await
        .unwrap();

    let mut per_key: HashMap<String, Vec<u32>> = HashMap::new();
    for (key, value) in recorder.seen() {
        per_key.entry(key).or_default().push(value.parse().unwrap());
    }
    for key in keys {
        let sequence = per_key.remove(key).expect("all keys should be consumed");
        assert_eq!(
            sequence,
            (0..25).collect::<Vec<u32>>(),
            "per-key order broken for {key}"
        );
    }
}

#[tokio::test]
async fn publish_after_close_fails() {
    let queue = MemoryQueue::new(2, 8);
    queue.shutdown();
    let err = queue.publish(make_message("k", "v")).await.unwrap_err();
    assert!(matches!(err, QueueError::Closed));

    // Close is idempotent.
    Producer::close(&queue).await.unwrap();
}

#[tokio::test]
async fn full_partition_blocks_publish_until_drained() {
    let queue = Arc::new(MemoryQueue::new(1, 1));
    queue.publish(make_message("k", "0")).await.unwrap();

    let blocked = {
        let queue = Arc::clone(&queue);
        tokio::spawn(async move { queue.publish(make_message("k", "1")).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!blocked.is_finished(), "publish should wait on a full lane");

    let recorder = Recorder::new();
    let consumer = {
        let queue = Arc::clone(&queue);
        let recorder = recorder.clone();
        tokio::spawn(async move { queue.start(CancellationToken::new(), recorder).await })
    };

    blocked.await.unwrap().unwrap();
    queue.shutdown();
    consumer.await.unwrap().unwrap();
    assert_eq!(recorder.seen().len(), 2);
}

#[tokio::test]
async fn handler_failure_does_not_stop_the_lane() {
    let queue = Arc::new(MemoryQueue::new(1, 8));
    queue.publish(make_message("k", "boom")).await.unwrap();
    queue.publish(make_message("k", "after")).await.unwrap();
    queue.shutdown();

    let recorder = Recorder::new();
    queue
        .start(CancellationToken::new(), recorder.clone())
        .await
        .unwrap();

    // The failing message is dropped (logged), the next one still arrives.
    assert_eq!(
        recorder.seen(),
        vec![("k".to_string(), "after".to_string())]
    );
}

#[tokio::test]
async fn cancellation_stops_an_idle_consumer() {
    let queue = Arc::new(MemoryQueue::new(2, 8));
    let cancel = CancellationToken::new();
    let consumer = {
        let queue = Arc::clone(&queue);
        let cancel = cancel.clone();
        tokio::spawn(async move { queue.start(cancel, Recorder::new()).await })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!consumer.is_finished());
    cancel.cancel();
    consumer.await.unwrap().unwrap();
}

#[tokio::test]
async fn second_start_is_rejected() {
    let queue = Arc::new(MemoryQueue::new(1, 8));
    let cancel = CancellationToken::new();
    let first = {
        let queue = Arc::clone(&queue);
        let cancel = cancel.clone();
        tokio::spawn(async move { queue.start(cancel, Recorder::new()).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    let err = queue
        .start(CancellationToken::new(), Recorder::new())
        .await
        .unwrap_err();
    assert!(matches!(err, QueueError::AlreadyStarted));

    cancel.cancel();
    first.await.unwrap().unwrap();
}
