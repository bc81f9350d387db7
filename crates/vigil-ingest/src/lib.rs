//! Event ingestion: the synchronous front half of the pipeline.
//!
//! [`IngestService::ingest_event`] validates an incoming event, resolves the
//! tenant's grouping rule, computes the deterministic partition key, and
//! publishes the enriched event to the queue. It returns as soon as the queue
//! accepts the message; all grouping decisions happen asynchronously in the
//! processor.


use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;
use vigil_common::types::{Event, InternalEvent, ValidationError};
use vigil_queue::{Message, Producer, QueueError};
use vigil_store::error::StoreError;
use vigil_store::{GroupingRuleRepository, TenantRepository};

/// Errors returned by [`IngestService::ingest_event`].
///
/// The first three map to client errors at the HTTP boundary; the rest are
/// server-side failures.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("invalid event: {0}")]
    InvalidEvent(#[from] ValidationError),

    #[error("tenant not found: {0}")]
    TenantNotFound(String),

    #[error("grouping rule not found: {0}")]
    GroupingRuleNotFound(String),

    #[error("failed to publish event to queue")]
    PublishFailed(#[source] QueueError),

    #[error("failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Store(StoreError),
}

/// Computes the partition key for a `(tenant_id, grouping_value)` pair:
/// the first 8 bytes of `SHA-256("{tenant_id}:{grouping_value}")`,
/// hex-encoded to 16 ASCII chars.
///
/// Two events that could ever be grouped together (same tenant, same
/// grouping value) always map to the same key, and therefore the same
/// ordered queue partition, across processes and runs. Resolve events with
/// an empty grouping value hash the empty string, which is still
/// deterministic.
pub fn partition_key(tenant_id: &str, grouping_value: &str) -> String {
    let digest = Sha256::digest(format!("{tenant_id}:{grouping_value}").as_bytes());
    let mut key = String::with_capacity(16);
    for byte in &digest[..8] {
        let _ = write!(key, "{byte:02x}");
    }
    key
}

/// Validates, enriches, and publishes incoming events.
pub struct IngestService {
    producer: Arc<dyn Producer>,
    tenants: Arc<dyn TenantRepository>,
    rules: Arc<dyn GroupingRuleRepository>,
}

impl IngestService {
    pub fn new(
        producer: Arc<dyn Producer>,
        tenants: Arc<dyn TenantRepository>,
        rules: Arc<dyn GroupingRuleRepository>,
    ) -> Self {
        Self {
            producer,
            tenants,
            rules,
        }
    }

    /// Accepts one event into the pipeline.
    ///
    /// On success exactly one message has been published; nothing waits for
    /// processing. Rejections happen before any side effect.
    pub async fn ingest_event(&self, event: Event) -> Result<(), IngestError> {
        event.validate()?;

        let tenant = self.tenants.get_by_id(&event.tenant_id).await.map_err(|e| {
            if e.is_not_found() {
                IngestError::TenantNotFound(event.tenant_id.clone())
            } else {
                IngestError::Store(e)
            }
        })?;

        let rule = self
            .rules
            .get_by_id(&tenant.grouping_rule_id)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    IngestError::GroupingRuleNotFound(tenant.grouping_rule_id.clone())
                } else {
                    IngestError::Store(e)
                }
            })?;

        let grouping_value = rule.extract_grouping_value(&event);
        let partition_key = partition_key(&event.tenant_id, &grouping_value);

        let internal = InternalEvent {
            event,
            partition_key: partition_key.clone(),
            grouping_value: grouping_value.clone(),
            received_at: Utc::now(),
        };
        let payload = serde_json::to_vec(&internal)?;

        let mut headers = HashMap::new();
        headers.insert("tenant_id".to_string(), internal.event.tenant_id.clone());
        headers.insert("action".to_string(), internal.event.action.to_string());
        headers.insert("dedup_key".to_string(), internal.event.dedup_key.clone());

        let message = Message {
            key: partition_key.clone().into_bytes(),
            value: payload,
            headers,
        };
        if let Err(error) = self.producer.publish(message).await {
            tracing::error!(
                dedup_key = %internal.event.dedup_key,
                error = %error,
                "failed to publish event"
            );
            return Err(IngestError::PublishFailed(error));
        }

        tracing::debug!(
            dedup_key = %internal.event.dedup_key,
            partition_key = %partition_key,
            grouping_value = %grouping_value,
            "event published to queue"
        );
        Ok(())
    }
}
