//! Notification hooks for parent-alert state changes.
//!
//! The processor fires [`Notifier::notify_new_parent`] when a grouping window
//! opens and [`Notifier::notify_resolved`] when a parent reaches `resolved`.
//! Delivery is best-effort by contract: implementations log failures and
//! never surface them into message acknowledgment.

pub mod error;
pub mod stub;
pub mod webhook;

#[cfg(test)]
mod tests;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vigil_common::types::{Alert, Tenant};

pub use stub::StubNotifier;
pub use webhook::WebhookNotifier;

/// Body posted to the tenant's webhook endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub alert_id: String,
    pub dedup_key: String,
    pub tenant_id: String,
    pub summary: String,
    pub severity: String,
    pub status: String,
    #[serde(rename = "type")]
    pub alert_type: String,
    pub child_count: i64,
    pub timestamp: DateTime<Utc>,
}

impl NotificationPayload {
    pub fn from_alert(alert: &Alert) -> Self {
        Self {
            alert_id: alert.id.clone(),
            dedup_key: alert.dedup_key.clone(),
            tenant_id: alert.tenant_id.clone(),
            summary: alert.summary.clone(),
            severity: alert.severity.to_string(),
            status: alert.status.to_string(),
            alert_type: alert.alert_type.to_string(),
            child_count: alert.child_count,
            timestamp: Utc::now(),
        }
    }
}

/// Dispatch hook for parent-alert lifecycle events.
///
/// Both methods are infallible at the call site: the processor's
/// acknowledgment of a message must never depend on notification delivery.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Fired after a new parent alert has been created and its state settled.
    async fn notify_new_parent(&self, alert: &Alert, tenant: &Tenant);

    /// Fired after a parent alert has transitioned to resolved.
    async fn notify_resolved(&self, alert: &Alert, tenant: &Tenant);
}
