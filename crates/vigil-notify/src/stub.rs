use async_trait::async_trait;
use vigil_common::types::{Alert, Tenant};

use crate::{NotificationPayload, Notifier};

/// Log-only notifier used until webhook delivery is configured, and in tests.
#[derive(Debug, Default)]
pub struct StubNotifier;

impl StubNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for StubNotifier {
    async fn notify_new_parent(&self, alert: &Alert, tenant: &Tenant) {
        let payload = NotificationPayload::from_alert(alert);
        tracing::info!(
            webhook_url = %tenant.notification_config.webhook_url,
            alert_id = %payload.alert_id,
            dedup_key = %payload.dedup_key,
            summary = %payload.summary,
            severity = %payload.severity,
            "stub: would send new-parent notification"
        );
    }

    async fn notify_resolved(&self, alert: &Alert, tenant: &Tenant) {
        let payload = NotificationPayload::from_alert(alert);
        tracing::info!(
            webhook_url = %tenant.notification_config.webhook_url,
            alert_id = %payload.alert_id,
            dedup_key = %payload.dedup_key,
            child_count = payload.child_count,
            "stub: would send resolved notification"
        );
    }
}
