use async_trait::async_trait;
use std::time::Duration;
use vigil_common::types::{Alert, Tenant};

use crate::error::{NotifyError, Result};
use crate::{NotificationPayload, Notifier};

const MAX_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_millis(500);

/// Posts notification payloads to the tenant's configured webhook URL.
///
/// Retries transport failures and non-2xx responses up to [`MAX_ATTEMPTS`]
/// times, then gives up with a warning. Tenants without a webhook URL are
/// skipped silently.
pub struct WebhookNotifier {
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(request_timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .unwrap_or_default();
        Self { client }
    }

    async fn deliver(&self, url: &str, payload: &NotificationPayload) -> Result<()> {
        if url.is_empty() {
            return Err(NotifyError::NoWebhookUrl);
        }

        let mut last_err = None;
        for attempt in 1..=MAX_ATTEMPTS {
            match self.client.post(url).json(payload).send().await {
                Ok(response) if response.status().is_success() => return Ok(()),
                Ok(response) => {
                    let status = response.status().as_u16();
                    let body = response.text().await.unwrap_or_default();
                    last_err = Some(NotifyError::Endpoint { status, body });
                }
                Err(error) => last_err = Some(NotifyError::Http(error)),
            }
            if attempt < MAX_ATTEMPTS {
                tokio::time::sleep(RETRY_DELAY).await;
            }
        }
        Err(last_err.unwrap_or(NotifyError::NoWebhookUrl))
    }

    async fn notify(&self, kind: &str, alert: &Alert, tenant: &Tenant) {
        let url = tenant.notification_config.webhook_url.clone();
        if url.is_empty() {
            tracing::debug!(
                tenant_id = %tenant.id,
                dedup_key = %alert.dedup_key,
                "tenant has no webhook URL, skipping notification"
            );
            return;
        }

        let payload = NotificationPayload::from_alert(alert);
        match self.deliver(&url, &payload).await {
            Ok(()) => tracing::info!(
                kind,
                dedup_key = %payload.dedup_key,
                tenant_id = %tenant.id,
                "notification delivered"
            ),
            Err(error) => tracing::warn!(
                kind,
                dedup_key = %payload.dedup_key,
                tenant_id = %tenant.id,
                error = %error,
                "notification delivery failed"
            ),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify_new_parent(&self, alert: &Alert, tenant: &Tenant) {
        self.notify("new_parent", alert, tenant).await;
    }

    async fn notify_resolved(&self, alert: &Alert, tenant: &Tenant) {
        self.notify("resolved", alert, tenant).await;
    }
}
