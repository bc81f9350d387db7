use crate::{NotificationPayload, Notifier, StubNotifier, WebhookNotifier};
use chrono::Utc;
use std::time::Duration;
use vigil_common::types::{
    Action, Alert, Event, NotificationConfig, Severity, Tenant,
};

fn make_alert() -> Alert {
    let event = Event {
        tenant_id: "tenant-1".to_string(),
        summary: "disk full on db-3".to_string(),
        severity: Severity::High,
        action: Action::Trigger,
        class: "db".to_string(),
        dedup_key: "disk-db-3".to_string(),
    };
    let mut alert = Alert::new_parent(&event);
    alert.id = "12345".to_string();
    alert.child_count = 2;
    alert
}

fn make_tenant(webhook_url: &str) -> Tenant {
    let now = Utc::now();
    Tenant {
        id: "tenant-1".to_string(),
        name: "payments".to_string(),
        description: String::new(),
        grouping_rule_id: "r1".to_string(),
        notification_config: NotificationConfig {
            webhook_url: webhook_url.to_string(),
        },
        created_at: now,
        updated_at: now,
    }
}

#[test]
fn payload_reflects_alert_fields() {
    let payload = NotificationPayload::from_alert(&make_alert());
    assert_eq!(payload.alert_id, "12345");
    assert_eq!(payload.dedup_key, "disk-db-3");
    assert_eq!(payload.severity, "high");
    assert_eq!(payload.status, "active");
    assert_eq!(payload.alert_type, "parent");
    assert_eq!(payload.child_count, 2);

    let json = serde_json::to_value(&payload).unwrap();
    assert_eq!(json["type"], "parent");
    assert!(json["timestamp"].is_string());
}

#[tokio::test]
async fn stub_notifier_is_a_no_op() {
    let notifier = StubNotifier::new();
    let alert = make_alert();
    let tenant = make_tenant("http://example.invalid/hook");
    notifier.notify_new_parent(&alert, &tenant).await;
    notifier.notify_resolved(&alert, &tenant).await;
}

#[tokio::test]
async fn webhook_notifier_skips_tenants_without_url() {
    // No webhook URL configured: returns immediately without any request.
    let notifier = WebhookNotifier::new(Duration::from_millis(100));
    let alert = make_alert();
    let tenant = make_tenant("");
    notifier.notify_new_parent(&alert, &tenant).await;
    notifier.notify_resolved(&alert, &tenant).await;
}
