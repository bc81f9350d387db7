use crate::memory::{
    MemoryAlertRepository, MemoryGroupingRuleRepository, MemoryStateStore, MemoryTenantRepository,
};
use crate::{
    AlertRepository, AlertState, GroupingRuleRepository, ParentState, PendingResolve, StateStore,
    TenantRepository,
};
use chrono::{Duration, Utc};
use vigil_common::types::{
    Alert, AlertFilter, AlertStatus, AlertType, Event, GroupingRule, NotificationConfig, Severity,
    Tenant,
};

fn make_event(dedup_key: &str, class: &str) -> Event {
    Event {
        tenant_id: "tenant-1".to_string(),
        summary: format!("{class} failure"),
        severity: Severity::High,
        action: vigil_common::types::Action::Trigger,
        class: class.to_string(),
        dedup_key: dedup_key.to_string(),
    }
}

fn make_alert(dedup_key: &str) -> Alert {
    let mut alert = Alert::new_parent(&make_event(dedup_key, "db"));
    alert.id = vigil_common::id::next_id();
    alert
}

fn make_child(dedup_key: &str, parent: &str) -> Alert {
    let mut alert = Alert::new_child(&make_event(dedup_key, "db"), parent);
    alert.id = vigil_common::id::next_id();
    alert
}

fn alert_state(dedup_key: &str) -> AlertState {
    AlertState {
        dedup_key: dedup_key.to_string(),
        tenant_id: "tenant-1".to_string(),
        alert_type: AlertType::Parent,
        status: AlertStatus::Active,
        parent_dedup_key: None,
        resolve_requested: false,
    }
}

// --- state store ---

#[tokio::test]
async fn parent_state_round_trip() {
    let store = MemoryStateStore::new();
    let state = ParentState {
        dedup_key: "p1".to_string(),
        created_at: Utc::now(),
        child_count: 0,
    };
    store
        .set_parent("tenant-1", "class", "db", state, Duration::minutes(5))
        .await
        .unwrap();

    let found = store
        .get_parent("tenant-1", "class", "db")
        .await
        .unwrap()
        .expect("parent should be present inside its window");
    assert_eq!(found.dedup_key, "p1");

    // A different grouping value is an independent slot.
    assert!(store
        .get_parent("tenant-1", "class", "web")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn parent_state_expires_after_ttl() {
    let store = MemoryStateStore::new();
    let state = ParentState {
        dedup_key: "p1".to_string(),
        created_at: Utc::now(),
        child_count: 0,
    };
    store
        .set_parent("tenant-1", "class", "db", state, Duration::milliseconds(10))
        .await
        .unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(30)).await;

    assert!(store
        .get_parent("tenant-1", "class", "db")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn delete_parent_closes_the_slot_early() {
    let store = MemoryStateStore::new();
    let state = ParentState {
        dedup_key: "p1".to_string(),
        created_at: Utc::now(),
        child_count: 0,
    };
    store
        .set_parent("tenant-1", "class", "db", state, Duration::minutes(5))
        .await
        .unwrap();
    store.delete_parent("tenant-1", "class", "db").await.unwrap();
    assert!(store
        .get_parent("tenant-1", "class", "db")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn alert_state_round_trip_and_delete() {
    let store = MemoryStateStore::new();
    assert!(store.get_alert("a1").await.unwrap().is_none());

    store.set_alert(alert_state("a1")).await.unwrap();
    let found = store.get_alert("a1").await.unwrap().unwrap();
    assert_eq!(found.status, AlertStatus::Active);

    let mut updated = found;
    updated.status = AlertStatus::Resolved;
    store.set_alert(updated).await.unwrap();
    assert_eq!(
        store.get_alert("a1").await.unwrap().unwrap().status,
        AlertStatus::Resolved
    );

    store.delete_alert("a1").await.unwrap();
    assert!(store.get_alert("a1").await.unwrap().is_none());
}

#[tokio::test]
async fn children_set_has_set_semantics() {
    let store = MemoryStateStore::new();
    store.add_child("p1", "c1").await.unwrap();
    store.add_child("p1", "c2").await.unwrap();
    store.add_child("p1", "c1").await.unwrap(); // duplicate insert

    assert_eq!(store.child_count("p1").await.unwrap(), 2);
    let mut members = store.children("p1").await.unwrap();
    members.sort();
    assert_eq!(members, vec!["c1".to_string(), "c2".to_string()]);

    store.remove_child("p1", "c1").await.unwrap();
    assert_eq!(store.child_count("p1").await.unwrap(), 1);

    // Unknown parent answers empty, not an error.
    assert!(store.children("nope").await.unwrap().is_empty());
    assert_eq!(store.child_count("nope").await.unwrap(), 0);
}

#[tokio::test]
async fn pending_resolve_round_trip() {
    let store = MemoryStateStore::new();
    assert!(store.get_pending_resolve("p1").await.unwrap().is_none());

    store
        .set_pending_resolve(
            "p1",
            PendingResolve {
                requested_at: Utc::now(),
                remaining_children: 3,
            },
        )
        .await
        .unwrap();
    assert_eq!(
        store
            .get_pending_resolve("p1")
            .await
            .unwrap()
            .unwrap()
            .remaining_children,
        3
    );

    store.delete_pending_resolve("p1").await.unwrap();
    assert!(store.get_pending_resolve("p1").await.unwrap().is_none());
}

// --- alert repository ---

#[tokio::test]
async fn create_rejects_duplicate_dedup_key() {
    let repo = MemoryAlertRepository::new();
    repo.create(&make_alert("a1")).await.unwrap();
    let err = repo.create(&make_alert("a1")).await.unwrap_err();
    assert!(matches!(
        err,
        crate::error::StoreError::AlreadyExists { .. }
    ));
}

#[tokio::test]
async fn get_by_dedup_key_and_update() {
    let repo = MemoryAlertRepository::new();
    let alert = make_alert("a1");
    repo.create(&alert).await.unwrap();

    let mut found = repo.get_by_dedup_key("a1").await.unwrap();
    assert_eq!(found.id, alert.id);

    found.resolve();
    repo.update(&found).await.unwrap();
    assert_eq!(
        repo.get_by_id(&alert.id).await.unwrap().status,
        AlertStatus::Resolved
    );

    let err = repo.get_by_dedup_key("missing").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn list_applies_filters_and_pagination() {
    let repo = MemoryAlertRepository::new();
    for i in 0..5 {
        repo.create(&make_alert(&format!("a{i}"))).await.unwrap();
    }
    let mut other = make_alert("b1");
    other.tenant_id = "tenant-2".to_string();
    other.resolve();
    repo.create(&other).await.unwrap();

    let all = repo.list(&AlertFilter::default()).await.unwrap();
    assert_eq!(all.len(), 6);

    let tenant_1 = repo
        .list(&AlertFilter {
            tenant_id: Some("tenant-1".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(tenant_1.len(), 5);

    let resolved = repo
        .list(&AlertFilter {
            status: Some(AlertStatus::Resolved),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].dedup_key, "b1");

    let page = repo
        .list(&AlertFilter {
            tenant_id: Some("tenant-1".to_string()),
            limit: 2,
            offset: 4,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.len(), 1);

    let past_end = repo
        .list(&AlertFilter {
            offset: 100,
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(past_end.is_empty());
}

#[tokio::test]
async fn count_active_children_tracks_resolution() {
    let repo = MemoryAlertRepository::new();
    repo.create(&make_alert("p1")).await.unwrap();
    repo.create(&make_child("c1", "p1")).await.unwrap();
    repo.create(&make_child("c2", "p1")).await.unwrap();

    assert_eq!(repo.count_active_children("p1").await.unwrap(), 2);
    assert_eq!(repo.children_of("p1").await.unwrap().len(), 2);

    let mut c1 = repo.get_by_dedup_key("c1").await.unwrap();
    c1.resolve();
    repo.update(&c1).await.unwrap();
    assert_eq!(repo.count_active_children("p1").await.unwrap(), 1);

    // Children counts never consider the parent itself.
    assert_eq!(repo.count_active_children("c1").await.unwrap(), 0);
}

// --- tenant / grouping rule repositories ---

#[tokio::test]
async fn tenant_repository_crud() {
    let repo = MemoryTenantRepository::new();
    let now = Utc::now();
    let mut tenant = Tenant {
        id: "t1".to_string(),
        name: "payments".to_string(),
        description: String::new(),
        grouping_rule_id: "r1".to_string(),
        notification_config: NotificationConfig::default(),
        created_at: now,
        updated_at: now,
    };
    repo.create(&tenant).await.unwrap();
    assert!(matches!(
        repo.create(&tenant).await.unwrap_err(),
        crate::error::StoreError::AlreadyExists { .. }
    ));

    tenant.name = "payments-eu".to_string();
    repo.update(&tenant).await.unwrap();
    assert_eq!(repo.get_by_id("t1").await.unwrap().name, "payments-eu");
    assert_eq!(repo.list().await.unwrap().len(), 1);

    repo.delete("t1").await.unwrap();
    assert!(repo.get_by_id("t1").await.unwrap_err().is_not_found());
    assert!(repo.delete("t1").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn grouping_rule_repository_crud() {
    let repo = MemoryGroupingRuleRepository::new();
    let now = Utc::now();
    let mut rule = GroupingRule {
        id: "r1".to_string(),
        name: "by class".to_string(),
        grouping_key: "class".to_string(),
        time_window_minutes: 5,
        created_at: now,
        updated_at: now,
    };
    repo.create(&rule).await.unwrap();

    rule.time_window_minutes = 10;
    repo.update(&rule).await.unwrap();
    assert_eq!(
        repo.get_by_id("r1").await.unwrap().time_window_minutes,
        10
    );

    repo.delete("r1").await.unwrap();
    assert!(repo.get_by_id("r1").await.unwrap_err().is_not_found());
}
