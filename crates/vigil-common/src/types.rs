use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Client intent carried by an incoming event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Create or re-activate an alert.
    Trigger,
    /// Request resolution of an alert.
    Resolve,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Trigger => write!(f, "trigger"),
            Action::Resolve => write!(f, "resolve"),
        }
    }
}

impl std::str::FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trigger" => Ok(Action::Trigger),
            "resolve" => Ok(Action::Resolve),
            _ => Err(format!("unknown action: {s}")),
        }
    }
}

/// Alert severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::High => write!(f, "high"),
            Severity::Medium => write!(f, "medium"),
            Severity::Low => write!(f, "low"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "high" => Ok(Severity::High),
            "medium" => Ok(Severity::Medium),
            "low" => Ok(Severity::Low),
            _ => Err(format!("unknown severity: {s}")),
        }
    }
}

/// Validation failures for domain entities and requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("tenant_id is required")]
    MissingTenantId,
    #[error("dedup_key is required")]
    MissingDedupKey,
    #[error("summary is required for trigger events")]
    MissingSummary,
    #[error("class is required for trigger events")]
    MissingClass,
    #[error("name is required")]
    MissingName,
    #[error("grouping_rule_id is required")]
    MissingGroupingRuleId,
    #[error("grouping_key is required")]
    MissingGroupingKey,
    #[error("time_window_minutes must be positive")]
    NonPositiveTimeWindow,
}

/// An incoming alert event from a client.
///
/// This is the payload accepted at the ingestion endpoint. `summary` and
/// `class` may be empty for `resolve` events, which only need to identify
/// the alert by its dedup key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Namespace this event belongs to.
    pub tenant_id: String,
    /// Human-readable description of the alert.
    #[serde(default)]
    pub summary: String,
    pub severity: Severity,
    pub action: Action,
    /// Classification/category of the alert (e.g. "db", "web").
    #[serde(default)]
    pub class: String,
    /// Unique business identifier used for deduplication.
    pub dedup_key: String,
}

impl Event {
    /// Checks required fields, returning the first violation found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.tenant_id.is_empty() {
            return Err(ValidationError::MissingTenantId);
        }
        if self.dedup_key.is_empty() {
            return Err(ValidationError::MissingDedupKey);
        }
        if self.action == Action::Trigger {
            if self.summary.is_empty() {
                return Err(ValidationError::MissingSummary);
            }
            if self.class.is_empty() {
                return Err(ValidationError::MissingClass);
            }
        }
        Ok(())
    }
}

/// An event enriched with routing information, as carried on the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InternalEvent {
    #[serde(flatten)]
    pub event: Event,
    /// Deterministic partition key: 16 hex chars derived from
    /// `(tenant_id, grouping_value)`. See `vigil_ingest::partition_key`.
    pub partition_key: String,
    /// Projection of the grouping rule's key out of the event. May be empty.
    pub grouping_value: String,
    /// Wall time at which the ingest service accepted the event.
    pub received_at: DateTime<Utc>,
}

/// Position of an alert in the grouping hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    /// First alert for a grouping value inside its window; may have children.
    Parent,
    /// Grouped under a parent alert.
    Child,
}

impl std::fmt::Display for AlertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertType::Parent => write!(f, "parent"),
            AlertType::Child => write!(f, "child"),
        }
    }
}

/// Lifecycle state of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
    Resolved,
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertStatus::Active => write!(f, "active"),
            AlertStatus::Resolved => write!(f, "resolved"),
        }
    }
}

/// A processed alert, as persisted in the durable repository.
///
/// Alerts are created from incoming events after grouping has been decided.
/// `dedup_key` is the business identifier; at most one record per dedup key
/// exists, and a resolved record is re-activated in place when a new trigger
/// arrives for the same key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// Opaque durable identifier.
    pub id: String,
    pub dedup_key: String,
    pub tenant_id: String,
    pub summary: String,
    pub severity: Severity,
    pub class: String,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub status: AlertStatus,
    /// Set for child alerts; references an alert with `alert_type = Parent`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_dedup_key: Option<String>,
    /// Number of children grouped under this parent. Advisory; the state
    /// store's children set is authoritative. Always 0 for children.
    pub child_count: i64,
    /// A resolve was requested but the alert could not be resolved yet
    /// (parent waiting on active children).
    pub resolve_requested: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set exactly when `status = Resolved`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Alert {
    /// Builds a new parent alert from an event.
    pub fn new_parent(event: &Event) -> Self {
        let now = Utc::now();
        Alert {
            id: String::new(),
            dedup_key: event.dedup_key.clone(),
            tenant_id: event.tenant_id.clone(),
            summary: event.summary.clone(),
            severity: event.severity,
            class: event.class.clone(),
            alert_type: AlertType::Parent,
            status: AlertStatus::Active,
            parent_dedup_key: None,
            child_count: 0,
            resolve_requested: false,
            created_at: now,
            updated_at: now,
            resolved_at: None,
        }
    }

    /// Builds a new child alert from an event, linked to a parent.
    pub fn new_child(event: &Event, parent_dedup_key: &str) -> Self {
        let mut alert = Alert::new_parent(event);
        alert.alert_type = AlertType::Child;
        alert.parent_dedup_key = Some(parent_dedup_key.to_string());
        alert
    }

    pub fn is_parent(&self) -> bool {
        self.alert_type == AlertType::Parent
    }

    pub fn is_child(&self) -> bool {
        self.alert_type == AlertType::Child
    }

    pub fn is_active(&self) -> bool {
        self.status == AlertStatus::Active
    }

    pub fn is_resolved(&self) -> bool {
        self.status == AlertStatus::Resolved
    }

    /// Marks the alert resolved, stamping `resolved_at`.
    pub fn resolve(&mut self) {
        let now = Utc::now();
        self.status = AlertStatus::Resolved;
        self.resolve_requested = false;
        self.updated_at = now;
        self.resolved_at = Some(now);
    }

    /// Re-activates a resolved alert in place, clearing `resolved_at`.
    pub fn reactivate(&mut self) {
        self.status = AlertStatus::Active;
        self.resolve_requested = false;
        self.resolved_at = None;
        self.updated_at = Utc::now();
    }

    /// Records that a resolve was requested but children are still active.
    pub fn mark_resolve_requested(&mut self) {
        self.resolve_requested = true;
        self.updated_at = Utc::now();
    }

    pub fn increment_child_count(&mut self) {
        self.child_count += 1;
        self.updated_at = Utc::now();
    }
}

/// Filter for querying alerts from the repository.
#[derive(Debug, Clone, Default)]
pub struct AlertFilter {
    pub tenant_id: Option<String>,
    pub status: Option<AlertStatus>,
    pub alert_type: Option<AlertType>,
    /// 0 means no limit.
    pub limit: usize,
    pub offset: usize,
}

/// Webhook settings for alert notifications.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default)]
    pub webhook_url: String,
}

/// An administrative namespace bounding grouping and alerts.
///
/// Each team creates a tenant to route and configure its alerts. A tenant is
/// bound to exactly one grouping rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub grouping_rule_id: String,
    #[serde(default)]
    pub notification_config: NotificationConfig,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::MissingName);
        }
        if self.grouping_rule_id.is_empty() {
            return Err(ValidationError::MissingGroupingRuleId);
        }
        Ok(())
    }
}

/// Input for creating a tenant.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTenantRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub grouping_rule_id: String,
    #[serde(default)]
    pub notification_config: NotificationConfig,
}

impl CreateTenantRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::MissingName);
        }
        if self.grouping_rule_id.is_empty() {
            return Err(ValidationError::MissingGroupingRuleId);
        }
        Ok(())
    }

    pub fn into_tenant(self, id: String) -> Tenant {
        let now = Utc::now();
        Tenant {
            id,
            name: self.name,
            description: self.description,
            grouping_rule_id: self.grouping_rule_id,
            notification_config: self.notification_config,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Input for updating a tenant.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateTenantRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub grouping_rule_id: String,
    #[serde(default)]
    pub notification_config: NotificationConfig,
}

impl UpdateTenantRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::MissingName);
        }
        if self.grouping_rule_id.is_empty() {
            return Err(ValidationError::MissingGroupingRuleId);
        }
        Ok(())
    }

    pub fn apply_to(self, tenant: &mut Tenant) {
        tenant.name = self.name;
        tenant.description = self.description;
        tenant.grouping_rule_id = self.grouping_rule_id;
        tenant.notification_config = self.notification_config;
        tenant.updated_at = Utc::now();
    }
}

/// Determines how a tenant's events coalesce into parent/child alerts.
///
/// `grouping_key` names the event field whose value defines the group;
/// `time_window_minutes` is how long a parent stays open as a grouping
/// target after it is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupingRule {
    pub id: String,
    pub name: String,
    /// Event field to project. Recognized: "class", "severity", "tenant_id".
    /// Unrecognized keys project to the empty string.
    pub grouping_key: String,
    pub time_window_minutes: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GroupingRule {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::MissingName);
        }
        if self.grouping_key.is_empty() {
            return Err(ValidationError::MissingGroupingKey);
        }
        if self.time_window_minutes == 0 {
            return Err(ValidationError::NonPositiveTimeWindow);
        }
        Ok(())
    }

    /// The grouping window as a duration.
    pub fn time_window(&self) -> Duration {
        Duration::minutes(i64::from(self.time_window_minutes))
    }

    /// Projects this rule's grouping key out of an event.
    ///
    /// The recognized key set is closed; anything else projects to `""`,
    /// which groups all of the tenant's events into a single slot.
    pub fn extract_grouping_value(&self, event: &Event) -> String {
        match self.grouping_key.as_str() {
            "class" => event.class.clone(),
            "severity" => event.severity.to_string(),
            "tenant_id" => event.tenant_id.clone(),
            _ => String::new(),
        }
    }
}

/// Input for creating a grouping rule.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateGroupingRuleRequest {
    pub name: String,
    pub grouping_key: String,
    pub time_window_minutes: u32,
}

impl CreateGroupingRuleRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::MissingName);
        }
        if self.grouping_key.is_empty() {
            return Err(ValidationError::MissingGroupingKey);
        }
        if self.time_window_minutes == 0 {
            return Err(ValidationError::NonPositiveTimeWindow);
        }
        Ok(())
    }

    pub fn into_rule(self, id: String) -> GroupingRule {
        let now = Utc::now();
        GroupingRule {
            id,
            name: self.name,
            grouping_key: self.grouping_key,
            time_window_minutes: self.time_window_minutes,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Input for updating a grouping rule.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateGroupingRuleRequest {
    pub name: String,
    pub grouping_key: String,
    pub time_window_minutes: u32,
}

impl UpdateGroupingRuleRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::MissingName);
        }
        if self.grouping_key.is_empty() {
            return Err(ValidationError::MissingGroupingKey);
        }
        if self.time_window_minutes == 0 {
            return Err(ValidationError::NonPositiveTimeWindow);
        }
        Ok(())
    }

    pub fn apply_to(self, rule: &mut GroupingRule) {
        rule.name = self.name;
        rule.grouping_key = self.grouping_key;
        rule.time_window_minutes = self.time_window_minutes;
        rule.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trigger_event() -> Event {
        Event {
            tenant_id: "tenant-1".to_string(),
            summary: "database connection pool exhausted".to_string(),
            severity: Severity::High,
            action: Action::Trigger,
            class: "db".to_string(),
            dedup_key: "db-pool-1".to_string(),
        }
    }

    #[test]
    fn valid_trigger_event_passes() {
        assert!(trigger_event().validate().is_ok());
    }

    #[test]
    fn trigger_event_requires_summary_and_class() {
        let mut event = trigger_event();
        event.summary.clear();
        assert_eq!(event.validate(), Err(ValidationError::MissingSummary));

        let mut event = trigger_event();
        event.class.clear();
        assert_eq!(event.validate(), Err(ValidationError::MissingClass));
    }

    #[test]
    fn resolve_event_allows_empty_summary_and_class() {
        let event = Event {
            tenant_id: "tenant-1".to_string(),
            summary: String::new(),
            severity: Severity::Low,
            action: Action::Resolve,
            class: String::new(),
            dedup_key: "db-pool-1".to_string(),
        };
        assert!(event.validate().is_ok());
    }

    #[test]
    fn event_requires_tenant_and_dedup_key() {
        let mut event = trigger_event();
        event.tenant_id.clear();
        assert_eq!(event.validate(), Err(ValidationError::MissingTenantId));

        let mut event = trigger_event();
        event.dedup_key.clear();
        assert_eq!(event.validate(), Err(ValidationError::MissingDedupKey));
    }

    #[test]
    fn unknown_action_fails_deserialization() {
        let raw = r#"{"tenant_id":"t","summary":"s","severity":"high","action":"escalate","class":"db","dedup_key":"k"}"#;
        assert!(serde_json::from_str::<Event>(raw).is_err());
    }

    #[test]
    fn internal_event_round_trips_with_flattened_fields() {
        let internal = InternalEvent {
            event: trigger_event(),
            partition_key: "00112233aabbccdd".to_string(),
            grouping_value: "db".to_string(),
            received_at: Utc::now(),
        };
        let json = serde_json::to_string(&internal).unwrap();
        assert!(json.contains("\"dedup_key\":\"db-pool-1\""));
        let back: InternalEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.event.dedup_key, "db-pool-1");
        assert_eq!(back.partition_key, "00112233aabbccdd");
    }

    #[test]
    fn new_parent_alert_starts_active_with_no_children() {
        let alert = Alert::new_parent(&trigger_event());
        assert!(alert.is_parent());
        assert!(alert.is_active());
        assert_eq!(alert.child_count, 0);
        assert!(alert.parent_dedup_key.is_none());
        assert!(alert.resolved_at.is_none());
    }

    #[test]
    fn new_child_alert_references_parent() {
        let alert = Alert::new_child(&trigger_event(), "parent-key");
        assert!(alert.is_child());
        assert_eq!(alert.parent_dedup_key.as_deref(), Some("parent-key"));
    }

    #[test]
    fn resolve_sets_resolved_at_and_reactivate_clears_it() {
        let mut alert = Alert::new_parent(&trigger_event());
        alert.mark_resolve_requested();
        assert!(alert.resolve_requested);

        alert.resolve();
        assert!(alert.is_resolved());
        assert!(alert.resolved_at.is_some());
        assert!(!alert.resolve_requested);

        alert.reactivate();
        assert!(alert.is_active());
        assert!(alert.resolved_at.is_none());
    }

    #[test]
    fn grouping_rule_rejects_zero_window() {
        let rule = GroupingRule {
            id: "r1".to_string(),
            name: "by class".to_string(),
            grouping_key: "class".to_string(),
            time_window_minutes: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(rule.validate(), Err(ValidationError::NonPositiveTimeWindow));
    }

    #[test]
    fn grouping_value_projection_is_a_closed_set() {
        let event = trigger_event();
        let mut rule = GroupingRule {
            id: "r1".to_string(),
            name: "by class".to_string(),
            grouping_key: "class".to_string(),
            time_window_minutes: 5,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(rule.extract_grouping_value(&event), "db");

        rule.grouping_key = "severity".to_string();
        assert_eq!(rule.extract_grouping_value(&event), "high");

        rule.grouping_key = "tenant_id".to_string();
        assert_eq!(rule.extract_grouping_value(&event), "tenant-1");

        rule.grouping_key = "hostname".to_string();
        assert_eq!(rule.extract_grouping_value(&event), "");
    }

    #[test]
    fn tenant_requires_name_and_rule_binding() {
        let request = CreateTenantRequest {
            name: String::new(),
            description: String::new(),
            grouping_rule_id: "r1".to_string(),
            notification_config: NotificationConfig::default(),
        };
        assert_eq!(request.validate(), Err(ValidationError::MissingName));

        let request = CreateTenantRequest {
            name: "payments".to_string(),
            description: String::new(),
            grouping_rule_id: String::new(),
            notification_config: NotificationConfig::default(),
        };
        assert_eq!(
            request.validate(),
            Err(ValidationError::MissingGroupingRuleId)
        );
    }
}
