//! State and persistence layer for the vigil alert grouping service.
//!
//! Two tiers back the processing pipeline: a fast, TTL-capable [`StateStore`]
//! holding the grouping hot path (parent lookup, alert state, children sets,
//! pending resolves), and durable repositories for alerts, tenants, and
//! grouping rules. The in-memory implementations in [`memory`] are the
//! reference backends; production deployments would put Redis behind
//! [`StateStore`] and a SQL database behind the repositories without touching
//! business logic.

pub mod error;
pub mod memory;

#[cfg(test)]
mod tests;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use vigil_common::types::{Alert, AlertFilter, AlertStatus, AlertType, GroupingRule, Tenant};

use crate::error::Result;

/// Cached state of a parent alert, used for fast grouping lookups.
///
/// Keyed by `(tenant_id, grouping_key, grouping_value)` and expired by the
/// grouping rule's time window. Expiry is what closes the grouping window:
/// after it, new triggers for the same group form a new parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParentState {
    pub dedup_key: String,
    pub created_at: DateTime<Utc>,
    pub child_count: i64,
}

/// Cached state of any alert (parent or child), keyed by dedup key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertState {
    pub dedup_key: String,
    pub tenant_id: String,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub status: AlertStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_dedup_key: Option<String>,
    pub resolve_requested: bool,
}

/// A parent alert waiting for its children to resolve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingResolve {
    pub requested_at: DateTime<Utc>,
    pub remaining_children: i64,
}

/// Fast, TTL-capable state operations backing the grouping hot path.
///
/// The state store is authoritative for "is there a parent for this group?"
/// and "is this alert active?". Implementations must be safe for concurrent
/// use; each operation is individually atomic, and the processor never needs
/// multi-operation transactions because all decisions for one
/// `(tenant, grouping_value)` are pinned to a single queue partition.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Looks up the open parent for a grouping combination.
    /// Returns `Ok(None)` when no parent exists or its window has expired.
    async fn get_parent(
        &self,
        tenant_id: &str,
        grouping_key: &str,
        grouping_value: &str,
    ) -> Result<Option<ParentState>>;

    /// Stores a parent entry with the given TTL (the rule's time window).
    /// The TTL is a window anchored at parent creation, not a lease: child
    /// arrivals must not refresh it.
    async fn set_parent(
        &self,
        tenant_id: &str,
        grouping_key: &str,
        grouping_value: &str,
        state: ParentState,
        ttl: Duration,
    ) -> Result<()>;

    /// Removes a parent entry before its TTL elapses.
    async fn delete_parent(
        &self,
        tenant_id: &str,
        grouping_key: &str,
        grouping_value: &str,
    ) -> Result<()>;

    /// Fetches alert state by dedup key. `Ok(None)` when unknown.
    async fn get_alert(&self, dedup_key: &str) -> Result<Option<AlertState>>;

    /// Stores or replaces an alert's state. No TTL.
    async fn set_alert(&self, state: AlertState) -> Result<()>;

    async fn delete_alert(&self, dedup_key: &str) -> Result<()>;

    /// Adds a child dedup key to a parent's children set (set semantics:
    /// re-adding an existing member is a no-op).
    async fn add_child(&self, parent_dedup_key: &str, child_dedup_key: &str) -> Result<()>;

    async fn remove_child(&self, parent_dedup_key: &str, child_dedup_key: &str) -> Result<()>;

    /// Members of a parent's children set, in no particular order.
    async fn children(&self, parent_dedup_key: &str) -> Result<Vec<String>>;

    async fn child_count(&self, parent_dedup_key: &str) -> Result<usize>;

    /// Marks a parent as having an outstanding resolve request.
    async fn set_pending_resolve(
        &self,
        parent_dedup_key: &str,
        pending: PendingResolve,
    ) -> Result<()>;

    /// `Ok(None)` when the parent has no outstanding resolve request.
    async fn get_pending_resolve(&self, parent_dedup_key: &str) -> Result<Option<PendingResolve>>;

    async fn delete_pending_resolve(&self, parent_dedup_key: &str) -> Result<()>;

    /// Releases resources. Idempotent.
    async fn close(&self) -> Result<()>;
}

/// Durable persistence for alerts.
///
/// The repository is authoritative for historical queries and for
/// `count_active_children` during parent-resolve probing.
#[async_trait]
pub trait AlertRepository: Send + Sync {
    async fn create(&self, alert: &Alert) -> Result<()>;

    async fn update(&self, alert: &Alert) -> Result<()>;

    async fn get_by_id(&self, id: &str) -> Result<Alert>;

    async fn get_by_dedup_key(&self, dedup_key: &str) -> Result<Alert>;

    async fn list(&self, filter: &AlertFilter) -> Result<Vec<Alert>>;

    /// All child alerts referencing the given parent dedup key.
    async fn children_of(&self, parent_dedup_key: &str) -> Result<Vec<Alert>>;

    /// Number of the parent's children still in `Active` status.
    async fn count_active_children(&self, parent_dedup_key: &str) -> Result<usize>;
}

/// Durable persistence for tenants.
#[async_trait]
pub trait TenantRepository: Send + Sync {
    async fn create(&self, tenant: &Tenant) -> Result<()>;

    async fn update(&self, tenant: &Tenant) -> Result<()>;

    async fn delete(&self, id: &str) -> Result<()>;

    async fn get_by_id(&self, id: &str) -> Result<Tenant>;

    async fn list(&self) -> Result<Vec<Tenant>>;
}

/// Durable persistence for grouping rules.
#[async_trait]
pub trait GroupingRuleRepository: Send + Sync {
    async fn create(&self, rule: &GroupingRule) -> Result<()>;

    async fn update(&self, rule: &GroupingRule) -> Result<()>;

    async fn delete(&self, id: &str) -> Result<()>;

    async fn get_by_id(&self, id: &str) -> Result<GroupingRule>;

    async fn list(&self) -> Result<Vec<GroupingRule>>;
}
