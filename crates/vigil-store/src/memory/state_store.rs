use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use crate::error::Result;
use crate::{AlertState, ParentState, PendingResolve, StateStore};

/// Parent entry with its expiry deadline. Expiration is lazy: expired
/// entries answer `None` on read and are swept on the next write under
/// the same key.
#[derive(Debug, Clone)]
struct ParentEntry {
    state: ParentState,
    expires_at: DateTime<Utc>,
}

#[derive(Default)]
struct Inner {
    /// Keyed by `tenant_id:grouping_key:grouping_value`.
    parents: HashMap<String, ParentEntry>,
    /// Keyed by dedup key.
    alerts: HashMap<String, AlertState>,
    /// Parent dedup key -> set of child dedup keys.
    children: HashMap<String, HashSet<String>>,
    /// Keyed by parent dedup key.
    pending_resolves: HashMap<String, PendingResolve>,
}

/// In-memory [`StateStore`] with lazy TTL expiration on the parent lookup.
#[derive(Default)]
pub struct MemoryStateStore {
    inner: RwLock<Inner>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn parent_key(tenant_id: &str, grouping_key: &str, grouping_value: &str) -> String {
        format!("{tenant_id}:{grouping_key}:{grouping_value}")
    }

    /// Drops all entries. Test helper.
    pub fn clear(&self) {
        let mut inner = self.inner.write().unwrap();
        *inner = Inner::default();
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get_parent(
        &self,
        tenant_id: &str,
        grouping_key: &str,
        grouping_value: &str,
    ) -> Result<Option<ParentState>> {
        let inner = self.inner.read().unwrap();
        let key = Self::parent_key(tenant_id, grouping_key, grouping_value);
        let entry = match inner.parents.get(&key) {
            Some(entry) => entry,
            None => return Ok(None),
        };
        if Utc::now() > entry.expires_at {
            return Ok(None);
        }
        Ok(Some(entry.state.clone()))
    }

    async fn set_parent(
        &self,
        tenant_id: &str,
        grouping_key: &str,
        grouping_value: &str,
        state: ParentState,
        ttl: Duration,
    ) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        let key = Self::parent_key(tenant_id, grouping_key, grouping_value);
        inner.parents.insert(
            key,
            ParentEntry {
                state,
                expires_at: Utc::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete_parent(
        &self,
        tenant_id: &str,
        grouping_key: &str,
        grouping_value: &str,
    ) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        let key = Self::parent_key(tenant_id, grouping_key, grouping_value);
        inner.parents.remove(&key);
        Ok(())
    }

    async fn get_alert(&self, dedup_key: &str) -> Result<Option<AlertState>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.alerts.get(dedup_key).cloned())
    }

    async fn set_alert(&self, state: AlertState) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        inner.alerts.insert(state.dedup_key.clone(), state);
        Ok(())
    }

    async fn delete_alert(&self, dedup_key: &str) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        inner.alerts.remove(dedup_key);
        Ok(())
    }

    async fn add_child(&self, parent_dedup_key: &str, child_dedup_key: &str) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        inner
            .children
            .entry(parent_dedup_key.to_string())
            .or_default()
            .insert(child_dedup_key.to_string());
        Ok(())
    }

    async fn remove_child(&self, parent_dedup_key: &str, child_dedup_key: &str) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        if let Some(set) = inner.children.get_mut(parent_dedup_key) {
            set.remove(child_dedup_key);
        }
        Ok(())
    }

    async fn children(&self, parent_dedup_key: &str) -> Result<Vec<String>> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .children
            .get(parent_dedup_key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn child_count(&self, parent_dedup_key: &str) -> Result<usize> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .children
            .get(parent_dedup_key)
            .map_or(0, HashSet::len))
    }

    async fn set_pending_resolve(
        &self,
        parent_dedup_key: &str,
        pending: PendingResolve,
    ) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        inner
            .pending_resolves
            .insert(parent_dedup_key.to_string(), pending);
        Ok(())
    }

    async fn get_pending_resolve(&self, parent_dedup_key: &str) -> Result<Option<PendingResolve>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.pending_resolves.get(parent_dedup_key).cloned())
    }

    async fn delete_pending_resolve(&self, parent_dedup_key: &str) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        inner.pending_resolves.remove(parent_dedup_key);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
