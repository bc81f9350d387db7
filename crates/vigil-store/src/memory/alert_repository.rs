use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use vigil_common::types::{Alert, AlertFilter};

use crate::error::{Result, StoreError};
use crate::AlertRepository;

#[derive(Default)]
struct Inner {
    /// All alerts by durable ID.
    by_id: HashMap<String, Alert>,
    /// Dedup key -> durable ID.
    id_by_dedup: HashMap<String, String>,
    /// Parent dedup key -> dedup keys of its children.
    children: HashMap<String, HashSet<String>>,
}

/// In-memory [`AlertRepository`] indexed by ID, dedup key, and parent.
#[derive(Default)]
pub struct MemoryAlertRepository {
    inner: RwLock<Inner>,
}

impl MemoryAlertRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored alert records. Test helper.
    pub fn len(&self) -> usize {
        self.inner.read().unwrap().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AlertRepository for MemoryAlertRepository {
    async fn create(&self, alert: &Alert) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        if inner.id_by_dedup.contains_key(&alert.dedup_key) {
            return Err(StoreError::AlreadyExists {
                entity: "alert",
                id: alert.dedup_key.clone(),
            });
        }
        if let Some(parent) = &alert.parent_dedup_key {
            inner
                .children
                .entry(parent.clone())
                .or_default()
                .insert(alert.dedup_key.clone());
        }
        inner
            .id_by_dedup
            .insert(alert.dedup_key.clone(), alert.id.clone());
        inner.by_id.insert(alert.id.clone(), alert.clone());
        Ok(())
    }

    async fn update(&self, alert: &Alert) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        if !inner.by_id.contains_key(&alert.id) {
            return Err(StoreError::NotFound {
                entity: "alert",
                id: alert.id.clone(),
            });
        }
        inner
            .id_by_dedup
            .insert(alert.dedup_key.clone(), alert.id.clone());
        if let Some(parent) = &alert.parent_dedup_key {
            inner
                .children
                .entry(parent.clone())
                .or_default()
                .insert(alert.dedup_key.clone());
        }
        inner.by_id.insert(alert.id.clone(), alert.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Alert> {
        let inner = self.inner.read().unwrap();
        inner.by_id.get(id).cloned().ok_or_else(|| StoreError::NotFound {
            entity: "alert",
            id: id.to_string(),
        })
    }

    async fn get_by_dedup_key(&self, dedup_key: &str) -> Result<Alert> {
        let inner = self.inner.read().unwrap();
        inner
            .id_by_dedup
            .get(dedup_key)
            .and_then(|id| inner.by_id.get(id))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                entity: "alert",
                id: dedup_key.to_string(),
            })
    }

    async fn list(&self, filter: &AlertFilter) -> Result<Vec<Alert>> {
        let inner = self.inner.read().unwrap();
        let mut results: Vec<Alert> = inner
            .by_id
            .values()
            .filter(|alert| {
                filter
                    .tenant_id
                    .as_ref()
                    .is_none_or(|t| &alert.tenant_id == t)
                    && filter.status.is_none_or(|s| alert.status == s)
                    && filter.alert_type.is_none_or(|t| alert.alert_type == t)
            })
            .cloned()
            .collect();
        // Newest first, so paginated reads are stable as alerts stream in.
        results.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let start = filter.offset.min(results.len());
        let end = if filter.limit > 0 {
            (start + filter.limit).min(results.len())
        } else {
            results.len()
        };
        Ok(results[start..end].to_vec())
    }

    async fn children_of(&self, parent_dedup_key: &str) -> Result<Vec<Alert>> {
        let inner = self.inner.read().unwrap();
        let keys = match inner.children.get(parent_dedup_key) {
            Some(keys) => keys,
            None => return Ok(Vec::new()),
        };
        Ok(keys
            .iter()
            .filter_map(|key| inner.id_by_dedup.get(key))
            .filter_map(|id| inner.by_id.get(id))
            .cloned()
            .collect())
    }

    async fn count_active_children(&self, parent_dedup_key: &str) -> Result<usize> {
        let inner = self.inner.read().unwrap();
        let keys = match inner.children.get(parent_dedup_key) {
            Some(keys) => keys,
            None => return Ok(0),
        };
        Ok(keys
            .iter()
            .filter_map(|key| inner.id_by_dedup.get(key))
            .filter_map(|id| inner.by_id.get(id))
            .filter(|alert| alert.is_active())
            .count())
    }
}
