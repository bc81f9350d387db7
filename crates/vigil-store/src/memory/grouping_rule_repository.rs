use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use vigil_common::types::GroupingRule;

use crate::error::{Result, StoreError};
use crate::GroupingRuleRepository;

/// In-memory [`GroupingRuleRepository`].
#[derive(Default)]
pub struct MemoryGroupingRuleRepository {
    rules: RwLock<HashMap<String, GroupingRule>>,
}

impl MemoryGroupingRuleRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GroupingRuleRepository for MemoryGroupingRuleRepository {
    async fn create(&self, rule: &GroupingRule) -> Result<()> {
        let mut rules = self.rules.write().unwrap();
        if rules.contains_key(&rule.id) {
            return Err(StoreError::AlreadyExists {
                entity: "grouping_rule",
                id: rule.id.clone(),
            });
        }
        rules.insert(rule.id.clone(), rule.clone());
        Ok(())
    }

    async fn update(&self, rule: &GroupingRule) -> Result<()> {
        let mut rules = self.rules.write().unwrap();
        if !rules.contains_key(&rule.id) {
            return Err(StoreError::NotFound {
                entity: "grouping_rule",
                id: rule.id.clone(),
            });
        }
        rules.insert(rule.id.clone(), rule.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut rules = self.rules.write().unwrap();
        rules.remove(id).ok_or_else(|| StoreError::NotFound {
            entity: "grouping_rule",
            id: id.to_string(),
        })?;
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<GroupingRule> {
        let rules = self.rules.read().unwrap();
        rules.get(id).cloned().ok_or_else(|| StoreError::NotFound {
            entity: "grouping_rule",
            id: id.to_string(),
        })
    }

    async fn list(&self) -> Result<Vec<GroupingRule>> {
        let rules = self.rules.read().unwrap();
        let mut all: Vec<GroupingRule> = rules.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(all)
    }
}
