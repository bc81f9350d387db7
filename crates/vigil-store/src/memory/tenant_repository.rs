use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use vigil_common::types::Tenant;

use crate::error::{Result, StoreError};
use crate::TenantRepository;

/// In-memory [`TenantRepository`].
#[derive(Default)]
pub struct MemoryTenantRepository {
    tenants: RwLock<HashMap<String, Tenant>>,
}

impl MemoryTenantRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TenantRepository for MemoryTenantRepository {
    async fn create(&self, tenant: &Tenant) -> Result<()> {
        let mut tenants = self.tenants.write().unwrap();
        if tenants.contains_key(&tenant.id) {
            return Err(StoreError::AlreadyExists {
                entity: "tenant",
                id: tenant.id.clone(),
            });
        }
        tenants.insert(tenant.id.clone(), tenant.clone());
        Ok(())
    }

    async fn update(&self, tenant: &Tenant) -> Result<()> {
        let mut tenants = self.tenants.write().unwrap();
        if !tenants.contains_key(&tenant.id) {
            return Err(StoreError::NotFound {
                entity: "tenant",
                id: tenant.id.clone(),
            });
        }
        tenants.insert(tenant.id.clone(), tenant.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut tenants = self.tenants.write().unwrap();
        tenants.remove(id).ok_or_else(|| StoreError::NotFound {
            entity: "tenant",
            id: id.to_string(),
        })?;
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Tenant> {
        let tenants = self.tenants.read().unwrap();
        tenants.get(id).cloned().ok_or_else(|| StoreError::NotFound {
            entity: "tenant",
            id: id.to_string(),
        })
    }

    async fn list(&self) -> Result<Vec<Tenant>> {
        let tenants = self.tenants.read().unwrap();
        let mut all: Vec<Tenant> = tenants.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(all)
    }
}
