use crate::config::ServerConfig;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use vigil_ingest::IngestService;
use vigil_store::{AlertRepository, GroupingRuleRepository, TenantRepository};

/// Shared application state handed to every HTTP handler.
#[derive(Clone)]
pub struct AppState {
    pub ingest: Arc<IngestService>,
    pub alerts: Arc<dyn AlertRepository>,
    pub tenants: Arc<dyn TenantRepository>,
    pub rules: Arc<dyn GroupingRuleRepository>,
    pub config: Arc<ServerConfig>,
    pub start_time: DateTime<Utc>,
}
