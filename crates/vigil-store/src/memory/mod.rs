//! In-memory reference implementations of the store traits.
//!
//! Backed by `std::sync::RwLock`-protected maps so concurrent reads proceed
//! in parallel while mutations are exclusive. No critical section spans an
//! await point. Useful for tests, development, and single-node deployments.

mod alert_repository;
mod grouping_rule_repository;
mod state_store;
mod tenant_repository;

pub use alert_repository::MemoryAlertRepository;
pub use grouping_rule_repository::MemoryGroupingRuleRepository;
pub use state_store::MemoryStateStore;
pub use tenant_repository::MemoryTenantRepository;
