//! Shared domain model for the vigil alert grouping service.
//!
//! Everything that crosses a crate boundary lives here: the event and alert
//! entities, tenants and grouping rules, and the snowflake ID generator used
//! for durable record identifiers.

pub mod id;
pub mod types;
