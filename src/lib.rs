//! Work Request Planner core.
//!
//! Teams request recurring deliverables ("topics") from areas. The crate keeps the
//! whole state in an immutable [`models::Snapshot`] and changes it only through
//! [`store::apply`]; the cadence engine in [`schedule`] derives each topic's next
//! request date. Queries, import and export are pure functions over snapshots.
//! Persistence lives in [`db`] and is used by the binary only.

pub mod config;
pub mod db;
pub mod demo;
pub mod errors;
pub mod export;
pub mod ids;
pub mod import;
pub mod models;
pub mod query;
pub mod schedule;
pub mod store;
pub mod validation;

pub use errors::{PlannerError, Result};
pub use models::Snapshot;
pub use store::{apply, Action};
