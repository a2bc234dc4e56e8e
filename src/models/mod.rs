//! Data models for the work request planner.
//!
//! Field names serialize in camelCase to stay compatible with exported snapshots.

mod area;
mod enums;
pub mod fields;
mod log;
mod snapshot;
mod team;
mod topic;

pub use area::*;
pub use enums::*;
pub use log::*;
pub use snapshot::*;
pub use team::*;
pub use topic::*;
