//! Configuration module for the planner binary.
//!
//! All configuration is loaded from environment variables (and `.env`) with sensible
//! defaults. Command-line flags override what is loaded here.

use std::env;
use std::path::PathBuf;

use chrono::NaiveDate;

use crate::errors::{PlannerError, Result};
use crate::schedule::{parse_date, Clock, FixedClock, SystemClock};
use crate::store::DEFAULT_UNDO_DEPTH;

pub const DEFAULT_DB_PATH: &str = "./data/planner.sqlite";
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Pinned "today" for reproducible reports; the system clock when unset
    pub today: Option<NaiveDate>,
    /// Number of snapshots kept for undo
    pub undo_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            today: None,
            undo_depth: DEFAULT_UNDO_DEPTH,
        }
    }
}

impl Config {
    /// Load configuration from `.env` and the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup. Unset keys take their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let db_path = lookup("PLANNER_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);

        let log_level = lookup("PLANNER_LOG_LEVEL").unwrap_or(defaults.log_level);

        let today = lookup("PLANNER_TODAY")
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| {
                parse_date(&raw).map_err(|_| {
                    PlannerError::Config(format!("PLANNER_TODAY '{}' is not YYYY-MM-DD", raw))
                })
            })
            .transpose()?;

        let undo_depth = match lookup("PLANNER_UNDO_DEPTH") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                PlannerError::Config(format!("PLANNER_UNDO_DEPTH '{}' is not a number", raw))
            })?,
            None => defaults.undo_depth,
        };

        Ok(Self {
            db_path,
            log_level,
            today,
            undo_depth,
        })
    }

    /// The clock implied by `today`.
    pub fn clock(&self) -> Box<dyn Clock> {
        match self.today {
            Some(date) => Box::new(FixedClock(date)),
            None => Box::new(SystemClock),
        }
    }
}
