//! The snapshot: the single owner of all four entity collections.

use serde::{Deserialize, Serialize};

use super::{Area, RequestLog, Team, Topic};

/// Complete value of all entity collections at one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub teams: Vec<Team>,
    pub areas: Vec<Area>,
    pub topics: Vec<Topic>,
    pub logs: Vec<RequestLog>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
            && self.areas.is_empty()
            && self.topics.is_empty()
            && self.logs.is_empty()
    }

    pub fn team(&self, id: &str) -> Option<&Team> {
        self.teams.iter().find(|t| t.id == id)
    }

    pub fn area(&self, id: &str) -> Option<&Area> {
        self.areas.iter().find(|a| a.id == id)
    }

    pub fn topic(&self, id: &str) -> Option<&Topic> {
        self.topics.iter().find(|t| t.id == id)
    }

    pub fn log(&self, id: &str) -> Option<&RequestLog> {
        self.logs.iter().find(|l| l.id == id)
    }

    /// Logs recorded for one topic, in insertion order.
    pub fn logs_for_topic<'a>(&'a self, topic_id: &'a str) -> impl Iterator<Item = &'a RequestLog> {
        self.logs.iter().filter(move |l| l.topic_id == topic_id)
    }

    /// Entity counts as `(teams, areas, topics, logs)`.
    pub fn counts(&self) -> (usize, usize, usize, usize) {
        (
            self.teams.len(),
            self.areas.len(),
            self.topics.len(),
            self.logs.len(),
        )
    }
}

/// Revision information for change detection on the persisted copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionInfo {
    pub revision_id: i64,
    pub generated_at: String,
}
