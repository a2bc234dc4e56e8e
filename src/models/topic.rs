//! Topic model: a recurring deliverable a team requests from one or more areas.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::fields::{optional_date, string_set};
use super::{Cadence, DueStrategy, Priority, Status};
use crate::ids::{IdGenerator, IdKind};
use crate::schedule;

/// A recurring work request between a team and its areas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub id: String,
    pub team_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, with = "string_set")]
    pub area_ids: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cadence: Option<Cadence>,
    #[serde(default, with = "optional_date", skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_strategy: Option<DueStrategy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_offset_days: Option<i32>,
    #[serde(default)]
    pub expected_deliverable: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: Status,
    #[serde(default, with = "string_set")]
    pub tags: BTreeSet<String>,
    #[serde(default, with = "optional_date", skip_serializing_if = "Option::is_none")]
    pub last_request_date: Option<NaiveDate>,
    #[serde(default, with = "optional_date", skip_serializing_if = "Option::is_none")]
    pub next_request_date: Option<NaiveDate>,
}

impl Topic {
    /// Date used for filtering, KPIs and the calendar: next request, else start.
    pub fn due_date(&self) -> Option<NaiveDate> {
        self.next_request_date.or(self.start_date)
    }

    /// Recompute `next_request_date` from the schedule fields.
    ///
    /// Without both a cadence and a start date there is no formula, and the
    /// stored value is left as it is.
    pub fn refresh_next_date(&mut self) {
        if let Some(next) = schedule::schedule_for(self) {
            self.next_request_date = Some(next);
        }
    }

    /// Record a fulfilled request dated `date` and advance the schedule.
    pub fn record_request(&mut self, date: NaiveDate) {
        self.last_request_date = Some(date);
        self.refresh_next_date();
    }

    pub fn in_area(&self, area_id: &str) -> bool {
        self.area_ids.contains(area_id)
    }

    /// Case-insensitive tag membership.
    pub fn has_tag(&self, tag: &str) -> bool {
        let needle = tag.trim().to_lowercase();
        self.tags.iter().any(|t| t.to_lowercase() == needle)
    }
}

/// Input for creating a new topic.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicDraft {
    pub team_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, with = "string_set")]
    pub area_ids: BTreeSet<String>,
    #[serde(default)]
    pub cadence: Option<Cadence>,
    #[serde(default, with = "optional_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub due_strategy: Option<DueStrategy>,
    #[serde(default)]
    pub due_offset_days: Option<i32>,
    #[serde(default)]
    pub expected_deliverable: String,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default, with = "string_set")]
    pub tags: BTreeSet<String>,
    #[serde(default, with = "optional_date")]
    pub last_request_date: Option<NaiveDate>,
}

impl TopicDraft {
    pub fn new(team_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            team_id: team_id.into(),
            title: title.into(),
            ..Self::default()
        }
    }

    /// Build a topic with a fresh identifier.
    ///
    /// Defaults: cadence one-off, strategy fixed-date, start date `today`, priority
    /// medium, status planned. The next request date is always derived.
    pub fn build(self, ids: &mut impl IdGenerator, today: NaiveDate) -> Topic {
        let due_strategy = self.due_strategy.unwrap_or(DueStrategy::FixedDate);
        let due_offset_days = match due_strategy {
            DueStrategy::Relative => Some(self.due_offset_days.unwrap_or(0)),
            DueStrategy::FixedDate => None,
        };
        let mut topic = Topic {
            id: ids.next_id(IdKind::Topic),
            team_id: self.team_id,
            title: self.title.trim().to_string(),
            description: self.description.filter(|d| !d.trim().is_empty()),
            area_ids: self.area_ids,
            cadence: Some(self.cadence.unwrap_or(Cadence::OneOff)),
            start_date: Some(self.start_date.unwrap_or(today)),
            due_strategy: Some(due_strategy),
            due_offset_days,
            expected_deliverable: self.expected_deliverable.trim().to_string(),
            priority: self.priority.unwrap_or_default(),
            status: self.status.unwrap_or_default(),
            tags: self.tags,
            last_request_date: self.last_request_date,
            next_request_date: None,
        };
        topic.refresh_next_date();
        topic
    }
}

/// Partial update for one or many topics. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicPatch {
    #[serde(default)]
    pub team_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub area_ids: Option<BTreeSet<String>>,
    #[serde(default)]
    pub cadence: Option<Cadence>,
    #[serde(default, with = "optional_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub due_strategy: Option<DueStrategy>,
    #[serde(default)]
    pub due_offset_days: Option<i32>,
    #[serde(default)]
    pub expected_deliverable: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default)]
    pub tags: Option<BTreeSet<String>>,
}

impl TopicPatch {
    pub fn status(status: Status) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn cadence(cadence: Cadence) -> Self {
        Self {
            cadence: Some(cadence),
            ..Self::default()
        }
    }

    /// True when applying the patch can change the derived next request date.
    pub fn touches_schedule(&self) -> bool {
        self.cadence.is_some() || self.start_date.is_some()
    }

    /// The offset a topic holding `current` ends up with. Switching to a fixed
    /// date drops the offset unless the patch sets one itself.
    pub fn due_offset_for(&self, current: Option<i32>) -> Option<i32> {
        match (self.due_offset_days, self.due_strategy) {
            (Some(offset), _) => Some(offset),
            (None, Some(DueStrategy::FixedDate)) => None,
            (None, _) => current,
        }
    }

    /// Copy every present field onto `topic`. Dates are not recomputed here.
    /// An empty description clears it.
    pub fn apply_to(&self, topic: &mut Topic) {
        if let Some(team_id) = &self.team_id {
            topic.team_id = team_id.clone();
        }
        if let Some(title) = &self.title {
            topic.title = title.trim().to_string();
        }
        if let Some(description) = &self.description {
            topic.description = Some(description.clone()).filter(|d| !d.trim().is_empty());
        }
        if let Some(area_ids) = &self.area_ids {
            topic.area_ids = area_ids.clone();
        }
        if let Some(cadence) = self.cadence {
            topic.cadence = Some(cadence);
        }
        if let Some(start_date) = self.start_date {
            topic.start_date = Some(start_date);
        }
        if let Some(due_strategy) = self.due_strategy {
            topic.due_strategy = Some(due_strategy);
        }
        topic.due_offset_days = self.due_offset_for(topic.due_offset_days);
        if let Some(deliverable) = &self.expected_deliverable {
            topic.expected_deliverable = deliverable.clone();
        }
        if let Some(priority) = self.priority {
            topic.priority = priority;
        }
        if let Some(status) = self.status {
            topic.status = status;
        }
        if let Some(tags) = &self.tags {
            topic.tags = tags.clone();
        }
    }
}
