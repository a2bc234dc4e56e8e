//! Request log model: one fulfilled (or attempted) request for a topic.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Outcome;
use crate::ids::{IdGenerator, IdKind};

const UNKNOWN_SENDER: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestLog {
    pub id: String,
    pub topic_id: String,
    pub date: NaiveDate,
    pub sent_by: String,
    pub to_area_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub outcome: Outcome,
}

/// Input for logging a request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogDraft {
    pub topic_id: String,
    pub to_area_id: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub sent_by: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub outcome: Option<Outcome>,
}

impl LogDraft {
    pub fn new(topic_id: impl Into<String>, to_area_id: impl Into<String>) -> Self {
        Self {
            topic_id: topic_id.into(),
            to_area_id: to_area_id.into(),
            ..Self::default()
        }
    }

    /// Build a log with a fresh identifier. Missing date defaults to `today`,
    /// missing sender to `unknown`, missing outcome to `sent`.
    pub fn build(self, ids: &mut impl IdGenerator, today: NaiveDate) -> RequestLog {
        let sent_by = self
            .sent_by
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| UNKNOWN_SENDER.to_string());
        RequestLog {
            id: ids.next_id(IdKind::Log),
            topic_id: self.topic_id,
            date: self.date.unwrap_or(today),
            sent_by,
            to_area_id: self.to_area_id,
            notes: self.notes.filter(|n| !n.trim().is_empty()),
            outcome: self.outcome.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIds;

    #[test]
    fn test_log_draft_defaults() {
        let mut ids = SequentialIds::default();
        let today = NaiveDate::from_ymd_opt(2025, 4, 2).unwrap();
        let log = LogDraft::new("TP-1", "AR-1").build(&mut ids, today);

        assert_eq!(log.id, "LG-1");
        assert_eq!(log.date, today);
        assert_eq!(log.sent_by, "unknown");
        assert_eq!(log.outcome, Outcome::Sent);
        assert!(log.notes.is_none());
    }
}
