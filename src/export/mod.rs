//! Flat CSV projection of topics and the pretty JSON snapshot export.

use crate::errors::Result;
use crate::models::fields::join_list;
use crate::models::{Snapshot, Topic};

pub const CSV_COLUMNS: [&str; 15] = [
    "id",
    "teamId",
    "title",
    "description",
    "areaIds",
    "cadence",
    "startDate",
    "dueStrategy",
    "dueOffsetDays",
    "expectedDeliverable",
    "priority",
    "status",
    "tags",
    "lastRequestDate",
    "nextRequestDate",
];

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn row(topic: &Topic) -> [String; 15] {
    [
        topic.id.clone(),
        topic.team_id.clone(),
        topic.title.clone(),
        topic.description.clone().unwrap_or_default(),
        join_list(&topic.area_ids),
        opt(topic.cadence),
        opt(topic.start_date),
        opt(topic.due_strategy),
        opt(topic.due_offset_days),
        topic.expected_deliverable.clone(),
        topic.priority.to_string(),
        topic.status.to_string(),
        join_list(&topic.tags),
        opt(topic.last_request_date),
        opt(topic.next_request_date),
    ]
}

/// One bare header line plus one line per topic. Every data field is quoted and
/// embedded quotes are doubled; multi-valued fields are joined with `,` inside one
/// field.
pub fn topics_to_csv(topics: &[Topic]) -> String {
    let mut out = String::new();
    out.push_str(&CSV_COLUMNS.join(","));
    out.push('\n');

    for topic in topics {
        let fields: Vec<String> = row(topic).iter().map(|f| quote(f)).collect();
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}

/// Pretty-printed JSON of the full snapshot, readable by the importer.
pub fn snapshot_to_json(snapshot: &Snapshot) -> Result<String> {
    Ok(serde_json::to_string_pretty(snapshot)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIds;
    use crate::import::parse_snapshot_str;
    use crate::models::{Cadence, TeamDraft, TopicDraft};
    use chrono::NaiveDate;

    fn sample() -> Topic {
        let mut ids = SequentialIds::default();
        TopicDraft {
            description: Some("Needs the \"final\" numbers".into()),
            area_ids: ["AR-2".to_string(), "AR-1".to_string()].into(),
            tags: ["kpi".to_string(), "board".to_string()].into(),
            cadence: Some(Cadence::Monthly),
            ..TopicDraft::new("T-1", "Board pack")
        }
        .build(&mut ids, NaiveDate::from_ymd_opt(2025, 1, 31).unwrap())
    }

    #[test]
    fn test_csv_header_and_escaping() {
        let csv = topics_to_csv(&[sample()]);
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("id,teamId,title,description,areaIds,"));
        assert!(lines[0].ends_with(",lastRequestDate,nextRequestDate"));
        assert_eq!(lines[0].split(',').count(), 15);
        assert!(lines[1].contains("\"Needs the \"\"final\"\" numbers\""));
        assert!(lines[1].contains("\"AR-1,AR-2\""));
        assert!(lines[1].contains("\"board,kpi\""));
        assert!(lines[1].contains("\"monthly\",\"2025-01-31\",\"fixed-date\",\"\""));
        assert!(lines[1].ends_with("\"\",\"2025-02-28\""));
    }

    #[test]
    fn test_empty_topic_list_is_header_only() {
        assert_eq!(topics_to_csv(&[]).lines().count(), 1);
    }

    #[test]
    fn test_json_export_reimports() {
        let mut ids = SequentialIds::default();
        let snapshot = Snapshot {
            teams: vec![TeamDraft::new("Controlling", "").build(&mut ids)],
            topics: vec![sample()],
            ..Snapshot::default()
        };
        let json = snapshot_to_json(&snapshot).unwrap();
        assert!(json.contains("\n  \"teams\""));
        assert_eq!(parse_snapshot_str(&json).unwrap(), snapshot);
    }
}
