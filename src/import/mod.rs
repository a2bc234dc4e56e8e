//! Snapshot import: payload checking, id reassignment, merge and reference repair.
//!
//! Import is all-or-nothing. The current snapshot is only borrowed; callers swap in
//! [`ImportOutcome::snapshot`] once they accept the report.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::errors::{PlannerError, Result, SchemaIssue};
use crate::ids::{IdGenerator, IdKind};
use crate::models::Snapshot;

const COLLECTIONS: [&str; 4] = ["teams", "areas", "topics", "logs"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Incoming snapshot replaces the current one.
    #[default]
    Replace,
    /// Union by id; incoming records win on collision.
    Merge,
}

impl std::str::FromStr for ImportMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "replace" => Ok(ImportMode::Replace),
            "merge" => Ok(ImportMode::Merge),
            other => Err(format!("unknown import mode '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportOptions {
    pub mode: ImportMode,
    /// Give every incoming record a fresh id before combining.
    pub reassign_ids: bool,
    /// Fail on unresolved references instead of repairing them.
    pub strict: bool,
}

/// What the import changed, including records dropped to keep references intact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub mode: ImportMode,
    pub reassigned_ids: bool,
    pub teams: usize,
    pub areas: usize,
    pub topics: usize,
    pub logs: usize,
    /// Logs whose topic or area did not resolve
    pub dropped_logs: usize,
    /// Topics whose team did not resolve
    pub dropped_topics: usize,
    /// Area ids removed from topics because the area did not resolve
    pub stripped_area_refs: usize,
}

impl ImportReport {
    pub fn has_drops(&self) -> bool {
        self.dropped_logs > 0 || self.dropped_topics > 0 || self.stripped_area_refs > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOutcome {
    pub snapshot: Snapshot,
    pub report: ImportReport,
}

fn parse_collection<T: DeserializeOwned>(
    root: &serde_json::Map<String, Value>,
    name: &str,
    issues: &mut Vec<SchemaIssue>,
) -> Vec<T> {
    let items = match root.get(name) {
        None => {
            issues.push(SchemaIssue {
                path: name.to_string(),
                message: "missing collection".to_string(),
            });
            return Vec::new();
        }
        Some(Value::Array(items)) => items,
        Some(_) => {
            issues.push(SchemaIssue {
                path: name.to_string(),
                message: "must be an array".to_string(),
            });
            return Vec::new();
        }
    };

    let mut parsed = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        match T::deserialize(item) {
            Ok(record) => parsed.push(record),
            Err(e) => issues.push(SchemaIssue {
                path: format!("{}[{}]", name, index),
                message: e.to_string(),
            }),
        }
    }
    parsed
}

fn duplicate_ids<'a>(
    name: &str,
    ids: impl Iterator<Item = &'a str>,
    issues: &mut Vec<SchemaIssue>,
) {
    let mut seen = HashSet::new();
    for (index, id) in ids.enumerate() {
        if !seen.insert(id) {
            issues.push(SchemaIssue {
                path: format!("{}[{}].id", name, index),
                message: format!("duplicate id '{}'", id),
            });
        }
    }
}

/// Problems that make `snapshot` unusable as an import payload.
pub fn snapshot_issues(snapshot: &Snapshot) -> Vec<SchemaIssue> {
    let mut issues = Vec::new();
    duplicate_ids("teams", snapshot.teams.iter().map(|t| t.id.as_str()), &mut issues);
    duplicate_ids("areas", snapshot.areas.iter().map(|a| a.id.as_str()), &mut issues);
    duplicate_ids("topics", snapshot.topics.iter().map(|t| t.id.as_str()), &mut issues);
    duplicate_ids("logs", snapshot.logs.iter().map(|l| l.id.as_str()), &mut issues);
    issues
}

/// Check a raw JSON payload and turn it into a [`Snapshot`].
///
/// Every problem is collected before failing: missing or non-array collections,
/// records that do not deserialize, duplicate ids.
pub fn parse_snapshot(value: Value) -> Result<Snapshot> {
    let Value::Object(root) = value else {
        return Err(PlannerError::schema(
            "$",
            format!("expected an object with {}", COLLECTIONS.join(", ")),
        ));
    };

    let mut issues = Vec::new();
    let snapshot = Snapshot {
        teams: parse_collection(&root, "teams", &mut issues),
        areas: parse_collection(&root, "areas", &mut issues),
        topics: parse_collection(&root, "topics", &mut issues),
        logs: parse_collection(&root, "logs", &mut issues),
    };
    if issues.is_empty() {
        issues = snapshot_issues(&snapshot);
    }

    if !issues.is_empty() {
        return Err(PlannerError::Schema { issues });
    }
    Ok(snapshot)
}

/// Parse a JSON document into a checked [`Snapshot`].
pub fn parse_snapshot_str(raw: &str) -> Result<Snapshot> {
    let value: Value = serde_json::from_str(raw)?;
    parse_snapshot(value)
}

/// Union of two collections keyed by `id`. Existing order is kept, replaced
/// entries stay in place, new entries are appended in incoming order.
pub fn merge_by_id<T: Clone>(existing: &[T], incoming: Vec<T>, id: impl Fn(&T) -> &str) -> Vec<T> {
    let mut merged: Vec<T> = existing.to_vec();
    let mut index: HashMap<String, usize> = merged
        .iter()
        .enumerate()
        .map(|(i, item)| (id(item).to_string(), i))
        .collect();

    for item in incoming {
        let key = id(&item).to_string();
        match index.get(&key) {
            Some(&pos) => merged[pos] = item,
            None => {
                index.insert(key, merged.len());
                merged.push(item);
            }
        }
    }
    merged
}

/// Fresh ids for every record, with all cross-references rewritten.
///
/// References to records outside `snapshot` keep their id, so they can still
/// resolve against the current snapshot in merge mode.
fn reassign_ids(mut snapshot: Snapshot, ids: &mut impl IdGenerator) -> Snapshot {
    let mut teams = HashMap::new();
    for team in &mut snapshot.teams {
        let fresh = ids.next_id(IdKind::Team);
        teams.insert(std::mem::replace(&mut team.id, fresh.clone()), fresh);
    }
    let mut areas = HashMap::new();
    for area in &mut snapshot.areas {
        let fresh = ids.next_id(IdKind::Area);
        areas.insert(std::mem::replace(&mut area.id, fresh.clone()), fresh);
    }
    let mut topics = HashMap::new();
    for topic in &mut snapshot.topics {
        let fresh = ids.next_id(IdKind::Topic);
        topics.insert(std::mem::replace(&mut topic.id, fresh.clone()), fresh);

        if let Some(team_id) = teams.get(&topic.team_id) {
            topic.team_id = team_id.clone();
        }
        topic.area_ids = topic
            .area_ids
            .iter()
            .map(|id| areas.get(id).unwrap_or(id).clone())
            .collect();
    }
    for log in &mut snapshot.logs {
        log.id = ids.next_id(IdKind::Log);
        if let Some(topic_id) = topics.get(&log.topic_id) {
            log.topic_id = topic_id.clone();
        }
        if let Some(area_id) = areas.get(&log.to_area_id) {
            log.to_area_id = area_id.clone();
        }
    }
    snapshot
}

/// Drop or strip everything that points at a missing record.
fn repair_references(snapshot: &mut Snapshot, report: &mut ImportReport) {
    let team_ids: HashSet<&str> = snapshot.teams.iter().map(|t| t.id.as_str()).collect();
    let area_ids: HashSet<String> = snapshot.areas.iter().map(|a| a.id.clone()).collect();

    let before = snapshot.topics.len();
    snapshot.topics.retain(|topic| {
        let keep = team_ids.contains(topic.team_id.as_str());
        if !keep {
            warn!(topic_id = %topic.id, team_id = %topic.team_id, "dropping topic with unresolved team");
        }
        keep
    });
    report.dropped_topics = before - snapshot.topics.len();

    for topic in &mut snapshot.topics {
        let unresolved: BTreeSet<String> = topic
            .area_ids
            .iter()
            .filter(|id| !area_ids.contains(*id))
            .cloned()
            .collect();
        for id in &unresolved {
            warn!(topic_id = %topic.id, area_id = %id, "stripping unresolved area reference");
            topic.area_ids.remove(id);
        }
        report.stripped_area_refs += unresolved.len();
    }

    let topic_ids: HashSet<&str> = snapshot.topics.iter().map(|t| t.id.as_str()).collect();
    let before = snapshot.logs.len();
    snapshot.logs.retain(|log| {
        let keep = topic_ids.contains(log.topic_id.as_str()) && area_ids.contains(&log.to_area_id);
        if !keep {
            warn!(log_id = %log.id, topic_id = %log.topic_id, area_id = %log.to_area_id,
                "dropping log with unresolved reference");
        }
        keep
    });
    report.dropped_logs = before - snapshot.logs.len();
}

/// Combine `incoming` with `current` according to `options`.
///
/// Fails with [`PlannerError::Schema`] when `incoming` repeats an id within a
/// collection. Unresolved references are repaired and the report counts every
/// record that was dropped or stripped; with `strict` set they fail the import
/// with [`PlannerError::Reference`] instead. Next request dates are recomputed
/// from each topic's schedule, so a stale stored date never survives an import.
pub fn resolve_import(
    current: &Snapshot,
    incoming: Snapshot,
    options: &ImportOptions,
    ids: &mut impl IdGenerator,
) -> Result<ImportOutcome> {
    let issues = snapshot_issues(&incoming);
    if !issues.is_empty() {
        return Err(PlannerError::Schema { issues });
    }

    let incoming = if options.reassign_ids {
        reassign_ids(incoming, ids)
    } else {
        incoming
    };

    let mut snapshot = match options.mode {
        ImportMode::Replace => incoming,
        ImportMode::Merge => Snapshot {
            teams: merge_by_id(&current.teams, incoming.teams, |t| t.id.as_str()),
            areas: merge_by_id(&current.areas, incoming.areas, |a| a.id.as_str()),
            topics: merge_by_id(&current.topics, incoming.topics, |t| t.id.as_str()),
            logs: merge_by_id(&current.logs, incoming.logs, |l| l.id.as_str()),
        },
    };

    let mut report = ImportReport {
        mode: options.mode,
        reassigned_ids: options.reassign_ids,
        ..ImportReport::default()
    };
    repair_references(&mut snapshot, &mut report);
    if options.strict && report.has_drops() {
        return Err(PlannerError::Reference(format!(
            "{} topic(s) with an unknown team, {} log(s) with an unknown topic or area, \
             {} unknown area reference(s)",
            report.dropped_topics, report.dropped_logs, report.stripped_area_refs
        )));
    }
    for topic in &mut snapshot.topics {
        topic.refresh_next_date();
    }
    (report.teams, report.areas, report.topics, report.logs) = snapshot.counts();

    if report.has_drops() {
        warn!(
            dropped_logs = report.dropped_logs,
            dropped_topics = report.dropped_topics,
            stripped_area_refs = report.stripped_area_refs,
            "import repaired unresolved references"
        );
    }
    info!(
        mode = ?report.mode,
        teams = report.teams,
        areas = report.areas,
        topics = report.topics,
        logs = report.logs,
        "import resolved"
    );

    Ok(ImportOutcome { snapshot, report })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIds;
    use crate::models::{Area, Cadence, Outcome, Priority, RequestLog, Status, Team, Topic};
    use chrono::NaiveDate;
    use serde_json::json;

    fn team(id: &str) -> Team {
        Team {
            id: id.into(),
            name: format!("Team {}", id),
            owner: String::new(),
        }
    }

    fn area(id: &str) -> Area {
        Area {
            id: id.into(),
            name: format!("Area {}", id),
            contact: None,
        }
    }

    fn topic(id: &str, team_id: &str, areas: &[&str]) -> Topic {
        Topic {
            id: id.into(),
            team_id: team_id.into(),
            title: format!("Topic {}", id),
            description: None,
            area_ids: areas.iter().map(|a| a.to_string()).collect(),
            cadence: Some(Cadence::Monthly),
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1),
            due_strategy: None,
            due_offset_days: None,
            expected_deliverable: String::new(),
            priority: Priority::Medium,
            status: Status::Planned,
            tags: BTreeSet::new(),
            last_request_date: None,
            next_request_date: NaiveDate::from_ymd_opt(2025, 2, 1),
        }
    }

    fn log(id: &str, topic_id: &str, area_id: &str) -> RequestLog {
        RequestLog {
            id: id.into(),
            topic_id: topic_id.into(),
            date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            sent_by: "me".into(),
            to_area_id: area_id.into(),
            notes: None,
            outcome: Outcome::Sent,
        }
    }

    fn consistent(prefix: &str) -> Snapshot {
        let t = format!("{}T", prefix);
        let a = format!("{}A", prefix);
        let p = format!("{}P", prefix);
        Snapshot {
            teams: vec![team(&t)],
            areas: vec![area(&a)],
            topics: vec![topic(&p, &t, &[&a])],
            logs: vec![log(&format!("{}L", prefix), &p, &a)],
        }
    }

    fn merge(current: &Snapshot, incoming: &Snapshot) -> Snapshot {
        let options = ImportOptions {
            mode: ImportMode::Merge,
            reassign_ids: false,
            ..ImportOptions::default()
        };
        resolve_import(current, incoming.clone(), &options, &mut SequentialIds::default())
            .unwrap()
            .snapshot
    }

    fn sorted_ids(snapshot: &Snapshot) -> Vec<Vec<String>> {
        let sort = |mut v: Vec<String>| {
            v.sort();
            v
        };
        vec![
            sort(snapshot.teams.iter().map(|t| t.id.clone()).collect()),
            sort(snapshot.areas.iter().map(|a| a.id.clone()).collect()),
            sort(snapshot.topics.iter().map(|t| t.id.clone()).collect()),
            sort(snapshot.logs.iter().map(|l| l.id.clone()).collect()),
        ]
    }

    #[test]
    fn test_parse_collects_every_issue() {
        let err = parse_snapshot(json!({
            "teams": [],
            "areas": "AR-1",
            "topics": [{"id": "TP-1"}],
        }))
        .unwrap_err();

        let PlannerError::Schema { issues } = err else {
            panic!("expected schema error");
        };
        let paths: Vec<_> = issues.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, vec!["areas", "topics[0]", "logs"]);
    }

    #[test]
    fn test_parse_rejects_non_object_and_duplicates() {
        assert!(matches!(
            parse_snapshot(json!([1, 2])),
            Err(PlannerError::Schema { .. })
        ));

        let dup = json!({
            "teams": [{"id": "T1", "name": "a"}, {"id": "T1", "name": "b"}],
            "areas": [], "topics": [], "logs": []
        });
        let PlannerError::Schema { issues } = parse_snapshot(dup).unwrap_err() else {
            panic!("expected schema error");
        };
        assert_eq!(issues[0].path, "teams[1].id");
    }

    #[test]
    fn test_parse_accepts_exported_json() {
        let raw = serde_json::to_string(&consistent("x")).unwrap();
        assert_eq!(parse_snapshot_str(&raw).unwrap(), consistent("x"));
    }

    #[test]
    fn test_merge_with_itself_is_identity() {
        let s = consistent("a");
        assert_eq!(merge(&s, &s), s);
    }

    #[test]
    fn test_merge_of_disjoint_snapshots_commutes() {
        let a = consistent("a");
        let b = consistent("b");
        assert_eq!(sorted_ids(&merge(&a, &b)), sorted_ids(&merge(&b, &a)));
        assert_eq!(merge(&a, &b).counts(), (2, 2, 2, 2));
    }

    #[test]
    fn test_merge_incoming_wins_and_keeps_order() {
        let current = Snapshot {
            teams: vec![team("T1"), team("T2")],
            ..Snapshot::default()
        };
        let mut renamed = team("T1");
        renamed.name = "Renamed".into();
        let incoming = Snapshot {
            teams: vec![team("T3"), renamed],
            ..Snapshot::default()
        };

        let merged = merge(&current, &incoming);
        let ids: Vec<_> = merged.teams.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["T1", "T2", "T3"]);
        assert_eq!(merged.teams[0].name, "Renamed");
    }

    #[test]
    fn test_replace_returns_incoming() {
        let outcome = resolve_import(
            &consistent("a"),
            consistent("b"),
            &ImportOptions::default(),
            &mut SequentialIds::default(),
        )
        .unwrap();
        assert_eq!(outcome.snapshot, consistent("b"));
        assert!(!outcome.report.has_drops());
        assert_eq!(outcome.report.topics, 1);
    }

    #[test]
    fn test_reassign_rewrites_every_reference() {
        let current = consistent("a");
        let options = ImportOptions {
            mode: ImportMode::Merge,
            reassign_ids: true,
            ..ImportOptions::default()
        };
        let mut ids = SequentialIds::starting_after(100);
        // same ids as current: without reassignment this would overwrite
        let outcome = resolve_import(&current, consistent("a"), &options, &mut ids).unwrap();
        let s = outcome.snapshot;

        assert_eq!(s.counts(), (2, 2, 2, 2));
        let imported = s.topic("TP-101").unwrap();
        assert_eq!(imported.team_id, "T-101");
        assert!(imported.in_area("AR-101"));
        let log = s.log("LG-101").unwrap();
        assert_eq!(log.topic_id, "TP-101");
        assert_eq!(log.to_area_id, "AR-101");
        assert!(!outcome.report.has_drops());
    }

    #[test]
    fn test_reassign_keeps_refs_to_current_records() {
        let current = consistent("a");
        // topic in the payload points at a team that only exists in current
        let incoming = Snapshot {
            topics: vec![topic("P9", "aT", &["aA"])],
            ..Snapshot::default()
        };
        let options = ImportOptions {
            mode: ImportMode::Merge,
            reassign_ids: true,
            ..ImportOptions::default()
        };
        let outcome =
            resolve_import(&current, incoming, &options, &mut SequentialIds::default()).unwrap();
        let t = outcome.snapshot.topic("TP-1").unwrap();
        assert_eq!(t.team_id, "aT");
        assert!(t.in_area("aA"));
    }

    #[test]
    fn test_unresolved_references_are_dropped_and_counted() {
        let incoming = Snapshot {
            teams: vec![team("T1")],
            areas: vec![area("A1")],
            topics: vec![
                topic("P1", "T1", &["A1", "A404"]),
                topic("P2", "T404", &["A1"]),
            ],
            logs: vec![
                log("L1", "P1", "A1"),
                log("L2", "P2", "A1"),
                log("L3", "P1", "A404"),
                log("L4", "P404", "A1"),
            ],
        };

        let outcome = resolve_import(
            &Snapshot::default(),
            incoming,
            &ImportOptions::default(),
            &mut SequentialIds::default(),
        )
        .unwrap();

        let report = &outcome.report;
        assert_eq!(report.dropped_topics, 1);
        assert_eq!(report.stripped_area_refs, 1);
        assert_eq!(report.dropped_logs, 3);
        assert_eq!(outcome.snapshot.topics.len(), 1);
        assert_eq!(
            outcome.snapshot.topics[0].area_ids,
            BTreeSet::from(["A1".to_string()])
        );
        assert_eq!(outcome.snapshot.logs.len(), 1);
    }

    #[test]
    fn test_strict_import_rejects_unresolved_references() {
        let incoming = Snapshot {
            teams: vec![team("T1")],
            areas: vec![area("A1")],
            topics: vec![topic("P1", "T1", &["A1", "A404"])],
            logs: vec![log("L1", "P1", "A1")],
        };
        let strict = ImportOptions {
            strict: true,
            ..ImportOptions::default()
        };

        let err = resolve_import(
            &Snapshot::default(),
            incoming.clone(),
            &strict,
            &mut SequentialIds::default(),
        )
        .unwrap_err();
        assert_eq!(err.error_code(), crate::errors::codes::REFERENCE_ERROR);
        assert!(err.to_string().contains("1 unknown area reference(s)"));

        let mut clean = incoming;
        clean.topics[0].area_ids.remove("A404");
        let outcome =
            resolve_import(&Snapshot::default(), clean.clone(), &strict, &mut SequentialIds::default())
                .unwrap();
        assert_eq!(outcome.snapshot, clean);
    }

    #[test]
    fn test_duplicate_ids_fail_without_touching_current() {
        let current = consistent("a");
        let incoming = Snapshot {
            areas: vec![area("A1"), area("A1")],
            ..Snapshot::default()
        };
        let err = resolve_import(
            &current,
            incoming,
            &ImportOptions::default(),
            &mut SequentialIds::default(),
        )
        .unwrap_err();
        assert_eq!(err.error_code(), crate::errors::codes::SCHEMA_ERROR);
        assert_eq!(current, consistent("a"));
    }

    #[test]
    fn test_mode_parses() {
        assert_eq!("merge".parse::<ImportMode>().unwrap(), ImportMode::Merge);
        assert_eq!(" Replace ".parse::<ImportMode>().unwrap(), ImportMode::Replace);
        assert!("append".parse::<ImportMode>().is_err());
    }
}
