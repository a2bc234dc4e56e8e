//! Entity store: a pure transition function over [`Snapshot`] values.
//!
//! `apply` never fails. Actions are expected to have passed
//! [`crate::validation::validate_action`]; anything still malformed (an update for
//! an unknown id, a log for a missing topic) is a no-op.
//!
//! Deletions cascade so that no reference is left dangling:
//! - team: its topics, and every log of those topics
//! - area: stripped from every topic's `area_ids`, logs sent to it removed
//! - topic: its logs
//!
//! Bulk topic patches do not recompute dates. A caller that changes cadence or
//! start date in bulk must follow with [`Action::RecalcDates`], or use
//! [`bulk_update_and_recalc`] which does both in one transition.

mod history;

pub use history::{History, DEFAULT_UNDO_DEPTH};

use std::collections::BTreeSet;

use tracing::debug;

use crate::models::{Area, RequestLog, Snapshot, Team, Topic, TopicPatch};

/// An intent against the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    AddTeam(Team),
    UpdateTeam(Team),
    DeleteTeam { id: String },
    AddArea(Area),
    UpdateArea(Area),
    DeleteArea { id: String },
    AddTopic(Topic),
    UpdateTopic(Topic),
    DeleteTopic { id: String },
    /// Append a log and advance its topic's dates in the same transition.
    AddLog(RequestLog),
    /// Replace a log. Topic dates are left alone.
    UpdateLog(RequestLog),
    /// Remove a log. Topic dates are left alone.
    DeleteLog { id: String },
    BulkUpdateTopics { ids: BTreeSet<String>, patch: TopicPatch },
    BulkDeleteTopics { ids: BTreeSet<String> },
    RecalcDates,
    LoadState(Snapshot),
    Reset,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::AddTeam(_) => "add_team",
            Action::UpdateTeam(_) => "update_team",
            Action::DeleteTeam { .. } => "delete_team",
            Action::AddArea(_) => "add_area",
            Action::UpdateArea(_) => "update_area",
            Action::DeleteArea { .. } => "delete_area",
            Action::AddTopic(_) => "add_topic",
            Action::UpdateTopic(_) => "update_topic",
            Action::DeleteTopic { .. } => "delete_topic",
            Action::AddLog(_) => "add_log",
            Action::UpdateLog(_) => "update_log",
            Action::DeleteLog { .. } => "delete_log",
            Action::BulkUpdateTopics { .. } => "bulk_update_topics",
            Action::BulkDeleteTopics { .. } => "bulk_delete_topics",
            Action::RecalcDates => "recalc_dates",
            Action::LoadState(_) => "load_state",
            Action::Reset => "reset",
        }
    }

    /// True for actions that replace the snapshot wholesale.
    pub fn replaces_snapshot(&self) -> bool {
        matches!(self, Action::LoadState(_) | Action::Reset)
    }
}

/// Apply one action, returning the next snapshot. `snapshot` is not modified.
pub fn apply(snapshot: &Snapshot, action: Action) -> Snapshot {
    debug!(action = action.name(), "applying action");

    match action {
        Action::LoadState(loaded) => loaded,
        Action::Reset => Snapshot::default(),
        edit => {
            let mut next = snapshot.clone();
            apply_edit(&mut next, edit);
            next
        }
    }
}

fn apply_edit(next: &mut Snapshot, action: Action) {
    match action {
        Action::AddTeam(team) => upsert(&mut next.teams, team, |t| &t.id),
        Action::UpdateTeam(team) => replace(&mut next.teams, team, |t| &t.id),
        Action::DeleteTeam { id } => delete_team(next, &id),

        Action::AddArea(area) => upsert(&mut next.areas, area, |a| &a.id),
        Action::UpdateArea(area) => replace(&mut next.areas, area, |a| &a.id),
        Action::DeleteArea { id } => delete_area(next, &id),

        Action::AddTopic(mut topic) => {
            topic.refresh_next_date();
            upsert(&mut next.topics, topic, |t| &t.id);
        }
        Action::UpdateTopic(mut topic) => {
            topic.refresh_next_date();
            replace(&mut next.topics, topic, |t| &t.id);
        }
        Action::DeleteTopic { id } => delete_topics(next, &BTreeSet::from([id])),

        Action::AddLog(log) => add_log(next, log),
        Action::UpdateLog(log) => replace(&mut next.logs, log, |l| &l.id),
        Action::DeleteLog { id } => next.logs.retain(|l| l.id != id),

        Action::BulkUpdateTopics { ids, patch } => {
            for topic in next.topics.iter_mut().filter(|t| ids.contains(&t.id)) {
                patch.apply_to(topic);
            }
        }
        Action::BulkDeleteTopics { ids } => delete_topics(next, &ids),

        Action::RecalcDates => recalc_dates(next),

        // whole-snapshot replacements are resolved by `apply`
        Action::LoadState(_) | Action::Reset => {}
    }
}

/// Apply a sequence of actions in order.
pub fn apply_all(snapshot: &Snapshot, actions: impl IntoIterator<Item = Action>) -> Snapshot {
    actions
        .into_iter()
        .fold(snapshot.clone(), |acc, action| apply(&acc, action))
}

/// Patch the given topics and recompute every topic's dates as one transition.
pub fn bulk_update_and_recalc(
    snapshot: &Snapshot,
    ids: BTreeSet<String>,
    patch: TopicPatch,
) -> Snapshot {
    let patched = apply(snapshot, Action::BulkUpdateTopics { ids, patch });
    apply(&patched, Action::RecalcDates)
}

fn upsert<T>(items: &mut Vec<T>, item: T, id: impl Fn(&T) -> &String) {
    match items.iter().position(|x| id(x) == id(&item)) {
        Some(pos) => items[pos] = item,
        None => items.push(item),
    }
}

fn replace<T>(items: &mut Vec<T>, item: T, id: impl Fn(&T) -> &String) {
    if let Some(slot) = items.iter_mut().find(|x| id(x) == id(&item)) {
        *slot = item;
    }
}

fn delete_team(snapshot: &mut Snapshot, team_id: &str) {
    snapshot.teams.retain(|t| t.id != team_id);
    let owned: BTreeSet<String> = snapshot
        .topics
        .iter()
        .filter(|t| t.team_id == team_id)
        .map(|t| t.id.clone())
        .collect();
    delete_topics(snapshot, &owned);
}

fn delete_area(snapshot: &mut Snapshot, area_id: &str) {
    snapshot.areas.retain(|a| a.id != area_id);
    for topic in &mut snapshot.topics {
        topic.area_ids.remove(area_id);
    }
    snapshot.logs.retain(|l| l.to_area_id != area_id);
}

fn delete_topics(snapshot: &mut Snapshot, ids: &BTreeSet<String>) {
    if ids.is_empty() {
        return;
    }
    snapshot.topics.retain(|t| !ids.contains(&t.id));
    snapshot.logs.retain(|l| !ids.contains(&l.topic_id));
}

fn add_log(snapshot: &mut Snapshot, log: RequestLog) {
    let Some(topic) = snapshot.topics.iter_mut().find(|t| t.id == log.topic_id) else {
        debug!(log_id = %log.id, topic_id = %log.topic_id, "log for unknown topic ignored");
        return;
    };
    if !snapshot.areas.iter().any(|a| a.id == log.to_area_id) {
        debug!(log_id = %log.id, area_id = %log.to_area_id, "log for unknown area ignored");
        return;
    }
    topic.record_request(log.date);
    upsert(&mut snapshot.logs, log, |l| &l.id);
}

fn recalc_dates(snapshot: &mut Snapshot) {
    for topic in &mut snapshot.topics {
        topic.refresh_next_date();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Cadence, Outcome, Priority, Status};
    use crate::schedule::{cadence_next_date, parse_date};
    use chrono::NaiveDate;

    fn d(raw: &str) -> NaiveDate {
        parse_date(raw).unwrap()
    }

    fn team(id: &str) -> Team {
        Team {
            id: id.to_string(),
            name: format!("Team {}", id),
            owner: "owner@org".to_string(),
        }
    }

    fn area(id: &str) -> Area {
        Area {
            id: id.to_string(),
            name: format!("Area {}", id),
            contact: None,
        }
    }

    fn topic(id: &str, team_id: &str, areas: &[&str]) -> Topic {
        Topic {
            id: id.to_string(),
            team_id: team_id.to_string(),
            title: format!("Topic {}", id),
            description: None,
            area_ids: areas.iter().map(|a| a.to_string()).collect(),
            cadence: Some(Cadence::Monthly),
            start_date: Some(d("2025-01-01")),
            due_strategy: None,
            due_offset_days: None,
            expected_deliverable: "Report".to_string(),
            priority: Priority::Medium,
            status: Status::Active,
            tags: BTreeSet::new(),
            last_request_date: None,
            next_request_date: Some(d("2025-02-01")),
        }
    }

    fn log(id: &str, topic_id: &str, area_id: &str, date: &str) -> RequestLog {
        RequestLog {
            id: id.to_string(),
            topic_id: topic_id.to_string(),
            date: d(date),
            sent_by: "owner".to_string(),
            to_area_id: area_id.to_string(),
            notes: None,
            outcome: Outcome::Sent,
        }
    }

    fn seeded() -> Snapshot {
        Snapshot {
            teams: vec![team("T1"), team("T2")],
            areas: vec![area("A1"), area("A2")],
            topics: vec![
                topic("TA", "T1", &["A1"]),
                topic("TB", "T2", &["A1", "A2"]),
            ],
            logs: vec![
                log("L1", "TA", "A1", "2025-01-05"),
                log("L2", "TB", "A2", "2025-01-06"),
            ],
        }
    }

    #[test]
    fn test_delete_team_cascades_to_topics_and_logs() {
        let before = seeded();
        let after = apply(&before, Action::DeleteTeam { id: "T1".into() });

        assert!(after.team("T1").is_none());
        let topic_ids: Vec<_> = after.topics.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(topic_ids, vec!["TB"]);
        assert!(after.logs.iter().all(|l| l.topic_id != "TA"));
        assert_eq!(after.logs.len(), 1);
        // input untouched
        assert_eq!(before, seeded());
    }

    #[test]
    fn test_delete_area_strips_membership_and_logs() {
        let after = apply(&seeded(), Action::DeleteArea { id: "A1".into() });

        assert!(after.area("A1").is_none());
        assert!(after.topics.iter().all(|t| !t.in_area("A1")));
        assert!(after.topic("TA").unwrap().area_ids.is_empty());
        assert!(after.logs.iter().all(|l| l.to_area_id != "A1"));
        // topics survive even with no areas left
        assert_eq!(after.topics.len(), 2);
    }

    #[test]
    fn test_delete_topic_removes_its_logs() {
        let after = apply(&seeded(), Action::DeleteTopic { id: "TB".into() });
        assert!(after.topic("TB").is_none());
        assert_eq!(after.logs.len(), 1);
        assert_eq!(after.logs[0].id, "L1");
    }

    #[test]
    fn test_add_log_advances_topic_atomically() {
        let after = apply(&seeded(), Action::AddLog(log("L3", "TA", "A1", "2025-02-15")));

        let t = after.topic("TA").unwrap();
        assert_eq!(t.last_request_date, Some(d("2025-02-15")));
        assert_eq!(t.next_request_date, Some(d("2025-03-15")));
        assert_eq!(
            t.next_request_date,
            Some(cadence_next_date(d("2025-01-01"), Cadence::Monthly, Some(d("2025-02-15"))))
        );
        assert_eq!(after.logs.last().unwrap().id, "L3");
    }

    #[test]
    fn test_add_log_for_missing_topic_is_noop() {
        let before = seeded();
        let after = apply(&before, Action::AddLog(log("L9", "nope", "A1", "2025-02-15")));
        assert_eq!(after, before);
        let after = apply(&before, Action::AddLog(log("L9", "TA", "nope", "2025-02-15")));
        assert_eq!(after, before);
    }

    #[test]
    fn test_delete_log_keeps_topic_dates() {
        let logged = apply(&seeded(), Action::AddLog(log("L3", "TA", "A1", "2025-02-15")));
        let after = apply(&logged, Action::DeleteLog { id: "L3".into() });

        assert!(after.log("L3").is_none());
        let t = after.topic("TA").unwrap();
        assert_eq!(t.last_request_date, Some(d("2025-02-15")));
        assert_eq!(t.next_request_date, Some(d("2025-03-15")));
    }

    #[test]
    fn test_update_topic_rederives_next_date() {
        let mut edited = topic("TA", "T1", &["A1"]);
        edited.cadence = Some(Cadence::Weekly);
        edited.next_request_date = Some(d("1999-01-01"));

        let after = apply(&seeded(), Action::UpdateTopic(edited));
        assert_eq!(after.topic("TA").unwrap().next_request_date, Some(d("2025-01-08")));
    }

    #[test]
    fn test_update_unknown_id_is_noop() {
        let before = seeded();
        assert_eq!(apply(&before, Action::UpdateTeam(team("T9"))), before);
        assert_eq!(apply(&before, Action::UpdateArea(area("A9"))), before);
    }

    #[test]
    fn test_add_with_existing_id_replaces() {
        let mut renamed = team("T1");
        renamed.name = "Finance requests".to_string();
        let after = apply(&seeded(), Action::AddTeam(renamed));
        assert_eq!(after.teams.len(), 2);
        assert_eq!(after.team("T1").unwrap().name, "Finance requests");
    }

    #[test]
    fn test_bulk_cadence_change_needs_recalc() {
        let ids = BTreeSet::from(["TA".to_string(), "TB".to_string()]);
        let patched = apply(
            &seeded(),
            Action::BulkUpdateTopics {
                ids: ids.clone(),
                patch: TopicPatch::cadence(Cadence::Quarterly),
            },
        );
        // two-step protocol: dates are stale until RecalcDates
        assert_eq!(patched.topic("TA").unwrap().cadence, Some(Cadence::Quarterly));
        assert_eq!(patched.topic("TA").unwrap().next_request_date, Some(d("2025-02-01")));

        let recalculated = apply(&patched, Action::RecalcDates);
        assert_eq!(
            recalculated.topic("TA").unwrap().next_request_date,
            Some(d("2025-04-01"))
        );
        assert_eq!(
            bulk_update_and_recalc(&seeded(), ids, TopicPatch::cadence(Cadence::Quarterly)),
            recalculated
        );
    }

    #[test]
    fn test_bulk_update_only_touches_selected() {
        let after = apply(
            &seeded(),
            Action::BulkUpdateTopics {
                ids: BTreeSet::from(["TB".to_string()]),
                patch: TopicPatch::status(Status::Done),
            },
        );
        assert_eq!(after.topic("TA").unwrap().status, Status::Active);
        assert_eq!(after.topic("TB").unwrap().status, Status::Done);
    }

    #[test]
    fn test_bulk_delete_topics() {
        let after = apply(
            &seeded(),
            Action::BulkDeleteTopics {
                ids: BTreeSet::from(["TA".to_string(), "TB".to_string()]),
            },
        );
        assert!(after.topics.is_empty());
        assert!(after.logs.is_empty());
        assert_eq!(after.teams.len(), 2);
    }

    #[test]
    fn test_recalc_is_idempotent() {
        let mut drifted = seeded();
        drifted.topics[0].next_request_date = Some(d("2030-01-01"));
        drifted.topics[1].last_request_date = Some(d("2025-03-31"));
        drifted.topics.push(Topic {
            cadence: None,
            next_request_date: Some(d("2025-07-07")),
            ..topic("TC", "T1", &[])
        });

        let once = apply(&drifted, Action::RecalcDates);
        let twice = apply(&once, Action::RecalcDates);
        assert_eq!(once, twice);
        assert_eq!(once.topic("TA").unwrap().next_request_date, Some(d("2025-02-01")));
        assert_eq!(once.topic("TB").unwrap().next_request_date, Some(d("2025-04-30")));
        // no cadence: stored value kept
        assert_eq!(once.topic("TC").unwrap().next_request_date, Some(d("2025-07-07")));
    }

    #[test]
    fn test_load_and_reset_replace_wholesale() {
        let loaded = apply(&Snapshot::default(), Action::LoadState(seeded()));
        assert_eq!(loaded, seeded());
        assert!(apply(&loaded, Action::Reset).is_empty());
    }

    #[test]
    fn test_apply_all_folds_in_order() {
        let after = apply_all(
            &seeded(),
            [
                Action::AddLog(log("L3", "TA", "A1", "2025-02-15")),
                Action::DeleteTopic { id: "TA".into() },
            ],
        );
        assert!(after.topic("TA").is_none());
        assert!(after.log("L3").is_none());
    }
}
