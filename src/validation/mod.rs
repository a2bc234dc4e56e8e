//! Validation run before an action reaches the reducer.
//!
//! A failed check leaves the snapshot untouched; the caller surfaces the message.

use std::collections::BTreeSet;

use crate::errors::{PlannerError, Result};
use crate::models::{Area, DueStrategy, RequestLog, Snapshot, Team, Topic, TopicPatch};
use crate::store::Action;

pub const MIN_TITLE_LEN: usize = 3;

fn invalid(message: impl Into<String>) -> PlannerError {
    PlannerError::Validation(message.into())
}

fn require_id(id: &str, what: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(invalid(format!("{} id is required", what)));
    }
    Ok(())
}

fn same_name(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// Team name must be non-empty and unique (case-insensitive) among other teams.
pub fn validate_team(snapshot: &Snapshot, team: &Team) -> Result<()> {
    require_id(&team.id, "Team")?;
    if team.name.trim().is_empty() {
        return Err(invalid("Team name is required"));
    }
    let duplicate = snapshot
        .teams
        .iter()
        .any(|t| t.id != team.id && same_name(&t.name, &team.name));
    if duplicate {
        return Err(invalid(format!("Team '{}' already exists", team.name.trim())));
    }
    Ok(())
}

/// Area name must be non-empty and unique (case-insensitive) among other areas.
pub fn validate_area(snapshot: &Snapshot, area: &Area) -> Result<()> {
    require_id(&area.id, "Area")?;
    if area.name.trim().is_empty() {
        return Err(invalid("Area name is required"));
    }
    let duplicate = snapshot
        .areas
        .iter()
        .any(|a| a.id != area.id && same_name(&a.name, &area.name));
    if duplicate {
        return Err(invalid(format!("Area '{}' already exists", area.name.trim())));
    }
    Ok(())
}

fn validate_title(snapshot: &Snapshot, title: &str, except: &BTreeSet<&str>) -> Result<()> {
    if title.trim().chars().count() < MIN_TITLE_LEN {
        return Err(invalid(format!(
            "Title too short (min. {} characters)",
            MIN_TITLE_LEN
        )));
    }
    let duplicate = snapshot
        .topics
        .iter()
        .any(|t| !except.contains(t.id.as_str()) && same_name(&t.title, title));
    if duplicate {
        return Err(invalid(format!(
            "A topic titled '{}' already exists",
            title.trim()
        )));
    }
    Ok(())
}

fn validate_areas_exist<'a>(
    snapshot: &Snapshot,
    area_ids: impl IntoIterator<Item = &'a String>,
) -> Result<()> {
    for id in area_ids {
        if snapshot.area(id).is_none() {
            return Err(invalid(format!("Area {} does not exist", id)));
        }
    }
    Ok(())
}

fn validate_due_strategy(strategy: Option<DueStrategy>, offset: Option<i32>) -> Result<()> {
    match (strategy, offset) {
        (Some(DueStrategy::Relative), None) => {
            Err(invalid("A relative due strategy requires dueOffsetDays"))
        }
        (Some(DueStrategy::Relative), Some(days)) if days < 0 => {
            Err(invalid("dueOffsetDays must not be negative"))
        }
        (Some(DueStrategy::FixedDate) | None, Some(_)) => Err(invalid(
            "dueOffsetDays is only allowed with a relative due strategy",
        )),
        _ => Ok(()),
    }
}

/// Checks a topic about to be added or saved over the topic with the same id.
pub fn validate_topic(snapshot: &Snapshot, topic: &Topic) -> Result<()> {
    require_id(&topic.id, "Topic")?;
    validate_title(snapshot, &topic.title, &BTreeSet::from([topic.id.as_str()]))?;
    if topic.team_id.trim().is_empty() {
        return Err(invalid("Please choose a team"));
    }
    if snapshot.team(&topic.team_id).is_none() {
        return Err(invalid(format!("Team {} does not exist", topic.team_id)));
    }
    validate_areas_exist(snapshot, &topic.area_ids)?;
    validate_due_strategy(topic.due_strategy, topic.due_offset_days)
}

/// A log must point at an existing topic and area and name a sender.
pub fn validate_log(snapshot: &Snapshot, log: &RequestLog) -> Result<()> {
    require_id(&log.id, "Log")?;
    if log.topic_id.trim().is_empty() || log.to_area_id.trim().is_empty() {
        return Err(invalid("Please choose a topic and an area"));
    }
    if snapshot.topic(&log.topic_id).is_none() {
        return Err(invalid(format!("Topic {} does not exist", log.topic_id)));
    }
    if snapshot.area(&log.to_area_id).is_none() {
        return Err(invalid(format!("Area {} does not exist", log.to_area_id)));
    }
    if log.sent_by.trim().is_empty() {
        return Err(invalid("Sender is required"));
    }
    Ok(())
}

/// A bulk patch must target existing topics and keep every patched topic valid.
pub fn validate_patch(snapshot: &Snapshot, ids: &BTreeSet<String>, patch: &TopicPatch) -> Result<()> {
    if ids.is_empty() {
        return Err(invalid("No topics selected"));
    }
    for id in ids {
        if snapshot.topic(id).is_none() {
            return Err(PlannerError::NotFound(format!("Topic {} not found", id)));
        }
    }
    if let Some(title) = &patch.title {
        if ids.len() > 1 {
            return Err(invalid("A title cannot be set on several topics at once"));
        }
        let except = ids.iter().map(String::as_str).collect();
        validate_title(snapshot, title, &except)?;
    }
    if let Some(team_id) = &patch.team_id {
        if snapshot.team(team_id).is_none() {
            return Err(invalid(format!("Team {} does not exist", team_id)));
        }
    }
    if let Some(area_ids) = &patch.area_ids {
        validate_areas_exist(snapshot, area_ids)?;
    }
    if patch.due_strategy.is_some() || patch.due_offset_days.is_some() {
        for id in ids {
            if let Some(topic) = snapshot.topic(id) {
                validate_due_strategy(
                    patch.due_strategy.or(topic.due_strategy),
                    patch.due_offset_for(topic.due_offset_days),
                )?;
            }
        }
    }
    Ok(())
}

fn require_existing(found: bool, what: &str, id: &str) -> Result<()> {
    require_id(id, what)?;
    if !found {
        return Err(PlannerError::NotFound(format!("{} {} not found", what, id)));
    }
    Ok(())
}

/// Structural and referential checks for any action.
pub fn validate_action(snapshot: &Snapshot, action: &Action) -> Result<()> {
    match action {
        Action::AddTeam(team) => validate_team(snapshot, team),
        Action::UpdateTeam(team) => {
            require_existing(snapshot.team(&team.id).is_some(), "Team", &team.id)?;
            validate_team(snapshot, team)
        }
        Action::DeleteTeam { id } => require_existing(snapshot.team(id).is_some(), "Team", id),

        Action::AddArea(area) => validate_area(snapshot, area),
        Action::UpdateArea(area) => {
            require_existing(snapshot.area(&area.id).is_some(), "Area", &area.id)?;
            validate_area(snapshot, area)
        }
        Action::DeleteArea { id } => require_existing(snapshot.area(id).is_some(), "Area", id),

        Action::AddTopic(topic) => validate_topic(snapshot, topic),
        Action::UpdateTopic(topic) => {
            require_existing(snapshot.topic(&topic.id).is_some(), "Topic", &topic.id)?;
            validate_topic(snapshot, topic)
        }
        Action::DeleteTopic { id } => require_existing(snapshot.topic(id).is_some(), "Topic", id),

        Action::AddLog(log) => validate_log(snapshot, log),
        Action::UpdateLog(log) => {
            require_existing(snapshot.log(&log.id).is_some(), "Log", &log.id)?;
            validate_log(snapshot, log)
        }
        Action::DeleteLog { id } => require_existing(snapshot.log(id).is_some(), "Log", id),

        Action::BulkUpdateTopics { ids, patch } => validate_patch(snapshot, ids, patch),
        Action::BulkDeleteTopics { ids } => {
            if ids.is_empty() {
                return Err(invalid("No topics selected"));
            }
            Ok(())
        }

        Action::RecalcDates | Action::LoadState(_) | Action::Reset => Ok(()),
    }
}

/// Validate, then apply. The snapshot is returned unchanged on error.
pub fn checked_apply(snapshot: &Snapshot, action: Action) -> Result<Snapshot> {
    validate_action(snapshot, &action)?;
    Ok(crate::store::apply(snapshot, action))
}

/// Areas of `topic` that have no contact recorded.
pub fn missing_contacts<'a>(snapshot: &'a Snapshot, topic: &Topic) -> Vec<&'a Area> {
    snapshot
        .areas
        .iter()
        .filter(|a| topic.in_area(&a.id) && a.missing_contact())
        .collect()
}
