//! Read-side views over a snapshot: filtering, KPIs, the team × area matrix and
//! report aggregates.
//!
//! Every function is pure. "Today" is always a parameter.

use std::collections::BTreeMap;

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::errors::{PlannerError, Result};
use crate::models::{Area, Cadence, Priority, RequestLog, Status, Team, Topic};
use crate::schedule::add_days;

/// Conjunctive topic filter. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSpec {
    #[serde(default)]
    pub team_id: Option<String>,
    /// Area membership
    #[serde(default)]
    pub area_id: Option<String>,
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default)]
    pub cadence: Option<Cadence>,
    #[serde(default)]
    pub priority: Option<Priority>,
    /// Tag membership, case-insensitive
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub due_from: Option<NaiveDate>,
    #[serde(default)]
    pub due_to: Option<NaiveDate>,
    /// Case-insensitive substring over title, description and tags
    #[serde(default)]
    pub text: Option<String>,
}

impl FilterSpec {
    pub fn has_date_bounds(&self) -> bool {
        self.due_from.is_some() || self.due_to.is_some()
    }

    pub fn matches(&self, topic: &Topic) -> bool {
        if let Some(team_id) = &self.team_id {
            if &topic.team_id != team_id {
                return false;
            }
        }
        if let Some(area_id) = &self.area_id {
            if !topic.in_area(area_id) {
                return false;
            }
        }
        if self.status.is_some_and(|s| s != topic.status) {
            return false;
        }
        if self.cadence.is_some() && self.cadence != topic.cadence {
            return false;
        }
        if self.priority.is_some_and(|p| p != topic.priority) {
            return false;
        }
        if let Some(tag) = &self.tag {
            if !topic.has_tag(tag) {
                return false;
            }
        }
        if self.has_date_bounds() {
            let Some(due) = topic.due_date() else {
                return false;
            };
            if self.due_from.is_some_and(|from| due < from) {
                return false;
            }
            if self.due_to.is_some_and(|to| due > to) {
                return false;
            }
        }
        match self.text.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => text_matches(topic, &text.to_lowercase()),
            _ => true,
        }
    }
}

fn text_matches(topic: &Topic, needle: &str) -> bool {
    topic.title.to_lowercase().contains(needle)
        || topic
            .description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(needle))
        || topic.tags.iter().any(|t| t.to_lowercase().contains(needle))
}

/// Topics matching `spec`, in input order.
pub fn filter_topics<'a>(topics: &'a [Topic], spec: &FilterSpec) -> Vec<&'a Topic> {
    topics.iter().filter(|t| spec.matches(t)).collect()
}

/// Headline numbers for a set of topics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Kpis {
    pub total: usize,
    pub due_in_7: usize,
    pub due_in_30: usize,
    pub overdue: usize,
    /// Topics per area id. A topic counts once for each of its areas.
    pub per_area: BTreeMap<String, usize>,
    pub per_team: BTreeMap<String, usize>,
}

/// Due windows are `[today, today + N]`, inclusive on both ends.
pub fn compute_kpis(topics: &[&Topic], today: NaiveDate) -> Kpis {
    let in_7 = add_days(today, 7);
    let in_30 = add_days(today, 30);
    let mut kpis = Kpis {
        total: topics.len(),
        ..Kpis::default()
    };

    for topic in topics {
        if let Some(due) = topic.due_date() {
            if due < today {
                kpis.overdue += 1;
            } else {
                if due <= in_7 {
                    kpis.due_in_7 += 1;
                }
                if due <= in_30 {
                    kpis.due_in_30 += 1;
                }
            }
        }
        *kpis.per_team.entry(topic.team_id.clone()).or_default() += 1;
        for area_id in &topic.area_ids {
            *kpis.per_area.entry(area_id.clone()).or_default() += 1;
        }
    }
    kpis
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrixCell {
    /// Open topics only (planned, active, blocked)
    pub count: usize,
    /// Earliest due date over all topics in the cell, done ones included
    pub next_due: Option<NaiveDate>,
}

/// Load per (team, area) pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Matrix {
    cells: BTreeMap<(String, String), MatrixCell>,
}

impl Matrix {
    pub fn get(&self, team_id: &str, area_id: &str) -> Option<&MatrixCell> {
        self.cells.get(&(team_id.to_string(), area_id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(String, String), &MatrixCell)> {
        self.cells.iter()
    }
}

/// One cell per team × area pair, empty cells included. Topics pointing at a team
/// or area outside the given lists are ignored.
pub fn build_matrix(teams: &[Team], areas: &[Area], topics: &[&Topic]) -> Matrix {
    let mut cells = BTreeMap::new();
    for team in teams {
        for area in areas {
            cells.insert((team.id.clone(), area.id.clone()), MatrixCell::default());
        }
    }

    for topic in topics {
        for area_id in &topic.area_ids {
            let Some(cell) = cells.get_mut(&(topic.team_id.clone(), area_id.clone())) else {
                continue;
            };
            if topic.status.is_open() {
                cell.count += 1;
            }
            if let Some(due) = topic.due_date() {
                cell.next_due = Some(cell.next_due.map_or(due, |current| current.min(due)));
            }
        }
    }
    Matrix { cells }
}

fn month_key(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

/// `YYYY-MM` keys for the twelve months ending with the month of `today`.
fn rolling_months(today: NaiveDate) -> BTreeMap<String, usize> {
    let first = today.with_day(1).unwrap_or(today);
    (0..12u32)
        .filter_map(|back| first.checked_sub_months(Months::new(back)))
        .map(|month| (month_key(month), 0))
        .collect()
}

fn histogram(dates: impl Iterator<Item = NaiveDate>, today: NaiveDate) -> BTreeMap<String, usize> {
    let mut months = rolling_months(today);
    for date in dates {
        if let Some(count) = months.get_mut(&month_key(date)) {
            *count += 1;
        }
    }
    months
}

/// Topic due dates per month over the rolling 12-month window ending this month.
pub fn due_per_month(topics: &[&Topic], today: NaiveDate) -> BTreeMap<String, usize> {
    histogram(topics.iter().filter_map(|t| t.due_date()), today)
}

/// Logged requests per month over the same window as [`due_per_month`].
pub fn requests_per_month(logs: &[RequestLog], today: NaiveDate) -> BTreeMap<String, usize> {
    histogram(logs.iter().map(|l| l.date), today)
}

/// Areas ranked by how many topics reference them. Ties break on name; areas
/// without topics are left out.
pub fn top_areas<'a>(topics: &[&Topic], areas: &'a [Area], limit: usize) -> Vec<(&'a Area, usize)> {
    let mut ranked: Vec<(&Area, usize)> = areas
        .iter()
        .map(|area| (area, topics.iter().filter(|t| t.in_area(&area.id)).count()))
        .filter(|(_, count)| *count > 0)
        .collect();
    ranked.sort_by(|(a, a_count), (b, b_count)| {
        b_count.cmp(a_count).then_with(|| a.name.cmp(&b.name))
    });
    ranked.truncate(limit);
    ranked
}

/// Topic count per cadence; every cadence is present.
pub fn cadence_share(topics: &[&Topic]) -> BTreeMap<Cadence, usize> {
    let mut share: BTreeMap<Cadence, usize> = Cadence::ALL.iter().map(|c| (*c, 0)).collect();
    for cadence in topics.iter().filter_map(|t| t.cadence) {
        *share.entry(cadence).or_default() += 1;
    }
    share
}

pub const CALENDAR_CELLS: usize = 42;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarDay<'a> {
    pub date: NaiveDate,
    /// False for the leading and trailing days of neighbouring months
    pub in_month: bool,
    pub topics: Vec<&'a Topic>,
}

/// Six Monday-first weeks covering `year`-`month`, with the topics due on each day.
pub fn calendar_month<'a>(topics: &[&'a Topic], year: i32, month: u32) -> Result<Vec<CalendarDay<'a>>> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| PlannerError::InvalidDate(format!("{:04}-{:02}", year, month)))?;
    let lead = i64::from(first.weekday().num_days_from_monday());
    let grid_start = add_days(first, -lead);

    let days = (0..CALENDAR_CELLS as i64)
        .map(|offset| {
            let date = add_days(grid_start, offset);
            CalendarDay {
                date,
                in_month: date.month() == month && date.year() == year,
                topics: topics
                    .iter()
                    .copied()
                    .filter(|t| t.due_date() == Some(date))
                    .collect(),
            }
        })
        .collect();
    Ok(days)
}
