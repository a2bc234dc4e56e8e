//! Cadence engine: when is a recurring topic due next.
//!
//! Month and year steps clamp to the last valid day of the target month, so
//! `Jan 31 + 1 month` is `Feb 28` (or `Feb 29` in a leap year) and
//! `Feb 29 + 1 year` is `Feb 28`. Weekly steps are exactly seven days.
//!
//! Nothing here reads the system clock; callers pass `today` in or hold a [`Clock`].

use chrono::{Days, Months, NaiveDate, Utc};

use crate::errors::{PlannerError, Result};
use crate::models::{Cadence, Topic};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Next due date of a topic that started on `start` and was last requested on `last`.
///
/// One-off topics never advance. Every other cadence steps forward from `last`
/// when present, else from `start`. Saturates at `NaiveDate::MAX`.
pub fn cadence_next_date(start: NaiveDate, cadence: Cadence, last: Option<NaiveDate>) -> NaiveDate {
    if cadence == Cadence::OneOff {
        return start;
    }
    let anchor = last.unwrap_or(start);
    step(anchor, cadence).unwrap_or(NaiveDate::MAX)
}

fn step(anchor: NaiveDate, cadence: Cadence) -> Option<NaiveDate> {
    match cadence {
        Cadence::OneOff => Some(anchor),
        Cadence::Weekly => anchor.checked_add_days(Days::new(7)),
        Cadence::Monthly => anchor.checked_add_months(Months::new(1)),
        Cadence::Quarterly => anchor.checked_add_months(Months::new(3)),
        Cadence::Yearly => anchor.checked_add_months(Months::new(12)),
    }
}

/// String form of [`cadence_next_date`] for callers holding raw `YYYY-MM-DD` text.
pub fn cadence_next_date_str(start: &str, cadence: Cadence, last: Option<&str>) -> Result<NaiveDate> {
    let start = parse_date(start)?;
    let last = last.map(parse_date).transpose()?;
    Ok(cadence_next_date(start, cadence, last))
}

/// The date the formula assigns to `topic`, if it has both a cadence and a start.
pub fn schedule_for(topic: &Topic) -> Option<NaiveDate> {
    match (topic.start_date, topic.cadence) {
        (Some(start), Some(cadence)) => {
            Some(cadence_next_date(start, cadence, topic.last_request_date))
        }
        _ => None,
    }
}

/// Parse a strict `YYYY-MM-DD` calendar date.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| PlannerError::InvalidDate(raw.to_string()))
}

/// `date + days`, saturating at the calendar bounds.
pub fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    if days >= 0 {
        date.checked_add_days(Days::new(days.unsigned_abs()))
            .unwrap_or(NaiveDate::MAX)
    } else {
        date.checked_sub_days(Days::new(days.unsigned_abs()))
            .unwrap_or(NaiveDate::MIN)
    }
}

pub fn is_overdue(date: NaiveDate, today: NaiveDate) -> bool {
    date < today
}

pub fn is_due_today(date: NaiveDate, today: NaiveDate) -> bool {
    date == today
}

/// Signed number of days from `today` to `date` (negative when overdue).
pub fn days_until(date: NaiveDate, today: NaiveDate) -> i64 {
    (date - today).num_days()
}

/// Source of the current date.
pub trait Clock {
    fn today(&self) -> NaiveDate;
}

/// Wall clock, UTC calendar date.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// A clock pinned to one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
