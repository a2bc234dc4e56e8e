//! Demo data for an empty planner.
//!
//! Three teams, five areas (one without a contact), eleven topics covering every
//! cadence and status, and one request log per topic spread over the last weeks.
//! All dates are relative to `today`, so the demo always has due, overdue and
//! upcoming work.

use chrono::NaiveDate;

use crate::ids::IdGenerator;
use crate::models::{
    AreaDraft, Cadence, LogDraft, Outcome, Priority, Snapshot, Status, TeamDraft, TopicDraft,
};
use crate::schedule::add_days;

struct DemoTopic {
    team: usize,
    title: &'static str,
    areas: &'static [usize],
    cadence: Cadence,
    start_offset: i64,
    deliverable: &'static str,
    status: Status,
    priority: Priority,
    tags: &'static [&'static str],
}

const TOPICS: [DemoTopic; 11] = [
    DemoTopic {
        team: 0,
        title: "Monthly KPI report",
        areas: &[0],
        cadence: Cadence::Monthly,
        start_offset: -40,
        deliverable: "KPI workbook",
        status: Status::Active,
        priority: Priority::Medium,
        tags: &["report", "kpi"],
    },
    DemoTopic {
        team: 0,
        title: "Year-end closing data",
        areas: &[0, 2],
        cadence: Cadence::Yearly,
        start_offset: -300,
        deliverable: "Closing package",
        status: Status::Planned,
        priority: Priority::High,
        tags: &["audit"],
    },
    DemoTopic {
        team: 1,
        title: "Onboarding process check",
        areas: &[1],
        cadence: Cadence::Quarterly,
        start_offset: -95,
        deliverable: "Checklist",
        status: Status::Active,
        priority: Priority::Medium,
        tags: &[],
    },
    DemoTopic {
        team: 1,
        title: "Privacy review",
        areas: &[2],
        cadence: Cadence::Monthly,
        start_offset: -70,
        deliverable: "Privacy review notes",
        status: Status::Blocked,
        priority: Priority::Medium,
        tags: &["privacy"],
    },
    DemoTopic {
        team: 2,
        title: "IT release notes",
        areas: &[3],
        cadence: Cadence::Monthly,
        start_offset: -10,
        deliverable: "Release notes",
        status: Status::Active,
        priority: Priority::Medium,
        tags: &["release"],
    },
    DemoTopic {
        team: 2,
        title: "Campaign assets",
        areas: &[4],
        cadence: Cadence::Weekly,
        start_offset: -14,
        deliverable: "Asset bundle",
        status: Status::Active,
        priority: Priority::High,
        tags: &["campaign"],
    },
    DemoTopic {
        team: 0,
        title: "One-time supplier list",
        areas: &[0],
        cadence: Cadence::OneOff,
        start_offset: -5,
        deliverable: "CSV",
        status: Status::Planned,
        priority: Priority::Low,
        tags: &[],
    },
    DemoTopic {
        team: 1,
        title: "Quarterly risk report",
        areas: &[2, 3],
        cadence: Cadence::Quarterly,
        start_offset: -200,
        deliverable: "Risk report PDF",
        status: Status::Active,
        priority: Priority::Medium,
        tags: &[],
    },
    DemoTopic {
        team: 2,
        title: "Employee survey",
        areas: &[1, 4],
        cadence: Cadence::OneOff,
        start_offset: 10,
        deliverable: "Survey results",
        status: Status::Planned,
        priority: Priority::Medium,
        tags: &[],
    },
    DemoTopic {
        team: 0,
        title: "Budget forecast",
        areas: &[0],
        cadence: Cadence::Monthly,
        start_offset: -80,
        deliverable: "Forecast workbook",
        status: Status::Active,
        priority: Priority::Medium,
        tags: &[],
    },
    DemoTopic {
        team: 1,
        title: "Change window alignment",
        areas: &[3],
        cadence: Cadence::Weekly,
        start_offset: -1,
        deliverable: "Change list",
        status: Status::Done,
        priority: Priority::Low,
        tags: &[],
    },
];

/// The first this many topics already had a request a week ago.
const RECENTLY_REQUESTED: usize = 4;

/// Build the demo snapshot with ids from `ids`.
pub fn demo_snapshot(ids: &mut impl IdGenerator, today: NaiveDate) -> Snapshot {
    let teams: Vec<_> = [
        ("Team A", "a.owner@org"),
        ("Team B", "b.owner@org"),
        ("Team C", "c.owner@org"),
    ]
    .into_iter()
    .map(|(name, owner)| TeamDraft::new(name, owner).build(ids))
    .collect();

    let areas: Vec<_> = [
        ("Finance", Some("fin@org")),
        ("HR", Some("hr@org")),
        ("Compliance", None),
        ("IT Operations", Some("ops@org")),
        ("Marketing", Some("mkt@org")),
    ]
    .into_iter()
    .map(|(name, contact)| AreaDraft::new(name, contact).build(ids))
    .collect();

    let mut topics = Vec::with_capacity(TOPICS.len());
    let mut logs = Vec::with_capacity(TOPICS.len());
    for (idx, demo) in TOPICS.iter().enumerate() {
        let last_request_date = (idx < RECENTLY_REQUESTED).then(|| add_days(today, -7));
        let topic = TopicDraft {
            area_ids: demo.areas.iter().map(|&a| areas[a].id.clone()).collect(),
            cadence: Some(demo.cadence),
            start_date: Some(add_days(today, demo.start_offset)),
            expected_deliverable: demo.deliverable.to_string(),
            priority: Some(demo.priority),
            status: Some(demo.status),
            tags: demo.tags.iter().map(|t| t.to_string()).collect(),
            last_request_date,
            ..TopicDraft::new(teams[demo.team].id.clone(), demo.title)
        }
        .build(ids, today);

        let first_area = areas[demo.areas[0]].id.clone();
        let outcome = if idx % 3 == 0 {
            Outcome::Delivered
        } else {
            Outcome::Ack
        };
        logs.push(
            LogDraft {
                date: Some(add_days(today, -6 * (idx as i64 + 1))),
                sent_by: Some("owner".to_string()),
                outcome: Some(outcome),
                ..LogDraft::new(topic.id.clone(), first_area)
            }
            .build(ids, today),
        );
        topics.push(topic);
    }

    Snapshot {
        teams,
        areas,
        topics,
        logs,
    }
}
