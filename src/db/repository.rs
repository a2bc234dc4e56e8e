//! SQLite-backed snapshot store.
//!
//! `save` rewrites every table inside one transaction, so a reader never sees a
//! half-written snapshot. Undo history is kept next to the snapshot as JSON
//! payloads, oldest first.

use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;

use chrono::{NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::info;

use super::SnapshotStore;
use crate::errors::{PlannerError, Result};
use crate::models::{
    Area, Cadence, DueStrategy, Outcome, Priority, RequestLog, RevisionInfo, Snapshot, Status,
    Team, Topic,
};

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Number of saves so far.
    pub async fn revision(&self) -> Result<i64> {
        let row = sqlx::query("SELECT revision_id FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("revision_id"))
    }

    pub async fn revision_info(&self) -> Result<RevisionInfo> {
        let row = sqlx::query("SELECT revision_id, generated_at FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(RevisionInfo {
            revision_id: row.get("revision_id"),
            generated_at: row.get("generated_at"),
        })
    }

    async fn load_snapshot(&self) -> Result<Snapshot> {
        let teams = sqlx::query("SELECT id, name, owner FROM teams ORDER BY position")
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(team_from_row)
            .collect();

        let areas = sqlx::query("SELECT id, name, contact FROM areas ORDER BY position")
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(area_from_row)
            .collect();

        let mut memberships: HashMap<String, BTreeSet<String>> = HashMap::new();
        for row in sqlx::query("SELECT topic_id, area_id FROM topic_areas")
            .fetch_all(&self.pool)
            .await?
        {
            memberships
                .entry(row.get("topic_id"))
                .or_default()
                .insert(row.get("area_id"));
        }

        let topics = sqlx::query(
            r#"SELECT id, team_id, title, description, cadence, start_date, due_strategy,
                      due_offset_days, expected_deliverable, priority, status, tags,
                      last_request_date, next_request_date
               FROM topics ORDER BY position"#,
        )
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(|row| topic_from_row(row, &mut memberships))
        .collect::<Result<Vec<_>>>()?;

        let logs = sqlx::query(
            r#"SELECT id, topic_id, to_area_id, date, sent_by, notes, outcome
               FROM request_logs ORDER BY position"#,
        )
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(log_from_row)
        .collect::<Result<Vec<_>>>()?;

        Ok(Snapshot {
            teams,
            areas,
            topics,
            logs,
        })
    }

    /// Snapshots that undo can return to, oldest first.
    pub async fn load_history(&self) -> Result<Vec<Snapshot>> {
        sqlx::query("SELECT payload FROM undo_history ORDER BY seq")
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(|row| -> Result<Snapshot> {
                let payload: String = row.get("payload");
                Ok(serde_json::from_str(&payload)?)
            })
            .collect()
    }

    /// Save `snapshot` and replace the undo history with `past` in one transaction.
    pub async fn save_with_history(&self, snapshot: &Snapshot, past: &[Snapshot]) -> Result<()> {
        let revision = self.save_snapshot(snapshot, Some(past)).await?;
        info!(revision, undo_steps = past.len(), "snapshot saved with history");
        Ok(())
    }

    async fn save_snapshot(&self, snapshot: &Snapshot, past: Option<&[Snapshot]>) -> Result<i64> {
        let payloads = past
            .map(|past| {
                past.iter()
                    .map(serde_json::to_string)
                    .collect::<std::result::Result<Vec<_>, _>>()
            })
            .transpose()?;

        let mut tx = self.pool.begin().await?;

        for table in ["request_logs", "topic_areas", "topics", "areas", "teams"] {
            sqlx::query(&format!("DELETE FROM {}", table))
                .execute(&mut *tx)
                .await?;
        }

        for (position, team) in snapshot.teams.iter().enumerate() {
            sqlx::query("INSERT INTO teams (id, position, name, owner) VALUES (?, ?, ?, ?)")
                .bind(&team.id)
                .bind(position as i64)
                .bind(&team.name)
                .bind(&team.owner)
                .execute(&mut *tx)
                .await?;
        }

        for (position, area) in snapshot.areas.iter().enumerate() {
            sqlx::query("INSERT INTO areas (id, position, name, contact) VALUES (?, ?, ?, ?)")
                .bind(&area.id)
                .bind(position as i64)
                .bind(&area.name)
                .bind(&area.contact)
                .execute(&mut *tx)
                .await?;
        }

        for (position, topic) in snapshot.topics.iter().enumerate() {
            let tags_json = serde_json::to_string(&topic.tags)?;
            sqlx::query(
                r#"INSERT INTO topics (
                    id, position, team_id, title, description, cadence, start_date,
                    due_strategy, due_offset_days, expected_deliverable, priority, status,
                    tags, last_request_date, next_request_date
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            )
            .bind(&topic.id)
            .bind(position as i64)
            .bind(&topic.team_id)
            .bind(&topic.title)
            .bind(&topic.description)
            .bind(topic.cadence.map(|c| c.as_str()))
            .bind(topic.start_date)
            .bind(topic.due_strategy.map(|s| s.as_str()))
            .bind(topic.due_offset_days)
            .bind(&topic.expected_deliverable)
            .bind(topic.priority.as_str())
            .bind(topic.status.as_str())
            .bind(&tags_json)
            .bind(topic.last_request_date)
            .bind(topic.next_request_date)
            .execute(&mut *tx)
            .await?;

            for area_id in &topic.area_ids {
                sqlx::query("INSERT INTO topic_areas (topic_id, area_id) VALUES (?, ?)")
                    .bind(&topic.id)
                    .bind(area_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        for (position, log) in snapshot.logs.iter().enumerate() {
            sqlx::query(
                r#"INSERT INTO request_logs (
                    id, position, topic_id, to_area_id, date, sent_by, notes, outcome
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
            )
            .bind(&log.id)
            .bind(position as i64)
            .bind(&log.topic_id)
            .bind(&log.to_area_id)
            .bind(log.date)
            .bind(&log.sent_by)
            .bind(&log.notes)
            .bind(log.outcome.as_str())
            .execute(&mut *tx)
            .await?;
        }

        if let Some(payloads) = payloads {
            sqlx::query("DELETE FROM undo_history")
                .execute(&mut *tx)
                .await?;
            for (seq, payload) in payloads.iter().enumerate() {
                sqlx::query("INSERT INTO undo_history (seq, payload) VALUES (?, ?)")
                    .bind(seq as i64)
                    .bind(payload)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "UPDATE meta SET revision_id = revision_id + 1, schema_version = ?, generated_at = ? WHERE id = 1",
        )
        .bind(super::SCHEMA_VERSION)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        let revision: i64 = sqlx::query("SELECT revision_id FROM meta WHERE id = 1")
            .fetch_one(&mut *tx)
            .await?
            .get("revision_id");

        tx.commit().await?;
        Ok(revision)
    }
}

impl SnapshotStore for SqliteStore {
    async fn load(&self) -> Result<Snapshot> {
        let snapshot = self.load_snapshot().await?;
        let (teams, areas, topics, logs) = snapshot.counts();
        info!(teams, areas, topics, logs, "snapshot loaded");
        Ok(snapshot)
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let revision = self.save_snapshot(snapshot, None).await?;
        let (teams, areas, topics, logs) = snapshot.counts();
        info!(revision, teams, areas, topics, logs, "snapshot saved");
        Ok(())
    }
}

// Row conversion

fn parse_column<T: FromStr<Err = String>>(column: &str, raw: &str) -> Result<T> {
    raw.parse()
        .map_err(|e| PlannerError::Database(format!("column {}: {}", column, e)))
}

fn parse_optional<T: FromStr<Err = String>>(column: &str, raw: Option<String>) -> Result<Option<T>> {
    raw.map(|s| parse_column(column, &s)).transpose()
}

fn team_from_row(row: &SqliteRow) -> Team {
    Team {
        id: row.get("id"),
        name: row.get("name"),
        owner: row.get("owner"),
    }
}

fn area_from_row(row: &SqliteRow) -> Area {
    Area {
        id: row.get("id"),
        name: row.get("name"),
        contact: row.get("contact"),
    }
}

fn topic_from_row(
    row: &SqliteRow,
    memberships: &mut HashMap<String, BTreeSet<String>>,
) -> Result<Topic> {
    let id: String = row.get("id");
    let priority: String = row.get("priority");
    let status: String = row.get("status");
    let tags_str: Option<String> = row.get("tags");

    Ok(Topic {
        area_ids: memberships.remove(&id).unwrap_or_default(),
        id,
        team_id: row.get("team_id"),
        title: row.get("title"),
        description: row.get("description"),
        cadence: parse_optional::<Cadence>("cadence", row.get("cadence"))?,
        start_date: row.try_get::<Option<NaiveDate>, _>("start_date")?,
        due_strategy: parse_optional::<DueStrategy>("due_strategy", row.get("due_strategy"))?,
        due_offset_days: row.get("due_offset_days"),
        expected_deliverable: row.get("expected_deliverable"),
        priority: parse_column::<Priority>("priority", &priority)?,
        status: parse_column::<Status>("status", &status)?,
        tags: tags_str.map(|s| parse_json_set(&s)).unwrap_or_default(),
        last_request_date: row.try_get::<Option<NaiveDate>, _>("last_request_date")?,
        next_request_date: row.try_get::<Option<NaiveDate>, _>("next_request_date")?,
    })
}

fn log_from_row(row: &SqliteRow) -> Result<RequestLog> {
    let outcome: String = row.get("outcome");
    Ok(RequestLog {
        id: row.get("id"),
        topic_id: row.get("topic_id"),
        date: row.try_get::<NaiveDate, _>("date")?,
        sent_by: row.get("sent_by"),
        to_area_id: row.get("to_area_id"),
        notes: row.get("notes"),
        outcome: parse_column::<Outcome>("outcome", &outcome)?,
    })
}

fn parse_json_set(s: &str) -> BTreeSet<String> {
    serde_json::from_str(s).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;
    use crate::ids::SequentialIds;
    use crate::models::{AreaDraft, LogDraft, TeamDraft, TopicDraft};
    use tempfile::TempDir;

    async fn open_store(dir: &TempDir) -> SqliteStore {
        let pool = init_database(&dir.path().join("planner.sqlite"))
            .await
            .unwrap();
        SqliteStore::new(pool)
    }

    fn sample() -> Snapshot {
        let mut ids = SequentialIds::default();
        let today = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let team = TeamDraft::new("Controlling", "owner@org").build(&mut ids);
        let finance = AreaDraft::new("Finance", Some("fin@org")).build(&mut ids);
        let legal = AreaDraft::new("Legal", None).build(&mut ids);
        let monthly = TopicDraft {
            area_ids: [finance.id.clone(), legal.id.clone()].into(),
            tags: ["kpi".to_string()].into(),
            cadence: Some(Cadence::Monthly),
            due_strategy: Some(DueStrategy::Relative),
            due_offset_days: Some(5),
            ..TopicDraft::new(team.id.clone(), "Monthly KPIs")
        }
        .build(&mut ids, today);
        let one_off = TopicDraft::new(team.id.clone(), "Audit prep").build(&mut ids, today);
        let log = LogDraft {
            notes: Some("sent by mail".into()),
            ..LogDraft::new(monthly.id.clone(), finance.id.clone())
        }
        .build(&mut ids, today);

        Snapshot {
            teams: vec![team],
            areas: vec![legal, finance],
            topics: vec![one_off, monthly],
            logs: vec![log],
        }
    }

    #[tokio::test]
    async fn test_fresh_database_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;

        assert!(store.load().await.unwrap().is_empty());
        assert_eq!(store.revision().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_save_then_load_preserves_snapshot() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;
        let snapshot = sample();

        store.save(&snapshot).await.unwrap();

        assert_eq!(store.load().await.unwrap(), snapshot);
        assert_eq!(store.revision().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_save_replaces_previous_rows() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;

        store.save(&sample()).await.unwrap();
        let mut smaller = sample();
        smaller.logs.clear();
        smaller.topics.truncate(1);
        store.save(&smaller).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, smaller);
        assert_eq!(store.revision_info().await.unwrap().revision_id, 2);
    }

    #[tokio::test]
    async fn test_failed_save_keeps_previous_snapshot() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;
        store.save(&sample()).await.unwrap();

        // a log pointing at a missing topic violates the foreign key
        let mut broken = sample();
        broken.logs[0].topic_id = "TP-404".into();
        assert!(store.save(&broken).await.is_err());

        assert_eq!(store.load().await.unwrap(), sample());
        assert_eq!(store.revision().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_history_is_saved_with_snapshot() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;
        assert!(store.load_history().await.unwrap().is_empty());

        let first = sample();
        let mut second = sample();
        second.logs.clear();
        store
            .save_with_history(&second, &[Snapshot::default(), first.clone()])
            .await
            .unwrap();

        assert_eq!(store.load().await.unwrap(), second);
        assert_eq!(
            store.load_history().await.unwrap(),
            vec![Snapshot::default(), first]
        );

        // a plain save leaves the history alone
        store.save(&sample()).await.unwrap();
        assert_eq!(store.load_history().await.unwrap().len(), 2);

        store.save_with_history(&sample(), &[]).await.unwrap();
        assert!(store.load_history().await.unwrap().is_empty());
        assert_eq!(store.revision().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_reopen_reads_same_data() {
        let dir = TempDir::new().unwrap();
        {
            let store = open_store(&dir).await;
            store.save(&sample()).await.unwrap();
        }
        let store = open_store(&dir).await;
        assert_eq!(store.load().await.unwrap(), sample());
    }
}
