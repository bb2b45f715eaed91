//! libSQL (SQLite file) implementation of the reason store.

use std::path::Path;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use libsql::{params, Builder, Connection, Database, Value};

use crate::db::{ReasonStore, RouteEvent, TIMESTAMP_FORMAT};
use crate::error::DatabaseError;

/// Schema for the route event log. Applied on every start; idempotent via
/// `IF NOT EXISTS`.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS route_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    full_name TEXT NOT NULL,
    supervisor TEXT NOT NULL,
    reason TEXT,
    recorded_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_route_events_recorded_at
    ON route_events(recorded_at);
"#;

/// File-backed store. The database file is created on first open.
pub struct LibSqlStore {
    db: Database,
}

impl LibSqlStore {
    /// Open (creating if needed) the database at `path` and apply the schema.
    pub async fn open(path: &Path) -> Result<Self, DatabaseError> {
        let db = Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;

        let store = Self { db };
        store.apply_schema().await?;
        Ok(store)
    }

    async fn apply_schema(&self) -> Result<(), DatabaseError> {
        let conn = self.connect()?;
        conn.execute_batch(SCHEMA)
            .await
            .map_err(|e| DatabaseError::Migration(e.to_string()))?;
        Ok(())
    }

    fn connect(&self) -> Result<Connection, DatabaseError> {
        self.db
            .connect()
            .map_err(|e| DatabaseError::Connection(e.to_string()))
    }
}

#[async_trait]
impl ReasonStore for LibSqlStore {
    async fn record_route_start(
        &self,
        full_name: &str,
        supervisor: &str,
        recorded_at: NaiveDateTime,
    ) -> Result<(), DatabaseError> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO route_events (full_name, supervisor, reason, recorded_at) \
             VALUES (?1, ?2, NULL, ?3)",
            params![
                full_name,
                supervisor,
                recorded_at.format(TIMESTAMP_FORMAT).to_string()
            ],
        )
        .await
        .map_err(|e| DatabaseError::Query(e.to_string()))?;
        Ok(())
    }

    async fn record_reason(
        &self,
        full_name: &str,
        supervisor: &str,
        reason: &str,
        recorded_at: NaiveDateTime,
    ) -> Result<(), DatabaseError> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO route_events (full_name, supervisor, reason, recorded_at) \
             VALUES (?1, ?2, ?3, ?4)",
            params![
                full_name,
                supervisor,
                reason,
                recorded_at.format(TIMESTAMP_FORMAT).to_string()
            ],
        )
        .await
        .map_err(|e| DatabaseError::Query(e.to_string()))?;
        Ok(())
    }

    async fn recent_events(&self, limit: u32) -> Result<Vec<RouteEvent>, DatabaseError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                "SELECT id, full_name, supervisor, reason, recorded_at \
                 FROM route_events ORDER BY id DESC LIMIT ?1",
                params![limit as i64],
            )
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?;

        let mut events = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?
        {
            events.push(row_to_event(&row)?);
        }
        Ok(events)
    }
}

/// Convert a libsql row to a RouteEvent.
///
/// Column order: id(0), full_name(1), supervisor(2), reason(3), recorded_at(4).
fn row_to_event(row: &libsql::Row) -> Result<RouteEvent, DatabaseError> {
    let recorded_at_text = get_text(row, 4)?;
    let recorded_at = NaiveDateTime::parse_from_str(&recorded_at_text, TIMESTAMP_FORMAT)
        .map_err(|e| DatabaseError::Query(format!("invalid recorded_at: {e}")))?;

    Ok(RouteEvent {
        id: get_integer(row, 0)?,
        full_name: get_text(row, 1)?,
        supervisor: get_text(row, 2)?,
        reason: get_optional_text(row, 3)?,
        recorded_at,
    })
}

fn get_integer(row: &libsql::Row, idx: i32) -> Result<i64, DatabaseError> {
    match row
        .get_value(idx)
        .map_err(|e| DatabaseError::Query(e.to_string()))?
    {
        Value::Integer(n) => Ok(n),
        other => Err(DatabaseError::Query(format!(
            "expected integer in column {idx}, got {other:?}"
        ))),
    }
}

fn get_text(row: &libsql::Row, idx: i32) -> Result<String, DatabaseError> {
    match row
        .get_value(idx)
        .map_err(|e| DatabaseError::Query(e.to_string()))?
    {
        Value::Text(s) => Ok(s),
        other => Err(DatabaseError::Query(format!(
            "expected text in column {idx}, got {other:?}"
        ))),
    }
}

fn get_optional_text(row: &libsql::Row, idx: i32) -> Result<Option<String>, DatabaseError> {
    match row
        .get_value(idx)
        .map_err(|e| DatabaseError::Query(e.to_string()))?
    {
        Value::Text(s) => Ok(Some(s)),
        Value::Null => Ok(None),
        other => Err(DatabaseError::Query(format!(
            "expected text or null in column {idx}, got {other:?}"
        ))),
    }
}
