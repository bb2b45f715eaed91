//! Persistence for route events.
//!
//! The store is append-only: route-start and route-departure records are
//! inserted and never updated or deleted.

mod libsql;

pub use libsql::LibSqlStore;

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::error::DatabaseError;

/// Canonical timestamp format for persisted events (local time).
///
/// The legacy implementation wrote `dd.MM.yyyy` for departures and
/// `yyyy-MM-dd HH:mm:ss` for route starts; both event types now share
/// this single format.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A persisted route event, read back from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEvent {
    pub id: i64,
    pub full_name: String,
    pub supervisor: String,
    /// `None` for route-start events.
    pub reason: Option<String>,
    pub recorded_at: NaiveDateTime,
}

impl RouteEvent {
    pub fn is_route_start(&self) -> bool {
        self.reason.is_none()
    }
}

/// Append-only store of route events.
#[async_trait]
pub trait ReasonStore: Send + Sync {
    /// Record that a worker went on route. Durable once this returns Ok.
    async fn record_route_start(
        &self,
        full_name: &str,
        supervisor: &str,
        recorded_at: NaiveDateTime,
    ) -> Result<(), DatabaseError>;

    /// Record why a worker left their route. Durable once this returns Ok.
    async fn record_reason(
        &self,
        full_name: &str,
        supervisor: &str,
        reason: &str,
        recorded_at: NaiveDateTime,
    ) -> Result<(), DatabaseError>;

    /// Most recent events, newest first.
    async fn recent_events(&self, limit: u32) -> Result<Vec<RouteEvent>, DatabaseError>;
}

/// In-memory store. Backs tests and has no durability whatsoever.
#[derive(Debug, Default)]
pub struct MemoryReasonStore {
    events: std::sync::Mutex<Vec<RouteEvent>>,
}

impl MemoryReasonStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far, in insertion order.
    pub fn events(&self) -> Vec<RouteEvent> {
        self.events.lock().expect("store lock poisoned").clone()
    }

    fn push(&self, full_name: &str, supervisor: &str, reason: Option<&str>, at: NaiveDateTime) {
        let mut events = self.events.lock().expect("store lock poisoned");
        let id = events.len() as i64 + 1;
        events.push(RouteEvent {
            id,
            full_name: full_name.to_string(),
            supervisor: supervisor.to_string(),
            reason: reason.map(str::to_string),
            recorded_at: at,
        });
    }
}

#[async_trait]
impl ReasonStore for MemoryReasonStore {
    async fn record_route_start(
        &self,
        full_name: &str,
        supervisor: &str,
        recorded_at: NaiveDateTime,
    ) -> Result<(), DatabaseError> {
        self.push(full_name, supervisor, None, recorded_at);
        Ok(())
    }

    async fn record_reason(
        &self,
        full_name: &str,
        supervisor: &str,
        reason: &str,
        recorded_at: NaiveDateTime,
    ) -> Result<(), DatabaseError> {
        self.push(full_name, supervisor, Some(reason), recorded_at);
        Ok(())
    }

    async fn recent_events(&self, limit: u32) -> Result<Vec<RouteEvent>, DatabaseError> {
        let events = self.events.lock().expect("store lock poisoned");
        Ok(events.iter().rev().take(limit as usize).cloned().collect())
    }
}

/// Store that fails every write. Exercises the no-advance-on-failure path.
#[derive(Debug, Default)]
pub struct FailingReasonStore;

#[async_trait]
impl ReasonStore for FailingReasonStore {
    async fn record_route_start(
        &self,
        _full_name: &str,
        _supervisor: &str,
        _recorded_at: NaiveDateTime,
    ) -> Result<(), DatabaseError> {
        Err(DatabaseError::Query("disk full".to_string()))
    }

    async fn record_reason(
        &self,
        _full_name: &str,
        _supervisor: &str,
        _reason: &str,
        _recorded_at: NaiveDateTime,
    ) -> Result<(), DatabaseError> {
        Err(DatabaseError::Query("disk full".to_string()))
    }

    async fn recent_events(&self, _limit: u32) -> Result<Vec<RouteEvent>, DatabaseError> {
        Err(DatabaseError::Query("disk full".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 8, 26)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn memory_store_keeps_insertion_order_and_ids() {
        let store = MemoryReasonStore::new();
        store
            .record_route_start("Ivanov I.I.", "tatiana", ts())
            .await
            .unwrap();
        store
            .record_reason("Ivanov I.I.", "tatiana", "flat tire", ts())
            .await
            .unwrap();

        let events = store.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].id, 1);
        assert!(events[0].is_route_start());
        assert_eq!(events[1].reason.as_deref(), Some("flat tire"));

        let recent = store.recent_events(1).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, 2);
    }

    #[tokio::test]
    async fn failing_store_rejects_writes() {
        let store = FailingReasonStore;
        let err = store
            .record_route_start("Ivanov I.I.", "tatiana", ts())
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Query(_)));
    }
}
