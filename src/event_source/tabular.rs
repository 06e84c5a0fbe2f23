use std::collections::VecDeque;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};

use super::normalize::collapse_transaction;
use super::types::{RawEvent, RawEventId, RawTransaction};
use super::{EventSource, SourceError, SwapEvent};

const PAGE_SIZE: i64 = 100;

/// One row of the swap-event table: `data.events` carries the same raw event
/// array shape as a file-backend transaction.
pub struct TabularRow {
    pub id: i64,
    pub pool_address: String,
    pub tx_id: i64,
    pub event_name: String,
    pub timestamp_ms: u64,
    pub data: serde_json::Value,
    pub code: i32,
    pub num_of_events: i32,
    pub timestamp: DateTime<Utc>,
    pub is_desc: bool,
}

/// Read-only query surface over the historical event store. Implementations
/// own their own connection lifecycle; the Engine never sees a raw
/// connection.
#[async_trait]
pub trait TabularEventStore: Send + Sync {
    async fn fetch_page(
        &self,
        pool_address: &str,
        start_ms: u64,
        end_ms: u64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TabularRow>, SourceError>;
}

pub struct PgTabularStore {
    pool: PgPool,
}

impl PgTabularStore {
    pub async fn connect(database_url: &str, pool_opts: PgPoolOptions) -> Result<Self, SourceError> {
        let pool = pool_opts
            .connect(database_url)
            .await
            .map_err(|e| SourceError::Store(e.to_string()))?;
        Ok(Self { pool })
    }
}

fn row_to_tabular(row: PgRow) -> Result<TabularRow, SourceError> {
    let timestamp: DateTime<Utc> = row
        .try_get("timestamp")
        .map_err(|e| SourceError::Store(e.to_string()))?;
    Ok(TabularRow {
        id: row.try_get("id").map_err(|e| SourceError::Store(e.to_string()))?,
        pool_address: row
            .try_get("pool_address")
            .map_err(|e| SourceError::Store(e.to_string()))?,
        tx_id: row.try_get("tx_id").map_err(|e| SourceError::Store(e.to_string()))?,
        event_name: row
            .try_get("event_name")
            .map_err(|e| SourceError::Store(e.to_string()))?,
        timestamp_ms: {
            let v: i64 = row
                .try_get("timestamp_ms")
                .map_err(|e| SourceError::Store(e.to_string()))?;
            v as u64
        },
        data: row.try_get("data").map_err(|e| SourceError::Store(e.to_string()))?,
        code: row.try_get("code").map_err(|e| SourceError::Store(e.to_string()))?,
        num_of_events: row
            .try_get("num_of_events")
            .map_err(|e| SourceError::Store(e.to_string()))?,
        timestamp,
        is_desc: row.try_get("is_desc").map_err(|e| SourceError::Store(e.to_string()))?,
    })
}

#[async_trait]
impl TabularEventStore for PgTabularStore {
    async fn fetch_page(
        &self,
        pool_address: &str,
        start_ms: u64,
        end_ms: u64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TabularRow>, SourceError> {
        let rows = sqlx::query(
            "SELECT id, pool_address, tx_id, event_name, timestamp_ms, data, code, \
             num_of_events, timestamp, is_desc \
             FROM swap_events \
             WHERE pool_address = $1 AND timestamp_ms BETWEEN $2 AND $3 \
             ORDER BY timestamp_ms ASC \
             LIMIT $4 OFFSET $5",
        )
        .bind(pool_address)
        .bind(start_ms as i64)
        .bind(end_ms as i64)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| SourceError::Store(e.to_string()))?;

        rows.into_iter().map(row_to_tabular).collect()
    }
}

fn row_transaction(row: &TabularRow) -> RawTransaction {
    let events: Vec<RawEvent> = row
        .data
        .get("events")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect();

    RawTransaction {
        digest: events
            .first()
            .map(|e| e.id.tx_digest.clone())
            .unwrap_or_else(|| row.tx_id.to_string()),
        timestamp_ms: row.timestamp_ms,
        checkpoint: None,
        events,
    }
}

/// Adapts a `TabularEventStore` into the pull-based `EventSource` contract,
/// fetching one 100-row page at a time and stopping once a short page is
/// returned. Unlike the file backend, rows are assumed to already arrive in
/// `(timestamp_ms, digest, seq)` order and are not re-sorted.
pub struct TabularEventSource<S: TabularEventStore> {
    store: S,
    pool_address: String,
    start_ms: u64,
    end_ms: u64,
    offset: i64,
    exhausted: bool,
    buffer: VecDeque<SwapEvent>,
}

impl<S: TabularEventStore> TabularEventSource<S> {
    pub fn new(store: S, pool_address: impl Into<String>, start_ms: u64, end_ms: u64) -> Self {
        Self {
            store,
            pool_address: pool_address.into(),
            start_ms,
            end_ms,
            offset: 0,
            exhausted: false,
            buffer: VecDeque::new(),
        }
    }

    async fn fill_buffer(&mut self) -> Result<(), SourceError> {
        while self.buffer.is_empty() && !self.exhausted {
            let rows = self
                .store
                .fetch_page(&self.pool_address, self.start_ms, self.end_ms, PAGE_SIZE, self.offset)
                .await?;
            let short_page = (rows.len() as i64) < PAGE_SIZE;
            self.offset += rows.len() as i64;

            for row in &rows {
                let tx = row_transaction(row);
                self.buffer
                    .extend(collapse_transaction(&tx, &self.pool_address));
            }

            if short_page {
                self.exhausted = true;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<S: TabularEventStore + Send + Sync> EventSource for TabularEventSource<S> {
    async fn next_event(&mut self) -> Result<Option<SwapEvent>, SourceError> {
        self.fill_buffer().await?;
        Ok(self.buffer.pop_front())
    }
}
