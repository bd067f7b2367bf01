//! SqliteHistoryStore - リレーショナル（永続）履歴ストア
//!
//! # スキーマ
//! - `call_history`: 1 呼び出し 1 行（ID は AUTOINCREMENT、削除後も再利用しない）
//! - `request_headers` / `response_headers`: ヘッダ 1 値につき 1 行
//!   （`position` で到着順を保持）
//!
//! # 読み出し
//! ヘッダ行を親テーブルと JOIN し、(id, ヘッダ名) ごとに値リストへ戻します。
//! 直前と同じ値が続いた場合は 1 つにまとめます（`collect_headers`）。
//!
//! # 並行性
//! ロックは持たず、SQLite のトランザクションに任せます。

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use tracing::{debug, info};

use super::retry::RetryPolicy;
use crate::config::SqliteConfig;
use crate::domain::{
    CallDescriptor, CallResult, HeaderMultiMap, HistoryEntry, HistoryId, HistoryRecord, Page,
    StoreError,
};
use crate::ports::HistoryStore;

/// The two normalized header tables.
#[derive(Debug, Clone, Copy)]
enum HeaderTable {
    Request,
    Response,
}

impl HeaderTable {
    fn name(self) -> &'static str {
        match self {
            HeaderTable::Request => "request_headers",
            HeaderTable::Response => "response_headers",
        }
    }
}

#[derive(Debug, FromRow)]
struct HistoryRow {
    id: i64,
    method: String,
    url: String,
    body: String,
    completed_at_us: i64,
    status: i64,
    content_length: i64,
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolClosed => StoreError::StoreClosed,
            other => StoreError::StorageFault(other.to_string()),
        }
    }
}

/// SQLite-backed history store.
pub struct SqliteHistoryStore {
    pool: SqlitePool,
    retry: RetryPolicy,
    closed: AtomicBool,
}

impl SqliteHistoryStore {
    /// Open (or create) the database and run schema creation.
    pub async fn connect(config: &SqliteConfig) -> Result<Self, StoreError> {
        let (options, pool_options) = if config.is_memory() {
            // 接続ごとに別 DB になるので 1 本に固定し、閉じないようにする
            (
                SqliteConnectOptions::from_str("sqlite::memory:")?,
                SqlitePoolOptions::new()
                    .max_connections(1)
                    .min_connections(1)
                    .idle_timeout(None)
                    .max_lifetime(None),
            )
        } else {
            (
                SqliteConnectOptions::from_str(&config.url)?
                    .create_if_missing(true)
                    .journal_mode(SqliteJournalMode::Wal)
                    .busy_timeout(config.busy_timeout),
                SqlitePoolOptions::new().max_connections(config.max_connections.max(1)),
            )
        };

        let pool = pool_options
            .connect_with(options.foreign_keys(true))
            .await?;

        let store = Self {
            pool,
            retry: RetryPolicy::for_inserts(),
            closed: AtomicBool::new(false),
        };
        store.run_migrations().await?;
        info!(url = %config.url, "sqlite history store ready");
        Ok(store)
    }

    /// Override the insert retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Run schema creation (CREATE TABLE IF NOT EXISTS).
    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        let stmts = [
            "CREATE TABLE IF NOT EXISTS call_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                method TEXT NOT NULL,
                url TEXT NOT NULL,
                body TEXT NOT NULL,
                completed_at_us INTEGER NOT NULL,
                status INTEGER NOT NULL,
                content_length INTEGER NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS request_headers (
                history_id INTEGER NOT NULL REFERENCES call_history(id) ON DELETE CASCADE,
                position INTEGER NOT NULL,
                header_name TEXT NOT NULL,
                header_value TEXT NOT NULL,
                PRIMARY KEY (history_id, position)
            )",
            "CREATE TABLE IF NOT EXISTS response_headers (
                history_id INTEGER NOT NULL REFERENCES call_history(id) ON DELETE CASCADE,
                position INTEGER NOT NULL,
                header_name TEXT NOT NULL,
                header_value TEXT NOT NULL,
                PRIMARY KEY (history_id, position)
            )",
        ];
        for stmt in stmts {
            sqlx::query(stmt).execute(&self.pool).await?;
        }
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::StoreClosed);
        }
        Ok(())
    }

    /// One insert transaction: primary row, then both header sets.
    async fn insert_once(&self, entry: &HistoryEntry) -> Result<i64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO call_history (method, url, body, completed_at_us, status, content_length)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(&entry.request.method)
        .bind(&entry.request.url)
        .bind(&entry.request.body)
        .bind(entry.time.timestamp_micros())
        .bind(i64::from(entry.response.status))
        .bind(i64::try_from(entry.response.content_length).unwrap_or(i64::MAX))
        .fetch_one(&mut *tx)
        .await?;

        insert_headers(&mut tx, HeaderTable::Request, id, &entry.request.header).await?;
        insert_headers(&mut tx, HeaderTable::Response, id, &entry.response.header).await?;

        tx.commit().await?;
        Ok(id)
    }
}

async fn insert_headers(
    conn: &mut SqliteConnection,
    table: HeaderTable,
    id: i64,
    headers: &HeaderMultiMap,
) -> Result<(), sqlx::Error> {
    let sql = format!(
        "INSERT INTO {} (history_id, position, header_name, header_value) VALUES (?, ?, ?, ?)",
        table.name()
    );
    let mut position: i64 = 0;
    for (name, values) in headers {
        for value in values {
            sqlx::query(&sql)
                .bind(id)
                .bind(position)
                .bind(name)
                .bind(value)
                .execute(&mut *conn)
                .await?;
            position += 1;
        }
    }
    Ok(())
}

/// Header rows of every live record, joined back to the primary table.
async fn load_headers(
    conn: &mut SqliteConnection,
    table: HeaderTable,
) -> Result<HashMap<i64, HeaderMultiMap>, sqlx::Error> {
    let sql = format!(
        "SELECT h.id, t.header_name, t.header_value
         FROM call_history h
         JOIN {} t ON t.history_id = h.id
         ORDER BY h.id, t.position",
        table.name()
    );
    let rows: Vec<(i64, String, String)> = sqlx::query_as(&sql).fetch_all(&mut *conn).await?;
    Ok(collect_headers(rows))
}

/// Rebuild multi-valued headers from `(id, name, value)` rows in arrival order.
///
/// A value equal to the previous value for the same key is not appended again.
/// Distinct values keep their order.
fn collect_headers<I>(rows: I) -> HashMap<i64, HeaderMultiMap>
where
    I: IntoIterator<Item = (i64, String, String)>,
{
    let mut grouped: HashMap<i64, HeaderMultiMap> = HashMap::new();
    for (id, name, value) in rows {
        let values = grouped.entry(id).or_default().entry(name).or_default();
        if values.last() != Some(&value) {
            values.push(value);
        }
    }
    grouped
}

/// Transient failures where the insert never got an id.
fn is_transient(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::RowNotFound => true,
        // SQLITE_BUSY, SQLITE_LOCKED and their extended codes
        sqlx::Error::Database(db) => {
            matches!(db.code().as_deref(), Some("5" | "6" | "261" | "262" | "517"))
        }
        _ => false,
    }
}

fn decode_record(
    row: HistoryRow,
    request_headers: &mut HashMap<i64, HeaderMultiMap>,
    response_headers: &mut HashMap<i64, HeaderMultiMap>,
) -> Result<HistoryRecord, StoreError> {
    let time = DateTime::<Utc>::from_timestamp_micros(row.completed_at_us).ok_or_else(|| {
        StoreError::StorageFault(format!(
            "record {} has invalid timestamp {}",
            row.id, row.completed_at_us
        ))
    })?;
    let status = u16::try_from(row.status).map_err(|_| {
        StoreError::StorageFault(format!("record {} has invalid status {}", row.id, row.status))
    })?;

    let request = CallDescriptor {
        method: row.method,
        url: row.url,
        header: request_headers.remove(&row.id).unwrap_or_default(),
        body: row.body,
    };
    let response = CallResult {
        status,
        header: response_headers.remove(&row.id).unwrap_or_default(),
        content_length: u64::try_from(row.content_length).unwrap_or_default(),
    };

    Ok(HistoryRecord::new(
        HistoryId::new(row.id),
        HistoryEntry::new(request, response, time),
    ))
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn add(&self, entry: HistoryEntry) -> Result<HistoryId, StoreError> {
        self.ensure_open()?;
        let store = self;
        let entry = &entry;
        let id = self
            .retry
            .run(move || store.insert_once(entry), is_transient)
            .await?;
        let id = HistoryId::new(id);
        debug!(%id, "history record added");
        Ok(id)
    }

    async fn delete(&self, id: HistoryId) -> Result<(), StoreError> {
        self.ensure_open()?;
        let mut tx = self.pool.begin().await?;
        for table in [HeaderTable::Request, HeaderTable::Response] {
            let sql = format!("DELETE FROM {} WHERE history_id = ?", table.name());
            sqlx::query(&sql).bind(id.get()).execute(&mut *tx).await?;
        }
        let removed = sqlx::query("DELETE FROM call_history WHERE id = ?")
            .bind(id.get())
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;
        debug!(%id, existed = removed > 0, "history record deleted");
        Ok(())
    }

    async fn history(&self, page: Page) -> Result<Vec<HistoryRecord>, StoreError> {
        self.ensure_open()?;

        // 3 つの読み出しを 1 トランザクションにまとめてスナップショットにする
        let mut tx = self.pool.begin().await?;
        let rows: Vec<HistoryRow> = sqlx::query_as(
            "SELECT id, method, url, body, completed_at_us, status, content_length
             FROM call_history",
        )
        .fetch_all(&mut *tx)
        .await?;
        let mut request_headers = load_headers(&mut tx, HeaderTable::Request).await?;
        let mut response_headers = load_headers(&mut tx, HeaderTable::Response).await?;
        tx.commit().await?;

        let snapshot = rows
            .into_iter()
            .map(|row| decode_record(row, &mut request_headers, &mut response_headers))
            .collect::<Result<Vec<_>, _>>()?;
        page.apply(snapshot)
    }

    async fn len(&self) -> Result<usize, StoreError> {
        self.ensure_open()?;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM call_history")
            .fetch_one(&self.pool)
            .await?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    async fn close(&self) -> Result<(), StoreError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.pool.close().await;
        info!("sqlite history store closed");
        Ok(())
    }
}
