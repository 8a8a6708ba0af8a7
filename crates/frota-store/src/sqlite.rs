//! # SQLite Backend
//!
//! Durable document store on a sqlx `SqlitePool`.
//!
//! ## Storage Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        nodes table                                      │
//! │                                                                         │
//! │  Each row holds the JSON subtree at `path`. No row sits below another.  │
//! │                                                                         │
//! │  write(P, v)                                                            │
//! │    ├── ancestor row A exists? ──► patch A's JSON at P - A               │
//! │    └── otherwise              ──► delete rows at P and under P,         │
//! │                                   insert P (unless v prunes to null)    │
//! │                                                                         │
//! │  read(P)                                                                │
//! │    ├── row at P or above      ──► descend into its JSON                 │
//! │    └── otherwise              ──► assemble rows under P                 │
//! │                                                                         │
//! │  update({P1: v1, P2: v2, ...}) ──► one transaction, one change event    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! File databases use WAL so reads never wait on the writer.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePoolOptions,
    SqliteSynchronous,
};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::migrations;
use crate::path::StorePath;
use crate::store::{writable_path, ChangeFeed, DocumentStore, MultiPathUpdate, Subscription};
use crate::tree;

const MEMORY_PATH: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// SQLite store configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = StoreConfig::new("/path/to/frota.db")
///     .max_connections(5)
///     .min_connections(1);
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path to the SQLite database file, created when missing.
    pub database_path: PathBuf,

    /// Maximum number of pooled connections.
    /// Default: 5
    pub max_connections: u32,

    /// Minimum number of connections kept alive.
    /// Default: 1
    pub min_connections: u32,

    /// Connection acquire timeout.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection.
    /// Default: 10 minutes
    pub idle_timeout: Duration,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,
}

impl StoreConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        StoreConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            run_migrations: true,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// In-memory database for tests. One connection, since every SQLite
    /// memory connection is a separate database.
    pub fn in_memory() -> Self {
        StoreConfig {
            database_path: PathBuf::from(MEMORY_PATH),
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            run_migrations: true,
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == MEMORY_PATH
    }
}

// =============================================================================
// SqliteStore
// =============================================================================

/// Document store persisted in SQLite.
#[derive(Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
    feed: ChangeFeed,
}

impl SqliteStore {
    /// Opens the pool and, unless disabled, runs migrations.
    pub async fn new(config: StoreConfig) -> StoreResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Opening document store"
        );

        let connect_options = if config.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?
        } else {
            SqliteConnectOptions::new()
                .filename(&config.database_path)
                // Readers don't block the writer
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
                .create_if_missing(true)
        };

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout);
        pool_options = if config.is_in_memory() {
            // The database lives as long as its only connection
            pool_options.idle_timeout(None).max_lifetime(None)
        } else {
            pool_options.idle_timeout(Some(config.idle_timeout))
        };

        let pool = pool_options
            .connect_with(connect_options)
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        info!(max_connections = config.max_connections, "Store pool created");

        let store = SqliteStore {
            pool,
            feed: ChangeFeed::default(),
        };

        if config.run_migrations {
            store.run_migrations().await?;
        }

        Ok(store)
    }

    pub async fn run_migrations(&self) -> StoreResult<()> {
        info!("Running store migrations");
        migrations::run_migrations(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        info!("Closing document store");
        self.pool.close().await;
    }

    /// Number of stored rows; diagnostics only.
    pub async fn row_count(&self) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM nodes")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Applies `entries` in one transaction.
    async fn apply(&self, entries: &[(StorePath, Value)]) -> StoreResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::TransactionFailed(e.to_string()))?;

        let now = Utc::now().to_rfc3339();
        for (path, value) in entries {
            // Rolled back on drop; nothing reached the database.
            write_node(&mut tx, path, value.clone(), &now)
                .await
                .map_err(|e| match e {
                    StoreError::Internal(message) => StoreError::TransactionFailed(message),
                    other => other,
                })?;
        }

        tx.commit()
            .await
            .map_err(|e| StoreError::CommitFailed(e.to_string()))
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn read(&self, path: &str) -> StoreResult<Option<Value>> {
        let path = StorePath::parse(path)?;
        let mut tx = self.pool.begin().await?;
        let value = read_node(&mut tx, &path).await?;
        tx.commit().await?;
        Ok(value)
    }

    async fn write(&self, path: &str, value: Value) -> StoreResult<()> {
        let path = writable_path(path)?;
        self.apply(std::slice::from_ref(&(path.clone(), value))).await?;
        debug!(path = %path, "Node written");
        self.feed.publish(vec![path]);
        Ok(())
    }

    async fn update(&self, update: MultiPathUpdate) -> StoreResult<()> {
        let entries = update.into_entries()?;
        if entries.is_empty() {
            return Ok(());
        }
        self.apply(&entries).await?;
        debug!(count = entries.len(), "Multi-path update committed");
        self.feed
            .publish(entries.into_iter().map(|(path, _)| path).collect());
        Ok(())
    }

    fn subscribe(&self, path: &str) -> StoreResult<Subscription> {
        Ok(self.feed.subscribe(StorePath::parse(path)?))
    }
}

// =============================================================================
// Row Operations
// =============================================================================

async fn row_value(conn: &mut SqliteConnection, path: &str) -> StoreResult<Option<Value>> {
    let raw: Option<String> = sqlx::query_scalar("SELECT value FROM nodes WHERE path = ?")
        .bind(path)
        .fetch_optional(&mut *conn)
        .await?;
    raw.map(|raw| serde_json::from_str(&raw).map_err(|e| StoreError::corrupt(path, e)))
        .transpose()
}

/// The row stored strictly above `path`, if any.
async fn ancestor_row(
    conn: &mut SqliteConnection,
    path: &StorePath,
) -> StoreResult<Option<(StorePath, Value)>> {
    for ancestor in path.ancestors() {
        if let Some(value) = row_value(conn, &ancestor.to_string()).await? {
            return Ok(Some((ancestor, value)));
        }
    }
    Ok(None)
}

/// Bounds selecting every row strictly below `path`.
fn descendant_range(path: &StorePath) -> (String, String) {
    let key = path.to_string();
    (format!("{}/", key), format!("{}0", key))
}

async fn descendant_rows(
    conn: &mut SqliteConnection,
    path: &StorePath,
) -> StoreResult<Vec<(String, String)>> {
    let rows = if path.is_root() {
        sqlx::query_as("SELECT path, value FROM nodes ORDER BY path")
            .fetch_all(&mut *conn)
            .await?
    } else {
        let (low, high) = descendant_range(path);
        sqlx::query_as("SELECT path, value FROM nodes WHERE path >= ? AND path < ? ORDER BY path")
            .bind(low)
            .bind(high)
            .fetch_all(&mut *conn)
            .await?
    };
    Ok(rows)
}

async fn read_node(conn: &mut SqliteConnection, path: &StorePath) -> StoreResult<Option<Value>> {
    if !path.is_root() {
        if let Some(value) = row_value(conn, &path.to_string()).await? {
            return Ok(Some(value));
        }
        if let Some((ancestor, value)) = ancestor_row(conn, path).await? {
            return Ok(tree::get(&value, path.relative_to(&ancestor)).cloned());
        }
    }

    let rows = descendant_rows(conn, path).await?;
    if rows.is_empty() {
        return Ok(None);
    }

    let mut assembled = Value::Null;
    for (row_path, raw) in rows {
        let row = StorePath::parse(&row_path)?;
        let value: Value =
            serde_json::from_str(&raw).map_err(|e| StoreError::corrupt(&row_path, e))?;
        tree::set(&mut assembled, row.relative_to(path), value);
    }
    Ok(tree::prune(assembled))
}

async fn write_node(
    conn: &mut SqliteConnection,
    path: &StorePath,
    value: Value,
    now: &str,
) -> StoreResult<()> {
    if let Some((ancestor, mut doc)) = ancestor_row(conn, path).await? {
        tree::set(&mut doc, path.relative_to(&ancestor), value);
        let key = ancestor.to_string();
        if tree::is_empty(&doc) {
            sqlx::query("DELETE FROM nodes WHERE path = ?")
                .bind(&key)
                .execute(&mut *conn)
                .await?;
        } else {
            sqlx::query("UPDATE nodes SET value = ?, updated_at = ? WHERE path = ?")
                .bind(serde_json::to_string(&doc)?)
                .bind(now)
                .bind(&key)
                .execute(&mut *conn)
                .await?;
        }
        return Ok(());
    }

    let key = path.to_string();
    let (low, high) = descendant_range(path);
    sqlx::query("DELETE FROM nodes WHERE path = ? OR (path >= ? AND path < ?)")
        .bind(&key)
        .bind(low)
        .bind(high)
        .execute(&mut *conn)
        .await?;

    if let Some(value) = tree::prune(value) {
        sqlx::query("INSERT INTO nodes (path, value, updated_at) VALUES (?, ?, ?)")
            .bind(&key)
            .bind(serde_json::to_string(&value)?)
            .bind(now)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn store() -> SqliteStore {
        SqliteStore::new(StoreConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_in_memory_store() {
        let store = store().await;
        assert_eq!(store.row_count().await.unwrap(), 0);
        assert_eq!(store.backend(), "sqlite");
    }

    #[tokio::test]
    async fn test_config_builder() {
        let config = StoreConfig::new("/tmp/frota.db")
            .max_connections(10)
            .min_connections(2)
            .run_migrations(false);

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert!(!config.run_migrations);
        assert!(!config.is_in_memory());
        assert!(StoreConfig::in_memory().is_in_memory());
    }

    #[tokio::test]
    async fn test_read_assembles_children() {
        let store = store().await;
        store.write("vehicles/v1", json!({"matricula": "AA-11-BB"})).await.unwrap();
        store.write("vehicles/v2", json!({"matricula": "CC-22-DD"})).await.unwrap();

        assert_eq!(
            store.read("vehicles").await.unwrap(),
            Some(json!({
                "v1": {"matricula": "AA-11-BB"},
                "v2": {"matricula": "CC-22-DD"}
            }))
        );
        assert_eq!(
            store.read("").await.unwrap(),
            Some(json!({"vehicles": {
                "v1": {"matricula": "AA-11-BB"},
                "v2": {"matricula": "CC-22-DD"}
            }}))
        );
        assert_eq!(store.row_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_write_below_row_patches_it() {
        let store = store().await;
        store
            .write("vehicles/v1", json!({"matricula": "AA-11-BB", "fotos": ["a"]}))
            .await
            .unwrap();
        store.write("vehicles/v1/fotos", json!(["b", "c"])).await.unwrap();

        assert_eq!(
            store.read("vehicles/v1").await.unwrap(),
            Some(json!({"matricula": "AA-11-BB", "fotos": ["b", "c"]}))
        );
        assert_eq!(store.read("vehicles/v1/fotos/1").await.unwrap(), Some(json!("c")));
        assert_eq!(store.row_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_write_above_rows_replaces_them() {
        let store = store().await;
        store.write("vehicles/v1", json!({"a": 1})).await.unwrap();
        store.write("vehicles/v2", json!({"a": 2})).await.unwrap();
        store.write("vehicles", json!({"v3": {"a": 3}})).await.unwrap();

        assert_eq!(store.read("vehicles/v1").await.unwrap(), None);
        assert_eq!(store.read("vehicles/v3/a").await.unwrap(), Some(json!(3)));
        assert_eq!(store.row_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_prefix_sibling_untouched() {
        let store = store().await;
        store.write("contracts_active/c1", json!({"a": 1})).await.unwrap();
        store.write("contracts_active_old/c1", json!({"a": 2})).await.unwrap();
        store.write("contracts_active", Value::Null).await.unwrap();

        assert_eq!(store.read("contracts_active").await.unwrap(), None);
        assert_eq!(store.read("contracts_active_old/c1/a").await.unwrap(), Some(json!(2)));
    }

    #[tokio::test]
    async fn test_deleting_last_field_drops_row() {
        let store = store().await;
        store.write("damages/c1", json!({"contratoId": "c1"})).await.unwrap();
        store.write("damages/c1/contratoId", Value::Null).await.unwrap();

        assert_eq!(store.read("damages").await.unwrap(), None);
        assert_eq!(store.row_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_moves_document_atomically() {
        let store = store().await;
        store
            .write("contracts_active/c1", json!({"cliente": {"nome": "Ana"}}))
            .await
            .unwrap();

        let mut sub = store.subscribe("contracts_active").unwrap();
        let update = MultiPathUpdate::new()
            .set("contracts_terminated/c1", json!({"cliente": {"nome": "Ana"}, "estado": null}))
            .remove("contracts_active/c1");
        store.update(update).await.unwrap();

        assert_eq!(store.read("contracts_active/c1").await.unwrap(), None);
        assert_eq!(
            store.read("contracts_terminated/c1").await.unwrap(),
            Some(json!({"cliente": {"nome": "Ana"}}))
        );
        let event = sub.changed().await.unwrap();
        assert_eq!(event.paths.len(), 2);
    }

    #[tokio::test]
    async fn test_overlapping_update_rejected_before_writing() {
        let store = store().await;
        let update = MultiPathUpdate::new()
            .set("audit/x", json!({"a": 1}))
            .set("audit/x/b", json!(2));
        let err = store.update(update).await.unwrap_err();
        assert!(matches!(err, StoreError::OverlappingPaths { .. }));
        assert!(!err.outcome_unknown());
        assert_eq!(store.row_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frota.db");

        let store = SqliteStore::new(StoreConfig::new(&path)).await.unwrap();
        store.write("vehicles/v1", json!({"matricula": "AA-11-BB"})).await.unwrap();
        store.close().await;

        let reopened = SqliteStore::new(StoreConfig::new(&path)).await.unwrap();
        assert_eq!(
            reopened.read("vehicles/v1/matricula").await.unwrap(),
            Some(json!("AA-11-BB"))
        );
    }
}
