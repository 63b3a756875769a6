use std::fmt;

use rusqlite::{params, Connection, OptionalExtension, Transaction};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, error, info};

use super::pool::{DbError, DbHandle};
use super::schema::init_schema;
use crate::models::link::{format_timestamp, parse_timestamp, Link, NewLinkRecord};

/// Failures raised by the storage engine, distinct from application errors.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to open database: {0}")]
    Connection(String),

    #[error(transparent)]
    ActorStopped(#[from] DbError),

    #[error("Write attempted in a read-only transaction")]
    ReadOnly,

    #[error("Unique index '{0}' violated")]
    UniqueViolation(&'static str),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl StorageError {
    fn from_write(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StorageError::UniqueViolation("url")
            }
            other => StorageError::Sqlite(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMode {
    ReadOnly,
    ReadWrite,
}

/// The persistent `links` table, connected lazily on first use.
pub struct ObjectStore {
    path: String,
    db: OnceCell<DbHandle>,
}

impl ObjectStore {
    pub fn new(path: impl Into<String>) -> Self {
        ObjectStore {
            path: path.into(),
            db: OnceCell::new(),
        }
    }

    /// Establishes the connection, creating the schema on first use.
    ///
    /// Safe to call any number of times and from concurrent tasks; only the
    /// first successful call opens the database.
    pub async fn open(&self) -> Result<&DbHandle, StorageError> {
        self.db
            .get_or_try_init(|| async {
                let path = self.path.clone();
                let conn = tokio::task::spawn_blocking(move || open_connection(&path))
                    .await
                    .map_err(|e| StorageError::Connection(e.to_string()))??;
                let (db, _actor) = DbHandle::spawn(conn);
                info!("Opened link store at {}", self.path);
                Ok(db)
            })
            .await
    }

    pub fn is_open(&self) -> bool {
        self.db.initialized()
    }

    /// Runs `f` inside one transaction over the `links` table.
    ///
    /// Read-write scopes commit only when `f` returns `Ok`; anything else is
    /// rolled back when the transaction is dropped.
    pub async fn with_store<F, T>(&self, mode: StoreMode, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&LinkStore<'_>) -> Result<T, StorageError> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.open().await?;
        db.call(move |conn: &Connection| -> Result<T, StorageError> {
            let tx = conn.unchecked_transaction()?;
            let value = {
                let store = LinkStore { tx: &tx, mode };
                f(&store)?
            };
            if mode == StoreMode::ReadWrite {
                tx.commit()?;
            }
            Ok(value)
        })
        .await?
    }

    /// Flushes the WAL if the store was ever opened.
    pub async fn shutdown(&self) {
        if let Some(db) = self.db.get() {
            if let Err(e) = db.checkpoint().await {
                error!("Store shutdown failed: {}", e);
            }
        }
    }
}

impl fmt::Debug for ObjectStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectStore")
            .field("path", &self.path)
            .field("open", &self.is_open())
            .finish()
    }
}

fn open_connection(path: &str) -> Result<Connection, StorageError> {
    let conn = Connection::open(path).map_err(|e| StorageError::Connection(e.to_string()))?;
    if init_schema(&conn).map_err(|e| StorageError::Connection(e.to_string()))? {
        debug!("Initialized schema for {}", path);
    }
    Ok(conn)
}

const SELECT_COLUMNS: &str =
    "id, url, title, description, favicon, is_favorite, created_at, updated_at";

fn row_to_link(row: &rusqlite::Row) -> rusqlite::Result<Link> {
    let created_at: String = row.get(6)?;
    let updated_at: String = row.get(7)?;

    Ok(Link {
        id: row.get(0)?,
        url: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        favicon: row.get(4)?,
        is_favorite: row.get(5)?,
        created_at: parse_timestamp(&created_at),
        updated_at: parse_timestamp(&updated_at),
    })
}

/// Transaction-scoped handle over the `links` table.
pub struct LinkStore<'a> {
    tx: &'a Transaction<'a>,
    mode: StoreMode,
}

impl LinkStore<'_> {
    fn ensure_writable(&self) -> Result<(), StorageError> {
        match self.mode {
            StoreMode::ReadWrite => Ok(()),
            StoreMode::ReadOnly => Err(StorageError::ReadOnly),
        }
    }

    /// Inserts a record and returns the id assigned to it.
    pub fn insert(&self, record: &NewLinkRecord) -> Result<i64, StorageError> {
        self.ensure_writable()?;
        self.tx
            .execute(
                "INSERT INTO links (url, title, description, favicon, is_favorite, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.url,
                    record.title,
                    record.description,
                    record.favicon,
                    record.is_favorite,
                    format_timestamp(&record.created_at),
                    format_timestamp(&record.updated_at),
                ],
            )
            .map_err(StorageError::from_write)?;
        Ok(self.tx.last_insert_rowid())
    }

    pub fn get(&self, id: i64) -> Result<Option<Link>, StorageError> {
        Ok(self
            .tx
            .query_row(
                &format!("SELECT {} FROM links WHERE id = ?1", SELECT_COLUMNS),
                params![id],
                row_to_link,
            )
            .optional()?)
    }

    /// Lookup through the unique `url` index.
    pub fn get_by_url(&self, url: &str) -> Result<Option<Link>, StorageError> {
        Ok(self
            .tx
            .query_row(
                &format!("SELECT {} FROM links WHERE url = ?1", SELECT_COLUMNS),
                params![url],
                row_to_link,
            )
            .optional()?)
    }

    pub fn get_all(&self) -> Result<Vec<Link>, StorageError> {
        self.iterate_filtered(|_| true)
    }

    /// Walks every record in key order, keeping those matching `keep`.
    pub fn iterate_filtered<P>(&self, mut keep: P) -> Result<Vec<Link>, StorageError>
    where
        P: FnMut(&Link) -> bool,
    {
        let mut stmt = self
            .tx
            .prepare(&format!("SELECT {} FROM links ORDER BY id ASC", SELECT_COLUMNS))?;
        let mut rows = stmt.query([])?;

        let mut links = Vec::new();
        while let Some(row) = rows.next()? {
            let link = row_to_link(row)?;
            if keep(&link) {
                links.push(link);
            }
        }
        Ok(links)
    }

    /// Replaces the record with `link.id`, inserting it when missing.
    pub fn put(&self, link: &Link) -> Result<(), StorageError> {
        self.ensure_writable()?;
        self.tx
            .execute(
                "INSERT INTO links (id, url, title, description, favicon, is_favorite, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(id) DO UPDATE SET
                    url = excluded.url,
                    title = excluded.title,
                    description = excluded.description,
                    favicon = excluded.favicon,
                    is_favorite = excluded.is_favorite,
                    created_at = excluded.created_at,
                    updated_at = excluded.updated_at",
                params![
                    link.id,
                    link.url,
                    link.title,
                    link.description,
                    link.favicon,
                    link.is_favorite,
                    format_timestamp(&link.created_at),
                    format_timestamp(&link.updated_at),
                ],
            )
            .map_err(StorageError::from_write)?;
        Ok(())
    }

    /// Returns whether a record was removed.
    pub fn delete(&self, id: i64) -> Result<bool, StorageError> {
        self.ensure_writable()?;
        let rows = self
            .tx
            .execute("DELETE FROM links WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    pub fn count(&self) -> Result<i64, StorageError> {
        Ok(self
            .tx
            .query_row("SELECT COUNT(*) FROM links", [], |row| row.get(0))?)
    }
}
