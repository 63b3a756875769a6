use std::any::Any;
use std::fmt;

use rusqlite::Connection;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Error type for [`DbHandle`] calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbError {
    /// The actor task has stopped; the connection is no longer available.
    ActorStopped,
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbError::ActorStopped => write!(f, "Database actor has stopped"),
        }
    }
}

impl std::error::Error for DbError {}

type BoxedDbFn = Box<dyn FnOnce(&Connection) -> Box<dyn Any + Send> + Send>;

struct DbMessage {
    work: BoxedDbFn,
    respond: oneshot::Sender<Box<dyn Any + Send>>,
}

/// Async handle to a single SQLite connection.
///
/// The `Connection` lives inside an actor task; every call is a closure shipped
/// over a channel and answered through a oneshot, so writers are serialized
/// and callers never block the runtime.
#[derive(Clone)]
pub struct DbHandle {
    tx: mpsc::Sender<DbMessage>,
}

impl DbHandle {
    /// Spawn the actor that owns `conn`.
    ///
    /// On-disk databases are switched to WAL mode first.
    pub fn spawn(conn: Connection) -> (Self, JoinHandle<()>) {
        match conn.query_row("PRAGMA journal_mode=WAL;", [], |row| row.get::<_, String>(0)) {
            Ok(mode) => debug!("SQLite journal mode: {}", mode),
            Err(e) => error!("Failed to enable WAL mode: {}", e),
        }

        let (tx, rx) = mpsc::channel::<DbMessage>(256);
        let handle = tokio::spawn(actor_loop(conn, rx));

        (DbHandle { tx }, handle)
    }

    /// Run `f` against the connection and return its result.
    pub async fn call<F, T>(&self, f: F) -> Result<T, DbError>
    where
        F: FnOnce(&Connection) -> T + Send + 'static,
        T: Send + 'static,
    {
        let (resp_tx, resp_rx) = oneshot::channel();

        let msg = DbMessage {
            work: Box::new(move |conn| Box::new(f(conn)) as Box<dyn Any + Send>),
            respond: resp_tx,
        };

        self.tx.send(msg).await.map_err(|_| DbError::ActorStopped)?;
        let boxed = resp_rx.await.map_err(|_| DbError::ActorStopped)?;

        Ok(*boxed.downcast::<T>().expect("DbHandle type mismatch"))
    }

    /// Checkpoint the WAL so no `-wal`/`-shm` files are left behind.
    pub async fn checkpoint(&self) -> Result<(), DbError> {
        info!("Executing WAL checkpoint...");
        let result = self
            .call(|conn| conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);"))
            .await?;
        match result {
            Ok(()) => info!("WAL checkpoint completed"),
            Err(e) => error!("WAL checkpoint failed: {}", e),
        }
        Ok(())
    }
}

async fn actor_loop(conn: Connection, mut rx: mpsc::Receiver<DbMessage>) {
    debug!("Database actor started");

    while let Some(msg) = rx.recv().await {
        let result = (msg.work)(&conn);
        // Receiver may have been dropped; the result is discarded then.
        let _ = msg.respond.send(result);
    }

    debug!("Database actor stopped");
}

impl fmt::Debug for DbHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbHandle").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_call_returns_closure_result() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE test (id INTEGER PRIMARY KEY, value TEXT);")
            .unwrap();

        let (db, _handle) = DbHandle::spawn(conn);

        let value = db
            .call(|conn| {
                conn.execute("INSERT INTO test (value) VALUES (?1)", ["hello"])
                    .unwrap();
                conn.query_row("SELECT value FROM test WHERE id = 1", [], |row| {
                    row.get::<_, String>(0)
                })
                .unwrap()
            })
            .await
            .unwrap();

        assert_eq!(value, "hello");
    }

    #[tokio::test]
    async fn test_concurrent_calls_are_serialized() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE counter (n INTEGER);").unwrap();
        let (db, _handle) = DbHandle::spawn(conn);

        let mut handles = vec![];
        for i in 0..10 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                db.call(move |conn| {
                    conn.execute("INSERT INTO counter (n) VALUES (?1)", [i])
                        .unwrap();
                })
                .await
                .unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let count = db
            .call(|conn| {
                conn.query_row("SELECT COUNT(*) FROM counter", [], |row| {
                    row.get::<_, i64>(0)
                })
                .unwrap()
            })
            .await
            .unwrap();
        assert_eq!(count, 10);
    }

    #[tokio::test]
    async fn test_sql_errors_stay_inside_result() {
        let conn = Connection::open_in_memory().unwrap();
        let (db, _handle) = DbHandle::spawn(conn);

        let result: Result<Result<String, rusqlite::Error>, DbError> = db
            .call(|conn| conn.query_row("SELECT * FROM nonexistent", [], |row| row.get(0)))
            .await;

        assert!(result.unwrap().is_err());
    }

    #[tokio::test]
    async fn test_actor_stops_when_handles_dropped() {
        let conn = Connection::open_in_memory().unwrap();
        let (db, handle) = DbHandle::spawn(conn);

        db.checkpoint().await.unwrap();
        drop(db);

        assert!(handle.await.is_ok());
    }

    #[test]
    fn test_dberror_display() {
        assert_eq!(DbError::ActorStopped.to_string(), "Database actor has stopped");
    }
}
