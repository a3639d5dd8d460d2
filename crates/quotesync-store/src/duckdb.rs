//! `DuckDB` connection pool.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ::duckdb::Connection;

struct PoolInner {
    db_path: PathBuf,
    max_idle: usize,
    // Every pooled connection is cloned from this one so the file is opened by a
    // single database instance per process.
    root: Mutex<Connection>,
    idle: Mutex<Vec<Connection>>,
}

// A panic while holding either lock leaves the guarded value intact, so a
// poisoned guard is still safe to reuse.
fn relock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Keeps a bounded number of idle connections to one database file.
///
/// Connections are lent to a closure through [`ConnectionPool::with_connection`] and
/// returned to the idle list afterwards, whether the closure succeeded or not.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl ConnectionPool {
    /// Open the database file at `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or configured.
    pub fn open(path: impl Into<PathBuf>, max_idle: usize) -> Result<Self, ::duckdb::Error> {
        let db_path = path.into();
        let root = Connection::open(db_path.as_path())?;
        configure_connection(&root)?;

        Ok(Self {
            inner: Arc::new(PoolInner {
                db_path,
                max_idle: max_idle.max(1),
                root: Mutex::new(root),
                idle: Mutex::new(Vec::new()),
            }),
        })
    }

    /// Run `work` against a pooled connection.
    ///
    /// # Errors
    /// Returns the closure's error, or a `DuckDB` error when a new connection
    /// cannot be cloned from the root.
    pub fn with_connection<T, E>(
        &self,
        work: impl FnOnce(&Connection) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<::duckdb::Error>,
    {
        let connection = self.checkout()?;
        let result = work(&connection);
        self.checkin(connection);
        result
    }

    #[must_use]
    pub fn db_path(&self) -> &Path {
        self.inner.db_path.as_path()
    }

    #[must_use]
    pub fn idle_len(&self) -> usize {
        relock(&self.inner.idle).len()
    }

    fn checkout(&self) -> Result<Connection, ::duckdb::Error> {
        let reused = relock(&self.inner.idle).pop();
        if let Some(connection) = reused {
            return Ok(connection);
        }

        let connection = relock(&self.inner.root).try_clone()?;
        configure_connection(&connection)?;
        Ok(connection)
    }

    fn checkin(&self, connection: Connection) {
        let mut idle = relock(&self.inner.idle);
        if idle.len() < self.inner.max_idle {
            idle.push(connection);
        }
    }
}

fn configure_connection(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch("PRAGMA disable_progress_bar;")
}
