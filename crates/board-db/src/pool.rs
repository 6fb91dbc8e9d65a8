use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use board_types::api::PoolStats;
use rusqlite::{Connection, OpenFlags};
use tracing::debug;

use crate::error::{DbError, DbResult};

pub const DEFAULT_POOL_SIZE: usize = 8;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Checkout pool over a single SQLite file.
///
/// Connections are opened lazily up to `max_open`. A caller that finds the
/// pool exhausted blocks until another caller hands a connection back, so
/// this must only be used from blocking contexts.
pub struct Pool {
    name: String,
    path: PathBuf,
    max_open: usize,
    slots: Mutex<Slots>,
    available: Condvar,
}

struct Slots {
    idle: Vec<Connection>,
    open: usize,
}

impl Pool {
    /// Open a pool against an existing database file. One connection is
    /// opened eagerly so a bad path fails here rather than on first use.
    pub fn open(name: &str, path: &Path, max_open: usize) -> DbResult<Self> {
        if !path.is_file() {
            return Err(DbError::Connection(format!("unknown database '{}'", name)));
        }

        let first = open_connection(path, false)?;

        Ok(Self {
            name: name.to_string(),
            path: path.to_path_buf(),
            max_open: max_open.max(1),
            slots: Mutex::new(Slots {
                idle: vec![first],
                open: 1,
            }),
            available: Condvar::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with_conn<F, T>(&self, f: F) -> DbResult<T>
    where
        F: FnOnce(&Connection) -> DbResult<T>,
    {
        let conn = self.get()?;
        f(&conn)
    }

    pub fn with_conn_mut<F, T>(&self, f: F) -> DbResult<T>
    where
        F: FnOnce(&mut Connection) -> DbResult<T>,
    {
        let mut conn = self.get()?;
        f(&mut conn)
    }

    pub fn ping(&self) -> DbResult<()> {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
    }

    pub fn stats(&self) -> PoolStats {
        let slots = self.lock();
        PoolStats {
            open_connections: slots.open,
            in_use: slots.open - slots.idle.len(),
            idle: slots.idle.len(),
        }
    }

    fn get(&self) -> DbResult<PooledConn<'_>> {
        let mut slots = self.lock();
        loop {
            if let Some(conn) = slots.idle.pop() {
                return Ok(PooledConn { pool: self, conn: Some(conn) });
            }

            if slots.open < self.max_open {
                slots.open += 1;
                drop(slots);

                return match open_connection(&self.path, false) {
                    Ok(conn) => {
                        debug!("Pool '{}' opened a new connection", self.name);
                        Ok(PooledConn { pool: self, conn: Some(conn) })
                    }
                    Err(e) => {
                        self.lock().open -= 1;
                        self.available.notify_one();
                        Err(e)
                    }
                };
            }

            slots = self
                .available
                .wait(slots)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A connection checked out of a [`Pool`]; returned to the idle list on drop.
struct PooledConn<'a> {
    pool: &'a Pool,
    conn: Option<Connection>,
}

impl Deref for PooledConn<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.conn.as_ref().expect("connection taken before drop")
    }
}

impl DerefMut for PooledConn<'_> {
    fn deref_mut(&mut self) -> &mut Connection {
        self.conn.as_mut().expect("connection taken before drop")
    }
}

impl Drop for PooledConn<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.lock().idle.push(conn);
            self.pool.available.notify_one();
        }
    }
}

/// Open one SQLite connection with the pragmas every pooled connection uses.
pub(crate) fn open_connection(path: &Path, create: bool) -> DbResult<Connection> {
    let mut flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_URI
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    if create {
        flags |= OpenFlags::SQLITE_OPEN_CREATE;
    }

    let conn = Connection::open_with_flags(path, flags)
        .map_err(|e| DbError::Connection(format!("{}: {}", path.display(), e)))?;

    // WAL mode for concurrent reads
    conn.pragma_update(None, "journal_mode", "WAL")
        .and_then(|_| conn.pragma_update(None, "foreign_keys", "ON"))
        .and_then(|_| conn.busy_timeout(BUSY_TIMEOUT))
        .map_err(|e| DbError::Connection(e.to_string()))?;

    Ok(conn)
}
