pub mod error;
pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use board_types::api::{ConnectionState, DatabaseConfig, DatabaseStatus};
use tracing::{info, warn};

pub use error::{DbError, DbResult};
pub use pool::{DEFAULT_POOL_SIZE, Pool};
pub use queries::{ContentRepo, UserRepo};

/// Written into the header of every database this server creates.
const APPLICATION_ID: i32 = 0x424f_5244;

/// Owns the process-wide connection state.
///
/// The data directory stands in for a database server: each named database
/// is one SQLite file inside it. Until [`Database::connect`] succeeds every
/// repository accessor fails with [`DbError::NotConnected`].
pub struct Database {
    data_dir: PathBuf,
    pool_size: usize,
    current: RwLock<Option<Arc<Pool>>>,
    lifecycle: Mutex<()>,
}

impl Database {
    pub fn new(data_dir: impl Into<PathBuf>, pool_size: usize) -> Self {
        Self {
            data_dir: data_dir.into(),
            pool_size,
            current: RwLock::new(None),
            lifecycle: Mutex::new(()),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Create the named database if it doesn't exist yet. Safe to repeat.
    pub fn create_database(&self, config: &DatabaseConfig) -> DbResult<()> {
        let path = self.database_path(&config.dbname)?;

        std::fs::create_dir_all(&self.data_dir).map_err(|e| {
            DbError::Connection(format!("data directory {}: {}", self.data_dir.display(), e))
        })?;

        let conn = pool::open_connection(&path, true)?;
        conn.execute_batch(&format!(
            "PRAGMA encoding = 'UTF-8'; PRAGMA application_id = {APPLICATION_ID};"
        ))
        .map_err(DbError::SqlExecution)?;

        info!("Database {} ready at {}", config.dbname, path.display());
        Ok(())
    }

    /// Open a pool against an existing database, migrate it, and make it the
    /// current connection. On failure the previous connection stays in place.
    pub fn connect(&self, config: &DatabaseConfig) -> DbResult<()> {
        let path = self.database_path(&config.dbname)?;
        info!(
            "Connecting to database {} ({}@{}:{})",
            config.dbname, config.user, config.host, config.port
        );

        let _guard = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);

        let pool = Pool::open(&config.dbname, &path, self.pool_size)?;
        pool.with_conn_mut(|conn| migrations::run(conn))?;
        pool.with_conn(|conn| migrations::validate(conn))?;

        let previous = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(Arc::new(pool));

        match previous {
            Some(old) => info!("Switched database connection from {} to {}", old.name(), config.dbname),
            None => info!("Database connection established"),
        }
        Ok(())
    }

    pub fn status(&self) -> DatabaseStatus {
        let Ok(pool) = self.pool() else {
            return DatabaseStatus::disconnected();
        };

        match pool.ping() {
            Ok(()) => DatabaseStatus {
                connected: true,
                status: ConnectionState::Connected,
                database: Some(pool.name().to_string()),
                error: None,
                pool: Some(pool.stats()),
            },
            Err(e) => {
                warn!("Database ping failed: {}", e);
                DatabaseStatus {
                    connected: false,
                    status: ConnectionState::Unreachable,
                    database: Some(pool.name().to_string()),
                    error: Some(e.to_string()),
                    pool: None,
                }
            }
        }
    }

    /// The current pool, or `NotConnected`. Never connects implicitly.
    pub fn pool(&self) -> DbResult<Arc<Pool>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(DbError::NotConnected)
    }

    pub fn users(&self) -> DbResult<UserRepo> {
        self.pool().map(UserRepo::new)
    }

    pub fn contents(&self) -> DbResult<ContentRepo> {
        self.pool().map(ContentRepo::new)
    }

    fn database_path(&self, name: &str) -> DbResult<PathBuf> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(DbError::InvalidName(name.to_string()));
        }
        Ok(self.data_dir.join(format!("{}.db", name)))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn config(dbname: &str) -> DatabaseConfig {
        DatabaseConfig {
            host: "localhost".into(),
            port: 0,
            user: "board".into(),
            password: "secret".into(),
            dbname: dbname.into(),
        }
    }

    /// A database created and connected inside a fresh temp directory.
    pub fn connected() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("data"), 4);
        db.create_database(&config("board")).unwrap();
        db.connect(&config("board")).unwrap();
        (dir, db)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{config, connected};
    use super::*;

    #[test]
    fn status_before_connect_is_disconnected() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path(), 4);

        let status = db.status();
        assert!(!status.connected);
        assert_eq!(status.status, ConnectionState::Disconnected);
        assert!(matches!(db.users(), Err(DbError::NotConnected)));
    }

    #[test]
    fn create_database_twice_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("nested/data"), 4);

        db.create_database(&config("board")).unwrap();
        db.create_database(&config("board")).unwrap();
        assert!(dir.path().join("nested/data/board.db").is_file());
    }

    #[test]
    fn create_database_keeps_existing_rows() {
        let (_dir, db) = connected();
        db.users()
            .unwrap()
            .create(&board_types::api::CreateUserRequest {
                name: "kept".into(),
                email: None,
                age: 1,
            })
            .unwrap();

        db.create_database(&config("board")).unwrap();
        assert_eq!(db.users().unwrap().list().unwrap().len(), 1);
    }

    #[test]
    fn connect_to_unknown_database_fails_and_stays_disconnected() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path(), 4);

        let err = db.connect(&config("missing")).unwrap_err();
        assert!(matches!(err, DbError::Connection(_)));
        assert!(!db.status().connected);
    }

    #[test]
    fn path_like_names_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path(), 4);

        for name in ["", "../escape", "a/b", "x.db"] {
            let err = db.create_database(&config(name)).unwrap_err();
            assert!(matches!(err, DbError::InvalidName(_)), "{}", name);
        }
    }

    #[test]
    fn connected_status_reports_pool_metrics() {
        let (_dir, db) = connected();

        let status = db.status();
        assert!(status.connected);
        assert_eq!(status.status, ConnectionState::Connected);
        assert_eq!(status.database.as_deref(), Some("board"));
        let pool = status.pool.unwrap();
        assert_eq!(pool.in_use, 0);
        assert_eq!(pool.open_connections, pool.idle);
    }

    #[test]
    fn reconnect_replaces_the_pool() {
        let (_dir, db) = connected();
        db.create_database(&config("other")).unwrap();

        let before = db.pool().unwrap();
        db.connect(&config("other")).unwrap();
        let after = db.pool().unwrap();

        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(after.name(), "other");
    }

    #[test]
    fn failed_reconnect_keeps_current_connection() {
        let (_dir, db) = connected();
        db.connect(&config("missing")).unwrap_err();
        assert_eq!(db.pool().unwrap().name(), "board");
    }
}
