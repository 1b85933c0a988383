//! Connection that opens on first use.

use tracing::debug;

use crate::driver::RawConnection;
use crate::engine::Engine;
use crate::error::{DbError, Result};

/// At most one raw connection, opened by the first cursor request.
#[derive(Default)]
pub enum LazyConnection {
    #[default]
    Unopened,
    Open(Box<dyn RawConnection>),
}

impl LazyConnection {
    pub fn new() -> Self {
        Self::Unopened
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open(_))
    }

    /// The raw connection statements are prepared on, connecting first if
    /// nothing is open yet.
    pub fn cursor(&mut self, engine: &Engine) -> Result<&mut dyn RawConnection> {
        if let Self::Unopened = self {
            let raw = engine.connect()?;
            debug!(target_db = %engine.describe(), "lazy connection opened");
            *self = Self::Open(raw);
        }

        match self {
            Self::Open(raw) => Ok(raw.as_mut()),
            Self::Unopened => Err(DbError::NotConnected),
        }
    }

    pub fn commit(&mut self) -> Result<()> {
        match self {
            Self::Open(raw) => raw.commit().map_err(DbError::driver),
            Self::Unopened => Err(DbError::NotConnected),
        }
    }

    pub fn rollback(&mut self) -> Result<()> {
        match self {
            Self::Open(raw) => raw.rollback().map_err(DbError::driver),
            Self::Unopened => Err(DbError::NotConnected),
        }
    }

    /// Close the raw connection if one is open. Calling it again is a no-op.
    ///
    /// The handle is dropped even when closing reports an error.
    pub fn release(&mut self) -> Result<()> {
        match std::mem::take(self) {
            Self::Open(raw) => {
                debug!("closing lazy connection");
                raw.close().map_err(DbError::driver)
            }
            Self::Unopened => Ok(()),
        }
    }
}

impl std::fmt::Debug for LazyConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unopened => f.write_str("LazyConnection::Unopened"),
            Self::Open(_) => f.write_str("LazyConnection::Open"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::SqliteConnector;
    use crate::engine::EngineOptions;
    use tempfile::TempDir;

    fn engine(dir: &TempDir) -> Engine {
        Engine::new(
            SqliteConnector::new(dir.path().join("lazy.db")),
            EngineOptions::default(),
        )
    }

    #[test]
    fn opens_on_first_cursor_only() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        let mut conn = LazyConnection::new();

        assert!(!conn.is_open());
        assert!(!dir.path().join("lazy.db").exists());

        conn.cursor(&engine).unwrap();
        assert!(conn.is_open());
        assert!(dir.path().join("lazy.db").exists());

        conn.cursor(&engine).unwrap();
        assert!(conn.is_open());
    }

    #[test]
    fn commit_and_rollback_need_a_connection() {
        let mut conn = LazyConnection::new();

        assert!(matches!(conn.commit(), Err(DbError::NotConnected)));
        assert!(matches!(conn.rollback(), Err(DbError::NotConnected)));
    }

    #[test]
    fn release_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        let mut conn = LazyConnection::new();

        conn.cursor(&engine).unwrap();
        conn.release().unwrap();
        assert!(!conn.is_open());

        conn.release().unwrap();
        assert!(!conn.is_open());
    }

    #[test]
    fn failed_connect_leaves_connection_unopened() {
        let dir = TempDir::new().unwrap();
        let engine = Engine::new(
            SqliteConnector::new(dir.path().join("nope/lazy.db")),
            EngineOptions::default(),
        );
        let mut conn = LazyConnection::new();

        assert!(matches!(
            conn.cursor(&engine),
            Err(DbError::ConnectFailed { .. })
        ));
        assert!(!conn.is_open());
    }
}
