//! SQLite driver built on rusqlite (bundled SQLite, no system dependency).
//!
//! SQLite runs in autocommit mode by default. The first statement prepared in
//! [`StatementMode::Transaction`] issues `BEGIN IMMEDIATE`, so the write lock
//! is taken up front (waiting up to the busy timeout) instead of being
//! upgraded from a read lock later, which SQLite refuses without waiting.
//! `commit` and `rollback` close that transaction. Statements prepared in
//! [`StatementMode::Autocommit`] run in SQLite's own autocommit mode and hold
//! no lock once they finish.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::types::{ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params_from_iter, Connection, OpenFlags};
use tracing::debug;

use super::{BoxError, Connector, RawConnection, Statement, StatementMode};
use crate::placeholder::PlaceholderStyle;
use crate::value::Value;

/// Default time a statement waits on a locked database before failing.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Connection parameters for one SQLite database file.
#[derive(Debug, Clone)]
pub struct SqliteConnector {
    path: PathBuf,
    busy_timeout: Duration,
    create_if_missing: bool,
}

impl SqliteConnector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            create_if_missing: true,
        }
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// When false, connecting to a missing database file fails instead of
    /// creating it.
    pub fn create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a connection without boxing it.
    pub fn open(&self) -> rusqlite::Result<SqliteConnection> {
        let mut flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        if self.create_if_missing {
            flags |= OpenFlags::SQLITE_OPEN_CREATE;
        }

        let conn = Connection::open_with_flags(&self.path, flags)?;
        conn.busy_timeout(self.busy_timeout)?;

        Ok(SqliteConnection { conn })
    }
}

impl Connector for SqliteConnector {
    fn connect(&self) -> Result<Box<dyn RawConnection>, BoxError> {
        let conn = self.open()?;
        debug!(path = %self.path.display(), "opened sqlite connection");
        Ok(Box::new(conn))
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Indexed
    }

    fn describe(&self) -> String {
        format!("sqlite:{}", self.path.display())
    }
}

/// An open SQLite connection.
pub struct SqliteConnection {
    conn: Connection,
}

impl SqliteConnection {
    /// True while an implicit or explicit transaction is open.
    pub fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }
}

impl RawConnection for SqliteConnection {
    fn prepare<'c>(
        &'c mut self,
        sql: &str,
        mode: StatementMode,
    ) -> Result<Box<dyn Statement + 'c>, BoxError> {
        if mode == StatementMode::Transaction && self.conn.is_autocommit() {
            self.conn.execute_batch("BEGIN IMMEDIATE")?;
        }
        let stmt = self.conn.prepare(sql)?;
        Ok(Box::new(SqliteStatement { stmt }))
    }

    fn commit(&mut self) -> Result<(), BoxError> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("COMMIT")?;
        }
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), BoxError> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<(), BoxError> {
        self.conn.close().map_err(|(_, err)| err)?;
        Ok(())
    }
}

struct SqliteStatement<'c> {
    stmt: rusqlite::Statement<'c>,
}

impl Statement for SqliteStatement<'_> {
    fn column_names(&self) -> Vec<String> {
        self.stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect()
    }

    fn query(&mut self, args: &[Value]) -> Result<Vec<Vec<Value>>, BoxError> {
        let width = self.stmt.column_count();
        let mut rows = self.stmt.query(params_from_iter(args.iter()))?;

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(width);
            for idx in 0..width {
                values.push(from_value_ref(row.get_ref(idx)?));
            }
            out.push(values);
        }
        Ok(out)
    }

    fn execute(&mut self, args: &[Value]) -> Result<u64, BoxError> {
        let affected = self.stmt.execute(params_from_iter(args.iter()))?;
        Ok(affected as u64)
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let value = match self {
            Value::Null => ValueRef::Null,
            Value::Integer(n) => ValueRef::Integer(*n),
            Value::Real(f) => ValueRef::Real(*f),
            Value::Text(s) => ValueRef::Text(s.as_bytes()),
            Value::Blob(b) => ValueRef::Blob(b),
        };
        Ok(ToSqlOutput::Borrowed(value))
    }
}

fn from_value_ref(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(n) => Value::Integer(n),
        ValueRef::Real(f) => Value::Real(f),
        ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Blob(bytes.to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn connector() -> (TempDir, SqliteConnector) {
        let dir = TempDir::new().unwrap();
        let connector = SqliteConnector::new(dir.path().join("test.db"));
        (dir, connector)
    }

    fn count_rows(conn: &mut dyn RawConnection) -> i64 {
        let mut stmt = conn
            .prepare("SELECT COUNT(*) FROM t", StatementMode::Autocommit)
            .unwrap();
        stmt.query(&[]).unwrap()[0][0].as_i64().unwrap()
    }

    #[test]
    fn transaction_mode_opens_implicit_transaction() {
        let (_dir, connector) = connector();
        let mut conn = connector.open().unwrap();
        assert!(!conn.in_transaction());

        conn.prepare("CREATE TABLE t (id INTEGER)", StatementMode::Transaction)
            .unwrap()
            .execute(&[])
            .unwrap();
        assert!(conn.in_transaction());

        conn.commit().unwrap();
        assert!(!conn.in_transaction());
    }

    #[test]
    fn autocommit_mode_leaves_nothing_open() {
        let (_dir, connector) = connector();
        let mut conn = connector.open().unwrap();

        conn.prepare("CREATE TABLE t (id INTEGER)", StatementMode::Autocommit)
            .unwrap()
            .execute(&[])
            .unwrap();
        conn.prepare("SELECT * FROM t", StatementMode::Autocommit)
            .unwrap()
            .query(&[])
            .unwrap();
        assert!(!conn.in_transaction());

        conn.commit().unwrap();
        conn.rollback().unwrap();
    }

    #[test]
    fn rollback_discards_uncommitted_rows() {
        let (_dir, connector) = connector();
        let mut conn = connector.connect().unwrap();

        conn.prepare("CREATE TABLE t (id INTEGER)", StatementMode::Transaction)
            .unwrap()
            .execute(&[])
            .unwrap();
        conn.commit().unwrap();

        conn.prepare("INSERT INTO t (id) VALUES (?1)", StatementMode::Transaction)
            .unwrap()
            .execute(&[Value::Integer(1)])
            .unwrap();
        conn.rollback().unwrap();

        assert_eq!(count_rows(conn.as_mut()), 0);
        conn.close().unwrap();
    }

    #[test]
    fn values_keep_their_storage_class() {
        let (_dir, connector) = connector();
        let mut conn = connector.open().unwrap();

        let args = [
            Value::Null,
            Value::Integer(-7),
            Value::Real(1.25),
            Value::Text("héllo".into()),
            Value::Blob(vec![0, 159, 146, 150]),
        ];
        let mut stmt = conn
            .prepare("SELECT ?1, ?2, ?3, ?4, ?5", StatementMode::Autocommit)
            .unwrap();
        let rows = stmt.query(&args).unwrap();

        assert_eq!(rows, vec![args.to_vec()]);
    }

    #[test]
    fn wrong_argument_count_is_rejected() {
        let (_dir, connector) = connector();
        let mut conn = connector.open().unwrap();

        let mut stmt = conn
            .prepare("SELECT ?1, ?2", StatementMode::Autocommit)
            .unwrap();
        assert!(stmt.query(&[Value::Integer(1)]).is_err());
    }

    #[test]
    fn missing_file_fails_without_create() {
        let (dir, _) = connector();
        let connector = SqliteConnector::new(dir.path().join("absent.db")).create_if_missing(false);

        assert!(connector.connect().is_err());
        assert!(connector.describe().starts_with("sqlite:"));
    }
}
