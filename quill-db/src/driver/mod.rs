//! The capability set quill needs from a relational store.
//!
//! A driver supplies three things:
//! - a [`Connector`] that opens independent raw connections and may be called
//!   from any thread
//! - a [`RawConnection`] that prepares statements and commits or rolls back
//!   the work done since the last commit
//! - a [`Statement`] (the cursor) that runs one SQL text and is released when
//!   dropped
//!
//! Each statement is prepared in a [`StatementMode`]. Statements prepared in
//! `Transaction` mode accumulate in a transaction until `commit` or
//! `rollback`; `Autocommit` statements may become durable as soon as they run,
//! and a following `commit` must then be harmless.

pub mod sqlite;

use crate::placeholder::PlaceholderStyle;
use crate::value::Value;

pub use sqlite::{SqliteConnection, SqliteConnector};

/// Error type drivers report. The original error is kept for downcasting.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Whether a statement runs inside an enclosing transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementMode {
    /// No transaction is open on the context; nothing is left pending after
    /// the statement.
    Autocommit,
    /// Part of the current transaction.
    Transaction,
}

/// Opens raw connections from stored parameters.
pub trait Connector: Send + Sync {
    fn connect(&self) -> Result<Box<dyn RawConnection>, BoxError>;

    /// Native placeholder syntax statements must be rewritten to.
    fn placeholder_style(&self) -> PlaceholderStyle;

    /// Short label for logs (never contains credentials).
    fn describe(&self) -> String;
}

/// One open physical connection.
pub trait RawConnection: Send {
    fn prepare<'c>(
        &'c mut self,
        sql: &str,
        mode: StatementMode,
    ) -> Result<Box<dyn Statement + 'c>, BoxError>;

    fn commit(&mut self) -> Result<(), BoxError>;

    fn rollback(&mut self) -> Result<(), BoxError>;

    fn close(self: Box<Self>) -> Result<(), BoxError>;
}

/// A prepared statement bound to its connection.
pub trait Statement {
    /// Column names in result order. Empty for statements that return no rows.
    fn column_names(&self) -> Vec<String>;

    /// Run the statement and fetch every row, values in column order.
    fn query(&mut self, args: &[Value]) -> Result<Vec<Vec<Value>>, BoxError>;

    /// Run the statement and return the number of affected rows.
    fn execute(&mut self, args: &[Value]) -> Result<u64, BoxError>;
}
