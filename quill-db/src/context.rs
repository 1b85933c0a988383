//! Per-execution-unit database state.
//!
//! Each thread or task owns exactly one [`DbContext`]. It holds at most one
//! lazy connection and the transaction nesting depth. Every operation takes
//! `&mut self` and the type is not `Sync`, so a context cannot be shared
//! between units without the caller adding explicit synchronisation.

use tracing::{debug, error, info, warn};

use crate::connection::LazyConnection;
use crate::driver::{RawConnection, StatementMode};
use crate::engine::Engine;
use crate::error::{DbError, Result};

pub struct DbContext {
    engine: Engine,
    connection: Option<LazyConnection>,
    depth: usize,
}

impl DbContext {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine,
            connection: None,
            depth: 0,
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// True while a lazy connection is held.
    pub fn is_active(&self) -> bool {
        self.connection.is_some()
    }

    /// True once the held lazy connection has actually connected.
    pub fn is_connected(&self) -> bool {
        self.connection.as_ref().is_some_and(LazyConnection::is_open)
    }

    /// Current transaction nesting depth (0 outside any transaction).
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn in_transaction(&self) -> bool {
        self.depth > 0
    }

    /// Attach a new (unopened) lazy connection and reset the depth.
    pub fn activate(&mut self) -> Result<()> {
        if self.is_active() {
            return Err(DbError::AlreadyActive);
        }
        self.connection = Some(LazyConnection::new());
        self.depth = 0;
        debug!("database context activated");
        Ok(())
    }

    /// Release the held connection and clear all state.
    pub fn deactivate(&mut self) -> Result<()> {
        let mut connection = self.connection.take().ok_or(DbError::NotActive)?;
        self.depth = 0;
        debug!("database context deactivated");
        connection.release()
    }

    /// How the next statement relates to the transaction state.
    pub(crate) fn statement_mode(&self) -> StatementMode {
        if self.in_transaction() {
            StatementMode::Transaction
        } else {
            StatementMode::Autocommit
        }
    }

    /// The raw connection for the next statement, connecting on first use.
    pub(crate) fn cursor(&mut self) -> Result<&mut dyn RawConnection> {
        let engine = &self.engine;
        self.connection
            .as_mut()
            .ok_or(DbError::NotActive)?
            .cursor(engine)
    }

    pub(crate) fn enter_transaction(&mut self) -> Result<usize> {
        if !self.is_active() {
            return Err(DbError::NotActive);
        }
        self.depth += 1;
        if self.depth == 1 {
            info!("begin transaction");
        } else {
            debug!(depth = self.depth, "join existing transaction");
        }
        Ok(self.depth)
    }

    /// Decrement the depth; returns the depth left after leaving.
    pub(crate) fn leave_transaction(&mut self) -> usize {
        self.depth = self.depth.saturating_sub(1);
        self.depth
    }

    /// Commit the work on the held connection. A failed commit is rolled back
    /// and reported as [`DbError::CommitFailed`]; if that rollback fails too,
    /// the rollback error is returned instead.
    pub(crate) fn commit_or_rollback(&mut self) -> Result<()> {
        let connection = match self.connection.as_mut() {
            Some(connection) if connection.is_open() => connection,
            _ => {
                debug!("nothing to commit, connection never opened");
                return Ok(());
            }
        };

        info!("commit");
        let commit_err = match connection.commit() {
            Ok(()) => {
                info!("commit ok");
                return Ok(());
            }
            Err(DbError::Driver { source }) => source,
            Err(other) => return Err(other),
        };

        warn!(error = %commit_err, "commit failed, rolling back");
        match connection.rollback() {
            Ok(()) => {
                info!("rollback ok");
                Err(DbError::commit_failed(commit_err))
            }
            Err(rollback_err) => {
                error!(
                    commit_error = %commit_err,
                    rollback_error = %rollback_err,
                    "rollback after failed commit also failed"
                );
                Err(rollback_err)
            }
        }
    }

    pub(crate) fn rollback(&mut self) -> Result<()> {
        match self.connection.as_mut() {
            Some(connection) if connection.is_open() => {
                info!("rollback");
                connection.rollback()?;
                info!("rollback ok");
                Ok(())
            }
            _ => {
                debug!("nothing to roll back, connection never opened");
                Ok(())
            }
        }
    }
}

impl std::fmt::Debug for DbContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbContext")
            .field("engine", &self.engine)
            .field("connection", &self.connection)
            .field("depth", &self.depth)
            .finish()
    }
}
