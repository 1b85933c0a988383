//! Scoped connection and transaction acquisition.
//!
//! Both guards borrow the context mutably and dereference to it, so
//! statements run through the guard and nested scopes borrow the enclosing
//! guard. That makes scopes exit in reverse order of entry by construction.
//!
//! - [`ConnectionScope`] activates the context if it is inactive. Only the
//!   scope that activated it (the opener) releases the connection on exit;
//!   nested scopes are passengers.
//! - [`TransactionScope`] layers a nesting counter on top. Only the outermost
//!   transaction commits or rolls back, exactly once.

use std::ops::{Deref, DerefMut};

use tracing::{debug, warn};

use crate::context::DbContext;
use crate::error::{DbError, Result};

/// Keeps the context's connection alive for the lifetime of the guard.
pub struct ConnectionScope<'a> {
    ctx: &'a mut DbContext,
    opener: bool,
}

impl<'a> ConnectionScope<'a> {
    fn enter(ctx: &'a mut DbContext) -> Result<Self> {
        let opener = if ctx.is_active() {
            false
        } else {
            ctx.activate()?;
            true
        };
        Ok(Self { ctx, opener })
    }

    /// True if this scope activated the context and will release it.
    pub fn is_opener(&self) -> bool {
        self.opener
    }
}

impl Deref for ConnectionScope<'_> {
    type Target = DbContext;

    fn deref(&self) -> &DbContext {
        &*self.ctx
    }
}

impl DerefMut for ConnectionScope<'_> {
    fn deref_mut(&mut self) -> &mut DbContext {
        &mut *self.ctx
    }
}

impl Drop for ConnectionScope<'_> {
    fn drop(&mut self) {
        if self.opener {
            if let Err(err) = self.ctx.deactivate() {
                warn!(error = %err, "failed to release database connection");
            }
        }
    }
}

/// A reentrant transaction.
///
/// Call [`commit`](Self::commit) when the body succeeded. Dropping the guard
/// without committing (early `?` return, panic) is the failure exit: the
/// outermost scope then rolls back.
pub struct TransactionScope<'a> {
    // Dropped after `Drop::drop` below, so commit/rollback always precede
    // the connection release.
    conn: ConnectionScope<'a>,
    finished: bool,
}

impl<'a> TransactionScope<'a> {
    fn enter(ctx: &'a mut DbContext) -> Result<Self> {
        let mut conn = ConnectionScope::enter(ctx)?;
        conn.enter_transaction()?;
        Ok(Self {
            conn,
            finished: false,
        })
    }

    /// True if this is the outermost transaction on the context.
    pub fn is_outermost(&self) -> bool {
        self.conn.depth() == 1
    }

    /// Leave the scope successfully. The outermost scope commits; a failed
    /// commit is rolled back and reported as [`DbError::CommitFailed`].
    pub fn commit(mut self) -> Result<()> {
        self.finished = true;
        let remaining = self.conn.leave_transaction();
        if remaining > 0 {
            debug!(depth = remaining, "leaving nested transaction");
            return Ok(());
        }
        self.conn.commit_or_rollback()
    }
}

impl Deref for TransactionScope<'_> {
    type Target = DbContext;

    fn deref(&self) -> &DbContext {
        &self.conn
    }
}

impl DerefMut for TransactionScope<'_> {
    fn deref_mut(&mut self) -> &mut DbContext {
        &mut self.conn
    }
}

impl Drop for TransactionScope<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let remaining = self.conn.leave_transaction();
        if remaining > 0 {
            debug!(depth = remaining, "nested transaction aborted");
            return;
        }
        if let Err(err) = self.conn.rollback() {
            warn!(error = %err, "rollback failed");
        }
    }
}

impl DbContext {
    /// Enter a connection scope on this context.
    pub fn connection(&mut self) -> Result<ConnectionScope<'_>> {
        ConnectionScope::enter(self)
    }

    /// Enter a (possibly nested) transaction scope on this context.
    pub fn transaction(&mut self) -> Result<TransactionScope<'_>> {
        TransactionScope::enter(self)
    }

    /// Run `f` with the connection held open for its whole duration.
    pub fn with_connection<T, E, F>(&mut self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut DbContext) -> std::result::Result<T, E>,
        E: From<DbError>,
    {
        let mut scope = self.connection()?;
        f(&mut scope)
    }

    /// Run `f` inside a transaction. `Ok` commits (if outermost), `Err` rolls
    /// back (if outermost) and is returned unchanged.
    pub fn with_transaction<T, E, F>(&mut self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut DbContext) -> std::result::Result<T, E>,
        E: From<DbError>,
    {
        let mut tx = self.transaction()?;
        let value = f(&mut tx)?;
        tx.commit()?;
        Ok(value)
    }
}
