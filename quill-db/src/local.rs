//! Per-thread context bound to the global engine.
//!
//! For code that cannot thread a [`DbContext`] through its calls (request
//! handlers dispatched by a framework, for example). Each thread gets its own
//! context, created on first use from the engine registered with
//! [`create_engine`](crate::create_engine).

use std::cell::RefCell;

use crate::context::DbContext;
use crate::engine::engine;
use crate::error::DbError;

thread_local! {
    static CONTEXT: RefCell<Option<DbContext>> = const { RefCell::new(None) };
}

/// Run `f` with the calling thread's context.
///
/// # Errors
///
/// [`DbError::EngineNotInitialized`] if no global engine exists yet, and
/// [`DbError::ContextBusy`] if called again from inside `f`; use the
/// context `f` receives instead.
pub fn with_context<T, E, F>(f: F) -> Result<T, E>
where
    F: FnOnce(&mut DbContext) -> Result<T, E>,
    E: From<DbError>,
{
    CONTEXT.with(|cell| {
        let mut slot = cell.try_borrow_mut().map_err(|_| DbError::ContextBusy)?;
        if slot.is_none() {
            *slot = Some(engine()?.context());
        }
        match slot.as_mut() {
            Some(ctx) => f(ctx),
            None => Err(DbError::EngineNotInitialized.into()),
        }
    })
}
