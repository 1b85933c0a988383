//! Process-wide connection factory.
//!
//! The engine holds the connector (stored connection parameters plus the
//! connect function) and engine-level options. It is immutable once built and
//! cheap to clone; every clone shares the same connector.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use tracing::{info, warn};

use crate::context::DbContext;
use crate::driver::{Connector, RawConnection};
use crate::error::{DbError, Result};
use crate::placeholder::PlaceholderStyle;

/// Statements running longer than this are logged as slow.
pub const DEFAULT_SLOW_STATEMENT_THRESHOLD: Duration = Duration::from_millis(100);

static ENGINE: OnceCell<Engine> = OnceCell::new();

/// Engine-level tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    pub slow_statement_threshold: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            slow_statement_threshold: DEFAULT_SLOW_STATEMENT_THRESHOLD,
        }
    }
}

/// Shared, read-only connection factory.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    connector: Box<dyn Connector>,
    options: EngineOptions,
}

/// Create the process-global engine.
///
/// # Errors
///
/// Returns [`DbError::EngineAlreadyInitialized`] if a global engine exists.
pub fn create_engine(connector: impl Connector + 'static, options: EngineOptions) -> Result<Engine> {
    let engine = Engine::new(connector, options);
    ENGINE
        .set(engine.clone())
        .map_err(|_| DbError::EngineAlreadyInitialized)?;

    info!(target_db = %engine.describe(), "database engine initialized");
    Ok(engine)
}

/// The process-global engine created by [`create_engine`].
pub fn engine() -> Result<Engine> {
    ENGINE.get().cloned().ok_or(DbError::EngineNotInitialized)
}

impl Engine {
    /// Build an engine that is not registered globally.
    pub fn new(connector: impl Connector + 'static, options: EngineOptions) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                connector: Box::new(connector),
                options,
            }),
        }
    }

    /// Open a new physical connection. Failures are not retried.
    pub fn connect(&self) -> Result<Box<dyn RawConnection>> {
        self.inner.connector.connect().map_err(|source| {
            warn!(target_db = %self.describe(), error = %source, "connection attempt failed");
            DbError::ConnectFailed { source }
        })
    }

    /// A fresh context for the calling execution unit.
    pub fn context(&self) -> DbContext {
        DbContext::new(self.clone())
    }

    pub fn placeholder_style(&self) -> PlaceholderStyle {
        self.inner.connector.placeholder_style()
    }

    pub fn options(&self) -> &EngineOptions {
        &self.inner.options
    }

    pub fn describe(&self) -> String {
        self.inner.connector.describe()
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("connector", &self.describe())
            .field("options", &self.inner.options)
            .finish()
    }
}
