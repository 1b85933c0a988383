//! quill-db - database access layer for the quill blog
//!
//! - [`Engine`]: process-wide connection factory
//! - [`DbContext`]: one per thread or task, owning at most one lazily opened
//!   connection and the transaction nesting depth
//! - [`ConnectionScope`] / [`TransactionScope`]: reentrant scoped acquisition;
//!   only the outermost scope releases the connection or finishes the
//!   transaction
//! - statement execution (`select`, `select_one`, `select_scalar`,
//!   `execute`, `insert`) with portable `?` placeholders
//!
//! ```ignore
//! let engine = QuillConfig::load()?.database.create_engine()?;
//! let mut ctx = engine.context();
//!
//! ctx.with_transaction(|ctx| -> quill_db::Result<()> {
//!     ctx.insert("user", [("id", next_id()), ("name", "Alice".to_string())])?;
//!     ctx.execute("update blogs set user_name = ? where user_id = ?", args!["Alice", "u1"])?;
//!     Ok(())
//! })?;
//! ```

pub mod config;
pub mod connection;
pub mod context;
pub mod driver;
pub mod engine;
pub mod error;
pub mod executor;
pub mod id;
pub mod local;
pub mod placeholder;
pub mod row;
pub mod scope;
pub mod value;

pub use config::{DatabaseConfig, QuillConfig};
pub use connection::LazyConnection;
pub use context::DbContext;
pub use driver::{
    BoxError, Connector, RawConnection, SqliteConnector, Statement, StatementMode,
};
pub use engine::{create_engine, engine, Engine, EngineOptions};
pub use error::{DbError, Result};
pub use executor::Selected;
pub use id::next_id;
pub use local::with_context;
pub use placeholder::PlaceholderStyle;
pub use row::{Row, RowSchema};
pub use scope::{ConnectionScope, TransactionScope};
pub use value::Value;
