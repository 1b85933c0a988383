//! SQL execution on a [`DbContext`].
//!
//! Every call runs inside its own connection scope, so a standalone call
//! opens and releases a connection while calls inside an enclosing scope
//! share its connection. Statements are written with portable `?`
//! placeholders and rewritten for the driver before execution.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::context::DbContext;
use crate::driver::{BoxError, RawConnection, StatementMode};
use crate::error::{DbError, Result};
use crate::placeholder;
use crate::row::{Row, RowSchema};
use crate::value::Value;

/// Result shape of [`DbContext::select_with`].
#[derive(Debug, Clone, PartialEq)]
pub enum Selected {
    First(Option<Row>),
    All(Vec<Row>),
}

struct Fetched {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl DbContext {
    /// Run a query and materialize either its first row or all rows.
    pub fn select_with(&mut self, sql: &str, want_first: bool, args: &[Value]) -> Result<Selected> {
        let fetched = self.fetch(sql, args)?;
        let schema = RowSchema::from_columns(&fetched.columns);
        let mut rows = fetched.rows.into_iter();

        if want_first {
            Ok(Selected::First(rows.next().map(|raw| schema.materialize(raw))))
        } else {
            Ok(Selected::All(rows.map(|raw| schema.materialize(raw)).collect()))
        }
    }

    /// All rows, in the order the driver returns them.
    pub fn select(&mut self, sql: &str, args: &[Value]) -> Result<Vec<Row>> {
        match self.select_with(sql, false, args)? {
            Selected::All(rows) => Ok(rows),
            Selected::First(row) => Ok(row.into_iter().collect()),
        }
    }

    /// The first row, or `None` if the query matched nothing.
    pub fn select_one(&mut self, sql: &str, args: &[Value]) -> Result<Option<Row>> {
        match self.select_with(sql, true, args)? {
            Selected::First(row) => Ok(row),
            Selected::All(rows) => Ok(rows.into_iter().next()),
        }
    }

    /// The single value of a one-column query, taken from its first row.
    ///
    /// # Errors
    ///
    /// [`DbError::MultiColumns`] unless the result has exactly one column,
    /// [`DbError::NoRows`] if it has no rows.
    pub fn select_scalar(&mut self, sql: &str, args: &[Value]) -> Result<Value> {
        let fetched = self.fetch(sql, args)?;
        if fetched.columns.len() != 1 {
            return Err(DbError::MultiColumns {
                columns: fetched.columns.len(),
            });
        }

        fetched
            .rows
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next())
            .ok_or(DbError::NoRows)
    }

    /// Run a statement and return the number of affected rows.
    ///
    /// Outside a transaction the statement is committed immediately, or
    /// rolled back if it fails. Inside one, its effects wait for the outermost
    /// transaction to finish.
    pub fn execute(&mut self, sql: &str, args: &[Value]) -> Result<u64> {
        self.with_connection(|ctx| -> Result<u64> {
            let affected = match ctx.run(sql, args) {
                Ok(affected) => affected,
                Err(err) => {
                    if !ctx.in_transaction() {
                        if let Err(rollback_err) = ctx.rollback() {
                            warn!(error = %rollback_err, "rollback after failed statement failed");
                        }
                    }
                    return Err(err);
                }
            };
            if !ctx.in_transaction() {
                debug!("auto commit");
                ctx.commit_or_rollback()?;
            }
            Ok(affected)
        })
    }

    /// Alias of [`execute`](Self::execute).
    pub fn update(&mut self, sql: &str, args: &[Value]) -> Result<u64> {
        self.execute(sql, args)
    }

    /// Insert one row built from `(column, value)` pairs, in the given order.
    pub fn insert<I, K, V>(&mut self, table: &str, fields: I) -> Result<u64>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let (columns, args): (Vec<String>, Vec<Value>) = fields
            .into_iter()
            .map(|(column, value)| (quote_identifier(column.as_ref()), value.into()))
            .unzip();

        if columns.is_empty() {
            return Err(DbError::invalid_statement(format!(
                "no fields to insert into {}",
                table
            )));
        }

        let sql = format!(
            "insert into {} ({}) values ({})",
            quote_identifier(table),
            columns.join(","),
            vec!["?"; columns.len()].join(",")
        );
        self.execute(&sql, &args)
    }

    fn fetch(&mut self, sql: &str, args: &[Value]) -> Result<Fetched> {
        let native = placeholder::rewrite(sql, self.engine().placeholder_style());
        let threshold = self.engine().options().slow_statement_threshold;

        let mut scope = self.connection()?;
        let mode = scope.statement_mode();
        let started = Instant::now();
        let result = scope.cursor().and_then(|conn| {
            query_statement(conn, &native.sql, mode, args).map_err(DbError::driver)
        });
        profile(sql, started.elapsed(), threshold);
        result
    }

    fn run(&mut self, sql: &str, args: &[Value]) -> Result<u64> {
        let native = placeholder::rewrite(sql, self.engine().placeholder_style());
        let threshold = self.engine().options().slow_statement_threshold;

        let mode = self.statement_mode();
        let started = Instant::now();
        let result = self.cursor().and_then(|conn| {
            execute_statement(conn, &native.sql, mode, args).map_err(DbError::driver)
        });
        profile(sql, started.elapsed(), threshold);
        result
    }
}

// The prepared statement is dropped (the cursor closed) when these return,
// whichever way they return.
fn query_statement(
    conn: &mut dyn RawConnection,
    sql: &str,
    mode: StatementMode,
    args: &[Value],
) -> std::result::Result<Fetched, BoxError> {
    let mut stmt = conn.prepare(sql, mode)?;
    let rows = stmt.query(args)?;
    let columns = stmt.column_names();
    Ok(Fetched { columns, rows })
}

fn execute_statement(
    conn: &mut dyn RawConnection,
    sql: &str,
    mode: StatementMode,
    args: &[Value],
) -> std::result::Result<u64, BoxError> {
    let mut stmt = conn.prepare(sql, mode)?;
    stmt.execute(args)
}

fn profile(sql: &str, elapsed: Duration, threshold: Duration) {
    let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
    if elapsed > threshold {
        warn!(elapsed_ms, sql = %sql, "slow statement");
    } else {
        debug!(elapsed_ms, sql = %sql, "statement");
    }
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
