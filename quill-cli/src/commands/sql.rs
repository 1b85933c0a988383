//! Statement commands: exec, query, scalar, insert, tx
//!
//! Each command registers the global engine from the resolved config and runs
//! on the calling thread's context.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use quill_db::{with_context, QuillConfig, Value};
use tracing::{debug, info};

#[derive(Parser, Debug)]
pub struct StatementArgs {
    /// SQL with `?` placeholders
    pub sql: String,

    /// Values bound to the placeholders, in order
    #[arg(allow_hyphen_values = true)]
    pub args: Vec<String>,
}

#[derive(Parser, Debug)]
pub struct QueryArgs {
    #[command(flatten)]
    pub statement: StatementArgs,

    /// Print only the first row (or null)
    #[arg(long)]
    pub first: bool,
}

#[derive(Parser, Debug)]
pub struct InsertArgs {
    /// Table to insert into
    pub table: String,

    /// Column values as COLUMN=VALUE
    #[arg(required = true)]
    pub fields: Vec<String>,
}

#[derive(Parser, Debug)]
pub struct TxArgs {
    /// Statement to run; repeat for more (all commit or none do)
    #[arg(short = 'e', long = "execute", required = true)]
    pub statements: Vec<String>,
}

pub fn run_exec(config: &QuillConfig, args: StatementArgs) -> Result<()> {
    register_engine(config)?;
    let values = parse_values(&args.args);

    let affected = with_context(|ctx| ctx.execute(&args.sql, &values))?;
    println!("{}", affected);
    Ok(())
}

pub fn run_query(config: &QuillConfig, args: QueryArgs) -> Result<()> {
    register_engine(config)?;
    let values = parse_values(&args.statement.args);
    let sql = &args.statement.sql;

    let output = if args.first {
        let row = with_context(|ctx| ctx.select_one(sql, &values))?;
        serde_json::to_string_pretty(&row)?
    } else {
        let rows = with_context(|ctx| ctx.select(sql, &values))?;
        serde_json::to_string_pretty(&rows)?
    };
    println!("{}", output);
    Ok(())
}

pub fn run_scalar(config: &QuillConfig, args: StatementArgs) -> Result<()> {
    register_engine(config)?;
    let values = parse_values(&args.args);

    let value = with_context(|ctx| ctx.select_scalar(&args.sql, &values))?;
    println!("{}", value);
    Ok(())
}

pub fn run_insert(config: &QuillConfig, args: InsertArgs) -> Result<()> {
    register_engine(config)?;
    let fields = args
        .fields
        .iter()
        .map(|field| parse_field(field))
        .collect::<Result<Vec<_>>>()?;

    let affected = with_context(|ctx| ctx.insert(&args.table, fields))?;
    println!("{}", affected);
    Ok(())
}

pub fn run_tx(config: &QuillConfig, args: TxArgs) -> Result<()> {
    register_engine(config)?;

    let affected = with_context(|ctx| {
        ctx.with_transaction(|ctx| -> Result<u64> {
            let mut total = 0;
            for (index, sql) in args.statements.iter().enumerate() {
                total += ctx
                    .execute(sql, &[])
                    .with_context(|| format!("Statement {} failed: {}", index + 1, sql))?;
            }
            Ok(total)
        })
    })?;

    info!(statements = args.statements.len(), affected, "transaction committed");
    println!("{}", affected);
    Ok(())
}

fn register_engine(config: &QuillConfig) -> Result<()> {
    let engine = config
        .database
        .create_engine()
        .context("Failed to initialize database engine")?;
    debug!(target_db = %engine.describe(), "engine ready");
    Ok(())
}

fn parse_values(raw: &[String]) -> Vec<Value> {
    raw.iter().map(|arg| Value::parse_literal(arg)).collect()
}

fn parse_field(raw: &str) -> Result<(String, Value)> {
    let (column, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("Expected COLUMN=VALUE, got '{}'", raw))?;
    let column = column.trim();
    if column.is_empty() {
        return Err(anyhow!("Missing column name in '{}'", raw));
    }
    Ok((column.to_string(), Value::parse_literal(value)))
}
