//! Shared fixtures: a SQLite connector that counts lifecycle calls and can
//! inject commit/rollback failures.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use quill_db::{
    args, BoxError, Connector, DbContext, Engine, EngineOptions, PlaceholderStyle, RawConnection,
    SqliteConnector, Statement, StatementMode,
};
use tempfile::TempDir;

#[derive(Debug, Default)]
pub struct Counters {
    connects: AtomicUsize,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
    closes: AtomicUsize,
    fail_commit: AtomicBool,
    fail_rollback: AtomicBool,
}

impl Counters {
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn rollbacks(&self) -> usize {
        self.rollbacks.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn fail_commit(&self, fail: bool) {
        self.fail_commit.store(fail, Ordering::SeqCst);
    }

    pub fn fail_rollback(&self, fail: bool) {
        self.fail_rollback.store(fail, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        for counter in [&self.connects, &self.commits, &self.rollbacks, &self.closes] {
            counter.store(0, Ordering::SeqCst);
        }
        self.fail_commit(false);
        self.fail_rollback(false);
    }
}

pub struct RecordingConnector {
    inner: SqliteConnector,
    counters: Arc<Counters>,
}

impl Connector for RecordingConnector {
    fn connect(&self) -> Result<Box<dyn RawConnection>, BoxError> {
        let inner = self.inner.connect()?;
        self.counters.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(RecordingConnection {
            inner,
            counters: Arc::clone(&self.counters),
        }))
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        self.inner.placeholder_style()
    }

    fn describe(&self) -> String {
        format!("recording+{}", self.inner.describe())
    }
}

struct RecordingConnection {
    inner: Box<dyn RawConnection>,
    counters: Arc<Counters>,
}

impl RawConnection for RecordingConnection {
    fn prepare<'c>(
        &'c mut self,
        sql: &str,
        mode: StatementMode,
    ) -> Result<Box<dyn Statement + 'c>, BoxError> {
        self.inner.prepare(sql, mode)
    }

    fn commit(&mut self) -> Result<(), BoxError> {
        self.counters.commits.fetch_add(1, Ordering::SeqCst);
        if self.counters.fail_commit.load(Ordering::SeqCst) {
            return Err("injected commit failure".into());
        }
        self.inner.commit()
    }

    fn rollback(&mut self) -> Result<(), BoxError> {
        self.counters.rollbacks.fetch_add(1, Ordering::SeqCst);
        if self.counters.fail_rollback.load(Ordering::SeqCst) {
            return Err("injected rollback failure".into());
        }
        self.inner.rollback()
    }

    fn close(self: Box<Self>) -> Result<(), BoxError> {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
        self.inner.close()
    }
}

/// A fresh database with a `user` table and zeroed counters.
pub struct Harness {
    pub dir: TempDir,
    pub engine: Engine,
    pub counters: Arc<Counters>,
}

impl Harness {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let counters = Arc::new(Counters::default());
        let engine = Engine::new(
            RecordingConnector {
                inner: SqliteConnector::new(dir.path().join("blog.db")),
                counters: Arc::clone(&counters),
            },
            EngineOptions::default(),
        );

        engine
            .context()
            .execute(
                "create table user (id varchar(50) primary key, name varchar(50))",
                args![],
            )
            .unwrap();
        counters.reset();

        Self {
            dir,
            engine,
            counters,
        }
    }

    pub fn context(&self) -> DbContext {
        self.engine.context()
    }

    /// Look a user up through a separate context, so only committed data is
    /// visible.
    pub fn committed_name(&self, id: &str) -> Option<String> {
        let row = self
            .engine
            .context()
            .select_one("select name from user where id = ?", args![id])
            .unwrap()?;
        row.get_str("name").map(str::to_string)
    }
}
