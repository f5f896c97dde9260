//! In-process target for testing code that uses the router.
//!
//! A [`MockTarget`] behaves like a healthy database until it's closed.
//! It records what was asked of it and can be made slow or made to
//! fail on close.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::time::sleep;

use super::{Context, Interrupted, Target, TransactionOptions};

/// Mock database error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MockError {
    #[error("database is closed")]
    Closed,

    #[error("{0}")]
    Injected(String),

    #[error("{0}")]
    Interrupted(#[from] Interrupted),
}

/// Query parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

/// Rows returned by a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockRows {
    /// Name of the target that ran the query.
    pub target: String,
    pub query: String,
    pub columns: Vec<String>,
}

/// Single row; errors surface when it's scanned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockRow {
    result: Result<MockRows, MockError>,
}

impl MockRow {
    /// Read the row.
    pub fn scan(self) -> Result<MockRows, MockError> {
        self.result
    }
}

/// Prepared statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockStatement {
    pub target: String,
    pub query: String,
    pub columns: Vec<String>,
}

/// Open transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockTransaction {
    pub target: String,
    pub options: TransactionOptions,
}

/// Result of an execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecResult {
    pub last_insert_id: i64,
    pub rows_affected: u64,
}

/// How many times each operation was called.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Calls {
    pub ping: usize,
    pub query: usize,
    pub query_row: usize,
    pub execute: usize,
    pub prepare: usize,
    pub begin: usize,
    pub close: usize,
}

/// Pool settings last applied to the target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Settings {
    pub max_idle_connections: Option<usize>,
    pub max_open_connections: Option<usize>,
    pub connection_max_lifetime: Option<Option<Duration>>,
}

/// Ordered record of operations across several targets.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, target: &str, operation: &str) {
        self.entries.lock().push(format!("{} {}", target, operation));
    }

    /// Entries, formatted as `"<target> <operation>"`.
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }
}

#[derive(Debug, Default)]
struct State {
    closed: bool,
    close_error: Option<String>,
    columns: Vec<String>,
    latency: Duration,
    calls: Calls,
    settings: Settings,
    last_insert_id: i64,
}

/// Mock database target.
#[derive(Debug)]
pub struct MockTarget {
    name: String,
    state: Mutex<State>,
    journal: Option<Journal>,
}

impl MockTarget {
    /// Create a healthy target.
    pub fn new(name: impl ToString) -> Self {
        Self {
            name: name.to_string(),
            state: Mutex::new(State::default()),
            journal: None,
        }
    }

    /// Record operations in `journal`.
    pub fn with_journal(mut self, journal: &Journal) -> Self {
        self.journal = Some(journal.clone());
        self
    }

    /// Columns returned by every query and statement.
    pub fn with_columns(self, columns: &[&str]) -> Self {
        self.state.lock().columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Delay every database call by `latency`.
    pub fn with_latency(self, latency: Duration) -> Self {
        self.state.lock().latency = latency;
        self
    }

    /// Make [`Target::close`] fail with `message`. The target still closes.
    pub fn fail_close(&self, message: impl ToString) {
        self.state.lock().close_error = Some(message.to_string());
    }

    /// Target name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Target is closed.
    pub fn closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Call counters.
    pub fn calls(&self) -> Calls {
        self.state.lock().calls
    }

    /// Applied pool settings.
    pub fn settings(&self) -> Settings {
        self.state.lock().settings
    }

    /// Count the call, wait out the latency and check we're still open.
    async fn enter(
        &self,
        ctx: &Context,
        operation: &str,
        count: fn(&mut Calls),
    ) -> Result<(), MockError> {
        let latency = {
            let mut state = self.state.lock();
            count(&mut state.calls);
            state.latency
        };

        if let Some(ref journal) = self.journal {
            journal.record(&self.name, operation);
        }

        ctx.run(sleep(latency)).await?;

        if self.closed() {
            Err(MockError::Closed)
        } else {
            Ok(())
        }
    }

    fn rows(&self, query: &str) -> MockRows {
        MockRows {
            target: self.name.clone(),
            query: query.to_string(),
            columns: self.state.lock().columns.clone(),
        }
    }
}

#[async_trait]
impl Target for MockTarget {
    type Rows = MockRows;
    type Row = MockRow;
    type Statement = MockStatement;
    type Transaction = MockTransaction;
    type ExecResult = ExecResult;
    type Param = Value;
    type Error = MockError;

    async fn ping(&self, ctx: &Context) -> Result<(), MockError> {
        self.enter(ctx, "ping", |calls| calls.ping += 1).await
    }

    async fn query(
        &self,
        ctx: &Context,
        query: &str,
        _params: &[Value],
    ) -> Result<MockRows, MockError> {
        self.enter(ctx, "query", |calls| calls.query += 1).await?;
        Ok(self.rows(query))
    }

    async fn query_row(&self, ctx: &Context, query: &str, _params: &[Value]) -> MockRow {
        let result = self
            .enter(ctx, "query_row", |calls| calls.query_row += 1)
            .await
            .map(|_| self.rows(query));
        MockRow { result }
    }

    async fn execute(
        &self,
        ctx: &Context,
        _query: &str,
        _params: &[Value],
    ) -> Result<ExecResult, MockError> {
        self.enter(ctx, "execute", |calls| calls.execute += 1).await?;
        let mut state = self.state.lock();
        state.last_insert_id += 1;
        Ok(ExecResult {
            last_insert_id: state.last_insert_id,
            rows_affected: 1,
        })
    }

    async fn prepare(&self, ctx: &Context, query: &str) -> Result<MockStatement, MockError> {
        self.enter(ctx, "prepare", |calls| calls.prepare += 1).await?;
        let rows = self.rows(query);
        Ok(MockStatement {
            target: rows.target,
            query: rows.query,
            columns: rows.columns,
        })
    }

    async fn begin(
        &self,
        ctx: &Context,
        options: Option<&TransactionOptions>,
    ) -> Result<MockTransaction, MockError> {
        self.enter(ctx, "begin", |calls| calls.begin += 1).await?;
        Ok(MockTransaction {
            target: self.name.clone(),
            options: options.copied().unwrap_or_default(),
        })
    }

    async fn close(&self) -> Result<(), MockError> {
        if let Some(ref journal) = self.journal {
            journal.record(&self.name, "close");
        }

        let mut state = self.state.lock();
        state.calls.close += 1;
        state.closed = true;

        match state.close_error {
            Some(ref message) => Err(MockError::Injected(message.clone())),
            None => Ok(()),
        }
    }

    fn set_max_idle_connections(&self, n: usize) {
        self.state.lock().settings.max_idle_connections = Some(n);
    }

    fn set_max_open_connections(&self, n: usize) {
        self.state.lock().settings.max_open_connections = Some(n);
    }

    fn set_connection_max_lifetime(&self, lifetime: Option<Duration>) {
        self.state.lock().settings.connection_max_lifetime = Some(lifetime);
    }
}
