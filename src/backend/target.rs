//! A single database we can send queries to.

use std::time::Duration;

use async_trait::async_trait;

use super::Context;

/// Transaction isolation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    /// Whatever the database is configured with.
    #[default]
    Default,
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

/// Options for starting a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransactionOptions {
    pub isolation: IsolationLevel,
    pub read_only: bool,
}

/// Connection handle to one database, primary or replica.
///
/// Implementations are expected to pool connections internally
/// and be safe to share between tasks. Every call that talks to the
/// database receives the caller's [`Context`].
#[async_trait]
pub trait Target: Send + Sync + 'static {
    /// Result set returned by [`Target::query`].
    type Rows: Send;
    /// Single row handle returned by [`Target::query_row`].
    type Row: Send;
    /// Prepared statement.
    type Statement: Send;
    /// Open transaction.
    type Transaction: Send;
    /// Result of a statement that returns no rows.
    type ExecResult: Send;
    /// Query parameter.
    type Param: Send + Sync;
    /// Error returned by the database client.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Check the database is reachable.
    async fn ping(&self, ctx: &Context) -> Result<(), Self::Error>;

    /// Run a query that returns rows.
    async fn query(
        &self,
        ctx: &Context,
        query: &str,
        params: &[Self::Param],
    ) -> Result<Self::Rows, Self::Error>;

    /// Run a query expected to return at most one row.
    /// Errors are reported when the row is read, not here.
    async fn query_row(&self, ctx: &Context, query: &str, params: &[Self::Param]) -> Self::Row;

    /// Run a statement that doesn't return rows.
    async fn execute(
        &self,
        ctx: &Context,
        query: &str,
        params: &[Self::Param],
    ) -> Result<Self::ExecResult, Self::Error>;

    /// Prepare a statement.
    async fn prepare(&self, ctx: &Context, query: &str) -> Result<Self::Statement, Self::Error>;

    /// Start a transaction. `None` uses the database defaults.
    async fn begin(
        &self,
        ctx: &Context,
        options: Option<&TransactionOptions>,
    ) -> Result<Self::Transaction, Self::Error>;

    /// Close the handle and all of its connections.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Maximum idle connections kept around. `0` keeps none.
    fn set_max_idle_connections(&self, n: usize);

    /// Maximum open connections. `0` is unlimited.
    fn set_max_open_connections(&self, n: usize);

    /// How long a connection may be reused. `None` reuses forever.
    fn set_connection_max_lifetime(&self, lifetime: Option<Duration>);
}
