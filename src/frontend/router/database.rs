//! Everything a caller can do with a database handle.

use std::time::Duration;

use async_trait::async_trait;

use crate::backend::{Context, TransactionOptions};

/// Database handle used by application code.
///
/// [`super::Router`] implements it on top of a primary and replicas,
/// so code written against this trait doesn't need to know
/// reads and writes go to different places.
#[async_trait]
pub trait Database: Send + Sync {
    type Rows: Send;
    type Row: Send;
    type Statement: Send;
    type Transaction: Send;
    type ExecResult: Send;
    type Param: Send + Sync;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Check all databases are reachable.
    async fn ping(&self, ctx: &Context) -> Result<(), Self::Error>;

    /// Run a query that returns rows.
    async fn query(
        &self,
        ctx: &Context,
        query: &str,
        params: &[Self::Param],
    ) -> Result<Self::Rows, Self::Error>;

    /// Run a query expected to return at most one row.
    /// Errors are reported when the row is read.
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

    /// Close all connections.
    async fn close(&self) -> Result<(), Self::Error>;

    fn set_max_idle_connections(&self, n: usize);

    fn set_max_open_connections(&self, n: usize);

    fn set_connection_max_lifetime(&self, lifetime: Option<Duration>);
}
