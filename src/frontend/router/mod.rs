//! Read/write router.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::backend::pool::{check_all, Error, Replicas};
use crate::backend::{Context, Target, TransactionOptions};
use crate::config;

pub mod database;
pub mod route;

pub use database::Database;
pub use route::Route;


/// Sends reads to replicas and everything else to the primary.
///
/// Safe to share between tasks; the only state it mutates is
/// the replica rotation counter.
pub struct Router<T: Target> {
    primary: T,
    replicas: Replicas<T>,
}

impl<T: Target> std::fmt::Debug for Router<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("replicas", &self.replicas.len())
            .field("round_robin", &self.replicas.round_robin().position())
            .finish()
    }
}

impl<T: Target> Router<T> {
    /// Create new router. At least one replica is required.
    pub fn new(primary: T, replicas: Vec<Arc<T>>) -> Result<Self, Error<T::Error>> {
        let replicas = Replicas::new(replicas)?;
        debug!("router created with {} replicas", replicas.len());

        Ok(Self { primary, replicas })
    }

    /// Primary handle.
    pub fn primary(&self) -> &T {
        &self.primary
    }

    /// Replica handles.
    pub fn replicas(&self) -> &[Arc<T>] {
        self.replicas.targets()
    }

    /// Number of replicas.
    pub fn len(&self) -> usize {
        self.replicas.len()
    }

    /// There are no replicas.
    pub fn is_empty(&self) -> bool {
        self.replicas.is_empty()
    }

    /// Apply pool settings from config to all databases.
    pub fn configure(&self, pool: &config::Pool) {
        if let Some(n) = pool.max_idle_connections {
            self.set_max_idle_connections(n);
        }

        if let Some(n) = pool.max_open_connections {
            self.set_max_open_connections(n);
        }

        if pool.connection_max_lifetime.is_some() {
            self.set_connection_max_lifetime(pool.connection_max_lifetime());
        }
    }

    /// Prepare a statement on a replica, failing over to
    /// the other replicas if it can't be prepared there.
    pub async fn prepare_for_read(
        &self,
        ctx: &Context,
        query: &str,
    ) -> Result<T::Statement, Error<T::Error>> {
        self.replicas
            .read(|replica| async move { replica.prepare(ctx, query).await })
            .await
    }

    /// Prepare a statement on the primary.
    pub async fn prepare_for_write(
        &self,
        ctx: &Context,
        query: &str,
    ) -> Result<T::Statement, Error<T::Error>> {
        self.primary
            .prepare(ctx, query)
            .await
            .map_err(Error::Primary)
    }

    fn each(&self, mut f: impl FnMut(&T)) {
        f(&self.primary);
        for replica in self.replicas.targets() {
            f(replica);
        }
    }
}

#[async_trait]
impl<T: Target> Database for Router<T> {
    type Rows = T::Rows;
    type Row = T::Row;
    type Statement = T::Statement;
    type Transaction = T::Transaction;
    type ExecResult = T::ExecResult;
    type Param = T::Param;
    type Error = Error<T::Error>;

    /// Ping the primary and all replicas. All failures are
    /// reported together, one per line.
    async fn ping(&self, ctx: &Context) -> Result<(), Self::Error> {
        check_all(ctx, &self.primary, self.replicas.targets()).await
    }

    /// Query a replica, failing over to the next one
    /// until one of them answers.
    async fn query(
        &self,
        ctx: &Context,
        query: &str,
        params: &[T::Param],
    ) -> Result<T::Rows, Self::Error> {
        self.replicas
            .read(|replica| async move { replica.query(ctx, query, params).await })
            .await
    }

    /// Query the next replica in rotation.
    ///
    /// No failover here: the row handle is always returned
    /// and any error is only seen when it's read.
    async fn query_row(&self, ctx: &Context, query: &str, params: &[T::Param]) -> T::Row {
        let index = self.replicas.next();
        debug!("query_row on replica {}", index + 1);

        self.replicas.targets()[index]
            .query_row(ctx, query, params)
            .await
    }

    async fn execute(
        &self,
        ctx: &Context,
        query: &str,
        params: &[T::Param],
    ) -> Result<T::ExecResult, Self::Error> {
        self.primary
            .execute(ctx, query, params)
            .await
            .map_err(Error::Primary)
    }

    /// `SELECT` statements are prepared on replicas,
    /// everything else on the primary.
    async fn prepare(&self, ctx: &Context, query: &str) -> Result<T::Statement, Self::Error> {
        match Route::classify(query) {
            Route::Read => self.prepare_for_read(ctx, query).await,
            Route::Write => self.prepare_for_write(ctx, query).await,
        }
    }

    async fn begin(
        &self,
        ctx: &Context,
        options: Option<&TransactionOptions>,
    ) -> Result<T::Transaction, Self::Error> {
        self.primary
            .begin(ctx, options)
            .await
            .map_err(Error::Primary)
    }

    /// Close the primary, then every replica.
    ///
    /// All of them are closed even if some fail. Only the last
    /// failure is returned; the others are logged.
    async fn close(&self) -> Result<(), Self::Error> {
        let mut result = Ok(());

        if let Err(err) = self.primary.close().await {
            warn!("primary close failed: {}", err);
            result = Err(Error::Primary(err));
        }

        for (index, replica) in self.replicas.targets().iter().enumerate() {
            if let Err(err) = replica.close().await {
                warn!("replica {} close failed: {}", index + 1, err);
                result = Err(Error::Replica {
                    ordinal: index + 1,
                    source: err,
                });
            }
        }

        result
    }

    fn set_max_idle_connections(&self, n: usize) {
        debug!("max idle connections: {}", n);
        self.each(|target| target.set_max_idle_connections(n));
    }

    fn set_max_open_connections(&self, n: usize) {
        debug!("max open connections: {}", n);
        self.each(|target| target.set_max_open_connections(n));
    }

    fn set_connection_max_lifetime(&self, lifetime: Option<Duration>) {
        debug!("connection max lifetime: {:?}", lifetime);
        self.each(|target| target.set_connection_max_lifetime(lifetime));
    }
}
