//! Replica selection, failover and healthcheck tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::*;
use crate::backend::mock::{MockError, MockTarget};
use crate::backend::{Context, Target, TransactionOptions};

mod healthchecks;

fn replicas(n: usize) -> Replicas<MockTarget> {
    let targets = (1..=n)
        .map(|i| Arc::new(MockTarget::new(format!("replica{}", i))))
        .collect();
    Replicas::new(targets).unwrap()
}

async fn read(replicas: &Replicas<MockTarget>, start: usize) -> Result<String, Error<MockError>> {
    let ctx = Context::background();
    replicas
        .failover(start, |replica| {
            let ctx = ctx.clone();
            async move { replica.query(&ctx, "SELECT 1", &[]).await }
        })
        .await
        .map(|rows| rows.target)
}

fn queries(replicas: &Replicas<MockTarget>) -> Vec<usize> {
    replicas
        .targets()
        .iter()
        .map(|target| target.calls().query)
        .collect()
}

#[test]
fn test_no_replicas() {
    let err = Replicas::<MockTarget>::new(vec![]).unwrap_err();
    assert!(matches!(err, Error::NoReplicas));
    assert_eq!(err.to_string(), "at least one read replica is required");
}

#[tokio::test]
async fn test_round_robin_reads() {
    let replicas = replicas(3);
    let ctx = Context::background();

    let mut served = vec![];
    for _ in 0..6 {
        let rows = replicas
            .read(|replica| {
                let ctx = ctx.clone();
                async move { replica.query(&ctx, "SELECT 1", &[]).await }
            })
            .await
            .unwrap();
        served.push(rows.target);
    }

    assert_eq!(
        served,
        vec!["replica2", "replica3", "replica1", "replica2", "replica3", "replica1"]
    );
    assert_eq!(queries(&replicas), vec![2, 2, 2]);
}

#[tokio::test]
async fn test_failover_to_next() {
    let replicas = replicas(3);
    replicas.targets()[1].close().await.unwrap();

    assert_eq!(read(&replicas, 1).await.unwrap(), "replica3");
    assert_eq!(queries(&replicas), vec![0, 1, 1]);
}

#[tokio::test]
async fn test_failover_wraps_around() {
    let replicas = replicas(3);
    replicas.targets()[2].close().await.unwrap();

    assert_eq!(read(&replicas, 2).await.unwrap(), "replica1");
    assert_eq!(queries(&replicas), vec![1, 0, 1]);
}

#[tokio::test]
async fn test_first_replica_down() {
    let replicas = replicas(3);
    replicas.targets()[0].close().await.unwrap();
    let ctx = Context::background();

    for _ in 0..5 {
        let rows = replicas
            .read(|replica| {
                let ctx = ctx.clone();
                async move { replica.query(&ctx, "SELECT 1", &[]).await }
            })
            .await
            .unwrap();
        assert_ne!(rows.target, "replica1");
    }
}

#[tokio::test]
async fn test_all_replicas_down() {
    let replicas = replicas(3);
    for target in replicas.targets() {
        target.close().await.unwrap();
    }

    let err = read(&replicas, 1).await.unwrap_err();
    assert!(err.no_replica());
    assert_eq!(err.to_string(), "no replica available");

    // Started at replica 2, so replica 1 was tried last.
    match err {
        Error::NoReplicaAvailable { ordinal, source } => {
            assert_eq!(ordinal, 1);
            assert_eq!(source, MockError::Closed);
        }
        _ => panic!("expected no replica available"),
    }

    // One pass, each replica tried once.
    assert_eq!(queries(&replicas), vec![1, 1, 1]);
}

#[tokio::test]
async fn test_attempt_order() {
    let replicas = replicas(4);
    for target in replicas.targets() {
        target.close().await.unwrap();
    }

    let ctx = Context::background();
    let mut attempts = vec![];
    let result = replicas
        .failover(2, |replica| {
            attempts.push(replica.name().to_string());
            let ctx = ctx.clone();
            async move { replica.ping(&ctx).await }
        })
        .await;

    assert!(result.unwrap_err().no_replica());
    assert_eq!(attempts, vec!["replica3", "replica4", "replica1", "replica2"]);
}

/// Target whose ping panics when `explode` is set.
struct Panicky {
    explode: bool,
}

#[derive(Debug, thiserror::Error)]
#[error("panicky")]
struct PanickyError;

#[async_trait]
impl Target for Panicky {
    type Rows = ();
    type Row = ();
    type Statement = ();
    type Transaction = ();
    type ExecResult = ();
    type Param = ();
    type Error = PanickyError;

    async fn ping(&self, _ctx: &Context) -> Result<(), PanickyError> {
        if self.explode {
            panic!("ping exploded");
        }
        Ok(())
    }

    async fn query(&self, _: &Context, _: &str, _: &[()]) -> Result<(), PanickyError> {
        Err(PanickyError)
    }

    async fn query_row(&self, _: &Context, _: &str, _: &[()]) {}

    async fn execute(&self, _: &Context, _: &str, _: &[()]) -> Result<(), PanickyError> {
        Err(PanickyError)
    }

    async fn prepare(&self, _: &Context, _: &str) -> Result<(), PanickyError> {
        Err(PanickyError)
    }

    async fn begin(
        &self,
        _: &Context,
        _: Option<&TransactionOptions>,
    ) -> Result<(), PanickyError> {
        Err(PanickyError)
    }

    async fn close(&self) -> Result<(), PanickyError> {
        Ok(())
    }

    fn set_max_idle_connections(&self, _: usize) {}

    fn set_max_open_connections(&self, _: usize) {}

    fn set_connection_max_lifetime(&self, _: Option<Duration>) {}
}

#[tokio::test]
async fn test_ping_channel_closed() {
    let primary = Panicky { explode: false };
    let replicas = vec![
        Arc::new(Panicky { explode: false }),
        Arc::new(Panicky { explode: true }),
    ];

    // The panicking task never reports back.
    let err = check_all(&Context::background(), &primary, &replicas)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::PingChannelClosed));
    assert_eq!(err.to_string(), "ping channel closed");

    let healthy = vec![Arc::new(Panicky { explode: false })];
    check_all(&Context::background(), &primary, &healthy)
        .await
        .unwrap();
}
