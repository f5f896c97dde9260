use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::backend::mock::MockTarget;
use crate::backend::pool::{check_all, Error, TargetId};
use crate::backend::{Context, Target};

fn databases(replicas: usize) -> (MockTarget, Vec<Arc<MockTarget>>) {
    let primary = MockTarget::new("primary");
    let replicas = (1..=replicas)
        .map(|i| Arc::new(MockTarget::new(format!("replica{}", i))))
        .collect();
    (primary, replicas)
}

#[tokio::test]
async fn test_all_healthy() {
    let (primary, replicas) = databases(3);
    check_all(&Context::background(), &primary, &replicas)
        .await
        .unwrap();

    assert_eq!(primary.calls().ping, 1);
    assert!(replicas.iter().all(|replica| replica.calls().ping == 1));
}

#[tokio::test]
async fn test_primary_down() {
    let (primary, replicas) = databases(2);
    primary.close().await.unwrap();

    let err = check_all(&Context::background(), &primary, &replicas)
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "primary ping failed: database is closed");
    assert_eq!(err.to_string().lines().count(), 1);

    // Replicas are pinged even though the primary is down.
    assert!(replicas.iter().all(|replica| replica.calls().ping == 1));
}

#[tokio::test]
async fn test_primary_and_replica_down() {
    let (primary, replicas) = databases(2);
    primary.close().await.unwrap();
    replicas[0].close().await.unwrap();

    let err = check_all(&Context::background(), &primary, &replicas)
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "primary ping failed: database is closed\nreplica 1 ping failed: database is closed"
    );

    match err {
        Error::Healthcheck(failure) => {
            assert!(failure.primary_down());
            assert_eq!(failure.replicas_down(), vec![1]);
            assert_eq!(failure.failures()[0].target, TargetId::Primary);
        }
        _ => panic!("expected healthcheck failure"),
    }
}

#[tokio::test]
async fn test_replicas_down() {
    let (primary, replicas) = databases(4);
    for replica in &replicas {
        replica.close().await.unwrap();
    }

    let err = check_all(&Context::background(), &primary, &replicas)
        .await
        .unwrap_err();

    match err {
        Error::Healthcheck(failure) => {
            assert!(!failure.primary_down());

            // Collected in completion order, which is a race.
            let mut down = failure.replicas_down();
            down.sort();
            assert_eq!(down, vec![1, 2, 3, 4]);

            let message = failure.to_string();
            assert_eq!(message.lines().count(), 4);
            for ordinal in 1..=4 {
                let line = format!("replica {} ping failed: database is closed", ordinal);
                assert!(message.lines().any(|l| l == line));
            }
        }
        _ => panic!("expected healthcheck failure"),
    }
}

#[tokio::test]
async fn test_replicas_pinged_concurrently() {
    let primary = MockTarget::new("primary");
    let replicas = (1..=5)
        .map(|i| {
            Arc::new(
                MockTarget::new(format!("replica{}", i)).with_latency(Duration::from_millis(200)),
            )
        })
        .collect::<Vec<_>>();

    let started = Instant::now();
    check_all(&Context::background(), &primary, &replicas)
        .await
        .unwrap();

    // Sequential pings would take at least a second.
    assert!(started.elapsed() < Duration::from_millis(800));
    assert!(replicas.iter().all(|replica| replica.calls().ping == 1));
}

#[tokio::test]
async fn test_deadline_reaches_targets() {
    let primary = MockTarget::new("primary");
    let replicas = vec![
        Arc::new(MockTarget::new("replica1")),
        Arc::new(MockTarget::new("replica2").with_latency(Duration::from_secs(10))),
    ];

    let started = Instant::now();
    let err = check_all(
        &Context::with_timeout(Duration::from_millis(50)),
        &primary,
        &replicas,
    )
    .await
    .unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(
        err.to_string(),
        "replica 2 ping failed: context deadline exceeded"
    );
}
