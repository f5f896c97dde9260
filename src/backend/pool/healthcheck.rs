//! Healthcheck the primary and all replicas.

use std::fmt::Display;
use std::sync::Arc;

use tokio::spawn;
use tokio::sync::mpsc::channel;
use tracing::{debug, error, warn};

use super::Error;
use crate::backend::{Context, Target};

/// Which target a ping went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetId {
    Primary,
    /// 1-based replica ordinal.
    Replica(usize),
}

impl std::fmt::Display for TargetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetId::Primary => write!(f, "primary"),
            TargetId::Replica(ordinal) => write!(f, "replica {}", ordinal),
        }
    }
}

/// Result of pinging one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingOutcome {
    pub target: TargetId,
    pub failure: Option<String>,
}

impl PingOutcome {
    fn ok(target: TargetId) -> Self {
        Self {
            target,
            failure: None,
        }
    }

    fn failed(target: TargetId, err: impl Display) -> Self {
        Self {
            target,
            failure: Some(err.to_string()),
        }
    }

    /// Ping didn't succeed.
    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }
}

impl std::fmt::Display for PingOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.failure {
            Some(ref cause) => write!(f, "{} ping failed: {}", self.target, cause),
            None => write!(f, "{} ok", self.target),
        }
    }
}

/// One or more targets failed to respond.
///
/// Primary failure comes first, replica failures follow
/// in the order they were collected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthcheckFailure {
    failures: Vec<PingOutcome>,
}

impl HealthcheckFailure {
    /// Failed pings.
    pub fn failures(&self) -> &[PingOutcome] {
        &self.failures
    }

    /// Primary didn't respond.
    pub fn primary_down(&self) -> bool {
        self.failures
            .iter()
            .any(|outcome| outcome.target == TargetId::Primary)
    }

    /// Ordinals of the replicas that didn't respond.
    pub fn replicas_down(&self) -> Vec<usize> {
        self.failures
            .iter()
            .filter_map(|outcome| match outcome.target {
                TargetId::Replica(ordinal) => Some(ordinal),
                TargetId::Primary => None,
            })
            .collect()
    }
}

impl std::fmt::Display for HealthcheckFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lines = self
            .failures
            .iter()
            .map(|outcome| outcome.to_string())
            .collect::<Vec<_>>();
        write!(f, "{}", lines.join("\n"))
    }
}

/// Ping the primary, then all replicas concurrently.
///
/// Every target is pinged exactly once, regardless of earlier failures.
/// The whole check takes about as long as the primary ping
/// plus the slowest replica.
pub async fn check_all<T: Target>(
    ctx: &Context,
    primary: &T,
    replicas: &[Arc<T>],
) -> Result<(), Error<T::Error>> {
    let mut failures = vec![];

    if let Err(err) = primary.ping(ctx).await {
        let outcome = PingOutcome::failed(TargetId::Primary, err);
        warn!("{}", outcome);
        failures.push(outcome);
    }

    let (tx, mut rx) = channel(replicas.len().max(1));

    for (index, replica) in replicas.iter().enumerate() {
        let tx = tx.clone();
        let replica = replica.clone();
        let ctx = ctx.clone();

        spawn(async move {
            let target = TargetId::Replica(index + 1);
            let outcome = match replica.ping(&ctx).await {
                Ok(()) => PingOutcome::ok(target),
                Err(err) => PingOutcome::failed(target, err),
            };
            let _ = tx.send(outcome).await;
        });
    }

    // Only the ping tasks hold senders now. If any of them goes away
    // without reporting, the channel closes once the rest are done.
    drop(tx);

    for _ in 0..replicas.len() {
        let outcome = match rx.recv().await {
            Some(outcome) => outcome,
            None => {
                error!("ping channel closed before all replicas reported");
                return Err(Error::PingChannelClosed);
            }
        };

        if outcome.is_failure() {
            warn!("{}", outcome);
            failures.push(outcome);
        } else {
            debug!("{}", outcome);
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(Error::Healthcheck(HealthcheckFailure { failures }))
    }
}
