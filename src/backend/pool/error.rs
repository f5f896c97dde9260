//! Routing errors.
use thiserror::Error;

use super::healthcheck::HealthcheckFailure;

/// Router error, generic over the error returned by the targets.
#[derive(Debug, Error)]
pub enum Error<E>
where
    E: std::error::Error + 'static,
{
    #[error("at least one read replica is required")]
    NoReplicas,

    #[error("{0}")]
    Healthcheck(HealthcheckFailure),

    /// Every replica failed the read. `source` is the error
    /// returned by the last replica tried.
    #[error("no replica available")]
    NoReplicaAvailable {
        ordinal: usize,
        #[source]
        source: E,
    },

    #[error("ping channel closed")]
    PingChannelClosed,

    #[error("primary: {0}")]
    Primary(#[source] E),

    #[error("replica {ordinal}: {source}")]
    Replica {
        ordinal: usize,
        #[source]
        source: E,
    },
}

impl<E> Error<E>
where
    E: std::error::Error + 'static,
{
    /// Every replica is down.
    pub fn no_replica(&self) -> bool {
        matches!(self, Error::NoReplicaAvailable { .. })
    }

    /// Error returned by a target, if this is one.
    pub fn target_error(&self) -> Option<&E> {
        match self {
            Error::Primary(source)
            | Error::Replica { source, .. }
            | Error::NoReplicaAvailable { source, .. } => Some(source),
            _ => None,
        }
    }
}
