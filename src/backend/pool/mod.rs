//! Replica selection, failover and healthchecks.

pub mod error;
pub mod healthcheck;
pub mod replicas;
pub mod round_robin;

pub use error::Error;
pub use healthcheck::{check_all, HealthcheckFailure, PingOutcome, TargetId};
pub use replicas::Replicas;
pub use round_robin::RoundRobin;

#[cfg(test)]
pub mod test;
