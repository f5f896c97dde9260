//! Replicas set.

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, error};

use super::{Error, RoundRobin};
use crate::backend::Target;

/// Read replicas, load balanced round robin.
#[derive(Debug)]
pub struct Replicas<T> {
    targets: Vec<Arc<T>>,
    round_robin: RoundRobin,
}

impl<T: Target> Replicas<T> {
    /// Create new replicas set. At least one replica is required.
    pub fn new(targets: Vec<Arc<T>>) -> Result<Self, Error<T::Error>> {
        let round_robin = RoundRobin::new(targets.len()).ok_or(Error::NoReplicas)?;

        Ok(Self {
            targets,
            round_robin,
        })
    }

    /// How many replicas we have.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// There are no replicas.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Replica handles, in configuration order.
    pub fn targets(&self) -> &[Arc<T>] {
        &self.targets
    }

    /// Pick the next replica to start a read from.
    pub fn next(&self) -> usize {
        self.round_robin.next()
    }

    /// Replica selector.
    pub fn round_robin(&self) -> &RoundRobin {
        &self.round_robin
    }

    /// Run `read` against the next replica in rotation,
    /// failing over to the others if it doesn't succeed.
    pub async fn read<R, F, Fut>(&self, read: F) -> Result<R, Error<T::Error>>
    where
        F: FnMut(Arc<T>) -> Fut,
        Fut: Future<Output = Result<R, T::Error>>,
    {
        self.failover(self.next(), read).await
    }

    /// Run `read` against the replica at `start`, then `start + 1`, `start + 2`
    /// and so on, wrapping around, until one of them succeeds.
    ///
    /// Each replica is tried at most once. If all of them fail,
    /// the last error is returned inside [`Error::NoReplicaAvailable`].
    pub async fn failover<R, F, Fut>(
        &self,
        start: usize,
        mut read: F,
    ) -> Result<R, Error<T::Error>>
    where
        F: FnMut(Arc<T>) -> Fut,
        Fut: Future<Output = Result<R, T::Error>>,
    {
        let len = self.len();
        let start = start % len;
        let mut index = start;

        loop {
            match read(self.targets[index].clone()).await {
                Ok(result) => return Ok(result),
                Err(err) => {
                    let ordinal = index + 1;
                    debug!("replica {} read failed: {}", ordinal, err);

                    index = (index + 1) % len;

                    if index == start {
                        error!("all {} replicas failed, last error: {}", len, err);
                        return Err(Error::NoReplicaAvailable {
                            ordinal,
                            source: err,
                        });
                    }
                }
            }
        }
    }
}
