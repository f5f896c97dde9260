//! Cancellation and deadline passed down to every target call.

use std::future::{pending, Future};
use std::time::Duration;

use thiserror::Error;
use tokio::select;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

/// Why a call didn't finish.
#[derive(Debug, Error, PartialEq, Eq, Copy, Clone)]
pub enum Interrupted {
    #[error("context cancelled")]
    Cancelled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Deadline and cancellation signal for a single operation.
///
/// The router never inspects it; it's handed to the targets
/// as-is and it's up to them to honor it, e.g. with [`Context::run`].
#[derive(Debug, Clone, Default)]
pub struct Context {
    deadline: Option<Instant>,
    token: CancellationToken,
}

impl Context {
    /// No deadline, never cancelled unless [`Context::cancel`] is called.
    pub fn background() -> Self {
        Self::default()
    }

    /// Expire after `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// Expire at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            token: CancellationToken::new(),
        }
    }

    /// Cancelled whenever `token` is.
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            deadline: None,
            token,
        }
    }

    /// Deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Deadline has passed.
    pub fn expired(&self) -> bool {
        self.deadline
            .map(|deadline| Instant::now() >= deadline)
            .unwrap_or(false)
    }

    /// Cancel this context and every clone of it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Context was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Check the context without waiting.
    pub fn check(&self) -> Result<(), Interrupted> {
        if self.is_cancelled() {
            Err(Interrupted::Cancelled)
        } else if self.expired() {
            Err(Interrupted::DeadlineExceeded)
        } else {
            Ok(())
        }
    }

    /// Drive `future` to completion unless the context is
    /// cancelled or the deadline passes first.
    pub async fn run<F: Future>(&self, future: F) -> Result<F::Output, Interrupted> {
        self.check()?;

        let deadline = async {
            match self.deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => pending::<()>().await,
            }
        };

        select! {
            biased;

            _ = self.token.cancelled() => Err(Interrupted::Cancelled),
            _ = deadline => Err(Interrupted::DeadlineExceeded),
            output = future => Ok(output),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test]
    async fn test_background() {
        let ctx = Context::background();
        assert!(ctx.deadline().is_none());
        assert!(!ctx.expired());
        assert_eq!(ctx.run(async { 42 }).await, Ok(42));
    }

    #[tokio::test]
    async fn test_deadline() {
        let ctx = Context::with_timeout(Duration::from_millis(20));
        let result = ctx.run(sleep(Duration::from_secs(5))).await;
        assert_eq!(result, Err(Interrupted::DeadlineExceeded));
        assert!(ctx.expired());
        assert_eq!(ctx.check(), Err(Interrupted::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_cancel_reaches_clones() {
        let ctx = Context::background();
        let clone = ctx.clone();

        let task = tokio::spawn(async move { clone.run(sleep(Duration::from_secs(5))).await });
        ctx.cancel();

        assert_eq!(task.await.unwrap(), Err(Interrupted::Cancelled));
        assert!(ctx.is_cancelled());
    }

    #[tokio::test]
    async fn test_external_token() {
        let token = CancellationToken::new();
        let ctx = Context::with_token(token.clone());
        token.cancel();
        assert_eq!(ctx.run(async {}).await, Err(Interrupted::Cancelled));
    }
}
