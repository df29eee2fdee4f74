use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use chains_api::BusError;

/// Why a context finished before the work it guarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Done {
    Cancelled,
    DeadlineExceeded,
}

impl Done {
    pub fn into_bus_error(self, what: impl std::fmt::Display) -> BusError {
        match self {
            Done::Cancelled => BusError::cancelled(format!("{what} cancelled")),
            Done::DeadlineExceeded => BusError::deadline_exceeded(format!("{what} deadline exceeded")),
        }
    }
}

/// Caller-owned cancellation and deadline for one store call.
///
/// No timeout is imposed unless the caller sets a deadline.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context cancelled together with `self`, but cancellable on its own.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Set a deadline. An earlier existing deadline wins.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        });
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// `Some` once the context is finished.
    pub fn err(&self) -> Option<Done> {
        if self.token.is_cancelled() {
            return Some(Done::Cancelled);
        }
        match self.deadline {
            Some(d) if d <= Instant::now() => Some(Done::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolves when the context is cancelled or its deadline passes.
    pub async fn done(&self) -> Done {
        match self.deadline {
            Some(deadline) => tokio::select! {
                _ = self.token.cancelled() => Done::Cancelled,
                _ = tokio::time::sleep_until(deadline) => Done::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                Done::Cancelled
            }
        }
    }

    /// Drive `fut` until it completes or the context finishes.
    ///
    /// On `Err` the future has been dropped.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, Done> {
        if let Some(done) = self.err() {
            return Err(done);
        }
        tokio::select! {
            biased;
            done = self.done() => Err(done),
            out = fut => Ok(out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_completes_when_not_cancelled() {
        let ctx = CallContext::new();
        assert_eq!(ctx.run(async { 7 }).await, Ok(7));
    }

    #[tokio::test]
    async fn cancelled_context_skips_work() {
        let ctx = CallContext::new();
        ctx.cancel();
        assert_eq!(ctx.err(), Some(Done::Cancelled));
        let res = ctx.run(async { 1 }).await;
        assert_eq!(res, Err(Done::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_aborts_pending_work() {
        let ctx = CallContext::new().with_timeout(Duration::from_secs(5));
        let res = ctx.run(std::future::pending::<()>()).await;
        assert_eq!(res, Err(Done::DeadlineExceeded));
    }

    #[test]
    fn earlier_deadline_wins() {
        let now = Instant::now();
        let ctx = CallContext::new()
            .with_deadline(now + Duration::from_secs(1))
            .with_deadline(now + Duration::from_secs(10));
        assert_eq!(ctx.deadline(), Some(now + Duration::from_secs(1)));
    }

    #[test]
    fn child_follows_parent() {
        let parent = CallContext::new();
        let child = parent.child();
        child.cancel();
        assert!(parent.err().is_none());
        let child = parent.child();
        parent.cancel();
        assert_eq!(child.err(), Some(Done::Cancelled));
    }

    #[test]
    fn done_maps_to_bus_kinds() {
        use chains_api::ErrorKind;
        assert_eq!(Done::Cancelled.into_bus_error("send").kind(), ErrorKind::Cancelled);
        let err = Done::DeadlineExceeded.into_bus_error("send");
        assert_eq!(err.kind(), ErrorKind::DeadlineExceeded);
        assert_eq!(err.message(), "send deadline exceeded");
    }
}
