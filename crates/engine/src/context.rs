//! Cancellation and deadlines for long-running engine calls.
//!
//! A [`RequestContext`] travels with a report request. Aggregation races its
//! work against [`RequestContext::done`], so a caller can bound a report with
//! a timeout or abort it through a [`CancelHandle`].

use std::{future, time::Duration};

use tokio::{sync::watch, time::Instant};

use crate::{EngineError, ResultEngine};

#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    deadline: Option<Instant>,
    cancelled: Option<watch::Receiver<bool>>,
}

/// Cancels the [`RequestContext`] it was created with.
#[derive(Debug)]
pub struct CancelHandle {
    sender: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }
}

impl RequestContext {
    /// A context that never expires.
    pub fn background() -> Self {
        Self::default()
    }

    /// Tightens the deadline to `timeout` from now. An earlier existing
    /// deadline wins.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    /// Attaches a fresh cancellation signal.
    #[must_use]
    pub fn cancellable(mut self) -> (Self, CancelHandle) {
        let (sender, receiver) = watch::channel(false);
        self.cancelled = Some(receiver);
        (self, CancelHandle { sender })
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fails immediately when the context is already done.
    pub fn check(&self) -> ResultEngine<()> {
        if self
            .cancelled
            .as_ref()
            .is_some_and(|receiver| *receiver.borrow())
        {
            return Err(EngineError::Cancelled);
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(EngineError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Resolves with the reason once the context is cancelled or its deadline
    /// passes. Pending forever for a background context.
    pub async fn done(&self) -> EngineError {
        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => future::pending().await,
            }
        };
        let cancelled = async {
            match self.cancelled.clone() {
                Some(mut receiver) => {
                    let closed = receiver.wait_for(|cancelled| *cancelled).await.is_err();
                    // A dropped handle can no longer cancel.
                    if closed {
                        future::pending::<()>().await;
                    }
                }
                None => future::pending().await,
            }
        };

        tokio::select! {
            () = cancelled => EngineError::Cancelled,
            () = deadline => EngineError::DeadlineExceeded,
        }
    }

    /// Runs `work` unless the context finishes first.
    pub async fn run<T, F>(&self, work: F) -> ResultEngine<T>
    where
        F: Future<Output = ResultEngine<T>>,
    {
        self.check()?;
        tokio::select! {
            reason = self.done() => Err(reason),
            result = work => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn background_never_finishes() {
        let ctx = RequestContext::background();
        assert!(ctx.check().is_ok());
        let value = ctx.run(async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn cancel_handle_stops_work() {
        let (ctx, handle) = RequestContext::background().cancellable();
        handle.cancel();
        assert_eq!(ctx.check(), Err(EngineError::Cancelled));
        let result = ctx
            .run(async {
                future::pending::<()>().await;
                Ok(())
            })
            .await;
        assert_eq!(result, Err(EngineError::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_interrupts_slow_work() {
        let ctx = RequestContext::background().with_timeout(Duration::from_millis(50));
        let result = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(())
            })
            .await;
        assert_eq!(result, Err(EngineError::DeadlineExceeded));
    }

    #[tokio::test(start_paused = true)]
    async fn earlier_deadline_wins() {
        let ctx = RequestContext::background()
            .with_timeout(Duration::from_millis(10))
            .with_timeout(Duration::from_secs(60));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(ctx.check(), Err(EngineError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn dropped_handle_does_not_cancel() {
        let (ctx, handle) = RequestContext::background().cancellable();
        drop(handle);
        assert!(ctx.check().is_ok());
        let value = ctx.run(async { Ok("done") }).await.unwrap();
        assert_eq!(value, "done");
    }
}
