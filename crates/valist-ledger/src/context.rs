use std::future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

/// Deadline and cancellation carried by a single client call.
///
/// Cloning a context shares its cancellation signal.
#[derive(Clone, Debug, Default)]
pub struct CallContext {
    deadline: Option<Instant>,
    cancel: Option<watch::Receiver<bool>>,
}

impl CallContext {
    /// A context that never expires and cannot be cancelled.
    pub fn background() -> Self {
        Self::default()
    }

    /// A context that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::background().bounded(timeout)
    }

    /// A context that ends when the returned handle is cancelled.
    pub fn cancellable() -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        let ctx = Self {
            deadline: None,
            cancel: Some(rx),
        };
        (ctx, CancelHandle { tx })
    }

    /// Copy of this context whose deadline is at most `timeout` from now.
    pub fn bounded(&self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(existing) if existing <= candidate => existing,
            _ => candidate,
        };
        Self {
            deadline: Some(deadline),
            cancel: self.cancel.clone(),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Whether the deadline has passed or the call was cancelled.
    pub fn is_done(&self) -> bool {
        self.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Resolves once the deadline passes or the call is cancelled.
    /// Never resolves for a background context.
    pub async fn done(&self) {
        let deadline = self.deadline;
        let mut cancel = self.cancel.clone();

        let expired = async move {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => future::pending().await,
            }
        };
        let cancelled = async move {
            if let Some(rx) = cancel.as_mut() {
                let sender_dropped = rx.wait_for(|cancelled| *cancelled).await.is_err();
                if !sender_dropped {
                    return;
                }
            }
            // Nothing can cancel this call any more.
            future::pending::<()>().await
        };

        tokio::select! {
            _ = expired => {}
            _ = cancelled => {}
        }
    }
}

/// Cancels every context cloned from the one it was created with.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn background_is_never_done() {
        let ctx = CallContext::background();
        assert!(ctx.deadline().is_none());
        assert!(!ctx.is_done());
    }

    #[test]
    fn bounded_keeps_the_earlier_deadline() {
        let short = CallContext::with_timeout(Duration::from_millis(10));
        let narrowed = short.bounded(Duration::from_secs(60));
        assert_eq!(narrowed.deadline(), short.deadline());

        let long = CallContext::with_timeout(Duration::from_secs(60));
        let narrowed = long.bounded(Duration::from_millis(10));
        assert!(narrowed.deadline() < long.deadline());
    }

    #[tokio::test]
    async fn timeout_resolves_done() {
        let ctx = CallContext::with_timeout(Duration::from_millis(20));
        tokio::time::timeout(Duration::from_secs(2), ctx.done())
            .await
            .expect("deadline should fire");
        assert!(ctx.is_done());
    }

    #[tokio::test]
    async fn cancel_resolves_done_for_clones() {
        let (ctx, handle) = CallContext::cancellable();
        let clone = ctx.clone();
        let waiter = tokio::spawn(async move { clone.done().await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.cancel();
        tokio::time::timeout(Duration::from_secs(2), waiter)
            .await
            .expect("cancellation should wake the waiter")
            .unwrap();
        assert!(ctx.is_cancelled());
        assert!(handle.is_cancelled());
    }

    #[tokio::test]
    async fn dropped_handle_does_not_cancel() {
        let (ctx, handle) = CallContext::cancellable();
        drop(handle);
        let res = tokio::time::timeout(Duration::from_millis(30), ctx.done()).await;
        assert!(res.is_err());
        assert!(!ctx.is_done());
    }
}
