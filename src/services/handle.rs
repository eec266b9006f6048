// src/services/handle.rs
//! Cancellable handles for in-flight ticket operations.

use crate::errors::{Result, TicketError};
use futures::FutureExt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::task::{AbortHandle, JoinHandle};

/// Handle to an operation running on the tokio runtime.
///
/// Awaiting the handle yields the operation's single terminal result.
/// `cancel` aborts the task; every sub-request the operation owns (store
/// calls, resolver lookups, the watchdog timer) is dropped with it, and the
/// awaited result becomes `TicketError::Cancelled`.
///
/// Dropping the handle without cancelling detaches the operation; it still
/// runs to completion.
#[must_use = "an operation handle does nothing unless awaited or cancelled"]
pub struct OperationHandle<T> {
    task: JoinHandle<Result<T>>,
}

impl<T: Send + 'static> OperationHandle<T> {
    pub(crate) fn spawn<F>(operation: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        OperationHandle {
            task: tokio::spawn(operation),
        }
    }

    /// Cancels the operation. Has no effect once it has completed.
    pub fn cancel(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Invokes `on_complete` exactly once with the terminal result.
    ///
    /// If the operation is cancelled, `on_complete` is never invoked. The
    /// returned handle cancels the operation.
    pub fn on_complete<F>(self, on_complete: F) -> AbortHandle
    where
        F: FnOnce(Result<T>) + Send + 'static,
    {
        let abort = self.task.abort_handle();
        tokio::spawn(async move {
            match self.await {
                Err(TicketError::Cancelled) => {}
                result => on_complete(result),
            }
        });
        abort
    }
}

impl<T> Future for OperationHandle<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.task.poll_unpin(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(join_err)) if join_err.is_cancelled() => {
                Poll::Ready(Err(TicketError::Cancelled))
            }
            Poll::Ready(Err(join_err)) => std::panic::resume_unwind(join_err.into_panic()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_handle_yields_result() {
        let handle = OperationHandle::spawn(async { Ok(7) });
        assert_eq!(handle.await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_cancel_reports_cancelled() {
        let handle: OperationHandle<()> = OperationHandle::spawn(async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        });
        handle.cancel();
        assert!(matches!(handle.await, Err(TicketError::Cancelled)));
    }

    #[tokio::test]
    async fn test_on_complete_runs_once() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let handle = OperationHandle::spawn(async { Ok("done") });
        let _abort = handle.on_complete(move |result| {
            let _ = tx.send(result.unwrap());
        });
        assert_eq!(rx.await.unwrap(), "done");
    }

    #[tokio::test]
    async fn test_no_callback_after_cancel() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();
        let handle: OperationHandle<()> = OperationHandle::spawn(async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        });
        let abort = handle.on_complete(move |_| flag.store(true, Ordering::SeqCst));
        abort.abort();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!fired.load(Ordering::SeqCst));
    }
}
