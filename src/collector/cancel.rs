use crate::error::{AnalysisError, CancelReason};
use std::future::{Future, pending};
use tokio::sync::watch;
use tokio::time::{Instant, sleep_until};

/// Caller side of a cancellation pair.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn new() -> (CancelHandle, CancelSignal) {
        let (tx, rx) = watch::channel(false);
        (
            CancelHandle { tx },
            CancelSignal {
                rx: Some(rx),
                deadline: None,
            },
        )
    }

    pub fn cancel(&self) {
        // no receivers left means nothing is running
        let _ = self.tx.send(true);
    }
}

/// Observed by a running analysis. Fires on an explicit cancel or when the optional
/// overall deadline passes.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    rx: Option<watch::Receiver<bool>>,
    deadline: Option<Instant>,
}

impl CancelSignal {
    pub fn never() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    async fn cancelled(&self) -> CancelReason {
        let caller = async {
            match &self.rx {
                Some(rx) => {
                    let mut rx = rx.clone();
                    let closed = rx.wait_for(|cancelled| *cancelled).await.is_err();
                    if closed {
                        // handle dropped without cancelling
                        pending::<()>().await;
                    }
                }
                None => pending::<()>().await,
            }
        };
        let deadline = async {
            match self.deadline {
                Some(at) => sleep_until(at).await,
                None => pending::<()>().await,
            }
        };

        tokio::select! {
            _ = caller => CancelReason::Caller,
            _ = deadline => CancelReason::Deadline,
        }
    }

    /// Races `fut` against the signal. Losing the race drops `fut`, which aborts any
    /// in-flight request it owns.
    pub async fn guard<T, F>(&self, fut: F) -> Result<T, AnalysisError>
    where
        F: Future<Output = Result<T, AnalysisError>>,
    {
        tokio::select! {
            biased;
            reason = self.cancelled() => Err(AnalysisError::Cancelled(reason)),
            result = fut => result,
        }
    }
}
