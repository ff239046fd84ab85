use std::sync::Arc;

use tokio::sync::watch;

/// Counting completion barrier.
///
/// Each unit of work holds a [`BarrierToken`] from [`enter`](Self::enter);
/// dropping the token marks the work finished, including when the work
/// panics or is cancelled. [`wait`](Self::wait) resolves once no tokens are
/// outstanding.
#[derive(Clone, Debug)]
pub struct CompletionBarrier {
    outstanding: Arc<watch::Sender<usize>>,
}

impl CompletionBarrier {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self {
            outstanding: Arc::new(tx),
        }
    }

    /// Register one unit of outstanding work.
    pub fn enter(&self) -> BarrierToken {
        self.outstanding.send_modify(|n| *n += 1);
        BarrierToken {
            outstanding: Arc::clone(&self.outstanding),
        }
    }

    /// Number of tokens not yet dropped.
    pub fn outstanding(&self) -> usize {
        *self.outstanding.borrow()
    }

    /// Wait until every token has been dropped. Returns immediately when
    /// nothing is outstanding.
    pub async fn wait(&self) {
        let mut rx = self.outstanding.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

impl Default for CompletionBarrier {
    fn default() -> Self {
        Self::new()
    }
}

/// Proof of one outstanding unit of work; dropping it completes the work.
#[derive(Debug)]
pub struct BarrierToken {
    outstanding: Arc<watch::Sender<usize>>,
}

impl Drop for BarrierToken {
    fn drop(&mut self) {
        self.outstanding.send_modify(|n| *n -= 1);
    }
}
