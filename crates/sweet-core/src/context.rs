// ── Main context ──
//
// Single-consumer job queue that plays the role of a UI thread. Background
// tasks never touch cells directly: they post a closure here and the loop
// runs jobs one at a time, in FIFO order.

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::debug;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Create a connected context/loop pair.
///
/// The host spawns (or manually drives) the [`MainLoop`]; everything that
/// must run on the mutation context is posted through the [`MainContext`].
pub fn main_context() -> (MainContext, MainLoop) {
    let (tx, rx) = mpsc::unbounded_channel();
    (MainContext { tx }, MainLoop { rx })
}

/// Cheaply cloneable handle for posting jobs to the main loop.
#[derive(Clone)]
pub struct MainContext {
    tx: mpsc::UnboundedSender<Job>,
}

impl MainContext {
    /// Queue `job` to run on the main loop. Returns `false` if the loop
    /// has shut down (the job is dropped).
    pub fn dispatch(&self, job: impl FnOnce() + Send + 'static) -> bool {
        self.tx.send(Box::new(job)).is_ok()
    }

    /// Wait until every job queued before this call has run.
    pub async fn flush(&self) -> bool {
        let (done_tx, done_rx) = oneshot::channel();
        if !self.dispatch(move || {
            let _ = done_tx.send(());
        }) {
            return false;
        }
        done_rx.await.is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl std::fmt::Debug for MainContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MainContext")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

/// Receiving side of the main context. Runs posted jobs sequentially.
pub struct MainLoop {
    rx: mpsc::UnboundedReceiver<Job>,
}

impl MainLoop {
    /// Run jobs until every [`MainContext`] handle is dropped.
    pub async fn run(mut self) {
        while let Some(job) = self.rx.recv().await {
            job();
        }
        debug!("main loop drained");
    }

    /// Run jobs until `cancel` fires or every handle is dropped.
    pub async fn run_until_cancelled(mut self, cancel: CancellationToken) {
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                job = self.rx.recv() => {
                    let Some(job) = job else { break };
                    job();
                }
            }
        }
        debug!("main loop stopped");
    }

    /// Run every job already queued without waiting. Returns the count.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.rx.try_recv() {
            job();
            ran += 1;
        }
        ran
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;

    #[test]
    fn jobs_run_in_fifo_order() {
        let (ctx, mut main_loop) = main_context();
        let log = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            let log = Arc::clone(&log);
            assert!(ctx.dispatch(move || log.lock().push(i)));
        }

        assert!(log.lock().is_empty(), "nothing runs until the loop does");
        assert_eq!(main_loop.run_pending(), 3);
        assert_eq!(*log.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn dispatch_after_loop_dropped_fails() {
        let (ctx, main_loop) = main_context();
        drop(main_loop);
        assert!(!ctx.dispatch(|| {}));
        assert!(ctx.is_closed());
    }

    #[tokio::test]
    async fn flush_waits_for_earlier_jobs() {
        let (ctx, main_loop) = main_context();
        tokio::spawn(main_loop.run());

        let hit = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&hit);
        ctx.dispatch(move || *flag.lock() = true);

        assert!(ctx.flush().await);
        assert!(*hit.lock());
    }

    #[tokio::test]
    async fn cancelled_loop_stops() {
        let (ctx, main_loop) = main_context();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(main_loop.run_until_cancelled(cancel.clone()));

        cancel.cancel();
        handle.await.expect("loop task panicked");
        assert!(ctx.is_closed());
    }
}
