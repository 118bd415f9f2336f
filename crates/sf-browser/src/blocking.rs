//! One-at-a-time blocking work
//!
//! headless_chrome calls block the calling thread, so tab work runs on
//! `spawn_blocking`. Dropping the awaiting future (e.g. when a call times
//! out) does not stop the blocking job, so the handle is kept and the next
//! call waits for it before touching the tab again.

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::{BrowserError, Result};

/// Runs blocking jobs strictly one after another
#[derive(Default)]
pub(crate) struct SerialBlocking {
    pending: Option<JoinHandle<()>>,
}

impl SerialBlocking {
    /// Run `job` once every previously started job has finished.
    ///
    /// Cancel-safe: if this future is dropped, the job keeps running and
    /// the next `run` waits for it.
    pub(crate) async fn run<T, F>(&mut self, job: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        if let Some(stale) = self.pending.as_mut() {
            debug!("Waiting for an abandoned browser call to finish");
            // 放棄された呼び出しの結果は捨てる
            let _ = stale.await;
            self.pending = None;
        }

        let (tx, mut rx) = oneshot::channel();
        let handle = self.pending.insert(tokio::task::spawn_blocking(move || {
            let _ = tx.send(job());
        }));
        let joined = handle.await;
        self.pending = None;

        joined.map_err(|e| BrowserError::TabError(format!("Browser task failed: {}", e)))?;
        rx.try_recv()
            .map_err(|_| BrowserError::TabError("Browser task returned no result".to_string()))
    }
}
