//! Bounded worker pool for job preparation.
//!
//! Preparation (header probing, store lookups pre-read, artwork
//! downloads) is network-dominated and independent per job, so it runs
//! on a handful of persistent tokio tasks pulling from a bounded
//! `async-channel`. Its `Receiver` clones cheaply, so each worker holds
//! its own handle and no mutex guards the queue.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Duration;

/// Default worker count for preparation work.
pub const DEFAULT_PREP_WORKERS: usize = 8;

/// Last-resort per-item timeout; the HTTP layer has its own shorter
/// timeouts, this one only guards against a wedged worker.
const ITEM_SAFETY_TIMEOUT: Duration = Duration::from_secs(300);

/// Fixed-size pool that processes a known set of items and streams
/// results back as they finish, in completion order.
pub struct PrepPool<R: Send + 'static> {
    result_rx: mpsc::UnboundedReceiver<R>,
    _workers: Vec<JoinHandle<()>>,
}

impl<R: Send + 'static> PrepPool<R> {
    /// Spawn `workers` tasks and feed them `items`. Submission happens
    /// on its own task so results can be consumed immediately.
    pub fn start<W, F, Fut>(workers: usize, items: Vec<W>, process: F) -> Self
    where
        W: Send + 'static,
        F: Fn(W) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        let (work_tx, work_rx) = async_channel::bounded::<W>(workers.max(1));
        let (result_tx, result_rx) = mpsc::unbounded_channel::<R>();
        let process = Arc::new(process);

        let handles = (0..workers.max(1))
            .map(|_| {
                let work_rx = work_rx.clone();
                let result_tx = result_tx.clone();
                let process = process.clone();
                tokio::spawn(async move {
                    while let Ok(item) = work_rx.recv().await {
                        match tokio::time::timeout(ITEM_SAFETY_TIMEOUT, process(item)).await {
                            Ok(result) => {
                                if result_tx.send(result).is_err() {
                                    break;
                                }
                            }
                            Err(_) => {
                                log::warn!(
                                    "preparation item exceeded {}s, dropped",
                                    ITEM_SAFETY_TIMEOUT.as_secs()
                                );
                            }
                        }
                    }
                })
            })
            .collect();
        drop(result_tx);

        tokio::spawn(async move {
            for item in items {
                if work_tx.send(item).await.is_err() {
                    break;
                }
            }
        });

        Self {
            result_rx,
            _workers: handles,
        }
    }

    /// Next finished result; `None` once every item is done.
    pub async fn recv(&mut self) -> Option<R> {
        self.result_rx.recv().await
    }
}
