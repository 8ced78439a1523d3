// AssetLoader - background file reads polled from the frame step
//
// Architecture:
// - REQUESTS: owner thread -> worker over a bounded tokio mpsc channel
//   (try_send only; overflow is kept in a local backlog)
// - COMPLETIONS: worker -> owner thread over an rtrb SPSC ring, drained with
//   non-blocking pop() on every step
//
// The worker owns nothing but its queue endpoints and a cancel flag, so it
// can outlive a torn-down session without touching session state.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use rtrb::{Consumer, Producer, PushError};
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::config::AssetConfig;
use crate::error::SessionError;

/// Delay between retries when the completion ring is full
const COMPLETION_RETRY: Duration = Duration::from_millis(2);
/// Poll interval while waiting for the worker to exit
const SHUTDOWN_POLL: Duration = Duration::from_millis(1);

/// One file read queued for the worker
#[derive(Debug, Clone, PartialEq)]
pub struct AssetRequest {
    pub key: String,
    pub path: PathBuf,
}

/// Outcome of one request, delivered back to the owner thread
#[derive(Debug)]
pub struct AssetCompletion {
    pub key: String,
    pub path: PathBuf,
    pub result: Result<Vec<u8>, String>,
}

/// Handle to the background worker
pub struct AssetLoader {
    request_tx: Option<mpsc::Sender<AssetRequest>>,
    backlog: VecDeque<AssetRequest>,
    completions: Consumer<AssetCompletion>,
    cancelled: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    in_flight: usize,
}

impl AssetLoader {
    /// Spawn the worker thread
    ///
    /// # Errors
    /// `SessionError::Resource` if the runtime or thread cannot be created.
    pub fn spawn(config: &AssetConfig) -> Result<Self, SessionError> {
        let (request_tx, request_rx) = mpsc::channel(config.request_capacity.max(1));
        let (producer, completions) = rtrb::RingBuffer::new(config.completion_capacity.max(1));
        let cancelled = Arc::new(AtomicBool::new(false));

        // Built here so failure surfaces to the caller instead of the worker.
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| SessionError::Resource {
                reason: format!("asset runtime: {}", err),
            })?;

        let worker_cancelled = Arc::clone(&cancelled);
        let worker = std::thread::Builder::new()
            .name("xo-assets".to_string())
            .spawn(move || {
                runtime.block_on(run_worker(request_rx, producer, worker_cancelled));
                debug!("[Assets] Worker exited");
            })
            .map_err(|err| SessionError::Resource {
                reason: format!("asset worker thread: {}", err),
            })?;

        info!("[Assets] Worker started");

        Ok(Self {
            request_tx: Some(request_tx),
            backlog: VecDeque::new(),
            completions,
            cancelled,
            worker: Some(worker),
            in_flight: 0,
        })
    }

    /// Queue a request without blocking
    pub fn request(&mut self, request: AssetRequest) {
        self.in_flight += 1;
        self.backlog.push_back(request);
        self.flush_backlog();
    }

    /// Collect finished requests without blocking
    pub fn poll(&mut self) -> Vec<AssetCompletion> {
        self.flush_backlog();

        let mut done = Vec::new();
        while let Ok(completion) = self.completions.pop() {
            self.in_flight = self.in_flight.saturating_sub(1);
            done.push(completion);
        }
        done
    }

    /// Requests submitted but not yet collected by `poll`
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Stop the worker, waiting at most `grace` for it to exit
    ///
    /// Returns `true` if the worker exited within the grace period. A worker
    /// that is still blocked in I/O is detached; it only holds its own
    /// queue endpoints.
    pub fn shutdown(&mut self, grace: Duration) -> bool {
        self.cancelled.store(true, Ordering::Release);
        self.request_tx = None;
        self.backlog.clear();

        let Some(worker) = self.worker.take() else {
            return true;
        };

        let deadline = Instant::now() + grace;
        while !worker.is_finished() {
            if Instant::now() >= deadline {
                warn!(
                    "[Assets] Worker still busy after {:?}; detaching",
                    grace
                );
                return false;
            }
            std::thread::sleep(SHUTDOWN_POLL);
        }

        if worker.join().is_err() {
            warn!("[Assets] Worker panicked during shutdown");
        }
        true
    }

    fn flush_backlog(&mut self) {
        let Some(tx) = self.request_tx.as_ref() else {
            return;
        };

        while let Some(request) = self.backlog.pop_front() {
            match tx.try_send(request) {
                Ok(()) => {}
                Err(TrySendError::Full(request)) => {
                    self.backlog.push_front(request);
                    break;
                }
                Err(TrySendError::Closed(request)) => {
                    warn!("[Assets] Worker gone; dropping request '{}'", request.key);
                    self.in_flight = self.in_flight.saturating_sub(1);
                }
            }
        }
    }
}

impl Drop for AssetLoader {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::Release);
        self.request_tx = None;
    }
}

async fn run_worker(
    mut requests: mpsc::Receiver<AssetRequest>,
    mut completions: Producer<AssetCompletion>,
    cancelled: Arc<AtomicBool>,
) {
    while let Some(request) = requests.recv().await {
        if cancelled.load(Ordering::Acquire) {
            break;
        }

        let result = tokio::fs::read(&request.path)
            .await
            .map_err(|err| err.to_string());
        let completion = AssetCompletion {
            key: request.key,
            path: request.path,
            result,
        };

        if !deliver(&mut completions, completion, &cancelled).await {
            break;
        }
    }
}

async fn deliver(
    completions: &mut Producer<AssetCompletion>,
    mut completion: AssetCompletion,
    cancelled: &AtomicBool,
) -> bool {
    loop {
        match completions.push(completion) {
            Ok(()) => return true,
            Err(PushError::Full(rejected)) => {
                if cancelled.load(Ordering::Acquire) {
                    return false;
                }
                completion = rejected;
                tokio::time::sleep(COMPLETION_RETRY).await;
            }
        }
    }
}
