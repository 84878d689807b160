//! Background threads that run backend requests.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use composer_api::Backend;

use super::{Dispatcher, FetchRequest, FetchResult, Ticket};
use crate::constants::FETCH_THREADS;

/// Message sent to the worker threads.
enum WorkerMessage {
    /// Run a request
    Fetch(Ticket, FetchRequest),
    /// Stop one thread
    Shutdown,
}

/// Owns a small pool of background threads that run [`FetchRequest`]s.
///
/// Requests run concurrently, so a slow request only holds up its own
/// thread. Results come back in completion order through
/// [`take_one_result`]. Dropping the worker stops and joins every thread;
/// requests running at that moment are finished first, bounded by the
/// client timeout.
///
/// [`take_one_result`]: FetchWorker::take_one_result
pub struct FetchWorker {
    /// Sender for requests to the pool
    request_tx: Sender<WorkerMessage>,
    /// Receiver for results from the pool
    result_rx: Receiver<FetchResult>,
    /// Handles of the pool threads (for joining on drop)
    thread_handles: Vec<JoinHandle<()>>,
    /// Requests sent but not yet drained
    pending: usize,
}

impl FetchWorker {
    /// Spawn the default number of worker threads.
    pub fn spawn(backend: Arc<dyn Backend>) -> std::io::Result<Self> {
        Self::with_threads(backend, FETCH_THREADS)
    }

    /// Spawn `threads` worker threads (at least one).
    pub fn with_threads(backend: Arc<dyn Backend>, threads: usize) -> std::io::Result<Self> {
        let (request_tx, request_rx) = mpsc::channel::<WorkerMessage>();
        let (result_tx, result_rx) = mpsc::channel::<FetchResult>();
        let request_rx = Arc::new(Mutex::new(request_rx));

        let mut worker = Self {
            request_tx,
            result_rx,
            thread_handles: Vec::new(),
            pending: 0,
        };
        for index in 0..threads.max(1) {
            let backend = Arc::clone(&backend);
            let request_rx = Arc::clone(&request_rx);
            let result_tx = result_tx.clone();
            // On a spawn error the threads started so far are joined by Drop
            let handle = thread::Builder::new()
                .name(format!("fetch-worker-{index}"))
                .spawn(move || {
                    log::debug!("Fetch worker {} started", index);
                    Self::thread_loop(backend.as_ref(), &request_rx, &result_tx);
                    log::debug!("Fetch worker {} exiting", index);
                })?;
            worker.thread_handles.push(handle);
        }
        log::info!("Fetch pool of {} threads started", worker.thread_handles.len());
        Ok(worker)
    }

    fn thread_loop(
        backend: &dyn Backend,
        request_rx: &Mutex<Receiver<WorkerMessage>>,
        result_tx: &Sender<FetchResult>,
    ) {
        loop {
            // The lock is released before the request runs
            let message = match request_rx.lock() {
                Ok(rx) => rx.recv(),
                Err(_) => {
                    log::warn!("Request channel lock poisoned, fetch worker exiting");
                    break;
                }
            };
            match message {
                Ok(WorkerMessage::Fetch(ticket, request)) => {
                    log::trace!("Fetching {} ({:?})", request.label(), ticket);
                    let result = FetchResult::run(ticket, request, backend);
                    if let Err(e) = &result.outcome {
                        log::debug!("Fetch of {} failed: {}", result.request.label(), e);
                    }
                    if result_tx.send(result).is_err() {
                        log::warn!("Result channel closed, fetch worker exiting");
                        break;
                    }
                }
                Ok(WorkerMessage::Shutdown) => {
                    log::trace!("Received shutdown signal");
                    break;
                }
                Err(_) => {
                    log::debug!("Request channel closed, fetch worker exiting");
                    break;
                }
            }
        }
    }

    /// Take one completed result. Non-blocking.
    pub fn take_one_result(&mut self) -> Option<FetchResult> {
        match self.result_rx.try_recv() {
            Ok(result) => {
                self.pending = self.pending.saturating_sub(1);
                Some(result)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                log::warn!("Fetch worker disconnected");
                None
            }
        }
    }

    /// Wait up to `timeout` for one completed result.
    pub fn wait_result(&mut self, timeout: Duration) -> Option<FetchResult> {
        match self.result_rx.recv_timeout(timeout) {
            Ok(result) => {
                self.pending = self.pending.saturating_sub(1);
                Some(result)
            }
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                log::warn!("Fetch worker disconnected");
                None
            }
        }
    }

    /// Number of requests sent whose results have not been drained.
    pub fn pending_count(&self) -> usize {
        self.pending
    }
}

impl Dispatcher for FetchWorker {
    fn dispatch(&mut self, ticket: Ticket, request: FetchRequest) {
        let label = request.label();
        if self
            .request_tx
            .send(WorkerMessage::Fetch(ticket, request))
            .is_err()
        {
            log::error!("Failed to send {} request: channel closed", label);
        } else {
            self.pending += 1;
            log::debug!("Dispatched {} ({}:{})", label, ticket.session, ticket.seq);
        }
    }
}

impl Drop for FetchWorker {
    fn drop(&mut self) {
        log::debug!("Shutting down fetch worker");

        for _ in &self.thread_handles {
            let _ = self.request_tx.send(WorkerMessage::Shutdown);
        }

        for handle in self.thread_handles.drain(..) {
            if let Err(e) = handle.join() {
                log::warn!("Fetch worker panicked: {:?}", e);
            }
        }
    }
}
