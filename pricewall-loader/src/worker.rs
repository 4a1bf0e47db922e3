//! Background fetch worker: all network and file I/O runs here.
//!
//! Communication with the host thread is via `mpsc` channels. The worker
//! owns a private rayon::ThreadPool (not the global pool) and runs each
//! fetch job on it, so slow scopes never hold up fast ones.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use thiserror::Error;

use pricewall_core::data::{DataError, SnapshotProvider};

use crate::loader::{FetchJob, FetchPayload, FetchTarget};
use crate::scope_cache::RequestId;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("failed to build worker pool: {0}")]
    Pool(String),
}

/// Commands sent from the host to the worker.
#[derive(Debug)]
pub enum WorkerCommand {
    Execute(FetchJob),
    Shutdown,
}

/// Responses sent from the worker back to the host.
#[derive(Debug)]
pub enum WorkerResponse {
    Done {
        id: RequestId,
        result: Result<FetchPayload, DataError>,
        elapsed: Duration,
    },
}

/// Handle to the running worker.
pub struct FetchWorker {
    tx: Sender<WorkerCommand>,
    rx: Receiver<WorkerResponse>,
    handle: Option<JoinHandle<()>>,
}

impl FetchWorker {
    pub fn spawn(provider: Arc<dyn SnapshotProvider>, threads: usize) -> Result<Self, WorkerError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("pricewall-fetch-{i}"))
            .build()
            .map_err(|e| WorkerError::Pool(e.to_string()))?;

        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (resp_tx, resp_rx) = mpsc::channel();

        let handle = thread::Builder::new()
            .name("pricewall-worker".into())
            .spawn(move || worker_loop(cmd_rx, resp_tx, provider, pool))?;

        Ok(Self {
            tx: cmd_tx,
            rx: resp_rx,
            handle: Some(handle),
        })
    }

    /// Queue jobs. Jobs sent after the worker stopped are dropped.
    pub fn submit(&self, jobs: impl IntoIterator<Item = FetchJob>) {
        for job in jobs {
            if self.tx.send(WorkerCommand::Execute(job)).is_err() {
                tracing::warn!("fetch worker is gone; dropping job");
                return;
            }
        }
    }

    /// Non-blocking receive.
    pub fn try_recv(&self) -> Option<WorkerResponse> {
        match self.rx.try_recv() {
            Ok(resp) => Some(resp),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<WorkerResponse> {
        match self.rx.recv_timeout(timeout) {
            Ok(resp) => Some(resp),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn shutdown(&mut self) {
        let _ = self.tx.send(WorkerCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for FetchWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(
    rx: Receiver<WorkerCommand>,
    tx: Sender<WorkerResponse>,
    provider: Arc<dyn SnapshotProvider>,
    pool: rayon::ThreadPool,
) {
    loop {
        match rx.recv() {
            Ok(WorkerCommand::Shutdown) | Err(_) => break,
            Ok(WorkerCommand::Execute(job)) => {
                let provider = Arc::clone(&provider);
                let tx = tx.clone();
                pool.spawn(move || {
                    let started = Instant::now();
                    let result = execute(provider.as_ref(), &job.target);
                    let _ = tx.send(WorkerResponse::Done {
                        id: job.id,
                        result,
                        elapsed: started.elapsed(),
                    });
                });
            }
        }
    }
    tracing::debug!("fetch worker stopped");
}

/// Run one job against the provider. Blocking.
pub fn execute(
    provider: &dyn SnapshotProvider,
    target: &FetchTarget,
) -> Result<FetchPayload, DataError> {
    match target {
        FetchTarget::Meta => provider.fetch_meta().map(FetchPayload::Meta),
        FetchTarget::Scope(scope) => provider.fetch_snapshot(scope).map(FetchPayload::Snapshot),
    }
}
