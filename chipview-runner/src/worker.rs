//! Background worker thread: bundle computation runs here.
//!
//! Communication with the session is via `mpsc` channels. The worker creates
//! a private `rayon::ThreadPool` (not the global pool) and installs it around
//! every computation.
//!
//! Requests are numbered. Before and after each computation the worker checks
//! the shared `latest` marker; a request that is no longer the newest is
//! dropped without a response.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use chipview_core::{build_bundle, DailyBar, DisplayBundle, EngineConfig, EngineError};

/// Monotonically increasing request number. `0` means "no request yet".
pub type RequestId = u64;

/// Threads in the worker's private pool (one per concurrently computed SMA).
const POOL_THREADS: usize = 5;

/// Commands sent from the session to the worker.
#[derive(Debug)]
pub enum WorkerCommand {
    Compute {
        request: RequestId,
        history: Arc<[DailyBar]>,
        cutoff: i64,
        config: EngineConfig,
    },
    Shutdown,
}

/// Responses sent from the worker back to the session.
#[derive(Debug, Clone)]
pub enum WorkerResponse {
    Delivered {
        request: RequestId,
        bundle: Box<DisplayBundle>,
    },
    Failed {
        request: RequestId,
        error: EngineError,
    },
}

impl WorkerResponse {
    pub fn request(&self) -> RequestId {
        match self {
            WorkerResponse::Delivered { request, .. } | WorkerResponse::Failed { request, .. } => {
                *request
            }
        }
    }
}

/// Spawn the background worker thread.
///
/// `latest` holds the newest issued request id; the session bumps it before
/// sending each `Compute`.
pub fn spawn_worker(
    rx: Receiver<WorkerCommand>,
    tx: Sender<WorkerResponse>,
    latest: Arc<AtomicU64>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("chipview-worker".into())
        .spawn(move || {
            worker_loop(rx, tx, latest);
        })
}

fn worker_loop(rx: Receiver<WorkerCommand>, tx: Sender<WorkerResponse>, latest: Arc<AtomicU64>) {
    let pool = match rayon::ThreadPoolBuilder::new()
        .num_threads(POOL_THREADS)
        .thread_name(|i| format!("chipview-pool-{i}"))
        .build()
    {
        Ok(pool) => Some(pool),
        Err(e) => {
            warn!(error = %e, "private pool unavailable, computing on the worker thread");
            None
        }
    };

    loop {
        let cmd = match rx.recv() {
            Ok(WorkerCommand::Shutdown) | Err(_) => break,
            Ok(cmd) => cmd,
        };
        let Some(cmd) = coalesce(cmd, &rx) else {
            break;
        };

        let WorkerCommand::Compute {
            request,
            history,
            cutoff,
            config,
        } = cmd
        else {
            break;
        };

        if is_stale(request, &latest) {
            debug!(request, "skipping superseded request");
            continue;
        }

        let result = match &pool {
            Some(pool) => pool.install(|| build_bundle(&history, cutoff, &config)),
            None => build_bundle(&history, cutoff, &config),
        };

        if is_stale(request, &latest) {
            debug!(request, "discarding result of superseded request");
            continue;
        }

        let response = match result {
            Ok(bundle) => {
                debug!(request, points = bundle.len(), "bundle ready");
                WorkerResponse::Delivered {
                    request,
                    bundle: Box::new(bundle),
                }
            }
            Err(error) => {
                warn!(request, %error, "bundle computation failed");
                WorkerResponse::Failed { request, error }
            }
        };
        if tx.send(response).is_err() {
            break;
        }
    }
    debug!("worker stopped");
}

/// Replace `cmd` with the newest queued `Compute`. `None` means a shutdown
/// was queued (or the session hung up) and the loop should exit.
fn coalesce(mut cmd: WorkerCommand, rx: &Receiver<WorkerCommand>) -> Option<WorkerCommand> {
    loop {
        match rx.try_recv() {
            Ok(WorkerCommand::Shutdown) | Err(TryRecvError::Disconnected) => return None,
            Ok(newer @ WorkerCommand::Compute { .. }) => {
                if let WorkerCommand::Compute { request, .. } = &cmd {
                    debug!(request = *request, "coalesced into a newer request");
                }
                cmd = newer;
            }
            Err(TryRecvError::Empty) => return Some(cmd),
        }
    }
}

fn is_stale(request: RequestId, latest: &AtomicU64) -> bool {
    request < latest.load(Ordering::Acquire)
}
