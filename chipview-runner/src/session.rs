//! Chart session: the caller-side half of the worker boundary.
//!
//! A session owns one worker thread. Each `request` validates the raw history
//! on the calling thread, bumps the request id and hands an immutable snapshot
//! to the worker. Only the newest request can ever reach `Delivered`; anything
//! older that is still in flight ends up `Cancelled` and its late responses
//! are ignored.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

use chipview_core::data::{validate_history, RawBar};
use chipview_core::{DailyBar, DisplayBundle, EngineConfig, EngineError};

use crate::worker::{spawn_worker, RequestId, WorkerCommand, WorkerResponse};

/// Superseded requests remembered for `state_of`.
const RECENT_REQUESTS: usize = 32;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("worker thread is not running")]
    Disconnected,
}

/// Lifecycle of a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Idle,
    Computing,
    Delivered,
    Failed,
    Cancelled,
}

pub struct ChartSession {
    config: EngineConfig,
    cmd_tx: Option<Sender<WorkerCommand>>,
    resp_rx: Receiver<WorkerResponse>,
    latest: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
    current: RequestId,
    state: RequestState,
    bundle: Option<DisplayBundle>,
    error: Option<EngineError>,
    recent: VecDeque<(RequestId, RequestState)>,
}

impl ChartSession {
    pub fn new(config: EngineConfig) -> Result<Self, SessionError> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (resp_tx, resp_rx) = mpsc::channel();
        let latest = Arc::new(AtomicU64::new(0));
        let handle = spawn_worker(cmd_rx, resp_tx, Arc::clone(&latest))?;

        Ok(Self {
            config,
            cmd_tx: Some(cmd_tx),
            resp_rx,
            latest,
            handle: Some(handle),
            current: 0,
            state: RequestState::Idle,
            bundle: None,
            error: None,
            recent: VecDeque::with_capacity(RECENT_REQUESTS),
        })
    }

    /// Settings used by subsequent requests. Checked by the worker, so a bad
    /// configuration surfaces as `Failed`.
    pub fn set_config(&mut self, config: EngineConfig) {
        self.config = config;
    }

    /// Validate `raw` and dispatch a computation clipped at `cutoff`.
    ///
    /// Schema errors are returned here and leave the in-flight request alone.
    pub fn request(&mut self, raw: &[RawBar], cutoff: i64) -> Result<RequestId, SessionError> {
        let bars = validate_history(raw, self.config.strict_ohlc)?;
        self.request_bars(bars.into(), cutoff)
    }

    /// Dispatch already validated bars.
    pub fn request_bars(
        &mut self,
        history: Arc<[DailyBar]>,
        cutoff: i64,
    ) -> Result<RequestId, SessionError> {
        let request = self.current + 1;
        let bars = history.len();
        let command = WorkerCommand::Compute {
            request,
            history,
            cutoff,
            config: self.config.clone(),
        };
        let tx = self.cmd_tx.as_ref().ok_or(SessionError::Disconnected)?;
        self.latest.store(request, Ordering::Release);
        tx.send(command).map_err(|_| SessionError::Disconnected)?;

        if self.current != 0 {
            let previous = match self.state {
                RequestState::Computing => {
                    debug!(request = self.current, "superseded");
                    RequestState::Cancelled
                }
                other => other,
            };
            self.remember(self.current, previous);
        }

        self.current = request;
        self.state = RequestState::Computing;
        self.bundle = None;
        self.error = None;
        debug!(request, bars, cutoff, "dispatched");
        Ok(request)
    }

    /// Drain pending responses without blocking. A dead worker cancels the
    /// unfinished request, as in `wait`.
    pub fn poll(&mut self) -> RequestState {
        loop {
            match self.resp_rx.try_recv() {
                Ok(response) => self.accept(response),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if self.state == RequestState::Computing {
                        warn!(request = self.current, "worker gone, request cancelled");
                        self.state = RequestState::Cancelled;
                    }
                    break;
                }
            }
        }
        self.state
    }

    /// Block until the newest request resolves or `timeout` elapses.
    pub fn wait(&mut self, timeout: Duration) -> RequestState {
        let deadline = Instant::now() + timeout;
        while self.state == RequestState::Computing {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.resp_rx.recv_timeout(remaining) {
                Ok(response) => self.accept(response),
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => {
                    self.state = RequestState::Cancelled;
                    break;
                }
            }
        }
        self.state
    }

    fn accept(&mut self, response: WorkerResponse) {
        let request = response.request();
        if request != self.current || self.state != RequestState::Computing {
            debug!(request, current = self.current, "discarding stale response");
            return;
        }
        match response {
            WorkerResponse::Delivered { bundle, .. } => {
                self.state = RequestState::Delivered;
                self.bundle = Some(*bundle);
            }
            WorkerResponse::Failed { error, .. } => {
                self.state = RequestState::Failed;
                self.error = Some(error);
            }
        }
    }

    fn remember(&mut self, request: RequestId, state: RequestState) {
        if self.recent.len() == RECENT_REQUESTS {
            self.recent.pop_front();
        }
        self.recent.push_back((request, state));
    }

    /// Id of the newest request, `0` before the first one.
    pub fn current_request(&self) -> RequestId {
        self.current
    }

    /// State of the newest request.
    pub fn state(&self) -> RequestState {
        self.state
    }

    /// State of any recent request. Ids never issued are `Idle`.
    pub fn state_of(&self, request: RequestId) -> RequestState {
        if request == self.current && request != 0 {
            return self.state;
        }
        self.recent
            .iter()
            .find(|(id, _)| *id == request)
            .map(|(_, state)| *state)
            .unwrap_or(RequestState::Idle)
    }

    /// The delivered bundle of the newest request.
    pub fn bundle(&self) -> Option<&DisplayBundle> {
        self.bundle.as_ref()
    }

    pub fn take_bundle(&mut self) -> Option<DisplayBundle> {
        self.bundle.take()
    }

    /// Why the newest request failed.
    pub fn error(&self) -> Option<&EngineError> {
        self.error.as_ref()
    }

    /// Stop the worker and join its thread. An unfinished request becomes
    /// `Cancelled`. Safe to call more than once.
    pub fn shutdown(&mut self) {
        let Some(tx) = self.cmd_tx.take() else {
            return;
        };
        self.latest.store(u64::MAX, Ordering::Release);
        if self.state == RequestState::Computing {
            self.state = RequestState::Cancelled;
        }
        let _ = tx.send(WorkerCommand::Shutdown);
        drop(tx);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("worker thread panicked");
            }
        }
        info!(requests = self.current, "chart session closed");
    }

    pub fn is_running(&self) -> bool {
        self.cmd_tx.is_some()
    }
}

impl Drop for ChartSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}
