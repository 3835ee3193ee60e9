//! Background path computation.
//!
//! # Protocol
//!
//! The driver posts [`WorkerRequest`]s and drains [`WorkerResponse`]s over
//! crossbeam channels.  Every message carries the driver's generation
//! number; the worker echoes it so the driver can drop results that belong
//! to a superseded initialization.
//!
//! ```text
//! driver                              worker thread
//!   │ ComputePaths{gen, graph, job} ──▶ │ parse graph (reused if unchanged)
//!   │ ◀── Progress{gen, 20}             │ chunk 1
//!   │ ◀── Progress{gen, 40}             │ chunk 2
//!   │ ◀── PathsComputed{gen, paths}     │ done
//!   │ ComputeSinglePath{gen, s, t} ───▶ │
//!   │ ◀── SinglePathComputed{...}       │
//! ```
//!
//! Any failure is reported as `Failed{gen, reason}`.  The thread exits when
//! the request sender is dropped.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use ws_spatial::{BfsRouter, Router, WalkNetwork};

use crate::compute::{ComputeStatus, KeyedJob, PathComputation, PathJob};
use crate::matrix::KeyedMatrix;
use crate::{PathsError, PathsResult};

/// Initialization counter echoed by every worker response.
pub type Generation = u64;

// ── Messages ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum WorkerRequest {
    /// Compute every pair in `job` against the graph serialized in `graph`.
    ComputePaths {
        generation: Generation,
        graph:      Arc<str>,
        job:        KeyedJob,
        chunk_size: usize,
    },
    ComputeSinglePath {
        generation: Generation,
        graph:      Arc<str>,
        from:       String,
        to:         String,
    },
}

impl WorkerRequest {
    pub fn generation(&self) -> Generation {
        match self {
            WorkerRequest::ComputePaths { generation, .. }
            | WorkerRequest::ComputeSinglePath { generation, .. } => *generation,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorkerResponse {
    Progress { generation: Generation, percent: u8 },
    PathsComputed { generation: Generation, paths: KeyedMatrix },
    SinglePathComputed { generation: Generation, from: String, to: String, path: Vec<String> },
    Failed { generation: Generation, reason: String },
}

impl WorkerResponse {
    pub fn generation(&self) -> Generation {
        match self {
            WorkerResponse::Progress { generation, .. }
            | WorkerResponse::PathsComputed { generation, .. }
            | WorkerResponse::SinglePathComputed { generation, .. }
            | WorkerResponse::Failed { generation, .. } => *generation,
        }
    }
}

// ── OffloadConfig ─────────────────────────────────────────────────────────────

/// Offload settings.  Loaded from the `[offload]` table of the TOML file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OffloadConfig {
    /// Spawn a worker thread.  When `false` all computation is synchronous.
    pub enabled: bool,

    /// How long a blocking initialization waits for the worker before
    /// computing synchronously.
    pub timeout_ms: u64,

    /// Sources per computation chunk (one progress report per chunk).
    pub chunk_size: usize,
}

impl OffloadConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for OffloadConfig {
    fn default() -> Self {
        Self { enabled: true, timeout_ms: 30_000, chunk_size: 10 }
    }
}

// ── PathWorker ────────────────────────────────────────────────────────────────

/// Handle to the background computation thread.
///
/// Dropping the handle closes the request channel and joins the thread once
/// it finishes its current request.
pub struct PathWorker {
    requests:  Option<Sender<WorkerRequest>>,
    responses: Receiver<WorkerResponse>,
    handle:    Option<JoinHandle<()>>,
}

impl PathWorker {
    /// Spawn a worker using breadth-first routing.
    pub fn spawn() -> PathsResult<Self> {
        Self::spawn_with(BfsRouter)
    }

    /// Spawn a worker that routes with `router`.
    ///
    /// # Errors
    ///
    /// [`PathsError::WorkerUnavailable`] if the OS refuses a new thread.
    pub fn spawn_with<R: Router + 'static>(router: R) -> PathsResult<Self> {
        let (req_tx, req_rx) = channel::unbounded();
        let (resp_tx, resp_rx) = channel::unbounded();
        let handle = thread::Builder::new()
            .name("walksim-paths".into())
            .spawn(move || worker_loop(router, req_rx, resp_tx))
            .map_err(|e| PathsError::WorkerUnavailable(e.to_string()))?;
        Ok(Self { requests: Some(req_tx), responses: resp_rx, handle: Some(handle) })
    }

    pub fn post(&self, request: WorkerRequest) -> PathsResult<()> {
        self.requests
            .as_ref()
            .ok_or(PathsError::WorkerDisconnected)?
            .send(request)
            .map_err(|_| PathsError::WorkerDisconnected)
    }

    /// Next response if one is waiting.
    pub fn try_recv(&self) -> PathsResult<Option<WorkerResponse>> {
        match self.responses.try_recv() {
            Ok(resp) => Ok(Some(resp)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(PathsError::WorkerDisconnected),
        }
    }

    /// Wait up to `timeout` for the next response.  `Ok(None)` on timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> PathsResult<Option<WorkerResponse>> {
        match self.responses.recv_timeout(timeout) {
            Ok(resp) => Ok(Some(resp)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(PathsError::WorkerDisconnected),
        }
    }

    /// Close the request channel and join the thread.  Idempotent.
    pub fn shutdown(&mut self) {
        self.requests.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("path worker thread panicked");
            }
        }
    }
}

impl Drop for PathWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ── Thread body ───────────────────────────────────────────────────────────────

/// The last graph parsed, reused while requests keep sending the same text.
type ParsedGraph = Option<(Arc<str>, Arc<WalkNetwork>)>;

fn worker_loop<R: Router>(router: R, requests: Receiver<WorkerRequest>, responses: Sender<WorkerResponse>) {
    debug!("path worker started");
    let mut parsed: ParsedGraph = None;

    for request in requests.iter() {
        let generation = request.generation();
        match handle_request(&router, &mut parsed, request, &responses) {
            Ok(()) => {}
            Err(PathsError::WorkerDisconnected) => break,
            Err(e) => {
                let failed = WorkerResponse::Failed { generation, reason: e.to_string() };
                if responses.send(failed).is_err() {
                    break;
                }
            }
        }
    }
    debug!("path worker stopped");
}

fn handle_request<R: Router>(
    router:    &R,
    parsed:    &mut ParsedGraph,
    request:   WorkerRequest,
    responses: &Sender<WorkerResponse>,
) -> PathsResult<()> {
    let send = |resp: WorkerResponse| responses.send(resp).map_err(|_| PathsError::WorkerDisconnected);

    match request {
        WorkerRequest::ComputePaths { generation, graph, job, chunk_size } => {
            let network = network_for(parsed, &graph)?;
            let job = PathJob::from_keyed(&job, &network)?;
            trace!(generation, sources = job.source_count(), "computing paths");

            let mut computation = PathComputation::new(Arc::clone(&network), router, job, chunk_size);
            while let ComputeStatus::InProgress(percent) = computation.step()? {
                send(WorkerResponse::Progress { generation, percent })?;
            }
            let paths = computation.into_matrix().to_keyed(&network);
            send(WorkerResponse::PathsComputed { generation, paths })
        }
        WorkerRequest::ComputeSinglePath { generation, graph, from, to } => {
            let network = network_for(parsed, &graph)?;
            let a = network.require_node(&from)?;
            let b = network.require_node(&to)?;
            let path = router
                .route(&network, a, b)?
                .into_iter()
                .map(|n| network.node_key(n).to_owned())
                .collect();
            send(WorkerResponse::SinglePathComputed { generation, from, to, path })
        }
    }
}

fn network_for(parsed: &mut ParsedGraph, graph: &Arc<str>) -> PathsResult<Arc<WalkNetwork>> {
    if let Some((text, network)) = parsed.as_ref() {
        if Arc::ptr_eq(text, graph) || **text == **graph {
            return Ok(Arc::clone(network));
        }
    }
    let network = Arc::new(WalkNetwork::from_json(graph)?);
    *parsed = Some((Arc::clone(graph), Arc::clone(&network)));
    Ok(network)
}
