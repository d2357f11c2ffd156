//! One-shot analysis worker running the engine off the control thread
//!
//! Lifecycle: `Created -> Running -> {Completed | Failed | Cancelled}`.
//! Everything the worker reports travels over the orchestrator's channel
//! tagged with its `WorkerHandle`.

use crate::analysis::{AnalysisEngine, Checkpoint, ProgressSink};
use crate::error::AnalysisError;
use crate::model::{AnalysisRequest, AnalysisResult};
use crossbeam_channel::Sender;
use std::cell::Cell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Message shown with the final 100% progress event
pub const COMPLETE_MESSAGE: &str = "Analysis complete";

/// Identifies one analysis attempt; never reused within an orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerHandle(u64);

impl WorkerHandle {
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WorkerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker-{}", self.0)
    }
}

/// Cooperative cancellation flag shared with the worker thread
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    Created = 0,
    Running = 1,
    Completed = 2,
    Failed = 3,
    Cancelled = 4,
}

impl WorkerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => WorkerState::Created,
            1 => WorkerState::Running,
            2 => WorkerState::Completed,
            3 => WorkerState::Failed,
            _ => WorkerState::Cancelled,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct SharedState(Arc<AtomicU8>);

impl SharedState {
    fn get(&self) -> WorkerState {
        WorkerState::from_u8(self.0.load(Ordering::SeqCst))
    }

    fn set(&self, state: WorkerState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }
}

/// Payload of a worker report
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum WorkerEvent {
    Progress { message: String, percent: u8 },
    Completed(AnalysisResult),
    Failed(String),
}

/// Worker report tagged with its origin
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct WorkerMessage {
    pub handle: WorkerHandle,
    pub event: WorkerEvent,
}

/// A single analysis attempt bound to one request
///
/// Dropping a worker that is still running cancels and joins it.
pub struct AnalysisWorker {
    handle: WorkerHandle,
    request: AnalysisRequest,
    token: CancellationToken,
    state: SharedState,
    thread: Option<JoinHandle<()>>,
}

impl AnalysisWorker {
    pub(crate) fn new(handle: WorkerHandle, request: AnalysisRequest) -> Self {
        Self {
            handle,
            request,
            token: CancellationToken::new(),
            state: SharedState::default(),
            thread: None,
        }
    }

    pub fn handle(&self) -> WorkerHandle {
        self.handle
    }

    pub fn request(&self) -> &AnalysisRequest {
        &self.request
    }

    pub fn state(&self) -> WorkerState {
        self.state.get()
    }

    /// Spawn the worker thread (`Created -> Running`)
    pub(crate) fn start<E: AnalysisEngine + 'static>(
        &mut self,
        engine: Arc<E>,
        tx: Sender<WorkerMessage>,
    ) -> Result<(), AnalysisError> {
        if self.state() != WorkerState::Created {
            log::warn!("[{}] Worker already started", self.handle);
            return Ok(());
        }

        self.state.set(WorkerState::Running);

        let handle = self.handle;
        let request = self.request.clone();
        let token = self.token.clone();
        let state = self.state.clone();

        let spawned = thread::Builder::new()
            .name(format!("analysis-{}", handle.id()))
            .spawn(move || run(handle, request, engine.as_ref(), token, state, tx));

        match spawned {
            Ok(thread) => {
                log::debug!("[{}] Worker running for {:?}", self.handle, self.request.path());
                self.thread = Some(thread);
                Ok(())
            }
            Err(e) => {
                self.state.set(WorkerState::Failed);
                Err(AnalysisError::WorkerSpawn(e.to_string()))
            }
        }
    }

    /// Ask the worker to stop at its next checkpoint
    pub(crate) fn cancel(&self) {
        self.token.cancel();
    }

    /// Wait for the worker thread to exit and return its final state
    pub(crate) fn join(&mut self) -> WorkerState {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("[{}] Worker thread panicked", self.handle);
                self.state.set(WorkerState::Failed);
            }
        }
        self.state()
    }
}

impl Drop for AnalysisWorker {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.cancel();
            self.join();
        }
    }
}

impl fmt::Debug for AnalysisWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisWorker")
            .field("handle", &self.handle)
            .field("request", &self.request)
            .field("state", &self.state())
            .finish()
    }
}

/// Progress sink handed to the engine by a running worker
struct WorkerProgress<'a> {
    handle: WorkerHandle,
    token: &'a CancellationToken,
    tx: &'a Sender<WorkerMessage>,
    last_percent: Cell<u8>,
}

impl<'a> WorkerProgress<'a> {
    fn new(handle: WorkerHandle, token: &'a CancellationToken, tx: &'a Sender<WorkerMessage>) -> Self {
        Self {
            handle,
            token,
            tx,
            last_percent: Cell::new(0),
        }
    }

    /// Send a progress event, never going backwards
    fn report(&self, message: &str, percent: u8) -> Result<(), AnalysisError> {
        let percent = percent.min(100).max(self.last_percent.get());
        self.last_percent.set(percent);

        self.tx
            .send(WorkerMessage {
                handle: self.handle,
                event: WorkerEvent::Progress {
                    message: message.to_string(),
                    percent,
                },
            })
            // Orchestrator gone: nobody wants the rest of this run
            .map_err(|_| AnalysisError::Cancelled)
    }
}

impl ProgressSink for WorkerProgress<'_> {
    fn checkpoint(&self, checkpoint: Checkpoint) -> Result<(), AnalysisError> {
        if self.token.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }
        self.report(checkpoint.message(), checkpoint.percent())
    }

    fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

fn run<E: AnalysisEngine + ?Sized>(
    handle: WorkerHandle,
    request: AnalysisRequest,
    engine: &E,
    token: CancellationToken,
    state: SharedState,
    tx: Sender<WorkerMessage>,
) {
    let progress = WorkerProgress::new(handle, &token, &tx);

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        engine.analyze(
            request.path(),
            request.window_seconds(),
            request.hop_seconds(),
            &progress,
        )
    }))
    .unwrap_or_else(|payload| Err(anyhow::anyhow!("engine panicked: {}", panic_message(&*payload))));

    if token.is_cancelled() {
        state.set(WorkerState::Cancelled);
        log::debug!("[{}] Worker cancelled", handle);
        return;
    }

    let outcome = match outcome {
        Ok(outcome) if outcome.times.len() != outcome.energy_levels.len() => Err(anyhow::anyhow!(
            "engine returned {} times for {} energy levels",
            outcome.times.len(),
            outcome.energy_levels.len()
        )),
        other => other,
    };

    match outcome {
        Ok(outcome) => {
            if progress.report(COMPLETE_MESSAGE, 100).is_err() {
                state.set(WorkerState::Cancelled);
                return;
            }
            let result = AnalysisResult::from_outcome(request.file_identity(), outcome);
            state.set(WorkerState::Completed);
            log::debug!("[{}] Worker completed", handle);
            send(&tx, handle, WorkerEvent::Completed(result));
        }
        Err(e) => {
            if AnalysisError::is_cancellation(&e) {
                log::warn!("[{}] Engine stopped without a cancellation request", handle);
            }
            let message = AnalysisError::EngineFailure(format!("{:#}", e)).to_string();
            state.set(WorkerState::Failed);
            log::debug!("[{}] Worker failed: {}", handle, message);
            send(&tx, handle, WorkerEvent::Failed(message));
        }
    }
}

fn send(tx: &Sender<WorkerMessage>, handle: WorkerHandle, event: WorkerEvent) {
    if tx.send(WorkerMessage { handle, event }).is_err() {
        log::debug!("[{}] Orchestrator gone, dropping result", handle);
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
