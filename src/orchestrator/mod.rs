//! Analysis request orchestration
//!
//! The orchestrator lives on the control thread. It owns the result cache and
//! the single worker slot, and it is the only place either is mutated:
//! worker reports arrive over a channel and are applied when the control
//! thread calls `process_events` (or `wait_for_idle`).

mod cache;
mod events;
mod worker;

pub use cache::ResultCache;
pub use events::{AnalysisEvent, AnalysisObserver, ChannelObserver, LoggingObserver, ObserverId};
pub use worker::{AnalysisWorker, CancellationToken, WorkerHandle, WorkerState, COMPLETE_MESSAGE};

use crate::analysis::AnalysisEngine;
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::model::{file_identity, AnalysisParams, AnalysisRequest, AnalysisResult, NO_ANALYSIS_TEXT};
use crate::render::{DisplayArtifact, PlotRenderer};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use events::ObserverRegistry;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use worker::{WorkerEvent, WorkerMessage};

/// Single-flight analysis orchestrator
///
/// At most one worker is current at any time. A new request cancels and joins
/// the previous worker before the new one starts, and any report still queued
/// from a superseded worker is discarded by handle. Dropping the orchestrator
/// cancels and joins the running worker.
pub struct AnalysisOrchestrator<E: AnalysisEngine + 'static> {
    engine: Arc<E>,
    cache: ResultCache,
    current: Option<AnalysisWorker>,
    next_handle: u64,
    tx: Sender<WorkerMessage>,
    rx: Receiver<WorkerMessage>,
    observers: ObserverRegistry,
    renderer: PlotRenderer,
    default_params: AnalysisParams,
}

impl<E: AnalysisEngine + 'static> AnalysisOrchestrator<E> {
    pub fn new(engine: E) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            engine: Arc::new(engine),
            cache: ResultCache::new(),
            current: None,
            next_handle: 0,
            tx,
            rx,
            observers: ObserverRegistry::default(),
            renderer: PlotRenderer::default(),
            default_params: AnalysisParams::default(),
        }
    }

    /// Create an orchestrator using the config's default params and renderer
    pub fn from_config(engine: E, config: &AnalysisConfig) -> Self {
        Self::new(engine)
            .with_default_params(config.params)
            .with_renderer(PlotRenderer::new(config.render.clone()))
    }

    pub fn with_default_params(mut self, params: AnalysisParams) -> Self {
        self.default_params = params;
        self
    }

    pub fn with_renderer(mut self, renderer: PlotRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn default_params(&self) -> AnalysisParams {
        self.default_params
    }

    /// Register an observer; it sees every event emitted from now on
    pub fn subscribe(&mut self, observer: impl AnalysisObserver + 'static) -> ObserverId {
        self.observers.subscribe(Box::new(observer))
    }

    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// Request analysis with the default window/hop
    pub fn analyze(&mut self, path: impl AsRef<Path>) -> Result<WorkerHandle, AnalysisError> {
        let params = self.default_params;
        self.request_analysis(path, params)
    }

    /// Start analyzing `path`, superseding whatever is running
    ///
    /// Returns as soon as the new worker is started. A missing or unreadable
    /// file is reported through `Failed` right away and leaves the running
    /// worker untouched.
    pub fn request_analysis(
        &mut self,
        path: impl AsRef<Path>,
        params: AnalysisParams,
    ) -> Result<WorkerHandle, AnalysisError> {
        let path = path.as_ref();

        if !is_readable_file(path) {
            let err = AnalysisError::NotFound(path.display().to_string());
            log::warn!("{}", err);
            self.observers.failed(None, path, &err.to_string());
            return Err(err);
        }

        // Deliver what the current worker already reported, then retire it
        self.process_events();
        if let Some(previous) = self.current.take() {
            self.retire(previous);
        }

        self.next_handle += 1;
        let handle = WorkerHandle::new(self.next_handle);
        let mut worker = AnalysisWorker::new(handle, AnalysisRequest::new(path, params));

        log::info!("[{}] Analysis requested: {:?} ({})", handle, path, params);
        self.observers.started(handle, path);

        match worker.start(Arc::clone(&self.engine), self.tx.clone()) {
            Ok(()) => {
                self.current = Some(worker);
                Ok(handle)
            }
            Err(err) => {
                log::error!("[{}] {}", handle, err);
                self.observers.failed(Some(handle), path, &err.to_string());
                Err(err)
            }
        }
    }

    /// Cancel the running analysis, if any. No terminal event is emitted for it.
    pub fn cancel(&mut self) -> bool {
        match self.current.take() {
            Some(worker) => {
                self.retire(worker);
                true
            }
            None => false,
        }
    }

    /// Apply every queued worker report without blocking
    ///
    /// Returns the number of events delivered to observers; stale reports are
    /// dropped and not counted.
    pub fn process_events(&mut self) -> usize {
        let mut delivered = 0;
        while let Ok(message) = self.rx.try_recv() {
            if self.dispatch(message) {
                delivered += 1;
            }
        }
        delivered
    }

    /// Block until no analysis is running or `timeout` elapses
    ///
    /// Meant for batch front ends and tests; an interactive loop should call
    /// `process_events` instead. Returns true when idle.
    pub fn wait_for_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.process_events();
            if self.current.is_none() {
                return true;
            }

            let now = Instant::now();
            if now >= deadline {
                return false;
            }

            match self.rx.recv_timeout(deadline - now) {
                Ok(message) => {
                    self.dispatch(message);
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return self.current.is_none();
                }
            }
        }
    }

    pub fn current_handle(&self) -> Option<WorkerHandle> {
        self.current.as_ref().map(AnalysisWorker::handle)
    }

    pub fn current_state(&self) -> Option<WorkerState> {
        self.current.as_ref().map(AnalysisWorker::state)
    }

    pub fn is_busy(&self) -> bool {
        self.current.is_some()
    }

    pub fn get_cached_result(&self, identity: impl AsRef<Path>) -> Option<&AnalysisResult> {
        self.cache.get(&file_identity(identity))
    }

    /// Metadata summary of a cached result, or a "no data" sentinel
    pub fn get_display_text(&self, identity: impl AsRef<Path>) -> String {
        match self.get_cached_result(identity) {
            Some(result) => result.display_text(),
            None => NO_ANALYSIS_TEXT.to_string(),
        }
    }

    /// Power plot of a cached result
    pub fn get_display_artifact(&self, identity: impl AsRef<Path>) -> Option<DisplayArtifact> {
        self.get_cached_result(identity).map(|result| {
            self.renderer
                .render(&result.times, &result.energy_levels, &result.file_identity)
        })
    }

    pub fn is_analyzed(&self, identity: impl AsRef<Path>) -> bool {
        self.cache.contains(&file_identity(identity))
    }

    pub fn remove_cached(&mut self, identity: impl AsRef<Path>) -> Option<AnalysisResult> {
        self.cache.remove(&file_identity(identity))
    }

    /// Drop all cached results; a running analysis is not affected
    pub fn clear_cache(&mut self) {
        log::debug!("Clearing {} cached results", self.cache.len());
        self.cache.clear();
    }

    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }

    /// Cancel and join a worker that is no longer current, then drop its
    /// leftover reports
    fn retire(&mut self, mut worker: AnalysisWorker) {
        let handle = worker.handle();
        worker.cancel();
        let state = worker.join();
        log::info!(
            "[{}] Superseded analysis of {:?} ({:?})",
            handle,
            worker.request().path(),
            state
        );
        self.process_events();
    }

    /// Apply one worker report; returns false when it was stale
    fn dispatch(&mut self, message: WorkerMessage) -> bool {
        let current = self.current.as_ref().map(AnalysisWorker::handle);
        if current != Some(message.handle) {
            log::trace!("Discarding report from superseded {}", message.handle);
            return false;
        }

        let handle = message.handle;
        match message.event {
            WorkerEvent::Progress { message, percent } => {
                self.observers.progress(handle, &message, percent);
            }
            WorkerEvent::Completed(result) => {
                let Some(mut worker) = self.current.take() else {
                    return false;
                };
                worker.join();

                let identity = result.file_identity.clone();
                log::info!("[{}] Analysis completed: {}", handle, result.display_name);
                self.cache.put(identity.clone(), result);

                if let Some(result) = self.cache.get(&identity) {
                    self.observers
                        .completed(handle, worker.request().path(), result);
                }
            }
            WorkerEvent::Failed(error) => {
                let Some(mut worker) = self.current.take() else {
                    return false;
                };
                worker.join();

                log::warn!("[{}] {}", handle, error);
                self.observers
                    .failed(Some(handle), worker.request().path(), &error);
            }
        }
        true
    }
}

fn is_readable_file(path: &Path) -> bool {
    match fs::metadata(path) {
        Ok(meta) if meta.is_file() => fs::File::open(path).is_ok(),
        _ => false,
    }
}
