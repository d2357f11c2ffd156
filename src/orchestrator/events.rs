//! Orchestrator events and the observers that consume them

use super::worker::WorkerHandle;
use crate::model::AnalysisResult;
use crossbeam_channel::Sender;
use std::path::{Path, PathBuf};

/// Event published to observers, in emission order per request
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisEvent {
    Started {
        handle: WorkerHandle,
        path: PathBuf,
    },
    Progress {
        handle: WorkerHandle,
        message: String,
        percent: u8,
    },
    Completed {
        handle: WorkerHandle,
        path: PathBuf,
        result: AnalysisResult,
    },
    /// `handle` is `None` when the request was rejected before a worker existed
    Failed {
        handle: Option<WorkerHandle>,
        path: PathBuf,
        error: String,
    },
}

impl AnalysisEvent {
    pub fn handle(&self) -> Option<WorkerHandle> {
        match self {
            AnalysisEvent::Started { handle, .. }
            | AnalysisEvent::Progress { handle, .. }
            | AnalysisEvent::Completed { handle, .. } => Some(*handle),
            AnalysisEvent::Failed { handle, .. } => *handle,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AnalysisEvent::Completed { .. } | AnalysisEvent::Failed { .. }
        )
    }
}

/// Presentation-layer listener; every callback defaults to a no-op
pub trait AnalysisObserver {
    fn on_started(&mut self, _handle: WorkerHandle, _path: &Path) {}

    fn on_progress(&mut self, _handle: WorkerHandle, _message: &str, _percent: u8) {}

    fn on_completed(&mut self, _handle: WorkerHandle, _path: &Path, _result: &AnalysisResult) {}

    fn on_failed(&mut self, _handle: Option<WorkerHandle>, _path: &Path, _error: &str) {}
}

/// Identifies a registered observer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Registered observers, notified in registration order
#[derive(Default)]
pub(crate) struct ObserverRegistry {
    next_id: u64,
    observers: Vec<(ObserverId, Box<dyn AnalysisObserver>)>,
}

impl ObserverRegistry {
    pub(crate) fn subscribe(&mut self, observer: Box<dyn AnalysisObserver>) -> ObserverId {
        self.next_id += 1;
        let id = ObserverId(self.next_id);
        self.observers.push((id, observer));
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(existing, _)| *existing != id);
        self.observers.len() != before
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.observers.len()
    }

    pub(crate) fn started(&mut self, handle: WorkerHandle, path: &Path) {
        for (_, observer) in &mut self.observers {
            observer.on_started(handle, path);
        }
    }

    pub(crate) fn progress(&mut self, handle: WorkerHandle, message: &str, percent: u8) {
        for (_, observer) in &mut self.observers {
            observer.on_progress(handle, message, percent);
        }
    }

    pub(crate) fn completed(&mut self, handle: WorkerHandle, path: &Path, result: &AnalysisResult) {
        for (_, observer) in &mut self.observers {
            observer.on_completed(handle, path, result);
        }
    }

    pub(crate) fn failed(&mut self, handle: Option<WorkerHandle>, path: &Path, error: &str) {
        for (_, observer) in &mut self.observers {
            observer.on_failed(handle, path, error);
        }
    }
}

/// Forwards owned events into a channel
///
/// Sending never blocks (the channel should be unbounded); a dropped receiver
/// silently discards events.
pub struct ChannelObserver {
    tx: Sender<AnalysisEvent>,
}

impl ChannelObserver {
    pub fn new(tx: Sender<AnalysisEvent>) -> Self {
        Self { tx }
    }

    fn send(&self, event: AnalysisEvent) {
        if self.tx.send(event).is_err() {
            log::trace!("Event receiver dropped, discarding event");
        }
    }
}

impl AnalysisObserver for ChannelObserver {
    fn on_started(&mut self, handle: WorkerHandle, path: &Path) {
        self.send(AnalysisEvent::Started {
            handle,
            path: path.to_path_buf(),
        });
    }

    fn on_progress(&mut self, handle: WorkerHandle, message: &str, percent: u8) {
        self.send(AnalysisEvent::Progress {
            handle,
            message: message.to_string(),
            percent,
        });
    }

    fn on_completed(&mut self, handle: WorkerHandle, path: &Path, result: &AnalysisResult) {
        self.send(AnalysisEvent::Completed {
            handle,
            path: path.to_path_buf(),
            result: result.clone(),
        });
    }

    fn on_failed(&mut self, handle: Option<WorkerHandle>, path: &Path, error: &str) {
        self.send(AnalysisEvent::Failed {
            handle,
            path: path.to_path_buf(),
            error: error.to_string(),
        });
    }
}

/// Logs every event
#[derive(Debug, Default)]
pub struct LoggingObserver;

impl AnalysisObserver for LoggingObserver {
    fn on_started(&mut self, handle: WorkerHandle, path: &Path) {
        log::info!("[{}] Analysis started: {:?}", handle, path);
    }

    fn on_progress(&mut self, handle: WorkerHandle, message: &str, percent: u8) {
        log::info!("[{}] {:>3}% {}", handle, percent, message);
    }

    fn on_completed(&mut self, handle: WorkerHandle, path: &Path, result: &AnalysisResult) {
        log::info!(
            "[{}] Analysis completed: {:?} ({}, {:.1} BPM)",
            handle,
            path,
            result.display_name,
            result.bpm
        );
    }

    fn on_failed(&mut self, handle: Option<WorkerHandle>, path: &Path, error: &str) {
        match handle {
            Some(handle) => log::error!("[{}] {:?}: {}", handle, path, error),
            None => log::error!("{:?}: {}", path, error),
        }
    }
}
