//! Worker thread logic for batch command execution
//!
//! Each worker pulls parsed commands from the shared queue and applies them
//! to the namespace until the queue disconnects. Domain failures are counted
//! and logged, never fatal; the run keeps going.

use crate::command::Command;
use crate::dispatch::queue::CommandReceiver;
use crate::error::WorkerError;
use crate::fs::Namespace;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info};

/// Statistics collected by a worker
#[derive(Debug, Default)]
pub struct WorkerStats {
    /// Commands executed
    pub processed: AtomicU64,

    /// Commands that completed with a non-negative status
    pub succeeded: AtomicU64,

    /// Commands that reported a domain error
    pub failed: AtomicU64,
}

impl WorkerStats {
    fn record(&self, status: i64) {
        self.processed.fetch_add(1, Ordering::Relaxed);
        if status >= 0 {
            self.succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Apply one command to the namespace, returning its numeric status.
///
/// Success is 0, except lookup which returns the found inumber. Domain
/// errors map to their negative status codes.
pub fn apply_command(namespace: &Namespace, command: &Command) -> i64 {
    let result = match command {
        Command::Create { path, kind } => namespace.create(path, *kind).map(|_| 0),
        Command::Delete { path } => namespace.remove(path).map(|_| 0),
        Command::Lookup { path } => namespace.lookup(path).map(|inumber| inumber as i64),
        Command::Move { from, to } => namespace.rename(from, to).map(|_| 0),
    };
    match result {
        Ok(status) => {
            debug!(op = command.op(), status, "command ok");
            status
        }
        Err(err) => {
            debug!(op = command.op(), status = err.status(), error = %err, "command failed");
            err.status()
        }
    }
}

/// A worker thread that executes queued commands
pub struct Worker {
    id: usize,
    handle: Option<JoinHandle<()>>,
    stats: Arc<WorkerStats>,
}

impl Worker {
    /// Spawn a new worker thread
    pub fn spawn(
        id: usize,
        namespace: Arc<Namespace>,
        receiver: CommandReceiver,
    ) -> Result<Self, WorkerError> {
        let stats = Arc::new(WorkerStats::default());
        let stats_clone = Arc::clone(&stats);

        let handle = thread::Builder::new()
            .name(format!("treefs-{id}"))
            .spawn(move || worker_loop(id, namespace, receiver, stats_clone))
            .map_err(|e| WorkerError::SpawnFailed { id, reason: e.to_string() })?;

        Ok(Self { id, handle: Some(handle), stats })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn stats(&self) -> &WorkerStats {
        &self.stats
    }

    /// Wait for the worker to finish
    pub fn join(mut self) -> Result<Arc<WorkerStats>, WorkerError> {
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| WorkerError::Panicked { id: self.id })?;
        }
        Ok(Arc::clone(&self.stats))
    }
}

fn worker_loop(
    id: usize,
    namespace: Arc<Namespace>,
    receiver: CommandReceiver,
    stats: Arc<WorkerStats>,
) {
    debug!(worker = id, "worker starting");
    while let Some(command) = receiver.recv() {
        let status = apply_command(&namespace, &command);
        stats.record(status);
    }
    info!(
        worker = id,
        processed = stats.processed.load(Ordering::Relaxed),
        failed = stats.failed.load(Ordering::Relaxed),
        "worker finished"
    );
}
