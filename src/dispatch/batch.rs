//! Batch coordinator
//!
//! Replays a command file against the namespace: the coordinator parses the
//! input up front (a malformed line aborts the run before any command
//! executes), then feeds commands through the bounded queue to the worker
//! pool, joins the pool, and dumps the final tree to the output file.

use crate::command::{parse_line, Command};
use crate::config::BatchConfig;
use crate::dispatch::queue::CommandQueue;
use crate::dispatch::worker::Worker;
use crate::error::{Result, TreefsError};
use crate::fs::Namespace;
use std::fs;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};

/// Result of a completed batch run
#[derive(Debug)]
pub struct BatchResult {
    /// Commands executed
    pub commands: u64,

    /// Commands that completed with a non-negative status
    pub succeeded: u64,

    /// Commands that reported a domain error
    pub failed: u64,

    /// Worker threads used
    pub workers: usize,

    /// Wall-clock time from first enqueue to tree dump
    pub duration: Duration,
}

/// Coordinates a batch run
pub struct BatchCoordinator {
    config: BatchConfig,
    namespace: Arc<Namespace>,
}

impl BatchCoordinator {
    pub fn new(config: BatchConfig) -> Result<Self> {
        let namespace = Arc::new(Namespace::new(config.table_capacity)?);
        Ok(Self { config, namespace })
    }

    /// Run the batch: parse, execute, dump.
    pub fn run(self) -> Result<BatchResult> {
        let commands = self.load_commands()?;
        info!(
            input = %self.config.input_path.display(),
            commands = commands.len(),
            workers = self.config.worker_count,
            "starting batch run"
        );

        let start = Instant::now();
        let queue = CommandQueue::new(self.config.queue_size);
        let sender = queue.sender();

        let mut workers = Vec::with_capacity(self.config.worker_count);
        for id in 0..self.config.worker_count {
            workers.push(Worker::spawn(id, Arc::clone(&self.namespace), queue.receiver())?);
        }
        // The queue's own sender must go before the handle, or workers
        // would never see the disconnect.
        drop(queue);

        for command in commands {
            if sender.send(command).is_err() {
                return Err(TreefsError::QueueClosed);
            }
        }
        drop(sender);

        let mut succeeded = 0;
        let mut failed = 0;
        for worker in workers {
            let stats = worker.join()?;
            succeeded += stats.succeeded.load(Ordering::Relaxed);
            failed += stats.failed.load(Ordering::Relaxed);
        }

        let dump = self.namespace.render_tree().map_err(TreefsError::Fs)?;
        fs::write(&self.config.output_path, dump)?;
        let duration = start.elapsed();

        info!(
            output = %self.config.output_path.display(),
            succeeded,
            failed,
            duration_ms = duration.as_millis() as u64,
            "batch run complete"
        );

        Ok(BatchResult {
            commands: succeeded + failed,
            succeeded,
            failed,
            workers: self.config.worker_count,
            duration,
        })
    }

    /// Read and parse the whole input file. Any malformed line is fatal.
    fn load_commands(&self) -> Result<Vec<Command>> {
        let text = fs::read_to_string(&self.config.input_path)?;
        let mut commands = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            match parse_line(line) {
                Ok(Some(command)) => commands.push(command),
                Ok(None) => {}
                Err(err) => {
                    error!(
                        input = %self.config.input_path.display(),
                        line = lineno + 1,
                        error = %err,
                        "malformed command line"
                    );
                    return Err(err.into());
                }
            }
        }
        Ok(commands)
    }
}
