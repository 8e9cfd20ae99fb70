//! Service coordinator
//!
//! Serve mode binds a Unix datagram socket and answers one command per
//! datagram with its ASCII numeric status. The socket is shared by a pool
//! of receiver threads; the kernel delivers each datagram to exactly one
//! of them. A malformed datagram gets a BAD_COMMAND reply instead of
//! killing the receiver.
//!
//! Receivers poll with a short read timeout so a raised shutdown flag is
//! observed within one timeout interval, after which the pool drains,
//! joins, and the socket file is unlinked.

use crate::command::parse_line;
use crate::config::ServeConfig;
use crate::dispatch::worker::{apply_command, WorkerStats};
use crate::error::{Result, TreefsError, WorkerError, STATUS_BAD_COMMAND};
use crate::fs::Namespace;
use std::fs;
use std::io::ErrorKind;
use std::os::unix::net::UnixDatagram;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How often receivers wake up to check the shutdown flag
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Largest accepted datagram
const MAX_DATAGRAM: usize = 4096;

/// Result of a completed service run
#[derive(Debug)]
pub struct ServeResult {
    /// Commands answered
    pub commands: u64,

    /// Commands that completed with a non-negative status
    pub succeeded: u64,

    /// Commands that reported an error status (including BAD_COMMAND)
    pub failed: u64,

    /// Time the service was up
    pub duration: Duration,
}

/// Coordinates the socket service
pub struct ServiceCoordinator {
    config: ServeConfig,
    namespace: Arc<Namespace>,
    shutdown: Arc<AtomicBool>,
}

impl ServiceCoordinator {
    pub fn new(config: ServeConfig) -> Result<Self> {
        let namespace = Arc::new(Namespace::new(config.table_capacity)?);
        Ok(Self {
            config,
            namespace,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Get a clone of the shutdown flag (for signal handlers)
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Bind the socket and serve until the shutdown flag is raised.
    pub fn run(self) -> Result<ServeResult> {
        let path = &self.config.socket_path;
        // A stale socket file from a previous run blocks the bind.
        match fs::remove_file(path) {
            Ok(()) => debug!(socket = %path.display(), "removed stale socket file"),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
        let socket = UnixDatagram::bind(path)?;
        socket.set_read_timeout(Some(POLL_INTERVAL))?;

        info!(
            socket = %path.display(),
            workers = self.config.worker_count,
            "service listening"
        );

        let start = Instant::now();
        let mut receivers = Vec::with_capacity(self.config.worker_count);
        for id in 0..self.config.worker_count {
            let socket = socket.try_clone()?;
            receivers.push(Receiver::spawn(
                id,
                socket,
                Arc::clone(&self.namespace),
                Arc::clone(&self.shutdown),
            )?);
        }

        let mut succeeded = 0;
        let mut failed = 0;
        for receiver in receivers {
            let stats = receiver.join()?;
            succeeded += stats.succeeded.load(Ordering::Relaxed);
            failed += stats.failed.load(Ordering::Relaxed);
        }
        drop(socket);

        if let Err(err) = fs::remove_file(path) {
            warn!(socket = %path.display(), error = %err, "failed to unlink socket file");
        }
        let duration = start.elapsed();
        info!(succeeded, failed, duration_secs = duration.as_secs(), "service stopped");

        Ok(ServeResult {
            commands: succeeded + failed,
            succeeded,
            failed,
            duration,
        })
    }
}

/// A receiver thread sharing the service socket
struct Receiver {
    id: usize,
    handle: Option<JoinHandle<()>>,
    stats: Arc<WorkerStats>,
}

impl Receiver {
    fn spawn(
        id: usize,
        socket: UnixDatagram,
        namespace: Arc<Namespace>,
        shutdown: Arc<AtomicBool>,
    ) -> Result<Self> {
        let stats = Arc::new(WorkerStats::default());
        let stats_clone = Arc::clone(&stats);

        let handle = thread::Builder::new()
            .name(format!("treefs-rx-{id}"))
            .spawn(move || receiver_loop(id, socket, namespace, shutdown, stats_clone))
            .map_err(|e| WorkerError::SpawnFailed { id, reason: e.to_string() })?;

        Ok(Self { id, handle: Some(handle), stats })
    }

    fn join(mut self) -> Result<Arc<WorkerStats>> {
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| TreefsError::Worker(WorkerError::Panicked { id: self.id }))?;
        }
        Ok(Arc::clone(&self.stats))
    }
}

fn receiver_loop(
    id: usize,
    socket: UnixDatagram,
    namespace: Arc<Namespace>,
    shutdown: Arc<AtomicBool>,
    stats: Arc<WorkerStats>,
) {
    debug!(receiver = id, "receiver starting");
    let mut buf = [0u8; MAX_DATAGRAM];
    while !shutdown.load(Ordering::SeqCst) {
        let (len, addr) = match socket.recv_from(&mut buf) {
            Ok(received) => received,
            Err(err)
                if err.kind() == ErrorKind::WouldBlock || err.kind() == ErrorKind::TimedOut =>
            {
                continue;
            }
            Err(err) => {
                warn!(receiver = id, error = %err, "socket receive failed");
                break;
            }
        };

        let status = answer(&namespace, &buf[..len]);
        if status >= 0 {
            stats.succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            stats.failed.fetch_add(1, Ordering::Relaxed);
        }
        stats.processed.fetch_add(1, Ordering::Relaxed);

        // Only a bound client can be answered.
        let Some(peer) = addr.as_pathname() else {
            warn!(receiver = id, "dropping reply to unnamed peer");
            continue;
        };
        if let Err(err) = socket.send_to(status.to_string().as_bytes(), peer) {
            warn!(receiver = id, peer = %peer.display(), error = %err, "reply failed");
        }
    }
    debug!(
        receiver = id,
        processed = stats.processed.load(Ordering::Relaxed),
        "receiver finished"
    );
}

/// Compute the reply status for one datagram
fn answer(namespace: &Namespace, payload: &[u8]) -> i64 {
    let Ok(text) = std::str::from_utf8(payload) else {
        warn!("datagram is not valid UTF-8");
        return STATUS_BAD_COMMAND;
    };
    match parse_line(text) {
        Ok(Some(command)) => apply_command(namespace, &command),
        Ok(None) => STATUS_BAD_COMMAND,
        Err(err) => {
            warn!(error = %err, "unparseable datagram");
            STATUS_BAD_COMMAND
        }
    }
}
