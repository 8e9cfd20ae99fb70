//! Bounded command queue
//!
//! Batch mode runs one producer (the input reader) against a pool of
//! consumers over a bounded channel, so a fast reader cannot outrun slow
//! workers by more than the queue capacity. End of input is signaled by
//! dropping the last sender; every receiver then drains what remains and
//! sees the disconnect.

use crate::command::Command;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Statistics for the command queue
#[derive(Debug, Default)]
pub struct QueueStats {
    /// Total commands enqueued
    pub enqueued: AtomicU64,

    /// Total commands dequeued
    pub dequeued: AtomicU64,
}

impl QueueStats {
    pub fn enqueued_count(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    pub fn dequeued_count(&self) -> u64 {
        self.dequeued.load(Ordering::Relaxed)
    }
}

/// Bounded producer/consumer queue for parsed commands
pub struct CommandQueue {
    sender: Sender<Command>,
    receiver: Receiver<Command>,
    capacity: usize,
    stats: Arc<QueueStats>,
}

impl CommandQueue {
    /// Create a new queue with the specified capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
            stats: Arc::new(QueueStats::default()),
        }
    }

    /// Get a sender handle.
    ///
    /// The queue itself also holds a sender; drop the queue once all
    /// handles are taken, or receivers will never observe a disconnect.
    pub fn sender(&self) -> CommandSender {
        CommandSender {
            sender: self.sender.clone(),
            stats: Arc::clone(&self.stats),
        }
    }

    /// Get a receiver handle (clone one per worker)
    pub fn receiver(&self) -> CommandReceiver {
        CommandReceiver {
            receiver: self.receiver.clone(),
            stats: Arc::clone(&self.stats),
        }
    }

    pub fn stats(&self) -> Arc<QueueStats> {
        Arc::clone(&self.stats)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

/// Handle for feeding commands into the queue
#[derive(Clone)]
pub struct CommandSender {
    sender: Sender<Command>,
    stats: Arc<QueueStats>,
}

impl CommandSender {
    /// Send a command, blocking while the queue is full.
    ///
    /// Fails only when every receiver is gone, which means the worker pool
    /// died under the producer.
    pub fn send(&self, command: Command) -> Result<(), ()> {
        self.sender.send(command).map_err(|_| ())?;
        self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Handle for draining commands from the queue
#[derive(Clone)]
pub struct CommandReceiver {
    receiver: Receiver<Command>,
    stats: Arc<QueueStats>,
}

impl CommandReceiver {
    /// Receive the next command.
    ///
    /// Blocks until a command arrives; returns `None` once the queue is
    /// both empty and disconnected, i.e. the producer is done.
    pub fn recv(&self) -> Option<Command> {
        match self.receiver.recv() {
            Ok(command) => {
                self.stats.dequeued.fetch_add(1, Ordering::Relaxed);
                Some(command)
            }
            Err(_) => None,
        }
    }
}
