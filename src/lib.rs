//! treefs - concurrent in-memory hierarchical namespace
//!
//! A tree of files and directories held in a fixed-capacity node table,
//! with per-node reader/writer locks and hand-over-hand path resolution so
//! independent subtrees never contend.
//!
//! Two front ends drive the same core:
//! - batch: replay a command file across a worker pool, dump the tree
//! - serve: answer the same commands over a Unix datagram socket
//!
//! # Architecture
//!
//! ```text
//! batch input ──► CommandQueue ──► Worker pool ──┐
//!                                                ├──► Namespace ──► NodeTable
//! datagrams  ──────────────────► Receiver pool ──┘
//! ```

pub mod client;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod fs;
pub mod report;

pub use client::Client;
pub use command::{parse_line, Command};
pub use config::{BatchConfig, CliArgs, Mode, ServeConfig};
pub use dispatch::{BatchCoordinator, BatchResult, ServeResult, ServiceCoordinator};
pub use error::{FsError, Result, TreefsError};
pub use fs::{Inumber, Namespace, NodeKind};
