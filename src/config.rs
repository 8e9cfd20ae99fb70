//! Configuration types for treefs
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Runtime configuration with validation

use crate::error::ConfigError;
use crate::fs::DEFAULT_TABLE_CAPACITY;
use clap::Parser;
use std::path::PathBuf;

/// Maximum reasonable worker count
const MAX_WORKERS: usize = 512;

/// Minimum command queue size
const MIN_QUEUE_SIZE: usize = 16;

/// Minimum node table capacity (the root needs a slot)
const MIN_CAPACITY: usize = 1;

/// Concurrent in-memory hierarchical namespace
#[derive(Parser, Debug, Clone)]
#[command(
    name = "treefs",
    version,
    about = "Concurrent in-memory hierarchical namespace",
    long_about = "Maintains an in-memory tree of files and directories behind a \
                  fixed-capacity node table with per-node locks.\n\n\
                  Batch mode replays a command file across a worker pool and dumps \
                  the final tree; serve mode answers the same commands over a Unix \
                  datagram socket.",
    after_help = "EXAMPLES:\n    \
        treefs batch input.txt output.txt -w 8\n    \
        treefs batch input.txt output.txt --capacity 4096\n    \
        treefs serve /tmp/treefs.sock -w 4"
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Mode,

    /// Number of worker threads
    #[arg(
        short = 'w',
        long,
        global = true,
        default_value_t = default_workers(),
        value_name = "NUM"
    )]
    pub workers: usize,

    /// Node table capacity
    #[arg(long, global = true, default_value_t = DEFAULT_TABLE_CAPACITY, value_name = "NUM")]
    pub capacity: usize,

    /// Verbose output (per-command logging)
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

/// Execution modes
#[derive(clap::Subcommand, Debug, Clone)]
pub enum Mode {
    /// Replay a command file and dump the resulting tree
    Batch {
        /// Input command file
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output file for the tree dump
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// Command queue capacity
        #[arg(long, default_value = "1024", value_name = "NUM")]
        queue_size: usize,
    },

    /// Answer commands over a Unix datagram socket
    Serve {
        /// Socket path to bind
        #[arg(value_name = "SOCKET")]
        socket: PathBuf,
    },
}

fn default_workers() -> usize {
    num_cpus::get()
}

/// Validated batch-mode configuration
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Input command file
    pub input_path: PathBuf,

    /// Output file for the tree dump
    pub output_path: PathBuf,

    /// Number of consumer threads
    pub worker_count: usize,

    /// Command queue capacity
    pub queue_size: usize,

    /// Node table capacity
    pub table_capacity: usize,
}

/// Validated service-mode configuration
#[derive(Debug, Clone)]
pub struct ServeConfig {
    /// Socket path to bind
    pub socket_path: PathBuf,

    /// Number of receiver threads
    pub worker_count: usize,

    /// Node table capacity
    pub table_capacity: usize,
}

fn validate_common(workers: usize, capacity: usize) -> Result<(), ConfigError> {
    if workers == 0 || workers > MAX_WORKERS {
        return Err(ConfigError::InvalidWorkerCount { count: workers, max: MAX_WORKERS });
    }
    if capacity < MIN_CAPACITY {
        return Err(ConfigError::InvalidCapacity { capacity, min: MIN_CAPACITY });
    }
    Ok(())
}

impl BatchConfig {
    /// Create and validate configuration from CLI arguments
    pub fn from_args(
        args: &CliArgs,
        input: PathBuf,
        output: PathBuf,
        queue_size: usize,
    ) -> Result<Self, ConfigError> {
        validate_common(args.workers, args.capacity)?;
        if queue_size < MIN_QUEUE_SIZE {
            return Err(ConfigError::InvalidQueueSize { size: queue_size, min: MIN_QUEUE_SIZE });
        }
        Ok(Self {
            input_path: input,
            output_path: output,
            worker_count: args.workers,
            queue_size,
            table_capacity: args.capacity,
        })
    }
}

impl ServeConfig {
    /// Create and validate configuration from CLI arguments
    pub fn from_args(args: &CliArgs, socket: PathBuf) -> Result<Self, ConfigError> {
        validate_common(args.workers, args.capacity)?;
        if socket.as_os_str().is_empty() {
            return Err(ConfigError::InvalidSocketPath {
                path: String::new(),
                reason: "empty path".to_string(),
            });
        }
        if let Some(parent) = socket.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                return Err(ConfigError::InvalidSocketPath {
                    path: socket.display().to_string(),
                    reason: format!("parent directory '{}' does not exist", parent.display()),
                });
            }
        }
        Ok(Self {
            socket_path: socket,
            worker_count: args.workers,
            table_capacity: args.capacity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(argv: &[&str]) -> CliArgs {
        CliArgs::parse_from(argv)
    }

    #[test]
    fn test_batch_defaults() {
        let args = parse(&["treefs", "batch", "in.txt", "out.txt"]);
        let Mode::Batch { input, output, queue_size } = args.command.clone() else {
            panic!("expected batch mode");
        };
        let config = BatchConfig::from_args(&args, input, output, queue_size).unwrap();
        assert_eq!(config.queue_size, 1024);
        assert_eq!(config.table_capacity, DEFAULT_TABLE_CAPACITY);
        assert!(config.worker_count >= 1);
    }

    #[test]
    fn test_worker_count_validation() {
        let args = parse(&["treefs", "-w", "0", "batch", "in.txt", "out.txt"]);
        let Mode::Batch { input, output, queue_size } = args.command.clone() else {
            panic!("expected batch mode");
        };
        assert!(matches!(
            BatchConfig::from_args(&args, input, output, queue_size),
            Err(ConfigError::InvalidWorkerCount { .. })
        ));
    }

    #[test]
    fn test_queue_size_validation() {
        let args = parse(&["treefs", "batch", "in.txt", "out.txt", "--queue-size", "2"]);
        let Mode::Batch { input, output, queue_size } = args.command.clone() else {
            panic!("expected batch mode");
        };
        assert!(matches!(
            BatchConfig::from_args(&args, input, output, queue_size),
            Err(ConfigError::InvalidQueueSize { .. })
        ));
    }

    #[test]
    fn test_capacity_validation() {
        let args = parse(&["treefs", "--capacity", "0", "batch", "in.txt", "out.txt"]);
        let Mode::Batch { input, output, queue_size } = args.command.clone() else {
            panic!("expected batch mode");
        };
        assert!(matches!(
            BatchConfig::from_args(&args, input, output, queue_size),
            Err(ConfigError::InvalidCapacity { .. })
        ));
    }

    #[test]
    fn test_serve_config() {
        let args = parse(&["treefs", "serve", "/tmp/treefs.sock", "-w", "4"]);
        let Mode::Serve { socket } = args.command.clone() else {
            panic!("expected serve mode");
        };
        let config = ServeConfig::from_args(&args, socket).unwrap();
        assert_eq!(config.worker_count, 4);
        assert_eq!(config.socket_path, PathBuf::from("/tmp/treefs.sock"));
    }

    #[test]
    fn test_serve_rejects_missing_parent() {
        let args = parse(&["treefs", "serve", "/no/such/dir/treefs.sock"]);
        let Mode::Serve { socket } = args.command.clone() else {
            panic!("expected serve mode");
        };
        assert!(matches!(
            ServeConfig::from_args(&args, socket),
            Err(ConfigError::InvalidSocketPath { .. })
        ));
    }
}
