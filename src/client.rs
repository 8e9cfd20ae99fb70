//! Datagram client for serve mode
//!
//! Binds its own socket (datagram peers must be addressable to receive a
//! reply), sends one command line per request, and blocks for the ASCII
//! numeric status. The client socket file is unlinked on drop.

use crate::error::{Result, TreefsError};
use crate::fs::{Inumber, NodeKind};
use std::fs;
use std::io::{Error, ErrorKind};
use std::os::unix::net::UnixDatagram;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Distinguishes sockets of multiple clients in one process
static CLIENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// How long to wait for a reply before giving up
const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

/// One connection to a running treefs service
pub struct Client {
    socket: UnixDatagram,
    local_path: PathBuf,
    server_path: PathBuf,
}

impl Client {
    /// Bind a client socket and aim it at the service at `server_path`.
    pub fn connect(server_path: impl AsRef<Path>) -> Result<Self> {
        let seq = CLIENT_SEQ.fetch_add(1, Ordering::Relaxed);
        let local_path =
            std::env::temp_dir().join(format!("treefs-client-{}-{seq}.sock", process::id()));
        // A crashed earlier client with the same pid+seq would have left
        // its file behind.
        let _ = fs::remove_file(&local_path);
        let socket = UnixDatagram::bind(&local_path)?;
        socket.set_read_timeout(Some(REPLY_TIMEOUT))?;
        Ok(Self {
            socket,
            local_path,
            server_path: server_path.as_ref().to_path_buf(),
        })
    }

    /// Create a node; status 0 on success.
    pub fn create(&self, path: &str, kind: NodeKind) -> Result<i64> {
        let tag = match kind {
            NodeKind::File => 'f',
            NodeKind::Directory => 'd',
        };
        self.request(&format!("c {path} {tag}"))
    }

    pub fn delete(&self, path: &str) -> Result<i64> {
        self.request(&format!("d {path}"))
    }

    /// Look up a path; a non-negative status is the inumber.
    pub fn lookup(&self, path: &str) -> Result<i64> {
        self.request(&format!("l {path}"))
    }

    pub fn move_node(&self, from: &str, to: &str) -> Result<i64> {
        self.request(&format!("m {from} {to}"))
    }

    /// Convenience wrapper: lookup that fails on negative status.
    pub fn lookup_inumber(&self, path: &str) -> Result<Inumber> {
        let status = self.lookup(path)?;
        if status < 0 {
            return Err(TreefsError::Io(Error::new(
                ErrorKind::NotFound,
                format!("lookup of '{path}' replied {status}"),
            )));
        }
        Ok(status as Inumber)
    }

    /// Send one command line and wait for its status reply.
    pub fn request(&self, line: &str) -> Result<i64> {
        self.socket.send_to(line.as_bytes(), &self.server_path)?;
        let mut buf = [0u8; 64];
        let (len, _) = self.socket.recv_from(&mut buf)?;
        let text = std::str::from_utf8(&buf[..len])
            .map_err(|e| Error::new(ErrorKind::InvalidData, e))?;
        let status = text
            .trim()
            .parse::<i64>()
            .map_err(|e| Error::new(ErrorKind::InvalidData, e))?;
        Ok(status)
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.local_path);
    }
}
