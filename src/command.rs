//! Command line grammar
//!
//! One command per line, whitespace separated:
//!
//! ```text
//! c <path> <f|d>    create a file or directory
//! d <path>          delete
//! l <path>          lookup
//! m <from> <to>     move
//! ```
//!
//! Blank lines and lines starting with `#` are skipped. The same grammar is
//! used for batch input files and for service-mode datagrams.

use crate::error::CommandError;
use crate::fs::NodeKind;

/// A parsed namespace command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Create { path: String, kind: NodeKind },
    Delete { path: String },
    Lookup { path: String },
    Move { from: String, to: String },
}

impl Command {
    /// Short operation tag for logging
    pub fn op(&self) -> &'static str {
        match self {
            Command::Create { .. } => "create",
            Command::Delete { .. } => "delete",
            Command::Lookup { .. } => "lookup",
            Command::Move { .. } => "move",
        }
    }
}

/// Parse one input line.
///
/// Returns `Ok(None)` for blank and comment lines.
pub fn parse_line(line: &str) -> Result<Option<Command>, CommandError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let fields: Vec<&str> = trimmed.split_whitespace().collect();
    let command = match fields[0] {
        "c" => {
            let [_, path, kind] = fields[..] else {
                return Err(CommandError::WrongArity { op: 'c', line: trimmed.to_string() });
            };
            let kind = match kind {
                "f" => NodeKind::File,
                "d" => NodeKind::Directory,
                other => {
                    return Err(CommandError::InvalidKind {
                        kind: other.to_string(),
                        line: trimmed.to_string(),
                    })
                }
            };
            Command::Create { path: path.to_string(), kind }
        }
        "d" => {
            let [_, path] = fields[..] else {
                return Err(CommandError::WrongArity { op: 'd', line: trimmed.to_string() });
            };
            Command::Delete { path: path.to_string() }
        }
        "l" => {
            let [_, path] = fields[..] else {
                return Err(CommandError::WrongArity { op: 'l', line: trimmed.to_string() });
            };
            Command::Lookup { path: path.to_string() }
        }
        "m" => {
            let [_, from, to] = fields[..] else {
                return Err(CommandError::WrongArity { op: 'm', line: trimmed.to_string() });
            };
            Command::Move { from: from.to_string(), to: to.to_string() }
        }
        other => {
            return Err(CommandError::UnknownCommand {
                token: other.to_string(),
                line: trimmed.to_string(),
            })
        }
    };
    Ok(Some(command))
}
