//! Path resolution with lock coupling
//!
//! The walker holds a shared lock on the current directory while it
//! acquires the next component's lock, and only then releases the parent
//! (hand-over-hand). A concurrent restructure of an ancestor can therefore
//! never be observed mid-walk as a torn view.
//!
//! When the caller needs the final node exclusively, the write lock is
//! taken during the coupling step itself, while the parent's shared lock
//! is still held. There is no release-then-reacquire upgrade and no window
//! where the target is unlocked.
//!
//! All guards are RAII: every exit path, success or failure, releases
//! everything by scope, newest guard first.

use crate::error::{FsError, FsResult};
use crate::fs::table::{Inumber, Node, NodeTable, ReadLocked, WriteLocked, ROOT_INUMBER};

/// Split a slash-delimited path into its non-empty components.
///
/// Trailing slashes (and repeated separators) normalize away; the empty
/// path and "/" both yield no components, i.e. the root itself.
pub fn components(path: &str) -> Vec<&str> {
    path.split('/').filter(|c| !c.is_empty()).collect()
}

/// Split a path into parent components and the final name.
///
/// Returns `None` for the final name when the path is the root, which has
/// no parent to mutate.
pub fn split_parent_child(path: &str) -> (Vec<&str>, Option<&str>) {
    let mut comps = components(path);
    let child = comps.pop();
    (comps, child)
}

fn locked_child(cur: &Node, name: &str, path: &str) -> FsResult<Inumber> {
    if !cur.is_directory() {
        return Err(FsError::NotADirectory { path: path.to_string() });
    }
    cur.find_entry(name)
        .ok_or_else(|| FsError::NotFound { path: path.to_string() })
}

/// Resolve `comps` from the root, returning the final node shared-locked.
///
/// Every intermediate lock is released as the walk advances; on failure no
/// lock survives the return. `path` is only used for error context.
pub fn resolve_shared<'t>(
    table: &'t NodeTable,
    path: &str,
    comps: &[&str],
) -> FsResult<ReadLocked<'t>> {
    let mut cur = table.read(ROOT_INUMBER);
    for name in comps {
        let child = locked_child(cur.node()?, name, path)?;
        // Acquiring before the assignment drops `cur` is the coupling step.
        cur = table.read(child);
    }
    Ok(cur)
}

/// Resolve `comps` from the root, returning the final node write-locked.
///
/// Intermediates are shared-locked hand-over-hand; only the final component
/// is taken exclusively. The empty path returns the root itself, write-locked
/// directly (no parent to couple through).
pub fn resolve_exclusive<'t>(
    table: &'t NodeTable,
    path: &str,
    comps: &[&str],
) -> FsResult<WriteLocked<'t>> {
    let Some((last, parents)) = comps.split_last() else {
        return Ok(table.write(ROOT_INUMBER));
    };
    let mut cur = table.read(ROOT_INUMBER);
    for name in parents {
        let child = locked_child(cur.node()?, name, path)?;
        cur = table.read(child);
    }
    let child = locked_child(cur.node()?, last, path)?;
    let locked = table.write(child);
    drop(cur);
    Ok(locked)
}

/// Continue a walk downward from a node whose guard the caller keeps held.
///
/// `origin` must be the live view under that guard; borrowing it keeps the
/// guard pinned for the duration of the first coupling step. Used by rename,
/// which must keep its first parent (or the common ancestor) locked while it
/// walks the second branch. `comps` must be non-empty.
pub fn descend_exclusive<'t>(
    table: &'t NodeTable,
    origin: &Node,
    path: &str,
    comps: &[&str],
) -> FsResult<WriteLocked<'t>> {
    let (first, rest) = match comps.split_first() {
        Some(split) => split,
        None => return Err(FsError::InvalidPath { path: path.to_string() }),
    };
    let child = locked_child(origin, first, path)?;
    if rest.is_empty() {
        return Ok(table.write(child));
    }
    let mut cur = table.read(child);
    let (last, parents) = rest
        .split_last()
        .ok_or_else(|| FsError::InvalidPath { path: path.to_string() })?;
    for name in parents {
        let next = locked_child(cur.node()?, name, path)?;
        cur = table.read(next);
    }
    let target = locked_child(cur.node()?, last, path)?;
    let locked = table.write(target);
    drop(cur);
    Ok(locked)
}
