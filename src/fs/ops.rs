//! Namespace operations
//!
//! Each operation splits its path into parent components plus a final name,
//! resolves the parent through the lock-coupling walker, and performs the
//! mutation under the parent's exclusive lock. Domain failures come back as
//! [`FsError`] statuses; nothing here is fatal.
//!
//! Lock ordering: every operation acquires node locks in global preorder.
//! Ancestors come before descendants, and sibling subtrees follow the
//! lexicographic order of the component where they diverge. `rename` is the only operation that
//! locks two subtrees; it splits the two parent paths at their common
//! prefix and walks the branches in that fixed order, so two renames with
//! swapped arguments acquire in the same sequence and cannot deadlock.

use crate::error::{FsError, FsResult};
use crate::fs::resolve::{components, descend_exclusive, resolve_exclusive, resolve_shared, split_parent_child};
use crate::fs::table::{Inumber, NodeKind, NodeTable, WriteLocked, ROOT_INUMBER};

/// The shared in-memory namespace: a node table plus the operations that
/// uphold its tree invariants.
pub struct Namespace {
    table: NodeTable,
}

fn display_path(comps: &[&str]) -> String {
    if comps.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", comps.join("/"))
    }
}

fn common_prefix_len(a: &[&str], b: &[&str]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

impl Namespace {
    /// Create the namespace with a table of `capacity` slots and the root
    /// directory in place. Failure here is fatal to the caller: there is no
    /// namespace without a root.
    pub fn new(capacity: usize) -> FsResult<Self> {
        Ok(Self { table: NodeTable::new(capacity)? })
    }

    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Resolve `path` with shared locks only, releasing each ancestor as the
    /// walk advances. Returns the target's inumber.
    pub fn lookup(&self, path: &str) -> FsResult<Inumber> {
        let comps = components(path);
        Ok(resolve_shared(&self.table, path, &comps)?.inumber)
    }

    /// Create a new node of `kind` at `path`. Returns the new inumber.
    pub fn create(&self, path: &str, kind: NodeKind) -> FsResult<Inumber> {
        let (parent_comps, name) = split_parent_child(path);
        let Some(name) = name else {
            // The root always exists, so creating "/" is a duplicate.
            return Err(FsError::AlreadyExists { path: "/".to_string() });
        };

        let mut parent = resolve_exclusive(&self.table, path, &parent_comps)?;
        let pnode = parent.node()?;
        if !pnode.is_directory() {
            return Err(FsError::NotADirectory { path: display_path(&parent_comps) });
        }
        if pnode.find_entry(name).is_some() {
            return Err(FsError::AlreadyExists { path: path.to_string() });
        }
        if !pnode.has_free_entry() {
            return Err(FsError::DirectoryFull { path: display_path(&parent_comps) });
        }

        let child = self.table.allocate(kind)?;
        // The new slot is unreachable until the entry below lands, but the
        // lock must span the link window so no reader can see a node that
        // is still being wired in.
        let child_guard = self.table.write(child);
        if let Err(err) = parent.node_mut()?.add_entry(name, child) {
            drop(child_guard);
            self.table.free(child);
            return Err(err);
        }
        Ok(child)
    }

    /// Delete the node at `path`. Directories must be empty.
    pub fn remove(&self, path: &str) -> FsResult<()> {
        let (parent_comps, name) = split_parent_child(path);
        let Some(name) = name else {
            return Err(FsError::InvalidPath { path: "/".to_string() });
        };

        let mut parent = resolve_exclusive(&self.table, path, &parent_comps)?;
        let pnode = parent.node()?;
        if !pnode.is_directory() {
            return Err(FsError::NotADirectory { path: display_path(&parent_comps) });
        }
        let child = pnode
            .find_entry(name)
            .ok_or_else(|| FsError::NotFound { path: path.to_string() })?;

        let child_guard = self.table.write(child);
        let cnode = child_guard.node()?;
        if cnode.is_directory() && !cnode.is_empty_dir() {
            return Err(FsError::NotEmpty { path: path.to_string() });
        }

        parent.node_mut()?.remove_entry(child)?;
        // With the parent entry gone and its lock still held, nothing can
        // reach the child; release its guard and recycle the slot.
        drop(child_guard);
        self.table.free(child);
        Ok(())
    }

    /// Move the node at `from` to `to`. No allocation or free happens: the
    /// entry moves between parents and the node keeps its inumber.
    pub fn rename(&self, from: &str, to: &str) -> FsResult<()> {
        let (from_parent, from_name) = split_parent_child(from);
        let (to_parent, to_name) = split_parent_child(to);
        let Some(from_name) = from_name else {
            return Err(FsError::InvalidPath { path: from.to_string() });
        };
        let Some(to_name) = to_name else {
            return Err(FsError::InvalidPath { path: to.to_string() });
        };

        // Moving a directory underneath itself would detach its subtree
        // into an unreachable cycle; reject before taking any lock.
        let mut from_full = from_parent.clone();
        from_full.push(from_name);
        if to_parent.len() >= from_full.len() && to_parent[..from_full.len()] == from_full[..] {
            return Err(FsError::InvalidPath { path: to.to_string() });
        }

        let k = common_prefix_len(&from_parent, &to_parent);
        if from_parent == to_parent {
            return self.rename_within(&from_parent, from_name, from, to_name, to);
        }

        if k == from_parent.len() {
            // Source parent is an ancestor of the destination parent.
            let mut src = resolve_exclusive(&self.table, from, &from_parent)?;
            let child = self.locate_child(&src, &from_parent, from_name, from)?;
            let diverge = to_parent[k];
            if from_name < diverge {
                let child_guard = self.table.write(child);
                let mut dst =
                    descend_exclusive(&self.table, src.node()?, to, &to_parent[k..])?;
                self.relink(&mut src, child, &child_guard, &mut dst, to_name, to)
            } else {
                let mut dst =
                    descend_exclusive(&self.table, src.node()?, to, &to_parent[k..])?;
                let child_guard = self.table.write(child);
                self.relink(&mut src, child, &child_guard, &mut dst, to_name, to)
            }
        } else if k == to_parent.len() {
            // Destination parent is an ancestor of the source parent.
            let mut dst = resolve_exclusive(&self.table, to, &to_parent)?;
            if !dst.node()?.is_directory() {
                return Err(FsError::NotADirectory { path: display_path(&to_parent) });
            }
            let mut src =
                descend_exclusive(&self.table, dst.node()?, from, &from_parent[k..])?;
            let child = self.locate_child(&src, &from_parent, from_name, from)?;
            let child_guard = self.table.write(child);
            self.relink(&mut src, child, &child_guard, &mut dst, to_name, to)
        } else {
            // Branches diverge below a common ancestor; hold it shared while
            // both branch walks run, smaller branch name first.
            let common = resolve_shared(&self.table, from, &from_parent[..k])?;
            if from_parent[k] < to_parent[k] {
                let mut src =
                    descend_exclusive(&self.table, common.node()?, from, &from_parent[k..])?;
                let child = self.locate_child(&src, &from_parent, from_name, from)?;
                let child_guard = self.table.write(child);
                let mut dst =
                    descend_exclusive(&self.table, common.node()?, to, &to_parent[k..])?;
                self.relink(&mut src, child, &child_guard, &mut dst, to_name, to)
            } else {
                let mut dst =
                    descend_exclusive(&self.table, common.node()?, to, &to_parent[k..])?;
                let mut src =
                    descend_exclusive(&self.table, common.node()?, from, &from_parent[k..])?;
                let child = self.locate_child(&src, &from_parent, from_name, from)?;
                let child_guard = self.table.write(child);
                self.relink(&mut src, child, &child_guard, &mut dst, to_name, to)
            }
        }
    }

    /// Rename within a single directory: one parent guard serves both roles.
    fn rename_within(
        &self,
        parent_comps: &[&str],
        from_name: &str,
        from: &str,
        to_name: &str,
        to: &str,
    ) -> FsResult<()> {
        let mut parent = resolve_exclusive(&self.table, from, parent_comps)?;
        let child = self.locate_child(&parent, parent_comps, from_name, from)?;
        let _child_guard = self.table.write(child);
        if parent.node()?.find_entry(to_name).is_some() {
            return Err(FsError::AlreadyExists { path: to.to_string() });
        }
        let pnode = parent.node_mut()?;
        pnode.remove_entry(child)?;
        pnode.add_entry(to_name, child)
    }

    fn locate_child(
        &self,
        parent: &WriteLocked<'_>,
        parent_comps: &[&str],
        name: &str,
        path: &str,
    ) -> FsResult<Inumber> {
        let pnode = parent.node()?;
        if !pnode.is_directory() {
            return Err(FsError::NotADirectory { path: display_path(parent_comps) });
        }
        pnode
            .find_entry(name)
            .ok_or_else(|| FsError::NotFound { path: path.to_string() })
    }

    /// Validate the destination and move the entry. All failures leave both
    /// directories untouched.
    fn relink(
        &self,
        src: &mut WriteLocked<'_>,
        child: Inumber,
        _child_guard: &WriteLocked<'_>,
        dst: &mut WriteLocked<'_>,
        to_name: &str,
        to: &str,
    ) -> FsResult<()> {
        let dnode = dst.node()?;
        if !dnode.is_directory() {
            return Err(FsError::NotADirectory { path: to.to_string() });
        }
        if dnode.find_entry(to_name).is_some() {
            return Err(FsError::AlreadyExists { path: to.to_string() });
        }
        if !dnode.has_free_entry() {
            return Err(FsError::DirectoryFull { path: to.to_string() });
        }
        src.node_mut()?.remove_entry(child)?;
        dst.node_mut()?.add_entry(to_name, child)
    }

    /// Serialize the tree: one line per node, full path, indented by depth,
    /// preorder. Intended for the batch-mode output dump.
    pub fn render_tree(&self) -> FsResult<String> {
        let mut out = String::new();
        self.render_into(ROOT_INUMBER, "", 0, &mut out)?;
        Ok(out)
    }

    fn render_into(
        &self,
        dir: Inumber,
        prefix: &str,
        depth: usize,
        out: &mut String,
    ) -> FsResult<()> {
        let guard = self.table.read(dir);
        let node = guard.node()?;
        for entry in node.entries() {
            let path = format!("{}/{}", prefix, entry.name);
            for _ in 0..depth {
                out.push_str("  ");
            }
            out.push_str(&path);
            out.push('\n');
            let child_is_dir = self.table.read(entry.child).node()?.is_directory();
            if child_is_dir {
                self.render_into(entry.child, &path, depth + 1, out)?;
            }
        }
        Ok(())
    }
}
