//! Fixed-capacity node table
//!
//! The table is an arena of slots, each guarded by its own reader/writer
//! lock. All cross-node protocols (lock coupling, the two-path walk in
//! rename) operate on integer handles, never on raw references, so a handle
//! can outlive any particular guard without aliasing trouble.
//!
//! Locking contract: no caller may read or write a node's kind or entries
//! without holding that node's lock. The table itself only takes a slot
//! lock inside `allocate` and `free`, where the slot is unreachable from
//! the tree.

use crate::error::{FsError, FsResult};
use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Integer handle for a table slot ("inumber")
pub type Inumber = usize;

/// The root directory always lives in slot 0 and is never freed
pub const ROOT_INUMBER: Inumber = 0;

/// Fixed capacity of a directory's entry list
pub const MAX_DIR_ENTRIES: usize = 64;

/// Default node table capacity when not overridden on the command line
pub const DEFAULT_TABLE_CAPACITY: usize = 1024;

/// What a node is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Opaque leaf payload; carries no further structure
    File,
    /// Holds a fixed-capacity entry list
    Directory,
}

/// One `(name, child)` pair inside a directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub child: Inumber,
}

/// An allocated node.
///
/// Directory entry slots are sparse: removal leaves a `None` hole and
/// lookups are linear scans, matching the on-disk-style layout of the
/// fixed entry array.
#[derive(Debug)]
pub enum Node {
    File,
    Directory { entries: Box<[Option<DirEntry>]> },
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        match kind {
            NodeKind::File => Node::File,
            NodeKind::Directory => Node::Directory {
                entries: (0..MAX_DIR_ENTRIES).map(|_| None).collect(),
            },
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::File => NodeKind::File,
            Node::Directory { .. } => NodeKind::Directory,
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, Node::Directory { .. })
    }

    /// Linear scan for an entry by name. Caller holds this node's lock.
    pub fn find_entry(&self, name: &str) -> Option<Inumber> {
        match self {
            Node::File => None,
            Node::Directory { entries } => entries
                .iter()
                .flatten()
                .find(|e| e.name == name)
                .map(|e| e.child),
        }
    }

    /// True if this directory has at least one free entry slot
    pub fn has_free_entry(&self) -> bool {
        match self {
            Node::File => false,
            Node::Directory { entries } => entries.iter().any(|e| e.is_none()),
        }
    }

    /// A directory is empty iff every entry slot is free
    pub fn is_empty_dir(&self) -> bool {
        match self {
            Node::File => false,
            Node::Directory { entries } => entries.iter().all(|e| e.is_none()),
        }
    }

    /// Insert `(name, child)` into the first free slot.
    ///
    /// Caller holds this directory exclusively and has already checked name
    /// uniqueness; the checks here are the last line of defense.
    pub fn add_entry(&mut self, name: &str, child: Inumber) -> FsResult<()> {
        let Node::Directory { entries } = self else {
            return Err(FsError::NotADirectory { path: name.to_string() });
        };
        if entries.iter().flatten().any(|e| e.name == name) {
            return Err(FsError::AlreadyExists { path: name.to_string() });
        }
        match entries.iter_mut().find(|e| e.is_none()) {
            Some(slot) => {
                *slot = Some(DirEntry { name: name.to_string(), child });
                Ok(())
            }
            None => Err(FsError::DirectoryFull { path: name.to_string() }),
        }
    }

    /// Clear the entry pointing at `child`. Caller holds this directory
    /// exclusively.
    pub fn remove_entry(&mut self, child: Inumber) -> FsResult<()> {
        let Node::Directory { entries } = self else {
            return Err(FsError::NotADirectory { path: String::new() });
        };
        match entries
            .iter_mut()
            .find(|e| e.as_ref().is_some_and(|e| e.child == child))
        {
            Some(slot) => {
                *slot = None;
                Ok(())
            }
            None => Err(FsError::NotFound { path: String::new() }),
        }
    }

    /// Iterate live entries in slot order. Caller holds this node's lock.
    pub fn entries(&self) -> impl Iterator<Item = &DirEntry> {
        let slots: &[Option<DirEntry>] = match self {
            Node::File => &[],
            Node::Directory { entries } => entries,
        };
        slots.iter().flatten()
    }
}

/// A table slot: either free or holding a live node
#[derive(Debug)]
pub enum Slot {
    Free,
    Live(Node),
}

impl Slot {
    /// View the live node, or report the slot as gone.
    ///
    /// A locked slot can only be observed free through a stale handle, which
    /// the locking protocol prevents; surfacing NotFound keeps even that
    /// case non-fatal.
    pub fn live(&self) -> FsResult<&Node> {
        match self {
            Slot::Live(node) => Ok(node),
            Slot::Free => Err(FsError::NotFound { path: String::new() }),
        }
    }

    pub fn live_mut(&mut self) -> FsResult<&mut Node> {
        match self {
            Slot::Live(node) => Ok(node),
            Slot::Free => Err(FsError::NotFound { path: String::new() }),
        }
    }
}

/// Shared guard over one slot
#[derive(Debug)]
pub struct ReadLocked<'t> {
    pub inumber: Inumber,
    guard: RwLockReadGuard<'t, Slot>,
}

impl ReadLocked<'_> {
    pub fn node(&self) -> FsResult<&Node> {
        self.guard.live()
    }
}

/// Exclusive guard over one slot
#[derive(Debug)]
pub struct WriteLocked<'t> {
    pub inumber: Inumber,
    guard: RwLockWriteGuard<'t, Slot>,
}

impl WriteLocked<'_> {
    pub fn node(&self) -> FsResult<&Node> {
        self.guard.live()
    }

    pub fn node_mut(&mut self) -> FsResult<&mut Node> {
        self.guard.live_mut()
    }
}

/// Fixed-capacity arena of independently lockable nodes
pub struct NodeTable {
    slots: Box<[RwLock<Slot>]>,
    /// Free slots, popped from the back. Never contains `ROOT_INUMBER`.
    free: Mutex<Vec<Inumber>>,
}

impl NodeTable {
    /// Allocate the arena and create the root directory in slot 0.
    ///
    /// Capacity is fixed for the process lifetime; exhaustion later is a
    /// reportable failure, but a table that cannot even hold the root is a
    /// configuration error surfaced before any worker starts.
    pub fn new(capacity: usize) -> FsResult<Self> {
        if capacity == 0 {
            return Err(FsError::TableExhausted);
        }
        let mut slots = Vec::with_capacity(capacity);
        slots.push(RwLock::new(Slot::Live(Node::new(NodeKind::Directory))));
        for _ in 1..capacity {
            slots.push(RwLock::new(Slot::Free));
        }
        // Reverse so pop() hands out low inumbers first.
        let free: Vec<Inumber> = (1..capacity).rev().collect();
        Ok(Self {
            slots: slots.into_boxed_slice(),
            free: Mutex::new(free),
        })
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of currently free slots
    pub fn free_slots(&self) -> usize {
        self.free.lock().len()
    }

    /// Claim a free slot and initialize it as an empty node of `kind`.
    ///
    /// The returned node is not locked for the caller: until an entry in
    /// some directory points at it, no other thread can reach it.
    pub fn allocate(&self, kind: NodeKind) -> FsResult<Inumber> {
        let inumber = self.free.lock().pop().ok_or(FsError::TableExhausted)?;
        *self.slots[inumber].write() = Slot::Live(Node::new(kind));
        Ok(inumber)
    }

    /// Return a slot to the free pool.
    ///
    /// The node must already be unlinked from its parent and the caller
    /// must hold no lock on it.
    pub fn free(&self, inumber: Inumber) {
        if inumber == ROOT_INUMBER {
            return;
        }
        *self.slots[inumber].write() = Slot::Free;
        self.free.lock().push(inumber);
    }

    /// Take a shared lock on `inumber`
    pub fn read(&self, inumber: Inumber) -> ReadLocked<'_> {
        ReadLocked { inumber, guard: self.slots[inumber].read() }
    }

    /// Take an exclusive lock on `inumber`
    pub fn write(&self, inumber: Inumber) -> WriteLocked<'_> {
        WriteLocked { inumber, guard: self.slots[inumber].write() }
    }
}
