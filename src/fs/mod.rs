//! The in-memory filesystem core: node table, path resolution, operations

pub mod ops;
pub mod resolve;
pub mod table;

pub use ops::Namespace;
pub use table::{Inumber, NodeKind, DEFAULT_TABLE_CAPACITY, MAX_DIR_ENTRIES, ROOT_INUMBER};
