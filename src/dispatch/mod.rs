//! Command dispatch: the bounded queue, worker pool, and the two run modes

pub mod batch;
pub mod queue;
pub mod serve;
pub mod worker;

pub use batch::{BatchCoordinator, BatchResult};
pub use serve::{ServeResult, ServiceCoordinator};
