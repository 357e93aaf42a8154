//! # chathub-worker
//!
//! The fixed-size worker pool backing every asynchronous data-layer
//! operation, and the save/delete batchers that coalesce high-frequency
//! writes into bulk repository calls.

pub mod batcher;
pub mod pool;

pub use batcher::{DeleteBatcher, SaveBatcher};
pub use pool::WorkerPool;
