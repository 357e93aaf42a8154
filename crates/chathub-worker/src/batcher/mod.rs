//! Write batchers: buffer high-frequency saves/deletes and flush them to
//! the repository in bulk.
//!
//! Each batcher owns a locked buffer and a dedicated timer task. A flush
//! happens when the buffer reaches the configured batch size, on every
//! timer tick, and once more on shutdown. The buffer lock is held only to
//! push or swap, never across I/O: a full buffer is swapped out under the
//! lock and flushed outside it.
//!
//! A failed flush is logged and the batch is dropped — writes through a
//! batcher are best-effort by contract, and callers that need durability
//! use the repository directly.

pub mod delete;
pub mod save;

pub use delete::DeleteBatcher;
pub use save::SaveBatcher;
