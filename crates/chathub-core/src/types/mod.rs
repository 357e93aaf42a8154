//! Shared value and query-clause types.

pub mod filter;
pub mod sorting;
pub mod value;

pub use filter::FilterOp;
pub use sorting::SortDirection;
pub use value::{FieldKind, SqlRow, SqlValue};
