//! The database execution boundary.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::value::{SqlRow, SqlValue};

/// Executes parametrized statements against a database.
///
/// Parameter binding is positional (`$1`, `$2`, ...) in the order the
/// caller supplied values. Implementations never interpret or rewrite the
/// SQL text; that responsibility belongs to the layers above. Connection
/// acquisition is entirely hidden behind this trait, so everything above
/// it is connection-agnostic.
#[async_trait]
pub trait SqlExecutor: Send + Sync + std::fmt::Debug + 'static {
    /// Execute a statement and return its result rows.
    async fn fetch(&self, sql: &str, params: &[SqlValue]) -> AppResult<Vec<SqlRow>>;

    /// Execute a statement and return the number of affected rows.
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> AppResult<u64>;

    /// Execute a statement that yields a generated 64-bit key
    /// (`INSERT ... RETURNING id`). Returns `None` if no row came back.
    async fn fetch_id(&self, sql: &str, params: &[SqlValue]) -> AppResult<Option<i64>>;
}
