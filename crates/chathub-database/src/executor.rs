//! PostgreSQL implementation of the [`SqlExecutor`] boundary.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::postgres::{PgArguments, PgPool, PgRow};
use sqlx::{Column, Row, TypeInfo};
use tracing::error;

use chathub_core::error::{AppError, ErrorKind};
use chathub_core::result::AppResult;
use chathub_core::traits::executor::SqlExecutor;
use chathub_core::types::value::{SqlRow, SqlValue};

use crate::connection::DatabasePool;

/// Executes parametrized statements against PostgreSQL.
///
/// Values are bound positionally in the order supplied; rows are decoded
/// into the closed [`SqlValue`] variant by column type. The statement text
/// is never inspected or rewritten.
#[derive(Debug, Clone)]
pub struct PgSqlExecutor {
    pool: PgPool,
}

impl PgSqlExecutor {
    /// Create an executor over an existing sqlx pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create an executor over a managed database pool.
    pub fn from_pool(pool: &DatabasePool) -> Self {
        Self::new(pool.pool().clone())
    }
}

#[async_trait]
impl SqlExecutor for PgSqlExecutor {
    async fn fetch(&self, sql: &str, params: &[SqlValue]) -> AppResult<Vec<SqlRow>> {
        let mut query = sqlx::query(sql);
        for value in params {
            query = bind_value(query, value);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| statement_error(sql, e))?;

        rows.iter().map(decode_row).collect()
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> AppResult<u64> {
        let mut query = sqlx::query(sql);
        for value in params {
            query = bind_value(query, value);
        }

        let result = query
            .execute(&self.pool)
            .await
            .map_err(|e| statement_error(sql, e))?;

        Ok(result.rows_affected())
    }

    async fn fetch_id(&self, sql: &str, params: &[SqlValue]) -> AppResult<Option<i64>> {
        let mut query = sqlx::query(sql);
        for value in params {
            query = bind_value(query, value);
        }

        let row = query
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| statement_error(sql, e))?;

        row.map(|r| {
            r.try_get::<i64, _>(0)
                .map_err(|e| statement_error(sql, e))
        })
        .transpose()
    }
}

/// Bind one value to the next positional placeholder.
fn bind_value<'q>(
    query: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    value: &SqlValue,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match value {
        SqlValue::Null => query.bind(Option::<String>::None),
        SqlValue::Bool(v) => query.bind(*v),
        SqlValue::Int(v) => query.bind(*v),
        SqlValue::BigInt(v) => query.bind(*v),
        SqlValue::Double(v) => query.bind(*v),
        SqlValue::Text(v) => query.bind(v.clone()),
        SqlValue::Timestamp(v) => query.bind(*v),
    }
}

/// Decode a driver row into the engine's closed value model.
fn decode_row(row: &PgRow) -> AppResult<SqlRow> {
    let mut out = SqlRow::new();
    for (i, column) in row.columns().iter().enumerate() {
        let name = column.name();
        let value = match column.type_info().name() {
            "INT8" => row
                .try_get::<Option<i64>, _>(i)
                .map(|v| v.map(SqlValue::BigInt)),
            "INT4" => row
                .try_get::<Option<i32>, _>(i)
                .map(|v| v.map(SqlValue::Int)),
            "INT2" => row
                .try_get::<Option<i16>, _>(i)
                .map(|v| v.map(|n| SqlValue::Int(i32::from(n)))),
            "FLOAT8" => row
                .try_get::<Option<f64>, _>(i)
                .map(|v| v.map(SqlValue::Double)),
            "FLOAT4" => row
                .try_get::<Option<f32>, _>(i)
                .map(|v| v.map(|f| SqlValue::Double(f64::from(f)))),
            "BOOL" => row
                .try_get::<Option<bool>, _>(i)
                .map(|v| v.map(SqlValue::Bool)),
            "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => row
                .try_get::<Option<String>, _>(i)
                .map(|v| v.map(SqlValue::Text)),
            "TIMESTAMPTZ" => row
                .try_get::<Option<DateTime<Utc>>, _>(i)
                .map(|v| v.map(SqlValue::Timestamp)),
            "TIMESTAMP" => row
                .try_get::<Option<NaiveDateTime>, _>(i)
                .map(|v| v.map(|t| SqlValue::Timestamp(t.and_utc()))),
            other => {
                return Err(AppError::database(format!(
                    "unsupported column type {other} for column '{name}'"
                )));
            }
        }
        .map_err(|e| {
            AppError::with_source(
                ErrorKind::Database,
                format!("Failed to decode column '{name}'"),
                e,
            )
        })?
        .unwrap_or(SqlValue::Null);

        out.push(name, value);
    }
    Ok(out)
}

/// Map a driver error, keeping the statement text for diagnosis.
fn statement_error(sql: &str, e: sqlx::Error) -> AppError {
    error!(sql, error = %e, "statement execution failed");
    AppError::with_source(ErrorKind::Database, format!("Statement failed: {sql}"), e)
}
