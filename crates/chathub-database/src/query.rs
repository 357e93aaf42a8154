//! Fluent query building with generation-gated result caching.
//!
//! A query renders its SQL deterministically from the accumulated clauses,
//! then derives a cache key from the rendered text, the current generation
//! counters of every table it touches, and a hash of the bound values. Any
//! write to an involved table bumps that table's generation and thereby
//! invalidates every cached result over it without per-query bookkeeping.

use tracing::debug;

use chathub_cache::keys;
use chathub_core::error::AppError;
use chathub_core::result::AppResult;
use chathub_core::schema::Entity;
use chathub_core::traits::spawn::{TaskHandle, TaskSpawner, submit_to};
use chathub_core::types::filter::FilterOp;
use chathub_core::types::sorting::SortDirection;
use chathub_core::types::value::SqlValue;

use crate::builder::{BuildStrategy, build_entity};
use crate::repository::Repository;

#[derive(Debug, Clone)]
struct Filter {
    field: String,
    op: FilterOp,
    value: SqlValue,
}

#[derive(Debug, Clone)]
struct Join {
    table: String,
    left_field: String,
    right_field: String,
}

/// A fluent query over one entity's table.
///
/// Obtained from [`Repository::query`]; clauses accumulate in call order
/// and render deterministically.
#[derive(Debug, Clone)]
pub struct Query<E: Entity> {
    repo: Repository<E>,
    filters: Vec<Filter>,
    order: Vec<(String, SortDirection)>,
    limit: Option<u64>,
    joins: Vec<Join>,
}

impl<E: Entity> Query<E> {
    pub(crate) fn new(repo: Repository<E>) -> Self {
        Self {
            repo,
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
            joins: Vec::new(),
        }
    }

    /// Add an equality filter.
    pub fn filter(self, field: &str, value: impl Into<SqlValue>) -> Self {
        self.filter_op(field, FilterOp::Eq, value)
    }

    /// Add a filter with an explicit comparison operator.
    pub fn filter_op(mut self, field: &str, op: FilterOp, value: impl Into<SqlValue>) -> Self {
        self.filters.push(Filter {
            field: field.to_string(),
            op,
            value: value.into(),
        });
        self
    }

    /// Add an ordering clause.
    pub fn order_by(mut self, field: &str, direction: SortDirection) -> Self {
        self.order.push((field.to_string(), direction));
        self
    }

    /// Cap the number of returned rows.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Join another table on `<base>.<left_field> = <table>.<right_field>`.
    ///
    /// Joined tables participate in the generation hash, so writes to them
    /// also invalidate cached results of this query.
    pub fn join(mut self, table: &str, left_field: &str, right_field: &str) -> Self {
        self.joins.push(Join {
            table: table.to_string(),
            left_field: left_field.to_string(),
            right_field: right_field.to_string(),
        });
        self
    }

    /// Execute with result caching.
    pub async fn execute(self) -> AppResult<Vec<E>> {
        let (statement, params) = self.render()?;

        let mut tables: Vec<&str> = vec![E::schema().table_name()];
        tables.extend(self.joins.iter().map(|j| j.table.as_str()));

        let cache = self.repo.cache();
        let mut generations = Vec::with_capacity(tables.len());
        for table in &tables {
            generations.push((*table, cache.generation_of(table).await));
        }

        let key = keys::query_key(
            &statement,
            keys::generation_hash(&generations),
            keys::params_hash(&params),
        );

        if let Some(cached) = cache.get_json::<Vec<E>>(&key).await {
            debug!(statement = %statement, "query served from cache");
            return Ok(cached);
        }

        let result = self.run(&statement, &params).await?;
        cache.set_json(&key, &result, cache.query_ttl()).await;
        Ok(result)
    }

    /// Execute with the cache bypassed entirely.
    pub async fn execute_without_cache(self) -> AppResult<Vec<E>> {
        let (statement, params) = self.render()?;
        self.run(&statement, &params).await
    }

    /// Asynchronous [`execute`](Self::execute) backed by a worker pool.
    pub fn execute_async(self, spawner: &dyn TaskSpawner) -> TaskHandle<AppResult<Vec<E>>> {
        submit_to(spawner, async move { self.execute().await })
    }

    /// Asynchronous [`execute_without_cache`](Self::execute_without_cache).
    pub fn execute_async_without_cache(
        self,
        spawner: &dyn TaskSpawner,
    ) -> TaskHandle<AppResult<Vec<E>>> {
        submit_to(spawner, async move { self.execute_without_cache().await })
    }

    async fn run(&self, statement: &str, params: &[SqlValue]) -> AppResult<Vec<E>> {
        let rows = self.repo.executor().fetch(statement, params).await?;
        rows.iter()
            .map(|row| build_entity(row, BuildStrategy::Reflective))
            .collect()
    }

    /// Render the SQL template and bind list from the accumulated clauses.
    fn render(&self) -> AppResult<(String, Vec<SqlValue>)> {
        let schema = E::schema();
        let table = schema.table_name();

        for filter in &self.filters {
            if schema.field(&filter.field).is_none() {
                return Err(unknown_field(&filter.field, schema.entity_name()));
            }
        }
        for (field, _) in &self.order {
            if schema.field(field).is_none() {
                return Err(unknown_field(field, schema.entity_name()));
            }
        }

        // Qualify columns once another table is in play.
        let qualify = !self.joins.is_empty();
        let column = |name: &str| {
            if qualify {
                format!("{table}.{name}")
            } else {
                name.to_string()
            }
        };

        let columns: Vec<String> = schema.fields().iter().map(|f| column(f.name)).collect();
        let mut statement = format!("SELECT {} FROM {table}", columns.join(", "));

        for join in &self.joins {
            statement.push_str(&format!(
                " JOIN {} ON {}.{} = {}.{}",
                join.table, table, join.left_field, join.table, join.right_field
            ));
        }

        let mut params = Vec::with_capacity(self.filters.len());
        if !self.filters.is_empty() {
            let clauses: Vec<String> = self
                .filters
                .iter()
                .enumerate()
                .map(|(i, f)| format!("{} {} ${}", column(&f.field), f.op.as_sql(), i + 1))
                .collect();
            statement.push_str(" WHERE ");
            statement.push_str(&clauses.join(" AND "));
            params.extend(self.filters.iter().map(|f| f.value.clone()));
        }

        if !self.order.is_empty() {
            let clauses: Vec<String> = self
                .order
                .iter()
                .map(|(field, dir)| format!("{} {}", column(field), dir.as_sql()))
                .collect();
            statement.push_str(" ORDER BY ");
            statement.push_str(&clauses.join(", "));
        }

        if let Some(limit) = self.limit {
            statement.push_str(&format!(" LIMIT {limit}"));
        }

        Ok((statement, params))
    }
}

fn unknown_field(field: &str, entity: &str) -> AppError {
    AppError::validation(format!("unknown field '{field}' on entity '{entity}'"))
}
