//! Test support: an in-memory [`SqlExecutor`] backed by per-table row maps.
//!
//! Understands exactly the statement shapes the renderer and query builder
//! emit (single/multi-row upserts, `RETURNING id` inserts, selects with
//! simple comparison filters, COUNT, and deletes by id). Services use it to
//! test repository-backed code with a substitute collaborator instead of a
//! live database; join queries are out of its scope and fail loudly.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use chathub_core::error::AppError;
use chathub_core::result::AppResult;
use chathub_core::traits::executor::SqlExecutor;
use chathub_core::types::value::{SqlRow, SqlValue};

/// In-memory SQL executor for tests.
#[derive(Debug, Default)]
pub struct MemoryExecutor {
    tables: Mutex<HashMap<String, BTreeMap<i64, SqlRow>>>,
    statements: Mutex<Vec<String>>,
    fetch_calls: AtomicUsize,
    execute_calls: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryExecutor {
    /// Create an empty executor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with a database error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of `fetch` calls so far.
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Number of `execute` calls so far.
    pub fn execute_calls(&self) -> usize {
        self.execute_calls.load(Ordering::SeqCst)
    }

    /// Every statement seen, in order.
    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of rows currently stored for a table.
    pub fn row_count(&self, table: &str) -> usize {
        self.tables
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(table)
            .map_or(0, BTreeMap::len)
    }

    fn record(&self, sql: &str) -> AppResult<()> {
        self.statements
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(sql.to_string());
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::database(format!("induced failure: {sql}")));
        }
        Ok(())
    }
}

#[async_trait]
impl SqlExecutor for MemoryExecutor {
    async fn fetch(&self, sql: &str, params: &[SqlValue]) -> AppResult<Vec<SqlRow>> {
        self.record(sql)?;
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);

        let mut tables = self.tables.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(rest) = sql.strip_prefix("SELECT COUNT(*) FROM ") {
            let table = leading_identifier(rest);
            let rows = tables.entry(table).or_default();
            let count = if sql.contains(" WHERE id = $1") {
                let id = params[0].as_i64()?;
                i64::from(rows.contains_key(&id))
            } else {
                rows.len() as i64
            };
            let mut row = SqlRow::new();
            row.push("count", SqlValue::BigInt(count));
            return Ok(vec![row]);
        }

        if sql.contains(" JOIN ") {
            return Err(AppError::database(format!(
                "memory executor does not support joins: {sql}"
            )));
        }

        let select = parse_select(sql)?;
        let rows = tables.entry(select.table.clone()).or_default();

        let mut matched: Vec<&SqlRow> = rows
            .values()
            .filter(|row| {
                select
                    .conditions
                    .iter()
                    .all(|c| c.matches(row, params))
            })
            .collect();

        if !select.order.is_empty() {
            matched.sort_by(|a, b| {
                for (column, descending) in &select.order {
                    let ord = compare(
                        a.get(column).unwrap_or(&SqlValue::Null),
                        b.get(column).unwrap_or(&SqlValue::Null),
                    );
                    let ord = if *descending { ord.reverse() } else { ord };
                    if ord != std::cmp::Ordering::Equal {
                        return ord;
                    }
                }
                std::cmp::Ordering::Equal
            });
        }

        if let Some(limit) = select.limit {
            matched.truncate(limit);
        }

        Ok(matched
            .into_iter()
            .map(|row| project(row, &select.columns))
            .collect())
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> AppResult<u64> {
        self.record(sql)?;
        self.execute_calls.fetch_add(1, Ordering::SeqCst);

        let mut tables = self.tables.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(rest) = sql.strip_prefix("DELETE FROM ") {
            let table = leading_identifier(rest);
            let rows = tables.entry(table).or_default();

            if sql.contains(" WHERE id IN (") {
                let mut removed = 0u64;
                for value in params {
                    if rows.remove(&value.as_i64()?).is_some() {
                        removed += 1;
                    }
                }
                return Ok(removed);
            }
            if sql.contains(" WHERE id = $1") {
                let id = params[0].as_i64()?;
                return Ok(u64::from(rows.remove(&id).is_some()));
            }
            let removed = rows.len() as u64;
            rows.clear();
            return Ok(removed);
        }

        if sql.starts_with("INSERT INTO ") {
            let insert = parse_insert(sql)?;
            let rows = tables.entry(insert.table.clone()).or_default();
            let width = insert.columns.len();
            let mut affected = 0u64;

            for chunk in params.chunks(width) {
                let row = row_from(&insert.columns, chunk);
                let id = row
                    .get("id")
                    .ok_or_else(|| AppError::database("upsert without id column"))?
                    .as_i64()?;
                rows.insert(id, row);
                affected += 1;
            }
            return Ok(affected);
        }

        Err(AppError::database(format!("unsupported statement: {sql}")))
    }

    async fn fetch_id(&self, sql: &str, params: &[SqlValue]) -> AppResult<Option<i64>> {
        self.record(sql)?;
        self.execute_calls.fetch_add(1, Ordering::SeqCst);

        if !sql.ends_with(" RETURNING id") {
            return Err(AppError::database(format!("unsupported statement: {sql}")));
        }

        let insert = parse_insert(sql)?;
        let mut tables = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        let rows = tables.entry(insert.table.clone()).or_default();

        let id = rows.keys().next_back().copied().unwrap_or(0) + 1;
        let mut row = row_from(&insert.columns, params);
        row.push("id", SqlValue::BigInt(id));
        rows.insert(id, row);
        Ok(Some(id))
    }
}

struct ParsedSelect {
    table: String,
    columns: Vec<String>,
    conditions: Vec<Condition>,
    order: Vec<(String, bool)>,
    limit: Option<usize>,
}

struct Condition {
    column: String,
    op: String,
    param_index: usize,
}

impl Condition {
    fn matches(&self, row: &SqlRow, params: &[SqlValue]) -> bool {
        let left = row.get(&self.column).unwrap_or(&SqlValue::Null);
        let right = &params[self.param_index];
        let ord = compare(left, right);
        match self.op.as_str() {
            "=" => ord == std::cmp::Ordering::Equal,
            "!=" => ord != std::cmp::Ordering::Equal,
            "<" => ord == std::cmp::Ordering::Less,
            "<=" => ord != std::cmp::Ordering::Greater,
            ">" => ord == std::cmp::Ordering::Greater,
            ">=" => ord != std::cmp::Ordering::Less,
            _ => false,
        }
    }
}

fn parse_select(sql: &str) -> AppResult<ParsedSelect> {
    let body = sql
        .strip_prefix("SELECT ")
        .ok_or_else(|| AppError::database(format!("unsupported statement: {sql}")))?;
    let (columns_part, rest) = body
        .split_once(" FROM ")
        .ok_or_else(|| AppError::database(format!("unsupported statement: {sql}")))?;

    let table = leading_identifier(rest);
    let columns: Vec<String> = columns_part.split(", ").map(str::to_string).collect();

    let mut conditions = Vec::new();
    if let Some((_, clause)) = sql.split_once(" WHERE ") {
        let clause = clause
            .split(" ORDER BY ")
            .next()
            .unwrap_or(clause)
            .split(" LIMIT ")
            .next()
            .unwrap_or(clause);
        for condition in clause.split(" AND ") {
            let parts: Vec<&str> = condition.split_whitespace().collect();
            if parts.len() != 3 || !parts[2].starts_with('$') {
                return Err(AppError::database(format!(
                    "unsupported condition '{condition}' in: {sql}"
                )));
            }
            let index: usize = parts[2][1..]
                .parse()
                .map_err(|_| AppError::database(format!("bad placeholder in: {sql}")))?;
            conditions.push(Condition {
                column: parts[0].to_string(),
                op: parts[1].to_string(),
                param_index: index - 1,
            });
        }
    }

    let mut order = Vec::new();
    if let Some((_, clause)) = sql.split_once(" ORDER BY ") {
        let clause = clause.split(" LIMIT ").next().unwrap_or(clause);
        for clause_part in clause.split(", ") {
            let parts: Vec<&str> = clause_part.split_whitespace().collect();
            let descending = parts.get(1).is_some_and(|d| *d == "DESC");
            order.push((parts[0].to_string(), descending));
        }
    }

    let limit = sql
        .split_once(" LIMIT ")
        .map(|(_, n)| {
            n.trim()
                .parse()
                .map_err(|_| AppError::database(format!("bad limit in: {sql}")))
        })
        .transpose()?;

    Ok(ParsedSelect {
        table,
        columns,
        conditions,
        order,
        limit,
    })
}

struct ParsedInsert {
    table: String,
    columns: Vec<String>,
}

fn parse_insert(sql: &str) -> AppResult<ParsedInsert> {
    let rest = sql
        .strip_prefix("INSERT INTO ")
        .ok_or_else(|| AppError::database(format!("unsupported statement: {sql}")))?;
    let table = leading_identifier(rest);

    let open = sql
        .find('(')
        .ok_or_else(|| AppError::database(format!("unsupported statement: {sql}")))?;
    let close = sql[open..]
        .find(')')
        .map(|i| open + i)
        .ok_or_else(|| AppError::database(format!("unsupported statement: {sql}")))?;
    let columns = sql[open + 1..close]
        .split(", ")
        .map(str::to_string)
        .collect();

    Ok(ParsedInsert { table, columns })
}

fn leading_identifier(s: &str) -> String {
    s.chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

fn row_from(columns: &[String], values: &[SqlValue]) -> SqlRow {
    let mut row = SqlRow::new();
    for (column, value) in columns.iter().zip(values) {
        row.push(column.clone(), value.clone());
    }
    row
}

fn project(row: &SqlRow, columns: &[String]) -> SqlRow {
    let mut out = SqlRow::new();
    for column in columns {
        out.push(
            column.clone(),
            row.get(column).cloned().unwrap_or(SqlValue::Null),
        );
    }
    out
}

fn compare(a: &SqlValue, b: &SqlValue) -> std::cmp::Ordering {
    match (a.as_i64(), b.as_i64()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.canonical_text().cmp(&b.canonical_text()),
    }
}
