//! The generic cache-coherent repository.
//!
//! One `Repository<E>` per entity type, composing the SQL executor, the
//! cache service, and the ID generator. Writes invalidate the affected
//! single-entity cache keys and bump the table's generation counter only
//! *after* the database mutation commits; readers therefore observe at
//! worst a miss-then-fresh-read, never a stale hit.

use std::marker::PhantomData;
use std::sync::Arc;

use tracing::debug;

use chathub_cache::CacheService;
use chathub_cache::keys;
use chathub_core::error::AppError;
use chathub_core::result::AppResult;
use chathub_core::schema::{Entity, IdSource};
use chathub_core::traits::executor::SqlExecutor;
use chathub_core::traits::spawn::{TaskHandle, TaskSpawner, submit_to};
use chathub_core::types::value::SqlValue;
use chathub_id::IdGenerator;

use crate::builder::{BuildStrategy, build_entity};
use crate::query::Query;
use crate::sql;

/// Generic repository over one entity type.
///
/// Cheap to clone; all shared state sits behind `Arc`s.
#[derive(Debug)]
pub struct Repository<E: Entity> {
    executor: Arc<dyn SqlExecutor>,
    cache: CacheService,
    ids: Arc<IdGenerator>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            executor: Arc::clone(&self.executor),
            cache: self.cache.clone(),
            ids: Arc::clone(&self.ids),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> Repository<E> {
    /// Create a repository from its collaborators.
    pub fn new(executor: Arc<dyn SqlExecutor>, cache: CacheService, ids: Arc<IdGenerator>) -> Self {
        Self {
            executor,
            cache,
            ids,
            _entity: PhantomData,
        }
    }

    /// The cache service this repository invalidates through.
    pub fn cache(&self) -> &CacheService {
        &self.cache
    }

    pub(crate) fn executor(&self) -> &Arc<dyn SqlExecutor> {
        &self.executor
    }

    /// Start a fluent query against this entity's table.
    pub fn query(&self) -> Query<E> {
        Query::new(self.clone())
    }

    /// Save one entity (insert or update by id).
    ///
    /// An entity with `id == 0` gets its id assigned — by the database
    /// (`RETURNING id`) or by the distributed generator, depending on the
    /// schema — and the id is written back into the entity. A non-zero id
    /// performs an upsert keyed on it. Never retries; the cache is only
    /// touched after the statement succeeds.
    pub async fn save(&self, entity: &mut E) -> AppResult<()> {
        let schema = E::schema();
        let id = schema.id_of(entity)?;

        if id == 0 {
            match schema.id_source() {
                IdSource::Database => {
                    let statement = sql::insert_returning_id(schema);
                    let params = sql::field_values(schema, entity, false)?;
                    let new_id = self
                        .executor
                        .fetch_id(&statement, &params)
                        .await?
                        .ok_or_else(|| {
                            AppError::database(format!("statement returned no id: {statement}"))
                        })?;
                    schema.set_id(entity, new_id)?;
                }
                IdSource::Generator => {
                    schema.set_id(entity, self.ids.next_id())?;
                    self.upsert_one(entity).await?;
                }
            }
        } else {
            self.upsert_one(entity).await?;
        }

        let id = schema.id_of(entity)?;
        self.invalidate_entity(id).await;
        self.cache.bump_generation(schema.table_name()).await;
        Ok(())
    }

    /// Save many entities in one multi-row upsert.
    ///
    /// Generator-sourced entities with `id == 0` are assigned ids first.
    /// Database-sourced entities must already carry ids: a multi-row
    /// statement cannot hand generated keys back per row, so unsaved ones
    /// are rejected with a validation error. The table generation is
    /// bumped once for the whole batch.
    pub async fn save_batch(&self, entities: &mut [E]) -> AppResult<()> {
        if entities.is_empty() {
            return Ok(());
        }
        let schema = E::schema();

        for entity in entities.iter_mut() {
            if schema.id_of(entity)? == 0 {
                match schema.id_source() {
                    IdSource::Generator => schema.set_id(entity, self.ids.next_id())?,
                    IdSource::Database => {
                        return Err(AppError::validation(format!(
                            "batch save of '{}' requires assigned ids; save unsaved entities individually",
                            schema.entity_name()
                        )));
                    }
                }
            }
        }

        let statement = sql::upsert(schema, entities.len());
        let mut params = Vec::with_capacity(entities.len() * schema.fields().len());
        for entity in entities.iter() {
            params.extend(sql::field_values(schema, entity, true)?);
        }
        self.executor.execute(&statement, &params).await?;

        for entity in entities.iter() {
            self.invalidate_entity(schema.id_of(entity)?).await;
        }
        self.cache.bump_generation(schema.table_name()).await;
        debug!(
            table = schema.table_name(),
            count = entities.len(),
            "batch saved"
        );
        Ok(())
    }

    /// Cache-aside lookup by id.
    ///
    /// Returns `Ok(None)` only when the database genuinely has no row; a
    /// database failure is an error, so callers can always tell the two
    /// apart.
    pub async fn find_one(&self, id: i64) -> AppResult<Option<E>> {
        let schema = E::schema();
        let key = keys::entity_key(schema.table_name(), id);

        if let Some(cached) = self.cache.get_json::<E>(&key).await {
            return Ok(Some(cached));
        }

        let found = self.fetch_by_id(id).await?;
        if let Some(ref entity) = found {
            self.cache
                .set_json(&key, entity, self.cache.entity_ttl())
                .await;
        }
        Ok(found)
    }

    /// Lookup by id with the cache bypassed entirely (no read, no
    /// populate). For benchmarking and read-after-write-critical paths.
    pub async fn find_one_without_cache(&self, id: i64) -> AppResult<Option<E>> {
        self.fetch_by_id(id).await
    }

    /// Asynchronous [`find_one`](Self::find_one) backed by a worker pool.
    pub fn find_one_async(
        &self,
        spawner: &dyn TaskSpawner,
        id: i64,
    ) -> TaskHandle<AppResult<Option<E>>> {
        let repo = self.clone();
        submit_to(spawner, async move { repo.find_one(id).await })
    }

    /// Delete by primary key. Returns whether a row was deleted.
    pub async fn delete_by_id(&self, id: i64) -> AppResult<bool> {
        let schema = E::schema();
        schema.id_field()?;
        if id == 0 {
            return Err(AppError::validation(format!(
                "cannot delete unsaved '{}' (id 0)",
                schema.entity_name()
            )));
        }

        let affected = self
            .executor
            .execute(&sql::delete_by_id(schema), &[SqlValue::BigInt(id)])
            .await?;

        if affected > 0 {
            self.invalidate_entity(id).await;
            self.cache.bump_generation(schema.table_name()).await;
        }
        Ok(affected > 0)
    }

    /// Delete an entity by its id field.
    pub async fn delete_entity(&self, entity: &E) -> AppResult<bool> {
        let id = E::schema().id_of(entity)?;
        self.delete_by_id(id).await
    }

    /// Delete many entities by primary key in one statement. Returns the
    /// number of rows deleted; the generation is bumped once.
    pub async fn delete_batch(&self, entities: &[E]) -> AppResult<u64> {
        if entities.is_empty() {
            return Ok(0);
        }
        let schema = E::schema();

        let mut ids = Vec::with_capacity(entities.len());
        for entity in entities {
            let id = schema.id_of(entity)?;
            if id == 0 {
                return Err(AppError::validation(format!(
                    "cannot delete unsaved '{}' (id 0)",
                    schema.entity_name()
                )));
            }
            ids.push(id);
        }

        let statement = sql::delete_by_ids(schema, ids.len());
        let params: Vec<SqlValue> = ids.iter().copied().map(SqlValue::BigInt).collect();
        let affected = self.executor.execute(&statement, &params).await?;

        if affected > 0 {
            for id in ids {
                self.invalidate_entity(id).await;
            }
            self.cache.bump_generation(schema.table_name()).await;
        }
        Ok(affected)
    }

    /// Check whether a row with this id exists.
    ///
    /// A cached entity short-circuits to `true`; otherwise a short-TTL
    /// cached boolean is consulted before falling back to a COUNT query.
    pub async fn exists(&self, id: i64) -> AppResult<bool> {
        let schema = E::schema();
        schema.id_field()?;
        let table = schema.table_name();

        if self.cache.exists(&keys::entity_key(table, id)).await {
            return Ok(true);
        }

        let bool_key = keys::exists_key(table, id);
        if let Some(cached) = self.cache.get(&bool_key).await {
            return Ok(cached == "1");
        }

        let rows = self
            .executor
            .fetch(&sql::count_by_id(schema), &[SqlValue::BigInt(id)])
            .await?;
        let count = count_from(&rows)?;
        let found = count > 0;

        self.cache
            .set(&bool_key, if found { "1" } else { "0" }, self.cache.exists_ttl())
            .await;
        Ok(found)
    }

    /// Delete all rows of the table and clear every cache key under the
    /// table's prefixes. Returns the number of rows deleted.
    pub async fn truncate(&self) -> AppResult<u64> {
        let schema = E::schema();
        let table = schema.table_name();

        let affected = self.executor.execute(&sql::delete_all(schema), &[]).await?;

        self.cache.clear_prefix(&keys::entity_prefix(table)).await;
        self.cache.clear_prefix(&keys::exists_prefix(table)).await;
        self.cache.bump_generation(table).await;
        debug!(table, affected, "table truncated");
        Ok(affected)
    }

    /// Count all rows of the table (uncached).
    pub async fn count(&self) -> AppResult<u64> {
        let rows = self.executor.fetch(&sql::count_all(E::schema()), &[]).await?;
        Ok(count_from(&rows)? as u64)
    }

    async fn upsert_one(&self, entity: &E) -> AppResult<()> {
        let schema = E::schema();
        let statement = sql::upsert(schema, 1);
        let params = sql::field_values(schema, entity, true)?;
        self.executor.execute(&statement, &params).await?;
        Ok(())
    }

    async fn fetch_by_id(&self, id: i64) -> AppResult<Option<E>> {
        let schema = E::schema();
        schema.id_field()?;
        let rows = self
            .executor
            .fetch(&sql::select_by_id(schema), &[SqlValue::BigInt(id)])
            .await?;

        match rows.first() {
            Some(row) => Ok(Some(build_entity(row, BuildStrategy::Fast)?)),
            None => Ok(None),
        }
    }

    async fn invalidate_entity(&self, id: i64) {
        let table = E::schema().table_name();
        self.cache.remove(&keys::entity_key(table, id)).await;
        self.cache.remove(&keys::exists_key(table, id)).await;
    }
}

fn count_from(rows: &[chathub_core::types::value::SqlRow]) -> AppResult<i64> {
    rows.first()
        .and_then(|row| row.get_at(0))
        .ok_or_else(|| AppError::database("count query returned no rows"))?
        .as_i64()
}
