//! Entity building: materializing one database row into an entity.
//!
//! Two interchangeable strategies exist. The reflective strategy resolves
//! every column by name and tolerates missing columns; the fast strategy
//! reads positionally, relying on the renderer's guarantee that SELECTs
//! project columns in field-declaration order. Both must produce identical
//! entities for identical rows.

use chathub_core::result::AppResult;
use chathub_core::schema::Entity;
use chathub_core::types::value::SqlRow;

/// How to map row columns onto entity fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStrategy {
    /// Resolve each column by name. Missing and NULL columns are skipped.
    Reflective,
    /// Read columns by position in field-declaration order.
    Fast,
}

/// Build an entity from a row using the chosen strategy.
pub fn build_entity<E: Entity>(row: &SqlRow, strategy: BuildStrategy) -> AppResult<E> {
    match strategy {
        BuildStrategy::Reflective => build_reflective(row),
        BuildStrategy::Fast => build_fast(row),
    }
}

fn build_reflective<E: Entity>(row: &SqlRow) -> AppResult<E> {
    let schema = E::schema();
    let mut entity = E::default();
    for field in schema.fields() {
        if let Some(value) = row.get(field.name) {
            if !value.is_null() {
                (field.set)(&mut entity, value.clone())?;
            }
        }
    }
    Ok(entity)
}

fn build_fast<E: Entity>(row: &SqlRow) -> AppResult<E> {
    let schema = E::schema();
    let mut entity = E::default();
    for (index, field) in schema.fields().iter().enumerate() {
        if let Some(value) = row.get_at(index) {
            if !value.is_null() {
                (field.set)(&mut entity, value.clone())?;
            }
        }
    }
    Ok(entity)
}
