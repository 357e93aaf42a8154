//! Entity schema contract: the static description of an entity type's
//! table and fields.
//!
//! One [`EntitySchema`] exists per entity type, built once behind a
//! `LazyLock` and immutable for the process lifetime. Field accessors are
//! plain `fn` pointers bound at compile time, so reading and writing a
//! field never goes through dynamic typing beyond the closed
//! [`SqlValue`] variant.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::AppError;
use crate::result::AppResult;
use crate::types::value::{FieldKind, SqlValue};

/// Where the id of a not-yet-persisted entity (`id == 0`) comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdSource {
    /// The database assigns the id (`INSERT ... RETURNING id`).
    Database,
    /// The distributed ID generator assigns the id before the insert.
    Generator,
}

/// One field of an entity schema: name, declared column type, and typed
/// accessors into the entity struct.
#[derive(Debug, Clone)]
pub struct FieldDef<E> {
    /// Column / field name.
    pub name: &'static str,
    /// Declared semantic type of the column.
    pub kind: FieldKind,
    /// Read the field from an entity as a [`SqlValue`].
    pub get: fn(&E) -> SqlValue,
    /// Write a [`SqlValue`] into the field, coercing from neighboring
    /// native types losslessly.
    pub set: fn(&mut E, SqlValue) -> AppResult<()>,
}

/// The static description of an entity type.
#[derive(Debug)]
pub struct EntitySchema<E> {
    entity_name: &'static str,
    table_name: &'static str,
    id_source: IdSource,
    fields: Vec<FieldDef<E>>,
}

impl<E> EntitySchema<E> {
    /// Create a new schema. Field order is the declaration order used for
    /// SQL column lists and positional row building.
    pub fn new(
        entity_name: &'static str,
        table_name: &'static str,
        id_source: IdSource,
        fields: Vec<FieldDef<E>>,
    ) -> Self {
        Self {
            entity_name,
            table_name,
            id_source,
            fields,
        }
    }

    /// Entity type name (for diagnostics).
    pub fn entity_name(&self) -> &'static str {
        self.entity_name
    }

    /// Backing table name.
    pub fn table_name(&self) -> &'static str {
        self.table_name
    }

    /// How ids are assigned for unsaved entities.
    pub fn id_source(&self) -> IdSource {
        self.id_source
    }

    /// All fields in declaration order.
    pub fn fields(&self) -> &[FieldDef<E>] {
        &self.fields
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDef<E>> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The mandatory `id` field.
    ///
    /// Every operation that addresses an entity by identity (`save`,
    /// `delete_*`, `exists`) requires one; a schema without it is a
    /// configuration error surfaced at the first such call.
    pub fn id_field(&self) -> AppResult<&FieldDef<E>> {
        self.field("id").ok_or_else(|| {
            AppError::configuration(format!(
                "entity '{}' (table '{}') declares no 'id' field",
                self.entity_name, self.table_name
            ))
        })
    }

    /// Fields other than `id`, in declaration order.
    pub fn non_id_fields(&self) -> impl Iterator<Item = &FieldDef<E>> {
        self.fields.iter().filter(|f| f.name != "id")
    }

    /// Read the entity's id.
    pub fn id_of(&self, entity: &E) -> AppResult<i64> {
        (self.id_field()?.get)(entity).as_i64()
    }

    /// Write the entity's id.
    pub fn set_id(&self, entity: &mut E, id: i64) -> AppResult<()> {
        (self.id_field()?.set)(entity, SqlValue::BigInt(id))
    }
}

/// Contract every persistable entity type implements.
///
/// Entities are plain data; identity is the `id` field, with `id == 0`
/// meaning "not yet persisted". The JSON serde bounds back the entity
/// cache codec.
pub trait Entity:
    Clone + Default + std::fmt::Debug + Send + Sync + Serialize + DeserializeOwned + 'static
{
    /// The schema for this entity type, built once per process.
    fn schema() -> &'static EntitySchema<Self>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default)]
    struct Widget {
        id: i64,
        label: String,
    }

    fn widget_schema() -> EntitySchema<Widget> {
        EntitySchema::new(
            "Widget",
            "widgets",
            IdSource::Database,
            vec![
                FieldDef {
                    name: "id",
                    kind: FieldKind::BigInt,
                    get: |w: &Widget| SqlValue::BigInt(w.id),
                    set: |w: &mut Widget, v: SqlValue| {
                        w.id = v.as_i64()?;
                        Ok(())
                    },
                },
                FieldDef {
                    name: "label",
                    kind: FieldKind::Text,
                    get: |w: &Widget| SqlValue::Text(w.label.clone()),
                    set: |w: &mut Widget, v: SqlValue| {
                        w.label = v.as_text()?;
                        Ok(())
                    },
                },
            ],
        )
    }

    #[test]
    fn test_id_round_trip() {
        let schema = widget_schema();
        let mut w = Widget::default();
        schema.set_id(&mut w, 42).unwrap();
        assert_eq!(schema.id_of(&w).unwrap(), 42);
    }

    #[test]
    fn test_missing_id_field_is_configuration_error() {
        let schema: EntitySchema<Widget> = EntitySchema::new(
            "Widget",
            "widgets",
            IdSource::Database,
            vec![FieldDef {
                name: "label",
                kind: FieldKind::Text,
                get: |w: &Widget| SqlValue::Text(w.label.clone()),
                set: |w: &mut Widget, v: SqlValue| {
                    w.label = v.as_text()?;
                    Ok(())
                },
            }],
        );
        let err = schema.id_field().unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Configuration);
    }

    #[test]
    fn test_field_lookup_and_order() {
        let schema = widget_schema();
        assert!(schema.field("label").is_some());
        assert!(schema.field("nope").is_none());
        let names: Vec<_> = schema.fields().iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["id", "label"]);
    }
}
