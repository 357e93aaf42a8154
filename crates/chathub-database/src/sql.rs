//! Deterministic statement rendering from an entity schema.
//!
//! Every statement projects and binds columns in field-declaration order,
//! which is what lets the positional (fast) entity builder and the
//! parameter hashing of the query cache stay in sync with the SQL text.

use chathub_core::result::AppResult;
use chathub_core::schema::EntitySchema;
use chathub_core::types::value::SqlValue;

/// Comma-separated column list in field-declaration order.
pub(crate) fn column_list<E>(schema: &EntitySchema<E>) -> String {
    schema
        .fields()
        .iter()
        .map(|f| f.name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// `SELECT <columns> FROM <table> WHERE id = $1`
pub(crate) fn select_by_id<E>(schema: &EntitySchema<E>) -> String {
    format!(
        "SELECT {} FROM {} WHERE id = $1",
        column_list(schema),
        schema.table_name()
    )
}

/// `INSERT INTO <table> (<non-id columns>) VALUES (...) RETURNING id`
pub(crate) fn insert_returning_id<E>(schema: &EntitySchema<E>) -> String {
    let columns: Vec<&str> = schema.non_id_fields().map(|f| f.name).collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${i}")).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING id",
        schema.table_name(),
        columns.join(", "),
        placeholders.join(", ")
    )
}

/// Multi-row upsert keyed on `id`:
/// `INSERT INTO <table> (<all columns>) VALUES (...), (...)
///  ON CONFLICT (id) DO UPDATE SET <col> = EXCLUDED.<col>, ...`
pub(crate) fn upsert<E>(schema: &EntitySchema<E>, rows: usize) -> String {
    let columns: Vec<&str> = schema.fields().iter().map(|f| f.name).collect();
    let width = columns.len();

    let values: Vec<String> = (0..rows)
        .map(|r| {
            let placeholders: Vec<String> =
                (1..=width).map(|i| format!("${}", r * width + i)).collect();
            format!("({})", placeholders.join(", "))
        })
        .collect();

    let updates: Vec<String> = schema
        .non_id_fields()
        .map(|f| format!("{} = EXCLUDED.{}", f.name, f.name))
        .collect();

    let conflict_action = if updates.is_empty() {
        "DO NOTHING".to_string()
    } else {
        format!("DO UPDATE SET {}", updates.join(", "))
    };

    format!(
        "INSERT INTO {} ({}) VALUES {} ON CONFLICT (id) {}",
        schema.table_name(),
        columns.join(", "),
        values.join(", "),
        conflict_action
    )
}

/// `DELETE FROM <table> WHERE id = $1`
pub(crate) fn delete_by_id<E>(schema: &EntitySchema<E>) -> String {
    format!("DELETE FROM {} WHERE id = $1", schema.table_name())
}

/// `DELETE FROM <table> WHERE id IN ($1, ..., $n)`
pub(crate) fn delete_by_ids<E>(schema: &EntitySchema<E>, count: usize) -> String {
    let placeholders: Vec<String> = (1..=count).map(|i| format!("${i}")).collect();
    format!(
        "DELETE FROM {} WHERE id IN ({})",
        schema.table_name(),
        placeholders.join(", ")
    )
}

/// `DELETE FROM <table>`
pub(crate) fn delete_all<E>(schema: &EntitySchema<E>) -> String {
    format!("DELETE FROM {}", schema.table_name())
}

/// `SELECT COUNT(*) FROM <table>`
pub(crate) fn count_all<E>(schema: &EntitySchema<E>) -> String {
    format!("SELECT COUNT(*) FROM {}", schema.table_name())
}

/// `SELECT COUNT(*) FROM <table> WHERE id = $1`
pub(crate) fn count_by_id<E>(schema: &EntitySchema<E>) -> String {
    format!("SELECT COUNT(*) FROM {} WHERE id = $1", schema.table_name())
}

/// Bind values for one entity in field-declaration order, optionally
/// skipping the `id` field (for database-assigned inserts).
pub(crate) fn field_values<E>(
    schema: &EntitySchema<E>,
    entity: &E,
    include_id: bool,
) -> AppResult<Vec<SqlValue>> {
    // Touch the id field first so a schema without one fails with a
    // configuration error before any SQL is rendered.
    schema.id_field()?;
    Ok(schema
        .fields()
        .iter()
        .filter(|f| include_id || f.name != "id")
        .map(|f| (f.get)(entity))
        .collect())
}

#[cfg(test)]
mod tests {
    use chathub_core::schema::{EntitySchema, FieldDef, IdSource};
    use chathub_core::types::value::FieldKind;

    use super::*;

    #[derive(Debug, Clone, Default)]
    struct Sample {
        id: i64,
        name: String,
    }

    fn schema() -> EntitySchema<Sample> {
        EntitySchema::new(
            "Sample",
            "samples",
            IdSource::Database,
            vec![
                FieldDef {
                    name: "id",
                    kind: FieldKind::BigInt,
                    get: |s: &Sample| SqlValue::BigInt(s.id),
                    set: |s: &mut Sample, v: SqlValue| {
                        s.id = v.as_i64()?;
                        Ok(())
                    },
                },
                FieldDef {
                    name: "name",
                    kind: FieldKind::Text,
                    get: |s: &Sample| SqlValue::Text(s.name.clone()),
                    set: |s: &mut Sample, v: SqlValue| {
                        s.name = v.as_text()?;
                        Ok(())
                    },
                },
            ],
        )
    }

    #[test]
    fn test_select_by_id() {
        assert_eq!(
            select_by_id(&schema()),
            "SELECT id, name FROM samples WHERE id = $1"
        );
    }

    #[test]
    fn test_insert_returning_id() {
        assert_eq!(
            insert_returning_id(&schema()),
            "INSERT INTO samples (name) VALUES ($1) RETURNING id"
        );
    }

    #[test]
    fn test_upsert_single_row() {
        assert_eq!(
            upsert(&schema(), 1),
            "INSERT INTO samples (id, name) VALUES ($1, $2) \
             ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name"
        );
    }

    #[test]
    fn test_upsert_numbers_placeholders_across_rows() {
        assert_eq!(
            upsert(&schema(), 3),
            "INSERT INTO samples (id, name) VALUES ($1, $2), ($3, $4), ($5, $6) \
             ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name"
        );
    }

    #[test]
    fn test_delete_by_ids() {
        assert_eq!(
            delete_by_ids(&schema(), 2),
            "DELETE FROM samples WHERE id IN ($1, $2)"
        );
    }

    #[test]
    fn test_field_values_orders_and_filters() {
        let sample = Sample {
            id: 9,
            name: "x".into(),
        };
        let all = field_values(&schema(), &sample, true).unwrap();
        assert_eq!(all, vec![SqlValue::BigInt(9), SqlValue::Text("x".into())]);
        let without_id = field_values(&schema(), &sample, false).unwrap();
        assert_eq!(without_id, vec![SqlValue::Text("x".into())]);
    }
}
