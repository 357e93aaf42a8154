//! User entity model.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use chathub_core::schema::{Entity, EntitySchema, FieldDef, IdSource};
use chathub_core::types::value::{FieldKind, SqlValue};

/// A registered user of the chat platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier. `0` means not yet persisted.
    pub id: i64,
    /// Unique login name.
    pub username: String,
    /// Public discriminator tag (e.g. `roma228`).
    pub tag: String,
    /// Email address (optional).
    pub email: Option<String>,
    /// Human-readable display name.
    pub display_name: Option<String>,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
}

static SCHEMA: LazyLock<EntitySchema<User>> = LazyLock::new(|| {
    EntitySchema::new(
        "User",
        "users",
        IdSource::Database,
        vec![
            FieldDef {
                name: "id",
                kind: FieldKind::BigInt,
                get: |u: &User| SqlValue::BigInt(u.id),
                set: |u: &mut User, v: SqlValue| {
                    u.id = v.as_i64()?;
                    Ok(())
                },
            },
            FieldDef {
                name: "username",
                kind: FieldKind::Text,
                get: |u: &User| SqlValue::Text(u.username.clone()),
                set: |u: &mut User, v: SqlValue| {
                    u.username = v.as_text()?;
                    Ok(())
                },
            },
            FieldDef {
                name: "tag",
                kind: FieldKind::Text,
                get: |u: &User| SqlValue::Text(u.tag.clone()),
                set: |u: &mut User, v: SqlValue| {
                    u.tag = v.as_text()?;
                    Ok(())
                },
            },
            FieldDef {
                name: "email",
                kind: FieldKind::Text,
                get: |u: &User| SqlValue::from(u.email.clone()),
                set: |u: &mut User, v: SqlValue| {
                    u.email = Some(v.as_text()?);
                    Ok(())
                },
            },
            FieldDef {
                name: "display_name",
                kind: FieldKind::Text,
                get: |u: &User| SqlValue::from(u.display_name.clone()),
                set: |u: &mut User, v: SqlValue| {
                    u.display_name = Some(v.as_text()?);
                    Ok(())
                },
            },
            FieldDef {
                name: "created_at",
                kind: FieldKind::Timestamp,
                get: |u: &User| SqlValue::Timestamp(u.created_at),
                set: |u: &mut User, v: SqlValue| {
                    u.created_at = v.as_timestamp()?;
                    Ok(())
                },
            },
        ],
    )
});

impl Entity for User {
    fn schema() -> &'static EntitySchema<Self> {
        &SCHEMA
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_shape() {
        let schema = User::schema();
        assert_eq!(schema.table_name(), "users");
        assert_eq!(schema.id_source(), IdSource::Database);
        assert!(schema.id_field().is_ok());
    }

    #[test]
    fn test_field_round_trip() {
        let schema = User::schema();
        let user = User {
            id: 6,
            username: "roma".into(),
            tag: "roma228".into(),
            email: Some("roma@example.com".into()),
            display_name: None,
            created_at: Utc::now(),
        };

        let mut rebuilt = User::default();
        for field in schema.fields() {
            let value = (field.get)(&user);
            if !value.is_null() {
                (field.set)(&mut rebuilt, value).unwrap();
            }
        }
        assert_eq!(rebuilt, user);
    }
}
