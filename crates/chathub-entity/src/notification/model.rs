//! Notification entity model.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use chathub_core::schema::{Entity, EntitySchema, FieldDef, IdSource};
use chathub_core::types::value::{FieldKind, SqlValue};

use super::category::NotificationKind;

/// A notification queued for a user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Unique notification identifier. `0` means not yet persisted.
    pub id: i64,
    /// The receiving user.
    pub user_id: i64,
    /// Notification category.
    pub kind: NotificationKind,
    /// Rendered notification text.
    pub body: String,
    /// Whether the user has seen it.
    pub read: bool,
    /// When the notification was created.
    pub created_at: DateTime<Utc>,
}

static SCHEMA: LazyLock<EntitySchema<Notification>> = LazyLock::new(|| {
    EntitySchema::new(
        "Notification",
        "notifications",
        IdSource::Generator,
        vec![
            FieldDef {
                name: "id",
                kind: FieldKind::BigInt,
                get: |n: &Notification| SqlValue::BigInt(n.id),
                set: |n: &mut Notification, v: SqlValue| {
                    n.id = v.as_i64()?;
                    Ok(())
                },
            },
            FieldDef {
                name: "user_id",
                kind: FieldKind::BigInt,
                get: |n: &Notification| SqlValue::BigInt(n.user_id),
                set: |n: &mut Notification, v: SqlValue| {
                    n.user_id = v.as_i64()?;
                    Ok(())
                },
            },
            FieldDef {
                name: "kind",
                kind: FieldKind::Text,
                get: |n: &Notification| SqlValue::Text(n.kind.as_str().to_string()),
                set: |n: &mut Notification, v: SqlValue| {
                    n.kind = v.as_text()?.parse()?;
                    Ok(())
                },
            },
            FieldDef {
                name: "body",
                kind: FieldKind::Text,
                get: |n: &Notification| SqlValue::Text(n.body.clone()),
                set: |n: &mut Notification, v: SqlValue| {
                    n.body = v.as_text()?;
                    Ok(())
                },
            },
            FieldDef {
                name: "read",
                kind: FieldKind::Bool,
                get: |n: &Notification| SqlValue::Bool(n.read),
                set: |n: &mut Notification, v: SqlValue| {
                    n.read = v.as_bool()?;
                    Ok(())
                },
            },
            FieldDef {
                name: "created_at",
                kind: FieldKind::Timestamp,
                get: |n: &Notification| SqlValue::Timestamp(n.created_at),
                set: |n: &mut Notification, v: SqlValue| {
                    n.created_at = v.as_timestamp()?;
                    Ok(())
                },
            },
        ],
    )
});

impl Entity for Notification {
    fn schema() -> &'static EntitySchema<Self> {
        &SCHEMA
    }
}
