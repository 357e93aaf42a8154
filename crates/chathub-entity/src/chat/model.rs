//! Chat entity model.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use chathub_core::schema::{Entity, EntitySchema, FieldDef, IdSource};
use chathub_core::types::value::{FieldKind, SqlValue};

use super::kind::ChatKind;

/// A conversation between users.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    /// Unique chat identifier. `0` means not yet persisted.
    pub id: i64,
    /// Chat title (group name, or the peer's name for direct chats).
    pub title: String,
    /// Direct or group.
    pub kind: ChatKind,
    /// When the chat was created.
    pub created_at: DateTime<Utc>,
}

static SCHEMA: LazyLock<EntitySchema<Chat>> = LazyLock::new(|| {
    EntitySchema::new(
        "Chat",
        "chats",
        IdSource::Database,
        vec![
            FieldDef {
                name: "id",
                kind: FieldKind::BigInt,
                get: |c: &Chat| SqlValue::BigInt(c.id),
                set: |c: &mut Chat, v: SqlValue| {
                    c.id = v.as_i64()?;
                    Ok(())
                },
            },
            FieldDef {
                name: "title",
                kind: FieldKind::Text,
                get: |c: &Chat| SqlValue::Text(c.title.clone()),
                set: |c: &mut Chat, v: SqlValue| {
                    c.title = v.as_text()?;
                    Ok(())
                },
            },
            FieldDef {
                name: "kind",
                kind: FieldKind::Text,
                get: |c: &Chat| SqlValue::Text(c.kind.as_str().to_string()),
                set: |c: &mut Chat, v: SqlValue| {
                    c.kind = v.as_text()?.parse()?;
                    Ok(())
                },
            },
            FieldDef {
                name: "created_at",
                kind: FieldKind::Timestamp,
                get: |c: &Chat| SqlValue::Timestamp(c.created_at),
                set: |c: &mut Chat, v: SqlValue| {
                    c.created_at = v.as_timestamp()?;
                    Ok(())
                },
            },
        ],
    )
});

impl Entity for Chat {
    fn schema() -> &'static EntitySchema<Self> {
        &SCHEMA
    }
}
