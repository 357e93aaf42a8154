//! Message entity model.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use chathub_core::schema::{Entity, EntitySchema, FieldDef, IdSource};
use chathub_core::types::value::{FieldKind, SqlValue};

/// A chat message.
///
/// Message ids come from the distributed ID generator rather than the
/// database, so they are time-ordered across service instances and can be
/// assigned before the row is written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message identifier. `0` means not yet persisted.
    pub id: i64,
    /// The chat this message belongs to.
    pub chat_id: i64,
    /// The sending user.
    pub sender_id: i64,
    /// Message text.
    pub body: String,
    /// When the message was created.
    pub created_at: DateTime<Utc>,
}

static SCHEMA: LazyLock<EntitySchema<Message>> = LazyLock::new(|| {
    EntitySchema::new(
        "Message",
        "messages",
        IdSource::Generator,
        vec![
            FieldDef {
                name: "id",
                kind: FieldKind::BigInt,
                get: |m: &Message| SqlValue::BigInt(m.id),
                set: |m: &mut Message, v: SqlValue| {
                    m.id = v.as_i64()?;
                    Ok(())
                },
            },
            FieldDef {
                name: "chat_id",
                kind: FieldKind::BigInt,
                get: |m: &Message| SqlValue::BigInt(m.chat_id),
                set: |m: &mut Message, v: SqlValue| {
                    m.chat_id = v.as_i64()?;
                    Ok(())
                },
            },
            FieldDef {
                name: "sender_id",
                kind: FieldKind::BigInt,
                get: |m: &Message| SqlValue::BigInt(m.sender_id),
                set: |m: &mut Message, v: SqlValue| {
                    m.sender_id = v.as_i64()?;
                    Ok(())
                },
            },
            FieldDef {
                name: "body",
                kind: FieldKind::Text,
                get: |m: &Message| SqlValue::Text(m.body.clone()),
                set: |m: &mut Message, v: SqlValue| {
                    m.body = v.as_text()?;
                    Ok(())
                },
            },
            FieldDef {
                name: "created_at",
                kind: FieldKind::Timestamp,
                get: |m: &Message| SqlValue::Timestamp(m.created_at),
                set: |m: &mut Message, v: SqlValue| {
                    m.created_at = v.as_timestamp()?;
                    Ok(())
                },
            },
        ],
    )
});

impl Entity for Message {
    fn schema() -> &'static EntitySchema<Self> {
        &SCHEMA
    }
}
