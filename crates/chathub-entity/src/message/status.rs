//! Per-recipient message delivery status.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use chathub_core::schema::{Entity, EntitySchema, FieldDef, IdSource};
use chathub_core::types::value::{FieldKind, SqlValue};

/// Delivery state of a message for one recipient.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryState {
    /// Accepted by the server, not yet delivered.
    #[default]
    Sent,
    /// Delivered to the recipient's device.
    Delivered,
    /// Read by the recipient.
    Read,
}

impl DeliveryState {
    /// Return the state as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Read => "read",
        }
    }
}

impl fmt::Display for DeliveryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DeliveryState {
    type Err = chathub_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sent" => Ok(Self::Sent),
            "delivered" => Ok(Self::Delivered),
            "read" => Ok(Self::Read),
            _ => Err(chathub_core::AppError::validation(format!(
                "Invalid delivery state: '{s}'. Expected one of: sent, delivered, read"
            ))),
        }
    }
}

/// Delivery status of one message for one recipient.
///
/// These rows are written at very high frequency (every delivered or read
/// message produces one), which is why they flow through the write
/// batchers rather than individual saves.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageStatus {
    /// Unique row identifier. `0` means not yet persisted.
    pub id: i64,
    /// The message this status refers to.
    pub message_id: i64,
    /// The recipient user.
    pub user_id: i64,
    /// Current delivery state.
    pub state: DeliveryState,
    /// When the state last changed.
    pub updated_at: DateTime<Utc>,
}

static SCHEMA: LazyLock<EntitySchema<MessageStatus>> = LazyLock::new(|| {
    EntitySchema::new(
        "MessageStatus",
        "message_statuses",
        IdSource::Generator,
        vec![
            FieldDef {
                name: "id",
                kind: FieldKind::BigInt,
                get: |s: &MessageStatus| SqlValue::BigInt(s.id),
                set: |s: &mut MessageStatus, v: SqlValue| {
                    s.id = v.as_i64()?;
                    Ok(())
                },
            },
            FieldDef {
                name: "message_id",
                kind: FieldKind::BigInt,
                get: |s: &MessageStatus| SqlValue::BigInt(s.message_id),
                set: |s: &mut MessageStatus, v: SqlValue| {
                    s.message_id = v.as_i64()?;
                    Ok(())
                },
            },
            FieldDef {
                name: "user_id",
                kind: FieldKind::BigInt,
                get: |s: &MessageStatus| SqlValue::BigInt(s.user_id),
                set: |s: &mut MessageStatus, v: SqlValue| {
                    s.user_id = v.as_i64()?;
                    Ok(())
                },
            },
            FieldDef {
                name: "state",
                kind: FieldKind::Text,
                get: |s: &MessageStatus| SqlValue::Text(s.state.as_str().to_string()),
                set: |s: &mut MessageStatus, v: SqlValue| {
                    s.state = v.as_text()?.parse()?;
                    Ok(())
                },
            },
            FieldDef {
                name: "updated_at",
                kind: FieldKind::Timestamp,
                get: |s: &MessageStatus| SqlValue::Timestamp(s.updated_at),
                set: |s: &mut MessageStatus, v: SqlValue| {
                    s.updated_at = v.as_timestamp()?;
                    Ok(())
                },
            },
        ],
    )
});

impl Entity for MessageStatus {
    fn schema() -> &'static EntitySchema<Self> {
        &SCHEMA
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_parse_round_trip() {
        for state in [
            DeliveryState::Sent,
            DeliveryState::Delivered,
            DeliveryState::Read,
        ] {
            assert_eq!(state.as_str().parse::<DeliveryState>().unwrap(), state);
        }
        assert!("bogus".parse::<DeliveryState>().is_err());
    }

    #[test]
    fn test_generator_id_source() {
        assert_eq!(MessageStatus::schema().id_source(), IdSource::Generator);
    }
}
