//! # chathub-entity
//!
//! Domain entity models for the ChatHub platform. Every struct in this
//! crate represents a database table row. Entities are plain data: the
//! persistence layer never subclasses or wraps them, it reads and writes
//! them through the static [`chathub_core::schema::EntitySchema`] each
//! model exposes.

pub mod chat;
pub mod message;
pub mod notification;
pub mod user;

pub use chat::{Chat, ChatKind};
pub use message::{DeliveryState, Message, MessageStatus};
pub use notification::{Notification, NotificationKind};
pub use user::User;
