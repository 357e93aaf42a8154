//! Message domain entities.

pub mod model;
pub mod status;

pub use model::Message;
pub use status::{DeliveryState, MessageStatus};
