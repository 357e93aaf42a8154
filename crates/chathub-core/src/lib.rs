//! # chathub-core
//!
//! Core crate for the ChatHub data-access backbone. Contains boundary
//! traits, configuration schemas, the SQL value model, the entity schema
//! contract, and the unified error system.
//!
//! This crate has **no** internal dependencies on other ChatHub crates.

pub mod config;
pub mod error;
pub mod logging;
pub mod result;
pub mod schema;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
