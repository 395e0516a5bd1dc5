//! SICC Core Library
//!
//! This crate provides the domain models, error types, configuration, query DSL and
//! validation shared by the Directus client, the services and the CLI.
//! It contains no network code: the backend is reached through the [`ItemStore`] trait.

pub mod config;
pub mod constants;
pub mod error;
pub mod grouping;
pub mod models;
pub mod query;
pub mod relation;
pub mod store;
pub mod validation;

// Re-export commonly used types
pub use config::SiccConfig;
pub use error::{ErrorMetadata, LogLevel, SiccError, SiccResult};
pub use grouping::group_by;
pub use query::{FilterOp, ItemQuery};
pub use relation::{normalize_relation_id, ItemId, Relation};
pub use store::{fetch_item, fetch_items, ItemStore, ItemsMeta, ItemsResponse};
