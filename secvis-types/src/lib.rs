//! Core type definitions for the security visibility exporter.
//!
//! This crate defines the plain data shared by the sync engine and the
//! exporter binary:
//! - `Record`, an opaque JSON object that always carries a string `id`
//! - `ObjectKind`, the collections a record can come from
//!
//! Records are deliberately schema-less. Only the identity field and the
//! foreign keys used to join collections are given typed accessors.

mod kind;
mod record;

pub use kind::ObjectKind;
pub use record::{Record, fields};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when building records.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("record is not a JSON object")]
    NotAnObject,

    #[error("record has no string `id` field")]
    MissingId,
}
