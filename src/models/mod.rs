//! Data models for bulkport.
//!
//! This module contains the types that flow through both pipelines:
//! records handed to and from the store, the per-row field sets produced by
//! parsing, and the caller-supplied mapping and context tables used on import.

mod mapping;
mod record;

pub use mapping::{AttributeMap, Context, ContextValue, DeriveFn};
pub use record::{FieldErrors, FieldSet, Record, RecordId, SaveOutcome, describe_errors};
