//! Security features.
//!
//! Sensitive-field redaction applied at export time.

mod field_filter;

pub use field_filter::{FILTERED_PLACEHOLDER, FieldFilter, filtered_value};
