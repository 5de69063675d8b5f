//! `SQLite` record store.
//!
//! ## Module Structure
//!
//! - `connection`: connection settings and poison-tolerant locking
//! - `schema`: table reflection and field-level validation
//! - `sql`: identifier quoting and value conversion
//! - `store`: [`SqliteRecordStore`], implementing
//!   [`RecordStore`](crate::storage::RecordStore) and
//!   [`UnitOfWork`](crate::storage::UnitOfWork)
//! - `relation`: [`SqliteRelation`], the export-side batch source

mod connection;
mod metrics;
mod relation;
mod schema;
mod sql;
mod store;

pub use connection::{BUSY_TIMEOUT, acquire_lock, configure_connection};
pub use relation::SqliteRelation;
pub use schema::{BLANK, Column, ModelSchema, TAKEN};
pub use sql::{from_sql_value, quote_ident, to_sql_value};
pub use store::SqliteRecordStore;
