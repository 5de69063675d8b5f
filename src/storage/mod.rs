//! Storage layer.
//!
//! The import and export services talk to storage only through the traits in
//! [`traits`]: a [`RecordStore`] builds, validates and saves typed records, and
//! a [`UnitOfWork`] groups writes into an all-or-nothing scope. [`sqlite`]
//! provides an implementation over existing `SQLite` tables.

// Dropping the connection guard a statement early buys nothing here.
#![allow(clippy::significant_drop_tightening)]

pub mod sqlite;
pub mod traits;

pub use sqlite::{SqliteRecordStore, SqliteRelation};
pub use traits::{RecordStore, UnitOfWork, run_atomically};
