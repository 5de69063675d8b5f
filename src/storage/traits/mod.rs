//! Storage traits.

mod record_store;
mod unit_of_work;

pub use record_store::RecordStore;
pub use unit_of_work::{UnitOfWork, run_atomically};
