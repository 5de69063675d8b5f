//! Batch source over a registered model's table.

use super::schema::ModelSchema;
use super::store::SqliteRecordStore;
use crate::io::BatchSource;
use crate::models::Record;
use crate::{Error, Result};
use std::sync::Arc;

/// Every stored record of one model, read in `rowid` order, or in primary
/// key order for a `WITHOUT ROWID` table.
///
/// Pages are fetched with keyset pagination, so each batch is a fresh query
/// and the connection is free while the caller handles a batch.
pub struct SqliteRelation<'a> {
    store: &'a SqliteRecordStore,
    schema: Arc<ModelSchema>,
}

impl<'a> SqliteRelation<'a> {
    pub(super) const fn new(store: &'a SqliteRecordStore, schema: Arc<ModelSchema>) -> Self {
        Self { store, schema }
    }
}

impl BatchSource for SqliteRelation<'_> {
    fn model_name(&self) -> &str {
        &self.schema.model
    }

    fn count(&self) -> Result<usize> {
        self.store.count_rows(&self.schema)
    }

    fn for_each_batch(
        &self,
        size: usize,
        handle: &mut dyn FnMut(&[Record]) -> Result<()>,
    ) -> Result<()> {
        if size == 0 {
            return Err(Error::InvalidInput("batch size must be positive".to_string()));
        }

        let mut after = None;
        loop {
            let (batch, last) = self.store.fetch_page(&self.schema, after.as_ref(), size)?;
            let Some(last) = last else {
                return Ok(());
            };
            handle(&batch)?;
            if batch.len() < size {
                return Ok(());
            }
            after = Some(last);
        }
    }
}
