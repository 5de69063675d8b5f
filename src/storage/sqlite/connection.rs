//! Connection handling for the `SQLite` store.

use crate::{Error, Result};
use rusqlite::Connection;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// How long a writer waits on a locked database before giving up.
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Locks `mutex`, recovering the guard if a previous holder panicked.
///
/// A panic mid-statement leaves the connection itself usable, so the poison
/// flag is logged and cleared rather than propagated.
pub fn acquire_lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        tracing::warn!("SQLite connection mutex was poisoned, recovering");
        metrics::counter!("store_mutex_poison_recovery_total").increment(1);
        poisoned.into_inner()
    })
}

/// Applies connection settings shared by every store handle.
///
/// File databases switch to WAL journaling with `NORMAL` sync. Every
/// connection waits up to [`BUSY_TIMEOUT`] for competing writers.
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] if the busy timeout cannot be set.
pub fn configure_connection(conn: &Connection, in_memory: bool) -> Result<()> {
    if !in_memory {
        // journal_mode answers with a row, so failures surface on first write instead
        let _ = conn.pragma_update(None, "journal_mode", "WAL");
        let _ = conn.pragma_update(None, "synchronous", "NORMAL");
    }
    conn.busy_timeout(BUSY_TIMEOUT)
        .map_err(|e| Error::operation("configure_connection", e))
}
