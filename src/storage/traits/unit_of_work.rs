//! All-or-nothing scopes over a record store.

use crate::Result;

/// A store that can group writes into one atomic scope.
///
/// Scopes do not nest. Callers normally go through [`run_atomically`] rather
/// than driving the three methods by hand.
pub trait UnitOfWork: Send + Sync {
    /// Opens a scope.
    ///
    /// # Errors
    ///
    /// Returns an error if a scope is already open or the store refuses.
    fn begin(&self) -> Result<()>;

    /// Makes every write since [`UnitOfWork::begin`] durable.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails.
    fn commit(&self) -> Result<()>;

    /// Discards every write since [`UnitOfWork::begin`].
    ///
    /// # Errors
    ///
    /// Returns an error if the rollback fails.
    fn rollback(&self) -> Result<()>;
}

/// Runs `work` inside a scope.
///
/// Commits when `work` succeeds. When it fails, every write it made is
/// discarded and its error is returned unchanged.
///
/// # Errors
///
/// Returns the error from `work`, or a store error from opening or
/// committing the scope.
pub fn run_atomically<U, T, F>(unit: &U, work: F) -> Result<T>
where
    U: UnitOfWork + ?Sized,
    F: FnOnce() -> Result<T>,
{
    unit.begin()?;

    match work() {
        Ok(value) => {
            if let Err(e) = unit.commit() {
                discard(unit);
                return Err(e);
            }
            Ok(value)
        },
        Err(e) => {
            discard(unit);
            Err(e)
        },
    }
}

fn discard<U: UnitOfWork + ?Sized>(unit: &U) {
    if let Err(e) = unit.rollback() {
        tracing::error!(error = %e, "Failed to roll back unit of work");
    }
}
