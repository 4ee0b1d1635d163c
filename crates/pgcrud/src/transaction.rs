//! Explicit transactions.
//!
//! Executors never open transactions on their own. Statements issued by one
//! call (a parent insert and its children, a replace-sync, a cascade) are
//! only atomic when the caller hands in a transaction:
//!
//! ```ignore
//! let mut client = pool.get().await?;
//! let trip = pgcrud::transaction!(&mut client, tx, {
//!     let trip = pgcrud::insert_one(&tx, &insert).await?;
//!     pgcrud::bulk_update(&tx, &counters, &rows).await?;
//!     Ok(trip)
//! })?;
//! ```

/// Runs the given block inside a database transaction.
///
/// - Begins a transaction via `$client.transaction().await`.
/// - Commits on `Ok(_)`.
/// - Rolls back on `Err(_)`; if the rollback itself fails both errors are
///   reported as [`CrudError::Transaction`](crate::CrudError::Transaction).
///
/// The block must evaluate to `pgcrud::CrudResult<T>`.
#[macro_export]
macro_rules! transaction {
    ($client:expr, $tx:ident, $body:block) => {{
        let $tx = ($client)
            .transaction()
            .await
            .map_err($crate::CrudError::from)?;

        let __pgcrud_tx_body_result: $crate::CrudResult<_> = async { $body }.await;
        match __pgcrud_tx_body_result {
            Ok(value) => {
                $tx.commit().await.map_err($crate::CrudError::from)?;
                $crate::CrudResult::Ok(value)
            }
            Err(error) => match $tx.rollback().await {
                Ok(()) => Err(error),
                Err(rollback_err) => Err($crate::CrudError::Transaction(format!(
                    "{error} (rollback failed: {rollback_err})"
                ))),
            },
        }
    }};
}
