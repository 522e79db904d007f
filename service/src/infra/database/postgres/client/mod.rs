//! Postgres database client definitions.

pub mod non_tx;
pub mod tx;

use std::future::Future;

use tokio::sync::{RwLock, RwLockReadGuard};
use tracerr::Traced;

use crate::infra::database;

pub use self::{non_tx::NonTx, tx::Tx};

/// Returns the [`Connection`] stored in the provided `slot`, establishing it
/// with the provided `connect` [`Future`] on the first use.
///
/// Only one caller establishes the [`Connection`], while the others wait.
///
/// [`Connection`]: super::Connection
async fn lazy_connection<C, F>(
    slot: &RwLock<Option<C>>,
    connect: F,
) -> Result<RwLockReadGuard<'_, C>, Traced<database::Error>>
where
    F: Future<Output = Result<C, Traced<database::Error>>>,
{
    let existing = slot.read().await;
    let guard = if existing.is_some() {
        existing
    } else {
        drop(existing);

        let mut fresh = slot.write().await;
        if fresh.is_none() {
            *fresh = Some(connect.await.map_err(tracerr::wrap!())?);
        }
        fresh.downgrade()
    };

    Ok(RwLockReadGuard::map(guard, |conn| {
        conn.as_ref()
            .expect("connection cannot be dropped while guard is alive")
    }))
}
