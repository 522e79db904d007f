//! [`Tx`] client definitions.

use std::sync::Arc;

use tokio::sync::{RwLock, RwLockReadGuard};
use tokio_postgres::{types::ToSql, Row, ToStatement};
use tracerr::Traced;
use tracing as log;

use crate::infra::database::{
    self,
    postgres::{self, connection, Connection},
};

use super::NonTx;

/// Postgres database client running every statement inside a single
/// transaction, started on the first statement.
#[derive(Clone, Debug)]
pub struct Tx {
    /// [`connection::Pool`] to borrow a [`connection::NonTx`] from, if the
    /// [`NonTx`] client has none to hand over.
    pool: connection::Pool,

    /// State shared between the clones of this [`Tx`] client.
    inner: Arc<Inner>,
}

/// State of a [`Tx`] client.
#[derive(Debug)]
struct Inner {
    /// [`NonTx`] client this [`Tx`] was started from, until its
    /// [`connection::NonTx`] is handed over.
    origin: RwLock<Option<NonTx>>,

    /// [`connection::Tx`] started on the first statement.
    tx: RwLock<Option<connection::Tx>>,
}

impl Tx {
    /// Creates a new [`Tx`] client, reusing the [`connection::NonTx`] of the
    /// provided [`NonTx`] client when the transaction starts.
    #[must_use]
    pub fn from_non_tx(client: NonTx) -> Self {
        Self {
            pool: client.pool.clone(),
            inner: Arc::new(Inner {
                origin: RwLock::new(Some(client)),
                tx: RwLock::new(None),
            }),
        }
    }

    /// Returns the [`connection::Tx`] of this client, starting the
    /// transaction if it hasn't been started yet.
    async fn connection(
        &self,
    ) -> Result<RwLockReadGuard<'_, connection::Tx>, Traced<database::Error>>
    {
        super::lazy_connection(&self.inner.tx, self.start()).await
    }

    /// Starts a new [`connection::Tx`] over the [`connection::NonTx`] handed
    /// over by the origin [`NonTx`] client, or borrowed from the
    /// [`connection::Pool`] otherwise.
    async fn start(&self) -> Result<connection::Tx, Traced<database::Error>> {
        let origin = self.inner.origin.write().await.take();
        let handed = match origin {
            Some(client) => client.take_connection().await,
            None => None,
        };
        let conn = match handed {
            Some(conn) => conn,
            None => self
                .pool
                .get()
                .await
                .map_err(tracerr::from_and_wrap!(=> postgres::Error))
                .map_err(tracerr::map_from)?,
        };
        connection::Tx::from_non_tx(conn)
            .await
            .map_err(tracerr::wrap!())
    }

    /// Commits the transaction of this [`Tx`] client.
    ///
    /// The next statement starts a new transaction.
    ///
    /// # Errors
    ///
    /// If the database fails to commit the transaction.
    pub async fn commit(&self) -> Result<(), Traced<database::Error>> {
        let Some(tx) = self.inner.tx.write().await.take() else {
            log::trace!("no statements executed, nothing to commit");
            return Ok(());
        };
        tx.commit().await.map_err(tracerr::wrap!())
    }
}

impl Connection for Tx {
    async fn query<T>(
        &self,
        stmt: &T,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<Row>, Traced<database::Error>>
    where
        T: ToStatement + ?Sized,
    {
        let tx = self.connection().await.map_err(tracerr::wrap!())?;
        tx.query(stmt, params).await.map_err(tracerr::wrap!())
    }

    async fn query_opt<T>(
        &self,
        stmt: &T,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Option<Row>, Traced<database::Error>>
    where
        T: ToStatement + ?Sized,
    {
        let tx = self.connection().await.map_err(tracerr::wrap!())?;
        tx.query_opt(stmt, params).await.map_err(tracerr::wrap!())
    }

    async fn exec<T>(
        &self,
        stmt: &T,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<u64, Traced<database::Error>>
    where
        T: ToStatement + ?Sized,
    {
        let tx = self.connection().await.map_err(tracerr::wrap!())?;
        tx.exec(stmt, params).await.map_err(tracerr::wrap!())
    }
}
