//! [`Command`] for deleting a [`Category`].

use common::operations::{By, Commit, Delete, Select, Transact, Transacted};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{category, Book, Category},
    infra::{database, Database},
    read, Service,
};

use super::Command;

/// [`Command`] for deleting a [`Category`] no [`Book`] refers to.
#[derive(Clone, Copy, Debug)]
pub struct DeleteCategory {
    /// ID of the [`Category`] to delete.
    pub category_id: category::Id,
}

impl<Db> Command<DeleteCategory> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<Category>, category::Id>>,
            Ok = Option<Category>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Book>, read::book::list::Filter>>,
            Ok = Vec<Book>,
            Err = Traced<database::Error>,
        > + Database<
            Delete<By<Category, category::Id>>,
            Err = Traced<database::Error>,
        >
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: DeleteCategory,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let DeleteCategory { category_id } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let category = tx
            .execute(Select(By::<Option<Category>, _>::new(category_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::CategoryNotExists(category_id))
            .map_err(tracerr::wrap!())?;

        let books = tx
            .execute(Select(By::<Vec<Book>, _>::new(read::book::list::Filter {
                category_id: Some(category.id),
                ..read::book::list::Filter::default()
            })))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if !books.is_empty() {
            return Err(tracerr::new!(E::CategoryHasBooks(category.id)));
        }

        tx.execute(Delete(By::<Category, _>::new(category.id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)
    }
}

/// Error of [`DeleteCategory`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Category`] is still referred by some [`Book`]s.
    #[display("`Category(id: {_0})` has books")]
    CategoryHasBooks(#[error(not(source))] category::Id),

    /// [`Category`] with the provided ID does not exist.
    #[display("`Category(id: {_0})` does not exist")]
    CategoryNotExists(#[error(not(source))] category::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),
}
