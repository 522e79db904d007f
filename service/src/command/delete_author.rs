//! [`Command`] for deleting a [`Author`].

use common::operations::{By, Commit, Delete, Select, Transact, Transacted};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{author, Author, Book},
    infra::{database, Database},
    read, Service,
};

use super::Command;

/// [`Command`] for deleting a [`Author`] no [`Book`] refers to.
#[derive(Clone, Copy, Debug)]
pub struct DeleteAuthor {
    /// ID of the [`Author`] to delete.
    pub author_id: author::Id,
}

impl<Db> Command<DeleteAuthor> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<Author>, author::Id>>,
            Ok = Option<Author>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Book>, read::book::list::Filter>>,
            Ok = Vec<Book>,
            Err = Traced<database::Error>,
        > + Database<
            Delete<By<Author, author::Id>>,
            Err = Traced<database::Error>,
        >
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: DeleteAuthor) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let DeleteAuthor { author_id } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let author = tx
            .execute(Select(By::<Option<Author>, _>::new(author_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::AuthorNotExists(author_id))
            .map_err(tracerr::wrap!())?;

        let books = tx
            .execute(Select(By::<Vec<Book>, _>::new(read::book::list::Filter {
                author_id: Some(author.id),
                ..read::book::list::Filter::default()
            })))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if !books.is_empty() {
            return Err(tracerr::new!(E::AuthorHasBooks(author.id)));
        }

        tx.execute(Delete(By::<Author, _>::new(author.id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)
    }
}

/// Error of [`DeleteAuthor`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Author`] is still referred by some [`Book`]s.
    #[display("`Author(id: {_0})` has books")]
    AuthorHasBooks(#[error(not(source))] author::Id),

    /// [`Author`] with the provided ID does not exist.
    #[display("`Author(id: {_0})` does not exist")]
    AuthorNotExists(#[error(not(source))] author::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),
}
