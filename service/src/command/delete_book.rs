//! [`Command`] for removing a [`Book`] from the catalog.

use common::{
    operations::{By, Commit, Insert, Lock, Select, Transact, Transacted},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{book, reservation, Book, Loan, Reservation},
    infra::{database, Database},
    read, Service,
};

use super::Command;

/// [`Command`] for removing a [`Book`] having no outstanding [`Loan`]s from
/// the catalog.
///
/// All the active [`Reservation`]s of the [`Book`] are cancelled.
#[derive(Clone, Copy, Debug)]
pub struct DeleteBook {
    /// ID of the [`Book`] to delete.
    pub book_id: book::Id,
}

impl<Db> Command<DeleteBook> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Book, book::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Book>, book::Id>>,
            Ok = Option<Book>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Loan>, read::loan::list::Filter>>,
            Ok = Vec<Loan>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Reservation>, read::reservation::list::Filter>>,
            Ok = Vec<Reservation>,
            Err = Traced<database::Error>,
        > + Database<Insert<Book>, Err = Traced<database::Error>>
        + Database<Insert<Reservation>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: DeleteBook) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let DeleteBook { book_id } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Lock(By::new(book_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut book = tx
            .execute(Select(By::<Option<Book>, _>::new(book_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::BookNotExists(book_id))
            .map_err(tracerr::wrap!())?;

        let outstanding = tx
            .execute(Select(By::<Vec<Loan>, _>::new(read::loan::list::Filter {
                book_id: Some(book.id),
                outstanding: true,
                member_id: None,
            })))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if !outstanding.is_empty() {
            return Err(tracerr::new!(E::BookHasOutstandingLoans(book.id)));
        }

        let queue = tx
            .execute(Select(By::<Vec<Reservation>, _>::new(
                read::reservation::list::Filter {
                    book_id: Some(book.id),
                    active_only: true,
                    ..read::reservation::list::Filter::default()
                },
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        for mut r in queue {
            r.cancel().map_err(tracerr::from_and_wrap!(=> E))?;
            tx.execute(Insert(r))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
        }

        book.deleted_at = Some(DateTime::now().coerce());
        tx.execute(Insert(book))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)
    }
}

/// Error of [`DeleteBook`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Book`] is not returned by some members yet.
    #[display("`Book(id: {_0})` has outstanding loans")]
    BookHasOutstandingLoans(#[error(not(source))] book::Id),

    /// [`Book`] with the provided ID does not exist.
    #[display("`Book(id: {_0})` does not exist")]
    BookNotExists(#[error(not(source))] book::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Reservation`] transition failed.
    #[display("`Reservation` transition failed: {_0}")]
    #[from]
    Reservation(reservation::Error),
}
