//! [`Command`] for changing the number of [`Book`] copies.

use common::operations::{
    By, Commit, Insert, Lock, Select, Transact, Transacted,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{book, reservation, Book, Reservation},
    infra::{database, Database},
    read, Service,
};

use super::Command;

/// [`Command`] for changing the total number of [`Book`] copies.
///
/// Lent copies stay lent, so the available ones move by the same delta.
/// New free copies are offered to the [`Reservation`] holders.
#[derive(Clone, Copy, Debug)]
pub struct UpdateBookCopies {
    /// ID of the [`Book`] to update.
    pub book_id: book::Id,

    /// New total number of copies.
    pub total: u16,
}

impl<Db> Command<UpdateBookCopies> for Service<Db>
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
            Select<By<Vec<Reservation>, read::reservation::list::Filter>>,
            Ok = Vec<Reservation>,
            Err = Traced<database::Error>,
        > + Database<Insert<Book>, Err = Traced<database::Error>>
        + Database<Insert<Reservation>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Book;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: UpdateBookCopies,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateBookCopies { book_id, total } = cmd;

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

        book.copies
            .resize(total)
            .map_err(tracerr::from_and_wrap!(=> E))?;

        let mut queue = reservation::Queue::new(
            tx.execute(Select(By::<Vec<Reservation>, _>::new(
                read::reservation::list::Filter {
                    book_id: Some(book.id),
                    active_only: true,
                    ..read::reservation::list::Filter::default()
                },
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?,
        );
        let promoted = queue.promote(book.copies.available());

        tx.execute(Insert(book.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        for r in queue
            .into_inner()
            .into_iter()
            .filter(|r| promoted.contains(&r.id))
        {
            tx.execute(Insert(r))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
        }

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(book)
    }
}

/// Error of [`UpdateBookCopies`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Book`] with the provided ID does not exist.
    #[display("`Book(id: {_0})` does not exist")]
    BookNotExists(#[error(not(source))] book::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// New total doesn't fit the lent copies.
    #[display("Invalid copies number: {_0}")]
    #[from]
    Inventory(book::InventoryError),
}
