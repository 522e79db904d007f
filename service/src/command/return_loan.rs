//! [`Command`] for returning a [`Loan`]ed [`Book`].

use common::operations::{
    By, Commit, Insert, Lock, Select, Transact, Transacted,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{book, loan, reservation, Book, Loan, Reservation},
    infra::{database, Database},
    read, Service,
};

use super::Command;

/// [`Command`] for returning the [`Book`] of a [`loan::Status::Active`] or
/// [`loan::Status::Overdue`] [`Loan`].
///
/// Freezes the [`loan::Fine`] and notifies the next [`Reservation`] holders
/// about the returned copy.
#[derive(Clone, Copy, Debug)]
pub struct ReturnLoan {
    /// ID of the [`Loan`] to be closed.
    pub loan_id: loan::Id,
}

impl<Db> Command<ReturnLoan> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Loan>, loan::Id>>,
            Ok = Option<Loan>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Lock<By<Book, book::Id>>,
            Err = Traced<database::Error>,
        > + Database<Lock<By<Loan, loan::Id>>, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Book>, book::Id>>,
            Ok = Option<Book>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Loan>, loan::Id>>,
            Ok = Option<Loan>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Reservation>, read::reservation::list::Filter>>,
            Ok = Vec<Reservation>,
            Err = Traced<database::Error>,
        > + Database<Insert<Book>, Err = Traced<database::Error>>
        + Database<Insert<Loan>, Err = Traced<database::Error>>
        + Database<Insert<Reservation>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Loan;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: ReturnLoan) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let ReturnLoan { loan_id } = cmd;

        let loan = self
            .database()
            .execute(Select(By::<Option<Loan>, _>::new(loan_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::LoanNotExists(loan_id))
            .map_err(tracerr::wrap!())?;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent changes of the `Book` inventory.
        tx.execute(Lock(By::new(loan.book_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Lock(By::new(loan.id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut loan = tx
            .execute(Select(By::<Option<Loan>, _>::new(loan_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::LoanNotExists(loan_id))
            .map_err(tracerr::wrap!())?;
        let mut book = tx
            .execute(Select(By::<Option<Book>, _>::new(loan.book_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::BookNotExists(loan.book_id))
            .map_err(tracerr::wrap!())?;

        _ = loan
            .close(&self.config().policy)
            .map_err(tracerr::from_and_wrap!(=> E))?;
        book.return_copy().map_err(tracerr::from_and_wrap!(=> E))?;

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

        tx.execute(Insert(book))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Insert(loan.clone()))
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

        Ok(loan)
    }
}

/// Error of [`ReturnLoan`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Book`] of the [`Loan`] does not exist anymore.
    #[display("`Book(id: {_0})` does not exist")]
    BookNotExists(#[error(not(source))] book::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Book`] copies counter is broken.
    #[display("`Book` inventory is inconsistent: {_0}")]
    #[from]
    Inventory(book::InventoryError),

    /// [`Loan`] transition failed.
    #[display("`Loan` transition failed: {_0}")]
    #[from]
    Loan(loan::Error),

    /// [`Loan`] with the provided ID does not exist.
    #[display("`Loan(id: {_0})` does not exist")]
    LoanNotExists(#[error(not(source))] loan::Id),
}
