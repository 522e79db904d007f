//! [`Command`] for approving a [`Loan`].

use std::iter;

use common::{
    operations::{By, Commit, Insert, Lock, Select, Transact, Transacted},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{book, loan, reservation, Book, Loan, Reservation},
    infra::{database, Database},
    read, Service,
};

use super::{request_loan, Command};

/// [`Command`] for approving a [`loan::Status::Pending`] [`Loan`], lending
/// the [`Book`] copy to the member.
///
/// Copies held by promoted [`Reservation`]s of other members are never lent.
/// The member's own promoted [`Reservation`] is concluded.
#[derive(Clone, Copy, Debug)]
pub struct ApproveLoan {
    /// ID of the [`Loan`] to be approved.
    pub loan_id: loan::Id,
}

impl<Db> Command<ApproveLoan> for Service<Db>
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
            Select<By<Vec<Loan>, read::loan::list::Filter>>,
            Ok = Vec<Loan>,
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

    async fn execute(&self, cmd: ApproveLoan) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let ApproveLoan { loan_id } = cmd;
        let policy = &self.config().policy;

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

        _ = loan.approve(policy).map_err(tracerr::from_and_wrap!(=> E))?;

        let (mut queue, _) =
            request_loan::load_queue(&tx, &book, policy, DateTime::now())
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
        let available = book.copies.available();
        if available == 0 {
            return Err(tracerr::new!(E::InventoryUnavailable(book.id)));
        }
        if usize::from(available) <= queue.promoted_except(loan.member_id) {
            return Err(tracerr::new!(E::ReservationConflict(book.id)));
        }
        book.take_copy().map_err(|_| {
            tracerr::new!(E::InventoryUnavailable(loan.book_id))
        })?;

        if let Some(held) = queue
            .conclude(loan.member_id)
            .map_err(tracerr::from_and_wrap!(=> E))?
        {
            for r in iter::once(held).chain(queue.into_inner()) {
                tx.execute(Insert(r))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))
                    .map(drop)?;
            }
        }

        tx.execute(Insert(book))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Insert(loan.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(loan)
    }
}

/// Error of [`ApproveLoan`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Book`] of the [`Loan`] does not exist anymore.
    #[display("`Book(id: {_0})` does not exist")]
    BookNotExists(#[error(not(source))] book::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// No copies of the [`Book`] are available.
    #[display("`Book(id: {_0})` has no available copies")]
    InventoryUnavailable(#[error(not(source))] book::Id),

    /// [`Loan`] transition failed.
    #[display("`Loan` transition failed: {_0}")]
    #[from]
    Loan(loan::Error),

    /// [`Loan`] with the provided ID does not exist.
    #[display("`Loan(id: {_0})` does not exist")]
    LoanNotExists(#[error(not(source))] loan::Id),

    /// Available copies of the [`Book`] are held for other members.
    #[display("`Book(id: {_0})` copies are reserved for other members")]
    ReservationConflict(#[error(not(source))] book::Id),

    /// [`Reservation`] transition failed.
    #[display("`Reservation` transition failed: {_0}")]
    #[from]
    Reservation(reservation::Error),
}
