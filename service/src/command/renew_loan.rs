//! [`Command`] for renewing a [`Loan`].

use common::operations::{
    By, Commit, Insert, Lock, Select, Transact, Transacted,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{book, loan, Book, Loan, Reservation},
    infra::{database, Database},
    read, Service,
};

use super::Command;

/// [`Command`] for renewing a [`loan::Status::Active`] [`Loan`].
#[derive(Clone, Copy, Debug)]
pub struct RenewLoan {
    /// ID of the [`Loan`] to be renewed.
    pub loan_id: loan::Id,
}

impl<Db> Command<RenewLoan> for Service<Db>
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
            Select<By<Option<Loan>, loan::Id>>,
            Ok = Option<Loan>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Reservation>, read::reservation::list::Filter>>,
            Ok = Vec<Reservation>,
            Err = Traced<database::Error>,
        > + Database<Insert<Loan>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Loan;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: RenewLoan) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let RenewLoan { loan_id } = cmd;

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

        // Avoid concurrent `Reservation`s of the `Book`.
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

        _ = loan
            .renew(&self.config().policy)
            .map_err(tracerr::from_and_wrap!(=> E))?;

        let reserved = tx
            .execute(Select(By::<Vec<Reservation>, _>::new(
                read::reservation::list::Filter {
                    book_id: Some(loan.book_id),
                    active_only: true,
                    ..read::reservation::list::Filter::default()
                },
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .iter()
            .any(|r| r.member_id != loan.member_id);
        if reserved {
            return Err(tracerr::new!(E::ReservationConflict(loan.book_id)));
        }

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

/// Error of [`RenewLoan`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Loan`] transition failed.
    #[display("`Loan` transition failed: {_0}")]
    #[from]
    Loan(loan::Error),

    /// [`Loan`] with the provided ID does not exist.
    #[display("`Loan(id: {_0})` does not exist")]
    LoanNotExists(#[error(not(source))] loan::Id),

    /// Another member waits for the [`Book`] in the [`Reservation`] queue.
    #[display("`Book(id: {_0})` is reserved by another member")]
    ReservationConflict(#[error(not(source))] book::Id),
}
