//! [`Command`] for checking out a [`Book`] directly to a member.

use std::iter;

use common::operations::{
    By, Commit, Insert, Lock, Select, Transact, Transacted,
};
use tracerr::Traced;

use crate::{
    domain::{book, user, Book, Loan, Reservation, User},
    infra::{database, Database},
    read, Service,
};

use super::{request_loan, Command};

pub use super::request_loan::ExecutionError;

/// [`Command`] for lending a [`Book`] to a member right away, without the
/// member requesting it first.
#[derive(Clone, Copy, Debug)]
pub struct CheckoutLoan {
    /// ID of the member borrowing the [`Book`].
    pub member_id: user::Id,

    /// ID of the [`Book`] to be lent.
    pub book_id: book::Id,
}

impl<Db> Command<CheckoutLoan> for Service<Db>
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
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
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

    async fn execute(&self, cmd: CheckoutLoan) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CheckoutLoan { member_id, book_id } = cmd;
        let policy = &self.config().policy;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let (mut loan, mut book, mut queue) =
            request_loan::open(&tx, member_id, book_id, policy)
                .await
                .map_err(tracerr::wrap!())?;

        _ = loan.approve(policy).map_err(tracerr::from_and_wrap!(=> E))?;
        book.take_copy()
            .map_err(|_| tracerr::new!(E::InventoryUnavailable(book_id)))?;

        if let Some(held) = queue
            .conclude(member_id)
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
