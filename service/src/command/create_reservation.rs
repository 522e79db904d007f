//! [`Command`] for creating a new [`Reservation`].

use common::{
    operations::{By, Commit, Insert, Lock, Select, Transact, Transacted},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        book, loan, reservation, user, Book, Loan, Reservation, User,
    },
    infra::{database, Database},
    read, Service,
};

use super::Command;

/// [`Command`] for putting a member into the [`reservation::Queue`] of a
/// [`Book`] having no free copies.
#[derive(Clone, Copy, Debug)]
pub struct CreateReservation {
    /// ID of the member reserving the [`Book`].
    pub member_id: user::Id,

    /// ID of the [`Book`] to be reserved.
    pub book_id: book::Id,
}

impl<Db> Command<CreateReservation> for Service<Db>
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
        > + Database<Insert<Reservation>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Reservation;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreateReservation,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateReservation { member_id, book_id } = cmd;
        let policy = &self.config().policy;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent changes of the `Book` queue.
        tx.execute(Lock(By::new(book_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let book = tx
            .execute(Select(By::<Option<Book>, _>::new(book_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::BookNotExists(book_id))
            .map_err(tracerr::wrap!())?;

        let member = tx
            .execute(Select(By::<Option<User>, _>::new(member_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::MemberNotExists(member_id))
            .map_err(tracerr::wrap!())?;

        let loans = tx
            .execute(Select(By::<Vec<Loan>, _>::new(read::loan::list::Filter {
                member_id: Some(member.id),
                outstanding: false,
                book_id: None,
            })))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        let now = DateTime::now();
        let blocked = member.is_blocked()
            || policy.is_over_fine_limit(loan::unpaid_fines_at(
                &loans, now, policy,
            ))
            || loans
                .iter()
                .any(|l| l.status_at(now) == loan::Status::Overdue);
        if blocked {
            return Err(tracerr::new!(E::MemberBlocked(member.id)));
        }

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
        if queue.of_member(member.id).is_some() {
            return Err(tracerr::new!(E::DuplicateReservation(book.id)));
        }
        if usize::from(book.copies.available()) > queue.promoted() {
            return Err(tracerr::new!(E::BookAvailable(book.id)));
        }

        let reservation = queue
            .enqueue(Reservation::new(book.id, member.id))
            .clone();
        tx.execute(Insert(reservation.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(reservation)
    }
}

/// Error of [`CreateReservation`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Book`] has free copies, so it may be borrowed right away.
    #[display("`Book(id: {_0})` has available copies")]
    BookAvailable(#[error(not(source))] book::Id),

    /// [`Book`] with the provided ID does not exist.
    #[display("`Book(id: {_0})` does not exist")]
    BookNotExists(#[error(not(source))] book::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// Member has an active [`Reservation`] of the [`Book`] already.
    #[display("`Book(id: {_0})` is reserved by the member already")]
    DuplicateReservation(#[error(not(source))] book::Id),

    /// Member is blocked, owes too much in fines or has an overdue [`Loan`].
    #[display("`User(id: {_0})` is blocked from reserving")]
    MemberBlocked(#[error(not(source))] user::Id),

    /// Member with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    MemberNotExists(#[error(not(source))] user::Id),
}
