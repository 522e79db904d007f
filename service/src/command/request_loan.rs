//! [`Command`] for requesting a new [`Loan`].

use common::{
    operations::{By, Commit, Insert, Lock, Select, Transact, Transacted},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        book, loan, reservation, user, Book, Loan, Policy, Reservation, User,
    },
    infra::{database, Database},
    read, Service,
};

use super::Command;

/// [`Command`] for requesting a new [`loan::Status::Pending`] [`Loan`] by a
/// member.
#[derive(Clone, Copy, Debug)]
pub struct RequestLoan {
    /// ID of the member requesting the [`Loan`].
    pub member_id: user::Id,

    /// ID of the [`Book`] to be borrowed.
    pub book_id: book::Id,
}

impl<Db> Command<RequestLoan> for Service<Db>
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
        > + Database<Insert<Loan>, Err = Traced<database::Error>>
        + Database<Insert<Reservation>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Loan;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: RequestLoan) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let RequestLoan { member_id, book_id } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let (loan, ..) = open(&tx, member_id, book_id, &self.config().policy)
            .await
            .map_err(tracerr::wrap!())?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(loan)
    }
}

/// Validates and stores a new [`loan::Status::Pending`] [`Loan`] of the
/// `book_id` by the `member_id` inside the provided transaction.
///
/// A promoted holder keeps the [`Reservation`] until the [`Loan`] is
/// approved.
///
/// Returns the created [`Loan`] along with the locked [`Book`] and its
/// [`reservation::Queue`].
pub(crate) async fn open<Tx>(
    tx: &Tx,
    member_id: user::Id,
    book_id: book::Id,
    policy: &Policy,
) -> Result<(Loan, Book, reservation::Queue), Traced<ExecutionError>>
where
    Tx: Database<Lock<By<Book, book::Id>>, Err = Traced<database::Error>>
        + Database<
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
        > + Database<Insert<Loan>, Err = Traced<database::Error>>
        + Database<Insert<Reservation>, Err = Traced<database::Error>>,
{
    use ExecutionError as E;

    // Avoid concurrent changes of the `Book` inventory.
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
            ..read::loan::list::Filter::default()
        })))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))?;

    let unpaid = loan::unpaid_fines_at(&loans, DateTime::now(), policy);
    if member.is_blocked() || policy.is_over_fine_limit(unpaid) {
        return Err(tracerr::new!(E::MemberBlocked(member.id)));
    }

    if loans
        .iter()
        .any(|l| l.book_id == book.id && l.is_outstanding())
    {
        return Err(tracerr::new!(E::DuplicateLoan(book.id)));
    }

    if book.copies.available() == 0 {
        return Err(tracerr::new!(E::InventoryUnavailable(book.id)));
    }

    let (queue, _) = load_queue(tx, &book, policy, DateTime::now())
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))?;
    let holding = queue.held_by(member.id).is_some();
    let free = usize::from(book.copies.available()) > queue.promoted();
    if !holding && !free {
        return Err(tracerr::new!(E::ReservationConflict(book.id)));
    }

    let loan = Loan::request(book.id, member.id, policy);
    tx.execute(Insert(loan.clone()))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))
        .map(drop)?;

    Ok((loan, book, queue))
}

/// Loads the [`reservation::Queue`] of the provided locked [`Book`] inside
/// the provided transaction.
///
/// Cancels the promoted [`Reservation`]s whose window has elapsed at `now`
/// and notifies the next holders about the free copies, storing the changes.
/// Holders having a [`loan::Status::Pending`] [`Loan`] of the [`Book`] keep
/// their [`Reservation`]s.
///
/// Returns the [`reservation::Queue`] along with the number of cancelled
/// [`Reservation`]s.
pub(crate) async fn load_queue<Tx>(
    tx: &Tx,
    book: &Book,
    policy: &Policy,
    now: DateTime,
) -> Result<(reservation::Queue, usize), Traced<database::Error>>
where
    Tx: Database<
            Select<By<Vec<Loan>, read::loan::list::Filter>>,
            Ok = Vec<Loan>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Reservation>, read::reservation::list::Filter>>,
            Ok = Vec<Reservation>,
            Err = Traced<database::Error>,
        > + Database<Insert<Reservation>, Err = Traced<database::Error>>,
{
    let claimed = tx
        .execute(Select(By::<Vec<Loan>, _>::new(read::loan::list::Filter {
            book_id: Some(book.id),
            outstanding: true,
            ..read::loan::list::Filter::default()
        })))
        .await
        .map_err(tracerr::wrap!())?
        .into_iter()
        .filter(|l| l.status_at(now) == loan::Status::Pending)
        .map(|l| l.member_id)
        .collect::<Vec<_>>();

    let mut queue = reservation::Queue::new(
        tx.execute(Select(By::<Vec<Reservation>, _>::new(
            read::reservation::list::Filter {
                book_id: Some(book.id),
                active_only: true,
                ..read::reservation::list::Filter::default()
            },
        )))
        .await
        .map_err(tracerr::wrap!())?,
    );

    let cancelled = queue.expire(now, policy, &claimed);
    let promoted = queue.promote(book.copies.available());
    let expired = cancelled.len();
    if expired > 0 || !promoted.is_empty() {
        for r in cancelled.into_iter().chain(queue.iter().cloned()) {
            tx.execute(Insert(r))
                .await
                .map_err(tracerr::wrap!())
                .map(drop)?;
        }
    }

    Ok((queue, expired))
}

/// Error of [`RequestLoan`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Book`] with the provided ID does not exist.
    #[display("`Book(id: {_0})` does not exist")]
    BookNotExists(#[error(not(source))] book::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// Member has an outstanding [`Loan`] of the [`Book`] already.
    #[display("`Book(id: {_0})` is borrowed by the member already")]
    DuplicateLoan(#[error(not(source))] book::Id),

    /// No copies of the [`Book`] are available.
    #[display("`Book(id: {_0})` has no available copies")]
    InventoryUnavailable(#[error(not(source))] book::Id),

    /// [`Loan`] transition failed.
    #[display("`Loan` transition failed: {_0}")]
    #[from]
    Loan(loan::Error),

    /// Member is blocked or owes too much in fines.
    #[display("`User(id: {_0})` is blocked from borrowing")]
    MemberBlocked(#[error(not(source))] user::Id),

    /// Member with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    MemberNotExists(#[error(not(source))] user::Id),

    /// Available copies of the [`Book`] are held for other members.
    #[display("`Book(id: {_0})` copies are reserved for other members")]
    ReservationConflict(#[error(not(source))] book::Id),

    /// [`Reservation`] transition failed.
    #[display("`Reservation` transition failed: {_0}")]
    #[from]
    Reservation(reservation::Error),
}
