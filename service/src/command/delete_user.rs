//! [`Command`] for deleting a [`User`].

use common::{
    operations::{By, Commit, Insert, Lock, Select, Transact, Transacted},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{book, reservation, user, Book, Loan, Reservation, User},
    infra::{database, Database},
    read, Service,
};

use super::Command;

/// [`Command`] for deleting a [`User`].
///
/// Active [`Reservation`]s of the [`User`] are cancelled, and the deleted
/// [`User`] is kept for the history of its [`Loan`]s.
#[derive(Clone, Copy, Debug)]
pub struct DeleteUser {
    /// ID of the [`User`] to delete.
    pub user_id: user::Id,
}

impl<Db> Command<DeleteUser> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Vec<Reservation>, read::reservation::list::Filter>>,
            Ok = Vec<Reservation>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Lock<By<Book, book::Id>>,
            Err = Traced<database::Error>,
        > + Database<Lock<By<User, user::Id>>, Err = Traced<database::Error>>
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
        > + Database<Insert<Reservation>, Err = Traced<database::Error>>
        + Database<Insert<User>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: DeleteUser) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let DeleteUser { user_id } = cmd;

        let books = self
            .database()
            .execute(Select(By::<Vec<Reservation>, _>::new(
                read::reservation::list::Filter {
                    member_id: Some(user_id),
                    active_only: true,
                    ..read::reservation::list::Filter::default()
                },
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .into_iter()
            .map(|r| r.book_id)
            .collect::<Vec<_>>();

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // `Book`s are locked before the `User`.
        for id in &books {
            tx.execute(Lock(By::new(*id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
        }
        tx.execute(Lock(By::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut user = tx
            .execute(Select(By::<Option<User>, _>::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(user_id))
            .map_err(tracerr::wrap!())?;

        let outstanding = tx
            .execute(Select(By::<Vec<Loan>, _>::new(
                read::loan::list::Filter {
                    member_id: Some(user.id),
                    outstanding: true,
                    book_id: None,
                },
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if !outstanding.is_empty() {
            return Err(tracerr::new!(E::UserHasOutstandingLoans(user.id)));
        }

        for book_id in books {
            let available = tx
                .execute(Select(By::<Option<Book>, _>::new(book_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .map_or(0, |b| b.copies.available());
            let mut queue = reservation::Queue::new(
                tx.execute(Select(By::<Vec<Reservation>, _>::new(
                    read::reservation::list::Filter {
                        book_id: Some(book_id),
                        active_only: true,
                        ..read::reservation::list::Filter::default()
                    },
                )))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?,
            );
            let Some(mut cancelled) = queue
                .of_member(user.id)
                .map(|r| r.id)
                .and_then(|id| queue.remove(id))
            else {
                continue;
            };
            cancelled
                .cancel()
                .map_err(tracerr::from_and_wrap!(=> E))?;
            _ = queue.promote(available);

            for r in std::iter::once(cancelled).chain(queue.into_inner()) {
                tx.execute(Insert(r))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))
                    .map(drop)?;
            }
        }

        user.deleted_at = Some(DateTime::now().coerce());
        tx.execute(Insert(user))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)
    }
}

/// Error of [`DeleteUser`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Reservation`] transition failed.
    #[display("`Reservation` transition failed: {_0}")]
    #[from]
    Reservation(reservation::Error),

    /// [`User`] has not returned some books yet.
    #[display("`User(id: {_0})` has outstanding loans")]
    UserHasOutstandingLoans(#[error(not(source))] user::Id),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),
}
