//! [`ExpireReservations`] [`Task`].

use std::{collections::BTreeSet, convert::Infallible, error::Error, time};

use common::{
    operations::{
        By, Commit, Insert, Lock, Perform, Select, Start, Transact, Transacted,
    },
    DateTime,
};
use smart_default::SmartDefault;
use tokio::time::interval;
use tracerr::Traced;
use tracing as log;

use crate::{
    command,
    domain::{book, Book, Loan, Reservation},
    infra::{database, Database},
    read, Service,
};

use super::Task;

/// Configuration for [`ExpireReservations`] [`Task`].
#[derive(Clone, Copy, Debug, SmartDefault)]
pub struct Config {
    /// Interval between checks of promoted [`Reservation`]s.
    ///
    /// Every 15 minutes by default.
    #[default(time::Duration::from_secs(15 * 60))]
    pub interval: time::Duration,
}

/// [`Task`] cancelling promoted [`Reservation`]s whose holders didn't request
/// the [`Book`] in time, and notifying the next holders.
#[derive(Clone, Copy, Debug)]
pub struct ExpireReservations<S> {
    /// [`Config`] of this [`Task`].
    config: Config,

    /// [`Service`] instance.
    service: S,
}

impl<Db> Task<Start<By<ExpireReservations<Self>, Config>>> for Service<Db>
where
    ExpireReservations<Service<Db>>:
        Task<Perform<()>, Ok = usize, Err: Error> + Send + Sync + 'static,
    Self: Clone,
{
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Start(by): Start<By<ExpireReservations<Self>, Config>>,
    ) -> Result<Self::Ok, Self::Err> {
        let config = by.into_inner();
        let task = ExpireReservations {
            config,
            service: self.clone(),
        };

        let mut interval = interval(task.config.interval);
        loop {
            let _ = interval.tick().await;
            match task.execute(Perform(())).await {
                Ok(0) => {}
                Ok(n) => log::info!("expired {n} reservations"),
                Err(e) => {
                    log::error!("`task::ExpireReservations` failed: {e}");
                }
            }
        }
    }
}

impl<Db> Task<Perform<()>> for ExpireReservations<Service<Db>>
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
        > + Database<Insert<Reservation>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = usize;
    type Err = ExecutionError;

    async fn execute(&self, _: Perform<()>) -> Result<Self::Ok, Self::Err> {
        let policy = &self.service.config().policy;
        let now = DateTime::now();

        let books = self
            .service
            .database()
            .execute(Select(By::<Vec<Reservation>, _>::new(
                read::reservation::list::Filter {
                    active_only: true,
                    ..read::reservation::list::Filter::default()
                },
            )))
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .filter(|r| r.is_expired_at(now, policy))
            .map(|r| r.book_id)
            .collect::<BTreeSet<_>>();

        let mut expired = 0;
        for book_id in books {
            let tx = self
                .service
                .database()
                .execute(Transact)
                .await
                .map_err(tracerr::wrap!())?;

            tx.execute(Lock(By::new(book_id)))
                .await
                .map_err(tracerr::wrap!())
                .map(drop)?;
            let Some(book) = tx
                .execute(Select(By::<Option<Book>, _>::new(book_id)))
                .await
                .map_err(tracerr::wrap!())?
            else {
                continue;
            };

            let (_, cancelled) =
                command::request_loan::load_queue(&tx, &book, policy, now)
                    .await
                    .map_err(tracerr::wrap!())?;
            expired += cancelled;

            tx.execute(Commit)
                .await
                .map_err(tracerr::wrap!())
                .map(drop)?;
        }

        Ok(expired)
    }
}

/// Error of [`ExpireReservations`] execution.
pub type ExecutionError = Traced<database::Error>;

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::{
        operations::{By, Insert, Perform, Select},
        DateTime,
    };

    use crate::{
        command::spec::{book, member},
        domain::{reservation, Book, Loan, Policy, Reservation},
        infra::{Database as _, Memory},
        task::Task as _,
        Service,
    };

    use super::{Config, ExpireReservations};

    /// Stores a line of [`Reservation`]s of the `book` by the `n` new
    /// members, the head being notified twice the window ago.
    async fn lapsed_queue(
        svc: &Service<Memory>,
        book: &Book,
        n: i32,
    ) -> Vec<Reservation> {
        let policy = &svc.config().policy;
        let start = DateTime::now() - policy.reservation_expiry * 3;
        let mut line = Vec::new();
        for i in 1..=n {
            let m = member(i);
            svc.database().execute(Insert(m.clone())).await.unwrap();
            let mut r = Reservation::new(book.id, m.id);
            r.created_at =
                (start + Duration::from_secs(u64::from(i.unsigned_abs())))
                    .coerce();
            r.position = u16::try_from(i).ok();
            if i == 1 {
                r.notified_at = Some(
                    (DateTime::now() - policy.reservation_expiry * 2).coerce(),
                );
            }
            svc.database().execute(Insert(r.clone())).await.unwrap();
            line.push(r);
        }
        line
    }

    async fn stored(svc: &Service<Memory>, id: reservation::Id) -> Reservation {
        svc.database()
            .execute(Select(By::<Option<Reservation>, _>::new(id)))
            .await
            .unwrap()
            .unwrap()
    }

    fn task(svc: &Service<Memory>) -> ExpireReservations<Service<Memory>> {
        ExpireReservations {
            config: Config {
                interval: Duration::from_secs(60),
            },
            service: svc.clone(),
        }
    }

    #[tokio::test]
    async fn cancels_lapsed_holder_and_promotes_next() {
        let svc = Service::for_tests(Memory::new());
        let book = book(1);
        svc.database().execute(Insert(book.clone())).await.unwrap();
        let line = lapsed_queue(&svc, &book, 3).await;

        let task = task(&svc);
        assert_eq!(task.execute(Perform(())).await.unwrap(), 1);
        assert_eq!(task.execute(Perform(())).await.unwrap(), 0);

        let head = stored(&svc, line[0].id).await;
        assert_eq!(head.status, reservation::Status::Cancelled);
        assert_eq!(head.position, None);
        assert!(head.closed_at.is_some());

        let next = stored(&svc, line[1].id).await;
        assert_eq!(next.position, Some(1));
        assert!(next.is_promoted());

        let last = stored(&svc, line[2].id).await;
        assert_eq!(last.position, Some(2));
        assert!(!last.is_promoted());
    }

    #[tokio::test]
    async fn keeps_holder_who_requested_in_time() {
        let svc = Service::for_tests(Memory::new());
        let book = book(1);
        svc.database().execute(Insert(book.clone())).await.unwrap();
        let line = lapsed_queue(&svc, &book, 2).await;
        let pending =
            Loan::request(book.id, line[0].member_id, &Policy::default());
        svc.database().execute(Insert(pending)).await.unwrap();

        assert_eq!(task(&svc).execute(Perform(())).await.unwrap(), 0);

        let head = stored(&svc, line[0].id).await;
        assert!(head.is_promoted());
        assert_eq!(head.position, Some(1));
        assert!(!stored(&svc, line[1].id).await.is_promoted());
    }
}
