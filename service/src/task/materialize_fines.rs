//! [`MaterializeFines`] [`Task`].

use std::{convert::Infallible, error::Error, time};

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
    domain::{loan, Loan},
    infra::{database, Database},
    read, Service,
};

use super::Task;

/// Configuration for [`MaterializeFines`] [`Task`].
#[derive(Clone, Copy, Debug, SmartDefault)]
pub struct Config {
    /// Interval between accrued [`loan::Fine`]s being stored.
    ///
    /// Every 15 minutes by default.
    #[default(time::Duration::from_secs(15 * 60))]
    pub interval: time::Duration,
}

/// [`Task`] storing the accrued [`loan::Fine`]s of overdue [`Loan`]s, so
/// they are visible without recomputation.
#[derive(Clone, Copy, Debug)]
pub struct MaterializeFines<S> {
    /// [`Config`] of this [`Task`].
    config: Config,

    /// [`Service`] instance.
    service: S,
}

impl<Db> Task<Start<By<MaterializeFines<Self>, Config>>> for Service<Db>
where
    MaterializeFines<Service<Db>>:
        Task<Perform<()>, Ok = usize, Err: Error> + Send + Sync + 'static,
    Self: Clone,
{
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Start(by): Start<By<MaterializeFines<Self>, Config>>,
    ) -> Result<Self::Ok, Self::Err> {
        let config = by.into_inner();
        let task = MaterializeFines {
            config,
            service: self.clone(),
        };

        let mut interval = interval(task.config.interval);
        loop {
            let _ = interval.tick().await;
            match task.execute(Perform(())).await {
                Ok(0) => {}
                Ok(n) => log::info!("materialized fines of {n} loans"),
                Err(e) => {
                    log::error!("`task::MaterializeFines` failed: {e}");
                }
            }
        }
    }
}

impl<Db> Task<Perform<()>> for MaterializeFines<Service<Db>>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Vec<Loan>, read::loan::list::Filter>>,
            Ok = Vec<Loan>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Lock<By<Loan, loan::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Loan>, loan::Id>>,
            Ok = Option<Loan>,
            Err = Traced<database::Error>,
        > + Database<Insert<Loan>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = usize;
    type Err = ExecutionError;

    async fn execute(&self, _: Perform<()>) -> Result<Self::Ok, Self::Err> {
        let policy = &self.service.config().policy;
        let now = DateTime::now();

        let stale = self
            .service
            .database()
            .execute(Select(By::<Vec<Loan>, _>::new(
                read::loan::list::Filter {
                    outstanding: true,
                    ..read::loan::list::Filter::default()
                },
            )))
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .filter(|l| l.status_at(now) == loan::Status::Overdue)
            .filter(|l| l.fine_at(now, policy) != l.fine.amount)
            .map(|l| l.id)
            .collect::<Vec<_>>();

        let mut materialized = 0;
        for id in stale {
            let tx = self
                .service
                .database()
                .execute(Transact)
                .await
                .map_err(tracerr::wrap!())?;

            tx.execute(Lock(By::new(id)))
                .await
                .map_err(tracerr::wrap!())
                .map(drop)?;
            let Some(mut loan) = tx
                .execute(Select(By::<Option<Loan>, _>::new(id)))
                .await
                .map_err(tracerr::wrap!())?
                .filter(Loan::is_outstanding)
            else {
                continue;
            };

            loan.fine.amount = loan.fine_at(now, policy);
            tx.execute(Insert(loan))
                .await
                .map_err(tracerr::wrap!())
                .map(drop)?;
            tx.execute(Commit)
                .await
                .map_err(tracerr::wrap!())
                .map(drop)?;

            materialized += 1;
        }

        Ok(materialized)
    }
}

/// Error of [`MaterializeFines`] execution.
pub type ExecutionError = Traced<database::Error>;

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::{
        operations::{By, Insert, Perform, Select},
        DateTime,
    };

    use crate::{
        domain::{book, loan, user, Loan, Policy},
        infra::{Database as _, Memory},
        task::Task as _,
        Service,
    };

    use super::{Config, MaterializeFines};

    #[tokio::test]
    async fn stores_accrued_fines_of_overdue_loans() {
        let policy = Policy::default();
        let svc = Service::for_tests(Memory::new());
        let mut overdue =
            Loan::request(book::Id::new(), user::Id::new(), &policy);
        let loaned_at = DateTime::now() - Duration::from_secs(16 * 86_400);
        overdue.term = Some(loan::Term {
            loaned_at: loaned_at.coerce(),
            due_at: (loaned_at + policy.loan_duration).coerce(),
        });
        let pending = Loan::request(book::Id::new(), user::Id::new(), &policy);
        svc.database().execute(Insert(overdue.clone())).await.unwrap();
        svc.database().execute(Insert(pending.clone())).await.unwrap();

        let task = MaterializeFines {
            config: Config {
                interval: Duration::from_secs(60),
            },
            service: svc.clone(),
        };
        assert_eq!(task.execute(Perform(())).await.unwrap(), 1);
        assert_eq!(task.execute(Perform(())).await.unwrap(), 0);

        let stored = svc
            .database()
            .execute(Select(By::<Option<Loan>, _>::new(overdue.id)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.fine.amount.to_string(), "100AOA");
    }
}
