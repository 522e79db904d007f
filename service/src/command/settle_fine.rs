//! [`Command`] for settling [`loan::Fine`]s.

use common::{
    operations::{By, Commit, Insert, Lock, Select, Transact, Transacted},
    DateTime, Money,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{loan, user, Loan, User},
    infra::{database, Database},
    read, Service,
};

use super::Command;

/// [`Command`] for marking [`loan::Fine`]s as paid.
#[derive(Clone, Copy, Debug, From)]
pub enum SettleFine {
    /// Settle the [`loan::Fine`] of a single returned [`Loan`].
    ByLoan(loan::Id),

    /// Settle all the unpaid [`loan::Fine`]s of returned [`Loan`]s of a
    /// member.
    ByMember(user::Id),
}

impl<Db> Command<SettleFine> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Loan, loan::Id>>,
            Err = Traced<database::Error>,
        > + Database<Lock<By<User, user::Id>>, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Loan>, loan::Id>>,
            Ok = Option<Loan>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Loan>, read::loan::list::Filter>>,
            Ok = Vec<Loan>,
            Err = Traced<database::Error>,
        > + Database<Insert<Loan>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = read::fine::Payment;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: SettleFine) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;
        use SettleFine as Cmd;

        let paid_at = DateTime::now().coerce();
        let currency = self.config().policy.fine_per_day.currency;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let loans = match cmd {
            Cmd::ByLoan(loan_id) => {
                tx.execute(Lock(By::new(loan_id)))
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
                    .settle(paid_at)
                    .map_err(tracerr::from_and_wrap!(=> E))?;

                vec![loan]
            }
            Cmd::ByMember(member_id) => {
                // Avoid settling the same `Fine`s concurrently.
                tx.execute(Lock(By::new(member_id)))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))
                    .map(drop)?;

                let member = tx
                    .execute(Select(By::<Option<User>, _>::new(member_id)))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?
                    .ok_or(E::MemberNotExists(member_id))
                    .map_err(tracerr::wrap!())?;

                let loans = tx
                    .execute(Select(By::<Vec<Loan>, _>::new(
                        read::loan::list::Filter {
                            member_id: Some(member.id),
                            ..read::loan::list::Filter::default()
                        },
                    )))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?
                    .into_iter()
                    .filter_map(|mut l| l.settle(paid_at).is_ok().then_some(l))
                    .collect::<Vec<_>>();
                if loans.is_empty() {
                    return Err(tracerr::new!(E::NothingDue(member.id)));
                }
                loans
            }
        };

        for loan in &loans {
            tx.execute(Insert(loan.clone()))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
        }

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(read::fine::Payment {
            total: Money {
                amount: loans
                    .iter()
                    .map(|l| l.fine.amount)
                    .filter(|m| m.currency == currency)
                    .map(|m| m.amount)
                    .sum(),
                currency,
            },
            loan_ids: loans.into_iter().map(|l| l.id).collect(),
            paid_at,
        })
    }
}

/// Error of [`SettleFine`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Loan`] cannot be settled.
    #[display("`Loan` fine cannot be settled: {_0}")]
    #[from]
    Loan(loan::Error),

    /// [`Loan`] with the provided ID does not exist.
    #[display("`Loan(id: {_0})` does not exist")]
    LoanNotExists(#[error(not(source))] loan::Id),

    /// Member with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    MemberNotExists(#[error(not(source))] user::Id),

    /// Member has no unpaid fines of returned [`Loan`]s.
    #[display("`User(id: {_0})` has no fines due")]
    NothingDue(#[error(not(source))] user::Id),
}
