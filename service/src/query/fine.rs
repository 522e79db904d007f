//! [`Query`] collection related to [`Loan`] fines.

use common::{
    operations::{By, Select},
    DateTime,
};
use tracerr::Traced;

use crate::{
    domain::{loan, Loan},
    infra::{database, Database},
    read, Query, Service,
};

/// [`Query`] computing the fine of a [`Loan`] as of now.
///
/// The fine of a returned [`Loan`] is frozen, so computing it repeatedly
/// gives the same [`read::fine::Statement`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Compute {
    /// ID of the [`Loan`] to compute the fine of.
    pub loan_id: loan::Id,
}

impl<Db> Query<Compute> for Service<Db>
where
    Db: Database<
        Select<By<Option<Loan>, loan::Id>>,
        Ok = Option<Loan>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<read::fine::Statement>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Compute { loan_id }: Compute,
    ) -> Result<Self::Ok, Self::Err> {
        let loan = self
            .database()
            .execute(Select(By::<Option<Loan>, _>::new(loan_id)))
            .await
            .map_err(tracerr::wrap!())?;

        let now = DateTime::now();
        let policy = &self.config().policy;
        Ok(loan.map(|l| read::fine::Statement {
            loan_id: l.id,
            amount: l.fine_at(now, policy),
            days_late: l.days_late_at(now),
            paid: l.fine.paid_at.is_some(),
        }))
    }
}

#[cfg(test)]
mod spec {
    use common::operations::{By, Insert, Select};

    use crate::{
        command::{spec, CheckoutLoan, ReturnLoan},
        domain::{loan, Loan},
        infra::{Database as _, Memory},
        Query as _, Service,
    };

    use super::Compute;

    #[tokio::test]
    async fn freezes_on_return() {
        let svc = Service::for_tests(Memory::new());
        let (member, book) = (spec::member(1), spec::book(1));
        svc.database().execute(Insert(member.clone())).await.unwrap();
        svc.database().execute(Insert(book.clone())).await.unwrap();

        let loan = svc
            .execute(CheckoutLoan {
                member_id: member.id,
                book_id: book.id,
            })
            .await
            .unwrap();
        let fine = svc
            .execute(Compute { loan_id: loan.id })
            .await
            .unwrap()
            .unwrap();
        assert!(fine.amount.is_zero());
        assert_eq!(fine.days_late, 0);

        let mut loan = svc
            .database()
            .execute(Select(By::<Option<Loan>, _>::new(loan.id)))
            .await
            .unwrap()
            .unwrap();
        let term = loan.term.unwrap();
        let shift = svc.config().policy.loan_duration * 2;
        loan.term = Some(loan::Term {
            loaned_at: (term.loaned_at - shift).coerce(),
            due_at: (term.due_at - shift).coerce(),
        });
        svc.database().execute(Insert(loan.clone())).await.unwrap();

        let accrued = svc
            .execute(Compute { loan_id: loan.id })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(accrued.days_late, 14);
        assert_eq!(accrued.amount.to_string(), "700AOA");

        _ = svc.execute(ReturnLoan { loan_id: loan.id }).await.unwrap();
        let frozen = svc
            .execute(Compute { loan_id: loan.id })
            .await
            .unwrap()
            .unwrap();
        let again = svc
            .execute(Compute { loan_id: loan.id })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(frozen, again);
        assert_eq!(frozen.amount.to_string(), "700AOA");
        assert!(!frozen.paid);

        assert!(svc
            .execute(Compute {
                loan_id: loan::Id::new(),
            })
            .await
            .unwrap()
            .is_none());
    }
}
