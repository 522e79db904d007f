//! [`Loan`]-related [`Database`] implementations.

use std::cmp::Reverse;

use common::operations::{By, Insert, Lock, Select};
use tracerr::Traced;

use crate::{
    domain::{loan, Loan},
    infra::{
        database::{
            self,
            memory::{Memory, Storage},
        },
        Database,
    },
    read,
};

impl<S: Storage> Database<Select<By<Option<Loan>, loan::Id>>> for Memory<S> {
    type Ok = Option<Loan>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Loan>, loan::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self.read(|s| s.loans.get(&id).cloned()).await)
    }
}

impl<S: Storage> Database<Select<By<Vec<Loan>, read::loan::list::Filter>>>
    for Memory<S>
{
    type Ok = Vec<Loan>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Loan>, read::loan::list::Filter>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::loan::list::Filter {
            member_id,
            book_id,
            outstanding,
        } = by.into_inner();
        let mut loans = self
            .read(|s| {
                s.loans
                    .values()
                    .filter(|l| member_id.map_or(true, |id| l.member_id == id))
                    .filter(|l| book_id.map_or(true, |id| l.book_id == id))
                    .filter(|l| !outstanding || l.is_outstanding())
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .await;
        loans.sort_by_key(|l| (Reverse(l.requested_at), Reverse(l.id)));
        Ok(loans)
    }
}

impl<S: Storage> Database<Insert<Loan>> for Memory<S> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(loan): Insert<Loan>,
    ) -> Result<Self::Ok, Self::Err> {
        self.write(|s| drop(s.loans.insert(loan.id, loan))).await;
        Ok(())
    }
}

impl<S: Storage> Database<Lock<By<Loan, loan::Id>>> for Memory<S> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<Loan, loan::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(())
    }
}
