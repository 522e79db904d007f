//! [`Loan`]-related [`Database`] implementations.

use common::{
    operations::{By, Insert, Lock, Select},
    Money,
};
use itertools::Itertools as _;
use postgres_types::ToSql;
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{loan, Loan},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

/// Columns of the `loans` table.
const COLUMNS: &str = "\
    id, book_id, member_id, \
    requested_at, loaned_at, due_at, returned_at, renewals, \
    fine, fine_currency, fine_paid_at";

/// Builds a [`Loan`] out of the provided [`Row`].
fn from_row(row: &Row) -> Loan {
    let term = row
        .get::<_, Option<loan::LoanDateTime>>("loaned_at")
        .zip(row.get::<_, Option<loan::DueDateTime>>("due_at"))
        .map(|(loaned_at, due_at)| loan::Term { loaned_at, due_at });

    Loan {
        id: row.get("id"),
        book_id: row.get("book_id"),
        member_id: row.get("member_id"),
        requested_at: row.get("requested_at"),
        term,
        renewals: u8::try_from(row.get::<_, i16>("renewals"))
            .expect("`renewals` overflow"),
        returned_at: row.get("returned_at"),
        fine: loan::Fine {
            amount: Money {
                amount: row.get("fine"),
                currency: row.get("fine_currency"),
            },
            paid_at: row.get("fine_paid_at"),
        },
    }
}

impl<C> Database<Select<By<Option<Loan>, loan::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Loan>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Loan>, loan::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM loans \
             WHERE id = $1::UUID",
        );
        Ok(self
            .query_opt(&sql, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<C> Database<Select<By<Vec<Loan>, read::loan::list::Filter>>>
    for Postgres<C>
where
    C: Connection,
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

        let mut ps: Vec<&(dyn ToSql + Sync)> = vec![];

        let member_idx = member_id.as_ref().map(|id| {
            ps.push(id);
            ps.len()
        });
        let book_idx = book_id.as_ref().map(|id| {
            ps.push(id);
            ps.len()
        });

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM loans \
             WHERE TRUE \
                   {member_filtering} \
                   {book_filtering} \
                   {outstanding_filtering} \
             ORDER BY requested_at DESC, id DESC",
            member_filtering =
                member_idx.into_iter().format_with("", |idx, f| {
                    f(&format_args!("AND member_id = ${idx}::UUID"))
                }),
            book_filtering = book_idx.into_iter().format_with("", |idx, f| {
                f(&format_args!("AND book_id = ${idx}::UUID"))
            }),
            outstanding_filtering = if outstanding {
                "AND returned_at IS NULL"
            } else {
                ""
            },
        );
        Ok(self
            .query(&sql, ps.as_slice())
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect())
    }
}

impl<C> Database<Insert<Loan>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(loan): Insert<Loan>,
    ) -> Result<Self::Ok, Self::Err> {
        let Loan {
            id,
            book_id,
            member_id,
            requested_at,
            term,
            renewals,
            returned_at,
            fine,
        } = loan;
        let loaned_at = term.map(|t| t.loaned_at);
        let due_at = term.map(|t| t.due_at);
        let renewals = i16::from(renewals);

        const SQL: &str = "\
            INSERT INTO loans (\
                id, book_id, member_id, \
                requested_at, loaned_at, due_at, returned_at, renewals, \
                fine, fine_currency, fine_paid_at\
            ) \
            VALUES (\
                $1::UUID, $2::UUID, $3::UUID, \
                $4::TIMESTAMPTZ, $5::TIMESTAMPTZ, $6::TIMESTAMPTZ, \
                $7::TIMESTAMPTZ, $8::INT2, \
                $9::NUMERIC, $10::INT2, $11::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET loaned_at = EXCLUDED.loaned_at, \
                due_at = EXCLUDED.due_at, \
                returned_at = EXCLUDED.returned_at, \
                renewals = EXCLUDED.renewals, \
                fine = EXCLUDED.fine, \
                fine_currency = EXCLUDED.fine_currency, \
                fine_paid_at = EXCLUDED.fine_paid_at";
        self.exec(
            SQL,
            &[
                &id,
                &book_id,
                &member_id,
                &requested_at,
                &loaned_at,
                &due_at,
                &returned_at,
                &renewals,
                &fine.amount.amount,
                &fine.amount.currency,
                &fine.paid_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Lock<By<Loan, loan::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Loan, loan::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: loan::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM loans \
            WHERE id = $1::UUID \
            FOR UPDATE";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
