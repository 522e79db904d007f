//! [`Reservation`]-related [`Database`] implementations.

use common::operations::{By, Insert, Select};
use itertools::Itertools as _;
use postgres_types::ToSql;
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{reservation, Reservation},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

/// Columns of the `reservations` table.
const COLUMNS: &str = "\
    id, book_id, member_id, status, position, \
    created_at, notified_at, closed_at";

/// Builds a [`Reservation`] out of the provided [`Row`].
fn from_row(row: &Row) -> Reservation {
    Reservation {
        id: row.get("id"),
        book_id: row.get("book_id"),
        member_id: row.get("member_id"),
        status: row.get("status"),
        position: row
            .get::<_, Option<i32>>("position")
            .map(u16::try_from)
            .transpose()
            .expect("`position` overflow"),
        created_at: row.get("created_at"),
        notified_at: row.get("notified_at"),
        closed_at: row.get("closed_at"),
    }
}

impl<C> Database<Select<By<Option<Reservation>, reservation::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Reservation>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Reservation>, reservation::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM reservations \
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

impl<C>
    Database<Select<By<Vec<Reservation>, read::reservation::list::Filter>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Reservation>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Vec<Reservation>, read::reservation::list::Filter>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::reservation::list::Filter {
            member_id,
            book_id,
            active_only,
        } = by.into_inner();

        let active = reservation::Status::Active;
        let mut ps: Vec<&(dyn ToSql + Sync)> = vec![];

        let member_idx = member_id.as_ref().map(|id| {
            ps.push(id);
            ps.len()
        });
        let book_idx = book_id.as_ref().map(|id| {
            ps.push(id);
            ps.len()
        });
        let active_idx = active_only.then(|| {
            ps.push(&active);
            ps.len()
        });

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM reservations \
             WHERE TRUE \
                   {member_filtering} \
                   {book_filtering} \
                   {active_filtering} \
             ORDER BY created_at ASC, id ASC",
            member_filtering =
                member_idx.into_iter().format_with("", |idx, f| {
                    f(&format_args!("AND member_id = ${idx}::UUID"))
                }),
            book_filtering = book_idx.into_iter().format_with("", |idx, f| {
                f(&format_args!("AND book_id = ${idx}::UUID"))
            }),
            active_filtering =
                active_idx.into_iter().format_with("", |idx, f| {
                    f(&format_args!("AND status = ${idx}::INT2"))
                }),
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

impl<C> Database<Insert<Reservation>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(reservation): Insert<Reservation>,
    ) -> Result<Self::Ok, Self::Err> {
        let Reservation {
            id,
            book_id,
            member_id,
            status,
            position,
            created_at,
            notified_at,
            closed_at,
        } = reservation;
        let position = position.map(i32::from);

        const SQL: &str = "\
            INSERT INTO reservations (\
                id, book_id, member_id, status, position, \
                created_at, notified_at, closed_at\
            ) \
            VALUES (\
                $1::UUID, $2::UUID, $3::UUID, $4::INT2, $5::INT4, \
                $6::TIMESTAMPTZ, $7::TIMESTAMPTZ, $8::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET status = EXCLUDED.status, \
                position = EXCLUDED.position, \
                notified_at = EXCLUDED.notified_at, \
                closed_at = EXCLUDED.closed_at";
        self.exec(
            SQL,
            &[
                &id,
                &book_id,
                &member_id,
                &status,
                &position,
                &created_at,
                &notified_at,
                &closed_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}
