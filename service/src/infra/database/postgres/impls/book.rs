//! [`Book`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::operations::{By, Insert, Lock, Select};
use itertools::Itertools as _;
use postgres_types::ToSql;
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{book, Book},
    infra::{
        database::{
            self,
            postgres::{Connection, FuzzPattern},
            Postgres,
        },
        Database,
    },
    read,
};

/// Columns of the `books` table.
const COLUMNS: &str = "\
    id, isbn, title, author_id, category_id, \
    publication_year, num_pages, location, synopsis, \
    total_copies, available_copies, \
    created_at, deleted_at";

/// Builds a [`Book`] out of the provided [`Row`].
fn from_row(row: &Row) -> Book {
    let total = u16::try_from(row.get::<_, i32>("total_copies"))
        .expect("`total_copies` overflow");
    let available = u16::try_from(row.get::<_, i32>("available_copies"))
        .expect("`available_copies` overflow");
    // SAFETY: `books_copies_bounds` constraint keeps
    //         `available_copies <= total_copies`.
    #[expect(unsafe_code, reason = "invariants are preserved")]
    let copies = unsafe { book::Copies::new_unchecked(total, available) };

    Book {
        id: row.get("id"),
        isbn: row.get("isbn"),
        title: row.get("title"),
        author_id: row.get("author_id"),
        category_id: row.get("category_id"),
        publication_year: row.get("publication_year"),
        num_pages: row
            .get::<_, Option<i32>>("num_pages")
            .map(u16::try_from)
            .transpose()
            .expect("`num_pages` overflow"),
        location: row.get("location"),
        synopsis: row.get("synopsis"),
        copies,
        created_at: row.get("created_at"),
        deleted_at: row.get("deleted_at"),
    }
}

impl<C, IDs> Database<Select<By<HashMap<book::Id, Book>, IDs>>> for Postgres<C>
where
    C: Connection,
    IDs: AsRef<[book::Id]>,
{
    type Ok = HashMap<book::Id, Book>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<book::Id, Book>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        // Avoid subtle change for SQL.
        let ids: &[book::Id] = ids.as_ref();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM books \
             WHERE id = ANY($1::UUID[]) \
               AND deleted_at IS NULL",
        );
        Ok(self
            .query(&sql, &[&ids])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .map(|b| (b.id, b))
            .collect())
    }
}

impl<C> Database<Select<By<Option<Book>, book::Id>>> for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<HashMap<book::Id, Book>, [book::Id; 1]>>,
        Ok = HashMap<book::Id, Book>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<Book>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Book>, book::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self
            .execute(Select(By::new([id])))
            .await
            .map_err(tracerr::wrap!())?
            .remove(&id))
    }
}

impl<'i, C> Database<Select<By<Option<Book>, &'i book::Isbn>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Book>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Book>, &'i book::Isbn>>,
    ) -> Result<Self::Ok, Self::Err> {
        let isbn = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM books \
             WHERE isbn = $1::VARCHAR \
               AND deleted_at IS NULL \
             LIMIT 1",
        );
        Ok(self
            .query_opt(&sql, &[&isbn])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<C> Database<Select<By<Vec<Book>, read::book::list::Filter>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Book>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Book>, read::book::list::Filter>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::book::list::Filter {
            title,
            author_id,
            category_id,
        } = by.into_inner();

        let mut ps: Vec<&(dyn ToSql + Sync)> = vec![];

        let title_pattern =
            title.as_ref().map(|t| FuzzPattern::new(t.as_ref()));
        let title_idx = title_pattern.as_ref().map(|t| {
            ps.push(t);
            ps.len()
        });
        let author_idx = author_id.as_ref().map(|id| {
            ps.push(id);
            ps.len()
        });
        let category_idx = category_id.as_ref().map(|id| {
            ps.push(id);
            ps.len()
        });

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM books \
             WHERE deleted_at IS NULL \
                   {title_filtering} \
                   {author_filtering} \
                   {category_filtering} \
             ORDER BY title ASC, id ASC",
            title_filtering = title_idx.into_iter().format_with("", |idx, f| {
                f(&format_args!(
                    "AND title ILIKE ${idx}::VARCHAR"
                ))
            }),
            author_filtering =
                author_idx.into_iter().format_with("", |idx, f| {
                    f(&format_args!("AND author_id = ${idx}::UUID"))
                }),
            category_filtering =
                category_idx.into_iter().format_with("", |idx, f| {
                    f(&format_args!("AND category_id = ${idx}::UUID"))
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

impl<C> Database<Insert<Book>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(book): Insert<Book>,
    ) -> Result<Self::Ok, Self::Err> {
        let Book {
            id,
            isbn,
            title,
            author_id,
            category_id,
            publication_year,
            num_pages,
            location,
            synopsis,
            copies,
            created_at,
            deleted_at,
        } = book;
        let num_pages = num_pages.map(i32::from);
        let total = i32::from(copies.total());
        let available = i32::from(copies.available());

        const SQL: &str = "\
            INSERT INTO books (\
                id, isbn, title, author_id, category_id, \
                publication_year, num_pages, location, synopsis, \
                total_copies, available_copies, \
                created_at, deleted_at\
            ) \
            VALUES (\
                $1::UUID, $2::VARCHAR, $3::VARCHAR, $4::UUID, $5::UUID, \
                $6::INT2, $7::INT4, $8::VARCHAR, $9::VARCHAR, \
                $10::INT4, $11::INT4, \
                $12::TIMESTAMPTZ, $13::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET isbn = EXCLUDED.isbn, \
                title = EXCLUDED.title, \
                author_id = EXCLUDED.author_id, \
                category_id = EXCLUDED.category_id, \
                publication_year = EXCLUDED.publication_year, \
                num_pages = EXCLUDED.num_pages, \
                location = EXCLUDED.location, \
                synopsis = EXCLUDED.synopsis, \
                total_copies = EXCLUDED.total_copies, \
                available_copies = EXCLUDED.available_copies, \
                deleted_at = EXCLUDED.deleted_at";
        self.exec(
            SQL,
            &[
                &id,
                &isbn,
                &title,
                &author_id,
                &category_id,
                &publication_year,
                &num_pages,
                &location,
                &synopsis,
                &total,
                &available,
                &created_at,
                &deleted_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Lock<By<Book, book::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Book, book::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: book::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM books \
            WHERE id = $1::UUID \
            FOR UPDATE";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
