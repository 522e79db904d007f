//! [`Command`] for adding a new [`Book`] to the catalog.

use common::{
    operations::{By, Commit, Insert, Select, Transact, Transacted},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::book::{Isbn, Title};
use crate::{
    domain::{author, book, category, Author, Book, Category},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for adding a new [`Book`] to the catalog.
#[derive(Clone, Debug)]
pub struct CreateBook {
    /// [`Isbn`] of a new [`Book`].
    pub isbn: book::Isbn,

    /// [`Title`] of a new [`Book`].
    pub title: book::Title,

    /// ID of the [`Author`] of a new [`Book`].
    pub author_id: author::Id,

    /// ID of the [`Category`] of a new [`Book`].
    pub category_id: category::Id,

    /// Year a new [`Book`] was published in.
    pub publication_year: Option<book::PublicationYear>,

    /// Number of pages in a new [`Book`].
    pub num_pages: Option<book::NumPages>,

    /// Shelf location of a new [`Book`].
    pub location: Option<book::Location>,

    /// Synopsis of a new [`Book`].
    pub synopsis: Option<book::Synopsis>,

    /// Total number of copies the library owns.
    pub total_copies: u16,
}

impl<Db> Command<CreateBook> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<Author>, author::Id>>,
            Ok = Option<Author>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Category>, category::Id>>,
            Ok = Option<Category>,
            Err = Traced<database::Error>,
        > + for<'i> Database<
            Select<By<Option<Book>, &'i book::Isbn>>,
            Ok = Option<Book>,
            Err = Traced<database::Error>,
        > + Database<Insert<Book>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Book;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateBook) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateBook {
            isbn,
            title,
            author_id,
            category_id,
            publication_year,
            num_pages,
            location,
            synopsis,
            total_copies,
        } = cmd;

        let copies = book::Copies::new(total_copies)
            .ok_or(E::NoCopies)
            .map_err(tracerr::wrap!())?;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        drop(
            tx.execute(Select(By::<Option<Author>, _>::new(author_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or(E::AuthorNotExists(author_id))
                .map_err(tracerr::wrap!())?,
        );
        drop(
            tx.execute(Select(By::<Option<Category>, _>::new(category_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or(E::CategoryNotExists(category_id))
                .map_err(tracerr::wrap!())?,
        );

        let b = tx
            .execute(Select(By::<Option<Book>, _>::new(&isbn)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if b.is_some() {
            return Err(tracerr::new!(E::IsbnOccupied(isbn)));
        }

        let book = Book {
            id: book::Id::new(),
            isbn,
            title,
            author_id,
            category_id,
            publication_year,
            num_pages,
            location,
            synopsis,
            copies,
            created_at: DateTime::now().coerce(),
            deleted_at: None,
        };

        let inserted = tx.execute(Insert(book.clone())).await;
        if let Err(e) = &inserted {
            let e: &database::Error = e.as_ref();
            if e.is_unique_violation("books_isbn_unique") {
                return Err(tracerr::new!(E::IsbnOccupied(book.isbn)));
            }
        }
        inserted
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(book)
    }
}

/// Error of [`CreateBook`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Author`] with the provided ID does not exist.
    #[display("`Author(id: {_0})` does not exist")]
    AuthorNotExists(#[error(not(source))] author::Id),

    /// [`Category`] with the provided ID does not exist.
    #[display("`Category(id: {_0})` does not exist")]
    CategoryNotExists(#[error(not(source))] category::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Isbn`] is already occupied by another [`Book`].
    #[display("`{_0}` ISBN is occupied")]
    IsbnOccupied(#[error(not(source))] book::Isbn),

    /// Zero total copies provided.
    #[display("`Book` must have at least one copy")]
    NoCopies,
}
