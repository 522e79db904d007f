//! [`Book`]-related definitions.

use std::collections::HashSet;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query,
    },
    Json,
};
use itertools::Itertools as _;
use serde::{Deserialize, Serialize};
use service::{command, domain, query, read, Command as _};

use crate::{api, define_error, AsError, Context, Error};

/// `Book` title of the library catalog.
#[derive(Clone, Debug, Serialize)]
pub struct Book {
    /// ID of this [`Book`].
    pub id: domain::book::Id,

    /// Title of this [`Book`].
    #[serde(rename = "titulo")]
    pub title: String,

    /// ISBN of this [`Book`].
    pub isbn: String,

    /// ID of the `Author` of this [`Book`].
    #[serde(rename = "autorId")]
    pub author_id: domain::author::Id,

    /// Name of the `Author` of this [`Book`].
    #[serde(rename = "nomeAutor")]
    pub author_name: Option<String>,

    /// ID of the `Category` of this [`Book`].
    #[serde(rename = "categoriaId")]
    pub category_id: domain::category::Id,

    /// Name of the `Category` of this [`Book`].
    #[serde(rename = "nomeCategoria")]
    pub category_name: Option<String>,

    /// Year this [`Book`] was published in.
    #[serde(rename = "anoPublicacao")]
    pub publication_year: Option<i16>,

    /// Number of pages in this [`Book`].
    #[serde(rename = "qtdPaginas")]
    pub num_pages: Option<u16>,

    /// Total number of copies of this [`Book`].
    #[serde(rename = "qtdTotal")]
    pub total_copies: u16,

    /// Number of copies of this [`Book`] on the shelves.
    #[serde(rename = "qtdDisponivel")]
    pub available_copies: u16,

    /// Shelf location of this [`Book`].
    #[serde(rename = "localizacao")]
    pub location: Option<String>,

    /// Synopsis of this [`Book`].
    #[serde(rename = "sinopse")]
    pub synopsis: Option<String>,
}

impl Book {
    /// Converts the provided [`domain::Book`]s into [`Book`]s, filling in the
    /// names of their `Author`s and `Category`s.
    ///
    /// # Errors
    ///
    /// If the names cannot be loaded.
    pub async fn expand(
        ctx: &Context,
        books: Vec<domain::Book>,
    ) -> Result<Vec<Self>, Error> {
        let author_ids = books
            .iter()
            .map(|b| b.author_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect_vec();
        let category_ids = books
            .iter()
            .map(|b| b.category_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect_vec();

        let authors = ctx
            .service()
            .execute(query::authors::ByIds::by(author_ids))
            .await
            .map_err(AsError::into_error)?;
        let categories = ctx
            .service()
            .execute(query::categories::ByIds::by(category_ids))
            .await
            .map_err(AsError::into_error)?;

        Ok(books
            .into_iter()
            .map(|b| Self {
                id: b.id,
                title: b.title.to_string(),
                isbn: b.isbn.to_string(),
                author_id: b.author_id,
                author_name: authors
                    .get(&b.author_id)
                    .map(|a| a.name.to_string()),
                category_id: b.category_id,
                category_name: categories
                    .get(&b.category_id)
                    .map(|c| c.name.to_string()),
                publication_year: b.publication_year,
                num_pages: b.num_pages,
                total_copies: b.copies.total(),
                available_copies: b.copies.available(),
                location: b.location.map(|l| l.to_string()),
                synopsis: b.synopsis.map(|s| s.to_string()),
            })
            .collect())
    }

    /// Converts the provided [`domain::Book`] into a [`Book`].
    ///
    /// # Errors
    ///
    /// If the names cannot be loaded.
    async fn expand_one(
        ctx: &Context,
        book: domain::Book,
    ) -> Result<Self, Error> {
        Self::expand(ctx, vec![book])
            .await?
            .pop()
            .ok_or_else(|| Error::internal(&"expanded `Book` is missing"))
    }
}

/// Looks up the [`domain::Book`] by the provided ISBN.
///
/// # Errors
///
/// If the ISBN is malformed or no [`domain::Book`] has it.
pub(crate) async fn find(
    ctx: &Context,
    isbn: String,
) -> Result<domain::Book, Error> {
    let isbn =
        domain::book::Isbn::new(isbn).ok_or_else(|| Error::invalid("isbn"))?;

    ctx.service()
        .execute(query::book::ByIsbn::by(&isbn))
        .await
        .map_err(AsError::into_error)?
        .ok_or_else(|| api::NotExistsError::Book.into())
}

/// Filter of the [`list`]ed [`Book`]s.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListParams {
    /// Part of the title to search for.
    #[serde(rename = "titulo")]
    pub title: Option<String>,

    /// ID of the `Author` to filter by.
    #[serde(rename = "autorId")]
    pub author_id: Option<domain::author::Id>,

    /// ID of the `Category` to filter by.
    #[serde(rename = "categoriaId")]
    pub category_id: Option<domain::category::Id>,
}

/// Lists the [`Book`]s of the catalog.
///
/// # Errors
///
/// If the request is not authenticated.
#[tracing::instrument(skip_all)]
pub async fn list(
    ctx: Context,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<Book>>, Error> {
    _ = ctx.current_session().await?;
    let Query(ListParams {
        title,
        author_id,
        category_id,
    }) = params?;

    let filter = read::book::list::Filter {
        title: title
            .map(|t| {
                domain::book::Title::new(t)
                    .ok_or_else(|| Error::invalid("titulo"))
            })
            .transpose()?,
        author_id,
        category_id,
    };
    let books = ctx
        .service()
        .execute(query::books::List::by(filter))
        .await
        .map_err(AsError::into_error)?;

    Book::expand(&ctx, books).await.map(Json)
}

/// Returns the [`Book`] with the provided ISBN.
///
/// # Errors
///
/// Possible error codes:
/// - `BOOK_NOT_EXISTS` - no [`Book`] has the ISBN.
#[tracing::instrument(skip_all, fields(book.isbn))]
pub async fn get(
    ctx: Context,
    isbn: Result<Path<String>, PathRejection>,
) -> Result<Json<Book>, Error> {
    _ = ctx.current_session().await?;
    let Path(isbn) = isbn?;
    _ = tracing::Span::current().record("book.isbn", isbn.as_str());

    let book = find(&ctx, isbn).await?;
    Book::expand_one(&ctx, book).await.map(Json)
}

/// Body of a [`create`] request.
#[derive(Debug, Deserialize)]
pub struct CreateRequest {
    /// Title of a new [`Book`].
    #[serde(rename = "titulo")]
    pub title: String,

    /// ISBN of a new [`Book`].
    pub isbn: String,

    /// ID of the `Author` of a new [`Book`].
    #[serde(rename = "autorId")]
    pub author_id: domain::author::Id,

    /// ID of the `Category` of a new [`Book`].
    #[serde(rename = "categoriaId")]
    pub category_id: domain::category::Id,

    /// Year a new [`Book`] was published in.
    #[serde(rename = "anoPublicacao", default)]
    pub publication_year: Option<i16>,

    /// Number of pages in a new [`Book`].
    #[serde(rename = "qtdPaginas", default)]
    pub num_pages: Option<u16>,

    /// Total number of copies of a new [`Book`].
    #[serde(rename = "qtdTotal")]
    pub total_copies: u16,

    /// Shelf location of a new [`Book`].
    #[serde(rename = "localizacao", default)]
    pub location: Option<String>,

    /// Synopsis of a new [`Book`].
    #[serde(rename = "sinopse", default)]
    pub synopsis: Option<String>,
}

/// Adds a new [`Book`] to the catalog.
///
/// # Errors
///
/// Possible error codes:
/// - `AUTHOR_NOT_EXISTS` - the `Author` does not exist;
/// - `CATEGORY_NOT_EXISTS` - the `Category` does not exist;
/// - `ISBN_OCCUPIED` - another [`Book`] has the ISBN;
/// - `NO_COPIES` - zero copies are provided.
#[tracing::instrument(skip_all, fields(book.isbn))]
pub async fn create(
    ctx: Context,
    req: Result<Json<CreateRequest>, JsonRejection>,
) -> Result<Json<Book>, Error> {
    _ = ctx.admin_session().await?;
    let Json(req) = req?;
    _ = tracing::Span::current().record("book.isbn", req.isbn.as_str());

    let cmd = command::CreateBook {
        isbn: domain::book::Isbn::new(req.isbn)
            .ok_or_else(|| Error::invalid("isbn"))?,
        title: domain::book::Title::new(req.title)
            .ok_or_else(|| Error::invalid("titulo"))?,
        author_id: req.author_id,
        category_id: req.category_id,
        publication_year: req.publication_year,
        num_pages: req.num_pages,
        location: req
            .location
            .filter(|l| !l.trim().is_empty())
            .map(|l| {
                domain::book::Location::new(l.trim())
                    .ok_or_else(|| Error::invalid("localizacao"))
            })
            .transpose()?,
        synopsis: req
            .synopsis
            .filter(|s| !s.trim().is_empty())
            .map(|s| {
                domain::book::Synopsis::new(s)
                    .ok_or_else(|| Error::invalid("sinopse"))
            })
            .transpose()?,
        total_copies: req.total_copies,
    };
    let book = ctx
        .service()
        .execute(cmd)
        .await
        .map_err(AsError::into_error)?;

    Book::expand_one(&ctx, book).await.map(Json)
}

/// Body of an [`update_copies`] request.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct UpdateCopiesRequest {
    /// New total number of copies.
    #[serde(rename = "qtdTotal")]
    pub total: u16,
}

/// Changes the total number of copies of the [`Book`] with the provided ISBN.
///
/// # Errors
///
/// Possible error codes:
/// - `INVALID_TOTAL` - the new total is zero or doesn't cover the lent
///   copies.
#[tracing::instrument(skip_all, fields(book.isbn))]
pub async fn update_copies(
    ctx: Context,
    isbn: Result<Path<String>, PathRejection>,
    req: Result<Json<UpdateCopiesRequest>, JsonRejection>,
) -> Result<Json<Book>, Error> {
    _ = ctx.admin_session().await?;
    let (Path(isbn), Json(UpdateCopiesRequest { total })) = (isbn?, req?);
    _ = tracing::Span::current().record("book.isbn", isbn.as_str());

    let book_id = find(&ctx, isbn).await?.id;
    let book = ctx
        .service()
        .execute(command::UpdateBookCopies { book_id, total })
        .await
        .map_err(AsError::into_error)?;

    Book::expand_one(&ctx, book).await.map(Json)
}

/// Removes the [`Book`] with the provided ISBN from the catalog.
///
/// # Errors
///
/// Possible error codes:
/// - `BOOK_HAS_OUTSTANDING_LOANS` - some copies are not returned yet.
#[tracing::instrument(skip_all, fields(book.isbn))]
pub async fn delete(
    ctx: Context,
    isbn: Result<Path<String>, PathRejection>,
) -> Result<http::StatusCode, Error> {
    _ = ctx.admin_session().await?;
    let Path(isbn) = isbn?;
    _ = tracing::Span::current().record("book.isbn", isbn.as_str());

    let book_id = find(&ctx, isbn).await?.id;
    ctx.service()
        .execute(command::DeleteBook { book_id })
        .await
        .map(|()| http::StatusCode::NO_CONTENT)
        .map_err(AsError::into_error)
}

define_error! {
    enum InventoryError {
        #[code = "INVALID_TOTAL"]
        #[status = UNPROCESSABLE_ENTITY]
        #[message = "Total of copies must be positive and cover the lent \
                     copies"]
        InvalidTotal,
    }
}

impl AsError for domain::book::InventoryError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::InvalidTotal { .. } => {
                Some(InventoryError::InvalidTotal.into())
            }
            Self::Overflow | Self::Underflow => None,
        }
    }
}

impl AsError for command::create_book::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "ISBN_OCCUPIED"]
                #[status = CONFLICT]
                #[message = "ISBN is occupied by another `Book`"]
                IsbnOccupied,

                #[code = "NO_COPIES"]
                #[status = BAD_REQUEST]
                #[message = "`Book` must have at least one copy"]
                NoCopies,
            }
        }

        match self {
            Self::AuthorNotExists(_) => {
                Some(api::NotExistsError::Author.into())
            }
            Self::CategoryNotExists(_) => {
                Some(api::NotExistsError::Category.into())
            }
            Self::Db(e) => e.try_as_error(),
            Self::IsbnOccupied(_) => Some(Error::IsbnOccupied.into()),
            Self::NoCopies => Some(Error::NoCopies.into()),
        }
    }
}

impl AsError for command::update_book_copies::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::BookNotExists(_) => Some(api::NotExistsError::Book.into()),
            Self::Db(e) => e.try_as_error(),
            Self::Inventory(e) => e.try_as_error(),
        }
    }
}

impl AsError for command::delete_book::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "BOOK_HAS_OUTSTANDING_LOANS"]
                #[status = CONFLICT]
                #[message = "Some copies of the `Book` are not returned yet"]
                OutstandingLoans,
            }
        }

        match self {
            Self::BookHasOutstandingLoans(_) => {
                Some(Error::OutstandingLoans.into())
            }
            Self::BookNotExists(_) => Some(api::NotExistsError::Book.into()),
            Self::Db(e) => e.try_as_error(),
            Self::Reservation(e) => e.try_as_error(),
        }
    }
}

#[cfg(test)]
mod spec {
    use service::domain::book::InventoryError;

    use crate::AsError as _;

    #[test]
    fn rejects_total_below_lent_copies() {
        let err = InventoryError::InvalidTotal { total: 1, lent: 2 }
            .try_as_error()
            .unwrap();
        assert_eq!(err.code, "INVALID_TOTAL");
        assert_eq!(err.status_code, http::StatusCode::UNPROCESSABLE_ENTITY);

        assert!(InventoryError::Underflow.try_as_error().is_none());
    }
}
