//! [`Author`]-related definitions.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path,
    },
    Json,
};
use serde::{Deserialize, Serialize};
use service::{command, domain, query, Command as _};

use crate::{api, define_error, AsError, Context, Error};

/// Author of `Book`s.
#[derive(Clone, Debug, Serialize)]
pub struct Author {
    /// ID of this [`Author`].
    pub id: domain::author::Id,

    /// Name of this [`Author`].
    #[serde(rename = "nome")]
    pub name: String,

    /// Description of this [`Author`].
    #[serde(rename = "descricao")]
    pub description: Option<String>,
}

impl From<domain::Author> for Author {
    fn from(author: domain::Author) -> Self {
        Self {
            id: author.id,
            name: author.name.to_string(),
            description: author.description.map(|d| d.to_string()),
        }
    }
}

/// Body of a [`create`] request.
#[derive(Debug, Deserialize)]
pub struct CreateRequest {
    /// Name of a new [`Author`].
    #[serde(rename = "nome")]
    pub name: String,

    /// Description of a new [`Author`].
    #[serde(rename = "descricao", default)]
    pub description: Option<String>,
}

/// Lists all the [`Author`]s.
///
/// # Errors
///
/// If the request is not authenticated.
#[tracing::instrument(skip_all)]
pub async fn list(ctx: Context) -> Result<Json<Vec<Author>>, Error> {
    _ = ctx.current_session().await?;

    let authors = ctx
        .service()
        .execute(query::authors::List::by(()))
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(authors.into_iter().map(Into::into).collect()))
}

/// Returns the [`Author`] with the provided ID.
///
/// # Errors
///
/// Possible error codes:
/// - `AUTHOR_NOT_EXISTS` - the [`Author`] does not exist.
#[tracing::instrument(skip_all)]
pub async fn get(
    ctx: Context,
    id: Result<Path<domain::author::Id>, PathRejection>,
) -> Result<Json<Author>, Error> {
    _ = ctx.current_session().await?;
    let Path(id) = id?;

    ctx.service()
        .execute(query::author::ById::by(id))
        .await
        .map_err(AsError::into_error)?
        .map(|a| Json(a.into()))
        .ok_or_else(|| api::NotExistsError::Author.into())
}

/// Creates a new [`Author`].
///
/// # Errors
///
/// If the authenticated `User` is not an administrator.
#[tracing::instrument(skip_all)]
pub async fn create(
    ctx: Context,
    req: Result<Json<CreateRequest>, JsonRejection>,
) -> Result<Json<Author>, Error> {
    _ = ctx.admin_session().await?;
    let Json(CreateRequest { name, description }) = req?;

    let cmd = command::CreateAuthor {
        name: domain::author::Name::new(name)
            .ok_or_else(|| Error::invalid("nome"))?,
        description: description
            .filter(|d| !d.trim().is_empty())
            .map(|d| {
                domain::author::Description::new(d)
                    .ok_or_else(|| Error::invalid("descricao"))
            })
            .transpose()?,
    };

    ctx.service()
        .execute(cmd)
        .await
        .map(|a| Json(a.into()))
        .map_err(AsError::into_error)
}

/// Deletes the [`Author`] with the provided ID.
///
/// # Errors
///
/// Possible error codes:
/// - `AUTHOR_HAS_BOOKS` - some `Book`s are still written by the [`Author`];
/// - `AUTHOR_NOT_EXISTS` - the [`Author`] does not exist.
#[tracing::instrument(skip_all)]
pub async fn delete(
    ctx: Context,
    id: Result<Path<domain::author::Id>, PathRejection>,
) -> Result<http::StatusCode, Error> {
    _ = ctx.admin_session().await?;
    let Path(author_id) = id?;

    ctx.service()
        .execute(command::DeleteAuthor { author_id })
        .await
        .map(|()| http::StatusCode::NO_CONTENT)
        .map_err(AsError::into_error)
}

impl AsError for command::create_author::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
        }
    }
}

impl AsError for command::delete_author::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "AUTHOR_HAS_BOOKS"]
                #[status = CONFLICT]
                #[message = "`Author` still has `Book`s in the catalog"]
                HasBooks,
            }
        }

        match self {
            Self::AuthorHasBooks(_) => Some(Error::HasBooks.into()),
            Self::AuthorNotExists(_) => {
                Some(api::NotExistsError::Author.into())
            }
            Self::Db(e) => e.try_as_error(),
        }
    }
}
