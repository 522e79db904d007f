//! [`Category`]-related definitions.

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

/// Category classifying `Book`s.
#[derive(Clone, Debug, Serialize)]
pub struct Category {
    /// ID of this [`Category`].
    pub id: domain::category::Id,

    /// Name of this [`Category`].
    #[serde(rename = "nome")]
    pub name: String,

    /// Description of this [`Category`].
    #[serde(rename = "descricao")]
    pub description: Option<String>,
}

impl From<domain::Category> for Category {
    fn from(category: domain::Category) -> Self {
        Self {
            id: category.id,
            name: category.name.to_string(),
            description: category.description.map(|d| d.to_string()),
        }
    }
}

/// Body of a [`create`] request.
#[derive(Debug, Deserialize)]
pub struct CreateRequest {
    /// Name of a new [`Category`].
    #[serde(rename = "nome")]
    pub name: String,

    /// Description of a new [`Category`].
    #[serde(rename = "descricao", default)]
    pub description: Option<String>,
}

/// Lists all the [`Category`]s.
///
/// # Errors
///
/// If the request is not authenticated.
#[tracing::instrument(skip_all)]
pub async fn list(ctx: Context) -> Result<Json<Vec<Category>>, Error> {
    _ = ctx.current_session().await?;

    let categories = ctx
        .service()
        .execute(query::categories::List::by(()))
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(categories.into_iter().map(Into::into).collect()))
}

/// Returns the [`Category`] with the provided ID.
///
/// # Errors
///
/// If the [`Category`] does not exist.
#[tracing::instrument(skip_all)]
pub async fn get(
    ctx: Context,
    id: Result<Path<domain::category::Id>, PathRejection>,
) -> Result<Json<Category>, Error> {
    _ = ctx.current_session().await?;
    let Path(id) = id?;

    ctx.service()
        .execute(query::category::ById::by(id))
        .await
        .map_err(AsError::into_error)?
        .map(|c| Json(c.into()))
        .ok_or_else(|| api::NotExistsError::Category.into())
}

/// Creates a new [`Category`].
///
/// # Errors
///
/// If the authenticated `User` is not an administrator.
#[tracing::instrument(skip_all)]
pub async fn create(
    ctx: Context,
    req: Result<Json<CreateRequest>, JsonRejection>,
) -> Result<Json<Category>, Error> {
    _ = ctx.admin_session().await?;
    let Json(CreateRequest { name, description }) = req?;

    let cmd = command::CreateCategory {
        name: domain::category::Name::new(name)
            .ok_or_else(|| Error::invalid("nome"))?,
        description: description
            .filter(|d| !d.trim().is_empty())
            .map(|d| {
                domain::category::Description::new(d)
                    .ok_or_else(|| Error::invalid("descricao"))
            })
            .transpose()?,
    };

    ctx.service()
        .execute(cmd)
        .await
        .map(|c| Json(c.into()))
        .map_err(AsError::into_error)
}

/// Deletes the [`Category`] with the provided ID.
///
/// # Errors
///
/// Possible error codes:
/// - `CATEGORY_HAS_BOOKS` - some `Book`s are still classified by the
///   [`Category`];
/// - `CATEGORY_NOT_EXISTS` - the [`Category`] does not exist.
#[tracing::instrument(skip_all)]
pub async fn delete(
    ctx: Context,
    id: Result<Path<domain::category::Id>, PathRejection>,
) -> Result<http::StatusCode, Error> {
    _ = ctx.admin_session().await?;
    let Path(category_id) = id?;

    ctx.service()
        .execute(command::DeleteCategory { category_id })
        .await
        .map(|()| http::StatusCode::NO_CONTENT)
        .map_err(AsError::into_error)
}

impl AsError for command::create_category::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
        }
    }
}

impl AsError for command::delete_category::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "CATEGORY_HAS_BOOKS"]
                #[status = CONFLICT]
                #[message = "`Category` still has `Book`s in the catalog"]
                HasBooks,
            }
        }

        match self {
            Self::CategoryHasBooks(_) => Some(Error::HasBooks.into()),
            Self::CategoryNotExists(_) => {
                Some(api::NotExistsError::Category.into())
            }
            Self::Db(e) => e.try_as_error(),
        }
    }
}
