//! [`User`]-related definitions.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query,
    },
    Json,
};
use serde::{Deserialize, Serialize};
use service::{command, domain, query, read, Command as _};

use crate::{api, define_error, AsError, Context, Error};

/// A `User` of the library.
#[derive(Clone, Debug, Serialize)]
pub struct User {
    /// ID of this [`User`].
    pub id: domain::user::Id,

    /// Enrollment number of this [`User`].
    #[serde(rename = "matricula")]
    pub enrollment: i32,

    /// Name of this [`User`].
    #[serde(rename = "nome")]
    pub name: String,

    /// Email of this [`User`].
    pub email: String,

    /// [`Role`] of this [`User`].
    #[serde(rename = "perfil")]
    pub role: Role,

    /// [`Status`] of this [`User`].
    pub status: Status,
}

impl From<domain::User> for User {
    fn from(user: domain::User) -> Self {
        Self {
            id: user.id,
            enrollment: user.enrollment.into(),
            name: user.name.to_string(),
            email: user.email.to_string(),
            role: user.role.into(),
            status: user.status.into(),
        }
    }
}

/// Role of a [`User`].
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Administrator managing the catalog, users and loans.
    Admin,

    /// Member borrowing and reserving books.
    Member,
}

impl From<domain::user::Role> for Role {
    fn from(role: domain::user::Role) -> Self {
        match role {
            domain::user::Role::Admin => Self::Admin,
            domain::user::Role::Member => Self::Member,
        }
    }
}

impl From<Role> for domain::user::Role {
    fn from(role: Role) -> Self {
        match role {
            Role::Admin => Self::Admin,
            Role::Member => Self::Member,
        }
    }
}

/// Status of a [`User`].
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Status {
    /// [`User`] may borrow and reserve books.
    #[serde(rename = "ATIVO")]
    Active,

    /// [`User`] is not allowed to borrow or reserve books.
    #[serde(rename = "BLOQUEADO")]
    Blocked,
}

impl From<domain::user::Status> for Status {
    fn from(status: domain::user::Status) -> Self {
        match status {
            domain::user::Status::Active => Self::Active,
            domain::user::Status::Blocked => Self::Blocked,
        }
    }
}

impl From<Status> for domain::user::Status {
    fn from(status: Status) -> Self {
        match status {
            Status::Active => Self::Active,
            Status::Blocked => Self::Blocked,
        }
    }
}

/// Filter of the [`list`]ed [`User`]s.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListParams {
    /// Part of the name to search for.
    #[serde(rename = "nome")]
    pub name: Option<String>,

    /// [`Role`] to filter by.
    #[serde(rename = "perfil")]
    pub role: Option<Role>,

    /// [`Status`] to filter by.
    pub status: Option<Status>,
}

/// Lists the [`User`]s.
///
/// # Errors
///
/// If the authenticated `User` is not an administrator.
#[tracing::instrument(skip_all)]
pub async fn list(
    ctx: Context,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<User>>, Error> {
    _ = ctx.admin_session().await?;
    let Query(ListParams { name, role, status }) = params?;

    let filter = read::user::list::Filter {
        name: name
            .map(|n| {
                domain::user::Name::new(n).ok_or_else(|| Error::invalid("nome"))
            })
            .transpose()?,
        role: role.map(Into::into),
        status: status.map(Into::into),
    };
    let users = ctx
        .service()
        .execute(query::users::List::by(filter))
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(users.into_iter().map(Into::into).collect()))
}

/// Returns the authenticated [`User`].
///
/// # Errors
///
/// If the request is not authenticated.
#[tracing::instrument(skip_all)]
pub async fn me(ctx: Context) -> Result<Json<User>, Error> {
    let session = ctx.current_session().await?;
    Ok(Json(session.user.clone().into()))
}

/// Returns the [`User`] with the provided ID.
///
/// # Errors
///
/// If the authenticated `User` is neither the requested one nor an
/// administrator.
#[tracing::instrument(skip_all)]
pub async fn get(
    ctx: Context,
    id: Result<Path<domain::user::Id>, PathRejection>,
) -> Result<Json<User>, Error> {
    let Path(id) = id?;
    _ = ctx.owner_session(id).await?;

    ctx.service()
        .execute(query::user::ById::by(id))
        .await
        .map_err(AsError::into_error)?
        .map(|u| Json(u.into()))
        .ok_or_else(|| api::NotExistsError::User.into())
}

/// Returns the [`User`] holding the library card with the provided
/// enrollment number.
///
/// # Errors
///
/// If the authenticated `User` is not an administrator.
#[tracing::instrument(skip_all, fields(user.enrollment))]
pub async fn get_by_enrollment(
    ctx: Context,
    enrollment: Result<Path<i32>, PathRejection>,
) -> Result<Json<User>, Error> {
    _ = ctx.admin_session().await?;
    let Path(enrollment) = enrollment?;
    _ = tracing::Span::current().record("user.enrollment", enrollment);

    let enrollment = domain::user::Enrollment::new(enrollment)
        .ok_or_else(|| Error::invalid("matricula"))?;
    ctx.service()
        .execute(query::user::ByEnrollment::by(enrollment))
        .await
        .map_err(AsError::into_error)?
        .map(|u| Json(u.into()))
        .ok_or_else(|| api::NotExistsError::User.into())
}

/// Body of a [`create`] request.
#[derive(Debug, Deserialize)]
pub struct CreateRequest {
    /// Enrollment number of a new [`User`].
    #[serde(rename = "matricula")]
    pub enrollment: i32,

    /// Name of a new [`User`].
    #[serde(rename = "nome")]
    pub name: String,

    /// Email of a new [`User`].
    pub email: String,

    /// Password of a new [`User`].
    #[serde(rename = "senha")]
    pub password: String,

    /// [`Role`] of a new [`User`].
    #[serde(rename = "perfil", default = "CreateRequest::default_role")]
    pub role: Role,

    /// [`Status`] of a new [`User`].
    #[serde(default = "CreateRequest::default_status")]
    pub status: Status,
}

impl CreateRequest {
    /// Default [`Role`] of a new [`User`].
    fn default_role() -> Role {
        Role::Member
    }

    /// Default [`Status`] of a new [`User`].
    fn default_status() -> Status {
        Status::Active
    }
}

/// Creates a new [`User`].
///
/// # Errors
///
/// Possible error codes:
/// - `EMAIL_OCCUPIED` - provided email is occupied by another `User`;
/// - `ENROLLMENT_OCCUPIED` - provided enrollment number is occupied by
///   another `User`.
#[tracing::instrument(skip_all, fields(user.enrollment))]
pub async fn create(
    ctx: Context,
    req: Result<Json<CreateRequest>, JsonRejection>,
) -> Result<Json<User>, Error> {
    _ = ctx.admin_session().await?;
    let Json(CreateRequest {
        enrollment,
        name,
        email,
        password,
        role,
        status,
    }) = req?;

    _ = tracing::Span::current().record("user.enrollment", enrollment);

    let cmd = command::CreateUser {
        enrollment: domain::user::Enrollment::new(enrollment)
            .ok_or_else(|| Error::invalid("matricula"))?,
        name: domain::user::Name::new(name)
            .ok_or_else(|| Error::invalid("nome"))?,
        email: domain::user::Email::new(email)
            .ok_or_else(|| Error::invalid("email"))?,
        password: {
            let password = domain::user::Password::new(password)
                .ok_or_else(|| Error::invalid("senha"))?;
            secrecy::SecretBox::init_with(move || password)
        },
        role: role.into(),
        status: status.into(),
    };

    ctx.service()
        .execute(cmd)
        .await
        .map(|u| Json(u.into()))
        .map_err(AsError::into_error)
}

/// Body of an [`update_status`] request.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct UpdateStatusRequest {
    /// New [`Status`] of the [`User`].
    pub status: Status,
}

/// Blocks or unblocks the [`User`] with the provided ID.
///
/// # Errors
///
/// If the authenticated `User` is not an administrator.
#[tracing::instrument(skip_all)]
pub async fn update_status(
    ctx: Context,
    id: Result<Path<domain::user::Id>, PathRejection>,
    req: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<User>, Error> {
    _ = ctx.admin_session().await?;
    let (Path(user_id), Json(UpdateStatusRequest { status })) = (id?, req?);

    ctx.service()
        .execute(command::UpdateUserStatus {
            user_id,
            status: status.into(),
        })
        .await
        .map(|u| Json(u.into()))
        .map_err(AsError::into_error)
}

/// Deletes the [`User`] with the provided ID.
///
/// # Errors
///
/// Possible error codes:
/// - `MEMBER_HAS_OUTSTANDING_LOANS` - the `User` didn't return some books
///   yet.
#[tracing::instrument(skip_all)]
pub async fn delete(
    ctx: Context,
    id: Result<Path<domain::user::Id>, PathRejection>,
) -> Result<http::StatusCode, Error> {
    _ = ctx.admin_session().await?;
    let Path(user_id) = id?;

    ctx.service()
        .execute(command::DeleteUser { user_id })
        .await
        .map(|()| http::StatusCode::NO_CONTENT)
        .map_err(AsError::into_error)
}

impl AsError for command::create_user::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "EMAIL_OCCUPIED"]
                #[status = CONFLICT]
                #[message = "Email is occupied by another `User`"]
                EmailOccupied,

                #[code = "ENROLLMENT_OCCUPIED"]
                #[status = CONFLICT]
                #[message = "Enrollment number is occupied by another `User`"]
                EnrollmentOccupied,
            }
        }

        match self {
            Self::Bcrypt(_) => None,
            Self::Db(e) => e.try_as_error(),
            Self::EmailOccupied(_) => Some(Error::EmailOccupied.into()),
            Self::EnrollmentOccupied(_) => {
                Some(Error::EnrollmentOccupied.into())
            }
        }
    }
}

impl AsError for command::update_user_status::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::UserNotExists(_) => Some(api::NotExistsError::User.into()),
        }
    }
}

impl AsError for command::delete_user::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "MEMBER_HAS_OUTSTANDING_LOANS"]
                #[status = CONFLICT]
                #[message = "Member didn't return some books yet"]
                OutstandingLoans,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::Reservation(e) => e.try_as_error(),
            Self::UserHasOutstandingLoans(_) => {
                Some(Error::OutstandingLoans.into())
            }
            Self::UserNotExists(_) => Some(api::NotExistsError::User.into()),
        }
    }
}

#[cfg(test)]
mod spec {
    use super::{CreateRequest, Role, Status};

    #[test]
    fn defaults_new_user_to_active_member() {
        let req = serde_json::from_str::<CreateRequest>(
            r#"{
                "matricula": 2024001,
                "nome": "Ana",
                "email": "ana@biblio.ao",
                "senha": "secret1"
            }"#,
        )
        .unwrap();

        assert_eq!(req.role, Role::Member);
        assert_eq!(req.status, Status::Active);
    }

    #[test]
    fn uses_portuguese_status_values() {
        assert_eq!(
            serde_json::to_string(&Status::Blocked).unwrap(),
            r#""BLOQUEADO""#,
        );
        assert_eq!(
            serde_json::from_str::<Role>(r#""ADMIN""#).unwrap(),
            Role::Admin,
        );
    }
}
