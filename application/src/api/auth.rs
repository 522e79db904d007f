//! Authentication definitions.

use axum::{extract::rejection::JsonRejection, Json};
use serde::{Deserialize, Serialize};
use service::{command, domain, Command as _};

use crate::{api::user::Role, define_error, AsError, Context, Error};

/// Body of a [`login`] request.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Email of the `User` to log in.
    pub email: String,

    /// Password of the `User` to log in.
    #[serde(rename = "senha")]
    pub password: String,
}

/// Response to a successful [`login`].
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// Bearer token authorizing further requests.
    pub token: String,

    /// Type of the [`LoginResponse::token`]. Always `Bearer`.
    pub token_type: &'static str,

    /// Unix timestamp in milliseconds when the token expires.
    pub expires_at: i64,

    /// Logged in `User`.
    #[serde(rename = "usuario")]
    pub user: LoggedUser,
}

/// Short representation of the logged in `User`.
#[derive(Debug, Serialize)]
pub struct LoggedUser {
    /// ID of the `User`.
    pub id: domain::user::Id,

    /// Name of the `User`.
    #[serde(rename = "nome")]
    pub name: String,

    /// Email of the `User`.
    pub email: String,

    /// [`Role`] of the `User`.
    #[serde(rename = "perfil")]
    pub role: Role,
}

/// Logs a `User` in by the provided credentials.
///
/// # Errors
///
/// Possible error codes:
/// - `WRONG_CREDENTIALS` - the provided email or password is wrong.
#[tracing::instrument(skip_all)]
pub async fn login(
    ctx: Context,
    req: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, Error> {
    let Json(LoginRequest { email, password }) = req?;

    let cmd = command::CreateUserSession::ByCredentials {
        email: domain::user::Email::new(email)
            .ok_or(LoginError::WrongCredentials)?,
        password: {
            let password = domain::user::Password::new(password)
                .ok_or(LoginError::WrongCredentials)?;
            secrecy::SecretBox::init_with(move || password)
        },
    };
    let out = ctx
        .service()
        .execute(cmd)
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(LoginResponse {
        token: out.token.to_string(),
        token_type: "Bearer",
        expires_at: out.expires_at.unix_timestamp() * 1000,
        user: LoggedUser {
            id: out.user.id,
            name: out.user.name.to_string(),
            email: out.user.email.to_string(),
            role: out.user.role.into(),
        },
    }))
}

define_error! {
    enum LoginError {
        #[code = "WRONG_CREDENTIALS"]
        #[status = FORBIDDEN]
        #[message = "Wrong email or password"]
        WrongCredentials,
    }
}

impl AsError for command::create_user_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::JsonWebTokenEncodeError(_) => None,
            Self::UserNotExists(_) | Self::WrongCredentials => {
                Some(LoginError::WrongCredentials.into())
            }
        }
    }
}
