//! [`Reservation`]-related definitions.

use std::collections::HashSet;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query,
    },
    Json,
};
use common::{datetime::serde::rfc3339, DateTime};
use itertools::Itertools as _;
use serde::{Deserialize, Serialize};
use service::{command, domain, query, read, Command as _};

use crate::{api, define_error, AsError, Context, Error};

/// Place of a member in the waiting line for a `Book`.
#[derive(Clone, Debug, Serialize)]
pub struct Reservation {
    /// ID of this [`Reservation`].
    pub id: domain::reservation::Id,

    /// ID of the member waiting for the `Book`.
    #[serde(rename = "usuarioId")]
    pub member_id: domain::user::Id,

    /// Name of the member waiting for the `Book`.
    #[serde(rename = "nomeUsuario")]
    pub member_name: Option<String>,

    /// ID of the reserved `Book`.
    #[serde(rename = "livroId")]
    pub book_id: domain::book::Id,

    /// Title of the reserved `Book`.
    #[serde(rename = "tituloLivro")]
    pub book_title: Option<String>,

    /// 1-based position of this [`Reservation`] in the line, while it's
    /// active.
    #[serde(rename = "posicaoFila")]
    pub position: Option<u16>,

    /// [`Status`] of this [`Reservation`].
    pub status: Status,

    /// [`DateTime`] when this [`Reservation`] was made.
    #[serde(rename = "dataReserva", with = "rfc3339")]
    pub created_at: DateTime,

    /// [`DateTime`] when the member was told a copy is held for them.
    #[serde(
        rename = "dataNotificacao",
        serialize_with = "rfc3339::option::serialize"
    )]
    pub notified_at: Option<DateTime>,

    /// [`DateTime`] when the held copy is released to the next member.
    #[serde(rename = "expiraEm", serialize_with = "rfc3339::option::serialize")]
    pub expires_at: Option<DateTime>,
}

impl Reservation {
    /// Converts the provided [`domain::Reservation`]s into [`Reservation`]s,
    /// filling in the names of their members and the titles of their `Book`s.
    ///
    /// # Errors
    ///
    /// If the names or titles cannot be loaded.
    pub async fn expand(
        ctx: &Context,
        reservations: Vec<domain::Reservation>,
    ) -> Result<Vec<Self>, Error> {
        let member_ids = reservations
            .iter()
            .map(|r| r.member_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect_vec();
        let book_ids = reservations
            .iter()
            .map(|r| r.book_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect_vec();

        let members = ctx
            .service()
            .execute(query::users::ByIds::by(member_ids))
            .await
            .map_err(AsError::into_error)?;
        let books = ctx
            .service()
            .execute(query::books::ByIds::by(book_ids))
            .await
            .map_err(AsError::into_error)?;

        let policy = &ctx.service().config().policy;
        Ok(reservations
            .into_iter()
            .map(|r| Self {
                id: r.id,
                member_id: r.member_id,
                member_name: members
                    .get(&r.member_id)
                    .map(|u| u.name.to_string()),
                book_id: r.book_id,
                book_title: books.get(&r.book_id).map(|b| b.title.to_string()),
                position: r.position,
                status: r.status.into(),
                created_at: r.created_at.coerce(),
                notified_at: r.notified_at.map(|n| n.coerce()),
                expires_at: r.expires_at(policy).map(|e| e.coerce()),
            })
            .collect())
    }
}

/// Status of a [`Reservation`].
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Status {
    /// Waiting in the line.
    #[serde(rename = "ATIVA")]
    Active,

    /// Converted into a `Loan`.
    #[serde(rename = "CONCLUIDA")]
    Concluded,

    /// Cancelled or expired.
    #[serde(rename = "CANCELADA")]
    Cancelled,
}

impl From<domain::reservation::Status> for Status {
    fn from(status: domain::reservation::Status) -> Self {
        use domain::reservation::Status as S;

        match status {
            S::Active => Self::Active,
            S::Concluded => Self::Concluded,
            S::Cancelled => Self::Cancelled,
        }
    }
}

/// Returns the line of active [`Reservation`]s for the `Book` with the
/// provided ISBN.
///
/// # Errors
///
/// If the `Book` does not exist.
#[tracing::instrument(skip_all, fields(book.isbn))]
pub async fn queue(
    ctx: Context,
    isbn: Result<Path<String>, PathRejection>,
) -> Result<Json<Vec<Reservation>>, Error> {
    _ = ctx.current_session().await?;
    let Path(isbn) = isbn?;
    _ = tracing::Span::current().record("book.isbn", isbn.as_str());

    let book_id = api::book::find(&ctx, isbn).await?.id;
    let mut line = ctx
        .service()
        .execute(query::reservations::List::by(
            read::reservation::list::Filter {
                book_id: Some(book_id),
                active_only: true,
                ..read::reservation::list::Filter::default()
            },
        ))
        .await
        .map_err(AsError::into_error)?;
    line.sort_by_key(|r| r.position);

    Reservation::expand(&ctx, line).await.map(Json)
}

/// Filter of the [`list`]ed [`Reservation`]s.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListParams {
    /// ID of the member to filter by.
    #[serde(rename = "usuarioId")]
    pub member_id: Option<domain::user::Id>,

    /// ID of the `Book` to filter by.
    #[serde(rename = "livroId")]
    pub book_id: Option<domain::book::Id>,

    /// Whether only active [`Reservation`]s should be listed.
    #[serde(rename = "ativas")]
    pub active_only: bool,
}

/// Lists all the [`Reservation`]s.
///
/// # Errors
///
/// If the authenticated `User` is not an administrator.
#[tracing::instrument(skip_all)]
pub async fn list(
    ctx: Context,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<Reservation>>, Error> {
    _ = ctx.admin_session().await?;
    let Query(ListParams {
        member_id,
        book_id,
        active_only,
    }) = params?;

    let reservations = ctx
        .service()
        .execute(query::reservations::List::by(
            read::reservation::list::Filter {
                member_id,
                book_id,
                active_only,
            },
        ))
        .await
        .map_err(AsError::into_error)?;

    Reservation::expand(&ctx, reservations).await.map(Json)
}

/// Lists the [`Reservation`]s of the authenticated member.
///
/// # Errors
///
/// If the request is not authenticated.
#[tracing::instrument(skip_all)]
pub async fn mine(ctx: Context) -> Result<Json<Vec<Reservation>>, Error> {
    let member_id = ctx.current_session().await?.user.id;

    let reservations = ctx
        .service()
        .execute(query::reservations::List::by(
            read::reservation::list::Filter {
                member_id: Some(member_id),
                ..read::reservation::list::Filter::default()
            },
        ))
        .await
        .map_err(AsError::into_error)?;

    Reservation::expand(&ctx, reservations).await.map(Json)
}

/// Body of a [`create`] request.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct CreateRequest {
    /// ID of the member to reserve the `Book` for.
    ///
    /// The authenticated `User` is used if omitted.
    #[serde(rename = "usuarioId", default)]
    pub member_id: Option<domain::user::Id>,

    /// ID of the `Book` to reserve.
    #[serde(rename = "livroId")]
    pub book_id: domain::book::Id,
}

/// Places a member into the waiting line for a `Book`.
///
/// # Errors
///
/// Possible error codes:
/// - `BOOK_AVAILABLE` - the `Book` has free copies to borrow;
/// - `DUPLICATE_RESERVATION` - the member waits for this `Book` already;
/// - `MEMBER_BLOCKED` - the member is blocked, owes fines or has overdue
///   loans.
#[tracing::instrument(skip_all)]
pub async fn create(
    ctx: Context,
    req: Result<Json<CreateRequest>, JsonRejection>,
) -> Result<Json<Reservation>, Error> {
    let Json(CreateRequest { member_id, book_id }) = req?;
    let member_id = match member_id {
        Some(id) => ctx.owner_session(id).await.map(|_| id)?,
        None => ctx.current_session().await?.user.id,
    };

    let reservation = ctx
        .service()
        .execute(command::CreateReservation { member_id, book_id })
        .await
        .map_err(AsError::into_error)?;

    Reservation::expand(&ctx, vec![reservation])
        .await?
        .pop()
        .map(Json)
        .ok_or_else(|| Error::internal(&"expanded `Reservation` is missing"))
}

/// Cancels the [`Reservation`] with the provided ID.
///
/// # Errors
///
/// Possible error codes:
/// - `RESERVATION_NOT_ACTIVE` - the [`Reservation`] is closed already.
#[tracing::instrument(skip_all, fields(reservation.id))]
pub async fn cancel(
    ctx: Context,
    id: Result<Path<domain::reservation::Id>, PathRejection>,
) -> Result<Json<Reservation>, Error> {
    let Path(reservation_id) = id?;
    _ = tracing::Span::current().record(
        "reservation.id",
        tracing::field::display(reservation_id),
    );

    let owner_id = ctx
        .service()
        .execute(query::reservation::ById::by(reservation_id))
        .await
        .map_err(AsError::into_error)?
        .ok_or(api::NotExistsError::Reservation)?
        .member_id;
    _ = ctx.owner_session(owner_id).await?;

    let reservation = ctx
        .service()
        .execute(command::CancelReservation { reservation_id })
        .await
        .map_err(AsError::into_error)?;

    Reservation::expand(&ctx, vec![reservation])
        .await?
        .pop()
        .map(Json)
        .ok_or_else(|| Error::internal(&"expanded `Reservation` is missing"))
}

define_error! {
    enum StateError {
        #[code = "RESERVATION_NOT_ACTIVE"]
        #[status = CONFLICT]
        #[message = "`Reservation` is not active anymore"]
        NotActive,
    }
}

impl AsError for domain::reservation::Error {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::NotActive(_) => Some(StateError::NotActive.into()),
        }
    }
}

impl AsError for command::create_reservation::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        use api::{NotExistsError as NotExists, RuleError as Rule};

        match self {
            Self::BookAvailable(_) => Some(Rule::BookAvailable.into()),
            Self::BookNotExists(_) => Some(NotExists::Book.into()),
            Self::Db(e) => e.try_as_error(),
            Self::DuplicateReservation(_) => {
                Some(Rule::DuplicateReservation.into())
            }
            Self::MemberBlocked(_) => Some(Rule::MemberBlocked.into()),
            Self::MemberNotExists(_) => Some(NotExists::Member.into()),
        }
    }
}

impl AsError for command::cancel_reservation::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::Reservation(e) => e.try_as_error(),
            Self::ReservationNotExists(_) => {
                Some(api::NotExistsError::Reservation.into())
            }
        }
    }
}

#[cfg(test)]
mod spec {
    use service::domain::reservation;

    use crate::AsError as _;

    use super::Status;

    #[test]
    fn refuses_closed_reservations() {
        let err = reservation::Error::NotActive(reservation::Status::Cancelled)
            .try_as_error()
            .unwrap();

        assert_eq!(err.code, "RESERVATION_NOT_ACTIVE");
        assert_eq!(err.status_code, http::StatusCode::CONFLICT);
    }

    #[test]
    fn serializes_status_in_portuguese() {
        assert_eq!(
            serde_json::to_string(&Status::from(
                reservation::Status::Concluded,
            ))
            .unwrap(),
            r#""CONCLUIDA""#,
        );
    }
}
