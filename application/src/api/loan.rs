//! [`Loan`]-related definitions.

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
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service::{command, domain, query, read, Command as _};

use crate::{api, define_error, AsError, Context, Error};

/// `Loan` of a `Book` copy to a member.
#[derive(Clone, Debug, Serialize)]
pub struct Loan {
    /// ID of this [`Loan`].
    pub id: domain::loan::Id,

    /// ID of the member borrowing the `Book`.
    #[serde(rename = "usuarioId")]
    pub member_id: domain::user::Id,

    /// Name of the member borrowing the `Book`.
    #[serde(rename = "nomeUsuario")]
    pub member_name: Option<String>,

    /// ID of the borrowed `Book`.
    #[serde(rename = "livroId")]
    pub book_id: domain::book::Id,

    /// Title of the borrowed `Book`.
    #[serde(rename = "tituloLivro")]
    pub book_title: Option<String>,

    /// Number of times this [`Loan`] has been renewed.
    #[serde(rename = "qtdRenovacoes")]
    pub renewals: u8,

    /// [`Status`] of this [`Loan`].
    pub status: Status,

    /// Fine accrued by this [`Loan`].
    #[serde(rename = "valorMulta", with = "rust_decimal::serde::float")]
    pub fine: Decimal,

    /// Indicator whether the fine of this [`Loan`] is paid.
    #[serde(rename = "multaPaga")]
    pub fine_paid: bool,

    /// [`DateTime`] when this [`Loan`] was requested.
    #[serde(rename = "dataSolicitacao", with = "rfc3339")]
    pub requested_at: DateTime,

    /// [`DateTime`] when the `Book` was handed over.
    #[serde(
        rename = "dataEmprestimo",
        serialize_with = "rfc3339::option::serialize"
    )]
    pub loaned_at: Option<DateTime>,

    /// [`DateTime`] when the `Book` is due back.
    #[serde(
        rename = "dataPrevista",
        serialize_with = "rfc3339::option::serialize"
    )]
    pub due_at: Option<DateTime>,

    /// [`DateTime`] when the `Book` was returned.
    #[serde(
        rename = "dataDevolucaoReal",
        serialize_with = "rfc3339::option::serialize"
    )]
    pub returned_at: Option<DateTime>,
}

impl Loan {
    /// Converts the provided [`domain::Loan`]s into [`Loan`]s, filling in the
    /// names of their members and the titles of their `Book`s.
    ///
    /// # Errors
    ///
    /// If the names or titles cannot be loaded.
    pub async fn expand(
        ctx: &Context,
        loans: Vec<domain::Loan>,
    ) -> Result<Vec<Self>, Error> {
        let member_ids = loans
            .iter()
            .map(|l| l.member_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect_vec();
        let book_ids = loans
            .iter()
            .map(|l| l.book_id)
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

        let now = DateTime::now();
        let policy = &ctx.service().config().policy;
        Ok(loans
            .into_iter()
            .map(|l| Self {
                id: l.id,
                member_id: l.member_id,
                member_name: members
                    .get(&l.member_id)
                    .map(|u| u.name.to_string()),
                book_id: l.book_id,
                book_title: books.get(&l.book_id).map(|b| b.title.to_string()),
                renewals: l.renewals,
                status: l.status_at(now).into(),
                fine: l.fine_at(now, policy).amount,
                fine_paid: l.fine.paid_at.is_some(),
                requested_at: l.requested_at.coerce(),
                loaned_at: l.term.map(|t| t.loaned_at.coerce()),
                due_at: l.term.map(|t| t.due_at.coerce()),
                returned_at: l.returned_at.map(|r| r.coerce()),
            })
            .collect())
    }

    /// Converts the provided [`domain::Loan`] into a [`Loan`].
    ///
    /// # Errors
    ///
    /// If the name or title cannot be loaded.
    async fn expand_one(
        ctx: &Context,
        loan: domain::Loan,
    ) -> Result<Self, Error> {
        Self::expand(ctx, vec![loan])
            .await?
            .pop()
            .ok_or_else(|| Error::internal(&"expanded `Loan` is missing"))
    }
}

/// Status of a [`Loan`].
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Status {
    /// Requested by a member, waiting for an approval.
    #[serde(rename = "PENDENTE")]
    Pending,

    /// `Book` is lent and not due yet.
    #[serde(rename = "ATIVO")]
    Active,

    /// `Book` is lent and its due date has passed.
    #[serde(rename = "ATRASADO")]
    Overdue,

    /// `Book` is returned.
    #[serde(rename = "DEVOLVIDO")]
    Returned,
}

impl From<domain::loan::Status> for Status {
    fn from(status: domain::loan::Status) -> Self {
        use domain::loan::Status as S;

        match status {
            S::Pending => Self::Pending,
            S::Active => Self::Active,
            S::Overdue => Self::Overdue,
            S::Returned => Self::Returned,
        }
    }
}

/// Loads the [`domain::Loan`] with the provided ID.
///
/// # Errors
///
/// If the [`domain::Loan`] does not exist.
pub(crate) async fn find(
    ctx: &Context,
    loan_id: domain::loan::Id,
) -> Result<domain::Loan, Error> {
    ctx.service()
        .execute(query::loan::ById::by(loan_id))
        .await
        .map_err(AsError::into_error)?
        .ok_or_else(|| api::NotExistsError::Loan.into())
}

/// Filter of the [`list`]ed [`Loan`]s.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListParams {
    /// ID of the member to filter by.
    #[serde(rename = "usuarioId")]
    pub member_id: Option<domain::user::Id>,

    /// ID of the `Book` to filter by.
    #[serde(rename = "livroId")]
    pub book_id: Option<domain::book::Id>,

    /// Whether only not returned [`Loan`]s should be listed.
    #[serde(rename = "emAberto")]
    pub outstanding: bool,
}

/// Lists all the [`Loan`]s.
///
/// # Errors
///
/// If the authenticated `User` is not an administrator.
#[tracing::instrument(skip_all)]
pub async fn list(
    ctx: Context,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<Loan>>, Error> {
    _ = ctx.admin_session().await?;
    let Query(ListParams {
        member_id,
        book_id,
        outstanding,
    }) = params?;

    let loans = ctx
        .service()
        .execute(query::loans::List::by(read::loan::list::Filter {
            member_id,
            book_id,
            outstanding,
        }))
        .await
        .map_err(AsError::into_error)?;

    Loan::expand(&ctx, loans).await.map(Json)
}

/// Lists the [`Loan`]s of the authenticated member.
///
/// # Errors
///
/// If the request is not authenticated.
#[tracing::instrument(skip_all)]
pub async fn mine(ctx: Context) -> Result<Json<Vec<Loan>>, Error> {
    let member_id = ctx.current_session().await?.user.id;

    let loans = ctx
        .service()
        .execute(query::loans::List::by(read::loan::list::Filter {
            member_id: Some(member_id),
            ..read::loan::list::Filter::default()
        }))
        .await
        .map_err(AsError::into_error)?;

    Loan::expand(&ctx, loans).await.map(Json)
}

/// Returns the [`Loan`] with the provided ID.
///
/// # Errors
///
/// If the [`Loan`] does not exist or belongs to another member.
#[tracing::instrument(skip_all, fields(loan.id))]
pub async fn get(
    ctx: Context,
    id: Result<Path<domain::loan::Id>, PathRejection>,
) -> Result<Json<Loan>, Error> {
    let Path(loan_id) = id?;
    _ = tracing::Span::current()
        .record("loan.id", tracing::field::display(loan_id));

    let loan = find(&ctx, loan_id).await?;
    _ = ctx.owner_session(loan.member_id).await?;

    Loan::expand_one(&ctx, loan).await.map(Json)
}

/// Body of a [`checkout`] request.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct CheckoutRequest {
    /// ID of the member borrowing the `Book`.
    #[serde(rename = "usuarioId")]
    pub member_id: domain::user::Id,

    /// ID of the `Book` to borrow.
    #[serde(rename = "livroId")]
    pub book_id: domain::book::Id,
}

/// Lends a copy of a `Book` to a member at the desk.
///
/// # Errors
///
/// See [`request`] for the possible error codes.
#[tracing::instrument(skip_all)]
pub async fn checkout(
    ctx: Context,
    req: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<Json<Loan>, Error> {
    _ = ctx.admin_session().await?;
    let Json(CheckoutRequest { member_id, book_id }) = req?;

    let loan = ctx
        .service()
        .execute(command::CheckoutLoan { member_id, book_id })
        .await
        .map_err(AsError::into_error)?;

    Loan::expand_one(&ctx, loan).await.map(Json)
}

/// Body of a [`request`].
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct RequestBody {
    /// ID of the `Book` to borrow.
    #[serde(rename = "livroId")]
    pub book_id: domain::book::Id,
}

/// Requests a copy of a `Book` for the authenticated member.
///
/// # Errors
///
/// Possible error codes:
/// - `DUPLICATE_LOAN` - the member has this `Book` borrowed already;
/// - `INVENTORY_UNAVAILABLE` - no copies are on the shelves;
/// - `MEMBER_BLOCKED` - the member is blocked, owes fines or has overdue
///   loans;
/// - `RESERVATION_CONFLICT` - free copies are held for other members.
#[tracing::instrument(skip_all)]
pub async fn request(
    ctx: Context,
    req: Result<Json<RequestBody>, JsonRejection>,
) -> Result<Json<Loan>, Error> {
    let member_id = ctx.current_session().await?.user.id;
    let Json(RequestBody { book_id }) = req?;

    let loan = ctx
        .service()
        .execute(command::RequestLoan { member_id, book_id })
        .await
        .map_err(AsError::into_error)?;

    Loan::expand_one(&ctx, loan).await.map(Json)
}

/// Approves the pending [`Loan`] with the provided ID.
///
/// # Errors
///
/// Possible error codes:
/// - `INVALID_STATE_TRANSITION` - the [`Loan`] is not pending;
/// - `INVENTORY_UNAVAILABLE` - no copies are on the shelves;
/// - `RESERVATION_CONFLICT` - the copies are held for other members.
#[tracing::instrument(skip_all, fields(loan.id))]
pub async fn approve(
    ctx: Context,
    id: Result<Path<domain::loan::Id>, PathRejection>,
) -> Result<Json<Loan>, Error> {
    _ = ctx.admin_session().await?;
    let Path(loan_id) = id?;
    _ = tracing::Span::current()
        .record("loan.id", tracing::field::display(loan_id));

    let loan = ctx
        .service()
        .execute(command::ApproveLoan { loan_id })
        .await
        .map_err(AsError::into_error)?;

    Loan::expand_one(&ctx, loan).await.map(Json)
}

/// Renews the [`Loan`] with the provided ID.
///
/// # Errors
///
/// Possible error codes:
/// - `RENEWAL_LIMIT_EXCEEDED` - the [`Loan`] can't be renewed anymore;
/// - `RESERVATION_CONFLICT` - other members are waiting for the `Book`.
#[tracing::instrument(skip_all, fields(loan.id))]
pub async fn renew(
    ctx: Context,
    id: Result<Path<domain::loan::Id>, PathRejection>,
) -> Result<Json<Loan>, Error> {
    let Path(loan_id) = id?;
    _ = tracing::Span::current()
        .record("loan.id", tracing::field::display(loan_id));

    let owner_id = find(&ctx, loan_id).await?.member_id;
    _ = ctx.owner_session(owner_id).await?;

    let loan = ctx
        .service()
        .execute(command::RenewLoan { loan_id })
        .await
        .map_err(AsError::into_error)?;

    Loan::expand_one(&ctx, loan).await.map(Json)
}

/// Registers the return of the [`Loan`] with the provided ID.
///
/// # Errors
///
/// Possible error codes:
/// - `INVALID_STATE_TRANSITION` - the `Book` is not lent.
#[tracing::instrument(skip_all, fields(loan.id))]
pub async fn return_book(
    ctx: Context,
    id: Result<Path<domain::loan::Id>, PathRejection>,
) -> Result<Json<Loan>, Error> {
    _ = ctx.admin_session().await?;
    let Path(loan_id) = id?;
    _ = tracing::Span::current()
        .record("loan.id", tracing::field::display(loan_id));

    let loan = ctx
        .service()
        .execute(command::ReturnLoan { loan_id })
        .await
        .map_err(AsError::into_error)?;

    Loan::expand_one(&ctx, loan).await.map(Json)
}

define_error! {
    enum TransitionError {
        #[code = "ALREADY_PAID"]
        #[status = CONFLICT]
        #[message = "`Fine` is paid already"]
        AlreadyPaid,

        #[code = "INVALID_STATE_TRANSITION"]
        #[status = CONFLICT]
        #[message = "`Loan` status doesn't allow this action"]
        InvalidStateTransition,

        #[code = "LOAN_OUTSTANDING"]
        #[status = UNPROCESSABLE_ENTITY]
        #[message = "`Loan` is not returned yet"]
        Outstanding,

        #[code = "RENEWAL_LIMIT_EXCEEDED"]
        #[status = UNPROCESSABLE_ENTITY]
        #[message = "`Loan` has been renewed the maximum number of times"]
        RenewalLimitExceeded,
    }
}

impl AsError for domain::loan::Error {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::AlreadyPaid => TransitionError::AlreadyPaid.into(),
            Self::InvalidStateTransition { .. } => {
                TransitionError::InvalidStateTransition.into()
            }
            Self::NothingDue => api::RuleError::NothingDue.into(),
            Self::Outstanding => TransitionError::Outstanding.into(),
            Self::RenewalLimitExceeded { .. } => {
                TransitionError::RenewalLimitExceeded.into()
            }
        })
    }
}

impl AsError for command::request_loan::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        use api::{NotExistsError as NotExists, RuleError as Rule};

        match self {
            Self::BookNotExists(_) => Some(NotExists::Book.into()),
            Self::Db(e) => e.try_as_error(),
            Self::DuplicateLoan(_) => Some(Rule::DuplicateLoan.into()),
            Self::InventoryUnavailable(_) => {
                Some(Rule::InventoryUnavailable.into())
            }
            Self::Loan(e) => e.try_as_error(),
            Self::MemberBlocked(_) => Some(Rule::MemberBlocked.into()),
            Self::MemberNotExists(_) => Some(NotExists::Member.into()),
            Self::ReservationConflict(_) => {
                Some(Rule::ReservationConflict.into())
            }
            Self::Reservation(e) => e.try_as_error(),
        }
    }
}

impl AsError for command::approve_loan::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::BookNotExists(_) => Some(api::NotExistsError::Book.into()),
            Self::Db(e) => e.try_as_error(),
            Self::InventoryUnavailable(_) => {
                Some(api::RuleError::InventoryUnavailable.into())
            }
            Self::Loan(e) => e.try_as_error(),
            Self::LoanNotExists(_) => Some(api::NotExistsError::Loan.into()),
            Self::ReservationConflict(_) => {
                Some(api::RuleError::ReservationConflict.into())
            }
            Self::Reservation(e) => e.try_as_error(),
        }
    }
}

impl AsError for command::renew_loan::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::Loan(e) => e.try_as_error(),
            Self::LoanNotExists(_) => Some(api::NotExistsError::Loan.into()),
            Self::ReservationConflict(_) => {
                Some(api::RuleError::ReservationConflict.into())
            }
        }
    }
}

impl AsError for command::return_loan::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::BookNotExists(_) => Some(api::NotExistsError::Book.into()),
            Self::Db(e) => e.try_as_error(),
            Self::Inventory(e) => e.try_as_error(),
            Self::Loan(e) => e.try_as_error(),
            Self::LoanNotExists(_) => Some(api::NotExistsError::Loan.into()),
        }
    }
}

#[cfg(test)]
mod spec {
    use service::domain::loan::{self, Action};

    use crate::AsError as _;

    use super::Status;

    #[test]
    fn maps_transition_errors() {
        let err = loan::Error::InvalidStateTransition {
            from: loan::Status::Returned,
            action: Action::Renew,
        }
        .try_as_error()
        .unwrap();
        assert_eq!(err.code, "INVALID_STATE_TRANSITION");
        assert_eq!(err.status_code, http::StatusCode::CONFLICT);

        let err = loan::Error::RenewalLimitExceeded { max: 2 }
            .try_as_error()
            .unwrap();
        assert_eq!(err.code, "RENEWAL_LIMIT_EXCEEDED");
        assert_eq!(err.status_code, http::StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn serializes_status_in_portuguese() {
        let json = serde_json::to_string(&[
            Status::from(loan::Status::Pending),
            loan::Status::Active.into(),
            loan::Status::Overdue.into(),
            loan::Status::Returned.into(),
        ])
        .unwrap();

        assert_eq!(json, r#"["PENDENTE","ATIVO","ATRASADO","DEVOLVIDO"]"#);
    }
}
