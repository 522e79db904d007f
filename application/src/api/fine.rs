//! `Fine`-related definitions.

use axum::{
    extract::{rejection::PathRejection, Path},
    Json,
};
use common::{datetime::serde::rfc3339, DateTime, Money};
use rust_decimal::Decimal;
use serde::Serialize;
use service::{command, domain, query, read, Command as _};

use crate::{api, AsError, Context, Error};

/// Fine accrued by a late `Loan`.
#[derive(Clone, Debug, Serialize)]
pub struct Fine {
    /// Amount of this [`Fine`].
    #[serde(rename = "valor", with = "rust_decimal::serde::float")]
    pub amount: Decimal,

    /// Currency of the [`Fine::amount`].
    #[serde(rename = "moeda")]
    pub currency: String,

    /// Number of calendar days the `Loan` is (or was) late.
    #[serde(rename = "diasAtraso")]
    pub days_late: u32,

    /// Indicator whether this [`Fine`] is paid.
    #[serde(rename = "pago")]
    pub paid: bool,
}

impl From<read::fine::Statement> for Fine {
    fn from(statement: read::fine::Statement) -> Self {
        let Money { amount, currency } = statement.amount;
        Self {
            amount,
            currency: currency.to_string(),
            days_late: statement.days_late,
            paid: statement.paid,
        }
    }
}

/// Record of the settled [`Fine`]s.
#[derive(Clone, Debug, Serialize)]
pub struct Payment {
    /// IDs of the `Loan`s whose [`Fine`]s are settled.
    #[serde(rename = "emprestimos")]
    pub loan_ids: Vec<domain::loan::Id>,

    /// Total amount paid.
    #[serde(rename = "valorTotal", with = "rust_decimal::serde::float")]
    pub total: Decimal,

    /// Currency of the [`Payment::total`].
    #[serde(rename = "moeda")]
    pub currency: String,

    /// [`DateTime`] of this [`Payment`].
    #[serde(rename = "dataPagamento", with = "rfc3339")]
    pub paid_at: DateTime,
}

impl From<read::fine::Payment> for Payment {
    fn from(payment: read::fine::Payment) -> Self {
        let Money { amount, currency } = payment.total;
        Self {
            loan_ids: payment.loan_ids,
            total: amount,
            currency: currency.to_string(),
            paid_at: payment.paid_at.coerce(),
        }
    }
}

/// Returns the [`Fine`] of the `Loan` with the provided ID.
///
/// # Errors
///
/// If the `Loan` does not exist or belongs to another member.
#[tracing::instrument(skip_all, fields(loan.id))]
pub async fn get(
    ctx: Context,
    id: Result<Path<domain::loan::Id>, PathRejection>,
) -> Result<Json<Fine>, Error> {
    let Path(loan_id) = id?;
    _ = tracing::Span::current()
        .record("loan.id", tracing::field::display(loan_id));

    let owner_id = api::loan::find(&ctx, loan_id).await?.member_id;
    _ = ctx.owner_session(owner_id).await?;

    ctx.service()
        .execute(query::fine::Compute { loan_id })
        .await
        .map_err(AsError::into_error)?
        .map(|s| Json(s.into()))
        .ok_or_else(|| api::NotExistsError::Loan.into())
}

/// Marks the [`Fine`] of the returned `Loan` with the provided ID as paid.
///
/// # Errors
///
/// Possible error codes:
/// - `ALREADY_PAID` - the [`Fine`] is paid already;
/// - `LOAN_OUTSTANDING` - the `Book` is not returned yet;
/// - `NOTHING_DUE` - the `Loan` was returned in time.
#[tracing::instrument(skip_all, fields(loan.id))]
pub async fn settle_by_loan(
    ctx: Context,
    id: Result<Path<domain::loan::Id>, PathRejection>,
) -> Result<Json<Payment>, Error> {
    _ = ctx.admin_session().await?;
    let Path(loan_id) = id?;
    _ = tracing::Span::current()
        .record("loan.id", tracing::field::display(loan_id));

    ctx.service()
        .execute(command::SettleFine::ByLoan(loan_id))
        .await
        .map(|p| Json(p.into()))
        .map_err(AsError::into_error)
}

/// Marks all the [`Fine`]s of returned `Loan`s of the member with the
/// provided ID as paid.
///
/// # Errors
///
/// Possible error codes:
/// - `NOTHING_DUE` - the member owes nothing.
#[tracing::instrument(skip_all, fields(user.id))]
pub async fn settle_by_member(
    ctx: Context,
    id: Result<Path<domain::user::Id>, PathRejection>,
) -> Result<Json<Payment>, Error> {
    _ = ctx.admin_session().await?;
    let Path(member_id) = id?;
    _ = tracing::Span::current()
        .record("user.id", tracing::field::display(member_id));

    ctx.service()
        .execute(command::SettleFine::ByMember(member_id))
        .await
        .map(|p| Json(p.into()))
        .map_err(AsError::into_error)
}

impl AsError for command::settle_fine::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::Loan(e) => e.try_as_error(),
            Self::LoanNotExists(_) => Some(api::NotExistsError::Loan.into()),
            Self::MemberNotExists(_) => {
                Some(api::NotExistsError::Member.into())
            }
            Self::NothingDue(_) => Some(api::RuleError::NothingDue.into()),
        }
    }
}

#[cfg(test)]
mod spec {
    use common::{money::Currency, DateTime, Money};
    use rust_decimal::Decimal;
    use service::{domain::loan, read};

    use super::{Fine, Payment};

    #[test]
    fn renders_amounts_as_numbers() {
        let fine = Fine::from(read::fine::Statement {
            loan_id: loan::Id::new(),
            amount: Money {
                amount: Decimal::from(300),
                currency: Currency::Aoa,
            },
            days_late: 6,
            paid: false,
        });

        assert_eq!(
            serde_json::to_value(&fine).unwrap(),
            serde_json::json!({
                "valor": 300.0,
                "moeda": "AOA",
                "diasAtraso": 6,
                "pago": false,
            }),
        );
    }

    #[test]
    fn lists_settled_loans() {
        let id = loan::Id::new();
        let payment = Payment::from(read::fine::Payment {
            loan_ids: vec![id],
            total: Money {
                amount: Decimal::from(150),
                currency: Currency::Aoa,
            },
            paid_at: DateTime::UNIX_EPOCH.coerce(),
        });

        let json = serde_json::to_value(&payment).unwrap();
        assert_eq!(json["emprestimos"][0], id.to_string());
        assert_eq!(json["valorTotal"], 150.0);
        assert_eq!(json["dataPagamento"], "1970-01-01T00:00:00Z");
    }
}
