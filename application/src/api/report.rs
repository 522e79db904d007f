//! Reports over the library state.

use axum::Json;
use rust_decimal::Decimal;
use serde::Serialize;
use service::{query, Query as _};

use crate::{AsError, Context, Error};

/// Aggregated figures of the library for the administrators' dashboard.
#[derive(Clone, Debug, Serialize)]
pub struct Dashboard {
    /// Number of all the `Loan`s ever made.
    #[serde(rename = "emprestimosTotal")]
    pub loans_total: usize,

    /// Number of `Loan`s lent and not due yet.
    #[serde(rename = "emprestimosAtivos")]
    pub loans_active: usize,

    /// Number of `Loan`s past their due date.
    #[serde(rename = "emprestimosAtrasados")]
    pub loans_overdue: usize,

    /// Number of `Loan`s waiting for an approval.
    #[serde(rename = "emprestimosPendentes")]
    pub loans_pending: usize,

    /// Number of `Book`s returned within the current month.
    #[serde(rename = "devolucoesMes")]
    pub returns_this_month: usize,

    /// Number of `Book` titles in the catalog.
    #[serde(rename = "livrosTotal")]
    pub books_total: usize,

    /// Number of `Book` copies on the shelves.
    #[serde(rename = "livrosDisponiveis")]
    pub books_available: usize,

    /// Number of `Book` titles with no copy on the shelves.
    #[serde(rename = "livrosEmprestados")]
    pub books_lent: usize,

    /// Number of members.
    #[serde(rename = "membrosTotal")]
    pub members_total: usize,

    /// Number of active members.
    #[serde(rename = "membrosAtivos")]
    pub members_active: usize,

    /// Number of blocked members.
    #[serde(rename = "membrosBloqueados")]
    pub members_blocked: usize,

    /// Total amount of unpaid fines.
    #[serde(
        rename = "multasTotalPendentes",
        with = "rust_decimal::serde::float"
    )]
    pub fines_pending: Decimal,

    /// Total amount of paid fines.
    #[serde(rename = "multasTotalPagas", with = "rust_decimal::serde::float")]
    pub fines_paid: Decimal,

    /// Number of active `Reservation`s.
    #[serde(rename = "reservasAtivas")]
    pub reservations_active: usize,

    /// Number of `Loan`s requested in each of the last months.
    #[serde(rename = "emprestimosPorMes")]
    pub loans_per_month: Vec<MonthTotal>,

    /// Most borrowed `Category`s.
    #[serde(rename = "categoriasMaisPopulares")]
    pub popular_categories: Vec<CategoryShare>,

    /// Most borrowed `Book`s.
    #[serde(rename = "livrosMaisEmprestados")]
    pub most_lent_books: Vec<BookLoans>,
}

impl From<query::report::dashboard::Output> for Dashboard {
    fn from(out: query::report::dashboard::Output) -> Self {
        Self {
            loans_total: out.loans_total,
            loans_active: out.loans_active,
            loans_overdue: out.loans_overdue,
            loans_pending: out.loans_pending,
            returns_this_month: out.returns_this_month,
            books_total: out.books_total,
            books_available: out.books_available,
            books_lent: out.books_lent,
            members_total: out.members_total,
            members_active: out.members_active,
            members_blocked: out.members_blocked,
            fines_pending: out.fines_pending.amount,
            fines_paid: out.fines_paid.amount,
            reservations_active: out.reservations_active,
            loans_per_month: out
                .loans_per_month
                .into_iter()
                .map(|m| MonthTotal {
                    month: m.month.to_string(),
                    total: m.total,
                })
                .collect(),
            popular_categories: out
                .popular_categories
                .into_iter()
                .map(|c| CategoryShare {
                    name: c.name.to_string(),
                    total: c.total,
                    pct: c.pct.value(),
                })
                .collect(),
            most_lent_books: out
                .most_lent_books
                .into_iter()
                .map(|b| BookLoans {
                    title: b.title.to_string(),
                    loans: b.loans,
                })
                .collect(),
        }
    }
}

/// Number of `Loan`s requested within a month.
#[derive(Clone, Debug, Serialize)]
pub struct MonthTotal {
    /// Month in `YYYY-MM` format.
    #[serde(rename = "mes")]
    pub month: String,

    /// Number of `Loan`s.
    pub total: usize,
}

/// Share of a `Category` in all the `Loan`s.
#[derive(Clone, Debug, Serialize)]
pub struct CategoryShare {
    /// Name of the `Category`.
    #[serde(rename = "nome")]
    pub name: String,

    /// Number of `Loan`s of the `Category` `Book`s.
    pub total: usize,

    /// Percentage of all the `Loan`s.
    #[serde(with = "rust_decimal::serde::float")]
    pub pct: Decimal,
}

/// Number of `Loan`s of a single `Book`.
#[derive(Clone, Debug, Serialize)]
pub struct BookLoans {
    /// Title of the `Book`.
    #[serde(rename = "titulo")]
    pub title: String,

    /// Number of `Loan`s.
    #[serde(rename = "emprestimos")]
    pub loans: usize,
}

/// Returns the [`Dashboard`] report.
///
/// # Errors
///
/// If the authenticated `User` is not an administrator.
#[tracing::instrument(skip_all)]
pub async fn dashboard(ctx: Context) -> Result<Json<Dashboard>, Error> {
    _ = ctx.admin_session().await?;

    ctx.service()
        .execute(query::report::Dashboard)
        .await
        .map(|out| Json(out.into()))
        .map_err(AsError::into_error)
}
