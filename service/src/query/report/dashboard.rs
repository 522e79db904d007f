//! [`Dashboard`] definition.

use std::{collections::HashMap, fmt};

use common::{
    operations::{By, Select},
    DateTime, DateTimeOf, Money, Percent,
};
use tracerr::Traced;

use crate::{
    domain::{
        book, category, loan, user, Book, Category, Loan, Policy,
        Reservation, User,
    },
    infra::{database, Database},
    read, Query, Service,
};

/// Number of months [`Output::loans_per_month`] covers.
const MONTHS: i32 = 6;

/// Number of entries in the top lists of the [`Output`].
const TOP: usize = 5;

/// [`Query`] aggregating the current state of the library.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Dashboard;

/// Output of the [`Dashboard`] [`Query`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Output {
    /// Total number of [`Loan`]s ever requested.
    pub loans_total: usize,

    /// Number of [`loan::Status::Active`] [`Loan`]s.
    pub loans_active: usize,

    /// Number of [`loan::Status::Overdue`] [`Loan`]s.
    pub loans_overdue: usize,

    /// Number of [`loan::Status::Pending`] [`Loan`]s.
    pub loans_pending: usize,

    /// Number of [`Loan`]s returned within the current month.
    pub returns_this_month: usize,

    /// Number of [`Book`]s in the catalog.
    pub books_total: usize,

    /// Number of [`Book`]s having at least one copy on the shelves.
    pub books_available: usize,

    /// Number of [`Book`]s having all their copies lent.
    pub books_lent: usize,

    /// Number of members.
    pub members_total: usize,

    /// Number of [`user::Status::Active`] members.
    pub members_active: usize,

    /// Number of [`user::Status::Blocked`] members.
    pub members_blocked: usize,

    /// Sum of the fines not paid yet, accruing ones included.
    pub fines_pending: Money,

    /// Sum of the paid fines.
    pub fines_paid: Money,

    /// Number of active [`Reservation`]s.
    pub reservations_active: usize,

    /// Number of [`Loan`]s requested in each of the last months, the current
    /// one being the last.
    pub loans_per_month: Vec<MonthTotal>,

    /// [`Category`]s with the most [`Loan`]s.
    pub popular_categories: Vec<CategoryShare>,

    /// [`Book`]s with the most [`Loan`]s.
    pub most_lent_books: Vec<BookLoans>,
}

/// Calendar month of a year.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Month {
    /// Year of this [`Month`].
    pub year: i32,

    /// Number of this [`Month`] in its year, starting from `1`.
    pub number: u8,
}

impl Month {
    /// Returns the [`Month`] of the provided moment.
    #[must_use]
    pub fn of<Of: ?Sized>(at: DateTimeOf<Of>) -> Self {
        let date = at.date();
        Self {
            year: date.year(),
            number: u8::from(date.month()),
        }
    }

    /// Returns the [`Month`] being `n` months before this one.
    #[must_use]
    pub fn back(self, n: i32) -> Self {
        let idx = self.year * 12 + i32::from(self.number) - 1 - n;
        Self {
            year: idx.div_euclid(12),
            number: u8::try_from(idx.rem_euclid(12) + 1).unwrap_or(1),
        }
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.number)
    }
}

/// Number of [`Loan`]s requested in a [`Month`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MonthTotal {
    /// [`Month`] the [`Loan`]s were requested in.
    pub month: Month,

    /// Number of the requested [`Loan`]s.
    pub total: usize,
}

/// Share of [`Loan`]s falling on a [`Category`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CategoryShare {
    /// Name of the [`Category`].
    pub name: category::Name,

    /// Number of [`Loan`]s of the [`Book`]s in the [`Category`].
    pub total: usize,

    /// [`Percent`] of all the [`Loan`]s.
    pub pct: Percent,
}

/// Number of [`Loan`]s of a [`Book`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BookLoans {
    /// Title of the [`Book`].
    pub title: book::Title,

    /// Number of [`Loan`]s of the [`Book`].
    pub loans: usize,
}

impl<Db> Query<Dashboard> for Service<Db>
where
    Db: Database<
            Select<By<Vec<Loan>, read::loan::list::Filter>>,
            Ok = Vec<Loan>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Book>, read::book::list::Filter>>,
            Ok = Vec<Book>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<User>, read::user::list::Filter>>,
            Ok = Vec<User>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Reservation>, read::reservation::list::Filter>>,
            Ok = Vec<Reservation>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Category>, ()>>,
            Ok = Vec<Category>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = Output;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Dashboard) -> Result<Self::Ok, Self::Err> {
        let db = self.database();
        let loans = db
            .execute(Select(By::<Vec<Loan>, _>::new(
                read::loan::list::Filter::default(),
            )))
            .await
            .map_err(tracerr::wrap!())?;
        let books = db
            .execute(Select(By::<Vec<Book>, _>::new(
                read::book::list::Filter::default(),
            )))
            .await
            .map_err(tracerr::wrap!())?;
        let members = db
            .execute(Select(By::<Vec<User>, _>::new(
                read::user::list::Filter {
                    role: Some(user::Role::Member),
                    ..read::user::list::Filter::default()
                },
            )))
            .await
            .map_err(tracerr::wrap!())?;
        let reservations = db
            .execute(Select(By::<Vec<Reservation>, _>::new(
                read::reservation::list::Filter {
                    active_only: true,
                    ..read::reservation::list::Filter::default()
                },
            )))
            .await
            .map_err(tracerr::wrap!())?;
        let categories = db
            .execute(Select(By::<Vec<Category>, _>::new(())))
            .await
            .map_err(tracerr::wrap!())?;

        Ok(aggregate(
            DateTime::now(),
            &self.config().policy,
            &loans,
            &books,
            &members,
            reservations.len(),
            &categories,
        ))
    }
}

/// Aggregates the provided library state into an [`Output`] as of `now`.
fn aggregate(
    now: DateTime,
    policy: &Policy,
    loans: &[Loan],
    books: &[Book],
    members: &[User],
    reservations_active: usize,
    categories: &[Category],
) -> Output {
    let count_loans = |status: loan::Status| {
        loans.iter().filter(|l| l.status_at(now) == status).count()
    };
    let this_month = Month::of(now);

    let currency = policy.fine_per_day.currency;
    let fines_paid = Money {
        amount: loans
            .iter()
            .filter(|l| l.fine.paid_at.is_some())
            .filter(|l| l.fine.amount.currency == currency)
            .map(|l| l.fine.amount.amount)
            .sum(),
        currency,
    };

    let mut per_month = HashMap::<Month, usize>::new();
    for l in loans {
        *per_month.entry(Month::of(l.requested_at)).or_default() += 1;
    }
    let loans_per_month = (0..MONTHS)
        .rev()
        .map(|n| {
            let month = this_month.back(n);
            MonthTotal {
                month,
                total: per_month.get(&month).copied().unwrap_or_default(),
            }
        })
        .collect();

    let books_by_id =
        books.iter().map(|b| (b.id, b)).collect::<HashMap<_, _>>();
    let mut per_book = HashMap::<book::Id, usize>::new();
    for l in loans {
        *per_book.entry(l.book_id).or_default() += 1;
    }
    let mut most_lent_books = per_book
        .iter()
        .filter_map(|(id, n)| {
            books_by_id.get(id).map(|b| BookLoans {
                title: b.title.clone(),
                loans: *n,
            })
        })
        .collect::<Vec<_>>();
    most_lent_books.sort_by(|a, b| {
        b.loans
            .cmp(&a.loans)
            .then_with(|| {
                AsRef::<str>::as_ref(&a.title)
                    .cmp(AsRef::<str>::as_ref(&b.title))
            })
    });
    most_lent_books.truncate(TOP);

    let mut per_category = HashMap::<category::Id, usize>::new();
    for (id, n) in &per_book {
        if let Some(b) = books_by_id.get(id) {
            *per_category.entry(b.category_id).or_default() += n;
        }
    }
    let lent_total = per_category.values().sum::<usize>();
    let mut popular_categories = categories
        .iter()
        .filter_map(|c| {
            let total = per_category.get(&c.id).copied()?;
            Some(CategoryShare {
                name: c.name.clone(),
                total,
                pct: Percent::of(as_u64(total), as_u64(lent_total))?,
            })
        })
        .collect::<Vec<_>>();
    popular_categories.sort_by(|a, b| {
        b.total
            .cmp(&a.total)
            .then_with(|| {
                AsRef::<str>::as_ref(&a.name)
                    .cmp(AsRef::<str>::as_ref(&b.name))
            })
    });
    popular_categories.truncate(TOP);

    let books_available =
        books.iter().filter(|b| b.copies.available() > 0).count();

    Output {
        loans_total: loans.len(),
        loans_active: count_loans(loan::Status::Active),
        loans_overdue: count_loans(loan::Status::Overdue),
        loans_pending: count_loans(loan::Status::Pending),
        returns_this_month: loans
            .iter()
            .filter_map(|l| l.returned_at)
            .filter(|at| Month::of(*at) == this_month)
            .count(),
        books_total: books.len(),
        books_available,
        books_lent: books.len() - books_available,
        members_total: members.len(),
        members_active: members
            .iter()
            .filter(|m| m.status == user::Status::Active)
            .count(),
        members_blocked: members.iter().filter(|m| m.is_blocked()).count(),
        fines_pending: loan::unpaid_fines_at(loans, now, policy),
        fines_paid,
        reservations_active,
        loans_per_month,
        popular_categories,
        most_lent_books,
    }
}

/// Converts the provided counter into [`u64`].
fn as_u64(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod spec {
    use common::{operations::Insert, DateTime};
    use rust_decimal::Decimal;

    use crate::{
        command::{
            spec, CheckoutLoan, CreateCategory, RequestLoan, ReturnLoan,
        },
        domain::{category, user},
        infra::{Database as _, Memory},
        Query as _, Service,
    };

    use super::{Dashboard, Month};

    #[test]
    fn steps_months_back_over_years() {
        let march = Month {
            year: 2025,
            number: 3,
        };

        assert_eq!(march.back(0), march);
        assert_eq!(
            march.back(2),
            Month {
                year: 2025,
                number: 1,
            },
        );
        assert_eq!(
            march.back(3),
            Month {
                year: 2024,
                number: 12,
            },
        );
        assert_eq!(march.back(15).to_string(), "2023-12");
    }

    #[tokio::test]
    async fn aggregates_library_state() {
        let svc = Service::for_tests(Memory::new());
        let category = svc
            .execute(CreateCategory {
                name: category::Name::new("Romance").unwrap(),
                description: None,
            })
            .await
            .unwrap();
        let mut popular = spec::book(1);
        popular.category_id = category.id;
        let mut other = spec::book(2);
        other.isbn = "0-306-40615-2".parse().unwrap();
        other.category_id = category.id;
        let (m1, m2) = (spec::member(1), spec::member(2));
        let mut blocked = spec::member(3);
        blocked.status = user::Status::Blocked;
        for b in [&popular, &other] {
            svc.database().execute(Insert(b.clone())).await.unwrap();
        }
        for m in [&m1, &m2, &blocked] {
            svc.database().execute(Insert(m.clone())).await.unwrap();
        }

        let returned = svc
            .execute(CheckoutLoan {
                member_id: m1.id,
                book_id: popular.id,
            })
            .await
            .unwrap();
        _ = svc
            .execute(ReturnLoan {
                loan_id: returned.id,
            })
            .await
            .unwrap();
        _ = svc
            .execute(CheckoutLoan {
                member_id: m2.id,
                book_id: popular.id,
            })
            .await
            .unwrap();
        _ = svc
            .execute(RequestLoan {
                member_id: m1.id,
                book_id: other.id,
            })
            .await
            .unwrap();

        let report = svc.execute(Dashboard).await.unwrap();

        assert_eq!(report.loans_total, 3);
        assert_eq!(report.loans_active, 1);
        assert_eq!(report.loans_pending, 1);
        assert_eq!(report.loans_overdue, 0);
        assert_eq!(report.returns_this_month, 1);
        assert_eq!(
            (report.books_total, report.books_available, report.books_lent),
            (2, 1, 1),
        );
        assert_eq!(
            (
                report.members_total,
                report.members_active,
                report.members_blocked,
            ),
            (3, 2, 1),
        );
        assert!(report.fines_pending.is_zero());
        assert!(report.fines_paid.is_zero());

        assert_eq!(report.loans_per_month.len(), 6);
        let current = report.loans_per_month.last().unwrap();
        assert_eq!(current.month, Month::of(DateTime::now()));
        assert_eq!(current.total, 3);

        assert_eq!(report.popular_categories.len(), 1);
        assert_eq!(report.popular_categories[0].total, 3);
        assert_eq!(
            report.popular_categories[0].pct.value(),
            Decimal::ONE_HUNDRED,
        );

        assert_eq!(report.most_lent_books.len(), 2);
        assert_eq!(report.most_lent_books[0].title, popular.title);
        assert_eq!(report.most_lent_books[0].loans, 2);
    }
}
