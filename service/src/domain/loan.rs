//! [`Loan`] definitions.

use common::{unit, DateTime, DateTimeOf, Money};
use derive_more::{Display, Error as StdError, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(doc)]
use crate::domain::{Book, User};
use crate::domain::{book, user, Policy};

/// Checkout of a [`Book`] copy by a member.
///
/// [`Status`] of a [`Loan`] is never stored, but derived from its dates on
/// every read, so an overdue [`Loan`] becomes [`Status::Overdue`] without any
/// write.
#[derive(Clone, Debug)]
pub struct Loan {
    /// ID of this [`Loan`].
    pub id: Id,

    /// ID of the borrowed [`Book`].
    pub book_id: book::Id,

    /// ID of the [`User`] borrowing the [`Book`].
    pub member_id: user::Id,

    /// [`DateTime`] when this [`Loan`] was requested.
    pub requested_at: RequestDateTime,

    /// [`Term`] of this [`Loan`], once it's approved.
    pub term: Option<Term>,

    /// Number of times this [`Loan`] was renewed.
    pub renewals: u8,

    /// [`DateTime`] when the [`Book`] was returned, if it was.
    pub returned_at: Option<ReturnDateTime>,

    /// [`Fine`] charged for this [`Loan`].
    pub fine: Fine,
}

impl Loan {
    /// Creates a new [`Status::Pending`] [`Loan`] requested by a member.
    #[must_use]
    pub fn request(
        book_id: book::Id,
        member_id: user::Id,
        policy: &Policy,
    ) -> Self {
        Self {
            id: Id::new(),
            book_id,
            member_id,
            requested_at: RequestDateTime::now(),
            term: None,
            renewals: 0,
            returned_at: None,
            fine: Fine {
                amount: Money::zero(policy.fine_per_day.currency),
                paid_at: None,
            },
        }
    }

    /// Returns the current [`Status`] of this [`Loan`].
    #[must_use]
    pub fn status(&self) -> Status {
        self.status_at(DateTime::now())
    }

    /// Returns [`Status`] of this [`Loan`] at the provided moment.
    ///
    /// A [`Loan`] is overdue since the first calendar day after its due date.
    #[must_use]
    pub fn status_at<Of: ?Sized>(&self, now: DateTimeOf<Of>) -> Status {
        if self.returned_at.is_some() {
            return Status::Returned;
        }
        match self.term {
            None => Status::Pending,
            Some(term) if now.days_since(term.due_at) > 0 => Status::Overdue,
            Some(_) => Status::Active,
        }
    }

    /// Indicates whether this [`Loan`] is not returned yet.
    #[must_use]
    pub fn is_outstanding(&self) -> bool {
        self.returned_at.is_none()
    }

    /// Returns the number of whole calendar days this [`Loan`] is late at the
    /// provided moment (or was late when returned).
    #[must_use]
    pub fn days_late_at<Of: ?Sized>(&self, now: DateTimeOf<Of>) -> u32 {
        let Some(term) = self.term else {
            return 0;
        };
        let days = match self.returned_at {
            Some(returned_at) => returned_at.days_since(term.due_at),
            None => now.days_since(term.due_at),
        };
        u32::try_from(days.max(0)).unwrap_or(u32::MAX)
    }

    /// Returns the [`Fine`] amount of this [`Loan`] at the provided moment.
    ///
    /// Once this [`Loan`] is returned the amount is frozen and never
    /// recomputed.
    #[must_use]
    pub fn fine_at<Of: ?Sized>(
        &self,
        now: DateTimeOf<Of>,
        policy: &Policy,
    ) -> Money {
        if self.returned_at.is_some() {
            return self.fine.amount;
        }
        policy.fine_per_day.times(self.days_late_at(now))
    }

    /// Returns the not yet paid [`Fine`] amount of this [`Loan`] at the
    /// provided moment.
    #[must_use]
    pub fn unpaid_fine_at<Of: ?Sized>(
        &self,
        now: DateTimeOf<Of>,
        policy: &Policy,
    ) -> Money {
        if self.fine.paid_at.is_some() {
            Money::zero(self.fine.amount.currency)
        } else {
            self.fine_at(now, policy)
        }
    }

    /// Approves this [`Status::Pending`] [`Loan`], starting its [`Term`].
    ///
    /// # Errors
    ///
    /// With [`Error::InvalidStateTransition`] if this [`Loan`] is not
    /// [`Status::Pending`].
    pub fn approve(&mut self, policy: &Policy) -> Result<Term, Error> {
        let now = DateTime::now();
        self.ensure_status(now, &[Status::Pending], Action::Approve)?;

        let term = Term {
            loaned_at: now.coerce(),
            due_at: (now + policy.loan_duration).coerce(),
        };
        self.term = Some(term);
        Ok(term)
    }

    /// Renews this [`Status::Active`] [`Loan`], extending its due date.
    ///
    /// # Errors
    ///
    /// - With [`Error::InvalidStateTransition`] if this [`Loan`] is not
    ///   [`Status::Active`] (an overdue [`Loan`] must be returned instead).
    /// - With [`Error::RenewalLimitExceeded`] if this [`Loan`] has been
    ///   renewed [`Policy::max_renewals`] times already.
    pub fn renew(&mut self, policy: &Policy) -> Result<Term, Error> {
        self.ensure_status(DateTime::now(), &[Status::Active], Action::Renew)?;
        if self.renewals >= policy.max_renewals {
            return Err(Error::RenewalLimitExceeded {
                max: policy.max_renewals,
            });
        }

        let term = self.term.as_mut().ok_or(Error::InvalidStateTransition {
            from: Status::Pending,
            action: Action::Renew,
        })?;
        term.due_at = term.due_at + policy.loan_duration;
        self.renewals += 1;
        Ok(*term)
    }

    /// Closes this [`Loan`] by returning the [`Book`], and freezes its
    /// [`Fine`].
    ///
    /// # Errors
    ///
    /// With [`Error::InvalidStateTransition`] if this [`Loan`] is neither
    /// [`Status::Active`] nor [`Status::Overdue`].
    pub fn close(&mut self, policy: &Policy) -> Result<Money, Error> {
        let now = DateTime::now();
        self.ensure_status(
            now,
            &[Status::Active, Status::Overdue],
            Action::Return,
        )?;

        self.fine.amount = self.fine_at(now, policy);
        self.returned_at = Some(now.coerce());
        Ok(self.fine.amount)
    }

    /// Settles the frozen [`Fine`] of this returned [`Loan`] as paid at the
    /// provided moment.
    ///
    /// # Errors
    ///
    /// - With [`Error::Outstanding`] if this [`Loan`] is not returned yet.
    /// - With [`Error::AlreadyPaid`] if the [`Fine`] is paid already.
    /// - With [`Error::NothingDue`] if the [`Fine`] is zero.
    pub fn settle(
        &mut self,
        paid_at: PaymentDateTime,
    ) -> Result<Money, Error> {
        if self.returned_at.is_none() {
            return Err(Error::Outstanding);
        }
        if self.fine.paid_at.is_some() {
            return Err(Error::AlreadyPaid);
        }
        if self.fine.amount.is_zero() {
            return Err(Error::NothingDue);
        }

        self.fine.paid_at = Some(paid_at);
        Ok(self.fine.amount)
    }

    /// Checks this [`Loan`] to be in one of the `expected` [`Status`]es to
    /// perform the `action`.
    fn ensure_status<Of: ?Sized>(
        &self,
        now: DateTimeOf<Of>,
        expected: &[Status],
        action: Action,
    ) -> Result<(), Error> {
        let from = self.status_at(now);
        if expected.contains(&from) {
            Ok(())
        } else {
            Err(Error::InvalidStateTransition { from, action })
        }
    }
}

/// Sums the not yet paid [`Fine`]s of the provided [`Loan`]s at the provided
/// moment.
#[must_use]
pub fn unpaid_fines_at<'l, Of: ?Sized>(
    loans: impl IntoIterator<Item = &'l Loan>,
    now: DateTimeOf<Of>,
    policy: &Policy,
) -> Money {
    let currency = policy.fine_per_day.currency;
    Money {
        amount: loans
            .into_iter()
            .map(|l| l.unpaid_fine_at(now, policy))
            .filter(|fine| fine.currency == currency)
            .map(|fine| fine.amount)
            .sum(),
        currency,
    }
}

/// ID of a [`Loan`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Term of an approved [`Loan`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Term {
    /// [`DateTime`] when the [`Loan`] was approved.
    pub loaned_at: LoanDateTime,

    /// [`DateTime`] when the [`Book`] is due back.
    pub due_at: DueDateTime,
}

/// Fine charged for a late [`Loan`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Fine {
    /// Charged amount.
    ///
    /// For an outstanding [`Loan`] this is the last materialized amount, the
    /// actual one is given by [`Loan::fine_at()`].
    pub amount: Money,

    /// [`DateTime`] when this [`Fine`] was paid, if it was.
    pub paid_at: Option<PaymentDateTime>,
}

/// Status of a [`Loan`].
#[derive(
    Clone, Copy, Debug, Eq, Hash, PartialEq, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// Requested by a member, waiting for an approval.
    Pending,

    /// [`Book`] is lent and not due yet.
    Active,

    /// [`Book`] is lent and its due date has passed.
    Overdue,

    /// [`Book`] is returned.
    Returned,
}

impl Status {
    /// Indicates whether the [`Loan`] with this [`Status`] is not returned
    /// yet.
    #[must_use]
    pub fn is_outstanding(self) -> bool {
        !matches!(self, Self::Returned)
    }
}

/// Action performed upon a [`Loan`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Action {
    /// [`Loan::approve()`].
    Approve,

    /// [`Loan::renew()`].
    Renew,

    /// [`Loan::close()`].
    Return,
}

/// Error of a [`Loan`] transition.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, StdError)]
pub enum Error {
    /// [`Loan`] is not in a [`Status`] allowing the [`Action`].
    #[display("Cannot {action} a `Loan` in `{from}` status")]
    InvalidStateTransition {
        /// Current [`Status`] of the [`Loan`].
        from: Status,

        /// Requested [`Action`].
        action: Action,
    },

    /// [`Loan`] has been renewed the maximum number of times.
    #[display("`Loan` has been renewed {max} times already")]
    RenewalLimitExceeded {
        /// Maximum number of renewals.
        max: u8,
    },

    /// [`Fine`] cannot be settled before the [`Loan`] is returned.
    #[display("`Loan` is not returned yet")]
    Outstanding,

    /// [`Fine`] is paid already.
    #[display("`Fine` is paid already")]
    AlreadyPaid,

    /// [`Fine`] is zero.
    #[display("No `Fine` is due")]
    NothingDue,
}

/// [`DateTime`] when a [`Loan`] was requested.
pub type RequestDateTime = DateTimeOf<(Loan, unit::Creation)>;

/// [`DateTime`] when a [`Loan`] was approved.
pub type LoanDateTime = DateTimeOf<(Loan, unit::Lending)>;

/// [`DateTime`] when a [`Book`] is due back.
pub type DueDateTime = DateTimeOf<(Loan, unit::Due)>;

/// [`DateTime`] when a [`Book`] was returned.
pub type ReturnDateTime = DateTimeOf<(Loan, unit::Return)>;

/// [`DateTime`] when a [`Fine`] was paid.
pub type PaymentDateTime = DateTimeOf<(Fine, unit::Payment)>;

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::{DateTime, DateTimeOf};

    use crate::domain::{book, user, Policy};

    use super::{unpaid_fines_at, Action, Error, Loan, Status, Term};

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    fn active_loan(loaned_days_ago: u32, policy: &Policy) -> Loan {
        let mut loan = Loan::request(book::Id::new(), user::Id::new(), policy);
        let loaned_at = DateTime::now() - DAY * loaned_days_ago;
        loan.term = Some(Term {
            loaned_at: loaned_at.coerce(),
            due_at: (loaned_at + policy.loan_duration).coerce(),
        });
        loan
    }

    #[test]
    fn derives_status() {
        let policy = Policy::default();

        let mut loan =
            Loan::request(book::Id::new(), user::Id::new(), &policy);
        assert_eq!(loan.status(), Status::Pending);

        _ = loan.approve(&policy).unwrap();
        assert_eq!(loan.status(), Status::Active);
        assert_eq!(loan.status_at(DateTime::now() + DAY * 14), Status::Active);
        assert_eq!(
            loan.status_at(DateTime::now() + DAY * 15),
            Status::Overdue,
        );

        _ = loan.close(&policy).unwrap();
        assert_eq!(loan.status(), Status::Returned);
        assert_eq!(
            loan.status_at(DateTime::now() + DAY * 30),
            Status::Returned,
        );
    }

    #[test]
    fn approves_only_pending() {
        let policy = Policy::default();
        let mut loan = active_loan(0, &policy);

        assert_eq!(
            loan.approve(&policy),
            Err(Error::InvalidStateTransition {
                from: Status::Active,
                action: Action::Approve,
            }),
        );
    }

    #[test]
    fn approval_sets_term() {
        let policy = Policy::default();
        let mut loan =
            Loan::request(book::Id::new(), user::Id::new(), &policy);

        let term = loan.approve(&policy).unwrap();

        assert_eq!(term.due_at.days_since(term.loaned_at), 14);
        assert_eq!(loan.term, Some(term));
    }

    #[test]
    fn renews_up_to_limit() {
        let policy = Policy::default();
        let mut loan = active_loan(0, &policy);
        let due = loan.term.unwrap().due_at;

        _ = loan.renew(&policy).unwrap();
        _ = loan.renew(&policy).unwrap();
        assert_eq!(loan.renewals, 2);
        let extended = loan.term.unwrap().due_at;
        assert_eq!(extended.days_since(due), 28);

        assert_eq!(
            loan.renew(&policy),
            Err(Error::RenewalLimitExceeded { max: 2 }),
        );
        assert_eq!(loan.renewals, 2);
        assert_eq!(loan.term.unwrap().due_at, extended);
    }

    #[test]
    fn overdue_cannot_renew() {
        let policy = Policy::default();
        let mut loan = active_loan(20, &policy);

        assert_eq!(
            loan.renew(&policy),
            Err(Error::InvalidStateTransition {
                from: Status::Overdue,
                action: Action::Renew,
            }),
        );
        assert_eq!(loan.renewals, 0);
    }

    #[test]
    fn freezes_fine_on_return() {
        let policy = Policy::default();
        let mut loan = active_loan(20, &policy);
        assert_eq!(loan.days_late_at(DateTime::now()), 6);

        let fine = loan.close(&policy).unwrap();

        assert_eq!(fine.to_string(), "300AOA");
        assert_eq!(loan.fine_at(DateTime::now(), &policy), fine);
        assert_eq!(loan.fine_at(DateTime::now() + DAY * 10, &policy), fine);
        assert_eq!(loan.status(), Status::Returned);
        assert!(loan.returned_at.is_some());
    }

    #[test]
    fn returns_on_time_without_fine() {
        let policy = Policy::default();
        let mut loan = active_loan(3, &policy);

        let fine = loan.close(&policy).unwrap();

        assert!(fine.is_zero());
        assert_eq!(
            loan.close(&policy),
            Err(Error::InvalidStateTransition {
                from: Status::Returned,
                action: Action::Return,
            }),
        );
    }

    #[test]
    fn pending_cannot_be_returned() {
        let policy = Policy::default();
        let mut loan =
            Loan::request(book::Id::new(), user::Id::new(), &policy);

        assert_eq!(
            loan.close(&policy),
            Err(Error::InvalidStateTransition {
                from: Status::Pending,
                action: Action::Return,
            }),
        );
        assert!(loan.returned_at.is_none());
    }

    #[test]
    fn accrues_fine_while_overdue() {
        let policy = Policy::default();
        let loan = active_loan(16, &policy);
        let now = DateTimeOf::<()>::now();

        assert_eq!(loan.fine_at(now, &policy).to_string(), "100AOA");
        assert_eq!(loan.fine_at(now + DAY, &policy).to_string(), "150AOA");
        assert_eq!(loan.unpaid_fine_at(now, &policy).to_string(), "100AOA");
    }

    #[test]
    fn settles_once() {
        let policy = Policy::default();
        let mut loan = active_loan(20, &policy);
        let now = DateTime::now();
        assert_eq!(loan.settle(now.coerce()), Err(Error::Outstanding));

        _ = loan.close(&policy).unwrap();
        let paid = loan.settle(now.coerce()).unwrap();
        assert_eq!(paid.to_string(), "300AOA");
        assert_eq!(loan.fine.paid_at, Some(now.coerce()));
        assert!(loan.unpaid_fine_at(now, &policy).is_zero());

        assert_eq!(loan.settle(now.coerce()), Err(Error::AlreadyPaid));
    }

    #[test]
    fn sums_unpaid_fines() {
        let policy = Policy::default();
        let overdue = active_loan(16, &policy);
        let mut returned = active_loan(20, &policy);
        _ = returned.close(&policy).unwrap();
        let mut paid = active_loan(20, &policy);
        _ = paid.close(&policy).unwrap();
        _ = paid.settle(DateTime::now().coerce()).unwrap();
        let on_time = active_loan(1, &policy);

        let total = unpaid_fines_at(
            [&overdue, &returned, &paid, &on_time],
            DateTime::now(),
            &policy,
        );

        assert_eq!(total.to_string(), "400AOA");
    }

    #[test]
    fn nothing_due_without_fine() {
        let policy = Policy::default();
        let mut loan = active_loan(1, &policy);
        _ = loan.close(&policy).unwrap();

        assert_eq!(
            loan.settle(DateTime::now().coerce()),
            Err(Error::NothingDue),
        );
        assert!(loan.fine.paid_at.is_none());
    }
}
