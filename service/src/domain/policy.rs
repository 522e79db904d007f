//! Lending [`Policy`] definitions.

use std::time::Duration;

use common::{money::Currency, Money};
use rust_decimal::Decimal;
use smart_default::SmartDefault;

#[cfg(doc)]
use crate::domain::{Loan, Reservation};

/// Number of seconds in an hour.
const HOUR: u64 = 60 * 60;

/// Number of seconds in a day.
const DAY: u64 = 24 * HOUR;

/// Rules [`Loan`]s, fines and [`Reservation`]s follow.
#[derive(Clone, Copy, Debug, SmartDefault)]
pub struct Policy {
    /// Duration a [`Loan`] is granted for, and the extension of a renewal.
    #[default(Duration::from_secs(14 * DAY))]
    pub loan_duration: Duration,

    /// Maximum number of renewals of a single [`Loan`].
    #[default(2)]
    pub max_renewals: u8,

    /// Fine charged for every day a [`Loan`] is late.
    #[default(Money { amount: Decimal::from(50), currency: Currency::Aoa })]
    pub fine_per_day: Money,

    /// Duration a notified [`Reservation`] holder has to borrow the book.
    #[default(Duration::from_secs(48 * HOUR))]
    pub reservation_expiry: Duration,

    /// Maximum amount of unpaid fines a member may have and still borrow or
    /// reserve books.
    #[default(Money::zero(Currency::Aoa))]
    pub max_unpaid_fine: Money,
}

impl Policy {
    /// Indicates whether a member owing the `unpaid` fines exceeds
    /// [`Policy::max_unpaid_fine`] and must not borrow or reserve books.
    #[must_use]
    pub fn is_over_fine_limit(&self, unpaid: Money) -> bool {
        unpaid.amount > self.max_unpaid_fine.amount
    }
}

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use common::Money;

    use super::Policy;

    #[test]
    fn defaults() {
        let policy = Policy::default();

        assert_eq!(policy.loan_duration.as_secs(), 14 * 24 * 60 * 60);
        assert_eq!(policy.max_renewals, 2);
        assert_eq!(policy.fine_per_day.to_string(), "50AOA");
        assert_eq!(policy.reservation_expiry.as_secs(), 48 * 60 * 60);
        assert!(policy.max_unpaid_fine.is_zero());
    }

    #[test]
    fn blocks_over_fine_limit() {
        let policy = Policy::default();

        assert!(!policy.is_over_fine_limit(Money::from_str("0AOA").unwrap()));
        assert!(policy.is_over_fine_limit(Money::from_str("50AOA").unwrap()));
    }
}
