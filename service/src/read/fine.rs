//! Fine read model definitions.

use common::Money;

use crate::domain::loan;
#[cfg(doc)]
use crate::domain::Loan;

/// Fine of a [`Loan`] as of the moment it was computed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Statement {
    /// ID of the fined [`Loan`].
    pub loan_id: loan::Id,

    /// Fined amount.
    pub amount: Money,

    /// Number of whole calendar days the [`Loan`] is (or was) late.
    pub days_late: u32,

    /// Indicator whether the fine is paid already.
    pub paid: bool,
}

/// Record of settled fines.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Payment {
    /// IDs of the [`Loan`]s whose fines were settled.
    pub loan_ids: Vec<loan::Id>,

    /// Total settled amount.
    pub total: Money,

    /// [`DateTime`] of this [`Payment`].
    ///
    /// [`DateTime`]: common::DateTime
    pub paid_at: loan::PaymentDateTime,
}
