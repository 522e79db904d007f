//! [`Loan`] read model definition.
//!
//! [`Loan`]: crate::domain::Loan

pub mod list {
    //! [`Loan`]s list definitions.

    use crate::domain::{book, user};
    #[cfg(doc)]
    use crate::domain::Loan;

    /// Filter of a [`Loan`]s list.
    ///
    /// [`Loan`]s are listed from the most recently requested one.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct Filter {
        /// ID of the member to list the [`Loan`]s of.
        pub member_id: Option<user::Id>,

        /// ID of the borrowed [`Book`] to list the [`Loan`]s of.
        ///
        /// [`Book`]: crate::domain::Book
        pub book_id: Option<book::Id>,

        /// Indicator whether only not returned [`Loan`]s should be listed.
        pub outstanding: bool,
    }
}
