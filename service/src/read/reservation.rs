//! [`Reservation`] read model definition.
//!
//! [`Reservation`]: crate::domain::Reservation

pub mod list {
    //! [`Reservation`]s list definitions.

    use crate::domain::{book, user};
    #[cfg(doc)]
    use crate::domain::{reservation, Reservation};

    /// Filter of a [`Reservation`]s list.
    ///
    /// [`Reservation`]s are listed in their [`reservation::Queue`] order.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct Filter {
        /// ID of the member to list the [`Reservation`]s of.
        pub member_id: Option<user::Id>,

        /// ID of the reserved [`Book`] to list the [`Reservation`]s of.
        ///
        /// [`Book`]: crate::domain::Book
        pub book_id: Option<book::Id>,

        /// Indicator whether only [`reservation::Status::Active`]
        /// [`Reservation`]s should be listed.
        pub active_only: bool,
    }
}
