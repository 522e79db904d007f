//! [`User`] read model definition.
//!
//! [`User`]: crate::domain::User

pub mod list {
    //! [`User`]s list definitions.

    use crate::domain::user;
    #[cfg(doc)]
    use crate::domain::User;

    /// Filter of a [`User`]s list.
    #[derive(Clone, Debug, Default)]
    pub struct Filter {
        /// [`user::Name`] (or its part) to fuzzy search for.
        pub name: Option<user::Name>,

        /// [`user::Role`] to filter by.
        pub role: Option<user::Role>,

        /// [`user::Status`] to filter by.
        pub status: Option<user::Status>,
    }
}
