//! [`Book`] read model definition.
//!
//! [`Book`]: crate::domain::Book

pub mod list {
    //! [`Book`]s list definitions.

    use crate::domain::{author, book, category};
    #[cfg(doc)]
    use crate::domain::Book;

    /// Filter of a [`Book`]s list.
    #[derive(Clone, Debug, Default)]
    pub struct Filter {
        /// [`book::Title`] (or its part) to fuzzy search for.
        pub title: Option<book::Title>,

        /// ID of the [`Author`] to filter by.
        ///
        /// [`Author`]: crate::domain::Author
        pub author_id: Option<author::Id>,

        /// ID of the [`Category`] to filter by.
        ///
        /// [`Category`]: crate::domain::Category
        pub category_id: Option<category::Id>,
    }
}
