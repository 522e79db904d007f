//! [`Book`] definitions.

use std::sync::LazyLock;

#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf};
use derive_more::{AsRef, Display, Error, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{author, category};
#[cfg(doc)]
use crate::domain::{Author, Category};

/// Catalog entry of a library book title.
#[derive(Clone, Debug)]
pub struct Book {
    /// ID of this [`Book`].
    pub id: Id,

    /// [`Isbn`] of this [`Book`].
    pub isbn: Isbn,

    /// [`Title`] of this [`Book`].
    pub title: Title,

    /// ID of the [`Author`] of this [`Book`].
    pub author_id: author::Id,

    /// ID of the [`Category`] of this [`Book`].
    pub category_id: category::Id,

    /// Year this [`Book`] was published in, if known.
    pub publication_year: Option<PublicationYear>,

    /// Number of pages in this [`Book`], if known.
    pub num_pages: Option<NumPages>,

    /// [`Location`] of this [`Book`] on the shelves.
    pub location: Option<Location>,

    /// [`Synopsis`] of this [`Book`].
    pub synopsis: Option<Synopsis>,

    /// [`Copies`] of this [`Book`] owned by the library.
    pub copies: Copies,

    /// [`DateTime`] when this [`Book`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Book`] was deleted, if it was.
    pub deleted_at: Option<DeletionDateTime>,
}

impl Book {
    /// Takes a copy of this [`Book`] out of the shelves.
    ///
    /// # Errors
    ///
    /// With [`InventoryError::Underflow`] if no copies are available.
    pub fn take_copy(&mut self) -> Result<(), InventoryError> {
        self.copies.take()
    }

    /// Returns a copy of this [`Book`] back to the shelves.
    ///
    /// # Errors
    ///
    /// With [`InventoryError::Overflow`] if all copies are already available.
    pub fn return_copy(&mut self) -> Result<(), InventoryError> {
        self.copies.put_back()
    }
}

/// ID of a [`Book`].
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

/// [ISBN] of a [`Book`].
///
/// [ISBN]: https://en.wikipedia.org/wiki/ISBN
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Isbn(String);

impl Isbn {
    /// Creates a new [`Isbn`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `isbn` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(isbn: impl Into<String>) -> Self {
        Self(isbn.into())
    }

    /// Creates a new [`Isbn`] if the given `isbn` is valid.
    #[must_use]
    pub fn new(isbn: impl Into<String>) -> Option<Self> {
        let isbn = isbn.into();
        Self::check(&isbn).then_some(Self(isbn))
    }

    /// Checks whether the given `isbn` is a valid [`Isbn`].
    fn check(isbn: impl AsRef<str>) -> bool {
        /// Regular expression checking [`Isbn`] invariants:
        /// - Must consist of digits and single hyphens only;
        /// - Must not start or end with a hyphen;
        /// - ISBN-10 may end with an `X` check digit.
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^\d(-?\d)*(-?[\dX])$").expect("valid regex")
        });

        let isbn = isbn.as_ref();
        let digits = isbn.chars().filter(|c| *c != '-').count();
        REGEX.is_match(isbn) && (digits == 10 || digits == 13)
    }
}

impl FromStr for Isbn {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Isbn`")
    }
}

/// Title of a [`Book`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Title(String);

impl Title {
    /// Creates a new [`Title`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `title` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(title: impl Into<String>) -> Self {
        Self(title.into())
    }

    /// Creates a new [`Title`] if the given `title` is valid.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Option<Self> {
        let title = title.into();
        Self::check(&title).then_some(Self(title))
    }

    /// Checks whether the given `title` is a valid [`Title`].
    fn check(title: impl AsRef<str>) -> bool {
        let title = title.as_ref();
        title.trim() == title && !title.is_empty() && title.len() <= 150
    }
}

impl FromStr for Title {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Title`")
    }
}

/// Location of a [`Book`] on the library shelves.
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Location(String);

impl Location {
    /// Creates a new [`Location`] if the given `location` is valid.
    #[must_use]
    pub fn new(location: impl Into<String>) -> Option<Self> {
        let location = location.into();
        let valid = location.trim() == location
            && !location.is_empty()
            && location.len() <= 100;
        valid.then_some(Self(location))
    }
}

/// Synopsis of a [`Book`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Synopsis(String);

impl Synopsis {
    /// Creates a new [`Synopsis`] if the given `synopsis` is valid.
    #[must_use]
    pub fn new(synopsis: impl Into<String>) -> Option<Self> {
        let synopsis = synopsis.into();
        let valid = !synopsis.trim().is_empty() && synopsis.len() <= 4096;
        valid.then_some(Self(synopsis))
    }
}

/// Year a [`Book`] was published in.
pub type PublicationYear = i16;

/// Number of pages in a [`Book`].
pub type NumPages = u16;

/// Copies of a [`Book`] owned by the library.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Copies {
    /// Total number of copies.
    total: u16,

    /// Number of copies currently on the shelves.
    available: u16,
}

impl Copies {
    /// Creates new [`Copies`] with all the `total` copies being available.
    ///
    /// [`None`] is returned if `total` is zero.
    #[must_use]
    pub fn new(total: u16) -> Option<Self> {
        (total > 0).then_some(Self {
            total,
            available: total,
        })
    }

    /// Creates new [`Copies`] out of the provided counters.
    ///
    /// # Safety
    ///
    /// The caller must ensure that `available <= total`.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub const unsafe fn new_unchecked(total: u16, available: u16) -> Self {
        Self { total, available }
    }

    /// Returns the total number of copies.
    #[must_use]
    pub const fn total(&self) -> u16 {
        self.total
    }

    /// Returns the number of copies currently on the shelves.
    #[must_use]
    pub const fn available(&self) -> u16 {
        self.available
    }

    /// Returns the number of copies currently lent.
    #[must_use]
    pub const fn lent(&self) -> u16 {
        self.total - self.available
    }

    /// Takes one copy off the shelves.
    ///
    /// # Errors
    ///
    /// With [`InventoryError::Underflow`] if no copies are available.
    pub fn take(&mut self) -> Result<(), InventoryError> {
        self.available = self
            .available
            .checked_sub(1)
            .ok_or(InventoryError::Underflow)?;
        Ok(())
    }

    /// Puts one copy back on the shelves.
    ///
    /// # Errors
    ///
    /// With [`InventoryError::Overflow`] if all copies are already available.
    pub fn put_back(&mut self) -> Result<(), InventoryError> {
        if self.available >= self.total {
            return Err(InventoryError::Overflow);
        }
        self.available += 1;
        Ok(())
    }

    /// Changes the total number of copies, keeping the lent ones lent.
    ///
    /// # Errors
    ///
    /// With [`InventoryError::InvalidTotal`] if the new `total` is zero or
    /// less than the number of lent copies.
    pub fn resize(&mut self, total: u16) -> Result<(), InventoryError> {
        let lent = self.lent();
        if total == 0 || total < lent {
            return Err(InventoryError::InvalidTotal { total, lent });
        }
        self.total = total;
        self.available = total - lent;
        Ok(())
    }
}

/// Error of changing [`Copies`] counters.
#[derive(Clone, Copy, Debug, Display, Eq, Error, PartialEq)]
pub enum InventoryError {
    /// No copies are available to be taken.
    #[display("No copies available")]
    Underflow,

    /// All copies are already on the shelves.
    #[display("All copies are already available")]
    Overflow,

    /// Requested total doesn't cover the lent copies.
    #[display("Total of {total} copies is invalid with {lent} copies lent")]
    InvalidTotal {
        /// Requested total number of copies.
        total: u16,

        /// Number of currently lent copies.
        lent: u16,
    },
}

/// [`DateTime`] when a [`Book`] was created.
pub type CreationDateTime = DateTimeOf<(Book, unit::Creation)>;

/// [`DateTime`] when a [`Book`] was deleted.
pub type DeletionDateTime = DateTimeOf<(Book, unit::Deletion)>;

#[cfg(test)]
mod spec {
    use super::{Copies, InventoryError, Isbn};

    #[test]
    fn isbn() {
        assert!(Isbn::new("9780306406157").is_some());
        assert!(Isbn::new("978-0-306-40615-7").is_some());
        assert!(Isbn::new("0-306-40615-X").is_some());

        assert!(Isbn::new("").is_none());
        assert!(Isbn::new("978030640615").is_none());
        assert!(Isbn::new("-9780306406157").is_none());
        assert!(Isbn::new("978--0306406157").is_none());
        assert!(Isbn::new("97803064061X7").is_none());
    }

    #[test]
    fn never_underflows() {
        let mut copies = Copies::new(1).unwrap();

        copies.take().unwrap();
        assert_eq!(copies.available(), 0);
        assert_eq!(copies.take(), Err(InventoryError::Underflow));
        assert_eq!(copies.available(), 0);
    }

    #[test]
    fn never_overflows() {
        let mut copies = Copies::new(2).unwrap();

        assert_eq!(copies.put_back(), Err(InventoryError::Overflow));
        copies.take().unwrap();
        copies.put_back().unwrap();
        assert_eq!(copies.available(), 2);
    }

    #[test]
    fn resizes_around_lent_copies() {
        let mut copies = Copies::new(3).unwrap();
        copies.take().unwrap();
        copies.take().unwrap();

        copies.resize(5).unwrap();
        assert_eq!((copies.total(), copies.available()), (5, 3));

        copies.resize(2).unwrap();
        assert_eq!((copies.total(), copies.available()), (2, 0));

        assert_eq!(
            copies.resize(1),
            Err(InventoryError::InvalidTotal { total: 1, lent: 2 }),
        );
        assert_eq!(
            Copies::new(0),
            None,
        );
    }
}
