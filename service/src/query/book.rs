//! [`Query`] collection related to a single [`Book`].

use common::operations::By;

use crate::domain::{book, Book};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries a [`Book`] by its [`book::Id`].
pub type ById = DatabaseQuery<By<Option<Book>, book::Id>>;

/// Queries a [`Book`] by its [`book::Isbn`].
pub type ByIsbn<'i> = DatabaseQuery<By<Option<Book>, &'i book::Isbn>>;
