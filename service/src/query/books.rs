//! [`Query`] collection related to the multiple [`Book`]s.

use std::collections::HashMap;

use common::operations::By;

#[cfg(doc)]
use crate::Query;
use crate::{
    domain::{book, Book},
    read,
};

use super::DatabaseQuery;

/// Queries multiple [`Book`]s by their [`book::Id`]s.
pub type ByIds = DatabaseQuery<By<HashMap<book::Id, Book>, Vec<book::Id>>>;

/// Queries a list of [`Book`]s.
pub type List = DatabaseQuery<By<Vec<Book>, read::book::list::Filter>>;
