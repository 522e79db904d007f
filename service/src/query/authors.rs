//! [`Query`] collection related to the multiple [`Author`]s.

use std::collections::HashMap;

use common::operations::By;

use crate::domain::{author, Author};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries multiple [`Author`]s by their [`author::Id`]s.
pub type ByIds =
    DatabaseQuery<By<HashMap<author::Id, Author>, Vec<author::Id>>>;

/// Queries all the [`Author`]s ordered by name.
pub type List = DatabaseQuery<By<Vec<Author>, ()>>;
