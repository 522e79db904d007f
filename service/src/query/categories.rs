//! [`Query`] collection related to the multiple [`Category`]s.

use std::collections::HashMap;

use common::operations::By;

use crate::domain::{category, Category};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries multiple [`Category`]s by their [`category::Id`]s.
pub type ByIds =
    DatabaseQuery<By<HashMap<category::Id, Category>, Vec<category::Id>>>;

/// Queries all the [`Category`]s ordered by name.
pub type List = DatabaseQuery<By<Vec<Category>, ()>>;
