//! [`Query`] collection related to a single [`Author`].

use common::operations::By;

use crate::domain::{author, Author};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries an [`Author`] by its [`author::Id`].
pub type ById = DatabaseQuery<By<Option<Author>, author::Id>>;
