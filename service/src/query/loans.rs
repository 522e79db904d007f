//! [`Query`] collection related to the multiple [`Loan`]s.

use common::operations::By;

#[cfg(doc)]
use crate::Query;
use crate::{domain::Loan, read};

use super::DatabaseQuery;

/// Queries a list of [`Loan`]s.
pub type List = DatabaseQuery<By<Vec<Loan>, read::loan::list::Filter>>;
