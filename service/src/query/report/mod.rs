//! [`Query`]s building reports.
//!
//! [`Query`]: crate::Query

pub mod dashboard;

pub use self::dashboard::Dashboard;
