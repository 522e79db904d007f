//! [`Database`] implementations.
//!
//! [`Database`]: crate::infra::Database

mod author;
mod book;
mod category;
mod loan;
mod reservation;
mod user;

/// Indicates whether the `haystack` contains the `needle`, ignoring the case.
fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.trim().to_lowercase())
}
