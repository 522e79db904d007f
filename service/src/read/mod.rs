//! Read entities definitions.

pub mod book;
pub mod fine;
pub mod loan;
pub mod reservation;
pub mod user;
