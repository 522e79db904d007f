//! Domain definitions.

pub mod author;
pub mod book;
pub mod category;
pub mod loan;
pub mod policy;
pub mod reservation;
pub mod user;

pub use self::{
    author::Author, book::Book, category::Category, loan::Loan,
    policy::Policy, reservation::Reservation, user::User,
};
