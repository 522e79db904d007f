//! [`Command`] definition.

pub mod approve_loan;
pub mod authorize_user_session;
pub mod cancel_reservation;
pub mod checkout_loan;
pub mod create_author;
pub mod create_book;
pub mod create_category;
pub mod create_reservation;
pub mod create_user;
pub mod create_user_session;
pub mod delete_author;
pub mod delete_book;
pub mod delete_category;
pub mod delete_user;
pub mod renew_loan;
pub mod request_loan;
pub mod return_loan;
pub mod settle_fine;
#[cfg(test)]
pub(crate) mod spec;
pub mod update_book_copies;
pub mod update_user_status;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    approve_loan::ApproveLoan, authorize_user_session::AuthorizeUserSession,
    cancel_reservation::CancelReservation, checkout_loan::CheckoutLoan,
    create_author::CreateAuthor, create_book::CreateBook,
    create_category::CreateCategory, create_reservation::CreateReservation,
    create_user::CreateUser, create_user_session::CreateUserSession,
    delete_author::DeleteAuthor, delete_book::DeleteBook,
    delete_category::DeleteCategory, delete_user::DeleteUser,
    renew_loan::RenewLoan, request_loan::RequestLoan, return_loan::ReturnLoan,
    settle_fine::SettleFine, update_book_copies::UpdateBookCopies,
    update_user_status::UpdateUserStatus,
};
