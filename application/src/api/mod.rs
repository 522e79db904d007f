//! REST API definitions.

pub mod auth;
pub mod author;
pub mod book;
pub mod category;
pub mod fine;
pub mod loan;
pub mod report;
pub mod reservation;
pub mod user;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::define_error;

/// Builds the [`Router`] serving all the REST API endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/auth/login", post(auth::login))
        .route("/usuarios", get(user::list).post(user::create))
        .route("/usuarios/me", get(user::me))
        .route(
            "/usuarios/matricula/:matricula",
            get(user::get_by_enrollment),
        )
        .route("/usuarios/:id", get(user::get).delete(user::delete))
        .route("/usuarios/:id/status", patch(user::update_status))
        .route("/usuarios/:id/multas/pagar", patch(fine::settle_by_member))
        .route("/autores", get(author::list).post(author::create))
        .route("/autores/:id", get(author::get).delete(author::delete))
        .route("/categorias", get(category::list).post(category::create))
        .route(
            "/categorias/:id",
            get(category::get).delete(category::delete),
        )
        .route("/livros", get(book::list).post(book::create))
        .route("/livros/:isbn", get(book::get).delete(book::delete))
        .route("/livros/:isbn/quantidade", patch(book::update_copies))
        .route("/livros/:isbn/fila", get(reservation::queue))
        .route("/emprestimos", get(loan::list).post(loan::checkout))
        .route("/emprestimos/meus", get(loan::mine))
        .route("/emprestimos/rascunho", post(loan::request))
        .route("/emprestimos/:id", get(loan::get))
        .route("/emprestimos/:id/multa", get(fine::get))
        .route("/emprestimos/:id/aprovar", patch(loan::approve))
        .route("/emprestimos/:id/renovar", patch(loan::renew))
        .route("/emprestimos/:id/devolver", patch(loan::return_book))
        .route("/emprestimos/:id/pagar", patch(fine::settle_by_loan))
        .route(
            "/reservas",
            get(reservation::list).post(reservation::create),
        )
        .route("/reservas/minhas", get(reservation::mine))
        .route("/reservas/:id/cancelar", patch(reservation::cancel))
        .route("/relatorios/dashboard", get(report::dashboard))
}

define_error! {
    enum PrivilegeError {
        #[code = "NOT_ADMIN"]
        #[status = FORBIDDEN]
        #[message = "Authenticated `User` must be an administrator"]
        Admin,

        #[code = "NOT_OWNER"]
        #[status = FORBIDDEN]
        #[message = "Authenticated `User` must own the resource or be an \
                     administrator"]
        Owner,
    }
}

define_error! {
    enum NotExistsError {
        #[code = "AUTHOR_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Author` does not exist"]
        Author,

        #[code = "BOOK_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Book` does not exist"]
        Book,

        #[code = "CATEGORY_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Category` does not exist"]
        Category,

        #[code = "LOAN_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Loan` does not exist"]
        Loan,

        #[code = "MEMBER_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "Member does not exist"]
        Member,

        #[code = "RESERVATION_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Reservation` does not exist"]
        Reservation,

        #[code = "USER_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`User` does not exist"]
        User,
    }
}

define_error! {
    enum RuleError {
        #[code = "BOOK_AVAILABLE"]
        #[status = UNPROCESSABLE_ENTITY]
        #[message = "`Book` has free copies and cannot be reserved"]
        BookAvailable,

        #[code = "DUPLICATE_LOAN"]
        #[status = CONFLICT]
        #[message = "Member has this `Book` borrowed already"]
        DuplicateLoan,

        #[code = "DUPLICATE_RESERVATION"]
        #[status = CONFLICT]
        #[message = "Member has this `Book` reserved already"]
        DuplicateReservation,

        #[code = "INVENTORY_UNAVAILABLE"]
        #[status = CONFLICT]
        #[message = "No copies of the `Book` are available"]
        InventoryUnavailable,

        #[code = "MEMBER_BLOCKED"]
        #[status = UNPROCESSABLE_ENTITY]
        #[message = "Member is blocked, owes fines or has overdue loans"]
        MemberBlocked,

        #[code = "NOTHING_DUE"]
        #[status = UNPROCESSABLE_ENTITY]
        #[message = "No fines are due"]
        NothingDue,

        #[code = "RESERVATION_CONFLICT"]
        #[status = CONFLICT]
        #[message = "`Book` is reserved by other members"]
        ReservationConflict,
    }
}
