//! Fixtures and lending scenarios driving [`Command`]s against the in-memory
//! [`Database`].
//!
//! [`Command`]: super::Command
//! [`Database`]: crate::infra::Database

use std::time::Duration;

use common::{
    operations::{By, Insert, Select},
    DateTime,
};

use crate::{
    command::{
        approve_loan, cancel_reservation, checkout_loan, create_reservation,
        delete_book, renew_loan, request_loan, settle_fine, ApproveLoan,
        CancelReservation, CheckoutLoan, CreateReservation, DeleteBook,
        RenewLoan, RequestLoan, ReturnLoan, SettleFine,
    },
    domain::{
        author, book, category, loan, reservation, user, Book, Loan,
        Reservation, User,
    },
    infra::{Database as _, Memory},
    Command as _, Service,
};

/// Number of seconds in a day.
const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Creates a new active member with the `password` password.
pub(crate) fn member(enrollment: i32) -> User {
    // SAFETY: Hashed by `bcrypt` right here.
    #[expect(unsafe_code, reason = "test")]
    let password_hash = unsafe {
        user::PasswordHash::new_unchecked(
            bcrypt::hash("password", 4).unwrap(),
        )
    };
    User {
        id: user::Id::new(),
        enrollment: user::Enrollment::new(enrollment).unwrap(),
        name: user::Name::new(format!("Member {enrollment}")).unwrap(),
        email: user::Email::new(format!("member{enrollment}@biblio.ao"))
            .unwrap(),
        password_hash,
        role: user::Role::Member,
        status: user::Status::Active,
        created_at: DateTime::now().coerce(),
        deleted_at: None,
    }
}

/// Creates a new [`Book`] with the `total` copies available.
pub(crate) fn book(total: u16) -> Book {
    Book {
        id: book::Id::new(),
        isbn: book::Isbn::new("978-0-306-40615-7").unwrap(),
        title: book::Title::new("Mayombe").unwrap(),
        author_id: author::Id::new(),
        category_id: category::Id::new(),
        publication_year: Some(1980),
        num_pages: Some(270),
        location: None,
        synopsis: None,
        copies: book::Copies::new(total).unwrap(),
        created_at: DateTime::now().coerce(),
        deleted_at: None,
    }
}

/// Creates a [`Service`] storing a [`Book`] with the `total` copies and `n`
/// members.
async fn library(total: u16, n: i32) -> (Service<Memory>, Book, Vec<User>) {
    let svc = Service::for_tests(Memory::new());
    let book = book(total);
    svc.database().execute(Insert(book.clone())).await.unwrap();
    let mut members = Vec::new();
    for i in 1..=n {
        let m = member(i);
        svc.database().execute(Insert(m.clone())).await.unwrap();
        members.push(m);
    }
    (svc, book, members)
}

async fn stored_book(svc: &Service<Memory>, id: book::Id) -> Book {
    svc.database()
        .execute(Select(By::<Option<Book>, _>::new(id)))
        .await
        .unwrap()
        .unwrap()
}

async fn stored_reservation(
    svc: &Service<Memory>,
    id: reservation::Id,
) -> Reservation {
    svc.database()
        .execute(Select(By::<Option<Reservation>, _>::new(id)))
        .await
        .unwrap()
        .unwrap()
}

/// Moves the [`loan::Term`] of the stored [`Loan`] into the past, as if it
/// was approved `days` ago.
async fn backdate(svc: &Service<Memory>, id: loan::Id, days: u32) {
    let mut loan = svc
        .database()
        .execute(Select(By::<Option<Loan>, _>::new(id)))
        .await
        .unwrap()
        .unwrap();
    let loaned_at = DateTime::now() - DAY * days;
    loan.term = Some(loan::Term {
        loaned_at: loaned_at.coerce(),
        due_at: (loaned_at + svc.config().policy.loan_duration).coerce(),
    });
    svc.database().execute(Insert(loan)).await.unwrap();
}

#[tokio::test]
async fn lends_single_copy_and_fines_late_return() {
    let (svc, book, members) = library(1, 2).await;
    let (m, n) = (&members[0], &members[1]);

    let loan = svc
        .execute(RequestLoan {
            member_id: m.id,
            book_id: book.id,
        })
        .await
        .unwrap();
    assert_eq!(loan.status(), loan::Status::Pending);

    let err = svc
        .execute(CreateReservation {
            member_id: n.id,
            book_id: book.id,
        })
        .await
        .unwrap_err();
    let err: &create_reservation::ExecutionError = err.as_ref();
    assert!(matches!(
        err,
        create_reservation::ExecutionError::BookAvailable(_),
    ));

    let loan = svc.execute(ApproveLoan { loan_id: loan.id }).await.unwrap();
    let term = loan.term.unwrap();
    assert_eq!(loan.status(), loan::Status::Active);
    assert_eq!(term.due_at.days_since(term.loaned_at), 14);
    assert_eq!(stored_book(&svc, book.id).await.copies.available(), 0);

    let reservation = svc
        .execute(CreateReservation {
            member_id: n.id,
            book_id: book.id,
        })
        .await
        .unwrap();
    assert_eq!(reservation.position, Some(1));

    backdate(&svc, loan.id, 20).await;
    let loan = svc.execute(ReturnLoan { loan_id: loan.id }).await.unwrap();

    assert_eq!(loan.status(), loan::Status::Returned);
    assert_eq!(loan.fine.amount.to_string(), "300AOA");
    assert_eq!(stored_book(&svc, book.id).await.copies.available(), 1);
    assert!(stored_reservation(&svc, reservation.id).await.is_promoted());
}

#[tokio::test]
async fn approves_only_once() {
    let (svc, book, members) = library(2, 1).await;
    let loan = svc
        .execute(RequestLoan {
            member_id: members[0].id,
            book_id: book.id,
        })
        .await
        .unwrap();
    _ = svc.execute(ApproveLoan { loan_id: loan.id }).await.unwrap();

    let err = svc
        .execute(ApproveLoan { loan_id: loan.id })
        .await
        .unwrap_err();

    let err: &approve_loan::ExecutionError = err.as_ref();
    assert!(matches!(
        err,
        approve_loan::ExecutionError::Loan(
            loan::Error::InvalidStateTransition {
                from: loan::Status::Active,
                action: loan::Action::Approve,
            }
        ),
    ));
    assert_eq!(stored_book(&svc, book.id).await.copies.available(), 1);
}

#[tokio::test]
async fn resequences_queue_on_cancel() {
    let (svc, book, members) = library(1, 3).await;
    let (holder, x, y) = (&members[0], &members[1], &members[2]);
    _ = svc
        .execute(CheckoutLoan {
            member_id: holder.id,
            book_id: book.id,
        })
        .await
        .unwrap();

    let rx = svc
        .execute(CreateReservation {
            member_id: x.id,
            book_id: book.id,
        })
        .await
        .unwrap();
    let ry = svc
        .execute(CreateReservation {
            member_id: y.id,
            book_id: book.id,
        })
        .await
        .unwrap();
    assert_eq!((rx.position, ry.position), (Some(1), Some(2)));

    let cancelled = svc
        .execute(CancelReservation {
            reservation_id: rx.id,
        })
        .await
        .unwrap();

    assert_eq!(cancelled.status, reservation::Status::Cancelled);
    assert_eq!(cancelled.position, None);
    assert_eq!(stored_reservation(&svc, ry.id).await.position, Some(1));

    let err = svc
        .execute(CancelReservation {
            reservation_id: rx.id,
        })
        .await
        .unwrap_err();
    let err: &cancel_reservation::ExecutionError = err.as_ref();
    assert!(matches!(
        err,
        cancel_reservation::ExecutionError::Reservation(
            reservation::Error::NotActive(reservation::Status::Cancelled),
        ),
    ));
}

#[tokio::test]
async fn renews_twice_at_most() {
    let (svc, book, members) = library(1, 1).await;
    let loan = svc
        .execute(CheckoutLoan {
            member_id: members[0].id,
            book_id: book.id,
        })
        .await
        .unwrap();
    assert_eq!(loan.status(), loan::Status::Active);

    _ = svc.execute(RenewLoan { loan_id: loan.id }).await.unwrap();
    let renewed = svc.execute(RenewLoan { loan_id: loan.id }).await.unwrap();
    assert_eq!(renewed.renewals, 2);

    let err = svc
        .execute(RenewLoan { loan_id: loan.id })
        .await
        .unwrap_err();
    let err: &renew_loan::ExecutionError = err.as_ref();
    assert!(matches!(
        err,
        renew_loan::ExecutionError::Loan(loan::Error::RenewalLimitExceeded {
            max: 2,
        }),
    ));

    let stored = svc
        .database()
        .execute(Select(By::<Option<Loan>, _>::new(loan.id)))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.renewals, 2);
    assert_eq!(stored.term, renewed.term);
}

#[tokio::test]
async fn refuses_renewal_of_reserved_book() {
    let (svc, book, members) = library(1, 2).await;
    let loan = svc
        .execute(CheckoutLoan {
            member_id: members[0].id,
            book_id: book.id,
        })
        .await
        .unwrap();
    _ = svc
        .execute(CreateReservation {
            member_id: members[1].id,
            book_id: book.id,
        })
        .await
        .unwrap();

    let err = svc
        .execute(RenewLoan { loan_id: loan.id })
        .await
        .unwrap_err();

    let err: &renew_loan::ExecutionError = err.as_ref();
    assert!(matches!(
        err,
        renew_loan::ExecutionError::ReservationConflict(_),
    ));
}

#[tokio::test]
async fn holds_returned_copy_for_promoted_member() {
    let (svc, book, members) = library(1, 3).await;
    let (holder, x, y) = (&members[0], &members[1], &members[2]);
    let loan = svc
        .execute(CheckoutLoan {
            member_id: holder.id,
            book_id: book.id,
        })
        .await
        .unwrap();
    let rx = svc
        .execute(CreateReservation {
            member_id: x.id,
            book_id: book.id,
        })
        .await
        .unwrap();
    _ = svc.execute(ReturnLoan { loan_id: loan.id }).await.unwrap();

    let err = svc
        .execute(RequestLoan {
            member_id: y.id,
            book_id: book.id,
        })
        .await
        .unwrap_err();
    let err: &request_loan::ExecutionError = err.as_ref();
    assert!(matches!(
        err,
        request_loan::ExecutionError::ReservationConflict(_),
    ));

    let ry = svc
        .execute(CreateReservation {
            member_id: y.id,
            book_id: book.id,
        })
        .await
        .unwrap();
    assert_eq!(ry.position, Some(2));

    let requested = svc
        .execute(RequestLoan {
            member_id: x.id,
            book_id: book.id,
        })
        .await
        .unwrap();
    assert_eq!(requested.status(), loan::Status::Pending);
    let held = stored_reservation(&svc, rx.id).await;
    assert!(held.is_promoted());
    assert_eq!(held.position, Some(1));

    let err = svc
        .execute(RequestLoan {
            member_id: y.id,
            book_id: book.id,
        })
        .await
        .unwrap_err();
    let err: &request_loan::ExecutionError = err.as_ref();
    assert!(matches!(
        err,
        request_loan::ExecutionError::ReservationConflict(_),
    ));

    _ = svc
        .execute(ApproveLoan {
            loan_id: requested.id,
        })
        .await
        .unwrap();

    let rx = stored_reservation(&svc, rx.id).await;
    assert_eq!(rx.status, reservation::Status::Concluded);
    assert_eq!(rx.position, None);
    let ry = stored_reservation(&svc, ry.id).await;
    assert_eq!(ry.position, Some(1));
    assert!(!ry.is_promoted());
    assert_eq!(stored_book(&svc, book.id).await.copies.available(), 0);
}

#[tokio::test]
async fn refuses_approval_of_copy_held_for_another() {
    let (svc, book, members) = library(1, 3).await;
    let (a, c, x) = (&members[0], &members[1], &members[2]);
    let pending = svc
        .execute(RequestLoan {
            member_id: a.id,
            book_id: book.id,
        })
        .await
        .unwrap();
    let lent = svc
        .execute(CheckoutLoan {
            member_id: c.id,
            book_id: book.id,
        })
        .await
        .unwrap();
    let rx = svc
        .execute(CreateReservation {
            member_id: x.id,
            book_id: book.id,
        })
        .await
        .unwrap();
    _ = svc.execute(ReturnLoan { loan_id: lent.id }).await.unwrap();
    assert!(stored_reservation(&svc, rx.id).await.is_promoted());

    let err = svc
        .execute(ApproveLoan {
            loan_id: pending.id,
        })
        .await
        .unwrap_err();
    let err: &approve_loan::ExecutionError = err.as_ref();
    assert!(matches!(
        err,
        approve_loan::ExecutionError::ReservationConflict(_),
    ));
    assert_eq!(stored_book(&svc, book.id).await.copies.available(), 1);

    let requested = svc
        .execute(RequestLoan {
            member_id: x.id,
            book_id: book.id,
        })
        .await
        .unwrap();
    let approved = svc
        .execute(ApproveLoan {
            loan_id: requested.id,
        })
        .await
        .unwrap();
    assert_eq!(approved.status(), loan::Status::Active);
    assert_eq!(
        stored_reservation(&svc, rx.id).await.status,
        reservation::Status::Concluded,
    );
}

#[tokio::test]
async fn concludes_reservation_on_checkout() {
    let (svc, book, members) = library(1, 2).await;
    let (holder, x) = (&members[0], &members[1]);
    let lent = svc
        .execute(CheckoutLoan {
            member_id: holder.id,
            book_id: book.id,
        })
        .await
        .unwrap();
    let rx = svc
        .execute(CreateReservation {
            member_id: x.id,
            book_id: book.id,
        })
        .await
        .unwrap();
    _ = svc.execute(ReturnLoan { loan_id: lent.id }).await.unwrap();

    let loan = svc
        .execute(CheckoutLoan {
            member_id: x.id,
            book_id: book.id,
        })
        .await
        .unwrap();

    assert_eq!(loan.status(), loan::Status::Active);
    let rx = stored_reservation(&svc, rx.id).await;
    assert_eq!(rx.status, reservation::Status::Concluded);
    assert_eq!(rx.position, None);
}

#[tokio::test]
async fn promotes_next_on_cancel_of_holder() {
    let (svc, book, members) = library(1, 3).await;
    let (holder, x, y) = (&members[0], &members[1], &members[2]);
    let lent = svc
        .execute(CheckoutLoan {
            member_id: holder.id,
            book_id: book.id,
        })
        .await
        .unwrap();
    let rx = svc
        .execute(CreateReservation {
            member_id: x.id,
            book_id: book.id,
        })
        .await
        .unwrap();
    let ry = svc
        .execute(CreateReservation {
            member_id: y.id,
            book_id: book.id,
        })
        .await
        .unwrap();
    _ = svc.execute(ReturnLoan { loan_id: lent.id }).await.unwrap();
    assert!(stored_reservation(&svc, rx.id).await.is_promoted());
    assert!(!stored_reservation(&svc, ry.id).await.is_promoted());

    _ = svc
        .execute(CancelReservation {
            reservation_id: rx.id,
        })
        .await
        .unwrap();

    let ry = stored_reservation(&svc, ry.id).await;
    assert_eq!(ry.position, Some(1));
    assert!(ry.is_promoted());
    _ = svc
        .execute(RequestLoan {
            member_id: y.id,
            book_id: book.id,
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn rejects_ineligible_requests() {
    let (svc, book, members) = library(1, 2).await;
    let (m, blocked) = (&members[0], &members[1]);
    let mut b = blocked.clone();
    b.status = user::Status::Blocked;
    svc.database().execute(Insert(b)).await.unwrap();

    let err = svc
        .execute(RequestLoan {
            member_id: blocked.id,
            book_id: book.id,
        })
        .await
        .unwrap_err();
    let err: &request_loan::ExecutionError = err.as_ref();
    assert!(matches!(
        err,
        request_loan::ExecutionError::MemberBlocked(_),
    ));

    _ = svc
        .execute(RequestLoan {
            member_id: m.id,
            book_id: book.id,
        })
        .await
        .unwrap();
    let err = svc
        .execute(RequestLoan {
            member_id: m.id,
            book_id: book.id,
        })
        .await
        .unwrap_err();
    let err: &request_loan::ExecutionError = err.as_ref();
    assert!(matches!(err, request_loan::ExecutionError::DuplicateLoan(_)));

    let err = svc
        .execute(RequestLoan {
            member_id: m.id,
            book_id: book::Id::new(),
        })
        .await
        .unwrap_err();
    let err: &request_loan::ExecutionError = err.as_ref();
    assert!(matches!(
        err,
        request_loan::ExecutionError::BookNotExists(_),
    ));
}

#[tokio::test]
async fn blocks_member_owing_fines() {
    let (svc, book, members) = library(2, 1).await;
    let m = &members[0];
    let loan = svc
        .execute(CheckoutLoan {
            member_id: m.id,
            book_id: book.id,
        })
        .await
        .unwrap();
    backdate(&svc, loan.id, 16).await;
    _ = svc.execute(ReturnLoan { loan_id: loan.id }).await.unwrap();

    let err = svc
        .execute(CheckoutLoan {
            member_id: m.id,
            book_id: book.id,
        })
        .await
        .unwrap_err();
    let err: &checkout_loan::ExecutionError = err.as_ref();
    assert!(matches!(
        err,
        checkout_loan::ExecutionError::MemberBlocked(_),
    ));

    let payment = svc.execute(SettleFine::ByMember(m.id)).await.unwrap();
    assert_eq!(payment.loan_ids, [loan.id]);
    assert_eq!(payment.total.to_string(), "100AOA");

    let err = svc.execute(SettleFine::ByLoan(loan.id)).await.unwrap_err();
    let err: &settle_fine::ExecutionError = err.as_ref();
    assert!(matches!(
        err,
        settle_fine::ExecutionError::Loan(loan::Error::AlreadyPaid),
    ));

    _ = svc
        .execute(CheckoutLoan {
            member_id: m.id,
            book_id: book.id,
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn keeps_lent_books() {
    let (svc, book, members) = library(1, 1).await;
    let loan = svc
        .execute(CheckoutLoan {
            member_id: members[0].id,
            book_id: book.id,
        })
        .await
        .unwrap();

    let err = svc
        .execute(DeleteBook { book_id: book.id })
        .await
        .unwrap_err();
    let err: &delete_book::ExecutionError = err.as_ref();
    assert!(matches!(
        err,
        delete_book::ExecutionError::BookHasOutstandingLoans(_),
    ));

    _ = svc.execute(ReturnLoan { loan_id: loan.id }).await.unwrap();
    svc.execute(DeleteBook { book_id: book.id }).await.unwrap();
    assert!(svc
        .database()
        .execute(Select(By::<Option<Book>, _>::new(book.id)))
        .await
        .unwrap()
        .is_none());
}
