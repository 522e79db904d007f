//! [`Command`] for creating a new [`User`].

use common::{
    operations::{By, Commit, Insert, Select, Transact, Transacted},
    DateTime,
};
use derive_more::{Display, Error, From};
use secrecy::{ExposeSecret, SecretBox};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::user::{Email, Enrollment, Name, Password, Role, Status};
use crate::{
    domain::{user, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`User`].
#[derive(Clone, Debug)]
pub struct CreateUser {
    /// [`Enrollment`] number of a new [`User`].
    pub enrollment: user::Enrollment,

    /// [`Name`] of a new [`User`].
    pub name: user::Name,

    /// [`Email`] of a new [`User`].
    pub email: user::Email,

    /// [`Password`] of a new [`User`].
    pub password: SecretBox<user::Password>,

    /// [`Role`] of a new [`User`].
    pub role: user::Role,

    /// [`Status`] of a new [`User`].
    pub status: user::Status,
}

impl<Db> Command<CreateUser> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: for<'e> Database<
            Select<By<Option<User>, &'e user::Email>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<User>, user::Enrollment>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Insert<User>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = User;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateUser) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateUser {
            enrollment,
            name,
            email,
            password,
            role,
            status,
        } = cmd;

        let password_hash = user::PasswordHash::new(password.expose_secret())
            .map_err(tracerr::from_and_wrap!(=> E))?;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let u = tx
            .execute(Select(By::new(&email)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if u.is_some() {
            return Err(tracerr::new!(E::EmailOccupied(email)));
        }
        let u = tx
            .execute(Select(By::<Option<User>, _>::new(enrollment)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if u.is_some() {
            return Err(tracerr::new!(E::EnrollmentOccupied(enrollment)));
        }

        let user = User {
            id: user::Id::new(),
            enrollment,
            name,
            email,
            password_hash,
            role,
            status,
            created_at: DateTime::now().coerce(),
            deleted_at: None,
        };

        let inserted = tx.execute(Insert(user.clone())).await;
        if let Err(e) = &inserted {
            let e: &database::Error = e.as_ref();
            if e.is_unique_violation("users_email_unique") {
                return Err(tracerr::new!(E::EmailOccupied(user.email)));
            }
            if e.is_unique_violation("users_enrollment_unique") {
                return Err(tracerr::new!(E::EnrollmentOccupied(enrollment)));
            }
        }
        inserted
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(user)
    }
}

/// Error of [`CreateUser`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Password`] hashing failed.
    #[display("Failed to hash `Password`: {_0}")]
    #[from]
    Bcrypt(bcrypt::BcryptError),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Email`] is already occupied.
    #[display("`{_0}` email is occupied")]
    EmailOccupied(#[error(not(source))] user::Email),

    /// [`Enrollment`] number is already occupied.
    #[display("`{_0}` enrollment is occupied")]
    EnrollmentOccupied(#[error(not(source))] user::Enrollment),
}

#[cfg(test)]
mod spec {
    use common::operations::Insert;
    use secrecy::SecretBox;

    use crate::{
        command::spec::member,
        domain::user,
        infra::{Database as _, Memory},
        Command as _, Service,
    };

    use super::{CreateUser, ExecutionError};

    fn cmd(enrollment: i32, email: &str) -> CreateUser {
        CreateUser {
            enrollment: user::Enrollment::new(enrollment).unwrap(),
            name: user::Name::new("Ana Lemos").unwrap(),
            email: user::Email::new(email).unwrap(),
            password: SecretBox::new(Box::new(
                user::Password::new("password").unwrap(),
            )),
            role: user::Role::Member,
            status: user::Status::Active,
        }
    }

    #[tokio::test]
    async fn rejects_occupied_email_and_enrollment() {
        let svc = Service::for_tests(Memory::new());
        let existing = member(1);
        svc.database().execute(Insert(existing.clone())).await.unwrap();

        let err = svc
            .execute(cmd(2, existing.email.as_ref()))
            .await
            .unwrap_err();
        let err: &ExecutionError = err.as_ref();
        assert!(matches!(err, ExecutionError::EmailOccupied(_)));

        let err = svc.execute(cmd(1, "new@biblio.ao")).await.unwrap_err();
        let err: &ExecutionError = err.as_ref();
        assert!(matches!(err, ExecutionError::EnrollmentOccupied(_)));

        let created = svc.execute(cmd(2, "new@biblio.ao")).await.unwrap();
        assert!(created
            .password_hash
            .verify(&user::Password::new("password").unwrap()));
    }
}
