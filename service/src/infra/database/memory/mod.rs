//! In-memory [`Database`] implementation.

mod impls;

use std::{collections::HashMap, future::Future, sync::Arc};

use common::operations::{Commit, Transact};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracerr::Traced;

use crate::{
    domain::{
        author, book, category, loan, reservation, user, Author, Book,
        Category, Loan, Reservation, User,
    },
    infra::{database, Database},
};

/// In-memory [`Database`] client.
///
/// Transactions are serialized: a [`Tx`] holds the whole [`State`] exclusively
/// until it's committed or dropped, and a dropped [`Tx`] discards its changes.
#[derive(Clone, Debug, Default)]
pub struct Memory<S = NonTx>(S);

impl Memory {
    /// Creates a new empty [`Memory`] client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Stored entities.
#[derive(Clone, Debug, Default)]
pub struct State {
    /// Stored [`User`]s.
    pub(crate) users: HashMap<user::Id, User>,

    /// Stored [`Author`]s.
    pub(crate) authors: HashMap<author::Id, Author>,

    /// Stored [`Category`]s.
    pub(crate) categories: HashMap<category::Id, Category>,

    /// Stored [`Book`]s.
    pub(crate) books: HashMap<book::Id, Book>,

    /// Stored [`Loan`]s.
    pub(crate) loans: HashMap<loan::Id, Loan>,

    /// Stored [`Reservation`]s.
    pub(crate) reservations: HashMap<reservation::Id, Reservation>,
}

/// Access to a [`State`] of a [`Memory`] client.
pub trait Storage {
    /// Reads the [`State`] with the provided function.
    fn read<R>(&self, f: impl FnOnce(&State) -> R) -> impl Future<Output = R>;

    /// Modifies the [`State`] with the provided function.
    fn write<R>(
        &self,
        f: impl FnOnce(&mut State) -> R,
    ) -> impl Future<Output = R>;
}

/// Non-transactional [`Memory`] client.
#[derive(Clone, Debug, Default)]
pub struct NonTx(Arc<Mutex<State>>);

impl Storage for NonTx {
    async fn read<R>(&self, f: impl FnOnce(&State) -> R) -> R {
        f(&*self.0.lock().await)
    }

    async fn write<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        f(&mut *self.0.lock().await)
    }
}

/// Transactional [`Memory`] client.
#[derive(Clone, Debug)]
pub struct Tx(Arc<Mutex<Option<Staged>>>);

/// [`State`] changes staged by a [`Tx`].
#[derive(Debug)]
struct Staged {
    /// Exclusively held committed [`State`].
    committed: OwnedMutexGuard<State>,

    /// [`State`] visible inside the [`Tx`].
    staged: State,
}

impl Storage for Tx {
    async fn read<R>(&self, f: impl FnOnce(&State) -> R) -> R {
        let tx = self.0.lock().await;
        f(&tx.as_ref().expect("already committed").staged)
    }

    async fn write<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let mut tx = self.0.lock().await;
        f(&mut tx.as_mut().expect("already committed").staged)
    }
}

impl<S: Storage> Storage for Memory<S> {
    fn read<R>(&self, f: impl FnOnce(&State) -> R) -> impl Future<Output = R> {
        self.0.read(f)
    }

    fn write<R>(
        &self,
        f: impl FnOnce(&mut State) -> R,
    ) -> impl Future<Output = R> {
        self.0.write(f)
    }
}

impl Database<Transact> for Memory<NonTx> {
    type Ok = Memory<Tx>;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        let committed = Arc::clone(&self.0 .0).lock_owned().await;
        let staged = committed.clone();
        Ok(Memory(Tx(Arc::new(Mutex::new(Some(Staged {
            committed,
            staged,
        }))))))
    }
}

impl Database<Transact> for Memory<Tx> {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(self.clone())
    }
}

impl Database<Commit> for Memory<Tx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
        if let Some(Staged {
            mut committed,
            staged,
        }) = self.0 .0.lock().await.take()
        {
            *committed = staged;
        }
        Ok(())
    }
}

#[cfg(test)]
mod spec {
    use common::operations::{By, Commit, Insert, Select, Transact};

    use crate::{
        domain::{author, Author},
        infra::Database as _,
    };

    use super::Memory;

    fn author() -> Author {
        Author {
            id: author::Id::new(),
            name: author::Name::new("Pepetela").unwrap(),
            description: None,
            created_at: common::DateTime::now().coerce(),
        }
    }

    #[tokio::test]
    async fn commits_staged_changes() {
        let db = Memory::new();
        let author = author();

        let tx = db.execute(Transact).await.unwrap();
        tx.execute(Insert(author.clone())).await.unwrap();
        tx.execute(Commit).await.unwrap();
        drop(tx);

        let stored = db
            .execute(Select(By::<Option<Author>, _>::new(author.id)))
            .await
            .unwrap();
        assert_eq!(stored.map(|a| a.id), Some(author.id));
    }

    #[tokio::test]
    async fn rolls_back_on_drop() {
        let db = Memory::new();
        let author = author();

        let tx = db.execute(Transact).await.unwrap();
        tx.execute(Insert(author.clone())).await.unwrap();
        drop(tx);

        let stored = db
            .execute(Select(By::<Option<Author>, _>::new(author.id)))
            .await
            .unwrap();
        assert!(stored.is_none());
    }
}
