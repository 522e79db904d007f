//! [`Author`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::operations::{By, Delete, Insert, Select};
use tracerr::Traced;

use crate::{
    domain::{author, Author},
    infra::{
        database::{
            self,
            memory::{Memory, Storage},
        },
        Database,
    },
};

impl<S, IDs> Database<Select<By<HashMap<author::Id, Author>, IDs>>>
    for Memory<S>
where
    S: Storage,
    IDs: AsRef<[author::Id]>,
{
    type Ok = HashMap<author::Id, Author>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<author::Id, Author>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        Ok(self
            .read(|s| {
                ids.as_ref()
                    .iter()
                    .filter_map(|id| s.authors.get_key_value(id))
                    .map(|(id, a)| (*id, a.clone()))
                    .collect()
            })
            .await)
    }
}

impl<S: Storage> Database<Select<By<Option<Author>, author::Id>>>
    for Memory<S>
{
    type Ok = Option<Author>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Author>, author::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self.read(|s| s.authors.get(&id).cloned()).await)
    }
}

impl<S: Storage> Database<Select<By<Vec<Author>, ()>>> for Memory<S> {
    type Ok = Vec<Author>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Select<By<Vec<Author>, ()>>,
    ) -> Result<Self::Ok, Self::Err> {
        let mut authors = self
            .read(|s| s.authors.values().cloned().collect::<Vec<_>>())
            .await;
        authors.sort_by(|a, b| {
            AsRef::<str>::as_ref(&a.name)
                .cmp(AsRef::<str>::as_ref(&b.name))
        });
        Ok(authors)
    }
}

impl<S: Storage> Database<Insert<Author>> for Memory<S> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(author): Insert<Author>,
    ) -> Result<Self::Ok, Self::Err> {
        self.write(|s| drop(s.authors.insert(author.id, author)))
            .await;
        Ok(())
    }
}

impl<S: Storage> Database<Delete<By<Author, author::Id>>> for Memory<S> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Author, author::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.write(|s| drop(s.authors.remove(&id))).await;
        Ok(())
    }
}
