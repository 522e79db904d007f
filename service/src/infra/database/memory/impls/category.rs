//! [`Category`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::operations::{By, Delete, Insert, Select};
use tracerr::Traced;

use crate::{
    domain::{category, Category},
    infra::{
        database::{
            self,
            memory::{Memory, Storage},
        },
        Database,
    },
};

impl<S, IDs> Database<Select<By<HashMap<category::Id, Category>, IDs>>>
    for Memory<S>
where
    S: Storage,
    IDs: AsRef<[category::Id]>,
{
    type Ok = HashMap<category::Id, Category>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<category::Id, Category>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        Ok(self
            .read(|s| {
                ids.as_ref()
                    .iter()
                    .filter_map(|id| s.categories.get_key_value(id))
                    .map(|(id, a)| (*id, a.clone()))
                    .collect()
            })
            .await)
    }
}

impl<S: Storage> Database<Select<By<Option<Category>, category::Id>>>
    for Memory<S>
{
    type Ok = Option<Category>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Category>, category::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self.read(|s| s.categories.get(&id).cloned()).await)
    }
}

impl<S: Storage> Database<Select<By<Vec<Category>, ()>>> for Memory<S> {
    type Ok = Vec<Category>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Select<By<Vec<Category>, ()>>,
    ) -> Result<Self::Ok, Self::Err> {
        let mut categories = self
            .read(|s| s.categories.values().cloned().collect::<Vec<_>>())
            .await;
        categories.sort_by(|a, b| {
            AsRef::<str>::as_ref(&a.name)
                .cmp(AsRef::<str>::as_ref(&b.name))
        });
        Ok(categories)
    }
}

impl<S: Storage> Database<Insert<Category>> for Memory<S> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(category): Insert<Category>,
    ) -> Result<Self::Ok, Self::Err> {
        self.write(|s| drop(s.categories.insert(category.id, category)))
            .await;
        Ok(())
    }
}

impl<S: Storage> Database<Delete<By<Category, category::Id>>> for Memory<S> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Category, category::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.write(|s| drop(s.categories.remove(&id))).await;
        Ok(())
    }
}
