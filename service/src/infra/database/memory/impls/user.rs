//! [`User`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::operations::{By, Insert, Lock, Select};
use tracerr::Traced;

use crate::{
    domain::{user, User},
    infra::{
        database::{
            self,
            memory::{Memory, Storage},
        },
        Database,
    },
    read,
};

use super::contains_ignore_case;

impl<S, IDs> Database<Select<By<HashMap<user::Id, User>, IDs>>> for Memory<S>
where
    S: Storage,
    IDs: AsRef<[user::Id]>,
{
    type Ok = HashMap<user::Id, User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<user::Id, User>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        Ok(self
            .read(|s| {
                ids.as_ref()
                    .iter()
                    .filter_map(|id| s.users.get(id))
                    .filter(|u| u.deleted_at.is_none())
                    .map(|u| (u.id, u.clone()))
                    .collect()
            })
            .await)
    }
}

impl<S: Storage> Database<Select<By<Option<User>, user::Id>>> for Memory<S> {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self
            .read(|s| {
                s.users.get(&id).filter(|u| u.deleted_at.is_none()).cloned()
            })
            .await)
    }
}

impl<'e, S: Storage> Database<Select<By<Option<User>, &'e user::Email>>>
    for Memory<S>
{
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, &'e user::Email>>,
    ) -> Result<Self::Ok, Self::Err> {
        let email = by.into_inner();
        Ok(self
            .read(|s| {
                s.users
                    .values()
                    .find(|u| u.deleted_at.is_none() && &u.email == email)
                    .cloned()
            })
            .await)
    }
}

impl<S: Storage> Database<Select<By<Option<User>, user::Enrollment>>>
    for Memory<S>
{
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::Enrollment>>,
    ) -> Result<Self::Ok, Self::Err> {
        let enrollment = by.into_inner();
        Ok(self
            .read(|s| {
                s.users
                    .values()
                    .find(|u| {
                        u.deleted_at.is_none() && u.enrollment == enrollment
                    })
                    .cloned()
            })
            .await)
    }
}

impl<S: Storage> Database<Select<By<Vec<User>, read::user::list::Filter>>>
    for Memory<S>
{
    type Ok = Vec<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<User>, read::user::list::Filter>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::user::list::Filter { name, role, status } = by.into_inner();
        let mut users = self
            .read(|s| {
                s.users
                    .values()
                    .filter(|u| u.deleted_at.is_none())
                    .filter(|u| {
                        name.as_ref().map_or(true, |n| {
                            contains_ignore_case(u.name.as_ref(), n.as_ref())
                        })
                    })
                    .filter(|u| role.map_or(true, |r| u.role == r))
                    .filter(|u| status.map_or(true, |st| u.status == st))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .await;
        users.sort_by_key(|u| u.enrollment);
        Ok(users)
    }
}

impl<S: Storage> Database<Insert<User>> for Memory<S> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(user): Insert<User>,
    ) -> Result<Self::Ok, Self::Err> {
        self.write(|s| drop(s.users.insert(user.id, user))).await;
        Ok(())
    }
}

impl<S: Storage> Database<Lock<By<User, user::Id>>> for Memory<S> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<User, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // `Tx` holds the whole state exclusively already.
        Ok(())
    }
}
