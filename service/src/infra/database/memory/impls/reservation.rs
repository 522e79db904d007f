//! [`Reservation`]-related [`Database`] implementations.

use common::operations::{By, Insert, Select};
use tracerr::Traced;

use crate::{
    domain::{reservation, Reservation},
    infra::{
        database::{
            self,
            memory::{Memory, Storage},
        },
        Database,
    },
    read,
};

impl<S> Database<Select<By<Option<Reservation>, reservation::Id>>>
    for Memory<S>
where
    S: Storage,
{
    type Ok = Option<Reservation>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Reservation>, reservation::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self.read(|s| s.reservations.get(&id).cloned()).await)
    }
}

impl<S> Database<Select<By<Vec<Reservation>, read::reservation::list::Filter>>>
    for Memory<S>
where
    S: Storage,
{
    type Ok = Vec<Reservation>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Vec<Reservation>, read::reservation::list::Filter>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::reservation::list::Filter {
            member_id,
            book_id,
            active_only,
        } = by.into_inner();
        let mut reservations = self
            .read(|s| {
                s.reservations
                    .values()
                    .filter(|r| member_id.map_or(true, |id| r.member_id == id))
                    .filter(|r| book_id.map_or(true, |id| r.book_id == id))
                    .filter(|r| {
                        !active_only || r.status == reservation::Status::Active
                    })
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .await;
        reservations.sort_by_key(|r| (r.created_at, r.id));
        Ok(reservations)
    }
}

impl<S: Storage> Database<Insert<Reservation>> for Memory<S> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(reservation): Insert<Reservation>,
    ) -> Result<Self::Ok, Self::Err> {
        self.write(|s| {
            drop(s.reservations.insert(reservation.id, reservation));
        })
        .await;
        Ok(())
    }
}
