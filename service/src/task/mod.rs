//! Background [`Task`]s definitions.

mod background;
pub mod expire_reservations;
pub mod materialize_fines;

pub use common::Handler as Task;

pub use self::{
    background::{Background, Failure},
    expire_reservations::ExpireReservations,
    materialize_fines::MaterializeFines,
};
