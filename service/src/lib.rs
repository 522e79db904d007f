//! Service contains the business logic of the application.
//!
//! List of available Cargo features:
#![doc = document_features::document_features!()]
#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod command;
pub mod domain;
pub mod infra;
pub mod query;
pub mod read;
pub mod task;

use std::time::Duration;

use common::operations::{By, Start};
use derive_more::{Debug, Display, Error};

#[cfg(doc)]
use infra::Database;

pub use self::{command::Command, query::Query, task::Task};

/// [`Service`] configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// [JWT] encoding key.
    ///
    /// [JWT]: https://datatracker.ietf.org/doc/html/rfc7519
    #[debug(skip)]
    pub jwt_encoding_key: jsonwebtoken::EncodingKey,

    /// [JWT] decoding key.
    ///
    /// [JWT]: https://datatracker.ietf.org/doc/html/rfc7519
    #[debug(skip)]
    pub jwt_decoding_key: jsonwebtoken::DecodingKey,

    /// [`Duration`] a [`domain::user::Session`] stays valid for.
    pub session_ttl: Duration,

    /// Lending [`domain::Policy`].
    pub policy: domain::Policy,

    /// [`task::MaterializeFines`] configuration.
    pub materialize_fines: task::materialize_fines::Config,

    /// [`task::ExpireReservations`] configuration.
    pub expire_reservations: task::expire_reservations::Config,
}

/// Domain service.
#[derive(Clone, Debug)]
pub struct Service<Db> {
    /// Configuration of this [`Service`].
    config: Config,

    /// [`Database`] of this [`Service`].
    database: Db,
}

impl<Db> Service<Db> {
    /// Creates a new [`Service`] with the provided parameters.
    pub fn new(config: Config, database: Db) -> (Self, task::Background)
    where
        Self: Task<
                Start<
                    By<
                        task::MaterializeFines<Self>,
                        task::materialize_fines::Config,
                    >,
                >,
                Ok = (),
                Err: Error,
            > + Task<
                Start<
                    By<
                        task::ExpireReservations<Self>,
                        task::expire_reservations::Config,
                    >,
                >,
                Ok = (),
                Err: Error,
            > + Clone
            + 'static,
    {
        let this = Service { config, database };

        let mut bg = task::Background::default();
        let svc = this.clone();
        bg.spawn("materialize_fines", async move {
            svc.execute(Start(By::<task::MaterializeFines<Self>, _>::new(
                svc.config().materialize_fines,
            )))
            .await
        });
        let svc = this.clone();
        bg.spawn("expire_reservations", async move {
            svc.execute(Start(By::<task::ExpireReservations<Self>, _>::new(
                svc.config().expire_reservations,
            )))
            .await
        });

        (this, bg)
    }

    /// Returns [`Config`] of this [`Service`].
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns [`Database`] of this [`Service`].
    #[must_use]
    pub fn database(&self) -> &Db {
        &self.database
    }
}

#[cfg(test)]
impl<Db> Service<Db> {
    /// Creates a new [`Service`] with the default [`domain::Policy`] and no
    /// background [`Task`]s running.
    pub(crate) fn for_tests(database: Db) -> Self {
        let secret = b"secret";
        Self {
            config: Config {
                jwt_encoding_key: jsonwebtoken::EncodingKey::from_secret(
                    secret,
                ),
                jwt_decoding_key: jsonwebtoken::DecodingKey::from_secret(
                    secret,
                ),
                session_ttl: Duration::from_secs(30 * 60),
                policy: domain::Policy::default(),
                materialize_fines: task::materialize_fines::Config {
                    interval: Duration::from_secs(60),
                },
                expire_reservations: task::expire_reservations::Config {
                    interval: Duration::from_secs(60),
                },
            },
            database,
        }
    }
}

/// Shortcut for the error of starting a [`Task`].
type TaskStartError<Svc, T, Args> = <Svc as Task<Start<By<T, Args>>>>::Err;

/// Error of starting a [`Service`].
#[derive(Debug, Display, Error)]
pub enum StartupError<Svc>
where
    Svc: Task<
            Start<
                By<
                    task::MaterializeFines<Svc>,
                    task::materialize_fines::Config,
                >,
            >,
        > + Task<
            Start<
                By<
                    task::ExpireReservations<Svc>,
                    task::expire_reservations::Config,
                >,
            >,
        >,
{
    /// [`task::MaterializeFines`] failed to start.
    MaterializeFinesTask(
        TaskStartError<
            Svc,
            task::MaterializeFines<Svc>,
            task::materialize_fines::Config,
        >,
    ),

    /// [`task::ExpireReservations`] failed to start.
    ExpireReservationsTask(
        TaskStartError<
            Svc,
            task::ExpireReservations<Svc>,
            task::expire_reservations::Config,
        >,
    ),
}
