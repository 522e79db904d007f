//! [`Handler`] abstractions.
//!
//! Commands, queries, background tasks and storage operations of the service
//! are all [`Handler`]s over different `Args`: a single value may handle
//! several kinds of arguments, each with its own result.

use std::future::Future;

/// Asynchronous handler of the provided `Args`.
pub trait Handler<Args = ()> {
    /// Type of a successful result.
    type Ok;

    /// Type of an error this [`Handler`] fails with.
    type Err;

    /// Handles the provided `args`.
    fn execute(
        &self,
        args: Args,
    ) -> impl Future<Output = Result<Self::Ok, Self::Err>>;
}
