//! Marker types distinguishing the moments in an entity lifecycle.
//!
//! Used as the second element of a [`DateTimeOf`] tag.

#[cfg(doc)]
use crate::DateTimeOf;

/// Creation of an entity.
#[derive(Clone, Copy, Debug)]
pub struct Creation;

/// Soft deletion of an entity.
#[derive(Clone, Copy, Debug)]
pub struct Deletion;

/// Handing an item over to its borrower.
#[derive(Clone, Copy, Debug)]
pub struct Lending;

/// Deadline of bringing a borrowed item back.
#[derive(Clone, Copy, Debug)]
pub struct Due;

/// Bringing a borrowed item back.
#[derive(Clone, Copy, Debug)]
pub struct Return;

/// Settling a debt.
#[derive(Clone, Copy, Debug)]
pub struct Payment;

/// Informing someone an item is held for them.
#[derive(Clone, Copy, Debug)]
pub struct Notification;

/// End of something's validity.
#[derive(Clone, Copy, Debug)]
pub struct Expiration;

/// Closing of an entity, either fulfilled or cancelled.
#[derive(Clone, Copy, Debug)]
pub struct Closing;
