//! [`Reservation`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf};
use derive_more::{Display, Error as StdError, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(doc)]
use crate::domain::Book;
use crate::domain::{book, user, Policy};

/// Place of a member in the waiting line for a [`Book`] with no free copies.
#[derive(Clone, Debug)]
pub struct Reservation {
    /// ID of this [`Reservation`].
    pub id: Id,

    /// ID of the reserved [`Book`].
    pub book_id: book::Id,

    /// ID of the member holding this [`Reservation`].
    pub member_id: user::Id,

    /// [`Status`] of this [`Reservation`].
    pub status: Status,

    /// 1-based position of this [`Reservation`] in its [`Queue`].
    ///
    /// [`None`] once this [`Reservation`] leaves the [`Queue`].
    pub position: Option<u16>,

    /// [`DateTime`] when this [`Reservation`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when the holder was notified about a free copy.
    pub notified_at: Option<NotificationDateTime>,

    /// [`DateTime`] when this [`Reservation`] was concluded or cancelled.
    pub closed_at: Option<ClosingDateTime>,
}

impl Reservation {
    /// Creates a new [`Status::Active`] [`Reservation`], not queued yet.
    #[must_use]
    pub fn new(book_id: book::Id, member_id: user::Id) -> Self {
        Self {
            id: Id::new(),
            book_id,
            member_id,
            status: Status::Active,
            position: None,
            created_at: CreationDateTime::now(),
            notified_at: None,
            closed_at: None,
        }
    }

    /// Indicates whether the holder of this [`Reservation`] was notified about
    /// a free copy and may borrow it.
    #[must_use]
    pub fn is_promoted(&self) -> bool {
        self.status == Status::Active && self.notified_at.is_some()
    }

    /// Returns [`DateTime`] when the promoted holder loses the right to
    /// borrow the [`Book`], if the holder was promoted.
    #[must_use]
    pub fn expires_at(&self, policy: &Policy) -> Option<ExpirationDateTime> {
        self.notified_at
            .map(|at| (at + policy.reservation_expiry).coerce())
    }

    /// Indicates whether the window of the promoted holder has elapsed at the
    /// provided moment.
    #[must_use]
    pub fn is_expired_at<Of: ?Sized>(
        &self,
        now: DateTimeOf<Of>,
        policy: &Policy,
    ) -> bool {
        self.status == Status::Active
            && self
                .expires_at(policy)
                .is_some_and(|at| at < now.coerce())
    }

    /// Concludes this [`Reservation`], as its holder borrowed the [`Book`].
    ///
    /// # Errors
    ///
    /// With [`Error::NotActive`] if this [`Reservation`] is closed already.
    pub fn conclude(&mut self) -> Result<(), Error> {
        self.close(Status::Concluded)
    }

    /// Cancels this [`Reservation`].
    ///
    /// # Errors
    ///
    /// With [`Error::NotActive`] if this [`Reservation`] is closed already.
    pub fn cancel(&mut self) -> Result<(), Error> {
        self.close(Status::Cancelled)
    }

    /// Moves this [`Status::Active`] [`Reservation`] into the provided
    /// terminal [`Status`].
    fn close(&mut self, status: Status) -> Result<(), Error> {
        if self.status != Status::Active {
            return Err(Error::NotActive(self.status));
        }
        self.status = status;
        self.position = None;
        self.closed_at = Some(ClosingDateTime::now());
        Ok(())
    }
}

/// ID of a [`Reservation`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

define_kind! {
    #[doc = "Status of a [`Reservation`]."]
    enum Status {
        #[doc = "Waiting in the [`Queue`]."]
        Active = 1,

        #[doc = "Converted into a loan by its holder."]
        Concluded = 2,

        #[doc = "Cancelled by its holder, an administrator or an expiry."]
        Cancelled = 3,
    }
}

/// Error of a [`Reservation`] transition.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, StdError)]
pub enum Error {
    /// [`Reservation`] is not [`Status::Active`] anymore.
    #[display("`Reservation` is `{_0}` already")]
    NotActive(#[error(not(source))] Status),
}

/// FIFO line of [`Status::Active`] [`Reservation`]s of a single [`Book`].
///
/// Ordered by creation [`DateTime`] and then by [`Id`].
#[derive(Clone, Debug, Default)]
pub struct Queue(Vec<Reservation>);

impl Queue {
    /// Builds a [`Queue`] out of the provided [`Reservation`]s, skipping the
    /// closed ones.
    #[must_use]
    pub fn new(reservations: impl IntoIterator<Item = Reservation>) -> Self {
        let mut queue = Self(
            reservations
                .into_iter()
                .filter(|r| r.status == Status::Active)
                .collect(),
        );
        queue.0.sort_by_key(|r| (r.created_at, r.id));
        queue
    }

    /// Returns the number of [`Reservation`]s in this [`Queue`].
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Indicates whether this [`Queue`] has no [`Reservation`]s.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the [`Reservation`]s of this [`Queue`] in order.
    pub fn iter(&self) -> impl Iterator<Item = &Reservation> {
        self.0.iter()
    }

    /// Returns the [`Reservation`] of the provided member, if any.
    #[must_use]
    pub fn of_member(&self, member_id: user::Id) -> Option<&Reservation> {
        self.0.iter().find(|r| r.member_id == member_id)
    }

    /// Returns the promoted [`Reservation`] of the provided member, if the
    /// member holds a free copy.
    #[must_use]
    pub fn held_by(&self, member_id: user::Id) -> Option<&Reservation> {
        self.of_member(member_id).filter(|r| r.is_promoted())
    }

    /// Returns the number of promoted holders in this [`Queue`].
    #[must_use]
    pub fn promoted(&self) -> usize {
        self.0.iter().filter(|r| r.is_promoted()).count()
    }

    /// Returns the number of promoted holders in this [`Queue`] other than
    /// the provided member.
    #[must_use]
    pub fn promoted_except(&self, member_id: user::Id) -> usize {
        self.0
            .iter()
            .filter(|r| r.is_promoted() && r.member_id != member_id)
            .count()
    }

    /// Appends the provided [`Reservation`] to the tail of this [`Queue`],
    /// assigning its position.
    pub fn enqueue(&mut self, mut reservation: Reservation) -> &Reservation {
        reservation.position = u16::try_from(self.0.len() + 1).ok();
        self.0.push(reservation);
        &self.0[self.0.len() - 1]
    }

    /// Removes the [`Reservation`] with the provided [`Id`] from this
    /// [`Queue`], re-sequencing the remaining ones.
    ///
    /// Returns the removed [`Reservation`], if it was queued.
    pub fn remove(&mut self, id: Id) -> Option<Reservation> {
        let idx = self.0.iter().position(|r| r.id == id)?;
        let removed = self.0.remove(idx);
        _ = self.resequence();
        Some(removed)
    }

    /// Assigns contiguous `1..=N` positions to the [`Reservation`]s of this
    /// [`Queue`].
    ///
    /// Returns [`Id`]s of the [`Reservation`]s whose position has changed.
    pub fn resequence(&mut self) -> Vec<Id> {
        let mut changed = Vec::new();
        for (n, r) in self.0.iter_mut().enumerate() {
            let pos = u16::try_from(n + 1).ok();
            if r.position != pos {
                r.position = pos;
                changed.push(r.id);
            }
        }
        changed
    }

    /// Notifies holders at the head of this [`Queue`] about the `available`
    /// free copies of the [`Book`], so that every free copy is covered by
    /// exactly one promoted holder.
    ///
    /// Returns [`Id`]s of the newly promoted [`Reservation`]s.
    pub fn promote(&mut self, available: u16) -> Vec<Id> {
        let now = NotificationDateTime::now();
        let mut promoted = Vec::new();
        for r in self.0.iter_mut().take(usize::from(available)) {
            if r.notified_at.is_none() {
                r.notified_at = Some(now);
                promoted.push(r.id);
            }
        }
        promoted
    }

    /// Removes the promoted [`Reservation`]s whose window has elapsed at the
    /// provided moment, cancelling them and re-sequencing the rest.
    ///
    /// Holders listed in `claimed` have requested the [`Book`] in time, so
    /// their [`Reservation`]s never expire.
    pub fn expire<Of: ?Sized>(
        &mut self,
        now: DateTimeOf<Of>,
        policy: &Policy,
        claimed: &[user::Id],
    ) -> Vec<Reservation> {
        let (mut expired, alive) = std::mem::take(&mut self.0)
            .into_iter()
            .partition::<Vec<_>, _>(|r| {
                r.is_expired_at(now, policy) && !claimed.contains(&r.member_id)
            });
        self.0 = alive;
        for r in &mut expired {
            r.status = Status::Cancelled;
            r.position = None;
            r.closed_at = Some(now.coerce());
        }
        _ = self.resequence();
        expired
    }

    /// Concludes the promoted [`Reservation`] of the provided member, as the
    /// member borrowed the [`Book`], and re-sequences the rest.
    ///
    /// Returns the concluded [`Reservation`], if the member held a copy.
    ///
    /// # Errors
    ///
    /// With [`Error::NotActive`] if the [`Reservation`] is closed already.
    pub fn conclude(
        &mut self,
        member_id: user::Id,
    ) -> Result<Option<Reservation>, Error> {
        let Some(id) = self.held_by(member_id).map(|r| r.id) else {
            return Ok(None);
        };
        let mut held = self.remove(id);
        if let Some(r) = &mut held {
            r.conclude()?;
        }
        Ok(held)
    }

    /// Returns the [`Reservation`]s of this [`Queue`].
    #[must_use]
    pub fn into_inner(self) -> Vec<Reservation> {
        self.0
    }
}

/// [`DateTime`] when a [`Reservation`] was created.
pub type CreationDateTime = DateTimeOf<(Reservation, unit::Creation)>;

/// [`DateTime`] when a [`Reservation`] holder was notified.
pub type NotificationDateTime =
    DateTimeOf<(Reservation, unit::Notification)>;

/// [`DateTime`] when a promoted [`Reservation`] expires.
pub type ExpirationDateTime = DateTimeOf<(Reservation, unit::Expiration)>;

/// [`DateTime`] when a [`Reservation`] was concluded or cancelled.
pub type ClosingDateTime = DateTimeOf<(Reservation, unit::Closing)>;

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::DateTime;

    use crate::domain::{book, user, Policy};

    use super::{Error, Queue, Reservation, Status};

    fn queue_of(n: u64) -> (Queue, Vec<user::Id>) {
        let book_id = book::Id::new();
        let members = (0..n).map(|_| user::Id::new()).collect::<Vec<_>>();
        let start = DateTime::now();
        let reservations = members.iter().enumerate().map(|(i, m)| {
            let mut r = Reservation::new(book_id, *m);
            r.created_at = (start + Duration::from_secs(i as u64)).coerce();
            r
        });

        let mut queue = Queue::new(Vec::new());
        for r in reservations {
            _ = queue.enqueue(r);
        }
        (queue, members)
    }

    fn positions(queue: &Queue) -> Vec<Option<u16>> {
        queue.iter().map(|r| r.position).collect()
    }

    #[test]
    fn enqueues_at_tail() {
        let (queue, members) = queue_of(3);

        assert_eq!(positions(&queue), [Some(1), Some(2), Some(3)]);
        assert_eq!(queue.of_member(members[2]).unwrap().position, Some(3));
    }

    #[test]
    fn orders_by_creation_then_id() {
        let book_id = book::Id::new();
        let at = DateTime::now().coerce();
        let mut a = Reservation::new(book_id, user::Id::new());
        let mut b = Reservation::new(book_id, user::Id::new());
        let mut c = Reservation::new(book_id, user::Id::new());
        a.created_at = at;
        b.created_at = at;
        c.created_at = (DateTime::now() - Duration::from_secs(60)).coerce();
        let (first, second) =
            if a.id < b.id { (a.id, b.id) } else { (b.id, a.id) };

        let mut queue = Queue::new([a, b, c.clone()]);
        _ = queue.resequence();

        let ids = queue.iter().map(|r| r.id).collect::<Vec<_>>();
        assert_eq!(ids, [c.id, first, second]);
        assert_eq!(positions(&queue), [Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn resequences_on_removal() {
        let (mut queue, members) = queue_of(3);
        let head = queue.of_member(members[0]).unwrap().id;

        let removed = queue.remove(head).unwrap();

        assert_eq!(removed.member_id, members[0]);
        assert_eq!(positions(&queue), [Some(1), Some(2)]);
        assert_eq!(queue.of_member(members[1]).unwrap().position, Some(1));
        assert!(queue.remove(head).is_none());
    }

    #[test]
    fn skips_closed_reservations() {
        let (queue, _) = queue_of(2);
        let mut all = queue.into_inner();
        all[0].cancel().unwrap();

        let queue = Queue::new(all);

        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn promotes_heads_per_free_copy() {
        let (mut queue, members) = queue_of(3);

        let promoted = queue.promote(2);

        assert_eq!(promoted.len(), 2);
        assert_eq!(queue.promoted(), 2);
        assert!(queue.of_member(members[0]).unwrap().is_promoted());
        assert!(queue.of_member(members[1]).unwrap().is_promoted());
        assert!(!queue.of_member(members[2]).unwrap().is_promoted());

        assert!(queue.promote(2).is_empty());
        assert_eq!(queue.promote(3).len(), 1);
    }

    #[test]
    fn expires_elapsed_holders() {
        let policy = Policy::default();
        let (mut queue, members) = queue_of(3);
        _ = queue.promote(1);

        assert!(queue.expire(DateTime::now(), &policy, &[]).is_empty());

        let later = DateTime::now() + policy.reservation_expiry * 2;
        let expired = queue.expire(later, &policy, &[]);

        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].member_id, members[0]);
        assert_eq!(expired[0].status, Status::Cancelled);
        assert!(expired[0].closed_at.is_some());
        assert_eq!(positions(&queue), [Some(1), Some(2)]);
        assert_eq!(queue.promoted(), 0);
    }

    #[test]
    fn keeps_claimed_holders() {
        let policy = Policy::default();
        let (mut queue, members) = queue_of(3);
        _ = queue.promote(2);

        let later = DateTime::now() + policy.reservation_expiry * 2;
        let expired = queue.expire(later, &policy, &[members[0]]);

        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].member_id, members[1]);
        assert!(queue.held_by(members[0]).is_some());
        assert_eq!(positions(&queue), [Some(1), Some(2)]);
    }

    #[test]
    fn concludes_holder() {
        let (mut queue, members) = queue_of(3);
        _ = queue.promote(2);

        assert_eq!(queue.promoted_except(members[0]), 1);
        assert_eq!(queue.promoted_except(members[2]), 2);
        assert!(queue.conclude(members[2]).unwrap().is_none());

        let held = queue.conclude(members[0]).unwrap().unwrap();

        assert_eq!(held.status, Status::Concluded);
        assert_eq!(held.position, None);
        assert_eq!(queue.len(), 2);
        assert_eq!(positions(&queue), [Some(1), Some(2)]);
        assert!(queue.held_by(members[1]).is_some());
        assert_eq!(queue.promoted(), 1);
    }

    #[test]
    fn closes_once() {
        let mut r = Reservation::new(book::Id::new(), user::Id::new());
        r.position = Some(1);

        r.conclude().unwrap();

        assert_eq!(r.status, Status::Concluded);
        assert_eq!(r.position, None);
        assert!(r.closed_at.is_some());
        assert_eq!(r.cancel(), Err(Error::NotActive(Status::Concluded)));
    }
}
