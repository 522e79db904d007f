//! [`Query`] collection related to a single library member or administrator.

use common::operations::By;

use crate::domain::{user, User};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries a [`User`] by its [`user::Id`].
pub type ById = DatabaseQuery<By<Option<User>, user::Id>>;

/// Queries a [`User`] by the number printed on the library card.
pub type ByEnrollment = DatabaseQuery<By<Option<User>, user::Enrollment>>;

#[cfg(test)]
mod spec {
    use common::operations::Insert;

    use crate::{
        command::spec::member,
        domain::user,
        infra::{Database as _, Memory},
        Query as _, Service,
    };

    use super::{ByEnrollment, ById};

    #[tokio::test]
    async fn finds_member_by_library_card() {
        let svc = Service::for_tests(Memory::new());
        let m = member(42);
        svc.database().execute(Insert(m.clone())).await.unwrap();

        let found = svc.execute(ByEnrollment::by(m.enrollment)).await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(m.id));

        let other = user::Enrollment::new(43).unwrap();
        assert!(svc.execute(ByEnrollment::by(other)).await.unwrap().is_none());
        assert!(svc.execute(ById::by(m.id)).await.unwrap().is_some());
    }
}
