//! [`Command`] for creating a new [`Author`].

use common::{
    operations::{Commit, Insert, Transact, Transacted},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{author, Author},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`Author`].
#[derive(Clone, Debug)]
pub struct CreateAuthor {
    /// [`author::Name`] of a new [`Author`].
    pub name: author::Name,

    /// [`author::Description`] of a new [`Author`].
    pub description: Option<author::Description>,
}

impl<Db> Command<CreateAuthor> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<Insert<Author>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Author;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateAuthor) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateAuthor { name, description } = cmd;

        let author = Author {
            id: author::Id::new(),
            name,
            description,
            created_at: DateTime::now().coerce(),
        };

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Insert(author.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(author)
    }
}

/// Error of [`CreateAuthor`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),
}
