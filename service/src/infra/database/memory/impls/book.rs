//! [`Book`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::operations::{By, Insert, Lock, Select};
use tracerr::Traced;

use crate::{
    domain::{book, Book},
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

impl<S, IDs> Database<Select<By<HashMap<book::Id, Book>, IDs>>> for Memory<S>
where
    S: Storage,
    IDs: AsRef<[book::Id]>,
{
    type Ok = HashMap<book::Id, Book>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<book::Id, Book>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        Ok(self
            .read(|s| {
                ids.as_ref()
                    .iter()
                    .filter_map(|id| s.books.get(id))
                    .filter(|b| b.deleted_at.is_none())
                    .map(|b| (b.id, b.clone()))
                    .collect()
            })
            .await)
    }
}

impl<S: Storage> Database<Select<By<Option<Book>, book::Id>>> for Memory<S> {
    type Ok = Option<Book>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Book>, book::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self
            .read(|s| {
                s.books.get(&id).filter(|b| b.deleted_at.is_none()).cloned()
            })
            .await)
    }
}

impl<'i, S: Storage> Database<Select<By<Option<Book>, &'i book::Isbn>>>
    for Memory<S>
{
    type Ok = Option<Book>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Book>, &'i book::Isbn>>,
    ) -> Result<Self::Ok, Self::Err> {
        let isbn = by.into_inner();
        Ok(self
            .read(|s| {
                s.books
                    .values()
                    .find(|b| b.deleted_at.is_none() && &b.isbn == isbn)
                    .cloned()
            })
            .await)
    }
}

impl<S: Storage> Database<Select<By<Vec<Book>, read::book::list::Filter>>>
    for Memory<S>
{
    type Ok = Vec<Book>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Book>, read::book::list::Filter>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::book::list::Filter {
            title,
            author_id,
            category_id,
        } = by.into_inner();
        let mut books = self
            .read(|s| {
                s.books
                    .values()
                    .filter(|b| b.deleted_at.is_none())
                    .filter(|b| {
                        title.as_ref().map_or(true, |t| {
                            contains_ignore_case(b.title.as_ref(), t.as_ref())
                        })
                    })
                    .filter(|b| author_id.map_or(true, |id| b.author_id == id))
                    .filter(|b| {
                        category_id.map_or(true, |id| b.category_id == id)
                    })
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .await;
        books.sort_by(|a, b| {
            AsRef::<str>::as_ref(&a.title)
                .cmp(AsRef::<str>::as_ref(&b.title))
        });
        Ok(books)
    }
}

impl<S: Storage> Database<Insert<Book>> for Memory<S> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(book): Insert<Book>,
    ) -> Result<Self::Ok, Self::Err> {
        self.write(|s| drop(s.books.insert(book.id, book))).await;
        Ok(())
    }
}

impl<S: Storage> Database<Lock<By<Book, book::Id>>> for Memory<S> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<Book, book::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(())
    }
}
