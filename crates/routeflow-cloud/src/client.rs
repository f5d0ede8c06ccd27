//! Remote client traits consumed by the reconcilers
//!
//! These traits are the only seam between the reconciliation core and the
//! backend. Implementations perform exactly one request/response exchange per
//! call and never retry.

use crate::error::Result;
use crate::resource::{ResourceIdentity, ResourceKind};
use async_trait::async_trait;

/// One page of a List response
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,

    /// Continuation URL for the next page, if the backend reported one
    pub next_url: Option<String>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_url: None,
        }
    }

    pub fn with_next(items: Vec<T>, next_url: impl Into<String>) -> Self {
        Self {
            items,
            next_url: Some(next_url.into()),
        }
    }
}

/// Filter parameters for a List call, carrying the pagination cursor
pub trait ListOptions {
    fn start(&self) -> Option<&str>;

    fn set_start(&mut self, start: Option<String>);
}

/// Outcome of a Delete call; both variants mean the object is gone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Deleted,
    AlreadyGone,
}

/// Source of list pages for a [`Pager`](crate::pager::Pager)
#[async_trait]
pub trait PageSource<O>: Send + Sync
where
    O: ListOptions + Send + Sync,
{
    type Item: Send;

    async fn list_page(&self, options: &O) -> Result<Page<Self::Item>>;
}

/// CRUD client for one resource kind
#[async_trait]
pub trait RemoteClient<K: ResourceKind>:
    PageSource<K::ListOptions, Item = K::Observed>
{
    async fn create(&self, payload: &K::Desired) -> Result<K::Observed>;

    /// `Ok(None)` is the designated "object does not exist" signal
    async fn read(&self, id: &ResourceIdentity) -> Result<Option<K::Observed>>;

    /// Full-object overwrite
    async fn replace(&self, id: &ResourceIdentity, payload: &K::Desired) -> Result<K::Observed>;

    async fn delete(&self, id: &ResourceIdentity) -> Result<Removal>;
}

/// Client for a singleton resource that supports Read and Put only
#[async_trait]
pub trait SingletonClient<K: ResourceKind>: Send + Sync {
    /// `Ok(None)` when the singleton has never been initialized
    async fn get(&self) -> Result<Option<K::Observed>>;

    async fn put(&self, payload: &K::Desired) -> Result<K::Observed>;
}

/// Singletons have no list endpoint
impl ListOptions for () {
    fn start(&self) -> Option<&str> {
        None
    }

    fn set_start(&mut self, _start: Option<String>) {}
}
