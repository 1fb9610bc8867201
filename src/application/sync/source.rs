use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::ordering::{CollectionVersion, ReorderItem};

/// Server-side narrowing sent with a fetch. Status and category predicates are applied
/// client-side and never travel here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchQuery {
    pub search: Option<String>,
}

impl FetchQuery {
    pub fn is_unfiltered(&self) -> bool {
        self.search
            .as_deref()
            .is_none_or(|value| value.trim().is_empty())
    }
}

/// Immutable result of one list fetch.
#[derive(Debug)]
pub struct FetchSnapshot<T> {
    pub items: Arc<[T]>,
    pub version: CollectionVersion,
    /// Whether the producing query had no server-side filters.
    pub unfiltered: bool,
}

impl<T> Clone for FetchSnapshot<T> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
            version: self.version,
            unfiltered: self.unfiltered,
        }
    }
}

/// One batched reorder request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub ticket: u64,
    pub base_version: CollectionVersion,
    pub items: Vec<ReorderItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("collection changed on the server (version {current})")]
    Conflict { current: CollectionVersion },
    #[error("{0}")]
    Failed(String),
}

/// Remote end of a reorderable collection.
#[async_trait]
pub trait CollectionSource<T>: Clone + Send + Sync + 'static {
    async fn fetch(&self, query: &FetchQuery) -> Result<FetchSnapshot<T>, SourceError>;

    /// Submit a full ordering; returns the collection version after the write.
    async fn submit(&self, submission: &Submission) -> Result<CollectionVersion, SourceError>;
}
