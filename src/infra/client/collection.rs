use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::application::sync::{
    CollectionSource, FetchQuery, FetchSnapshot, SourceError, Submission,
};
use crate::domain::ordering::{CollectionVersion, RawReorderItem};
use crate::domain::resources::ResourceKind;
use crate::infra::http::api::models::{ReorderRequest, ReorderResponse};

use super::{ApiClient, ClientError};

/// [`CollectionSource`] backed by the list and reorder endpoints of one resource.
pub struct HttpCollectionSource<T> {
    client: ApiClient,
    kind: ResourceKind,
    _item: PhantomData<fn() -> T>,
}

impl<T> Clone for HttpCollectionSource<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            kind: self.kind,
            _item: PhantomData,
        }
    }
}

impl<T> HttpCollectionSource<T> {
    pub fn new(client: ApiClient, kind: ResourceKind) -> Self {
        Self {
            client,
            kind,
            _item: PhantomData,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    fn list_path(&self) -> String {
        format!("api/v1/{}", self.kind.segment())
    }

    fn reorder_path(&self) -> String {
        format!("api/v1/{}/reorder", self.kind.segment())
    }
}

#[async_trait]
impl<T> CollectionSource<T> for HttpCollectionSource<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    async fn fetch(&self, query: &FetchQuery) -> Result<FetchSnapshot<T>, SourceError> {
        let mut pairs = Vec::new();
        if let Some(search) = query.search.as_deref().map(str::trim)
            && !search.is_empty()
        {
            pairs.push(("search", search.to_string()));
        }
        let response = self
            .client
            .send::<()>(Method::GET, &self.list_path(), Some(&pairs), None)
            .await
            .map_err(failed)?;
        let version = response.version().ok_or_else(|| {
            SourceError::Failed(format!(
                "{} list response carried no version",
                self.kind.segment()
            ))
        })?;
        let items: Vec<T> = response.json().map_err(failed)?;
        debug!(
            target = "lightfield::client::collection",
            kind = self.kind.segment(),
            version = version.get(),
            count = items.len(),
            "fetched collection"
        );
        Ok(FetchSnapshot {
            items: Arc::from(items),
            version,
            unfiltered: query.is_unfiltered(),
        })
    }

    async fn submit(&self, submission: &Submission) -> Result<CollectionVersion, SourceError> {
        let body = ReorderRequest {
            items: submission
                .items
                .iter()
                .map(|item| RawReorderItem::from(*item))
                .collect(),
            base_version: Some(submission.base_version),
        };
        let outcome = self
            .client
            .request::<ReorderResponse, _>(Method::POST, &self.reorder_path(), None, Some(&body))
            .await;
        match outcome {
            Ok(response) => Ok(response.version),
            Err(ClientError::Conflict { current_version }) => Err(SourceError::Conflict {
                current: current_version.unwrap_or_else(|| submission.base_version.next()),
            }),
            Err(err) => Err(failed(err)),
        }
    }
}

fn failed(err: ClientError) -> SourceError {
    SourceError::Failed(err.display_message())
}
