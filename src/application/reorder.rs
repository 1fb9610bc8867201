//! Bulk priority updates for the ordered collections.

use std::sync::Arc;

use metrics::counter;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::application::admin::audit::AdminAuditService;
use crate::application::repos::{CollectionOrderRepo, RepoError};
use crate::domain::error::DomainError;
use crate::domain::ordering::{
    CollectionVersion, RawReorderItem, ReorderItem, ensure_unique_ids, parse_reorder_items,
};
use crate::domain::resources::ResourceKind;

pub const METRIC_REORDER_TOTAL: &str = "lightfield_reorder_total";
pub const METRIC_REORDER_CONFLICT_TOTAL: &str = "lightfield_reorder_conflict_total";

#[derive(Debug, Error)]
pub enum ReorderError {
    #[error("{0}")]
    Invalid(String),
    #[error("collection changed; current version is {current}")]
    Conflict { current: CollectionVersion },
    #[error(transparent)]
    Repo(RepoError),
}

impl From<DomainError> for ReorderError {
    fn from(err: DomainError) -> Self {
        Self::Invalid(err.detail())
    }
}

impl From<RepoError> for ReorderError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::VersionConflict { current } => Self::Conflict { current },
            RepoError::InvalidInput { message } => Self::Invalid(message),
            other => Self::Repo(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReorderOutcome {
    pub message: String,
    pub version: CollectionVersion,
}

#[derive(Clone)]
pub struct ReorderService {
    repo: Arc<dyn CollectionOrderRepo>,
    audit: AdminAuditService,
}

impl ReorderService {
    pub fn new(repo: Arc<dyn CollectionOrderRepo>, audit: AdminAuditService) -> Self {
        Self { repo, audit }
    }

    pub async fn current_version(
        &self,
        kind: ResourceKind,
    ) -> Result<CollectionVersion, ReorderError> {
        Ok(self.repo.current_version(kind).await?)
    }

    /// Replace the priorities of a whole collection in one step.
    ///
    /// With `base_version` the write only happens when the collection is unchanged since
    /// that version; without it the last write wins.
    pub async fn reorder(
        &self,
        actor: &str,
        kind: ResourceKind,
        raw: Vec<RawReorderItem>,
        base_version: Option<CollectionVersion>,
    ) -> Result<ReorderOutcome, ReorderError> {
        let items = parse_reorder_items(raw)?;
        ensure_unique_ids(&items)?;

        if items.is_empty() {
            let version = self.repo.current_version(kind).await?;
            if let Some(base) = base_version
                && base != version
            {
                return Err(stale_submission(kind, base_version, version));
            }
            return Ok(ReorderOutcome {
                message: kind.reorder_message(),
                version,
            });
        }

        let version = match self.repo.reorder(kind, &items, base_version).await {
            Ok(version) => version,
            Err(RepoError::VersionConflict { current }) => {
                return Err(stale_submission(kind, base_version, current));
            }
            Err(err) => return Err(err.into()),
        };

        counter!(METRIC_REORDER_TOTAL, "resource" => kind.as_str()).increment(1);
        info!(
            target = "lightfield::application::reorder",
            resource = kind.as_str(),
            items = items.len(),
            version = version.get(),
            "Collection reordered"
        );

        let payload = AuditReorder {
            items: &items,
            version: version.get(),
        };
        // Reorder is committed at this point.
        if let Err(err) = self
            .audit
            .record(
                actor,
                &format!("{}.reorder", kind.entity()),
                kind.entity(),
                None,
                Some(&payload),
            )
            .await
        {
            warn!(
                target = "lightfield::application::reorder",
                resource = kind.as_str(),
                version = version.get(),
                error = %err,
                "Failed to record reorder audit entry"
            );
        }

        Ok(ReorderOutcome {
            message: kind.reorder_message(),
            version,
        })
    }
}

fn stale_submission(
    kind: ResourceKind,
    base_version: Option<CollectionVersion>,
    current: CollectionVersion,
) -> ReorderError {
    counter!(METRIC_REORDER_CONFLICT_TOTAL, "resource" => kind.as_str()).increment(1);
    warn!(
        target = "lightfield::application::reorder",
        resource = kind.as_str(),
        base_version = base_version.map(CollectionVersion::get),
        current_version = current.get(),
        "Rejected stale reorder submission"
    );
    ReorderError::Conflict { current }
}

#[derive(Serialize)]
struct AuditReorder<'a> {
    items: &'a [ReorderItem],
    version: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use uuid::Uuid;

    use crate::application::repos::AuditRepo;
    use crate::domain::entities::AuditLogRecord;
    use crate::domain::ordering::REORDER_ITEM_FIELDS_MESSAGE;

    struct VersionedStore {
        ids: Vec<Uuid>,
        priorities: Mutex<HashMap<Uuid, i32>>,
        version: Mutex<u64>,
    }

    impl VersionedStore {
        fn new(count: usize) -> Self {
            let ids: Vec<Uuid> = (0..count).map(|_| Uuid::new_v4()).collect();
            let priorities = ids
                .iter()
                .enumerate()
                .map(|(index, id)| (*id, index as i32))
                .collect();
            Self {
                ids,
                priorities: Mutex::new(priorities),
                version: Mutex::new(1),
            }
        }
    }

    #[async_trait]
    impl CollectionOrderRepo for VersionedStore {
        async fn current_version(
            &self,
            _kind: ResourceKind,
        ) -> Result<CollectionVersion, RepoError> {
            Ok(CollectionVersion(*self.version.lock().unwrap()))
        }

        async fn reorder(
            &self,
            _kind: ResourceKind,
            items: &[ReorderItem],
            base_version: Option<CollectionVersion>,
        ) -> Result<CollectionVersion, RepoError> {
            let mut version = self.version.lock().unwrap();
            if let Some(base) = base_version
                && base.get() != *version
            {
                return Err(RepoError::VersionConflict {
                    current: CollectionVersion(*version),
                });
            }
            let mut priorities = self.priorities.lock().unwrap();
            if let Some(unknown) = items.iter().find(|item| !priorities.contains_key(&item.id)) {
                return Err(RepoError::invalid_input(format!(
                    "item `{}` does not belong to this collection",
                    unknown.id
                )));
            }
            for item in items {
                priorities.insert(item.id, item.order_priority);
            }
            *version += 1;
            Ok(CollectionVersion(*version))
        }
    }

    struct NullAudit;

    #[async_trait]
    impl AuditRepo for NullAudit {
        async fn append_log(&self, _record: AuditLogRecord) -> Result<(), RepoError> {
            Ok(())
        }

        async fn list_recent(&self, _limit: u32) -> Result<Vec<AuditLogRecord>, RepoError> {
            Ok(Vec::new())
        }
    }

    fn service(store: Arc<VersionedStore>) -> ReorderService {
        ReorderService::new(store, AdminAuditService::new(Arc::new(NullAudit)))
    }

    fn raw(ids: &[Uuid]) -> Vec<RawReorderItem> {
        ids.iter()
            .enumerate()
            .map(|(index, id)| RawReorderItem {
                id: Some(*id),
                order_priority: Some(index as i32),
            })
            .collect()
    }

    #[tokio::test]
    async fn reorder_bumps_version_once() {
        let store = Arc::new(VersionedStore::new(3));
        let reversed: Vec<Uuid> = store.ids.iter().rev().copied().collect();

        let outcome = service(store.clone())
            .reorder(
                "admin",
                ResourceKind::Associates,
                raw(&reversed),
                Some(CollectionVersion(1)),
            )
            .await
            .expect("reorder");

        assert_eq!(outcome.message, "Associates reordered successfully");
        assert_eq!(outcome.version, CollectionVersion(2));
        assert_eq!(store.priorities.lock().unwrap()[&reversed[0]], 0);
    }

    #[tokio::test]
    async fn stale_base_version_is_a_conflict() {
        let store = Arc::new(VersionedStore::new(2));
        let ids = store.ids.clone();

        let err = service(store.clone())
            .reorder(
                "admin",
                ResourceKind::Blogs,
                raw(&ids),
                Some(CollectionVersion(0)),
            )
            .await
            .expect_err("stale");

        assert!(matches!(
            err,
            ReorderError::Conflict {
                current: CollectionVersion(1)
            }
        ));
        assert_eq!(*store.version.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn missing_fields_and_duplicates_are_invalid() {
        let store = Arc::new(VersionedStore::new(2));
        let svc = service(store.clone());

        let err = svc
            .reorder(
                "admin",
                ResourceKind::Grants,
                vec![RawReorderItem {
                    id: None,
                    order_priority: Some(0),
                }],
                None,
            )
            .await
            .expect_err("missing id");
        assert!(matches!(err, ReorderError::Invalid(ref message) if message == REORDER_ITEM_FIELDS_MESSAGE));

        let duplicate = vec![store.ids[0], store.ids[0]];
        let err = svc
            .reorder("admin", ResourceKind::Grants, raw(&duplicate), None)
            .await
            .expect_err("duplicate");
        assert!(matches!(err, ReorderError::Invalid(_)));
    }

    #[tokio::test]
    async fn empty_submission_returns_current_version() {
        let store = Arc::new(VersionedStore::new(2));
        let svc = service(store.clone());

        let outcome = svc
            .reorder(
                "admin",
                ResourceKind::Categories,
                Vec::new(),
                Some(CollectionVersion(1)),
            )
            .await
            .expect("no-op");
        assert_eq!(outcome.version, CollectionVersion(1));

        let outcome = svc
            .reorder("admin", ResourceKind::Categories, Vec::new(), None)
            .await
            .expect("unversioned no-op");
        assert_eq!(outcome.version, CollectionVersion(1));
    }

    #[tokio::test]
    async fn stale_empty_submission_is_a_conflict() {
        let store = Arc::new(VersionedStore::new(2));
        let err = service(store.clone())
            .reorder(
                "admin",
                ResourceKind::Categories,
                Vec::new(),
                Some(CollectionVersion(99)),
            )
            .await
            .expect_err("stale");
        assert!(matches!(
            err,
            ReorderError::Conflict {
                current: CollectionVersion(1)
            }
        ));
        assert_eq!(*store.version.lock().unwrap(), 1);
    }

    struct BrokenAudit;

    #[async_trait]
    impl AuditRepo for BrokenAudit {
        async fn append_log(&self, _record: AuditLogRecord) -> Result<(), RepoError> {
            Err(RepoError::Persistence("audit table unavailable".into()))
        }

        async fn list_recent(&self, _limit: u32) -> Result<Vec<AuditLogRecord>, RepoError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn audit_failure_does_not_fail_a_committed_reorder() {
        let store = Arc::new(VersionedStore::new(2));
        let reversed: Vec<Uuid> = store.ids.iter().rev().copied().collect();
        let svc = ReorderService::new(
            store.clone(),
            AdminAuditService::new(Arc::new(BrokenAudit)),
        );

        let outcome = svc
            .reorder(
                "admin",
                ResourceKind::ConsultationServices,
                raw(&reversed),
                Some(CollectionVersion(1)),
            )
            .await
            .expect("reorder survives audit failure");
        assert_eq!(outcome.version, CollectionVersion(2));
        assert_eq!(store.priorities.lock().unwrap()[&reversed[0]], 0);
    }

    #[tokio::test]
    async fn unknown_ids_are_rejected_without_writes() {
        let store = Arc::new(VersionedStore::new(2));
        let mut ids = store.ids.clone();
        ids.push(Uuid::new_v4());

        let err = service(store.clone())
            .reorder("admin", ResourceKind::Testimonials, raw(&ids), None)
            .await
            .expect_err("unknown id");
        assert!(matches!(err, ReorderError::Invalid(_)));
        assert_eq!(*store.version.lock().unwrap(), 1);
    }
}
