use async_trait::async_trait;
use uuid::Uuid;

use crate::application::repos::{CollectionOrderRepo, RepoError};
use crate::domain::ordering::{CollectionVersion, ReorderItem};
use crate::domain::resources::ResourceKind;

use super::{PostgresRepositories, bump_version, convert_version, map_sqlx_error};

#[async_trait]
impl CollectionOrderRepo for PostgresRepositories {
    async fn current_version(&self, kind: ResourceKind) -> Result<CollectionVersion, RepoError> {
        let version: i64 =
            sqlx::query_scalar("SELECT version FROM collection_versions WHERE kind = $1")
                .bind(kind)
                .fetch_one(self.pool())
                .await
                .map_err(map_sqlx_error)?;
        convert_version(version)
    }

    async fn reorder(
        &self,
        kind: ResourceKind,
        items: &[ReorderItem],
        base_version: Option<CollectionVersion>,
    ) -> Result<CollectionVersion, RepoError> {
        let mut tx = self.begin().await?;

        let current: i64 = sqlx::query_scalar(
            "SELECT version FROM collection_versions WHERE kind = $1 FOR UPDATE",
        )
        .bind(kind)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;
        let current = convert_version(current)?;

        if base_version.is_some_and(|base| base != current) {
            return Err(RepoError::VersionConflict { current });
        }
        if items.is_empty() {
            return Ok(current);
        }

        let ids: Vec<Uuid> = items.iter().map(|item| item.id).collect();
        let priorities: Vec<i32> = items.iter().map(|item| item.order_priority).collect();
        let sql = format!(
            "UPDATE {} AS t \
             SET order_priority = v.priority, updated_at = now() \
             FROM UNNEST($1::uuid[], $2::int4[]) AS v(id, priority) \
             WHERE t.id = v.id",
            kind.table()
        );
        let result = sqlx::query(&sql)
            .bind(&ids)
            .bind(&priorities)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() != ids.len() as u64 {
            return Err(RepoError::invalid_input(format!(
                "{} of {} ids do not belong to {}",
                ids.len() as u64 - result.rows_affected(),
                ids.len(),
                kind.as_str()
            )));
        }

        let version = bump_version(&mut tx, kind).await?;
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(version)
    }
}
