use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{
        CategoriesRepo, CategoriesWriteRepo, CategoryParams, CategoryQueryFilter, RepoError,
    },
    domain::{entities::CategoryRecord, resources::ResourceKind},
};

use super::{
    PostgresRepositories, bump_version, delete_versioned, lock_priority, map_sqlx_error,
};

const CATEGORY_SELECT: &str = "SELECT c.id, c.name, c.slug, c.description, c.order_priority, \
    (SELECT COUNT(*) FROM blog_post_categories pc WHERE pc.category_id = c.id) AS blog_count, \
    c.created_at, c.updated_at \
    FROM blog_categories c";

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: Uuid,
    name: String,
    slug: String,
    description: Option<String>,
    order_priority: i32,
    blog_count: i64,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<CategoryRow> for CategoryRecord {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
            description: row.description,
            order_priority: row.order_priority,
            blog_count: row.blog_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl PostgresRepositories {
    async fn find_category_where(
        &self,
        predicate: &'static str,
        value: String,
    ) -> Result<Option<CategoryRecord>, RepoError> {
        let sql = format!("{CATEGORY_SELECT} WHERE {predicate}");
        let row = self.fetch_optional_by::<CategoryRow, _>(&sql, value).await?;
        Ok(row.map(CategoryRecord::from))
    }

    /// Re-read a category after a write so the post count is included.
    async fn reload_category(&self, id: Uuid) -> Result<CategoryRecord, RepoError> {
        let sql = format!("{CATEGORY_SELECT} WHERE c.id = $1");
        self.fetch_optional_by::<CategoryRow, _>(&sql, id)
            .await?
            .map(CategoryRecord::from)
            .ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl CategoriesRepo for PostgresRepositories {
    async fn list_categories(
        &self,
        filter: &CategoryQueryFilter,
    ) -> Result<Vec<CategoryRecord>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new(CATEGORY_SELECT);
        qb.push(" WHERE 1=1 ");
        Self::push_search(
            &mut qb,
            &["c.name", "c.description"],
            filter.search.as_deref(),
        );
        qb.push(" ORDER BY c.order_priority ASC, c.name ASC");

        let rows = qb
            .build_query_as::<CategoryRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(CategoryRecord::from).collect())
    }

    async fn find_category(&self, id: Uuid) -> Result<Option<CategoryRecord>, RepoError> {
        let sql = format!("{CATEGORY_SELECT} WHERE c.id = $1");
        let row = self.fetch_optional_by::<CategoryRow, _>(&sql, id).await?;
        Ok(row.map(CategoryRecord::from))
    }

    async fn find_category_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<CategoryRecord>, RepoError> {
        self.find_category_where("c.slug = $1", slug.to_string())
            .await
    }

    async fn find_category_by_name(
        &self,
        name: &str,
    ) -> Result<Option<CategoryRecord>, RepoError> {
        self.find_category_where("LOWER(c.name) = LOWER($1)", name.to_string())
            .await
    }
}

#[async_trait]
impl CategoriesWriteRepo for PostgresRepositories {
    async fn create_category(&self, params: CategoryParams) -> Result<CategoryRecord, RepoError> {
        let id = Uuid::new_v4();
        let mut tx = self.begin().await?;
        sqlx::query(
            "INSERT INTO blog_categories (id, name, slug, description, order_priority) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(id)
        .bind(params.name)
        .bind(params.slug)
        .bind(params.description)
        .bind(params.order_priority)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        bump_version(&mut tx, ResourceKind::Categories).await?;
        tx.commit().await.map_err(map_sqlx_error)?;
        self.reload_category(id).await
    }

    async fn update_category(
        &self,
        id: Uuid,
        params: CategoryParams,
    ) -> Result<CategoryRecord, RepoError> {
        let mut tx = self.begin().await?;
        let previous = lock_priority(&mut tx, ResourceKind::Categories, id).await?;

        sqlx::query(
            "UPDATE blog_categories SET name = $2, slug = $3, description = $4, \
             order_priority = $5, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(params.name)
        .bind(params.slug)
        .bind(params.description)
        .bind(params.order_priority)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        if previous != params.order_priority {
            bump_version(&mut tx, ResourceKind::Categories).await?;
        }
        tx.commit().await.map_err(map_sqlx_error)?;
        self.reload_category(id).await
    }

    async fn delete_category(&self, id: Uuid) -> Result<(), RepoError> {
        delete_versioned(self, ResourceKind::Categories, id).await
    }
}
