use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{
        AssociateParams, AssociateQueryFilter, AssociatesRepo, AssociatesWriteRepo, ListScope,
        RepoError,
    },
    domain::{entities::AssociateRecord, resources::ResourceKind},
};

use super::{
    PostgresRepositories, bump_version, delete_versioned, lock_priority, map_sqlx_error,
};

const ASSOCIATE_COLUMNS: &str = "id, name, slug, title, bio, expertise, image_url, email, phone, \
    linkedin_url, twitter_url, order_priority, is_active, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct AssociateRow {
    id: Uuid,
    name: String,
    slug: String,
    title: String,
    bio: String,
    expertise: Vec<String>,
    image_url: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    linkedin_url: Option<String>,
    twitter_url: Option<String>,
    order_priority: i32,
    is_active: bool,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<AssociateRow> for AssociateRecord {
    fn from(row: AssociateRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
            title: row.title,
            bio: row.bio,
            expertise: row.expertise,
            image_url: row.image_url,
            email: row.email,
            phone: row.phone,
            linkedin_url: row.linkedin_url,
            twitter_url: row.twitter_url,
            order_priority: row.order_priority,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl PostgresRepositories {
    async fn find_associate_where<T>(
        &self,
        column: &'static str,
        value: T,
    ) -> Result<Option<AssociateRecord>, RepoError>
    where
        T: for<'q> sqlx::Encode<'q, Postgres> + sqlx::Type<Postgres> + Send + 'static,
    {
        let sql = format!("SELECT {ASSOCIATE_COLUMNS} FROM associates WHERE {column} = $1");
        let row = self.fetch_optional_by::<AssociateRow, _>(&sql, value).await?;
        Ok(row.map(AssociateRecord::from))
    }
}

#[async_trait]
impl AssociatesRepo for PostgresRepositories {
    async fn list_associates(
        &self,
        scope: ListScope,
        filter: &AssociateQueryFilter,
    ) -> Result<Vec<AssociateRecord>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        qb.push(ASSOCIATE_COLUMNS);
        qb.push(" FROM associates WHERE 1=1 ");

        let is_active = match scope {
            ListScope::Public => Some(true),
            ListScope::Admin => filter.is_active,
        };
        if let Some(is_active) = is_active {
            qb.push(" AND is_active = ");
            qb.push_bind(is_active);
        }
        Self::push_search(&mut qb, &["name", "title", "bio"], filter.search.as_deref());
        qb.push(" ORDER BY order_priority ASC, created_at DESC");

        let rows = qb
            .build_query_as::<AssociateRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(AssociateRecord::from).collect())
    }

    async fn find_associate(&self, id: Uuid) -> Result<Option<AssociateRecord>, RepoError> {
        self.find_associate_where("id", id).await
    }

    async fn find_associate_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<AssociateRecord>, RepoError> {
        self.find_associate_where("slug", slug.to_string()).await
    }
}

#[async_trait]
impl AssociatesWriteRepo for PostgresRepositories {
    async fn create_associate(&self, params: AssociateParams) -> Result<AssociateRecord, RepoError> {
        let mut tx = self.begin().await?;
        let sql = format!(
            "INSERT INTO associates (id, name, slug, title, bio, expertise, image_url, email, \
             phone, linkedin_url, twitter_url, order_priority, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             RETURNING {ASSOCIATE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, AssociateRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(params.name)
            .bind(params.slug)
            .bind(params.title)
            .bind(params.bio)
            .bind(params.expertise)
            .bind(params.image_url)
            .bind(params.email)
            .bind(params.phone)
            .bind(params.linkedin_url)
            .bind(params.twitter_url)
            .bind(params.order_priority)
            .bind(params.is_active)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        bump_version(&mut tx, ResourceKind::Associates).await?;
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn update_associate(
        &self,
        id: Uuid,
        params: AssociateParams,
    ) -> Result<AssociateRecord, RepoError> {
        let mut tx = self.begin().await?;
        let previous = lock_priority(&mut tx, ResourceKind::Associates, id).await?;

        let sql = format!(
            "UPDATE associates SET name = $2, slug = $3, title = $4, bio = $5, expertise = $6, \
             image_url = $7, email = $8, phone = $9, linkedin_url = $10, twitter_url = $11, \
             order_priority = $12, is_active = $13, updated_at = now() \
             WHERE id = $1 RETURNING {ASSOCIATE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, AssociateRow>(&sql)
            .bind(id)
            .bind(params.name)
            .bind(params.slug)
            .bind(params.title)
            .bind(params.bio)
            .bind(params.expertise)
            .bind(params.image_url)
            .bind(params.email)
            .bind(params.phone)
            .bind(params.linkedin_url)
            .bind(params.twitter_url)
            .bind(params.order_priority)
            .bind(params.is_active)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        if previous != row.order_priority {
            bump_version(&mut tx, ResourceKind::Associates).await?;
        }
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn delete_associate(&self, id: Uuid) -> Result<(), RepoError> {
        delete_versioned(self, ResourceKind::Associates, id).await
    }
}
