use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::{
    application::repos::{
        GrantParams, GrantQueryFilter, GrantsRepo, GrantsWriteRepo, ListScope, RepoError,
    },
    domain::{
        entities::GrantRecord,
        resources::ResourceKind,
        types::{Currency, GrantStatus, GrantType},
    },
};

use super::{
    PostgresRepositories, bump_version, delete_versioned, lock_priority, map_sqlx_error,
};

const GRANT_COLUMNS: &str = "id, title, slug, grant_type, amount, currency, short_description, \
    full_description, target_audience, application_deadline, announcement_date, status, \
    eligibility_criteria, requirements, guidelines, target_institutions, is_featured, \
    is_active, order_priority, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct GrantRow {
    id: Uuid,
    title: String,
    slug: String,
    grant_type: GrantType,
    amount: Option<i64>,
    currency: Currency,
    short_description: String,
    full_description: Option<String>,
    target_audience: Option<String>,
    application_deadline: Option<Date>,
    announcement_date: Option<Date>,
    status: GrantStatus,
    eligibility_criteria: Vec<String>,
    requirements: Vec<String>,
    guidelines: Vec<String>,
    target_institutions: Vec<String>,
    is_featured: bool,
    is_active: bool,
    order_priority: i32,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<GrantRow> for GrantRecord {
    fn from(row: GrantRow) -> Self {
        let formatted_amount = row.amount.map(|amount| row.currency.format_minor(amount));
        Self {
            id: row.id,
            title: row.title,
            slug: row.slug,
            grant_type: row.grant_type,
            amount: row.amount,
            currency: row.currency,
            formatted_amount,
            short_description: row.short_description,
            full_description: row.full_description,
            target_audience: row.target_audience,
            application_deadline: row.application_deadline,
            announcement_date: row.announcement_date,
            status: row.status,
            eligibility_criteria: row.eligibility_criteria,
            requirements: row.requirements,
            guidelines: row.guidelines,
            target_institutions: row.target_institutions,
            is_featured: row.is_featured,
            is_active: row.is_active,
            order_priority: row.order_priority,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl PostgresRepositories {
    async fn find_grant_where<T>(
        &self,
        column: &'static str,
        value: T,
    ) -> Result<Option<GrantRecord>, RepoError>
    where
        T: for<'q> sqlx::Encode<'q, Postgres> + sqlx::Type<Postgres> + Send + 'static,
    {
        let sql = format!("SELECT {GRANT_COLUMNS} FROM grants WHERE {column} = $1");
        let row = self.fetch_optional_by::<GrantRow, _>(&sql, value).await?;
        Ok(row.map(GrantRecord::from))
    }
}

#[async_trait]
impl GrantsRepo for PostgresRepositories {
    async fn list_grants(
        &self,
        scope: ListScope,
        filter: &GrantQueryFilter,
    ) -> Result<Vec<GrantRecord>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        qb.push(GRANT_COLUMNS);
        qb.push(" FROM grants WHERE 1=1 ");

        if scope == ListScope::Public {
            qb.push(" AND is_active = TRUE ");
        }
        if let Some(grant_type) = filter.grant_type {
            qb.push(" AND grant_type = ");
            qb.push_bind(grant_type);
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ");
            qb.push_bind(status);
        }
        if let Some(is_featured) = filter.is_featured {
            qb.push(" AND is_featured = ");
            qb.push_bind(is_featured);
        }
        Self::push_search(
            &mut qb,
            &["title", "short_description", "target_audience"],
            filter.search.as_deref(),
        );
        qb.push(" ORDER BY order_priority ASC, created_at DESC");

        let rows = qb
            .build_query_as::<GrantRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(GrantRecord::from).collect())
    }

    async fn find_grant(&self, id: Uuid) -> Result<Option<GrantRecord>, RepoError> {
        self.find_grant_where("id", id).await
    }

    async fn find_grant_by_slug(&self, slug: &str) -> Result<Option<GrantRecord>, RepoError> {
        self.find_grant_where("slug", slug.to_string()).await
    }
}

#[async_trait]
impl GrantsWriteRepo for PostgresRepositories {
    async fn create_grant(&self, params: GrantParams) -> Result<GrantRecord, RepoError> {
        let mut tx = self.begin().await?;
        let sql = format!(
            "INSERT INTO grants (id, title, slug, grant_type, amount, currency, \
             short_description, full_description, target_audience, application_deadline, \
             announcement_date, status, eligibility_criteria, requirements, guidelines, \
             target_institutions, is_featured, is_active, order_priority) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
             $17, $18, $19) RETURNING {GRANT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, GrantRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(params.title)
            .bind(params.slug)
            .bind(params.grant_type)
            .bind(params.amount)
            .bind(params.currency)
            .bind(params.short_description)
            .bind(params.full_description)
            .bind(params.target_audience)
            .bind(params.application_deadline)
            .bind(params.announcement_date)
            .bind(params.status)
            .bind(params.eligibility_criteria)
            .bind(params.requirements)
            .bind(params.guidelines)
            .bind(params.target_institutions)
            .bind(params.is_featured)
            .bind(params.is_active)
            .bind(params.order_priority)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        bump_version(&mut tx, ResourceKind::Grants).await?;
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn update_grant(&self, id: Uuid, params: GrantParams) -> Result<GrantRecord, RepoError> {
        let mut tx = self.begin().await?;
        let previous = lock_priority(&mut tx, ResourceKind::Grants, id).await?;

        let sql = format!(
            "UPDATE grants SET title = $2, slug = $3, grant_type = $4, amount = $5, \
             currency = $6, short_description = $7, full_description = $8, \
             target_audience = $9, application_deadline = $10, announcement_date = $11, \
             status = $12, eligibility_criteria = $13, requirements = $14, guidelines = $15, \
             target_institutions = $16, is_featured = $17, is_active = $18, \
             order_priority = $19, updated_at = now() \
             WHERE id = $1 RETURNING {GRANT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, GrantRow>(&sql)
            .bind(id)
            .bind(params.title)
            .bind(params.slug)
            .bind(params.grant_type)
            .bind(params.amount)
            .bind(params.currency)
            .bind(params.short_description)
            .bind(params.full_description)
            .bind(params.target_audience)
            .bind(params.application_deadline)
            .bind(params.announcement_date)
            .bind(params.status)
            .bind(params.eligibility_criteria)
            .bind(params.requirements)
            .bind(params.guidelines)
            .bind(params.target_institutions)
            .bind(params.is_featured)
            .bind(params.is_active)
            .bind(params.order_priority)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        if previous != row.order_priority {
            bump_version(&mut tx, ResourceKind::Grants).await?;
        }
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn delete_grant(&self, id: Uuid) -> Result<(), RepoError> {
        delete_versioned(self, ResourceKind::Grants, id).await
    }
}
