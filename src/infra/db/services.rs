use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{
        ListScope, RepoError, ServiceParams, ServiceQueryFilter, ServicesRepo, ServicesWriteRepo,
    },
    domain::{
        entities::ConsultationServiceRecord,
        resources::ResourceKind,
        types::{Currency, ServiceCategory},
    },
};

use super::{
    PostgresRepositories, bump_version, delete_versioned, lock_priority, map_sqlx_error,
};

const SERVICE_COLUMNS: &str = "id, name, slug, description, short_description, category, price, \
    currency, duration_minutes, icon_name, image_url, is_active, is_featured, order_priority, \
    created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ServiceRow {
    id: Uuid,
    name: String,
    slug: String,
    description: String,
    short_description: Option<String>,
    category: ServiceCategory,
    price: i64,
    currency: Currency,
    duration_minutes: i32,
    icon_name: Option<String>,
    image_url: Option<String>,
    is_active: bool,
    is_featured: bool,
    order_priority: i32,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<ServiceRow> for ConsultationServiceRecord {
    fn from(row: ServiceRow) -> Self {
        Self {
            formatted_price: row.currency.format_minor(row.price),
            id: row.id,
            name: row.name,
            slug: row.slug,
            description: row.description,
            short_description: row.short_description,
            category: row.category,
            price: row.price,
            currency: row.currency,
            duration_minutes: row.duration_minutes,
            icon_name: row.icon_name,
            image_url: row.image_url,
            is_active: row.is_active,
            is_featured: row.is_featured,
            order_priority: row.order_priority,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl PostgresRepositories {
    async fn find_service_where<T>(
        &self,
        column: &'static str,
        value: T,
    ) -> Result<Option<ConsultationServiceRecord>, RepoError>
    where
        T: for<'q> sqlx::Encode<'q, Postgres> + sqlx::Type<Postgres> + Send + 'static,
    {
        let sql = format!("SELECT {SERVICE_COLUMNS} FROM consultation_services WHERE {column} = $1");
        let row = self.fetch_optional_by::<ServiceRow, _>(&sql, value).await?;
        Ok(row.map(ConsultationServiceRecord::from))
    }
}

#[async_trait]
impl ServicesRepo for PostgresRepositories {
    async fn list_services(
        &self,
        scope: ListScope,
        filter: &ServiceQueryFilter,
    ) -> Result<Vec<ConsultationServiceRecord>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        qb.push(SERVICE_COLUMNS);
        qb.push(" FROM consultation_services WHERE 1=1 ");

        let is_active = match scope {
            ListScope::Public => Some(true),
            ListScope::Admin => filter.is_active,
        };
        if let Some(is_active) = is_active {
            qb.push(" AND is_active = ");
            qb.push_bind(is_active);
        }
        if let Some(category) = filter.category {
            qb.push(" AND category = ");
            qb.push_bind(category);
        }
        if let Some(is_featured) = filter.is_featured {
            qb.push(" AND is_featured = ");
            qb.push_bind(is_featured);
        }
        Self::push_search(&mut qb, &["name", "description"], filter.search.as_deref());
        qb.push(" ORDER BY order_priority ASC, name ASC");

        let rows = qb
            .build_query_as::<ServiceRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(ConsultationServiceRecord::from).collect())
    }

    async fn find_service(
        &self,
        id: Uuid,
    ) -> Result<Option<ConsultationServiceRecord>, RepoError> {
        self.find_service_where("id", id).await
    }

    async fn find_service_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<ConsultationServiceRecord>, RepoError> {
        self.find_service_where("slug", slug.to_string()).await
    }
}

#[async_trait]
impl ServicesWriteRepo for PostgresRepositories {
    async fn create_service(
        &self,
        params: ServiceParams,
    ) -> Result<ConsultationServiceRecord, RepoError> {
        let mut tx = self.begin().await?;
        let sql = format!(
            "INSERT INTO consultation_services (id, name, slug, description, short_description, \
             category, price, currency, duration_minutes, icon_name, image_url, is_active, \
             is_featured, order_priority) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             RETURNING {SERVICE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ServiceRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(params.name)
            .bind(params.slug)
            .bind(params.description)
            .bind(params.short_description)
            .bind(params.category)
            .bind(params.price)
            .bind(params.currency)
            .bind(params.duration_minutes)
            .bind(params.icon_name)
            .bind(params.image_url)
            .bind(params.is_active)
            .bind(params.is_featured)
            .bind(params.order_priority)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        bump_version(&mut tx, ResourceKind::ConsultationServices).await?;
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn update_service(
        &self,
        id: Uuid,
        params: ServiceParams,
    ) -> Result<ConsultationServiceRecord, RepoError> {
        let mut tx = self.begin().await?;
        let previous = lock_priority(&mut tx, ResourceKind::ConsultationServices, id).await?;

        let sql = format!(
            "UPDATE consultation_services SET name = $2, slug = $3, description = $4, \
             short_description = $5, category = $6, price = $7, currency = $8, \
             duration_minutes = $9, icon_name = $10, image_url = $11, is_active = $12, \
             is_featured = $13, order_priority = $14, updated_at = now() \
             WHERE id = $1 RETURNING {SERVICE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ServiceRow>(&sql)
            .bind(id)
            .bind(params.name)
            .bind(params.slug)
            .bind(params.description)
            .bind(params.short_description)
            .bind(params.category)
            .bind(params.price)
            .bind(params.currency)
            .bind(params.duration_minutes)
            .bind(params.icon_name)
            .bind(params.image_url)
            .bind(params.is_active)
            .bind(params.is_featured)
            .bind(params.order_priority)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        if previous != row.order_priority {
            bump_version(&mut tx, ResourceKind::ConsultationServices).await?;
        }
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn delete_service(&self, id: Uuid) -> Result<(), RepoError> {
        delete_versioned(self, ResourceKind::ConsultationServices, id).await
    }
}
