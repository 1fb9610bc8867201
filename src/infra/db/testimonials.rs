use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{
        ListScope, RepoError, TestimonialParams, TestimonialQueryFilter, TestimonialsRepo,
        TestimonialsWriteRepo,
    },
    domain::{entities::TestimonialRecord, resources::ResourceKind},
};

use super::{
    PostgresRepositories, bump_version, delete_versioned, lock_priority, map_sqlx_error,
};

const TESTIMONIAL_COLUMNS: &str = "id, client_name, client_title, client_company, \
    testimonial_text, client_image_url, rating, case_type, is_featured, is_active, \
    order_priority, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct TestimonialRow {
    id: Uuid,
    client_name: String,
    client_title: Option<String>,
    client_company: Option<String>,
    testimonial_text: String,
    client_image_url: Option<String>,
    rating: i16,
    case_type: Option<String>,
    is_featured: bool,
    is_active: bool,
    order_priority: i32,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<TestimonialRow> for TestimonialRecord {
    fn from(row: TestimonialRow) -> Self {
        Self {
            id: row.id,
            client_name: row.client_name,
            client_title: row.client_title,
            client_company: row.client_company,
            testimonial_text: row.testimonial_text,
            client_image_url: row.client_image_url,
            rating: row.rating,
            case_type: row.case_type,
            is_featured: row.is_featured,
            is_active: row.is_active,
            order_priority: row.order_priority,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl TestimonialsRepo for PostgresRepositories {
    async fn list_testimonials(
        &self,
        scope: ListScope,
        filter: &TestimonialQueryFilter,
    ) -> Result<Vec<TestimonialRecord>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        qb.push(TESTIMONIAL_COLUMNS);
        qb.push(" FROM testimonials WHERE 1=1 ");

        if scope == ListScope::Public {
            qb.push(" AND is_active = TRUE ");
        }
        if let Some(is_featured) = filter.is_featured {
            qb.push(" AND is_featured = ");
            qb.push_bind(is_featured);
        }
        Self::push_search(
            &mut qb,
            &["client_name", "client_company", "testimonial_text"],
            filter.search.as_deref(),
        );
        qb.push(" ORDER BY order_priority ASC, created_at DESC");

        let rows = qb
            .build_query_as::<TestimonialRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(TestimonialRecord::from).collect())
    }

    async fn find_testimonial(&self, id: Uuid) -> Result<Option<TestimonialRecord>, RepoError> {
        let sql = format!("SELECT {TESTIMONIAL_COLUMNS} FROM testimonials WHERE id = $1");
        let row = self
            .fetch_optional_by::<TestimonialRow, _>(&sql, id)
            .await?;
        Ok(row.map(TestimonialRecord::from))
    }
}

#[async_trait]
impl TestimonialsWriteRepo for PostgresRepositories {
    async fn create_testimonial(
        &self,
        params: TestimonialParams,
    ) -> Result<TestimonialRecord, RepoError> {
        let mut tx = self.begin().await?;
        let sql = format!(
            "INSERT INTO testimonials (id, client_name, client_title, client_company, \
             testimonial_text, client_image_url, rating, case_type, is_featured, is_active, \
             order_priority) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {TESTIMONIAL_COLUMNS}"
        );
        let row = sqlx::query_as::<_, TestimonialRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(params.client_name)
            .bind(params.client_title)
            .bind(params.client_company)
            .bind(params.testimonial_text)
            .bind(params.client_image_url)
            .bind(params.rating)
            .bind(params.case_type)
            .bind(params.is_featured)
            .bind(params.is_active)
            .bind(params.order_priority)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        bump_version(&mut tx, ResourceKind::Testimonials).await?;
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn update_testimonial(
        &self,
        id: Uuid,
        params: TestimonialParams,
    ) -> Result<TestimonialRecord, RepoError> {
        let mut tx = self.begin().await?;
        let previous = lock_priority(&mut tx, ResourceKind::Testimonials, id).await?;

        let sql = format!(
            "UPDATE testimonials SET client_name = $2, client_title = $3, client_company = $4, \
             testimonial_text = $5, client_image_url = $6, rating = $7, case_type = $8, \
             is_featured = $9, is_active = $10, order_priority = $11, updated_at = now() \
             WHERE id = $1 RETURNING {TESTIMONIAL_COLUMNS}"
        );
        let row = sqlx::query_as::<_, TestimonialRow>(&sql)
            .bind(id)
            .bind(params.client_name)
            .bind(params.client_title)
            .bind(params.client_company)
            .bind(params.testimonial_text)
            .bind(params.client_image_url)
            .bind(params.rating)
            .bind(params.case_type)
            .bind(params.is_featured)
            .bind(params.is_active)
            .bind(params.order_priority)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        if previous != row.order_priority {
            bump_version(&mut tx, ResourceKind::Testimonials).await?;
        }
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn delete_testimonial(&self, id: Uuid) -> Result<(), RepoError> {
        delete_versioned(self, ResourceKind::Testimonials, id).await
    }
}
