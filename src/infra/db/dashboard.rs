use async_trait::async_trait;
use time::{Date, OffsetDateTime};

use crate::application::repos::{
    CategoryPostCount, ContactStatusCount, DashboardCounts, DashboardRepo, PublishDayActivity,
    RepoError,
};
use crate::domain::types::ContactStatus;

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct CountsRow {
    total_blogs: i64,
    published_blogs: i64,
    total_views: i64,
    total_associates: i64,
    active_associates: i64,
    total_contacts: i64,
    unread_contacts: i64,
    total_testimonials: i64,
    active_testimonials: i64,
    total_grants: i64,
    active_grants: i64,
    total_bookings: i64,
    paid_bookings: i64,
    consultation_revenue: i64,
    pending_confirmations: i64,
}

#[derive(sqlx::FromRow)]
struct PublishDayRow {
    day: Date,
    posts: i64,
    views: i64,
}

#[derive(sqlx::FromRow)]
struct CategoryCountRow {
    category: String,
    posts: i64,
}

#[derive(sqlx::FromRow)]
struct StatusCountRow {
    status: ContactStatus,
    count: i64,
}

#[async_trait]
impl DashboardRepo for PostgresRepositories {
    async fn dashboard_counts(&self) -> Result<DashboardCounts, RepoError> {
        let row = sqlx::query_as::<_, CountsRow>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM blog_posts) AS total_blogs,
                (SELECT COUNT(*) FROM blog_posts WHERE is_published) AS published_blogs,
                (SELECT COALESCE(SUM(view_count), 0)::BIGINT FROM blog_posts) AS total_views,
                (SELECT COUNT(*) FROM associates) AS total_associates,
                (SELECT COUNT(*) FROM associates WHERE is_active) AS active_associates,
                (SELECT COUNT(*) FROM contacts) AS total_contacts,
                (SELECT COUNT(*) FROM contacts WHERE status = 'unread') AS unread_contacts,
                (SELECT COUNT(*) FROM testimonials) AS total_testimonials,
                (SELECT COUNT(*) FROM testimonials WHERE is_active) AS active_testimonials,
                (SELECT COUNT(*) FROM grants) AS total_grants,
                (SELECT COUNT(*) FROM grants WHERE is_active) AS active_grants,
                (SELECT COUNT(*) FROM bookings) AS total_bookings,
                (SELECT COUNT(*) FROM bookings WHERE payment_verified) AS paid_bookings,
                (SELECT COALESCE(SUM(amount), 0)::BIGINT FROM bookings WHERE payment_verified)
                    AS consultation_revenue,
                (SELECT COUNT(*) FROM bookings WHERE status = 'paid') AS pending_confirmations
            "#,
        )
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let total_blogs = Self::convert_count(row.total_blogs)?;
        let published_blogs = Self::convert_count(row.published_blogs)?;
        Ok(DashboardCounts {
            total_blogs,
            published_blogs,
            draft_blogs: total_blogs.saturating_sub(published_blogs),
            total_associates: Self::convert_count(row.total_associates)?,
            active_associates: Self::convert_count(row.active_associates)?,
            total_contacts: Self::convert_count(row.total_contacts)?,
            unread_contacts: Self::convert_count(row.unread_contacts)?,
            total_views: Self::convert_count(row.total_views)?,
            total_testimonials: Self::convert_count(row.total_testimonials)?,
            active_testimonials: Self::convert_count(row.active_testimonials)?,
            total_grants: Self::convert_count(row.total_grants)?,
            active_grants: Self::convert_count(row.active_grants)?,
            total_bookings: Self::convert_count(row.total_bookings)?,
            paid_bookings: Self::convert_count(row.paid_bookings)?,
            consultation_revenue: row.consultation_revenue,
            pending_confirmations: Self::convert_count(row.pending_confirmations)?,
        })
    }

    async fn publish_activity(
        &self,
        since: OffsetDateTime,
        until: OffsetDateTime,
    ) -> Result<Vec<PublishDayActivity>, RepoError> {
        let rows = sqlx::query_as::<_, PublishDayRow>(
            r#"
            SELECT
                (publish_date AT TIME ZONE 'UTC')::DATE AS day,
                COUNT(*) AS posts,
                COALESCE(SUM(view_count), 0)::BIGINT AS views
            FROM blog_posts
            WHERE is_published AND publish_date >= $1 AND publish_date <= $2
            GROUP BY day
            ORDER BY day
            "#,
        )
        .bind(since)
        .bind(until)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|row| {
                Ok(PublishDayActivity {
                    date: row.day,
                    posts: Self::convert_count(row.posts)?,
                    views: Self::convert_count(row.views)?,
                })
            })
            .collect()
    }

    async fn published_posts_by_category(&self) -> Result<Vec<CategoryPostCount>, RepoError> {
        let rows = sqlx::query_as::<_, CategoryCountRow>(
            r#"
            SELECT c.name AS category, COUNT(p.id) AS posts
            FROM blog_categories c
            JOIN blog_post_categories pc ON pc.category_id = c.id
            JOIN blog_posts p ON p.id = pc.post_id AND p.is_published
            GROUP BY c.id, c.name
            ORDER BY posts DESC, c.name
            "#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|row| {
                Ok(CategoryPostCount {
                    category: row.category,
                    posts: Self::convert_count(row.posts)?,
                })
            })
            .collect()
    }

    async fn contacts_by_status(&self) -> Result<Vec<ContactStatusCount>, RepoError> {
        let rows = sqlx::query_as::<_, StatusCountRow>(
            "SELECT status, COUNT(*) AS count FROM contacts GROUP BY status ORDER BY status",
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|row| {
                Ok(ContactStatusCount {
                    status: row.status,
                    count: Self::convert_count(row.count)?,
                })
            })
            .collect()
    }
}
