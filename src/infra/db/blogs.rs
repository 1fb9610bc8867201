use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{
        BlogPostParams, BlogQueryFilter, BlogsRepo, BlogsWriteRepo, ListScope, RepoError,
    },
    domain::{
        entities::{BlogPostRecord, CategorySummary, read_time_minutes},
        resources::ResourceKind,
    },
};

use super::{
    PostgresRepositories, bump_version, delete_versioned, lock_priority, map_sqlx_error,
};

const BLOG_SELECT: &str = "SELECT p.id, p.title, p.slug, p.excerpt, p.content, \
    COALESCE(NULLIF(TRIM(u.first_name || ' ' || u.last_name), ''), u.username) AS author, \
    p.featured_image_url, p.meta_description, p.meta_keywords, p.is_published, p.is_featured, \
    p.order_priority, p.view_count, p.publish_date, p.created_at, p.updated_at \
    FROM blog_posts p \
    INNER JOIN staff_users u ON u.id = p.author_id";

#[derive(sqlx::FromRow)]
struct BlogRow {
    id: Uuid,
    title: String,
    slug: String,
    excerpt: String,
    content: String,
    author: String,
    featured_image_url: Option<String>,
    meta_description: Option<String>,
    meta_keywords: Option<String>,
    is_published: bool,
    is_featured: bool,
    order_priority: i32,
    view_count: i64,
    publish_date: Option<OffsetDateTime>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl BlogRow {
    fn into_record(self, categories: Vec<CategorySummary>) -> BlogPostRecord {
        let read_time_minutes = read_time_minutes(&self.content);
        BlogPostRecord {
            id: self.id,
            title: self.title,
            slug: self.slug,
            excerpt: self.excerpt,
            content: self.content,
            author: self.author,
            categories,
            featured_image_url: self.featured_image_url,
            meta_description: self.meta_description,
            meta_keywords: self.meta_keywords,
            is_published: self.is_published,
            is_featured: self.is_featured,
            order_priority: self.order_priority,
            view_count: self.view_count,
            publish_date: self.publish_date,
            read_time_minutes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PostCategoryRow {
    post_id: Uuid,
    id: Uuid,
    name: String,
    slug: String,
}

impl PostgresRepositories {
    async fn categories_for_posts(
        &self,
        post_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<CategorySummary>>, RepoError> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, PostCategoryRow>(
            "SELECT pc.post_id, c.id, c.name, c.slug \
             FROM blog_post_categories pc \
             INNER JOIN blog_categories c ON c.id = pc.category_id \
             WHERE pc.post_id = ANY($1) \
             ORDER BY c.order_priority ASC, c.name ASC",
        )
        .bind(post_ids)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let mut grouped: HashMap<Uuid, Vec<CategorySummary>> = HashMap::new();
        for row in rows {
            grouped.entry(row.post_id).or_default().push(CategorySummary {
                id: row.id,
                name: row.name,
                slug: row.slug,
            });
        }
        Ok(grouped)
    }

    async fn hydrate_blogs(&self, rows: Vec<BlogRow>) -> Result<Vec<BlogPostRecord>, RepoError> {
        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let mut categories = self.categories_for_posts(&ids).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let assigned = categories.remove(&row.id).unwrap_or_default();
                row.into_record(assigned)
            })
            .collect())
    }

    async fn find_blog_where(
        &self,
        predicate: &'static str,
        value: String,
    ) -> Result<Option<BlogPostRecord>, RepoError> {
        let sql = format!("{BLOG_SELECT} WHERE {predicate}");
        let Some(row) = self.fetch_optional_by::<BlogRow, _>(&sql, value).await? else {
            return Ok(None);
        };
        Ok(self.hydrate_blogs(vec![row]).await?.pop())
    }

    async fn reload_blog(&self, id: Uuid) -> Result<BlogPostRecord, RepoError> {
        self.find_blog(id).await?.ok_or(RepoError::NotFound)
    }
}

async fn replace_categories(
    tx: &mut Transaction<'_, Postgres>,
    post_id: Uuid,
    category_ids: &[Uuid],
) -> Result<(), RepoError> {
    sqlx::query("DELETE FROM blog_post_categories WHERE post_id = $1")
        .bind(post_id)
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

    if category_ids.is_empty() {
        return Ok(());
    }

    sqlx::query(
        "INSERT INTO blog_post_categories (post_id, category_id) \
         SELECT $1, UNNEST($2::uuid[]) ON CONFLICT DO NOTHING",
    )
    .bind(post_id)
    .bind(category_ids)
    .execute(&mut **tx)
    .await
    .map_err(map_sqlx_error)?;
    Ok(())
}

#[async_trait]
impl BlogsRepo for PostgresRepositories {
    async fn list_blogs(
        &self,
        scope: ListScope,
        filter: &BlogQueryFilter,
    ) -> Result<Vec<BlogPostRecord>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new(BLOG_SELECT);
        qb.push(" WHERE 1=1 ");

        if scope == ListScope::Public {
            qb.push(
                " AND p.is_published = TRUE AND p.publish_date IS NOT NULL \
                  AND p.publish_date <= now() ",
            );
        }
        if let Some(category) = filter.category.as_deref().map(str::trim)
            && !category.is_empty()
        {
            qb.push(
                " AND EXISTS (SELECT 1 FROM blog_post_categories pc \
                  INNER JOIN blog_categories c ON c.id = pc.category_id \
                  WHERE pc.post_id = p.id AND c.slug = ",
            );
            qb.push_bind(category.to_string());
            qb.push(")");
        }
        if let Some(is_featured) = filter.is_featured {
            qb.push(" AND p.is_featured = ");
            qb.push_bind(is_featured);
        }
        Self::push_search(
            &mut qb,
            &["p.title", "p.excerpt", "p.content"],
            filter.search.as_deref(),
        );
        qb.push(" ORDER BY p.order_priority ASC, p.created_at DESC");

        let rows = qb
            .build_query_as::<BlogRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        self.hydrate_blogs(rows).await
    }

    async fn find_blog(&self, id: Uuid) -> Result<Option<BlogPostRecord>, RepoError> {
        let sql = format!("{BLOG_SELECT} WHERE p.id = $1");
        let Some(row) = self.fetch_optional_by::<BlogRow, _>(&sql, id).await? else {
            return Ok(None);
        };
        Ok(self.hydrate_blogs(vec![row]).await?.pop())
    }

    async fn find_blog_by_slug(&self, slug: &str) -> Result<Option<BlogPostRecord>, RepoError> {
        self.find_blog_where("p.slug = $1", slug.to_string()).await
    }
}

#[async_trait]
impl BlogsWriteRepo for PostgresRepositories {
    async fn create_blog(
        &self,
        author_id: Uuid,
        params: BlogPostParams,
    ) -> Result<BlogPostRecord, RepoError> {
        let id = Uuid::new_v4();
        let mut tx = self.begin().await?;
        sqlx::query(
            "INSERT INTO blog_posts (id, title, slug, excerpt, content, author_id, \
             featured_image_url, meta_description, meta_keywords, is_published, is_featured, \
             order_priority, publish_date) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(id)
        .bind(params.title)
        .bind(params.slug)
        .bind(params.excerpt)
        .bind(params.content)
        .bind(author_id)
        .bind(params.featured_image_url)
        .bind(params.meta_description)
        .bind(params.meta_keywords)
        .bind(params.is_published)
        .bind(params.is_featured)
        .bind(params.order_priority)
        .bind(params.publish_date)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        replace_categories(&mut tx, id, &params.category_ids).await?;
        bump_version(&mut tx, ResourceKind::Blogs).await?;
        tx.commit().await.map_err(map_sqlx_error)?;
        self.reload_blog(id).await
    }

    async fn update_blog(
        &self,
        id: Uuid,
        params: BlogPostParams,
    ) -> Result<BlogPostRecord, RepoError> {
        let mut tx = self.begin().await?;
        let previous = lock_priority(&mut tx, ResourceKind::Blogs, id).await?;

        sqlx::query(
            "UPDATE blog_posts SET title = $2, slug = $3, excerpt = $4, content = $5, \
             featured_image_url = $6, meta_description = $7, meta_keywords = $8, \
             is_published = $9, is_featured = $10, order_priority = $11, publish_date = $12, \
             updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(params.title)
        .bind(params.slug)
        .bind(params.excerpt)
        .bind(params.content)
        .bind(params.featured_image_url)
        .bind(params.meta_description)
        .bind(params.meta_keywords)
        .bind(params.is_published)
        .bind(params.is_featured)
        .bind(params.order_priority)
        .bind(params.publish_date)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        replace_categories(&mut tx, id, &params.category_ids).await?;
        if previous != params.order_priority {
            bump_version(&mut tx, ResourceKind::Blogs).await?;
        }
        tx.commit().await.map_err(map_sqlx_error)?;
        self.reload_blog(id).await
    }

    async fn delete_blog(&self, id: Uuid) -> Result<(), RepoError> {
        delete_versioned(self, ResourceKind::Blogs, id).await
    }

    async fn increment_view_count(&self, id: Uuid) -> Result<(), RepoError> {
        sqlx::query("UPDATE blog_posts SET view_count = view_count + 1 WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}
