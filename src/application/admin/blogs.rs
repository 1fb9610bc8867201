use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::warn;
use uuid::Uuid;

use crate::application::admin::audit::{AdminAuditService, ItemSnapshot};
use crate::application::admin::{
    AdminError, ItemKey, ensure_max_len, merge_optional, merge_text, optional_text, require_text,
    resolve_slug,
};
use crate::application::repos::{
    BlogPostParams, BlogQueryFilter, BlogsRepo, BlogsWriteRepo, CategoriesRepo, ListScope,
};
use crate::domain::entities::BlogPostRecord;

const ENTITY: &str = "blog";
const EXCERPT_MAX: usize = 500;
const META_DESCRIPTION_MAX: usize = 160;
const META_KEYWORDS_MAX: usize = 255;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlogPostDraft {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub category_ids: Option<Vec<Uuid>>,
    pub featured_image_url: Option<String>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    pub is_published: Option<bool>,
    pub is_featured: Option<bool>,
    pub order_priority: Option<i32>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub publish_date: Option<OffsetDateTime>,
}

#[derive(Clone)]
pub struct AdminBlogService {
    reader: Arc<dyn BlogsRepo>,
    writer: Arc<dyn BlogsWriteRepo>,
    categories: Arc<dyn CategoriesRepo>,
    audit: AdminAuditService,
}

impl AdminBlogService {
    pub fn new(
        reader: Arc<dyn BlogsRepo>,
        writer: Arc<dyn BlogsWriteRepo>,
        categories: Arc<dyn CategoriesRepo>,
        audit: AdminAuditService,
    ) -> Self {
        Self {
            reader,
            writer,
            categories,
            audit,
        }
    }

    pub async fn list(
        &self,
        scope: ListScope,
        filter: &BlogQueryFilter,
    ) -> Result<Vec<BlogPostRecord>, AdminError> {
        Ok(self.reader.list_blogs(scope, filter).await?)
    }

    pub async fn find(&self, key: &ItemKey) -> Result<Option<BlogPostRecord>, AdminError> {
        let record = match key {
            ItemKey::Id(id) => self.reader.find_blog(*id).await?,
            ItemKey::Slug(slug) => self.reader.find_blog_by_slug(slug).await?,
        };
        Ok(record)
    }

    /// Public read: only published posts whose publish date has passed. Counts a view.
    pub async fn read_public(&self, key: &ItemKey) -> Result<BlogPostRecord, AdminError> {
        let now = OffsetDateTime::now_utc();
        let record = self
            .find(key)
            .await?
            .filter(|post| is_publicly_visible(post, now))
            .ok_or(AdminError::NotFound { entity: ENTITY })?;

        if let Err(err) = self.writer.increment_view_count(record.id).await {
            warn!(
                target = "lightfield::application::admin::blogs",
                post_id = %record.id,
                error = %err,
                "Failed to record blog view"
            );
        }
        Ok(record)
    }

    async fn require(&self, key: &ItemKey) -> Result<BlogPostRecord, AdminError> {
        self.find(key)
            .await?
            .ok_or(AdminError::NotFound { entity: ENTITY })
    }

    async fn ensure_categories_exist(&self, ids: &[Uuid]) -> Result<(), AdminError> {
        for id in ids {
            if self.categories.find_category(*id).await?.is_none() {
                return Err(AdminError::invalid(
                    "category_ids",
                    format!("Invalid pk \"{id}\" - object does not exist."),
                ));
            }
        }
        Ok(())
    }

    pub async fn create(
        &self,
        actor: &str,
        author_id: Uuid,
        draft: BlogPostDraft,
    ) -> Result<BlogPostRecord, AdminError> {
        let title = require_text(draft.title, "title")?;
        let excerpt = require_text(draft.excerpt, "excerpt")?;
        let content = require_text(draft.content, "content")?;
        let meta_description = optional_text(draft.meta_description);
        let meta_keywords = optional_text(draft.meta_keywords);
        validate_lengths(&excerpt, meta_description.as_deref(), meta_keywords.as_deref())?;

        let mut category_ids = draft.category_ids.unwrap_or_default();
        category_ids.sort();
        category_ids.dedup();
        self.ensure_categories_exist(&category_ids).await?;

        let reader = self.reader.clone();
        let slug = resolve_slug(draft.slug, &title, None, move |candidate| {
            let reader = reader.clone();
            async move {
                reader
                    .find_blog_by_slug(&candidate)
                    .await
                    .map(|found| found.map(|record| record.id))
            }
        })
        .await?;

        let is_published = draft.is_published.unwrap_or(false);
        let params = BlogPostParams {
            title,
            slug,
            excerpt,
            content,
            category_ids,
            featured_image_url: optional_text(draft.featured_image_url),
            meta_description,
            meta_keywords,
            is_published,
            is_featured: draft.is_featured.unwrap_or(false),
            order_priority: draft.order_priority.unwrap_or(0),
            publish_date: stamp_publish_date(is_published, draft.publish_date),
        };

        let record = self.writer.create_blog(author_id, params).await?;
        self.record_audit(actor, "blog.create", &record).await?;
        Ok(record)
    }

    pub async fn update(
        &self,
        actor: &str,
        key: &ItemKey,
        draft: BlogPostDraft,
    ) -> Result<BlogPostRecord, AdminError> {
        let existing = self.require(key).await?;
        let owner = existing.id;

        let title = merge_text(draft.title, existing.title, "title")?;
        let excerpt = merge_text(draft.excerpt, existing.excerpt, "excerpt")?;
        let content = merge_text(draft.content, existing.content, "content")?;
        let meta_description = merge_optional(draft.meta_description, existing.meta_description);
        let meta_keywords = merge_optional(draft.meta_keywords, existing.meta_keywords);
        validate_lengths(&excerpt, meta_description.as_deref(), meta_keywords.as_deref())?;

        let category_ids = match draft.category_ids {
            Some(mut ids) => {
                ids.sort();
                ids.dedup();
                self.ensure_categories_exist(&ids).await?;
                ids
            }
            None => existing.categories.iter().map(|entry| entry.id).collect(),
        };

        let slug = match draft.slug {
            Some(explicit) => {
                let reader = self.reader.clone();
                resolve_slug(Some(explicit), &title, Some(owner), move |candidate| {
                    let reader = reader.clone();
                    async move {
                        reader
                            .find_blog_by_slug(&candidate)
                            .await
                            .map(|found| found.map(|record| record.id))
                    }
                })
                .await?
            }
            None => existing.slug,
        };

        let is_published = draft.is_published.unwrap_or(existing.is_published);
        let publish_date = stamp_publish_date(
            is_published,
            draft.publish_date.or(existing.publish_date),
        );

        let params = BlogPostParams {
            title,
            slug,
            excerpt,
            content,
            category_ids,
            featured_image_url: merge_optional(
                draft.featured_image_url,
                existing.featured_image_url,
            ),
            meta_description,
            meta_keywords,
            is_published,
            is_featured: draft.is_featured.unwrap_or(existing.is_featured),
            order_priority: draft.order_priority.unwrap_or(existing.order_priority),
            publish_date,
        };

        let record = self.writer.update_blog(owner, params).await?;
        self.record_audit(actor, "blog.update", &record).await?;
        Ok(record)
    }

    pub async fn delete(&self, actor: &str, key: &ItemKey) -> Result<(), AdminError> {
        let existing = self.require(key).await?;
        self.writer.delete_blog(existing.id).await?;
        self.record_audit(actor, "blog.delete", &existing).await?;
        Ok(())
    }

    async fn record_audit(
        &self,
        actor: &str,
        action: &str,
        record: &BlogPostRecord,
    ) -> Result<(), AdminError> {
        let snapshot = ItemSnapshot {
            slug: Some(record.slug.as_str()),
            label: record.title.as_str(),
        };
        self.audit
            .record(
                actor,
                action,
                ENTITY,
                Some(&record.id.to_string()),
                Some(&snapshot),
            )
            .await?;
        Ok(())
    }
}

pub fn is_publicly_visible(post: &BlogPostRecord, now: OffsetDateTime) -> bool {
    post.is_published && post.publish_date.is_some_and(|date| date <= now)
}

/// A published post always carries a publish date; a missing one is stamped with now.
fn stamp_publish_date(
    is_published: bool,
    publish_date: Option<OffsetDateTime>,
) -> Option<OffsetDateTime> {
    match (is_published, publish_date) {
        (true, None) => Some(OffsetDateTime::now_utc()),
        (_, date) => date,
    }
}

fn validate_lengths(
    excerpt: &str,
    meta_description: Option<&str>,
    meta_keywords: Option<&str>,
) -> Result<(), AdminError> {
    ensure_max_len(Some(excerpt), EXCERPT_MAX, "excerpt")?;
    ensure_max_len(meta_description, META_DESCRIPTION_MAX, "meta_description")?;
    ensure_max_len(meta_keywords, META_KEYWORDS_MAX, "meta_keywords")?;
    Ok(())
}
