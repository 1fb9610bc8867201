use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::application::admin::audit::{AdminAuditService, ItemSnapshot};
use crate::application::admin::{
    AdminError, ItemKey, merge_optional, merge_text, optional_text, require_text, resolve_slug,
};
use crate::application::repos::{
    CategoriesRepo, CategoriesWriteRepo, CategoryParams, CategoryQueryFilter,
};
use crate::domain::entities::CategoryRecord;

const ENTITY: &str = "category";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryDraft {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub order_priority: Option<i32>,
}

#[derive(Clone)]
pub struct AdminCategoryService {
    reader: Arc<dyn CategoriesRepo>,
    writer: Arc<dyn CategoriesWriteRepo>,
    audit: AdminAuditService,
}

impl AdminCategoryService {
    pub fn new(
        reader: Arc<dyn CategoriesRepo>,
        writer: Arc<dyn CategoriesWriteRepo>,
        audit: AdminAuditService,
    ) -> Self {
        Self {
            reader,
            writer,
            audit,
        }
    }

    pub async fn list(
        &self,
        filter: &CategoryQueryFilter,
    ) -> Result<Vec<CategoryRecord>, AdminError> {
        Ok(self.reader.list_categories(filter).await?)
    }

    pub async fn find(&self, key: &ItemKey) -> Result<Option<CategoryRecord>, AdminError> {
        let record = match key {
            ItemKey::Id(id) => self.reader.find_category(*id).await?,
            ItemKey::Slug(slug) => self.reader.find_category_by_slug(slug).await?,
        };
        Ok(record)
    }

    async fn require(&self, key: &ItemKey) -> Result<CategoryRecord, AdminError> {
        self.find(key)
            .await?
            .ok_or(AdminError::NotFound { entity: ENTITY })
    }

    async fn ensure_name_free(
        &self,
        name: &str,
        owner: Option<uuid::Uuid>,
    ) -> Result<(), AdminError> {
        match self.reader.find_category_by_name(name).await? {
            Some(existing) if Some(existing.id) != owner => Err(AdminError::invalid(
                "name",
                "A category with this name already exists.",
            )),
            _ => Ok(()),
        }
    }

    pub async fn create(
        &self,
        actor: &str,
        draft: CategoryDraft,
    ) -> Result<CategoryRecord, AdminError> {
        let name = require_text(draft.name, "name")?;
        self.ensure_name_free(&name, None).await?;

        let reader = self.reader.clone();
        let slug = resolve_slug(draft.slug, &name, None, move |candidate| {
            let reader = reader.clone();
            async move {
                reader
                    .find_category_by_slug(&candidate)
                    .await
                    .map(|found| found.map(|record| record.id))
            }
        })
        .await?;

        let params = CategoryParams {
            name,
            slug,
            description: optional_text(draft.description),
            order_priority: draft.order_priority.unwrap_or(0),
        };
        let record = self.writer.create_category(params).await?;
        self.record_audit(actor, "category.create", &record).await?;
        Ok(record)
    }

    pub async fn update(
        &self,
        actor: &str,
        key: &ItemKey,
        draft: CategoryDraft,
    ) -> Result<CategoryRecord, AdminError> {
        let existing = self.require(key).await?;
        let owner = existing.id;
        let name = merge_text(draft.name, existing.name, "name")?;
        self.ensure_name_free(&name, Some(owner)).await?;

        let slug = match draft.slug {
            Some(explicit) => {
                let reader = self.reader.clone();
                resolve_slug(Some(explicit), &name, Some(owner), move |candidate| {
                    let reader = reader.clone();
                    async move {
                        reader
                            .find_category_by_slug(&candidate)
                            .await
                            .map(|found| found.map(|record| record.id))
                    }
                })
                .await?
            }
            None => existing.slug,
        };

        let params = CategoryParams {
            name,
            slug,
            description: merge_optional(draft.description, existing.description),
            order_priority: draft.order_priority.unwrap_or(existing.order_priority),
        };
        let record = self.writer.update_category(owner, params).await?;
        self.record_audit(actor, "category.update", &record).await?;
        Ok(record)
    }

    pub async fn delete(&self, actor: &str, key: &ItemKey) -> Result<(), AdminError> {
        let existing = self.require(key).await?;
        self.writer.delete_category(existing.id).await?;
        self.record_audit(actor, "category.delete", &existing).await?;
        Ok(())
    }

    async fn record_audit(
        &self,
        actor: &str,
        action: &str,
        record: &CategoryRecord,
    ) -> Result<(), AdminError> {
        let snapshot = ItemSnapshot {
            slug: Some(record.slug.as_str()),
            label: record.name.as_str(),
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
