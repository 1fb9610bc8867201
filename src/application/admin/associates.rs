use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::application::admin::audit::{AdminAuditService, ItemSnapshot};
use crate::application::admin::{
    AdminError, ItemKey, clean_list, merge_optional, merge_text, optional_text, require_text,
    resolve_slug,
};
use crate::application::repos::{
    AssociateParams, AssociateQueryFilter, AssociatesRepo, AssociatesWriteRepo, ListScope,
};
use crate::domain::entities::AssociateRecord;

const ENTITY: &str = "associate";

/// Create/update payload for an associate; absent fields are left untouched on update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssociateDraft {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub title: Option<String>,
    pub bio: Option<String>,
    pub expertise: Option<Vec<String>>,
    pub image_url: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub linkedin_url: Option<String>,
    pub twitter_url: Option<String>,
    pub order_priority: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Clone)]
pub struct AdminAssociateService {
    reader: Arc<dyn AssociatesRepo>,
    writer: Arc<dyn AssociatesWriteRepo>,
    audit: AdminAuditService,
}

impl AdminAssociateService {
    pub fn new(
        reader: Arc<dyn AssociatesRepo>,
        writer: Arc<dyn AssociatesWriteRepo>,
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
        scope: ListScope,
        filter: &AssociateQueryFilter,
    ) -> Result<Vec<AssociateRecord>, AdminError> {
        Ok(self.reader.list_associates(scope, filter).await?)
    }

    pub async fn find(&self, key: &ItemKey) -> Result<Option<AssociateRecord>, AdminError> {
        let record = match key {
            ItemKey::Id(id) => self.reader.find_associate(*id).await?,
            ItemKey::Slug(slug) => self.reader.find_associate_by_slug(slug).await?,
        };
        Ok(record)
    }

    async fn require(&self, key: &ItemKey) -> Result<AssociateRecord, AdminError> {
        self.find(key)
            .await?
            .ok_or(AdminError::NotFound { entity: ENTITY })
    }

    pub async fn create(
        &self,
        actor: &str,
        draft: AssociateDraft,
    ) -> Result<AssociateRecord, AdminError> {
        let name = require_text(draft.name, "name")?;
        let title = require_text(draft.title, "title")?;
        let bio = require_text(draft.bio, "bio")?;
        let email = optional_text(draft.email);
        validate_email(email.as_deref())?;

        let reader = self.reader.clone();
        let slug = resolve_slug(draft.slug, &name, None, move |candidate| {
            let reader = reader.clone();
            async move {
                reader
                    .find_associate_by_slug(&candidate)
                    .await
                    .map(|found| found.map(|record| record.id))
            }
        })
        .await?;

        let params = AssociateParams {
            name,
            slug,
            title,
            bio,
            expertise: clean_list(draft.expertise.unwrap_or_default()),
            image_url: optional_text(draft.image_url),
            email,
            phone: optional_text(draft.phone),
            linkedin_url: optional_text(draft.linkedin_url),
            twitter_url: optional_text(draft.twitter_url),
            order_priority: draft.order_priority.unwrap_or(0),
            is_active: draft.is_active.unwrap_or(true),
        };

        let record = self.writer.create_associate(params).await?;
        self.record_audit(actor, "associate.create", &record).await?;
        Ok(record)
    }

    pub async fn update(
        &self,
        actor: &str,
        key: &ItemKey,
        draft: AssociateDraft,
    ) -> Result<AssociateRecord, AdminError> {
        let existing = self.require(key).await?;
        let owner = existing.id;

        let name = merge_text(draft.name, existing.name, "name")?;
        let email = merge_optional(draft.email, existing.email);
        validate_email(email.as_deref())?;

        let slug = match draft.slug {
            Some(explicit) => {
                let reader = self.reader.clone();
                resolve_slug(Some(explicit), &name, Some(owner), move |candidate| {
                    let reader = reader.clone();
                    async move {
                        reader
                            .find_associate_by_slug(&candidate)
                            .await
                            .map(|found| found.map(|record| record.id))
                    }
                })
                .await?
            }
            None => existing.slug,
        };

        let params = AssociateParams {
            name,
            slug,
            title: merge_text(draft.title, existing.title, "title")?,
            bio: merge_text(draft.bio, existing.bio, "bio")?,
            expertise: draft
                .expertise
                .map(clean_list)
                .unwrap_or(existing.expertise),
            image_url: merge_optional(draft.image_url, existing.image_url),
            email,
            phone: merge_optional(draft.phone, existing.phone),
            linkedin_url: merge_optional(draft.linkedin_url, existing.linkedin_url),
            twitter_url: merge_optional(draft.twitter_url, existing.twitter_url),
            order_priority: draft.order_priority.unwrap_or(existing.order_priority),
            is_active: draft.is_active.unwrap_or(existing.is_active),
        };

        let record = self.writer.update_associate(owner, params).await?;
        self.record_audit(actor, "associate.update", &record).await?;
        Ok(record)
    }

    pub async fn delete(&self, actor: &str, key: &ItemKey) -> Result<(), AdminError> {
        let existing = self.require(key).await?;
        self.writer.delete_associate(existing.id).await?;
        self.record_audit(actor, "associate.delete", &existing).await?;
        Ok(())
    }

    async fn record_audit(
        &self,
        actor: &str,
        action: &str,
        record: &AssociateRecord,
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

pub(crate) fn validate_email(value: Option<&str>) -> Result<(), AdminError> {
    match value {
        Some(email) if !looks_like_email(email) => {
            Err(AdminError::invalid("email", "Enter a valid email address."))
        }
        _ => Ok(()),
    }
}

pub(crate) fn looks_like_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !value.chars().any(char::is_whitespace)
}
