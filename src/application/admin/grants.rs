use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::Date;

use crate::application::admin::audit::{AdminAuditService, ItemSnapshot};
use crate::application::admin::{
    AdminError, ItemKey, clean_list, merge_optional, merge_text, optional_text, require_text,
    resolve_slug,
};
use crate::application::repos::{
    GrantParams, GrantQueryFilter, GrantsRepo, GrantsWriteRepo, ListScope,
};
use crate::domain::entities::GrantRecord;
use crate::domain::formats::iso_date;
use crate::domain::types::{Currency, GrantStatus, GrantType};

const ENTITY: &str = "grant";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrantDraft {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub grant_type: Option<GrantType>,
    /// Minor units. Zero or negative amounts are rejected.
    pub amount: Option<i64>,
    pub currency: Option<Currency>,
    pub short_description: Option<String>,
    pub full_description: Option<String>,
    pub target_audience: Option<String>,
    #[serde(with = "iso_date::option")]
    pub application_deadline: Option<Date>,
    #[serde(with = "iso_date::option")]
    pub announcement_date: Option<Date>,
    pub status: Option<GrantStatus>,
    pub eligibility_criteria: Option<Vec<String>>,
    pub requirements: Option<Vec<String>>,
    pub guidelines: Option<Vec<String>>,
    pub target_institutions: Option<Vec<String>>,
    pub is_featured: Option<bool>,
    pub is_active: Option<bool>,
    pub order_priority: Option<i32>,
}

#[derive(Clone)]
pub struct AdminGrantService {
    reader: Arc<dyn GrantsRepo>,
    writer: Arc<dyn GrantsWriteRepo>,
    audit: AdminAuditService,
}

impl AdminGrantService {
    pub fn new(
        reader: Arc<dyn GrantsRepo>,
        writer: Arc<dyn GrantsWriteRepo>,
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
        filter: &GrantQueryFilter,
    ) -> Result<Vec<GrantRecord>, AdminError> {
        Ok(self.reader.list_grants(scope, filter).await?)
    }

    /// Active and featured grants for the landing page.
    pub async fn featured(&self) -> Result<Vec<GrantRecord>, AdminError> {
        let filter = GrantQueryFilter {
            is_featured: Some(true),
            ..GrantQueryFilter::default()
        };
        self.list(ListScope::Public, &filter).await
    }

    /// Active grants currently accepting applications.
    pub async fn open(&self) -> Result<Vec<GrantRecord>, AdminError> {
        let filter = GrantQueryFilter {
            status: Some(GrantStatus::Open),
            ..GrantQueryFilter::default()
        };
        self.list(ListScope::Public, &filter).await
    }

    pub async fn find(&self, key: &ItemKey) -> Result<Option<GrantRecord>, AdminError> {
        let record = match key {
            ItemKey::Id(id) => self.reader.find_grant(*id).await?,
            ItemKey::Slug(slug) => self.reader.find_grant_by_slug(slug).await?,
        };
        Ok(record)
    }

    async fn require(&self, key: &ItemKey) -> Result<GrantRecord, AdminError> {
        self.find(key)
            .await?
            .ok_or(AdminError::NotFound { entity: ENTITY })
    }

    pub async fn create(&self, actor: &str, draft: GrantDraft) -> Result<GrantRecord, AdminError> {
        let title = require_text(draft.title, "title")?;
        let short_description = require_text(draft.short_description, "short_description")?;
        validate_amount(draft.amount)?;

        let reader = self.reader.clone();
        let slug = resolve_slug(draft.slug, &title, None, move |candidate| {
            let reader = reader.clone();
            async move {
                reader
                    .find_grant_by_slug(&candidate)
                    .await
                    .map(|found| found.map(|record| record.id))
            }
        })
        .await?;

        let params = GrantParams {
            title,
            slug,
            grant_type: draft.grant_type.unwrap_or(GrantType::Grant),
            amount: draft.amount,
            currency: draft.currency.unwrap_or_default(),
            short_description,
            full_description: optional_text(draft.full_description),
            target_audience: optional_text(draft.target_audience),
            application_deadline: draft.application_deadline,
            announcement_date: draft.announcement_date,
            status: draft.status.unwrap_or(GrantStatus::Upcoming),
            eligibility_criteria: clean_list(draft.eligibility_criteria.unwrap_or_default()),
            requirements: clean_list(draft.requirements.unwrap_or_default()),
            guidelines: clean_list(draft.guidelines.unwrap_or_default()),
            target_institutions: clean_list(draft.target_institutions.unwrap_or_default()),
            is_featured: draft.is_featured.unwrap_or(false),
            is_active: draft.is_active.unwrap_or(true),
            order_priority: draft.order_priority.unwrap_or(0),
        };

        let record = self.writer.create_grant(params).await?;
        self.record_audit(actor, "grant.create", &record).await?;
        Ok(record)
    }

    pub async fn update(
        &self,
        actor: &str,
        key: &ItemKey,
        draft: GrantDraft,
    ) -> Result<GrantRecord, AdminError> {
        let existing = self.require(key).await?;
        let owner = existing.id;
        let title = merge_text(draft.title, existing.title, "title")?;
        validate_amount(draft.amount)?;

        let slug = match draft.slug {
            Some(explicit) => {
                let reader = self.reader.clone();
                resolve_slug(Some(explicit), &title, Some(owner), move |candidate| {
                    let reader = reader.clone();
                    async move {
                        reader
                            .find_grant_by_slug(&candidate)
                            .await
                            .map(|found| found.map(|record| record.id))
                    }
                })
                .await?
            }
            None => existing.slug,
        };

        let params = GrantParams {
            title,
            slug,
            grant_type: draft.grant_type.unwrap_or(existing.grant_type),
            amount: draft.amount.or(existing.amount),
            currency: draft.currency.unwrap_or(existing.currency),
            short_description: merge_text(
                draft.short_description,
                existing.short_description,
                "short_description",
            )?,
            full_description: merge_optional(draft.full_description, existing.full_description),
            target_audience: merge_optional(draft.target_audience, existing.target_audience),
            application_deadline: draft
                .application_deadline
                .or(existing.application_deadline),
            announcement_date: draft.announcement_date.or(existing.announcement_date),
            status: draft.status.unwrap_or(existing.status),
            eligibility_criteria: draft
                .eligibility_criteria
                .map(clean_list)
                .unwrap_or(existing.eligibility_criteria),
            requirements: draft
                .requirements
                .map(clean_list)
                .unwrap_or(existing.requirements),
            guidelines: draft
                .guidelines
                .map(clean_list)
                .unwrap_or(existing.guidelines),
            target_institutions: draft
                .target_institutions
                .map(clean_list)
                .unwrap_or(existing.target_institutions),
            is_featured: draft.is_featured.unwrap_or(existing.is_featured),
            is_active: draft.is_active.unwrap_or(existing.is_active),
            order_priority: draft.order_priority.unwrap_or(existing.order_priority),
        };

        let record = self.writer.update_grant(owner, params).await?;
        self.record_audit(actor, "grant.update", &record).await?;
        Ok(record)
    }

    pub async fn delete(&self, actor: &str, key: &ItemKey) -> Result<(), AdminError> {
        let existing = self.require(key).await?;
        self.writer.delete_grant(existing.id).await?;
        self.record_audit(actor, "grant.delete", &existing).await?;
        Ok(())
    }

    async fn record_audit(
        &self,
        actor: &str,
        action: &str,
        record: &GrantRecord,
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

fn validate_amount(amount: Option<i64>) -> Result<(), AdminError> {
    match amount {
        Some(value) if value <= 0 => Err(AdminError::invalid(
            "amount",
            "Amount must be greater than zero",
        )),
        _ => Ok(()),
    }
}
