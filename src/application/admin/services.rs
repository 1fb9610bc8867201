use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::application::admin::audit::{AdminAuditService, ItemSnapshot};
use crate::application::admin::{
    AdminError, ItemKey, merge_optional, merge_text, optional_text, require_text, resolve_slug,
};
use crate::application::repos::{
    ListScope, ServiceParams, ServiceQueryFilter, ServicesRepo, ServicesWriteRepo,
};
use crate::domain::entities::ConsultationServiceRecord;
use crate::domain::types::{Currency, ServiceCategory};

const ENTITY: &str = "consultation_service";
const FEATURED_LIMIT: usize = 6;
const MIN_DURATION: i32 = 15;
const MAX_DURATION: i32 = 480;
const DEFAULT_DURATION: i32 = 60;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceDraft {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub category: Option<ServiceCategory>,
    /// Minor units.
    pub price: Option<i64>,
    pub currency: Option<Currency>,
    pub duration_minutes: Option<i32>,
    pub icon_name: Option<String>,
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
    pub order_priority: Option<i32>,
}

#[derive(Clone)]
pub struct AdminServiceCatalog {
    reader: Arc<dyn ServicesRepo>,
    writer: Arc<dyn ServicesWriteRepo>,
    audit: AdminAuditService,
}

impl AdminServiceCatalog {
    pub fn new(
        reader: Arc<dyn ServicesRepo>,
        writer: Arc<dyn ServicesWriteRepo>,
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
        filter: &ServiceQueryFilter,
    ) -> Result<Vec<ConsultationServiceRecord>, AdminError> {
        Ok(self.reader.list_services(scope, filter).await?)
    }

    /// Active featured services, at most six.
    pub async fn featured(&self) -> Result<Vec<ConsultationServiceRecord>, AdminError> {
        let filter = ServiceQueryFilter {
            is_featured: Some(true),
            ..ServiceQueryFilter::default()
        };
        let mut services = self.list(ListScope::Public, &filter).await?;
        services.truncate(FEATURED_LIMIT);
        Ok(services)
    }

    pub async fn find(
        &self,
        key: &ItemKey,
    ) -> Result<Option<ConsultationServiceRecord>, AdminError> {
        let record = match key {
            ItemKey::Id(id) => self.reader.find_service(*id).await?,
            ItemKey::Slug(slug) => self.reader.find_service_by_slug(slug).await?,
        };
        Ok(record)
    }

    async fn require(&self, key: &ItemKey) -> Result<ConsultationServiceRecord, AdminError> {
        self.find(key)
            .await?
            .ok_or(AdminError::NotFound { entity: ENTITY })
    }

    pub async fn create(
        &self,
        actor: &str,
        draft: ServiceDraft,
    ) -> Result<ConsultationServiceRecord, AdminError> {
        let name = require_text(draft.name, "name")?;
        let description = require_text(draft.description, "description")?;
        let price = draft
            .price
            .ok_or_else(|| AdminError::invalid("price", "This field is required."))?;
        validate_price(price)?;
        let duration_minutes = draft.duration_minutes.unwrap_or(DEFAULT_DURATION);
        validate_duration(duration_minutes)?;

        let reader = self.reader.clone();
        let slug = resolve_slug(draft.slug, &name, None, move |candidate| {
            let reader = reader.clone();
            async move {
                reader
                    .find_service_by_slug(&candidate)
                    .await
                    .map(|found| found.map(|record| record.id))
            }
        })
        .await?;

        let params = ServiceParams {
            name,
            slug,
            description,
            short_description: optional_text(draft.short_description),
            category: draft.category.unwrap_or(ServiceCategory::Other),
            price,
            currency: draft.currency.unwrap_or_default(),
            duration_minutes,
            icon_name: optional_text(draft.icon_name),
            image_url: optional_text(draft.image_url),
            is_active: draft.is_active.unwrap_or(true),
            is_featured: draft.is_featured.unwrap_or(false),
            order_priority: draft.order_priority.unwrap_or(0),
        };

        let record = self.writer.create_service(params).await?;
        self.record_audit(actor, "consultation_service.create", &record)
            .await?;
        Ok(record)
    }

    pub async fn update(
        &self,
        actor: &str,
        key: &ItemKey,
        draft: ServiceDraft,
    ) -> Result<ConsultationServiceRecord, AdminError> {
        let existing = self.require(key).await?;
        let owner = existing.id;
        let name = merge_text(draft.name, existing.name, "name")?;
        let price = draft.price.unwrap_or(existing.price);
        validate_price(price)?;
        let duration_minutes = draft.duration_minutes.unwrap_or(existing.duration_minutes);
        validate_duration(duration_minutes)?;

        let slug = match draft.slug {
            Some(explicit) => {
                let reader = self.reader.clone();
                resolve_slug(Some(explicit), &name, Some(owner), move |candidate| {
                    let reader = reader.clone();
                    async move {
                        reader
                            .find_service_by_slug(&candidate)
                            .await
                            .map(|found| found.map(|record| record.id))
                    }
                })
                .await?
            }
            None => existing.slug,
        };

        let params = ServiceParams {
            name,
            slug,
            description: merge_text(draft.description, existing.description, "description")?,
            short_description: merge_optional(
                draft.short_description,
                existing.short_description,
            ),
            category: draft.category.unwrap_or(existing.category),
            price,
            currency: draft.currency.unwrap_or(existing.currency),
            duration_minutes,
            icon_name: merge_optional(draft.icon_name, existing.icon_name),
            image_url: merge_optional(draft.image_url, existing.image_url),
            is_active: draft.is_active.unwrap_or(existing.is_active),
            is_featured: draft.is_featured.unwrap_or(existing.is_featured),
            order_priority: draft.order_priority.unwrap_or(existing.order_priority),
        };

        let record = self.writer.update_service(owner, params).await?;
        self.record_audit(actor, "consultation_service.update", &record)
            .await?;
        Ok(record)
    }

    pub async fn delete(&self, actor: &str, key: &ItemKey) -> Result<(), AdminError> {
        let existing = self.require(key).await?;
        self.writer.delete_service(existing.id).await?;
        self.record_audit(actor, "consultation_service.delete", &existing)
            .await?;
        Ok(())
    }

    async fn record_audit(
        &self,
        actor: &str,
        action: &str,
        record: &ConsultationServiceRecord,
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

fn validate_price(price: i64) -> Result<(), AdminError> {
    if price <= 0 {
        return Err(AdminError::invalid(
            "price",
            "Price must be greater than zero",
        ));
    }
    Ok(())
}

fn validate_duration(minutes: i32) -> Result<(), AdminError> {
    if !(MIN_DURATION..=MAX_DURATION).contains(&minutes) {
        return Err(AdminError::invalid(
            "duration_minutes",
            format!("Duration must be between {MIN_DURATION} and {MAX_DURATION} minutes"),
        ));
    }
    Ok(())
}
