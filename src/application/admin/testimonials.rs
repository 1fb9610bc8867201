use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::admin::audit::{AdminAuditService, ItemSnapshot};
use crate::application::admin::{
    AdminError, merge_optional, merge_text, optional_text, require_text,
};
use crate::application::repos::{
    ListScope, TestimonialParams, TestimonialQueryFilter, TestimonialsRepo,
    TestimonialsWriteRepo,
};
use crate::domain::entities::TestimonialRecord;

const ENTITY: &str = "testimonial";
const MIN_TEXT_CHARS: usize = 20;
const DEFAULT_RATING: i16 = 5;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestimonialDraft {
    pub client_name: Option<String>,
    pub client_title: Option<String>,
    pub client_company: Option<String>,
    pub testimonial_text: Option<String>,
    pub client_image_url: Option<String>,
    pub rating: Option<i16>,
    pub case_type: Option<String>,
    pub is_featured: Option<bool>,
    pub is_active: Option<bool>,
    pub order_priority: Option<i32>,
}

#[derive(Clone)]
pub struct AdminTestimonialService {
    reader: Arc<dyn TestimonialsRepo>,
    writer: Arc<dyn TestimonialsWriteRepo>,
    audit: AdminAuditService,
}

impl AdminTestimonialService {
    pub fn new(
        reader: Arc<dyn TestimonialsRepo>,
        writer: Arc<dyn TestimonialsWriteRepo>,
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
        filter: &TestimonialQueryFilter,
    ) -> Result<Vec<TestimonialRecord>, AdminError> {
        Ok(self.reader.list_testimonials(scope, filter).await?)
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<TestimonialRecord>, AdminError> {
        Ok(self.reader.find_testimonial(id).await?)
    }

    async fn require(&self, id: Uuid) -> Result<TestimonialRecord, AdminError> {
        self.find(id)
            .await?
            .ok_or(AdminError::NotFound { entity: ENTITY })
    }

    pub async fn create(
        &self,
        actor: &str,
        draft: TestimonialDraft,
    ) -> Result<TestimonialRecord, AdminError> {
        let client_name = require_text(draft.client_name, "client_name")?;
        let testimonial_text = require_text(draft.testimonial_text, "testimonial_text")?;
        validate_text(&testimonial_text)?;
        let rating = draft.rating.unwrap_or(DEFAULT_RATING);
        validate_rating(rating)?;

        let params = TestimonialParams {
            client_name,
            client_title: optional_text(draft.client_title),
            client_company: optional_text(draft.client_company),
            testimonial_text,
            client_image_url: optional_text(draft.client_image_url),
            rating,
            case_type: optional_text(draft.case_type),
            is_featured: draft.is_featured.unwrap_or(false),
            is_active: draft.is_active.unwrap_or(true),
            order_priority: draft.order_priority.unwrap_or(0),
        };
        let record = self.writer.create_testimonial(params).await?;
        self.record_audit(actor, "testimonial.create", &record)
            .await?;
        Ok(record)
    }

    pub async fn update(
        &self,
        actor: &str,
        id: Uuid,
        draft: TestimonialDraft,
    ) -> Result<TestimonialRecord, AdminError> {
        let existing = self.require(id).await?;

        let testimonial_text = merge_text(
            draft.testimonial_text,
            existing.testimonial_text,
            "testimonial_text",
        )?;
        validate_text(&testimonial_text)?;
        let rating = draft.rating.unwrap_or(existing.rating);
        validate_rating(rating)?;

        let params = TestimonialParams {
            client_name: merge_text(draft.client_name, existing.client_name, "client_name")?,
            client_title: merge_optional(draft.client_title, existing.client_title),
            client_company: merge_optional(draft.client_company, existing.client_company),
            testimonial_text,
            client_image_url: merge_optional(draft.client_image_url, existing.client_image_url),
            rating,
            case_type: merge_optional(draft.case_type, existing.case_type),
            is_featured: draft.is_featured.unwrap_or(existing.is_featured),
            is_active: draft.is_active.unwrap_or(existing.is_active),
            order_priority: draft.order_priority.unwrap_or(existing.order_priority),
        };
        let record = self.writer.update_testimonial(id, params).await?;
        self.record_audit(actor, "testimonial.update", &record)
            .await?;
        Ok(record)
    }

    pub async fn delete(&self, actor: &str, id: Uuid) -> Result<(), AdminError> {
        let existing = self.require(id).await?;
        self.writer.delete_testimonial(id).await?;
        self.record_audit(actor, "testimonial.delete", &existing)
            .await?;
        Ok(())
    }

    async fn record_audit(
        &self,
        actor: &str,
        action: &str,
        record: &TestimonialRecord,
    ) -> Result<(), AdminError> {
        let snapshot = ItemSnapshot {
            slug: None,
            label: record.client_name.as_str(),
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

fn validate_rating(rating: i16) -> Result<(), AdminError> {
    if (1..=5).contains(&rating) {
        Ok(())
    } else {
        Err(AdminError::invalid(
            "rating",
            "Rating must be between 1 and 5",
        ))
    }
}

fn validate_text(text: &str) -> Result<(), AdminError> {
    if text.chars().count() < MIN_TEXT_CHARS {
        return Err(AdminError::invalid(
            "testimonial_text",
            format!("Testimonial must be at least {MIN_TEXT_CHARS} characters"),
        ));
    }
    Ok(())
}
