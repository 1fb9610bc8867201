//! Domain entities mirrored from persistent storage.
//!
//! Records serialize to the JSON shapes served by the API and deserialize back on the
//! client side, so derived fields (formatted amounts, read time) travel with them.

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime, Time};
use uuid::Uuid;

use crate::domain::bookings::BookingStatus;
use crate::domain::formats::{clock_time, iso_date};
use crate::domain::ordering::{FilterableItem, OrderedItem};
use crate::domain::types::{
    ActivityFilter, ContactStatus, Currency, GrantStatus, GrantType, PublicationFilter,
    ServiceCategory, TokenKind,
};

const WORDS_PER_MINUTE: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociateRecord {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub title: String,
    pub bio: String,
    pub expertise: Vec<String>,
    pub image_url: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub linkedin_url: Option<String>,
    pub twitter_url: Option<String>,
    pub order_priority: i32,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub order_priority: i32,
    #[serde(default)]
    pub blog_count: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlogPostRecord {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub content: String,
    pub author: String,
    pub categories: Vec<CategorySummary>,
    pub featured_image_url: Option<String>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    pub is_published: bool,
    pub is_featured: bool,
    pub order_priority: i32,
    pub view_count: i64,
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub publish_date: Option<OffsetDateTime>,
    pub read_time_minutes: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Estimated reading time: one minute per 200 words, never below one.
pub fn read_time_minutes(content: &str) -> u32 {
    let words = content.split_whitespace().count();
    u32::try_from((words / WORDS_PER_MINUTE).max(1)).unwrap_or(u32::MAX)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestimonialRecord {
    pub id: Uuid,
    pub client_name: String,
    pub client_title: Option<String>,
    pub client_company: Option<String>,
    pub testimonial_text: String,
    pub client_image_url: Option<String>,
    pub rating: i16,
    pub case_type: Option<String>,
    pub is_featured: bool,
    pub is_active: bool,
    pub order_priority: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrantRecord {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub grant_type: GrantType,
    pub amount: Option<i64>,
    pub currency: Currency,
    pub formatted_amount: Option<String>,
    pub short_description: String,
    pub full_description: Option<String>,
    pub target_audience: Option<String>,
    #[serde(with = "iso_date::option", default)]
    pub application_deadline: Option<Date>,
    #[serde(with = "iso_date::option", default)]
    pub announcement_date: Option<Date>,
    pub status: GrantStatus,
    pub eligibility_criteria: Vec<String>,
    pub requirements: Vec<String>,
    pub guidelines: Vec<String>,
    pub target_institutions: Vec<String>,
    pub is_featured: bool,
    pub is_active: bool,
    pub order_priority: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsultationServiceRecord {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub short_description: Option<String>,
    pub category: ServiceCategory,
    pub price: i64,
    pub currency: Currency,
    pub formatted_price: String,
    pub duration_minutes: i32,
    pub icon_name: Option<String>,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub is_featured: bool,
    pub order_priority: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRecord {
    pub id: Uuid,
    pub reference: String,
    pub service_id: Option<Uuid>,
    pub service_name: String,
    pub custom_service_description: String,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: String,
    pub client_company: String,
    #[serde(with = "iso_date")]
    pub preferred_date: Date,
    #[serde(with = "clock_time")]
    pub preferred_time: Time,
    pub notes: String,
    pub amount: i64,
    pub currency: Currency,
    pub formatted_amount: String,
    pub status: BookingStatus,
    pub payment_verified: bool,
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub payment_verified_at: Option<OffsetDateTime>,
    pub payment_channel: Option<String>,
    pub gateway_reference: Option<String>,
    pub gateway_access_code: Option<String>,
    pub admin_notes: String,
    pub assigned_associate_id: Option<Uuid>,
    pub assigned_associate_name: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Label shown for a booking's service.
pub fn booking_service_name(service_name: Option<&str>, custom_description: &str) -> String {
    match service_name {
        Some(name) => name.to_string(),
        None if custom_description.trim().is_empty() => "Custom consultation".to_string(),
        None => format!("Custom: {}", custom_description.trim()),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactRecord {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: String,
    pub message: String,
    pub status: ContactStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffUserRecord {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub date_joined: OffsetDateTime,
}

impl StaffUserRecord {
    pub fn is_back_office(&self) -> bool {
        self.is_staff || self.is_superuser
    }
}

/// Stored password material for a staff user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaffCredentials {
    pub user: StaffUserRecord,
    pub password_salt: Vec<u8>,
    pub password_hash: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthTokenRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: TokenKind,
    pub prefix: String,
    pub hashed_secret: Vec<u8>,
    pub expires_at: OffsetDateTime,
    pub revoked_at: Option<OffsetDateTime>,
    pub last_used_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogRecord {
    pub id: Uuid,
    pub actor: String,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub payload_text: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

macro_rules! ordered {
    ($($record:ty),+ $(,)?) => {
        $(
            impl OrderedItem for $record {
                fn id(&self) -> Uuid {
                    self.id
                }

                fn order_priority(&self) -> i32 {
                    self.order_priority
                }
            }
        )+
    };
}

ordered!(
    AssociateRecord,
    CategoryRecord,
    BlogPostRecord,
    TestimonialRecord,
    GrantRecord,
    ConsultationServiceRecord,
);

impl FilterableItem for AssociateRecord {
    type Status = ActivityFilter;

    fn matches_status(&self, status: &ActivityFilter) -> bool {
        status.matches(self.is_active)
    }
}

impl FilterableItem for CategoryRecord {
    type Status = std::convert::Infallible;

    fn matches_status(&self, status: &std::convert::Infallible) -> bool {
        match *status {}
    }
}

impl FilterableItem for BlogPostRecord {
    type Status = PublicationFilter;

    fn matches_status(&self, status: &PublicationFilter) -> bool {
        status.matches(self.is_published)
    }

    fn matches_category(&self, category: &str) -> bool {
        self.categories.iter().any(|entry| entry.slug == category)
    }
}

impl FilterableItem for TestimonialRecord {
    type Status = ActivityFilter;

    fn matches_status(&self, status: &ActivityFilter) -> bool {
        status.matches(self.is_active)
    }
}

impl FilterableItem for GrantRecord {
    type Status = GrantStatus;

    fn matches_status(&self, status: &GrantStatus) -> bool {
        self.status == *status
    }

    fn matches_category(&self, category: &str) -> bool {
        self.grant_type.as_str() == category
    }
}

impl FilterableItem for ConsultationServiceRecord {
    type Status = ActivityFilter;

    fn matches_status(&self, status: &ActivityFilter) -> bool {
        status.matches(self.is_active)
    }

    fn matches_category(&self, category: &str) -> bool {
        self.category.as_str() == category
    }
}
