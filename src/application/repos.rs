//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Date, OffsetDateTime, Time};
use uuid::Uuid;

use crate::domain::bookings::BookingStatus;
use crate::domain::entities::{
    AssociateRecord, AuditLogRecord, AuthTokenRecord, BlogPostRecord, BookingRecord,
    CategoryRecord, ConsultationServiceRecord, ContactRecord, GrantRecord, StaffCredentials,
    StaffUserRecord, TestimonialRecord,
};
use crate::domain::ordering::{CollectionVersion, ReorderItem};
use crate::domain::resources::ResourceKind;
use crate::domain::types::{
    ContactStatus, Currency, GrantStatus, GrantType, ServiceCategory, TokenKind,
};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("collection changed; current version is {current}")]
    VersionConflict { current: CollectionVersion },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}

/// Which audience a listing is produced for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListScope {
    /// Only items visible on the public site (active, published).
    Public,
    Admin,
}

// ---- Collection ordering ----

#[async_trait]
pub trait CollectionOrderRepo: Send + Sync {
    async fn current_version(&self, kind: ResourceKind) -> Result<CollectionVersion, RepoError>;

    /// Atomically write every priority and bump the collection version once.
    ///
    /// Fails with [`RepoError::VersionConflict`] when `base_version` is given and stale,
    /// and with [`RepoError::InvalidInput`] when an id does not belong to the collection.
    async fn reorder(
        &self,
        kind: ResourceKind,
        items: &[ReorderItem],
        base_version: Option<CollectionVersion>,
    ) -> Result<CollectionVersion, RepoError>;
}

// ---- Associates ----

#[derive(Debug, Clone, Default)]
pub struct AssociateQueryFilter {
    pub search: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct AssociateParams {
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
}

#[async_trait]
pub trait AssociatesRepo: Send + Sync {
    async fn list_associates(
        &self,
        scope: ListScope,
        filter: &AssociateQueryFilter,
    ) -> Result<Vec<AssociateRecord>, RepoError>;

    async fn find_associate(&self, id: Uuid) -> Result<Option<AssociateRecord>, RepoError>;

    async fn find_associate_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<AssociateRecord>, RepoError>;
}

#[async_trait]
pub trait AssociatesWriteRepo: Send + Sync {
    async fn create_associate(&self, params: AssociateParams) -> Result<AssociateRecord, RepoError>;

    async fn update_associate(
        &self,
        id: Uuid,
        params: AssociateParams,
    ) -> Result<AssociateRecord, RepoError>;

    async fn delete_associate(&self, id: Uuid) -> Result<(), RepoError>;
}

// ---- Categories ----

#[derive(Debug, Clone, Default)]
pub struct CategoryQueryFilter {
    pub search: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CategoryParams {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub order_priority: i32,
}

#[async_trait]
pub trait CategoriesRepo: Send + Sync {
    async fn list_categories(
        &self,
        filter: &CategoryQueryFilter,
    ) -> Result<Vec<CategoryRecord>, RepoError>;

    async fn find_category(&self, id: Uuid) -> Result<Option<CategoryRecord>, RepoError>;

    async fn find_category_by_slug(&self, slug: &str)
    -> Result<Option<CategoryRecord>, RepoError>;

    async fn find_category_by_name(&self, name: &str)
    -> Result<Option<CategoryRecord>, RepoError>;
}

#[async_trait]
pub trait CategoriesWriteRepo: Send + Sync {
    async fn create_category(&self, params: CategoryParams) -> Result<CategoryRecord, RepoError>;

    async fn update_category(
        &self,
        id: Uuid,
        params: CategoryParams,
    ) -> Result<CategoryRecord, RepoError>;

    async fn delete_category(&self, id: Uuid) -> Result<(), RepoError>;
}

// ---- Blog posts ----

#[derive(Debug, Clone, Default)]
pub struct BlogQueryFilter {
    pub search: Option<String>,
    /// Category slug.
    pub category: Option<String>,
    pub is_featured: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct BlogPostParams {
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub content: String,
    pub category_ids: Vec<Uuid>,
    pub featured_image_url: Option<String>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    pub is_published: bool,
    pub is_featured: bool,
    pub order_priority: i32,
    pub publish_date: Option<OffsetDateTime>,
}

#[async_trait]
pub trait BlogsRepo: Send + Sync {
    async fn list_blogs(
        &self,
        scope: ListScope,
        filter: &BlogQueryFilter,
    ) -> Result<Vec<BlogPostRecord>, RepoError>;

    async fn find_blog(&self, id: Uuid) -> Result<Option<BlogPostRecord>, RepoError>;

    async fn find_blog_by_slug(&self, slug: &str) -> Result<Option<BlogPostRecord>, RepoError>;
}

#[async_trait]
pub trait BlogsWriteRepo: Send + Sync {
    async fn create_blog(
        &self,
        author_id: Uuid,
        params: BlogPostParams,
    ) -> Result<BlogPostRecord, RepoError>;

    async fn update_blog(
        &self,
        id: Uuid,
        params: BlogPostParams,
    ) -> Result<BlogPostRecord, RepoError>;

    async fn delete_blog(&self, id: Uuid) -> Result<(), RepoError>;

    async fn increment_view_count(&self, id: Uuid) -> Result<(), RepoError>;
}

// ---- Testimonials ----

#[derive(Debug, Clone, Default)]
pub struct TestimonialQueryFilter {
    pub search: Option<String>,
    pub is_featured: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct TestimonialParams {
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
}

#[async_trait]
pub trait TestimonialsRepo: Send + Sync {
    async fn list_testimonials(
        &self,
        scope: ListScope,
        filter: &TestimonialQueryFilter,
    ) -> Result<Vec<TestimonialRecord>, RepoError>;

    async fn find_testimonial(&self, id: Uuid) -> Result<Option<TestimonialRecord>, RepoError>;
}

#[async_trait]
pub trait TestimonialsWriteRepo: Send + Sync {
    async fn create_testimonial(
        &self,
        params: TestimonialParams,
    ) -> Result<TestimonialRecord, RepoError>;

    async fn update_testimonial(
        &self,
        id: Uuid,
        params: TestimonialParams,
    ) -> Result<TestimonialRecord, RepoError>;

    async fn delete_testimonial(&self, id: Uuid) -> Result<(), RepoError>;
}

// ---- Grants ----

#[derive(Debug, Clone, Default)]
pub struct GrantQueryFilter {
    pub search: Option<String>,
    pub grant_type: Option<GrantType>,
    pub status: Option<GrantStatus>,
    pub is_featured: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct GrantParams {
    pub title: String,
    pub slug: String,
    pub grant_type: GrantType,
    pub amount: Option<i64>,
    pub currency: Currency,
    pub short_description: String,
    pub full_description: Option<String>,
    pub target_audience: Option<String>,
    pub application_deadline: Option<Date>,
    pub announcement_date: Option<Date>,
    pub status: GrantStatus,
    pub eligibility_criteria: Vec<String>,
    pub requirements: Vec<String>,
    pub guidelines: Vec<String>,
    pub target_institutions: Vec<String>,
    pub is_featured: bool,
    pub is_active: bool,
    pub order_priority: i32,
}

#[async_trait]
pub trait GrantsRepo: Send + Sync {
    async fn list_grants(
        &self,
        scope: ListScope,
        filter: &GrantQueryFilter,
    ) -> Result<Vec<GrantRecord>, RepoError>;

    async fn find_grant(&self, id: Uuid) -> Result<Option<GrantRecord>, RepoError>;

    async fn find_grant_by_slug(&self, slug: &str) -> Result<Option<GrantRecord>, RepoError>;
}

#[async_trait]
pub trait GrantsWriteRepo: Send + Sync {
    async fn create_grant(&self, params: GrantParams) -> Result<GrantRecord, RepoError>;

    async fn update_grant(&self, id: Uuid, params: GrantParams) -> Result<GrantRecord, RepoError>;

    async fn delete_grant(&self, id: Uuid) -> Result<(), RepoError>;
}

// ---- Consultation services ----

#[derive(Debug, Clone, Default)]
pub struct ServiceQueryFilter {
    pub search: Option<String>,
    pub category: Option<ServiceCategory>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct ServiceParams {
    pub name: String,
    pub slug: String,
    pub description: String,
    pub short_description: Option<String>,
    pub category: ServiceCategory,
    pub price: i64,
    pub currency: Currency,
    pub duration_minutes: i32,
    pub icon_name: Option<String>,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub is_featured: bool,
    pub order_priority: i32,
}

#[async_trait]
pub trait ServicesRepo: Send + Sync {
    async fn list_services(
        &self,
        scope: ListScope,
        filter: &ServiceQueryFilter,
    ) -> Result<Vec<ConsultationServiceRecord>, RepoError>;

    async fn find_service(
        &self,
        id: Uuid,
    ) -> Result<Option<ConsultationServiceRecord>, RepoError>;

    async fn find_service_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<ConsultationServiceRecord>, RepoError>;
}

#[async_trait]
pub trait ServicesWriteRepo: Send + Sync {
    async fn create_service(
        &self,
        params: ServiceParams,
    ) -> Result<ConsultationServiceRecord, RepoError>;

    async fn update_service(
        &self,
        id: Uuid,
        params: ServiceParams,
    ) -> Result<ConsultationServiceRecord, RepoError>;

    async fn delete_service(&self, id: Uuid) -> Result<(), RepoError>;
}

// ---- Bookings ----

#[derive(Debug, Clone, Default)]
pub struct BookingQueryFilter {
    pub search: Option<String>,
    pub status: Option<BookingStatus>,
    pub date_from: Option<Date>,
    pub date_to: Option<Date>,
    pub service_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct NewBookingParams {
    pub reference: String,
    pub service_id: Option<Uuid>,
    pub custom_service_description: String,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: String,
    pub client_company: String,
    pub preferred_date: Date,
    pub preferred_time: Time,
    pub notes: String,
    pub amount: i64,
    pub currency: Currency,
}

#[derive(Debug, Clone)]
pub struct PaymentConfirmation {
    pub channel: Option<String>,
    pub verified_at: OffsetDateTime,
}

/// Admin update; `None` leaves a field untouched.
///
/// A status change is only written while the stored status still equals
/// `StatusChange::from`; otherwise `update_booking` reports `RepoError::NotFound`.
#[derive(Debug, Clone, Default)]
pub struct BookingAdminUpdate {
    pub status: Option<StatusChange>,
    pub admin_notes: Option<String>,
    pub assigned_associate_id: Option<Option<Uuid>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub from: BookingStatus,
    pub to: BookingStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: BookingStatus,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePopularity {
    pub service_name: String,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingTotals {
    pub total: u64,
    pub paid: u64,
    /// Sum of verified booking amounts in minor units.
    pub revenue: i64,
    pub pending_confirmations: u64,
    pub status_breakdown: Vec<StatusCount>,
    pub popular_services: Vec<ServicePopularity>,
}

#[async_trait]
pub trait BookingsRepo: Send + Sync {
    async fn create_booking(&self, params: NewBookingParams) -> Result<BookingRecord, RepoError>;

    async fn attach_gateway_session(
        &self,
        id: Uuid,
        gateway_reference: &str,
        access_code: &str,
    ) -> Result<BookingRecord, RepoError>;

    async fn delete_booking(&self, id: Uuid) -> Result<(), RepoError>;

    async fn find_booking(&self, id: Uuid) -> Result<Option<BookingRecord>, RepoError>;

    async fn find_booking_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<BookingRecord>, RepoError>;

    async fn list_bookings(
        &self,
        filter: &BookingQueryFilter,
    ) -> Result<Vec<BookingRecord>, RepoError>;

    async fn mark_paid(
        &self,
        id: Uuid,
        confirmation: PaymentConfirmation,
    ) -> Result<BookingRecord, RepoError>;

    async fn update_booking(
        &self,
        id: Uuid,
        update: BookingAdminUpdate,
    ) -> Result<BookingRecord, RepoError>;

    async fn booking_totals(&self, popular_limit: u32) -> Result<BookingTotals, RepoError>;
}

// ---- Contacts ----

#[derive(Debug, Clone, Default)]
pub struct ContactQueryFilter {
    pub status: Option<ContactStatus>,
    pub search: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewContactParams {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: String,
    pub message: String,
}

#[async_trait]
pub trait ContactsRepo: Send + Sync {
    async fn create_contact(&self, params: NewContactParams) -> Result<ContactRecord, RepoError>;

    async fn list_contacts(
        &self,
        filter: &ContactQueryFilter,
    ) -> Result<Vec<ContactRecord>, RepoError>;

    async fn find_contact(&self, id: Uuid) -> Result<Option<ContactRecord>, RepoError>;

    async fn update_contact_status(
        &self,
        id: Uuid,
        status: ContactStatus,
    ) -> Result<ContactRecord, RepoError>;

    async fn delete_contact(&self, id: Uuid) -> Result<(), RepoError>;
}

// ---- Dashboard ----

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardCounts {
    pub total_blogs: u64,
    pub published_blogs: u64,
    pub draft_blogs: u64,
    pub total_associates: u64,
    pub active_associates: u64,
    pub total_contacts: u64,
    pub unread_contacts: u64,
    pub total_views: u64,
    pub total_testimonials: u64,
    pub active_testimonials: u64,
    pub total_grants: u64,
    pub active_grants: u64,
    pub total_bookings: u64,
    pub paid_bookings: u64,
    pub consultation_revenue: i64,
    pub pending_confirmations: u64,
}

/// Published posts sharing one UTC publish day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishDayActivity {
    pub date: Date,
    pub posts: u64,
    pub views: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryPostCount {
    pub category: String,
    pub posts: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactStatusCount {
    pub status: ContactStatus,
    pub count: u64,
}

#[async_trait]
pub trait DashboardRepo: Send + Sync {
    async fn dashboard_counts(&self) -> Result<DashboardCounts, RepoError>;

    /// Published posts with `since <= publish_date <= until`, grouped by day, oldest first.
    async fn publish_activity(
        &self,
        since: OffsetDateTime,
        until: OffsetDateTime,
    ) -> Result<Vec<PublishDayActivity>, RepoError>;

    /// Categories with at least one published post, busiest first.
    async fn published_posts_by_category(&self) -> Result<Vec<CategoryPostCount>, RepoError>;

    async fn contacts_by_status(&self) -> Result<Vec<ContactStatusCount>, RepoError>;
}

// ---- Staff users and session tokens ----

#[derive(Debug, Clone)]
pub struct NewStaffUserParams {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_superuser: bool,
    pub password_salt: Vec<u8>,
    pub password_hash: Vec<u8>,
}

#[async_trait]
pub trait StaffUsersRepo: Send + Sync {
    async fn create_user(&self, params: NewStaffUserParams) -> Result<StaffUserRecord, RepoError>;

    async fn find_credentials(
        &self,
        username: &str,
    ) -> Result<Option<StaffCredentials>, RepoError>;

    async fn find_user(&self, id: Uuid) -> Result<Option<StaffUserRecord>, RepoError>;
}

#[derive(Debug, Clone)]
pub struct NewAuthTokenParams {
    pub user_id: Uuid,
    pub kind: TokenKind,
    pub prefix: String,
    pub hashed_secret: Vec<u8>,
    pub expires_at: OffsetDateTime,
}

#[async_trait]
pub trait AuthTokensRepo: Send + Sync {
    async fn insert_token(&self, params: NewAuthTokenParams)
    -> Result<AuthTokenRecord, RepoError>;

    async fn find_token_by_prefix(
        &self,
        prefix: &str,
    ) -> Result<Option<AuthTokenRecord>, RepoError>;

    async fn revoke_token(&self, id: Uuid, revoked_at: OffsetDateTime) -> Result<(), RepoError>;

    async fn touch_token(&self, id: Uuid, used_at: OffsetDateTime) -> Result<(), RepoError>;
}

// ---- Audit ----

#[async_trait]
pub trait AuditRepo: Send + Sync {
    async fn append_log(&self, record: AuditLogRecord) -> Result<(), RepoError>;

    async fn list_recent(&self, limit: u32) -> Result<Vec<AuditLogRecord>, RepoError>;
}
