use std::sync::Arc;

use async_trait::async_trait;

use crate::application::admin::associates::AdminAssociateService;
use crate::application::admin::blogs::AdminBlogService;
use crate::application::admin::categories::AdminCategoryService;
use crate::application::admin::grants::AdminGrantService;
use crate::application::admin::services::AdminServiceCatalog;
use crate::application::admin::testimonials::AdminTestimonialService;
use crate::application::admin::audit::AdminAuditService;
use crate::application::auth::{AuthService, SessionPolicy, StaffPrincipal};
use crate::application::bookings::{BookingPolicy, BookingService};
use crate::application::contacts::ContactService;
use crate::application::dashboard::DashboardService;
use crate::application::payments::PaymentGateway;
use crate::application::reorder::ReorderService;
use crate::application::repos::{
    AssociatesRepo, AssociatesWriteRepo, AuditRepo, AuthTokensRepo, BlogsRepo, BlogsWriteRepo,
    BookingsRepo, CategoriesRepo, CategoriesWriteRepo, CollectionOrderRepo, ContactsRepo,
    DashboardRepo, GrantsRepo, GrantsWriteRepo, ServicesRepo, ServicesWriteRepo,
    StaffUsersRepo, TestimonialsRepo, TestimonialsWriteRepo,
};
use crate::infra::db::PostgresRepositories;

use super::rate_limit::ApiRateLimiter;

/// Liveness probe for the backing store.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn check(&self) -> Result<(), String>;
}

#[async_trait]
impl HealthProbe for PostgresRepositories {
    async fn check(&self) -> Result<(), String> {
        self.health_check().await.map_err(|err| err.to_string())
    }
}

/// Every store the API needs, implemented by one backend.
pub trait ApiRepositories:
    CollectionOrderRepo
    + AssociatesRepo
    + AssociatesWriteRepo
    + CategoriesRepo
    + CategoriesWriteRepo
    + BlogsRepo
    + BlogsWriteRepo
    + TestimonialsRepo
    + TestimonialsWriteRepo
    + GrantsRepo
    + GrantsWriteRepo
    + ServicesRepo
    + ServicesWriteRepo
    + BookingsRepo
    + ContactsRepo
    + DashboardRepo
    + StaffUsersRepo
    + AuthTokensRepo
    + AuditRepo
    + HealthProbe
    + 'static
{
}

impl<R> ApiRepositories for R where
    R: CollectionOrderRepo
        + AssociatesRepo
        + AssociatesWriteRepo
        + CategoriesRepo
        + CategoriesWriteRepo
        + BlogsRepo
        + BlogsWriteRepo
        + TestimonialsRepo
        + TestimonialsWriteRepo
        + GrantsRepo
        + GrantsWriteRepo
        + ServicesRepo
        + ServicesWriteRepo
        + BookingsRepo
        + ContactsRepo
        + DashboardRepo
        + StaffUsersRepo
        + AuthTokensRepo
        + AuditRepo
        + HealthProbe
        + 'static
{
}

/// Policies and limits that shape the assembled services.
#[derive(Debug, Clone)]
pub struct ApiPolicies {
    pub session: SessionPolicy,
    pub booking: BookingPolicy,
}

#[derive(Clone)]
pub struct ApiState {
    pub auth: Arc<AuthService>,
    pub associates: Arc<AdminAssociateService>,
    pub categories: Arc<AdminCategoryService>,
    pub blogs: Arc<AdminBlogService>,
    pub testimonials: Arc<AdminTestimonialService>,
    pub grants: Arc<AdminGrantService>,
    pub services: Arc<AdminServiceCatalog>,
    pub reorder: Arc<ReorderService>,
    pub bookings: Arc<BookingService>,
    pub contacts: Arc<ContactService>,
    pub dashboard: Arc<DashboardService>,
    pub health: Arc<dyn HealthProbe>,
    pub rate_limiter: Arc<ApiRateLimiter>,
}

impl ApiState {
    /// Wire every service against a single repository backend.
    pub fn assemble<R: ApiRepositories>(
        repos: Arc<R>,
        gateway: Arc<dyn PaymentGateway>,
        policies: ApiPolicies,
        rate_limiter: ApiRateLimiter,
    ) -> Self {
        let audit = AdminAuditService::new(repos.clone());
        Self {
            auth: Arc::new(AuthService::new(
                repos.clone(),
                repos.clone(),
                policies.session,
            )),
            associates: Arc::new(AdminAssociateService::new(
                repos.clone(),
                repos.clone(),
                audit.clone(),
            )),
            categories: Arc::new(AdminCategoryService::new(
                repos.clone(),
                repos.clone(),
                audit.clone(),
            )),
            blogs: Arc::new(AdminBlogService::new(
                repos.clone(),
                repos.clone(),
                repos.clone(),
                audit.clone(),
            )),
            testimonials: Arc::new(AdminTestimonialService::new(
                repos.clone(),
                repos.clone(),
                audit.clone(),
            )),
            grants: Arc::new(AdminGrantService::new(
                repos.clone(),
                repos.clone(),
                audit.clone(),
            )),
            services: Arc::new(AdminServiceCatalog::new(
                repos.clone(),
                repos.clone(),
                audit.clone(),
            )),
            reorder: Arc::new(ReorderService::new(repos.clone(), audit.clone())),
            bookings: Arc::new(BookingService::new(
                repos.clone(),
                repos.clone(),
                repos.clone(),
                gateway,
                audit.clone(),
                policies.booking,
            )),
            contacts: Arc::new(ContactService::new(repos.clone(), audit.clone())),
            dashboard: Arc::new(DashboardService::new(repos.clone(), audit)),
            health: repos,
            rate_limiter: Arc::new(rate_limiter),
        }
    }

    pub fn actor_label(principal: &StaffPrincipal) -> String {
        format!("staff:{}", principal.username)
    }
}
