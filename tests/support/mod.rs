//! In-memory backend and gateway used by the router tests.
#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use time::{OffsetDateTime, UtcOffset};
use tower::ServiceExt;
use uuid::Uuid;

use lightfield::application::auth::{NewStaffUser, SessionPolicy};
use lightfield::application::bookings::BookingPolicy;
use lightfield::application::payments::{
    GatewayError, PaymentGateway, PaymentInit, PaymentSession, PaymentVerification,
};
use lightfield::application::repos::*;
use lightfield::domain::bookings::BookingStatus;
use lightfield::domain::entities::*;
use lightfield::domain::ordering::{CollectionVersion, ReorderItem};
use lightfield::domain::resources::ResourceKind;
use lightfield::domain::types::{ContactStatus, Currency, ServiceCategory};
use lightfield::infra::http::{ApiPolicies, ApiRateLimiter, ApiState, HealthProbe, build_router};

pub const STAFF_USERNAME: &str = "admin";
pub const STAFF_PASSWORD: &str = "correct horse battery";

#[derive(Default)]
struct Inner {
    versions: HashMap<ResourceKind, u64>,
    associates: Vec<AssociateRecord>,
    categories: Vec<CategoryRecord>,
    blogs: Vec<BlogPostRecord>,
    testimonials: Vec<TestimonialRecord>,
    grants: Vec<GrantRecord>,
    services: Vec<ConsultationServiceRecord>,
    bookings: Vec<BookingRecord>,
    contacts: Vec<ContactRecord>,
    users: Vec<StaffCredentials>,
    tokens: Vec<AuthTokenRecord>,
    audit: Vec<AuditLogRecord>,
}

impl Inner {
    fn bump(&mut self, kind: ResourceKind) {
        *self.versions.entry(kind).or_default() += 1;
    }

    fn version(&self, kind: ResourceKind) -> CollectionVersion {
        CollectionVersion(self.versions.get(&kind).copied().unwrap_or_default())
    }

    fn ids(&self, kind: ResourceKind) -> Vec<Uuid> {
        match kind {
            ResourceKind::Associates => self.associates.iter().map(|r| r.id).collect(),
            ResourceKind::Categories => self.categories.iter().map(|r| r.id).collect(),
            ResourceKind::Blogs => self.blogs.iter().map(|r| r.id).collect(),
            ResourceKind::Testimonials => self.testimonials.iter().map(|r| r.id).collect(),
            ResourceKind::Grants => self.grants.iter().map(|r| r.id).collect(),
            ResourceKind::ConsultationServices => self.services.iter().map(|r| r.id).collect(),
        }
    }

    fn set_priority(&mut self, kind: ResourceKind, id: Uuid, priority: i32) {
        let slot = match kind {
            ResourceKind::Associates => self
                .associates
                .iter_mut()
                .find(|r| r.id == id)
                .map(|r| &mut r.order_priority),
            ResourceKind::Categories => self
                .categories
                .iter_mut()
                .find(|r| r.id == id)
                .map(|r| &mut r.order_priority),
            ResourceKind::Blogs => self
                .blogs
                .iter_mut()
                .find(|r| r.id == id)
                .map(|r| &mut r.order_priority),
            ResourceKind::Testimonials => self
                .testimonials
                .iter_mut()
                .find(|r| r.id == id)
                .map(|r| &mut r.order_priority),
            ResourceKind::Grants => self
                .grants
                .iter_mut()
                .find(|r| r.id == id)
                .map(|r| &mut r.order_priority),
            ResourceKind::ConsultationServices => self
                .services
                .iter_mut()
                .find(|r| r.id == id)
                .map(|r| &mut r.order_priority),
        };
        if let Some(slot) = slot {
            *slot = priority;
        }
    }
}

fn matches(search: Option<&String>, fields: &[&str]) -> bool {
    search.is_none_or(|needle| {
        let needle = needle.trim().to_lowercase();
        needle.is_empty()
            || fields
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
    })
}

fn sort_ordered<T>(items: &mut [T], key: impl Fn(&T) -> (i32, OffsetDateTime)) {
    items.sort_by(|a, b| {
        let (pa, ca) = key(a);
        let (pb, cb) = key(b);
        pa.cmp(&pb).then(cb.cmp(&ca))
    });
}

/// Single in-memory backend implementing every repository port.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn version(&self, kind: ResourceKind) -> CollectionVersion {
        self.lock().version(kind)
    }

    pub fn audit_actions(&self) -> Vec<String> {
        self.lock().audit.iter().map(|r| r.action.clone()).collect()
    }

    pub fn associate_priorities(&self) -> Vec<(Uuid, i32)> {
        self.lock()
            .associates
            .iter()
            .map(|r| (r.id, r.order_priority))
            .collect()
    }

    pub fn booking_count(&self) -> usize {
        self.lock().bookings.len()
    }

    pub fn seed_blog(
        &self,
        title: &str,
        publish_date: Option<OffsetDateTime>,
        view_count: i64,
        categories: &[&str],
    ) -> Uuid {
        let now = OffsetDateTime::now_utc();
        let id = Uuid::new_v4();
        let slug = title.to_lowercase().replace(' ', "-");
        self.lock().blogs.push(BlogPostRecord {
            id,
            title: title.to_string(),
            slug: slug.clone(),
            excerpt: format!("{title} excerpt"),
            content: format!("{title} body"),
            author: "admin".into(),
            categories: categories
                .iter()
                .map(|name| CategorySummary {
                    id: Uuid::new_v4(),
                    name: (*name).to_string(),
                    slug: name.to_lowercase().replace(' ', "-"),
                })
                .collect(),
            featured_image_url: None,
            meta_description: None,
            meta_keywords: None,
            is_published: publish_date.is_some(),
            is_featured: false,
            order_priority: 0,
            view_count,
            publish_date,
            read_time_minutes: 1,
            created_at: now,
            updated_at: now,
        });
        id
    }

    pub fn seed_service(&self, name: &str, price: i64, is_active: bool) -> Uuid {
        let now = OffsetDateTime::now_utc();
        let id = Uuid::new_v4();
        self.lock().services.push(ConsultationServiceRecord {
            id,
            name: name.to_string(),
            slug: name.to_lowercase().replace(' ', "-"),
            description: format!("{name} advisory"),
            short_description: None,
            category: ServiceCategory::AiLaw,
            price,
            currency: Currency::Ngn,
            formatted_price: Currency::Ngn.format_minor(price),
            duration_minutes: 60,
            icon_name: None,
            image_url: None,
            is_active,
            is_featured: false,
            order_priority: 0,
            created_at: now,
            updated_at: now,
        });
        id
    }
}

#[async_trait]
impl HealthProbe for MemoryStore {
    async fn check(&self) -> Result<(), String> {
        Ok(())
    }
}

#[async_trait]
impl CollectionOrderRepo for MemoryStore {
    async fn current_version(&self, kind: ResourceKind) -> Result<CollectionVersion, RepoError> {
        Ok(self.lock().version(kind))
    }

    async fn reorder(
        &self,
        kind: ResourceKind,
        items: &[ReorderItem],
        base_version: Option<CollectionVersion>,
    ) -> Result<CollectionVersion, RepoError> {
        let mut inner = self.lock();
        let current = inner.version(kind);
        if base_version.is_some_and(|base| base != current) {
            return Err(RepoError::VersionConflict { current });
        }
        if items.is_empty() {
            return Ok(current);
        }
        let known = inner.ids(kind);
        if items.iter().any(|item| !known.contains(&item.id)) {
            return Err(RepoError::invalid_input(
                "One or more items do not belong to this collection",
            ));
        }
        for item in items {
            inner.set_priority(kind, item.id, item.order_priority);
        }
        inner.bump(kind);
        Ok(inner.version(kind))
    }
}

fn associate_from(id: Uuid, params: AssociateParams, created_at: OffsetDateTime) -> AssociateRecord {
    AssociateRecord {
        id,
        name: params.name,
        slug: params.slug,
        title: params.title,
        bio: params.bio,
        expertise: params.expertise,
        image_url: params.image_url,
        email: params.email,
        phone: params.phone,
        linkedin_url: params.linkedin_url,
        twitter_url: params.twitter_url,
        order_priority: params.order_priority,
        is_active: params.is_active,
        created_at,
        updated_at: OffsetDateTime::now_utc(),
    }
}

#[async_trait]
impl AssociatesRepo for MemoryStore {
    async fn list_associates(
        &self,
        scope: ListScope,
        filter: &AssociateQueryFilter,
    ) -> Result<Vec<AssociateRecord>, RepoError> {
        let mut rows: Vec<_> = self
            .lock()
            .associates
            .iter()
            .filter(|r| scope == ListScope::Admin || r.is_active)
            .filter(|r| filter.is_active.is_none_or(|active| r.is_active == active))
            .filter(|r| matches(filter.search.as_ref(), &[&r.name, &r.title, &r.bio]))
            .cloned()
            .collect();
        sort_ordered(&mut rows, |r| (r.order_priority, r.created_at));
        Ok(rows)
    }

    async fn find_associate(&self, id: Uuid) -> Result<Option<AssociateRecord>, RepoError> {
        Ok(self.lock().associates.iter().find(|r| r.id == id).cloned())
    }

    async fn find_associate_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<AssociateRecord>, RepoError> {
        Ok(self
            .lock()
            .associates
            .iter()
            .find(|r| r.slug == slug)
            .cloned())
    }
}

#[async_trait]
impl AssociatesWriteRepo for MemoryStore {
    async fn create_associate(&self, params: AssociateParams) -> Result<AssociateRecord, RepoError> {
        let mut inner = self.lock();
        let record = associate_from(Uuid::new_v4(), params, OffsetDateTime::now_utc());
        inner.associates.push(record.clone());
        inner.bump(ResourceKind::Associates);
        Ok(record)
    }

    async fn update_associate(
        &self,
        id: Uuid,
        params: AssociateParams,
    ) -> Result<AssociateRecord, RepoError> {
        let mut inner = self.lock();
        let row = inner
            .associates
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(RepoError::NotFound)?;
        let moved = row.order_priority != params.order_priority;
        *row = associate_from(id, params, row.created_at);
        let record = row.clone();
        if moved {
            inner.bump(ResourceKind::Associates);
        }
        Ok(record)
    }

    async fn delete_associate(&self, id: Uuid) -> Result<(), RepoError> {
        let mut inner = self.lock();
        let before = inner.associates.len();
        inner.associates.retain(|r| r.id != id);
        if inner.associates.len() == before {
            return Err(RepoError::NotFound);
        }
        inner.bump(ResourceKind::Associates);
        Ok(())
    }
}

#[async_trait]
impl CategoriesRepo for MemoryStore {
    async fn list_categories(
        &self,
        filter: &CategoryQueryFilter,
    ) -> Result<Vec<CategoryRecord>, RepoError> {
        let mut rows: Vec<_> = self
            .lock()
            .categories
            .iter()
            .filter(|r| {
                matches(
                    filter.search.as_ref(),
                    &[&r.name, r.description.as_deref().unwrap_or_default()],
                )
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            a.order_priority
                .cmp(&b.order_priority)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(rows)
    }

    async fn find_category(&self, id: Uuid) -> Result<Option<CategoryRecord>, RepoError> {
        Ok(self.lock().categories.iter().find(|r| r.id == id).cloned())
    }

    async fn find_category_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<CategoryRecord>, RepoError> {
        Ok(self
            .lock()
            .categories
            .iter()
            .find(|r| r.slug == slug)
            .cloned())
    }

    async fn find_category_by_name(
        &self,
        name: &str,
    ) -> Result<Option<CategoryRecord>, RepoError> {
        Ok(self
            .lock()
            .categories
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(name))
            .cloned())
    }
}

#[async_trait]
impl CategoriesWriteRepo for MemoryStore {
    async fn create_category(&self, params: CategoryParams) -> Result<CategoryRecord, RepoError> {
        let mut inner = self.lock();
        if inner.categories.iter().any(|r| r.name == params.name) {
            return Err(RepoError::Duplicate {
                constraint: "categories_name_key".into(),
            });
        }
        let now = OffsetDateTime::now_utc();
        let record = CategoryRecord {
            id: Uuid::new_v4(),
            name: params.name,
            slug: params.slug,
            description: params.description,
            order_priority: params.order_priority,
            blog_count: 0,
            created_at: now,
            updated_at: now,
        };
        inner.categories.push(record.clone());
        inner.bump(ResourceKind::Categories);
        Ok(record)
    }

    async fn update_category(
        &self,
        id: Uuid,
        params: CategoryParams,
    ) -> Result<CategoryRecord, RepoError> {
        let mut inner = self.lock();
        let row = inner
            .categories
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(RepoError::NotFound)?;
        let moved = row.order_priority != params.order_priority;
        row.name = params.name;
        row.slug = params.slug;
        row.description = params.description;
        row.order_priority = params.order_priority;
        row.updated_at = OffsetDateTime::now_utc();
        let record = row.clone();
        if moved {
            inner.bump(ResourceKind::Categories);
        }
        Ok(record)
    }

    async fn delete_category(&self, id: Uuid) -> Result<(), RepoError> {
        let mut inner = self.lock();
        inner.categories.retain(|r| r.id != id);
        inner.bump(ResourceKind::Categories);
        Ok(())
    }
}

#[async_trait]
impl BlogsRepo for MemoryStore {
    async fn list_blogs(
        &self,
        scope: ListScope,
        filter: &BlogQueryFilter,
    ) -> Result<Vec<BlogPostRecord>, RepoError> {
        let now = OffsetDateTime::now_utc();
        let mut rows: Vec<_> = self
            .lock()
            .blogs
            .iter()
            .filter(|r| {
                scope == ListScope::Admin
                    || (r.is_published && r.publish_date.is_some_and(|date| date <= now))
            })
            .filter(|r| matches(filter.search.as_ref(), &[&r.title, &r.excerpt, &r.content]))
            .cloned()
            .collect();
        sort_ordered(&mut rows, |r| (r.order_priority, r.created_at));
        Ok(rows)
    }

    async fn find_blog(&self, id: Uuid) -> Result<Option<BlogPostRecord>, RepoError> {
        Ok(self.lock().blogs.iter().find(|r| r.id == id).cloned())
    }

    async fn find_blog_by_slug(&self, slug: &str) -> Result<Option<BlogPostRecord>, RepoError> {
        Ok(self.lock().blogs.iter().find(|r| r.slug == slug).cloned())
    }
}

#[async_trait]
impl BlogsWriteRepo for MemoryStore {
    async fn create_blog(
        &self,
        author_id: Uuid,
        params: BlogPostParams,
    ) -> Result<BlogPostRecord, RepoError> {
        let mut inner = self.lock();
        let author = inner
            .users
            .iter()
            .find(|c| c.user.id == author_id)
            .map(|c| c.user.username.clone())
            .unwrap_or_default();
        let now = OffsetDateTime::now_utc();
        let record = BlogPostRecord {
            id: Uuid::new_v4(),
            read_time_minutes: read_time_minutes(&params.content),
            title: params.title,
            slug: params.slug,
            excerpt: params.excerpt,
            content: params.content,
            author,
            categories: Vec::new(),
            featured_image_url: params.featured_image_url,
            meta_description: params.meta_description,
            meta_keywords: params.meta_keywords,
            is_published: params.is_published,
            is_featured: params.is_featured,
            order_priority: params.order_priority,
            view_count: 0,
            publish_date: params.publish_date,
            created_at: now,
            updated_at: now,
        };
        inner.blogs.push(record.clone());
        inner.bump(ResourceKind::Blogs);
        Ok(record)
    }

    async fn update_blog(
        &self,
        id: Uuid,
        params: BlogPostParams,
    ) -> Result<BlogPostRecord, RepoError> {
        let mut inner = self.lock();
        let row = inner
            .blogs
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(RepoError::NotFound)?;
        row.read_time_minutes = read_time_minutes(&params.content);
        row.title = params.title;
        row.slug = params.slug;
        row.excerpt = params.excerpt;
        row.content = params.content;
        row.is_published = params.is_published;
        row.is_featured = params.is_featured;
        row.order_priority = params.order_priority;
        row.publish_date = params.publish_date;
        Ok(row.clone())
    }

    async fn delete_blog(&self, id: Uuid) -> Result<(), RepoError> {
        let mut inner = self.lock();
        inner.blogs.retain(|r| r.id != id);
        inner.bump(ResourceKind::Blogs);
        Ok(())
    }

    async fn increment_view_count(&self, id: Uuid) -> Result<(), RepoError> {
        if let Some(row) = self.lock().blogs.iter_mut().find(|r| r.id == id) {
            row.view_count += 1;
        }
        Ok(())
    }
}

#[async_trait]
impl TestimonialsRepo for MemoryStore {
    async fn list_testimonials(
        &self,
        scope: ListScope,
        filter: &TestimonialQueryFilter,
    ) -> Result<Vec<TestimonialRecord>, RepoError> {
        let mut rows: Vec<_> = self
            .lock()
            .testimonials
            .iter()
            .filter(|r| scope == ListScope::Admin || r.is_active)
            .filter(|r| filter.is_featured.is_none_or(|f| r.is_featured == f))
            .filter(|r| matches(filter.search.as_ref(), &[&r.client_name, &r.testimonial_text]))
            .cloned()
            .collect();
        sort_ordered(&mut rows, |r| (r.order_priority, r.created_at));
        Ok(rows)
    }

    async fn find_testimonial(&self, id: Uuid) -> Result<Option<TestimonialRecord>, RepoError> {
        Ok(self.lock().testimonials.iter().find(|r| r.id == id).cloned())
    }
}

#[async_trait]
impl TestimonialsWriteRepo for MemoryStore {
    async fn create_testimonial(
        &self,
        params: TestimonialParams,
    ) -> Result<TestimonialRecord, RepoError> {
        let mut inner = self.lock();
        let now = OffsetDateTime::now_utc();
        let record = TestimonialRecord {
            id: Uuid::new_v4(),
            client_name: params.client_name,
            client_title: params.client_title,
            client_company: params.client_company,
            testimonial_text: params.testimonial_text,
            client_image_url: params.client_image_url,
            rating: params.rating,
            case_type: params.case_type,
            is_featured: params.is_featured,
            is_active: params.is_active,
            order_priority: params.order_priority,
            created_at: now,
            updated_at: now,
        };
        inner.testimonials.push(record.clone());
        inner.bump(ResourceKind::Testimonials);
        Ok(record)
    }

    async fn update_testimonial(
        &self,
        id: Uuid,
        params: TestimonialParams,
    ) -> Result<TestimonialRecord, RepoError> {
        let mut inner = self.lock();
        let row = inner
            .testimonials
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(RepoError::NotFound)?;
        row.client_name = params.client_name;
        row.testimonial_text = params.testimonial_text;
        row.rating = params.rating;
        row.is_featured = params.is_featured;
        row.is_active = params.is_active;
        row.order_priority = params.order_priority;
        Ok(row.clone())
    }

    async fn delete_testimonial(&self, id: Uuid) -> Result<(), RepoError> {
        let mut inner = self.lock();
        inner.testimonials.retain(|r| r.id != id);
        inner.bump(ResourceKind::Testimonials);
        Ok(())
    }
}

#[async_trait]
impl GrantsRepo for MemoryStore {
    async fn list_grants(
        &self,
        scope: ListScope,
        filter: &GrantQueryFilter,
    ) -> Result<Vec<GrantRecord>, RepoError> {
        let mut rows: Vec<_> = self
            .lock()
            .grants
            .iter()
            .filter(|r| scope == ListScope::Admin || r.is_active)
            .filter(|r| filter.status.is_none_or(|s| r.status == s))
            .filter(|r| filter.is_featured.is_none_or(|f| r.is_featured == f))
            .filter(|r| matches(filter.search.as_ref(), &[&r.title, &r.short_description]))
            .cloned()
            .collect();
        sort_ordered(&mut rows, |r| (r.order_priority, r.created_at));
        Ok(rows)
    }

    async fn find_grant(&self, id: Uuid) -> Result<Option<GrantRecord>, RepoError> {
        Ok(self.lock().grants.iter().find(|r| r.id == id).cloned())
    }

    async fn find_grant_by_slug(&self, slug: &str) -> Result<Option<GrantRecord>, RepoError> {
        Ok(self.lock().grants.iter().find(|r| r.slug == slug).cloned())
    }
}

#[async_trait]
impl GrantsWriteRepo for MemoryStore {
    async fn create_grant(&self, params: GrantParams) -> Result<GrantRecord, RepoError> {
        let mut inner = self.lock();
        let now = OffsetDateTime::now_utc();
        let record = GrantRecord {
            id: Uuid::new_v4(),
            formatted_amount: params.amount.map(|a| params.currency.format_minor(a)),
            title: params.title,
            slug: params.slug,
            grant_type: params.grant_type,
            amount: params.amount,
            currency: params.currency,
            short_description: params.short_description,
            full_description: params.full_description,
            target_audience: params.target_audience,
            application_deadline: params.application_deadline,
            announcement_date: params.announcement_date,
            status: params.status,
            eligibility_criteria: params.eligibility_criteria,
            requirements: params.requirements,
            guidelines: params.guidelines,
            target_institutions: params.target_institutions,
            is_featured: params.is_featured,
            is_active: params.is_active,
            order_priority: params.order_priority,
            created_at: now,
            updated_at: now,
        };
        inner.grants.push(record.clone());
        inner.bump(ResourceKind::Grants);
        Ok(record)
    }

    async fn update_grant(&self, id: Uuid, params: GrantParams) -> Result<GrantRecord, RepoError> {
        let mut inner = self.lock();
        let row = inner
            .grants
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(RepoError::NotFound)?;
        row.title = params.title;
        row.status = params.status;
        row.is_active = params.is_active;
        row.is_featured = params.is_featured;
        row.order_priority = params.order_priority;
        Ok(row.clone())
    }

    async fn delete_grant(&self, id: Uuid) -> Result<(), RepoError> {
        let mut inner = self.lock();
        inner.grants.retain(|r| r.id != id);
        inner.bump(ResourceKind::Grants);
        Ok(())
    }
}

#[async_trait]
impl ServicesRepo for MemoryStore {
    async fn list_services(
        &self,
        scope: ListScope,
        filter: &ServiceQueryFilter,
    ) -> Result<Vec<ConsultationServiceRecord>, RepoError> {
        let mut rows: Vec<_> = self
            .lock()
            .services
            .iter()
            .filter(|r| scope == ListScope::Admin || r.is_active)
            .filter(|r| filter.category.is_none_or(|c| r.category == c))
            .filter(|r| filter.is_active.is_none_or(|a| r.is_active == a))
            .filter(|r| filter.is_featured.is_none_or(|f| r.is_featured == f))
            .filter(|r| matches(filter.search.as_ref(), &[&r.name, &r.description]))
            .cloned()
            .collect();
        sort_ordered(&mut rows, |r| (r.order_priority, r.created_at));
        Ok(rows)
    }

    async fn find_service(
        &self,
        id: Uuid,
    ) -> Result<Option<ConsultationServiceRecord>, RepoError> {
        Ok(self.lock().services.iter().find(|r| r.id == id).cloned())
    }

    async fn find_service_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<ConsultationServiceRecord>, RepoError> {
        Ok(self.lock().services.iter().find(|r| r.slug == slug).cloned())
    }
}

#[async_trait]
impl ServicesWriteRepo for MemoryStore {
    async fn create_service(
        &self,
        params: ServiceParams,
    ) -> Result<ConsultationServiceRecord, RepoError> {
        let mut inner = self.lock();
        let now = OffsetDateTime::now_utc();
        let record = ConsultationServiceRecord {
            id: Uuid::new_v4(),
            formatted_price: params.currency.format_minor(params.price),
            name: params.name,
            slug: params.slug,
            description: params.description,
            short_description: params.short_description,
            category: params.category,
            price: params.price,
            currency: params.currency,
            duration_minutes: params.duration_minutes,
            icon_name: params.icon_name,
            image_url: params.image_url,
            is_active: params.is_active,
            is_featured: params.is_featured,
            order_priority: params.order_priority,
            created_at: now,
            updated_at: now,
        };
        inner.services.push(record.clone());
        inner.bump(ResourceKind::ConsultationServices);
        Ok(record)
    }

    async fn update_service(
        &self,
        id: Uuid,
        params: ServiceParams,
    ) -> Result<ConsultationServiceRecord, RepoError> {
        let mut inner = self.lock();
        let row = inner
            .services
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(RepoError::NotFound)?;
        row.name = params.name;
        row.price = params.price;
        row.formatted_price = params.currency.format_minor(params.price);
        row.is_active = params.is_active;
        row.is_featured = params.is_featured;
        row.order_priority = params.order_priority;
        Ok(row.clone())
    }

    async fn delete_service(&self, id: Uuid) -> Result<(), RepoError> {
        let mut inner = self.lock();
        inner.services.retain(|r| r.id != id);
        inner.bump(ResourceKind::ConsultationServices);
        Ok(())
    }
}

#[async_trait]
impl BookingsRepo for MemoryStore {
    async fn create_booking(&self, params: NewBookingParams) -> Result<BookingRecord, RepoError> {
        let mut inner = self.lock();
        let service_name = params.service_id.and_then(|id| {
            inner
                .services
                .iter()
                .find(|s| s.id == id)
                .map(|s| s.name.clone())
        });
        let now = OffsetDateTime::now_utc();
        let record = BookingRecord {
            id: Uuid::new_v4(),
            service_name: booking_service_name(
                service_name.as_deref(),
                &params.custom_service_description,
            ),
            formatted_amount: params.currency.format_minor(params.amount),
            reference: params.reference,
            service_id: params.service_id,
            custom_service_description: params.custom_service_description,
            client_name: params.client_name,
            client_email: params.client_email,
            client_phone: params.client_phone,
            client_company: params.client_company,
            preferred_date: params.preferred_date,
            preferred_time: params.preferred_time,
            notes: params.notes,
            amount: params.amount,
            currency: params.currency,
            status: BookingStatus::PendingPayment,
            payment_verified: false,
            payment_verified_at: None,
            payment_channel: None,
            gateway_reference: None,
            gateway_access_code: None,
            admin_notes: String::new(),
            assigned_associate_id: None,
            assigned_associate_name: None,
            created_at: now,
            updated_at: now,
        };
        inner.bookings.push(record.clone());
        Ok(record)
    }

    async fn attach_gateway_session(
        &self,
        id: Uuid,
        gateway_reference: &str,
        access_code: &str,
    ) -> Result<BookingRecord, RepoError> {
        let mut inner = self.lock();
        let row = inner
            .bookings
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(RepoError::NotFound)?;
        row.gateway_reference = Some(gateway_reference.to_string());
        row.gateway_access_code = Some(access_code.to_string());
        Ok(row.clone())
    }

    async fn delete_booking(&self, id: Uuid) -> Result<(), RepoError> {
        self.lock().bookings.retain(|r| r.id != id);
        Ok(())
    }

    async fn find_booking(&self, id: Uuid) -> Result<Option<BookingRecord>, RepoError> {
        Ok(self.lock().bookings.iter().find(|r| r.id == id).cloned())
    }

    async fn find_booking_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<BookingRecord>, RepoError> {
        Ok(self
            .lock()
            .bookings
            .iter()
            .find(|r| r.reference == reference)
            .cloned())
    }

    async fn list_bookings(
        &self,
        filter: &BookingQueryFilter,
    ) -> Result<Vec<BookingRecord>, RepoError> {
        Ok(self
            .lock()
            .bookings
            .iter()
            .filter(|r| filter.status.is_none_or(|s| r.status == s))
            .filter(|r| filter.service_id.is_none_or(|id| r.service_id == Some(id)))
            .filter(|r| {
                matches(
                    filter.search.as_ref(),
                    &[&r.client_name, &r.client_email, &r.reference],
                )
            })
            .cloned()
            .collect())
    }

    async fn mark_paid(
        &self,
        id: Uuid,
        confirmation: PaymentConfirmation,
    ) -> Result<BookingRecord, RepoError> {
        let mut inner = self.lock();
        let row = inner
            .bookings
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(RepoError::NotFound)?;
        row.payment_verified = true;
        row.payment_verified_at = Some(confirmation.verified_at);
        row.payment_channel = confirmation.channel;
        row.status = BookingStatus::Paid;
        Ok(row.clone())
    }

    async fn update_booking(
        &self,
        id: Uuid,
        update: BookingAdminUpdate,
    ) -> Result<BookingRecord, RepoError> {
        let mut inner = self.lock();
        let row = inner
            .bookings
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(RepoError::NotFound)?;
        if let Some(change) = update.status {
            if row.status != change.from {
                return Err(RepoError::NotFound);
            }
            row.status = change.to;
        }
        if let Some(notes) = update.admin_notes {
            row.admin_notes = notes;
        }
        if let Some(assigned) = update.assigned_associate_id {
            row.assigned_associate_id = assigned;
        }
        Ok(row.clone())
    }

    async fn booking_totals(&self, _popular_limit: u32) -> Result<BookingTotals, RepoError> {
        let inner = self.lock();
        let paid: Vec<_> = inner
            .bookings
            .iter()
            .filter(|r| r.payment_verified)
            .collect();
        Ok(BookingTotals {
            total: inner.bookings.len() as u64,
            paid: paid.len() as u64,
            revenue: paid.iter().map(|r| r.amount).sum(),
            ..BookingTotals::default()
        })
    }
}

#[async_trait]
impl ContactsRepo for MemoryStore {
    async fn create_contact(&self, params: NewContactParams) -> Result<ContactRecord, RepoError> {
        let now = OffsetDateTime::now_utc();
        let record = ContactRecord {
            id: Uuid::new_v4(),
            name: params.name,
            email: params.email,
            phone: params.phone,
            subject: params.subject,
            message: params.message,
            status: ContactStatus::Unread,
            created_at: now,
            updated_at: now,
        };
        self.lock().contacts.push(record.clone());
        Ok(record)
    }

    async fn list_contacts(
        &self,
        filter: &ContactQueryFilter,
    ) -> Result<Vec<ContactRecord>, RepoError> {
        Ok(self
            .lock()
            .contacts
            .iter()
            .filter(|r| filter.status.is_none_or(|s| r.status == s))
            .filter(|r| matches(filter.search.as_ref(), &[&r.name, &r.email, &r.subject]))
            .cloned()
            .collect())
    }

    async fn find_contact(&self, id: Uuid) -> Result<Option<ContactRecord>, RepoError> {
        Ok(self.lock().contacts.iter().find(|r| r.id == id).cloned())
    }

    async fn update_contact_status(
        &self,
        id: Uuid,
        status: ContactStatus,
    ) -> Result<ContactRecord, RepoError> {
        let mut inner = self.lock();
        let row = inner
            .contacts
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(RepoError::NotFound)?;
        row.status = status;
        Ok(row.clone())
    }

    async fn delete_contact(&self, id: Uuid) -> Result<(), RepoError> {
        let mut inner = self.lock();
        let before = inner.contacts.len();
        inner.contacts.retain(|r| r.id != id);
        if inner.contacts.len() == before {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl DashboardRepo for MemoryStore {
    async fn dashboard_counts(&self) -> Result<DashboardCounts, RepoError> {
        let inner = self.lock();
        Ok(DashboardCounts {
            total_associates: inner.associates.len() as u64,
            active_associates: inner.associates.iter().filter(|r| r.is_active).count() as u64,
            total_contacts: inner.contacts.len() as u64,
            unread_contacts: inner
                .contacts
                .iter()
                .filter(|r| r.status == ContactStatus::Unread)
                .count() as u64,
            total_bookings: inner.bookings.len() as u64,
            ..DashboardCounts::default()
        })
    }

    async fn publish_activity(
        &self,
        since: OffsetDateTime,
        until: OffsetDateTime,
    ) -> Result<Vec<PublishDayActivity>, RepoError> {
        let inner = self.lock();
        let mut days: BTreeMap<time::Date, PublishDayActivity> = BTreeMap::new();
        for blog in inner.blogs.iter().filter(|r| r.is_published) {
            let Some(published) = blog.publish_date else {
                continue;
            };
            if published < since || published > until {
                continue;
            }
            let date = published.to_offset(UtcOffset::UTC).date();
            let day = days.entry(date).or_insert(PublishDayActivity {
                date,
                posts: 0,
                views: 0,
            });
            day.posts += 1;
            day.views += blog.view_count as u64;
        }
        Ok(days.into_values().collect())
    }

    async fn published_posts_by_category(&self) -> Result<Vec<CategoryPostCount>, RepoError> {
        let inner = self.lock();
        let mut counts: HashMap<String, u64> = HashMap::new();
        for blog in inner.blogs.iter().filter(|r| r.is_published) {
            for category in &blog.categories {
                *counts.entry(category.name.clone()).or_default() += 1;
            }
        }
        let mut rows: Vec<CategoryPostCount> = counts
            .into_iter()
            .map(|(category, posts)| CategoryPostCount { category, posts })
            .collect();
        rows.sort_by(|a, b| b.posts.cmp(&a.posts).then(a.category.cmp(&b.category)));
        Ok(rows)
    }

    async fn contacts_by_status(&self) -> Result<Vec<ContactStatusCount>, RepoError> {
        let inner = self.lock();
        Ok([
            ContactStatus::Unread,
            ContactStatus::Read,
            ContactStatus::Responded,
        ]
        .into_iter()
        .map(|status| ContactStatusCount {
            status,
            count: inner.contacts.iter().filter(|r| r.status == status).count() as u64,
        })
        .filter(|row| row.count > 0)
        .collect())
    }
}

#[async_trait]
impl StaffUsersRepo for MemoryStore {
    async fn create_user(&self, params: NewStaffUserParams) -> Result<StaffUserRecord, RepoError> {
        let mut inner = self.lock();
        if inner.users.iter().any(|c| c.user.username == params.username) {
            return Err(RepoError::Duplicate {
                constraint: "staff_users_username_key".into(),
            });
        }
        let user = StaffUserRecord {
            id: Uuid::new_v4(),
            username: params.username,
            email: params.email,
            first_name: params.first_name,
            last_name: params.last_name,
            is_staff: true,
            is_superuser: params.is_superuser,
            date_joined: OffsetDateTime::now_utc(),
        };
        inner.users.push(StaffCredentials {
            user: user.clone(),
            password_salt: params.password_salt,
            password_hash: params.password_hash,
        });
        Ok(user)
    }

    async fn find_credentials(
        &self,
        username: &str,
    ) -> Result<Option<StaffCredentials>, RepoError> {
        Ok(self
            .lock()
            .users
            .iter()
            .find(|c| c.user.username == username)
            .cloned())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<StaffUserRecord>, RepoError> {
        Ok(self
            .lock()
            .users
            .iter()
            .find(|c| c.user.id == id)
            .map(|c| c.user.clone()))
    }
}

#[async_trait]
impl AuthTokensRepo for MemoryStore {
    async fn insert_token(
        &self,
        params: NewAuthTokenParams,
    ) -> Result<AuthTokenRecord, RepoError> {
        let record = AuthTokenRecord {
            id: Uuid::new_v4(),
            user_id: params.user_id,
            kind: params.kind,
            prefix: params.prefix,
            hashed_secret: params.hashed_secret,
            expires_at: params.expires_at,
            revoked_at: None,
            last_used_at: None,
            created_at: OffsetDateTime::now_utc(),
        };
        self.lock().tokens.push(record.clone());
        Ok(record)
    }

    async fn find_token_by_prefix(
        &self,
        prefix: &str,
    ) -> Result<Option<AuthTokenRecord>, RepoError> {
        Ok(self
            .lock()
            .tokens
            .iter()
            .find(|t| t.prefix == prefix)
            .cloned())
    }

    async fn revoke_token(&self, id: Uuid, revoked_at: OffsetDateTime) -> Result<(), RepoError> {
        if let Some(token) = self.lock().tokens.iter_mut().find(|t| t.id == id) {
            token.revoked_at = Some(revoked_at);
        }
        Ok(())
    }

    async fn touch_token(&self, id: Uuid, used_at: OffsetDateTime) -> Result<(), RepoError> {
        if let Some(token) = self.lock().tokens.iter_mut().find(|t| t.id == id) {
            token.last_used_at = Some(used_at);
        }
        Ok(())
    }
}

#[async_trait]
impl AuditRepo for MemoryStore {
    async fn append_log(&self, record: AuditLogRecord) -> Result<(), RepoError> {
        self.lock().audit.push(record);
        Ok(())
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<AuditLogRecord>, RepoError> {
        Ok(self
            .lock()
            .audit
            .iter()
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

/// Gateway double: succeeds unless told to fail, verifies with the initialized amount.
#[derive(Default)]
pub struct FakeGateway {
    pub fail_initialize: bool,
    pub verify_status: Option<String>,
    amounts: Mutex<HashMap<String, i64>>,
}

impl FakeGateway {
    pub fn unreachable() -> Self {
        Self {
            fail_initialize: true,
            ..Self::default()
        }
    }

    pub fn reporting(status: &str) -> Self {
        Self {
            verify_status: Some(status.to_string()),
            ..Self::default()
        }
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn initialize(&self, request: PaymentInit) -> Result<PaymentSession, GatewayError> {
        if self.fail_initialize {
            return Err(GatewayError::Transport("connection refused".into()));
        }
        self.amounts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(request.reference.clone(), request.amount);
        Ok(PaymentSession {
            authorization_url: format!("https://checkout.test/{}", request.reference),
            access_code: "code-1".into(),
            reference: request.reference,
        })
    }

    async fn verify(&self, reference: &str) -> Result<PaymentVerification, GatewayError> {
        let amount = self
            .amounts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(reference)
            .copied()
            .ok_or_else(|| GatewayError::Rejected("Transaction reference not found".into()))?;
        Ok(PaymentVerification {
            status: self.verify_status.clone().unwrap_or_else(|| "success".into()),
            amount,
            channel: Some("card".into()),
        })
    }
}

pub struct TestApp {
    pub store: MemoryStore,
    pub state: ApiState,
    pub router: Router,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with(FakeGateway::default(), 1_000).await
    }

    pub async fn with(gateway: FakeGateway, max_requests: u32) -> Self {
        let store = MemoryStore::default();
        let state = ApiState::assemble(
            Arc::new(store.clone()),
            Arc::new(gateway),
            ApiPolicies {
                session: SessionPolicy::default(),
                booking: BookingPolicy {
                    default_fee: 2_500_000,
                },
            },
            ApiRateLimiter::new(Duration::from_secs(60), max_requests),
        );
        state
            .auth
            .create_staff_user(NewStaffUser {
                username: STAFF_USERNAME.into(),
                email: "admin@lightfield.test".into(),
                first_name: "Ada".into(),
                last_name: "Obi".into(),
                password: STAFF_PASSWORD.into(),
                is_superuser: true,
            })
            .await
            .expect("seed staff user");
        let router = build_router(state.clone());
        Self {
            store,
            state,
            router,
        }
    }

    pub async fn access_token(&self) -> String {
        self.state
            .auth
            .login(STAFF_USERNAME, STAFF_PASSWORD)
            .await
            .expect("login")
            .access
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }
}

pub fn json_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let body = match body {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    builder.body(body).expect("request")
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    if bytes.is_empty() {
        return serde_json::Value::Null;
    }
    serde_json::from_slice(&bytes).expect("json body")
}
