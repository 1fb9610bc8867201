pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod rate_limit;
pub mod state;

pub use state::{ApiPolicies, ApiRepositories, ApiState, HealthProbe};

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};

use crate::domain::resources::ResourceKind;

/// Routes under `/api/v1`, wrapped in auth and rate limiting.
pub fn build_api_router(state: ApiState) -> Router {
    let auth_state = state.clone();
    let rate_state = state.clone();

    let mut router = Router::new()
        .route("/api/v1/auth/login", post(handlers::login))
        .route("/api/v1/auth/refresh", post(handlers::refresh))
        .route("/api/v1/auth/logout", post(handlers::logout))
        .route(
            "/api/v1/associates",
            get(handlers::list_associates).post(handlers::create_associate),
        )
        .route(
            "/api/v1/associates/{key}",
            get(handlers::get_associate)
                .patch(handlers::update_associate)
                .delete(handlers::delete_associate),
        )
        .route(
            "/api/v1/categories",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route(
            "/api/v1/categories/{key}",
            get(handlers::get_category)
                .patch(handlers::update_category)
                .delete(handlers::delete_category),
        )
        .route(
            "/api/v1/blogs",
            get(handlers::list_blogs).post(handlers::create_blog),
        )
        .route(
            "/api/v1/blogs/{key}",
            get(handlers::get_blog)
                .patch(handlers::update_blog)
                .delete(handlers::delete_blog),
        )
        .route(
            "/api/v1/testimonials",
            get(handlers::list_testimonials).post(handlers::create_testimonial),
        )
        .route(
            "/api/v1/testimonials/{id}",
            get(handlers::get_testimonial)
                .patch(handlers::update_testimonial)
                .delete(handlers::delete_testimonial),
        )
        .route(
            "/api/v1/grants",
            get(handlers::list_grants).post(handlers::create_grant),
        )
        .route("/api/v1/grants/featured", get(handlers::featured_grants))
        .route("/api/v1/grants/open", get(handlers::open_grants))
        .route(
            "/api/v1/grants/{key}",
            get(handlers::get_grant)
                .patch(handlers::update_grant)
                .delete(handlers::delete_grant),
        )
        .route(
            "/api/v1/consultation-services",
            get(handlers::list_services).post(handlers::create_service),
        )
        .route(
            "/api/v1/consultation-services/featured",
            get(handlers::featured_services),
        )
        .route(
            "/api/v1/consultation-services/{key}",
            get(handlers::get_service)
                .patch(handlers::update_service)
                .delete(handlers::delete_service),
        )
        .route(
            "/api/v1/bookings",
            get(handlers::list_bookings).post(handlers::create_booking),
        )
        .route(
            "/api/v1/bookings/verify-payment",
            post(handlers::verify_payment),
        )
        .route("/api/v1/bookings/stats", get(handlers::booking_stats))
        .route(
            "/api/v1/bookings/reference/{reference}",
            get(handlers::booking_by_reference),
        )
        .route(
            "/api/v1/bookings/{id}",
            get(handlers::get_booking).patch(handlers::update_booking),
        )
        .route(
            "/api/v1/contacts",
            get(handlers::list_contacts).post(handlers::submit_contact),
        )
        .route(
            "/api/v1/contacts/{id}",
            get(handlers::get_contact)
                .patch(handlers::update_contact_status)
                .delete(handlers::delete_contact),
        )
        .route("/api/v1/dashboard/stats", get(handlers::dashboard_stats))
        .route(
            "/api/v1/dashboard/activity",
            get(handlers::dashboard_activity),
        )
        .route(
            "/api/v1/dashboard/views-over-time",
            get(handlers::dashboard_views_over_time),
        )
        .route(
            "/api/v1/dashboard/posts-over-time",
            get(handlers::dashboard_posts_over_time),
        )
        .route(
            "/api/v1/dashboard/posts-by-category",
            get(handlers::dashboard_posts_by_category),
        )
        .route(
            "/api/v1/dashboard/contacts-by-status",
            get(handlers::dashboard_contacts_by_status),
        );

    for kind in ResourceKind::ALL {
        router = router.route(
            &format!("/api/v1/{}/reorder", kind.segment()),
            handlers::reorder_route(kind),
        );
    }

    router
        .with_state(state)
        .layer(axum_middleware::from_fn_with_state(
            rate_state,
            middleware::api_rate_limit,
        ))
        .layer(axum_middleware::from_fn_with_state(
            auth_state,
            middleware::api_auth,
        ))
}
