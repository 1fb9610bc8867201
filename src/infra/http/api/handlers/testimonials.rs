use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::application::admin::testimonials::TestimonialDraft;
use crate::application::auth::Caller;
use crate::application::repos::TestimonialQueryFilter;
use crate::domain::resources::ResourceKind;

use super::{TestimonialListQuery, list_scope, staff_actor, versioned_json};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::extract::{ApiJson, ApiQuery};
use crate::infra::http::api::state::ApiState;

pub async fn list_testimonials(
    State(state): State<ApiState>,
    Extension(caller): Extension<Caller>,
    ApiQuery(query): ApiQuery<TestimonialListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let version = state
        .reorder
        .current_version(ResourceKind::Testimonials)
        .await?;
    let filter = TestimonialQueryFilter {
        search: query.search,
        is_featured: query.is_featured,
    };
    let items = state
        .testimonials
        .list(list_scope(&caller), &filter)
        .await?;
    Ok(versioned_json(version, items))
}

pub async fn get_testimonial(
    State(state): State<ApiState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let testimonial = state
        .testimonials
        .find(id)
        .await?
        .filter(|testimonial| caller.is_staff() || testimonial.is_active)
        .ok_or_else(|| ApiError::not_found("Testimonial not found"))?;
    Ok(Json(testimonial))
}

pub async fn create_testimonial(
    State(state): State<ApiState>,
    Extension(caller): Extension<Caller>,
    ApiJson(draft): ApiJson<TestimonialDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = staff_actor(&caller)?;
    let testimonial = state.testimonials.create(&actor, draft).await?;
    Ok((StatusCode::CREATED, Json(testimonial)))
}

pub async fn update_testimonial(
    State(state): State<ApiState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
    ApiJson(draft): ApiJson<TestimonialDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = staff_actor(&caller)?;
    let testimonial = state.testimonials.update(&actor, id, draft).await?;
    Ok(Json(testimonial))
}

pub async fn delete_testimonial(
    State(state): State<ApiState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = staff_actor(&caller)?;
    state.testimonials.delete(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
