//! Consultation service catalogue handlers

use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::admin::services::ServiceDraft;
use crate::application::auth::Caller;
use crate::application::repos::ServiceQueryFilter;
use crate::domain::resources::ResourceKind;

use super::{ServiceListQuery, item_key, list_scope, staff_actor, versioned_json};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::extract::{ApiJson, ApiQuery};
use crate::infra::http::api::state::ApiState;

pub async fn list_services(
    State(state): State<ApiState>,
    Extension(caller): Extension<Caller>,
    ApiQuery(query): ApiQuery<ServiceListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let version = state
        .reorder
        .current_version(ResourceKind::ConsultationServices)
        .await?;
    let filter = ServiceQueryFilter {
        search: query.search,
        category: query.category,
        is_active: query.is_active,
        is_featured: query.is_featured,
    };
    let items = state.services.list(list_scope(&caller), &filter).await?;
    Ok(versioned_json(version, items))
}

pub async fn featured_services(
    State(state): State<ApiState>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.services.featured().await?))
}

pub async fn get_service(
    State(state): State<ApiState>,
    Extension(caller): Extension<Caller>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let service = state
        .services
        .find(&item_key(&key))
        .await?
        .filter(|service| caller.is_staff() || service.is_active)
        .ok_or_else(|| ApiError::not_found("Consultation service not found"))?;
    Ok(Json(service))
}

pub async fn create_service(
    State(state): State<ApiState>,
    Extension(caller): Extension<Caller>,
    ApiJson(draft): ApiJson<ServiceDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = staff_actor(&caller)?;
    let service = state.services.create(&actor, draft).await?;
    Ok((StatusCode::CREATED, Json(service)))
}

pub async fn update_service(
    State(state): State<ApiState>,
    Extension(caller): Extension<Caller>,
    Path(key): Path<String>,
    ApiJson(draft): ApiJson<ServiceDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = staff_actor(&caller)?;
    let service = state
        .services
        .update(&actor, &item_key(&key), draft)
        .await?;
    Ok(Json(service))
}

pub async fn delete_service(
    State(state): State<ApiState>,
    Extension(caller): Extension<Caller>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = staff_actor(&caller)?;
    state.services.delete(&actor, &item_key(&key)).await?;
    Ok(StatusCode::NO_CONTENT)
}
