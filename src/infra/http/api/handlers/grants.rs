use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::admin::grants::GrantDraft;
use crate::application::auth::Caller;
use crate::application::repos::GrantQueryFilter;
use crate::domain::resources::ResourceKind;

use super::{GrantListQuery, item_key, list_scope, staff_actor, versioned_json};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::extract::{ApiJson, ApiQuery};
use crate::infra::http::api::state::ApiState;

pub async fn list_grants(
    State(state): State<ApiState>,
    Extension(caller): Extension<Caller>,
    ApiQuery(query): ApiQuery<GrantListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let version = state.reorder.current_version(ResourceKind::Grants).await?;
    let filter = GrantQueryFilter {
        search: query.search,
        grant_type: query.grant_type,
        status: query.status,
        is_featured: query.is_featured,
    };
    let items = state.grants.list(list_scope(&caller), &filter).await?;
    Ok(versioned_json(version, items))
}

pub async fn featured_grants(
    State(state): State<ApiState>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.grants.featured().await?))
}

pub async fn open_grants(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.grants.open().await?))
}

pub async fn get_grant(
    State(state): State<ApiState>,
    Extension(caller): Extension<Caller>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let grant = state
        .grants
        .find(&item_key(&key))
        .await?
        .filter(|grant| caller.is_staff() || grant.is_active)
        .ok_or_else(|| ApiError::not_found("Grant not found"))?;
    Ok(Json(grant))
}

pub async fn create_grant(
    State(state): State<ApiState>,
    Extension(caller): Extension<Caller>,
    ApiJson(draft): ApiJson<GrantDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = staff_actor(&caller)?;
    let grant = state.grants.create(&actor, draft).await?;
    Ok((StatusCode::CREATED, Json(grant)))
}

pub async fn update_grant(
    State(state): State<ApiState>,
    Extension(caller): Extension<Caller>,
    Path(key): Path<String>,
    ApiJson(draft): ApiJson<GrantDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = staff_actor(&caller)?;
    let grant = state.grants.update(&actor, &item_key(&key), draft).await?;
    Ok(Json(grant))
}

pub async fn delete_grant(
    State(state): State<ApiState>,
    Extension(caller): Extension<Caller>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = staff_actor(&caller)?;
    state.grants.delete(&actor, &item_key(&key)).await?;
    Ok(StatusCode::NO_CONTENT)
}
