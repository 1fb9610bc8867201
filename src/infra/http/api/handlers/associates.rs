//! Associates handlers

use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::admin::associates::AssociateDraft;
use crate::application::auth::Caller;
use crate::application::repos::AssociateQueryFilter;
use crate::domain::resources::ResourceKind;

use super::{AssociateListQuery, item_key, list_scope, staff_actor, versioned_json};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::extract::{ApiJson, ApiQuery};
use crate::infra::http::api::state::ApiState;

pub async fn list_associates(
    State(state): State<ApiState>,
    Extension(caller): Extension<Caller>,
    ApiQuery(query): ApiQuery<AssociateListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let version = state
        .reorder
        .current_version(ResourceKind::Associates)
        .await?;
    let filter = AssociateQueryFilter {
        search: query.search,
        is_active: query.is_active,
    };
    let items = state
        .associates
        .list(list_scope(&caller), &filter)
        .await?;
    Ok(versioned_json(version, items))
}

pub async fn get_associate(
    State(state): State<ApiState>,
    Extension(caller): Extension<Caller>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let associate = state
        .associates
        .find(&item_key(&key))
        .await?
        .filter(|associate| caller.is_staff() || associate.is_active)
        .ok_or_else(|| ApiError::not_found("Associate not found"))?;
    Ok(Json(associate))
}

pub async fn create_associate(
    State(state): State<ApiState>,
    Extension(caller): Extension<Caller>,
    ApiJson(draft): ApiJson<AssociateDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = staff_actor(&caller)?;
    let associate = state.associates.create(&actor, draft).await?;
    Ok((StatusCode::CREATED, Json(associate)))
}

pub async fn update_associate(
    State(state): State<ApiState>,
    Extension(caller): Extension<Caller>,
    Path(key): Path<String>,
    ApiJson(draft): ApiJson<AssociateDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = staff_actor(&caller)?;
    let associate = state
        .associates
        .update(&actor, &item_key(&key), draft)
        .await?;
    Ok(Json(associate))
}

pub async fn delete_associate(
    State(state): State<ApiState>,
    Extension(caller): Extension<Caller>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = staff_actor(&caller)?;
    state.associates.delete(&actor, &item_key(&key)).await?;
    Ok(StatusCode::NO_CONTENT)
}
