use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::admin::categories::CategoryDraft;
use crate::application::auth::Caller;
use crate::application::repos::CategoryQueryFilter;
use crate::domain::resources::ResourceKind;

use super::{CategoryListQuery, item_key, staff_actor, versioned_json};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::extract::{ApiJson, ApiQuery};
use crate::infra::http::api::state::ApiState;

pub async fn list_categories(
    State(state): State<ApiState>,
    ApiQuery(query): ApiQuery<CategoryListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let version = state
        .reorder
        .current_version(ResourceKind::Categories)
        .await?;
    let filter = CategoryQueryFilter {
        search: query.search,
    };
    let items = state.categories.list(&filter).await?;
    Ok(versioned_json(version, items))
}

pub async fn get_category(
    State(state): State<ApiState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let category = state
        .categories
        .find(&item_key(&key))
        .await?
        .ok_or_else(|| ApiError::not_found("Category not found"))?;
    Ok(Json(category))
}

pub async fn create_category(
    State(state): State<ApiState>,
    Extension(caller): Extension<Caller>,
    ApiJson(draft): ApiJson<CategoryDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = staff_actor(&caller)?;
    let category = state.categories.create(&actor, draft).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    State(state): State<ApiState>,
    Extension(caller): Extension<Caller>,
    Path(key): Path<String>,
    ApiJson(draft): ApiJson<CategoryDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = staff_actor(&caller)?;
    let category = state
        .categories
        .update(&actor, &item_key(&key), draft)
        .await?;
    Ok(Json(category))
}

pub async fn delete_category(
    State(state): State<ApiState>,
    Extension(caller): Extension<Caller>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = staff_actor(&caller)?;
    state.categories.delete(&actor, &item_key(&key)).await?;
    Ok(StatusCode::NO_CONTENT)
}
