//! Blog post handlers. Anonymous detail reads count a view.

use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::admin::blogs::BlogPostDraft;
use crate::application::auth::Caller;
use crate::application::repos::BlogQueryFilter;
use crate::domain::resources::ResourceKind;

use super::{BlogListQuery, item_key, list_scope, staff_actor, versioned_json};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::extract::{ApiJson, ApiQuery};
use crate::infra::http::api::state::ApiState;

pub async fn list_blogs(
    State(state): State<ApiState>,
    Extension(caller): Extension<Caller>,
    ApiQuery(query): ApiQuery<BlogListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let version = state.reorder.current_version(ResourceKind::Blogs).await?;
    let filter = BlogQueryFilter {
        search: query.search,
        category: query.category,
        is_featured: query.is_featured,
    };
    let items = state.blogs.list(list_scope(&caller), &filter).await?;
    Ok(versioned_json(version, items))
}

pub async fn get_blog(
    State(state): State<ApiState>,
    Extension(caller): Extension<Caller>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let key = item_key(&key);
    let post = if caller.is_staff() {
        state
            .blogs
            .find(&key)
            .await?
            .ok_or_else(|| ApiError::not_found("Blog not found"))?
    } else {
        state.blogs.read_public(&key).await?
    };
    Ok(Json(post))
}

pub async fn create_blog(
    State(state): State<ApiState>,
    Extension(caller): Extension<Caller>,
    ApiJson(draft): ApiJson<BlogPostDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = caller.staff()?;
    let actor = ApiState::actor_label(principal);
    let post = state
        .blogs
        .create(&actor, principal.user_id, draft)
        .await?;
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn update_blog(
    State(state): State<ApiState>,
    Extension(caller): Extension<Caller>,
    Path(key): Path<String>,
    ApiJson(draft): ApiJson<BlogPostDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = staff_actor(&caller)?;
    let post = state.blogs.update(&actor, &item_key(&key), draft).await?;
    Ok(Json(post))
}

pub async fn delete_blog(
    State(state): State<ApiState>,
    Extension(caller): Extension<Caller>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = staff_actor(&caller)?;
    state.blogs.delete(&actor, &item_key(&key)).await?;
    Ok(StatusCode::NO_CONTENT)
}
