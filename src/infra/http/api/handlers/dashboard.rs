use axum::Json;
use axum::extract::{Extension, State};
use axum::response::IntoResponse;

use crate::application::auth::Caller;

use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::extract::ApiQuery;
use crate::infra::http::api::models::ActivityResponse;
use crate::infra::http::api::state::ApiState;

use super::ChartQuery;

pub async fn dashboard_stats(
    State(state): State<ApiState>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse, ApiError> {
    caller.staff()?;
    Ok(Json(state.dashboard.stats().await?))
}

pub async fn dashboard_activity(
    State(state): State<ApiState>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse, ApiError> {
    caller.staff()?;
    let items = state.dashboard.recent_activity().await?;
    Ok(Json(ActivityResponse { items }))
}

pub async fn dashboard_views_over_time(
    State(state): State<ApiState>,
    Extension(caller): Extension<Caller>,
    ApiQuery(query): ApiQuery<ChartQuery>,
) -> Result<impl IntoResponse, ApiError> {
    caller.staff()?;
    Ok(Json(state.dashboard.views_over_time(query.days).await?))
}

pub async fn dashboard_posts_over_time(
    State(state): State<ApiState>,
    Extension(caller): Extension<Caller>,
    ApiQuery(query): ApiQuery<ChartQuery>,
) -> Result<impl IntoResponse, ApiError> {
    caller.staff()?;
    Ok(Json(state.dashboard.posts_over_time(query.days).await?))
}

pub async fn dashboard_posts_by_category(
    State(state): State<ApiState>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse, ApiError> {
    caller.staff()?;
    Ok(Json(state.dashboard.posts_by_category().await?))
}

pub async fn dashboard_contacts_by_status(
    State(state): State<ApiState>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse, ApiError> {
    caller.staff()?;
    Ok(Json(state.dashboard.contacts_by_status().await?))
}
