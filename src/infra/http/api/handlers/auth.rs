//! Session handlers

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;

use crate::application::auth::AuthError;

use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::extract::ApiJson;
use crate::infra::http::api::models::{LoginRequest, MessageResponse, RefreshRequest};
use crate::infra::http::api::state::ApiState;

pub async fn login(
    State(state): State<ApiState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state
        .auth
        .login(payload.username.trim(), &payload.password)
        .await?;
    Ok(Json(session))
}

pub async fn refresh(
    State(state): State<ApiState>,
    ApiJson(payload): ApiJson<RefreshRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let token = payload.refresh.trim();
    if token.is_empty() {
        return Err(AuthError::Invalid {
            field: "refresh",
            message: "This field is required.".into(),
        }
        .into());
    }
    Ok(Json(state.auth.refresh(token).await?))
}

pub async fn logout(
    State(state): State<ApiState>,
    ApiJson(payload): ApiJson<RefreshRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let token = payload.refresh.trim();
    if token.is_empty() {
        return Err(ApiError::bad_request("Refresh token is required", None));
    }
    state.auth.logout(token).await?;
    Ok(Json(MessageResponse::new("Successfully logged out")))
}
