//! Bulk reorder shared by every ordered collection.

use axum::Json;
use axum::extract::{Extension, State};
use axum::routing::{MethodRouter, post};

use crate::application::auth::Caller;
use crate::domain::resources::ResourceKind;

use super::staff_actor;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::extract::ApiJson;
use crate::infra::http::api::models::{ReorderRequest, ReorderResponse};
use crate::infra::http::api::state::ApiState;

pub async fn reorder_collection(
    state: ApiState,
    caller: Caller,
    kind: ResourceKind,
    payload: ReorderRequest,
) -> Result<Json<ReorderResponse>, ApiError> {
    let actor = staff_actor(&caller)?;
    let outcome = state
        .reorder
        .reorder(&actor, kind, payload.items, payload.base_version)
        .await?;
    Ok(Json(ReorderResponse {
        message: outcome.message,
        version: outcome.version,
    }))
}

/// `POST /{segment}/reorder` bound to one collection.
pub fn reorder_route(kind: ResourceKind) -> MethodRouter<ApiState> {
    post(
        move |State(state): State<ApiState>,
              Extension(caller): Extension<Caller>,
              ApiJson(payload): ApiJson<ReorderRequest>| async move {
            reorder_collection(state, caller, kind, payload).await
        },
    )
}
