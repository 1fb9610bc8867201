use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::application::auth::Caller;
use crate::application::contacts::{CONTACT_SUBMITTED_MESSAGE, ContactSubmission};
use crate::application::repos::ContactQueryFilter;

use super::{ContactListQuery, staff_actor};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::extract::{ApiJson, ApiQuery};
use crate::infra::http::api::models::{ContactStatusRequest, MessageResponse};
use crate::infra::http::api::state::ApiState;

pub async fn submit_contact(
    State(state): State<ApiState>,
    ApiJson(submission): ApiJson<ContactSubmission>,
) -> Result<impl IntoResponse, ApiError> {
    state.contacts.submit(submission).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new(CONTACT_SUBMITTED_MESSAGE)),
    ))
}

pub async fn list_contacts(
    State(state): State<ApiState>,
    Extension(caller): Extension<Caller>,
    ApiQuery(query): ApiQuery<ContactListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    caller.staff()?;
    let filter = ContactQueryFilter {
        status: query.status,
        search: query.search,
    };
    Ok(Json(state.contacts.list(&filter).await?))
}

pub async fn get_contact(
    State(state): State<ApiState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    caller.staff()?;
    Ok(Json(state.contacts.open(id).await?))
}

pub async fn update_contact_status(
    State(state): State<ApiState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<ContactStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = staff_actor(&caller)?;
    state
        .contacts
        .set_status(&actor, id, payload.status.as_deref())
        .await?;
    Ok(Json(MessageResponse::new("Contact status updated")))
}

pub async fn delete_contact(
    State(state): State<ApiState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = staff_actor(&caller)?;
    state.contacts.delete(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
