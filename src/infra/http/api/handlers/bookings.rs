//! Booking handlers: public checkout and status lookup, staff management.

use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::application::auth::Caller;
use crate::application::bookings::{BookingAdminPatch, BookingRequest};
use crate::application::repos::BookingQueryFilter;

use super::{BookingListQuery, staff_actor};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::extract::{ApiJson, ApiQuery};
use crate::infra::http::api::models::VerifyPaymentRequest;
use crate::infra::http::api::state::ApiState;

pub async fn create_booking(
    State(state): State<ApiState>,
    ApiJson(request): ApiJson<BookingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let checkout = state.bookings.create(request).await?;
    Ok((StatusCode::CREATED, Json(checkout)))
}

pub async fn verify_payment(
    State(state): State<ApiState>,
    ApiJson(payload): ApiJson<VerifyPaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let reference = payload.reference.trim();
    if reference.is_empty() {
        return Err(ApiError::bad_request("Reference is required", None));
    }
    let view = state.bookings.verify_payment(reference).await?;
    Ok(Json(view))
}

pub async fn booking_by_reference(
    State(state): State<ApiState>,
    Path(reference): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state.bookings.status_by_reference(&reference).await?;
    Ok(Json(view))
}

pub async fn list_bookings(
    State(state): State<ApiState>,
    Extension(caller): Extension<Caller>,
    ApiQuery(query): ApiQuery<BookingListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    caller.staff()?;
    let filter = BookingQueryFilter {
        search: query.search,
        status: query.status,
        date_from: query.date_from,
        date_to: query.date_to,
        service_id: query.service_id,
    };
    Ok(Json(state.bookings.list(&filter).await?))
}

pub async fn booking_stats(
    State(state): State<ApiState>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse, ApiError> {
    caller.staff()?;
    Ok(Json(state.bookings.stats().await?))
}

pub async fn get_booking(
    State(state): State<ApiState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    caller.staff()?;
    Ok(Json(state.bookings.find(id).await?))
}

pub async fn update_booking(
    State(state): State<ApiState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
    ApiJson(patch): ApiJson<BookingAdminPatch>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = staff_actor(&caller)?;
    Ok(Json(state.bookings.update(&actor, id, patch).await?))
}
