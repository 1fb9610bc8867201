//! API handlers organized by resource.
//!
//! Query structs and the helpers shared by several resources live here.

mod associates;
mod auth;
mod blogs;
mod bookings;
mod categories;
mod contacts;
mod dashboard;
mod grants;
mod reorder;
mod services;
mod testimonials;

pub use associates::*;
pub use auth::*;
pub use blogs::*;
pub use bookings::*;
pub use categories::*;
pub use contacts::*;
pub use dashboard::*;
pub use grants::*;
pub use reorder::*;
pub use services::*;
pub use testimonials::*;

use std::str::FromStr;

use axum::Json;
use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use time::Date;
use uuid::Uuid;

use crate::application::admin::ItemKey;
use crate::application::auth::Caller;
use crate::application::repos::ListScope;
use crate::domain::bookings::BookingStatus;
use crate::domain::formats::iso_date;
use crate::domain::ordering::CollectionVersion;
use crate::domain::types::{ContactStatus, GrantStatus, GrantType, ServiceCategory};

use super::error::ApiError;
use super::state::ApiState;

// ----- Shared query structs -----

#[derive(Debug, Default, Deserialize)]
pub struct AssociateListQuery {
    pub search: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CategoryListQuery {
    pub search: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BlogListQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub is_featured: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TestimonialListQuery {
    pub search: Option<String>,
    pub is_featured: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GrantListQuery {
    pub search: Option<String>,
    pub grant_type: Option<GrantType>,
    pub status: Option<GrantStatus>,
    pub is_featured: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ServiceListQuery {
    pub search: Option<String>,
    pub category: Option<ServiceCategory>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BookingListQuery {
    pub search: Option<String>,
    pub status: Option<BookingStatus>,
    #[serde(default, with = "iso_date::option")]
    pub date_from: Option<Date>,
    #[serde(default, with = "iso_date::option")]
    pub date_to: Option<Date>,
    pub service_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChartQuery {
    pub days: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ContactListQuery {
    pub status: Option<ContactStatus>,
    pub search: Option<String>,
}

// ----- Shared helpers -----

/// Audit label of the staff caller; anonymous callers get 401.
pub(crate) fn staff_actor(caller: &Caller) -> Result<String, ApiError> {
    let principal = caller.staff()?;
    Ok(ApiState::actor_label(principal))
}

/// Staff see every item; everyone else only what the public site shows.
pub(crate) fn list_scope(caller: &Caller) -> ListScope {
    if caller.is_staff() {
        ListScope::Admin
    } else {
        ListScope::Public
    }
}

pub(crate) fn item_key(raw: &str) -> ItemKey {
    ItemKey::from_str(raw).unwrap_or_else(|never| match never {})
}

/// JSON listing tagged with the collection version.
pub(crate) fn versioned_json<T: Serialize>(version: CollectionVersion, body: T) -> Response {
    let mut response = Json(body).into_response();
    if let Ok(value) = HeaderValue::from_str(&version.etag()) {
        response.headers_mut().insert(header::ETAG, value);
    }
    response
}
