//! Request and response bodies of the JSON API that are not domain records.

use serde::{Deserialize, Serialize};

use crate::domain::entities::AuditLogRecord;
use crate::domain::ordering::{CollectionVersion, RawReorderItem};
use crate::domain::types::ContactStatus;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ReorderRequest {
    #[serde(default)]
    pub items: Vec<RawReorderItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_version: Option<CollectionVersion>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ReorderResponse {
    pub message: String,
    pub version: CollectionVersion,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh: String,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct VerifyPaymentRequest {
    #[serde(default)]
    pub reference: String,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ContactStatusRequest {
    /// Free text so unknown values surface as `Invalid status` rather than a decode error.
    pub status: Option<String>,
}

impl ContactStatusRequest {
    pub fn new(status: ContactStatus) -> Self {
        Self {
            status: Some(status.as_str().to_string()),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ActivityResponse {
    pub items: Vec<AuditLogRecord>,
}
