use std::collections::BTreeMap;

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

use crate::domain::ordering::CollectionVersion;

pub const LOGIN_PATH: &str = "/admin/login";

const GENERIC_MESSAGE: &str = "Something went wrong. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("network error: {0}")]
    Network(String),
    #[error("validation failed")]
    Validation {
        message: Option<String>,
        fields: BTreeMap<String, String>,
    },
    #[error("unauthorized")]
    Unauthorized { message: Option<String> },
    #[error("session expired; sign in again at {login_path}")]
    SessionExpired { login_path: &'static str },
    #[error("collection changed on the server")]
    Conflict {
        current_version: Option<CollectionVersion>,
    },
    #[error("server returned {status}")]
    Server { status: u16, message: Option<String> },
    #[error("could not decode response: {0}")]
    Decode(String),
}

impl ClientError {
    /// Text suitable for a toast or inline banner.
    pub fn display_message(&self) -> String {
        match self {
            ClientError::Network(_) => {
                "Network error. Please check your connection and try again.".to_string()
            }
            ClientError::Validation { message, fields } => message
                .clone()
                .or_else(|| {
                    fields
                        .iter()
                        .next()
                        .map(|(field, error)| format!("{field}: {error}"))
                })
                .unwrap_or_else(|| GENERIC_MESSAGE.to_string()),
            ClientError::Unauthorized { message } => message
                .clone()
                .unwrap_or_else(|| "You are not authorized to perform this action.".to_string()),
            ClientError::SessionExpired { .. } => {
                "Your session has expired. Please sign in again.".to_string()
            }
            ClientError::Conflict { .. } => {
                "This list was changed elsewhere. It has been reloaded.".to_string()
            }
            ClientError::Server { message, .. } => message
                .clone()
                .unwrap_or_else(|| GENERIC_MESSAGE.to_string()),
            ClientError::Decode(_) => GENERIC_MESSAGE.to_string(),
        }
    }

    /// Classify a non-success response.
    pub(crate) fn from_response(
        status: StatusCode,
        etag: Option<CollectionVersion>,
        body: &[u8],
    ) -> Self {
        let parsed = serde_json::from_slice::<Value>(body)
            .map(|value| ErrorPayload::from_value(&value))
            .unwrap_or_default();

        match status {
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => ClientError::Validation {
                message: parsed.message,
                fields: parsed.fields,
            },
            StatusCode::UNAUTHORIZED => ClientError::Unauthorized {
                message: parsed.message,
            },
            StatusCode::CONFLICT => ClientError::Conflict {
                current_version: etag,
            },
            other => ClientError::Server {
                status: other.as_u16(),
                message: parsed.message,
            },
        }
    }
}

/// Message and per-field errors extracted from an error body.
#[derive(Debug, Default, PartialEq, Eq)]
struct ErrorPayload {
    message: Option<String>,
    fields: BTreeMap<String, String>,
}

impl ErrorPayload {
    fn from_value(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::default();
        };

        let mut payload = Self::default();
        match object.get("error") {
            Some(Value::String(text)) => payload.message = Some(text.clone()),
            Some(Value::Object(envelope)) => {
                payload.message = envelope
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                if let Some((field, error)) = envelope
                    .get("hint")
                    .and_then(Value::as_str)
                    .and_then(|hint| hint.split_once(": "))
                    && envelope.get("code").and_then(Value::as_str) == Some("validation_error")
                {
                    payload.fields.insert(field.to_string(), error.to_string());
                }
            }
            _ => {}
        }
        if payload.message.is_none() {
            payload.message = ["detail", "message"]
                .iter()
                .find_map(|key| object.get(*key).and_then(Value::as_str))
                .map(str::to_string);
        }

        for (key, entry) in object {
            if matches!(key.as_str(), "error" | "detail" | "message") {
                continue;
            }
            let first = match entry {
                Value::String(text) => Some(text.clone()),
                Value::Array(items) => items.first().and_then(Value::as_str).map(str::to_string),
                _ => None,
            };
            if let Some(text) = first {
                payload.fields.insert(key.clone(), text);
            }
        }
        payload
    }
}
