use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::admin::AdminError;
use crate::application::auth::{AuthError, TokenError};
use crate::application::bookings::BookingError;
use crate::application::contacts::ContactError;
use crate::application::error::ErrorReport;
use crate::application::reorder::ReorderError;
use crate::application::repos::RepoError;
use crate::domain::ordering::CollectionVersion;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const FORBIDDEN: &str = "forbidden";
    pub const NOT_FOUND: &str = "not_found";
    pub const RATE_LIMITED: &str = "rate_limited";
    pub const DUPLICATE: &str = "duplicate";
    pub const INVALID_INPUT: &str = "invalid_input";
    pub const VALIDATION: &str = "validation_error";
    pub const INTEGRITY: &str = "integrity_error";
    pub const VERSION_CONFLICT: &str = "version_conflict";
    pub const DB_TIMEOUT: &str = "db_timeout";
    pub const REPO: &str = "repo_error";
    pub const GATEWAY: &str = "payment_gateway_error";
    pub const PAYMENT_FAILED: &str = "payment_failed";
    pub const AMOUNT_MISMATCH: &str = "payment_amount_mismatch";
    pub const TOKEN_EXPIRED: &str = "token_expired";
    pub const TOKEN_REVOKED: &str = "token_revoked";
}

#[derive(Debug, Serialize)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    hint: Option<String>,
    etag: Option<CollectionVersion>,
}

impl ApiError {
    pub fn new(
        status: StatusCode,
        code: &'static str,
        message: impl Into<String>,
        hint: Option<String>,
    ) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            hint,
            etag: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn bad_request(message: impl Into<String>, hint: Option<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::BAD_REQUEST, message, hint)
    }

    /// 400 carrying a `field: message` hint.
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(
            StatusCode::BAD_REQUEST,
            codes::VALIDATION,
            message.clone(),
            Some(format!("{field}: {message}")),
        )
    }

    pub fn unauthorized() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            codes::UNAUTHORIZED,
            "Authentication credentials were not provided.",
            None,
        )
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, codes::FORBIDDEN, message, None)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, message, None)
    }

    pub fn version_conflict(current: CollectionVersion) -> Self {
        Self {
            etag: Some(current),
            ..Self::new(
                StatusCode::CONFLICT,
                codes::VERSION_CONFLICT,
                "Collection has changed since it was fetched",
                Some(format!("current version is {current}; refetch and retry")),
            )
        }
    }

    pub fn rate_limited(retry_after: u64) -> Response {
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: codes::RATE_LIMITED.to_string(),
                message: "Rate limit exceeded".to_string(),
                hint: Some(format!("Retry after {retry_after} seconds")),
            },
        };
        let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
        if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
        ErrorReport::from_message(
            "infra::http::api::rate_limit",
            StatusCode::TOO_MANY_REQUESTS,
            format!("rate_limited: retry_after={retry_after}"),
        )
        .attach(&mut response);
        response
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let detail = format!(
            "{}: {}",
            self.code,
            self.hint.as_deref().unwrap_or(&self.message)
        );
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code.to_string(),
                message: self.message,
                hint: self.hint,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        if let Some(current) = self.etag
            && let Ok(value) = HeaderValue::from_str(&current.etag())
        {
            response.headers_mut().insert(header::ETAG, value);
        }
        ErrorReport::from_message("infra::http::api", self.status, detail).attach(&mut response);
        response
    }
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Duplicate { constraint } => Self::new(
                StatusCode::CONFLICT,
                codes::DUPLICATE,
                "Duplicate record",
                Some(constraint),
            ),
            RepoError::NotFound => Self::not_found("Not found."),
            RepoError::InvalidInput { message } => Self::new(
                StatusCode::BAD_REQUEST,
                codes::INVALID_INPUT,
                "Invalid input",
                Some(message),
            ),
            RepoError::Integrity { message } => Self::new(
                StatusCode::CONFLICT,
                codes::INTEGRITY,
                "Integrity constraint violated",
                Some(message),
            ),
            RepoError::VersionConflict { current } => Self::version_conflict(current),
            RepoError::Timeout => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                codes::DB_TIMEOUT,
                "Database timeout",
                None,
            ),
            RepoError::Persistence(message) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::REPO,
                "Persistence error",
                Some(message),
            ),
        }
    }
}

impl From<AdminError> for ApiError {
    fn from(err: AdminError) -> Self {
        match err {
            AdminError::Invalid { field, message } => Self::validation(field, message),
            AdminError::NotFound { entity } => Self::not_found(format!("{} not found", capitalize(entity))),
            AdminError::Repo(repo) => repo.into(),
        }
    }
}

impl From<ReorderError> for ApiError {
    fn from(err: ReorderError) -> Self {
        match err {
            ReorderError::Invalid(message) => {
                Self::new(StatusCode::BAD_REQUEST, codes::INVALID_INPUT, message, None)
            }
            ReorderError::Conflict { current } => Self::version_conflict(current),
            ReorderError::Repo(repo) => repo.into(),
        }
    }
}

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::Invalid { field, message } => Self::validation(field, message),
            BookingError::NotFound => Self::not_found("Booking not found"),
            BookingError::GatewayInit(detail) => Self::new(
                StatusCode::BAD_GATEWAY,
                codes::GATEWAY,
                "Payment initialization failed",
                Some(detail),
            ),
            BookingError::GatewayVerify(detail) => Self::new(
                StatusCode::BAD_GATEWAY,
                codes::GATEWAY,
                "Payment verification failed",
                Some(detail),
            ),
            BookingError::PaymentNotSuccessful { gateway_status } => Self::new(
                StatusCode::BAD_REQUEST,
                codes::PAYMENT_FAILED,
                "Payment was not successful",
                Some(format!("gateway status: {gateway_status}")),
            ),
            BookingError::AmountMismatch { expected, received } => Self::new(
                StatusCode::BAD_REQUEST,
                codes::AMOUNT_MISMATCH,
                "Payment amount mismatch",
                Some(format!("expected {expected}, received {received}")),
            ),
            BookingError::Repo(repo) => repo.into(),
        }
    }
}

impl From<ContactError> for ApiError {
    fn from(err: ContactError) -> Self {
        match err {
            ContactError::Invalid { field, message } => Self::validation(field, message),
            ContactError::InvalidStatus => Self::bad_request("Invalid status", None),
            ContactError::NotFound => Self::not_found("Contact not found"),
            ContactError::Repo(repo) => repo.into(),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Missing => Self::unauthorized(),
            TokenError::Invalid => Self::new(
                StatusCode::UNAUTHORIZED,
                codes::UNAUTHORIZED,
                "Given token not valid for any token type",
                None,
            ),
            TokenError::Expired => Self::new(
                StatusCode::UNAUTHORIZED,
                codes::TOKEN_EXPIRED,
                "Token is expired",
                None,
            ),
            TokenError::Revoked => Self::new(
                StatusCode::UNAUTHORIZED,
                codes::TOKEN_REVOKED,
                "Token is blacklisted",
                None,
            ),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials => Self::bad_request(err.to_string(), None),
            AuthError::InvalidCredentials => Self::new(
                StatusCode::UNAUTHORIZED,
                codes::UNAUTHORIZED,
                err.to_string(),
                None,
            ),
            AuthError::NotStaff => Self::forbidden(err.to_string()),
            AuthError::Token(token) => token.into(),
            AuthError::Invalid { field, message } => Self::validation(field, message),
            AuthError::Repo(repo) => repo.into(),
        }
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
