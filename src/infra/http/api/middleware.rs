use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::{ConnectInfo, MatchedPath, State};
use axum::http::{HeaderMap, HeaderValue, Request, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::debug;

use crate::application::auth::Caller;

use super::error::ApiError;
use super::state::ApiState;

/// Resolve every request to a [`Caller`]. A token that is present but unusable is
/// rejected even on routes that allow anonymous access.
pub async fn api_auth(
    State(state): State<ApiState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let caller = match extract_token(request.headers().get(header::AUTHORIZATION)) {
        Some(token) => match state.auth.authenticate(&token).await {
            Ok(caller) => caller,
            Err(err) => {
                debug!(
                    target = "lightfield::api::auth",
                    reason = %err,
                    "rejected bearer token"
                );
                return ApiError::from(err).into_response();
            }
        },
        None => Caller::Anonymous,
    };

    request.extensions_mut().insert(caller.clone());
    let mut response = next.run(request).await;
    response.extensions_mut().insert(caller);
    response
}

const UNMATCHED_ROUTE: &str = "unmatched";

pub async fn api_rate_limit(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map_or(UNMATCHED_ROUTE, MatchedPath::as_str)
        .to_string();
    let key = request
        .extensions()
        .get::<Caller>()
        .and_then(Caller::rate_key)
        .unwrap_or_else(|| anonymous_key(&request, state.rate_limiter.trusts_forwarded_for()));

    let (allowed, remaining) = state.rate_limiter.allow(&key, &route);
    if !allowed {
        return ApiError::rate_limited(state.rate_limiter.retry_after_secs());
    }

    let mut response = next.run(request).await;
    insert_number(response.headers_mut(), "x-ratelimit-limit", state.rate_limiter.limit());
    insert_number(response.headers_mut(), "x-ratelimit-remaining", remaining);
    response
}

fn anonymous_key(request: &Request<Body>, trust_forwarded_for: bool) -> String {
    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .filter(|_| trust_forwarded_for)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string);
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string());
    format!(
        "anon:{}",
        forwarded.or(peer).unwrap_or_else(|| "unknown".to_string())
    )
}

fn insert_number(headers: &mut HeaderMap, name: &'static str, value: u32) {
    if let Ok(value) = HeaderValue::from_str(&value.to_string()) {
        headers.insert(name, value);
    }
}

fn extract_token(header: Option<&HeaderValue>) -> Option<String> {
    let raw = header?.to_str().ok()?;
    let bearer = raw.strip_prefix("Bearer ")?.trim();
    if bearer.is_empty() {
        return None;
    }
    Some(bearer.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_bearer_token_only() {
        let value = HeaderValue::from_static("Bearer lfa_abc_def");
        assert_eq!(extract_token(Some(&value)).as_deref(), Some("lfa_abc_def"));
        let basic = HeaderValue::from_static("Basic Zm9v");
        assert_eq!(extract_token(Some(&basic)), None);
        let blank = HeaderValue::from_static("Bearer  ");
        assert_eq!(extract_token(Some(&blank)), None);
        assert_eq!(extract_token(None), None);
    }

    #[test]
    fn anonymous_key_uses_forwarded_for_only_when_trusted() {
        let request = Request::builder()
            .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
            .body(Body::empty())
            .expect("request");
        assert_eq!(anonymous_key(&request, true), "anon:203.0.113.9");
        assert_eq!(anonymous_key(&request, false), "anon:unknown");

        let mut peered = Request::builder()
            .header("x-forwarded-for", "198.51.100.7")
            .body(Body::empty())
            .expect("request");
        peered
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 4], 5000))));
        assert_eq!(anonymous_key(&peered, false), "anon:192.0.2.4");

        let bare = Request::builder().body(Body::empty()).expect("request");
        assert_eq!(anonymous_key(&bare, true), "anon:unknown");
    }
}
