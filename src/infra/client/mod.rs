//! REST client for the back-office API.
//!
//! [`ApiClient`] attaches the stored access token to every request. A 401 triggers one
//! refresh exchange and a single retry; when the refresh fails the stored session is
//! cleared and [`ClientError::SessionExpired`] is returned.

mod collection;
mod error;
mod tokens;

pub use collection::HttpCollectionSource;
pub use error::{ClientError, LOGIN_PATH};
pub use tokens::{FileTokenStore, MemoryTokenStore, StoredTokens, TokenStore};

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE, ETAG, HeaderMap};
use reqwest::{Client, Method, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::application::auth::{AccessToken, SessionTokens};
use crate::domain::ordering::CollectionVersion;
use crate::infra::http::api::models::{LoginRequest, RefreshRequest};

const REFRESH_PATH: &str = "api/v1/auth/refresh";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Successful response with its headers kept for version extraction.
#[derive(Debug)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        serde_json::from_slice(&self.body).map_err(|err| ClientError::Decode(err.to_string()))
    }

    /// Collection version carried in the `ETag` header.
    pub fn version(&self) -> Option<CollectionVersion> {
        etag_version(&self.headers)
    }
}

#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base: Url,
    tokens: Arc<dyn TokenStore>,
}

impl ApiClient {
    pub fn new(base: &str, tokens: Arc<dyn TokenStore>) -> Result<Self, ClientError> {
        let base = Url::parse(base)
            .and_then(|url| url.join("/"))
            .map_err(|err| ClientError::Network(format!("invalid base URL: {err}")))?;
        let http = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|err| ClientError::Network(err.to_string()))?;
        Ok(Self { http, base, tokens })
    }

    pub fn user_agent() -> &'static str {
        concat!("lightfield-client/", env!("CARGO_PKG_VERSION"))
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    fn url(&self, path: &str, query: Option<&[(&str, String)]>) -> Result<Url, ClientError> {
        let mut url = self
            .base
            .join(path.trim_start_matches('/'))
            .map_err(|err| ClientError::Network(format!("invalid path {path}: {err}")))?;
        if let Some(pairs) = query
            && !pairs.is_empty()
        {
            let mut qp = url.query_pairs_mut();
            for (key, value) in pairs {
                qp.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Sign in and remember the issued tokens.
    pub async fn login(&self, username: &str, password: &str) -> Result<SessionTokens, ClientError> {
        let body = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let response = self
            .execute(Method::POST, "api/v1/auth/login", None, Some(encode(&body)?), None)
            .await?;
        let session: SessionTokens = response.json()?;
        self.tokens.save(&StoredTokens {
            access: session.access.clone(),
            refresh: Some(session.refresh.clone()),
        });
        info!(
            target = "lightfield::client",
            username = %session.user.username,
            "signed in"
        );
        Ok(session)
    }

    /// Revoke the refresh token (best effort) and forget the session.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let stored = self.tokens.load();
        self.tokens.clear();
        let Some(refresh) = stored.and_then(|tokens| tokens.refresh) else {
            return Ok(());
        };
        let body = RefreshRequest { refresh };
        self.execute(Method::POST, "api/v1/auth/logout", None, Some(encode(&body)?), None)
            .await
            .map(|_| ())
    }

    pub async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        query: Option<&[(&str, String)]>,
        body: Option<&B>,
    ) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(method, path, query, body).await?.json()
    }

    /// Like [`ApiClient::request`] for endpoints answering without a body.
    pub async fn request_unit<B>(
        &self,
        method: Method,
        path: &str,
        query: Option<&[(&str, String)]>,
        body: Option<&B>,
    ) -> Result<(), ClientError>
    where
        B: Serialize + ?Sized,
    {
        self.send(method, path, query, body).await.map(|_| ())
    }

    /// Authenticated request with one refresh-and-retry on 401.
    pub async fn send<B>(
        &self,
        method: Method,
        path: &str,
        query: Option<&[(&str, String)]>,
        body: Option<&B>,
    ) -> Result<ApiResponse, ClientError>
    where
        B: Serialize + ?Sized,
    {
        let payload = body.map(encode).transpose()?;
        let stored = self.tokens.load();
        let access = stored.as_ref().map(|tokens| tokens.access.clone());

        let first = self
            .execute(
                method.clone(),
                path,
                query,
                payload.clone(),
                access.as_deref(),
            )
            .await;
        match first {
            Err(ClientError::Unauthorized { message }) if !is_auth_path(path) => {
                let Some(refresh) = stored.and_then(|tokens| tokens.refresh) else {
                    return Err(ClientError::Unauthorized { message });
                };
                let access = self.refresh_access(&refresh).await?;
                debug!(target = "lightfield::client", path, "retrying after token refresh");
                self.execute(method, path, query, payload, Some(&access))
                    .await
            }
            other => other,
        }
    }

    async fn refresh_access(&self, refresh: &str) -> Result<String, ClientError> {
        let body = RefreshRequest {
            refresh: refresh.to_string(),
        };
        let outcome = match self
            .execute(Method::POST, REFRESH_PATH, None, Some(encode(&body)?), None)
            .await
        {
            Ok(response) => response.json::<AccessToken>(),
            Err(err) => Err(err),
        };
        match outcome {
            Ok(token) => {
                self.tokens.save(&StoredTokens {
                    access: token.access.clone(),
                    refresh: Some(refresh.to_string()),
                });
                Ok(token.access)
            }
            Err(ClientError::Network(detail)) => Err(ClientError::Network(detail)),
            Err(err) => {
                info!(
                    target = "lightfield::client",
                    error = %err,
                    "token refresh failed; clearing session"
                );
                self.tokens.clear();
                Err(ClientError::SessionExpired {
                    login_path: LOGIN_PATH,
                })
            }
        }
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        query: Option<&[(&str, String)]>,
        payload: Option<Vec<u8>>,
        access: Option<&str>,
    ) -> Result<ApiResponse, ClientError> {
        let url = self.url(path, query)?;
        let mut request = self
            .http
            .request(method, url)
            .header(ACCEPT, "application/json");
        if let Some(token) = access {
            request = request.bearer_auth(token);
        }
        if let Some(bytes) = payload {
            request = request.header(CONTENT_TYPE, "application/json").body(bytes);
        }

        let response = request
            .send()
            .await
            .map_err(|err| ClientError::Network(err.to_string()))?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|err| ClientError::Network(err.to_string()))?
            .to_vec();

        if status.is_success() {
            Ok(ApiResponse {
                status,
                headers,
                body,
            })
        } else {
            Err(ClientError::from_response(
                status,
                etag_version(&headers),
                &body,
            ))
        }
    }
}

fn is_auth_path(path: &str) -> bool {
    path.trim_start_matches('/').starts_with("api/v1/auth/")
}

fn encode<B: Serialize + ?Sized>(body: &B) -> Result<Vec<u8>, ClientError> {
    serde_json::to_vec(body).map_err(|err| ClientError::Decode(err.to_string()))
}

fn etag_version(headers: &HeaderMap) -> Option<CollectionVersion> {
    headers
        .get(ETAG)
        .and_then(|value| value.to_str().ok())
        .and_then(CollectionVersion::from_etag)
}
