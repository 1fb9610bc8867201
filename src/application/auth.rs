//! Staff sessions: password login, opaque access/refresh tokens and request callers.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::repos::{
    AuthTokensRepo, NewAuthTokenParams, NewStaffUserParams, RepoError, StaffUsersRepo,
};
use crate::domain::entities::{AuthTokenRecord, StaffUserRecord};
use crate::domain::types::TokenKind;

const PREFIX_LEN: usize = 12;
const MIN_SECRET_LEN: usize = 32;
const SALT_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Please provide both username and password")]
    MissingCredentials,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Unauthorized access")]
    NotStaff,
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("{field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("authentication credentials were not provided")]
    Missing,
    #[error("token is invalid")]
    Invalid,
    #[error("token has expired")]
    Expired,
    #[error("token has been revoked")]
    Revoked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            access_ttl: Duration::minutes(15),
            refresh_ttl: Duration::days(7),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaffPrincipal {
    pub user_id: Uuid,
    pub username: String,
    pub is_superuser: bool,
}

/// Who is making a request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Caller {
    #[default]
    Anonymous,
    Staff(StaffPrincipal),
}

impl Caller {
    pub fn staff(&self) -> Result<&StaffPrincipal, TokenError> {
        match self {
            Caller::Staff(principal) => Ok(principal),
            Caller::Anonymous => Err(TokenError::Missing),
        }
    }

    pub fn is_staff(&self) -> bool {
        matches!(self, Caller::Staff(_))
    }

    /// Key used for per-principal rate limiting.
    pub fn rate_key(&self) -> Option<String> {
        match self {
            Caller::Staff(principal) => Some(format!("staff:{}", principal.user_id)),
            Caller::Anonymous => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTokens {
    pub access: String,
    pub refresh: String,
    pub user: StaffUserRecord,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub access: String,
}

#[derive(Debug, Clone)]
pub struct NewStaffUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub is_superuser: bool,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn StaffUsersRepo>,
    tokens: Arc<dyn AuthTokensRepo>,
    policy: SessionPolicy,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn StaffUsersRepo>,
        tokens: Arc<dyn AuthTokensRepo>,
        policy: SessionPolicy,
    ) -> Self {
        Self {
            users,
            tokens,
            policy,
        }
    }

    pub async fn create_staff_user(&self, user: NewStaffUser) -> Result<StaffUserRecord, AuthError> {
        let username = user.username.trim().to_string();
        if username.is_empty() {
            return Err(AuthError::Invalid {
                field: "username",
                message: "This field is required.".into(),
            });
        }
        if user.password.len() < 8 {
            return Err(AuthError::Invalid {
                field: "password",
                message: "Password must be at least 8 characters.".into(),
            });
        }

        let salt = generate_salt();
        let password_hash = hash_password(&salt, &user.password);
        let record = self
            .users
            .create_user(NewStaffUserParams {
                username,
                email: user.email.trim().to_string(),
                first_name: user.first_name,
                last_name: user.last_name,
                is_superuser: user.is_superuser,
                password_salt: salt,
                password_hash,
            })
            .await?;
        info!(
            target = "lightfield::application::auth",
            username = %record.username,
            "Staff user created"
        );
        Ok(record)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<SessionTokens, AuthError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let credentials = self
            .users
            .find_credentials(username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let candidate = hash_password(&credentials.password_salt, password);
        if credentials.password_hash.ct_eq(&candidate).unwrap_u8() == 0 {
            warn!(
                target = "lightfield::application::auth",
                username,
                "Rejected login with wrong password"
            );
            return Err(AuthError::InvalidCredentials);
        }
        if !credentials.user.is_back_office() {
            return Err(AuthError::NotStaff);
        }

        let user = credentials.user;
        let access = self.issue(user.id, TokenKind::Access).await?;
        let refresh = self.issue(user.id, TokenKind::Refresh).await?;
        info!(
            target = "lightfield::application::auth",
            username = %user.username,
            "Staff session opened"
        );

        Ok(SessionTokens {
            access,
            refresh,
            user,
        })
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<AccessToken, AuthError> {
        let record = self.verify(refresh_token, TokenKind::Refresh).await?;
        let user = self
            .users
            .find_user(record.user_id)
            .await?
            .filter(StaffUserRecord::is_back_office)
            .ok_or(TokenError::Invalid)?;
        let access = self.issue(user.id, TokenKind::Access).await?;
        Ok(AccessToken { access })
    }

    pub async fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        let record = self.verify(refresh_token, TokenKind::Refresh).await?;
        self.tokens
            .revoke_token(record.id, OffsetDateTime::now_utc())
            .await?;
        Ok(())
    }

    /// Resolve a bearer access token to a staff caller.
    pub async fn authenticate(&self, token: &str) -> Result<Caller, TokenError> {
        let record = self.verify(token, TokenKind::Access).await.map_err(|err| match err {
            AuthError::Token(token) => token,
            _ => TokenError::Invalid,
        })?;

        let user = self
            .users
            .find_user(record.user_id)
            .await
            .map_err(|_| TokenError::Invalid)?
            .filter(StaffUserRecord::is_back_office)
            .ok_or(TokenError::Invalid)?;

        Ok(Caller::Staff(StaffPrincipal {
            user_id: user.id,
            username: user.username,
            is_superuser: user.is_superuser,
        }))
    }

    async fn verify(&self, token: &str, expected: TokenKind) -> Result<AuthTokenRecord, AuthError> {
        let parsed = parse_token(token).ok_or(TokenError::Invalid)?;
        if parsed.kind != expected {
            return Err(TokenError::Invalid.into());
        }

        let record = self
            .tokens
            .find_token_by_prefix(&parsed.prefix)
            .await?
            .filter(|record| record.kind == expected)
            .ok_or(TokenError::Invalid)?;

        let now = OffsetDateTime::now_utc();
        if record.revoked_at.is_some_and(|revoked_at| revoked_at <= now) {
            return Err(TokenError::Revoked.into());
        }
        if record.expires_at <= now {
            return Err(TokenError::Expired.into());
        }

        let hashed_input = hash_secret(&parsed.secret);
        if record.hashed_secret.ct_eq(&hashed_input).unwrap_u8() == 0 {
            return Err(TokenError::Invalid.into());
        }

        // best-effort last_used update; do not block auth
        let tokens = self.tokens.clone();
        let id = record.id;
        tokio::spawn(async move {
            let _ = tokens.touch_token(id, now).await;
        });

        Ok(record)
    }

    async fn issue(&self, user_id: Uuid, kind: TokenKind) -> Result<String, AuthError> {
        let prefix = generate_prefix();
        let secret = generate_secret();
        let ttl = match kind {
            TokenKind::Access => self.policy.access_ttl,
            TokenKind::Refresh => self.policy.refresh_ttl,
        };

        self.tokens
            .insert_token(NewAuthTokenParams {
                user_id,
                kind,
                prefix: prefix.clone(),
                hashed_secret: hash_secret(&secret),
                expires_at: OffsetDateTime::now_utc() + ttl,
            })
            .await?;

        Ok(format!("{}_{prefix}_{secret}", kind.as_str()))
    }
}

struct ParsedToken {
    kind: TokenKind,
    prefix: String,
    secret: String,
}

fn parse_token(token: &str) -> Option<ParsedToken> {
    let mut parts = token.trim().splitn(3, '_');
    let kind = TokenKind::from_prefix(parts.next()?)?;
    let prefix = parts.next()?;
    let secret = parts.next()?;
    if prefix.len() != PREFIX_LEN || secret.len() < MIN_SECRET_LEN {
        return None;
    }
    Some(ParsedToken {
        kind,
        prefix: prefix.to_string(),
        secret: secret.to_string(),
    })
}

fn hash_secret(secret: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.finalize().to_vec()
}

fn hash_password(salt: &[u8], password: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize().to_vec()
}

fn generate_salt() -> Vec<u8> {
    Uuid::new_v4().as_bytes()[..SALT_LEN].to_vec()
}

fn generate_prefix() -> String {
    Uuid::new_v4().simple().to_string()[..PREFIX_LEN].to_string()
}

fn generate_secret() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    use crate::domain::entities::StaffCredentials;

    #[derive(Default)]
    struct MemoryAuth {
        users: Mutex<Vec<StaffCredentials>>,
        tokens: Mutex<Vec<AuthTokenRecord>>,
    }

    #[async_trait]
    impl StaffUsersRepo for MemoryAuth {
        async fn create_user(
            &self,
            params: NewStaffUserParams,
        ) -> Result<StaffUserRecord, RepoError> {
            let user = StaffUserRecord {
                id: Uuid::new_v4(),
                username: params.username,
                email: params.email,
                first_name: params.first_name,
                last_name: params.last_name,
                is_staff: true,
                is_superuser: params.is_superuser,
                date_joined: OffsetDateTime::now_utc(),
            };
            self.users.lock().unwrap().push(StaffCredentials {
                user: user.clone(),
                password_salt: params.password_salt,
                password_hash: params.password_hash,
            });
            Ok(user)
        }

        async fn find_credentials(
            &self,
            username: &str,
        ) -> Result<Option<StaffCredentials>, RepoError> {
            Ok(self
                .users
                .lock()
                .unwrap()
                .iter()
                .find(|entry| entry.user.username == username)
                .cloned())
        }

        async fn find_user(&self, id: Uuid) -> Result<Option<StaffUserRecord>, RepoError> {
            Ok(self
                .users
                .lock()
                .unwrap()
                .iter()
                .find(|entry| entry.user.id == id)
                .map(|entry| entry.user.clone()))
        }
    }

    #[async_trait]
    impl AuthTokensRepo for MemoryAuth {
        async fn insert_token(
            &self,
            params: NewAuthTokenParams,
        ) -> Result<AuthTokenRecord, RepoError> {
            let record = AuthTokenRecord {
                id: Uuid::new_v4(),
                user_id: params.user_id,
                kind: params.kind,
                prefix: params.prefix,
                hashed_secret: params.hashed_secret,
                expires_at: params.expires_at,
                revoked_at: None,
                last_used_at: None,
                created_at: OffsetDateTime::now_utc(),
            };
            self.tokens.lock().unwrap().push(record.clone());
            Ok(record)
        }

        async fn find_token_by_prefix(
            &self,
            prefix: &str,
        ) -> Result<Option<AuthTokenRecord>, RepoError> {
            Ok(self
                .tokens
                .lock()
                .unwrap()
                .iter()
                .find(|token| token.prefix == prefix)
                .cloned())
        }

        async fn revoke_token(&self, id: Uuid, revoked_at: OffsetDateTime) -> Result<(), RepoError> {
            if let Some(token) = self.tokens.lock().unwrap().iter_mut().find(|t| t.id == id) {
                token.revoked_at = Some(revoked_at);
            }
            Ok(())
        }

        async fn touch_token(&self, id: Uuid, used_at: OffsetDateTime) -> Result<(), RepoError> {
            if let Some(token) = self.tokens.lock().unwrap().iter_mut().find(|t| t.id == id) {
                token.last_used_at = Some(used_at);
            }
            Ok(())
        }
    }

    async fn service_with_admin(policy: SessionPolicy) -> AuthService {
        let store = Arc::new(MemoryAuth::default());
        let service = AuthService::new(store.clone(), store, policy);
        service
            .create_staff_user(NewStaffUser {
                username: "admin".into(),
                email: "admin@example.com".into(),
                first_name: "Ada".into(),
                last_name: "Obi".into(),
                password: "correct horse".into(),
                is_superuser: true,
            })
            .await
            .expect("create admin");
        service
    }

    #[tokio::test]
    async fn login_issues_working_tokens() {
        let service = service_with_admin(SessionPolicy::default()).await;
        let session = service.login("admin", "correct horse").await.expect("login");

        assert!(session.access.starts_with("access_"));
        assert!(session.refresh.starts_with("refresh_"));
        let caller = service.authenticate(&session.access).await.expect("caller");
        assert_eq!(caller.staff().unwrap().username, "admin");

        assert_eq!(
            service.authenticate(&session.refresh).await,
            Err(TokenError::Invalid)
        );
    }

    #[tokio::test]
    async fn login_failures() {
        let service = service_with_admin(SessionPolicy::default()).await;
        assert!(matches!(
            service.login("admin", "").await,
            Err(AuthError::MissingCredentials)
        ));
        assert!(matches!(
            service.login("admin", "wrong").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            service.login("nobody", "correct horse").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn refresh_and_logout() {
        let service = service_with_admin(SessionPolicy::default()).await;
        let session = service.login("admin", "correct horse").await.expect("login");

        let renewed = service.refresh(&session.refresh).await.expect("refresh");
        assert!(service.authenticate(&renewed.access).await.is_ok());

        service.logout(&session.refresh).await.expect("logout");
        assert!(matches!(
            service.refresh(&session.refresh).await,
            Err(AuthError::Token(TokenError::Revoked))
        ));
    }

    #[tokio::test]
    async fn expired_access_tokens_are_rejected() {
        let service = service_with_admin(SessionPolicy {
            access_ttl: Duration::seconds(-1),
            refresh_ttl: Duration::days(7),
        })
        .await;
        let session = service.login("admin", "correct horse").await.expect("login");
        assert_eq!(
            service.authenticate(&session.access).await,
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn malformed_tokens_do_not_parse() {
        assert!(parse_token("garbage").is_none());
        assert!(parse_token("access_short_secret").is_none());
        assert!(parse_token("bearer_0123456789ab_0123456789abcdef0123456789abcdef").is_none());
        assert!(parse_token("access_0123456789ab_0123456789abcdef0123456789abcdef").is_some());
    }
}
