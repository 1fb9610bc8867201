use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{
        AuthTokensRepo, NewAuthTokenParams, NewStaffUserParams, RepoError, StaffUsersRepo,
    },
    domain::{
        entities::{AuthTokenRecord, StaffCredentials, StaffUserRecord},
        types::TokenKind,
    },
};

use super::{PostgresRepositories, map_sqlx_error};

const USER_COLUMNS: &str =
    "id, username, email, first_name, last_name, is_staff, is_superuser, date_joined";

const TOKEN_COLUMNS: &str = "id, user_id, kind, prefix, hashed_secret, expires_at, revoked_at, \
    last_used_at, created_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    first_name: String,
    last_name: String,
    is_staff: bool,
    is_superuser: bool,
    date_joined: OffsetDateTime,
}

impl From<UserRow> for StaffUserRecord {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            is_staff: row.is_staff,
            is_superuser: row.is_superuser,
            date_joined: row.date_joined,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CredentialsRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_salt: Vec<u8>,
    password_hash: Vec<u8>,
}

#[derive(sqlx::FromRow)]
struct TokenRow {
    id: Uuid,
    user_id: Uuid,
    kind: TokenKind,
    prefix: String,
    hashed_secret: Vec<u8>,
    expires_at: OffsetDateTime,
    revoked_at: Option<OffsetDateTime>,
    last_used_at: Option<OffsetDateTime>,
    created_at: OffsetDateTime,
}

impl From<TokenRow> for AuthTokenRecord {
    fn from(row: TokenRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            kind: row.kind,
            prefix: row.prefix,
            hashed_secret: row.hashed_secret,
            expires_at: row.expires_at,
            revoked_at: row.revoked_at,
            last_used_at: row.last_used_at,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl StaffUsersRepo for PostgresRepositories {
    async fn create_user(&self, params: NewStaffUserParams) -> Result<StaffUserRecord, RepoError> {
        let sql = format!(
            "INSERT INTO staff_users (id, username, email, first_name, last_name, is_staff, \
             is_superuser, password_salt, password_hash) \
             VALUES ($1, $2, $3, $4, $5, TRUE, $6, $7, $8) RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(params.username)
            .bind(params.email)
            .bind(params.first_name)
            .bind(params.last_name)
            .bind(params.is_superuser)
            .bind(params.password_salt)
            .bind(params.password_hash)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn find_credentials(
        &self,
        username: &str,
    ) -> Result<Option<StaffCredentials>, RepoError> {
        let sql = format!(
            "SELECT {USER_COLUMNS}, password_salt, password_hash \
             FROM staff_users WHERE username = $1"
        );
        let row = self
            .fetch_optional_by::<CredentialsRow, _>(&sql, username.to_string())
            .await?;
        Ok(row.map(|row| StaffCredentials {
            user: row.user.into(),
            password_salt: row.password_salt,
            password_hash: row.password_hash,
        }))
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<StaffUserRecord>, RepoError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM staff_users WHERE id = $1");
        let row = self.fetch_optional_by::<UserRow, _>(&sql, id).await?;
        Ok(row.map(StaffUserRecord::from))
    }
}

#[async_trait]
impl AuthTokensRepo for PostgresRepositories {
    async fn insert_token(
        &self,
        params: NewAuthTokenParams,
    ) -> Result<AuthTokenRecord, RepoError> {
        let sql = format!(
            "INSERT INTO auth_tokens (id, user_id, kind, prefix, hashed_secret, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {TOKEN_COLUMNS}"
        );
        let row = sqlx::query_as::<_, TokenRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(params.user_id)
            .bind(params.kind)
            .bind(params.prefix)
            .bind(params.hashed_secret)
            .bind(params.expires_at)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn find_token_by_prefix(
        &self,
        prefix: &str,
    ) -> Result<Option<AuthTokenRecord>, RepoError> {
        let sql = format!("SELECT {TOKEN_COLUMNS} FROM auth_tokens WHERE prefix = $1");
        let row = self
            .fetch_optional_by::<TokenRow, _>(&sql, prefix.to_string())
            .await?;
        Ok(row.map(AuthTokenRecord::from))
    }

    async fn revoke_token(&self, id: Uuid, revoked_at: OffsetDateTime) -> Result<(), RepoError> {
        sqlx::query(
            "UPDATE auth_tokens SET revoked_at = COALESCE(revoked_at, $2) WHERE id = $1",
        )
        .bind(id)
        .bind(revoked_at)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn touch_token(&self, id: Uuid, used_at: OffsetDateTime) -> Result<(), RepoError> {
        sqlx::query("UPDATE auth_tokens SET last_used_at = $2 WHERE id = $1")
            .bind(id)
            .bind(used_at)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}
