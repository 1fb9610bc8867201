//! Postgres-backed repository implementations.

mod associates;
mod audit;
mod blogs;
mod bookings;
mod categories;
mod contacts;
mod dashboard;
mod grants;
mod services;
mod testimonials;
mod users;
mod util;
mod versions;

pub use util::map_sqlx_error;

use std::sync::Arc;

use sqlx::{
    Encode, FromRow, Postgres, QueryBuilder, Transaction, Type,
    postgres::{PgPool, PgPoolOptions, PgRow},
    query,
};
use uuid::Uuid;

use crate::application::repos::RepoError;
use crate::domain::ordering::CollectionVersion;
use crate::domain::resources::ResourceKind;

#[derive(Clone)]
pub struct PostgresRepositories {
    pool: Arc<PgPool>,
}

impl PostgresRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn begin(&self) -> Result<Transaction<'_, Postgres>, RepoError> {
        self.pool.begin().await.map_err(map_sqlx_error)
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(pool).await
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        query("SELECT 1").execute(self.pool()).await.map(|_| ())
    }

    /// Fetch at most one row matching `sql`, whose only parameter is `value`.
    async fn fetch_optional_by<R, T>(&self, sql: &str, value: T) -> Result<Option<R>, RepoError>
    where
        R: for<'r> FromRow<'r, PgRow> + Send + Unpin,
        T: for<'q> Encode<'q, Postgres> + Type<Postgres> + Send + 'static,
    {
        sqlx::query_as::<_, R>(sql)
            .bind(value)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)
    }

    /// `AND (a ILIKE $n OR b ILIKE $n ...)` for a non-blank search term.
    fn push_search<'q>(
        qb: &mut QueryBuilder<'q, Postgres>,
        columns: &[&'static str],
        search: Option<&str>,
    ) {
        let Some(term) = search.map(str::trim).filter(|term| !term.is_empty()) else {
            return;
        };
        let pattern = format!("%{term}%");
        qb.push(" AND (");
        for (index, column) in columns.iter().enumerate() {
            if index > 0 {
                qb.push(" OR ");
            }
            qb.push(*column);
            qb.push(" ILIKE ");
            qb.push_bind(pattern.clone());
        }
        qb.push(")");
    }

    fn convert_count(value: i64) -> Result<u64, RepoError> {
        value
            .try_into()
            .map_err(|_| RepoError::from_persistence("count exceeds supported range"))
    }
}

fn convert_version(value: i64) -> Result<CollectionVersion, RepoError> {
    u64::try_from(value)
        .map(CollectionVersion)
        .map_err(|_| RepoError::from_persistence("collection version is negative"))
}

/// Increment the collection version inside the caller's transaction.
async fn bump_version(
    tx: &mut Transaction<'_, Postgres>,
    kind: ResourceKind,
) -> Result<CollectionVersion, RepoError> {
    let version: i64 = sqlx::query_scalar(
        "UPDATE collection_versions SET version = version + 1 WHERE kind = $1 RETURNING version",
    )
    .bind(kind)
    .fetch_one(&mut **tx)
    .await
    .map_err(map_sqlx_error)?;
    convert_version(version)
}

/// Lock a row of the collection and return its current priority.
async fn lock_priority(
    tx: &mut Transaction<'_, Postgres>,
    kind: ResourceKind,
    id: Uuid,
) -> Result<i32, RepoError> {
    let sql = format!(
        "SELECT order_priority FROM {} WHERE id = $1 FOR UPDATE",
        kind.table()
    );
    sqlx::query_scalar::<_, i32>(&sql)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(map_sqlx_error)?
        .ok_or(RepoError::NotFound)
}

/// Delete a row of the collection and bump its version in one transaction.
async fn delete_versioned(
    repos: &PostgresRepositories,
    kind: ResourceKind,
    id: Uuid,
) -> Result<(), RepoError> {
    let mut tx = repos.begin().await?;
    let sql = format!("DELETE FROM {} WHERE id = $1", kind.table());
    let result = sqlx::query(&sql)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;
    if result.rows_affected() == 0 {
        return Err(RepoError::NotFound);
    }
    bump_version(&mut tx, kind).await?;
    tx.commit().await.map_err(map_sqlx_error)
}
