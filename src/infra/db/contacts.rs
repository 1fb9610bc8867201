use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{ContactQueryFilter, ContactsRepo, NewContactParams, RepoError},
    domain::{entities::ContactRecord, types::ContactStatus},
};

use super::{PostgresRepositories, map_sqlx_error};

const CONTACT_COLUMNS: &str =
    "id, name, email, phone, subject, message, status, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ContactRow {
    id: Uuid,
    name: String,
    email: String,
    phone: Option<String>,
    subject: String,
    message: String,
    status: ContactStatus,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<ContactRow> for ContactRecord {
    fn from(row: ContactRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            subject: row.subject,
            message: row.message,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl ContactsRepo for PostgresRepositories {
    async fn create_contact(&self, params: NewContactParams) -> Result<ContactRecord, RepoError> {
        let sql = format!(
            "INSERT INTO contacts (id, name, email, phone, subject, message) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {CONTACT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ContactRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(params.name)
            .bind(params.email)
            .bind(params.phone)
            .bind(params.subject)
            .bind(params.message)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn list_contacts(
        &self,
        filter: &ContactQueryFilter,
    ) -> Result<Vec<ContactRecord>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        qb.push(CONTACT_COLUMNS);
        qb.push(" FROM contacts WHERE 1=1 ");

        if let Some(status) = filter.status {
            qb.push(" AND status = ");
            qb.push_bind(status);
        }
        Self::push_search(
            &mut qb,
            &["name", "email", "subject", "message"],
            filter.search.as_deref(),
        );
        qb.push(" ORDER BY created_at DESC");

        let rows = qb
            .build_query_as::<ContactRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(ContactRecord::from).collect())
    }

    async fn find_contact(&self, id: Uuid) -> Result<Option<ContactRecord>, RepoError> {
        let sql = format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = $1");
        let row = self.fetch_optional_by::<ContactRow, _>(&sql, id).await?;
        Ok(row.map(ContactRecord::from))
    }

    async fn update_contact_status(
        &self,
        id: Uuid,
        status: ContactStatus,
    ) -> Result<ContactRecord, RepoError> {
        let sql = format!(
            "UPDATE contacts SET status = $2, updated_at = now() WHERE id = $1 \
             RETURNING {CONTACT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ContactRow>(&sql)
            .bind(id)
            .bind(status)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?
            .ok_or(RepoError::NotFound)?;
        Ok(row.into())
    }

    async fn delete_contact(&self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM contacts WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
