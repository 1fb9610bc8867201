use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::{Date, OffsetDateTime, Time};
use uuid::Uuid;

use crate::{
    application::repos::{
        BookingAdminUpdate, BookingQueryFilter, BookingTotals, BookingsRepo, NewBookingParams,
        PaymentConfirmation, RepoError, ServicePopularity, StatusCount,
    },
    domain::{
        bookings::BookingStatus,
        entities::{BookingRecord, booking_service_name},
        types::Currency,
    },
};

use super::{PostgresRepositories, map_sqlx_error};

const BOOKING_SELECT: &str = "SELECT b.id, b.reference, b.service_id, s.name AS catalogue_name, \
    b.custom_service_description, b.client_name, b.client_email, b.client_phone, \
    b.client_company, b.preferred_date, b.preferred_time, b.notes, b.amount, b.currency, \
    b.status, b.payment_verified, b.payment_verified_at, b.payment_channel, \
    b.gateway_reference, b.gateway_access_code, b.admin_notes, b.assigned_associate_id, \
    a.name AS assigned_associate_name, b.created_at, b.updated_at \
    FROM bookings b \
    LEFT JOIN consultation_services s ON s.id = b.service_id \
    LEFT JOIN associates a ON a.id = b.assigned_associate_id";

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    reference: String,
    service_id: Option<Uuid>,
    catalogue_name: Option<String>,
    custom_service_description: String,
    client_name: String,
    client_email: String,
    client_phone: String,
    client_company: String,
    preferred_date: Date,
    preferred_time: Time,
    notes: String,
    amount: i64,
    currency: Currency,
    status: BookingStatus,
    payment_verified: bool,
    payment_verified_at: Option<OffsetDateTime>,
    payment_channel: Option<String>,
    gateway_reference: Option<String>,
    gateway_access_code: Option<String>,
    admin_notes: String,
    assigned_associate_id: Option<Uuid>,
    assigned_associate_name: Option<String>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<BookingRow> for BookingRecord {
    fn from(row: BookingRow) -> Self {
        Self {
            service_name: booking_service_name(
                row.catalogue_name.as_deref(),
                &row.custom_service_description,
            ),
            formatted_amount: row.currency.format_minor(row.amount),
            id: row.id,
            reference: row.reference,
            service_id: row.service_id,
            custom_service_description: row.custom_service_description,
            client_name: row.client_name,
            client_email: row.client_email,
            client_phone: row.client_phone,
            client_company: row.client_company,
            preferred_date: row.preferred_date,
            preferred_time: row.preferred_time,
            notes: row.notes,
            amount: row.amount,
            currency: row.currency,
            status: row.status,
            payment_verified: row.payment_verified,
            payment_verified_at: row.payment_verified_at,
            payment_channel: row.payment_channel,
            gateway_reference: row.gateway_reference,
            gateway_access_code: row.gateway_access_code,
            admin_notes: row.admin_notes,
            assigned_associate_id: row.assigned_associate_id,
            assigned_associate_name: row.assigned_associate_name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TotalsRow {
    total: i64,
    paid: i64,
    revenue: i64,
    pending_confirmations: i64,
}

#[derive(sqlx::FromRow)]
struct StatusCountRow {
    status: BookingStatus,
    count: i64,
}

#[derive(sqlx::FromRow)]
struct PopularityRow {
    service_name: String,
    count: i64,
}

impl PostgresRepositories {
    async fn reload_booking(&self, id: Uuid) -> Result<BookingRecord, RepoError> {
        self.find_booking(id).await?.ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl BookingsRepo for PostgresRepositories {
    async fn create_booking(&self, params: NewBookingParams) -> Result<BookingRecord, RepoError> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO bookings (id, reference, service_id, custom_service_description, \
             client_name, client_email, client_phone, client_company, preferred_date, \
             preferred_time, notes, amount, currency) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(id)
        .bind(params.reference)
        .bind(params.service_id)
        .bind(params.custom_service_description)
        .bind(params.client_name)
        .bind(params.client_email)
        .bind(params.client_phone)
        .bind(params.client_company)
        .bind(params.preferred_date)
        .bind(params.preferred_time)
        .bind(params.notes)
        .bind(params.amount)
        .bind(params.currency)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        self.reload_booking(id).await
    }

    async fn attach_gateway_session(
        &self,
        id: Uuid,
        gateway_reference: &str,
        access_code: &str,
    ) -> Result<BookingRecord, RepoError> {
        let result = sqlx::query(
            "UPDATE bookings SET gateway_reference = $2, gateway_access_code = $3, \
             updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(gateway_reference)
        .bind(access_code)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        self.reload_booking(id).await
    }

    async fn delete_booking(&self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM bookings WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn find_booking(&self, id: Uuid) -> Result<Option<BookingRecord>, RepoError> {
        let sql = format!("{BOOKING_SELECT} WHERE b.id = $1");
        let row = self.fetch_optional_by::<BookingRow, _>(&sql, id).await?;
        Ok(row.map(BookingRecord::from))
    }

    async fn find_booking_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<BookingRecord>, RepoError> {
        let sql = format!("{BOOKING_SELECT} WHERE b.reference = $1");
        let row = self
            .fetch_optional_by::<BookingRow, _>(&sql, reference.to_string())
            .await?;
        Ok(row.map(BookingRecord::from))
    }

    async fn list_bookings(
        &self,
        filter: &BookingQueryFilter,
    ) -> Result<Vec<BookingRecord>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new(BOOKING_SELECT);
        qb.push(" WHERE 1=1 ");

        if let Some(status) = filter.status {
            qb.push(" AND b.status = ");
            qb.push_bind(status);
        }
        if let Some(from) = filter.date_from {
            qb.push(" AND b.preferred_date >= ");
            qb.push_bind(from);
        }
        if let Some(to) = filter.date_to {
            qb.push(" AND b.preferred_date <= ");
            qb.push_bind(to);
        }
        if let Some(service_id) = filter.service_id {
            qb.push(" AND b.service_id = ");
            qb.push_bind(service_id);
        }
        Self::push_search(
            &mut qb,
            &["b.client_name", "b.client_email", "b.reference"],
            filter.search.as_deref(),
        );
        qb.push(" ORDER BY b.created_at DESC");

        let rows = qb
            .build_query_as::<BookingRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(BookingRecord::from).collect())
    }

    async fn mark_paid(
        &self,
        id: Uuid,
        confirmation: PaymentConfirmation,
    ) -> Result<BookingRecord, RepoError> {
        // A booking that is already verified keeps its original confirmation.
        sqlx::query(
            "UPDATE bookings SET status = $2, payment_verified = TRUE, \
             payment_verified_at = $3, payment_channel = $4, updated_at = now() \
             WHERE id = $1 AND payment_verified = FALSE",
        )
        .bind(id)
        .bind(BookingStatus::Paid)
        .bind(confirmation.verified_at)
        .bind(confirmation.channel)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        self.reload_booking(id).await
    }

    async fn update_booking(
        &self,
        id: Uuid,
        update: BookingAdminUpdate,
    ) -> Result<BookingRecord, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE bookings SET updated_at = now()");
        if let Some(change) = update.status {
            qb.push(", status = ");
            qb.push_bind(change.to);
        }
        if let Some(notes) = update.admin_notes {
            qb.push(", admin_notes = ");
            qb.push_bind(notes);
        }
        if let Some(assigned) = update.assigned_associate_id {
            qb.push(", assigned_associate_id = ");
            qb.push_bind(assigned);
        }
        qb.push(" WHERE id = ");
        qb.push_bind(id);
        if let Some(change) = update.status {
            qb.push(" AND status = ");
            qb.push_bind(change.from);
        }

        let result = qb
            .build()
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        self.reload_booking(id).await
    }

    async fn booking_totals(&self, popular_limit: u32) -> Result<BookingTotals, RepoError> {
        let totals = sqlx::query_as::<_, TotalsRow>(
            "SELECT COUNT(*) AS total, \
             COUNT(*) FILTER (WHERE payment_verified) AS paid, \
             COALESCE(SUM(amount) FILTER (WHERE payment_verified), 0)::BIGINT AS revenue, \
             COUNT(*) FILTER (WHERE status = 'paid') AS pending_confirmations \
             FROM bookings",
        )
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let statuses = sqlx::query_as::<_, StatusCountRow>(
            "SELECT status, COUNT(*) AS count FROM bookings GROUP BY status ORDER BY status",
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let popular = sqlx::query_as::<_, PopularityRow>(
            "SELECT s.name AS service_name, COUNT(*) AS count \
             FROM bookings b \
             INNER JOIN consultation_services s ON s.id = b.service_id \
             GROUP BY s.name \
             ORDER BY count DESC, s.name ASC \
             LIMIT $1",
        )
        .bind(i64::from(popular_limit))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let status_breakdown = statuses
            .into_iter()
            .map(|row| {
                Ok(StatusCount {
                    status: row.status,
                    count: Self::convert_count(row.count)?,
                })
            })
            .collect::<Result<Vec<_>, RepoError>>()?;
        let popular_services = popular
            .into_iter()
            .map(|row| {
                Ok(ServicePopularity {
                    service_name: row.service_name,
                    count: Self::convert_count(row.count)?,
                })
            })
            .collect::<Result<Vec<_>, RepoError>>()?;

        Ok(BookingTotals {
            total: Self::convert_count(totals.total)?,
            paid: Self::convert_count(totals.paid)?,
            revenue: totals.revenue,
            pending_confirmations: Self::convert_count(totals.pending_confirmations)?,
            status_breakdown,
            popular_services,
        })
    }
}
