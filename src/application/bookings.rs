//! Consultation bookings: public checkout, payment verification and the admin desk.

use std::sync::Arc;

use metrics::counter;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use time::{Date, OffsetDateTime, Time};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::application::admin::associates::looks_like_email;
use crate::application::admin::audit::AdminAuditService;
use crate::application::payments::{GatewayError, PaymentGateway, PaymentInit, PaymentMetadata};
use crate::application::repos::{
    AssociatesRepo, BookingAdminUpdate, BookingQueryFilter, BookingTotals, BookingsRepo,
    NewBookingParams, PaymentConfirmation, RepoError, ServicePopularity, ServicesRepo,
    StatusChange, StatusCount,
};
use crate::domain::bookings::{BookingStatus, generate_reference};
use crate::domain::entities::BookingRecord;
use crate::domain::error::DomainError;
use crate::domain::formats::{clock_time, iso_date, parse_clock_time};
use crate::domain::types::Currency;

pub const METRIC_BOOKING_CREATED_TOTAL: &str = "lightfield_booking_created_total";
pub const METRIC_PAYMENT_VERIFIED_TOTAL: &str = "lightfield_payment_verified_total";

const POPULAR_SERVICES_LIMIT: u32 = 5;
const STATUS_WRITE_ATTEMPTS: u32 = 3;
const ENTITY: &str = "booking";

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("{field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
    #[error("Booking not found")]
    NotFound,
    #[error("Payment initialization failed: {0}")]
    GatewayInit(String),
    #[error("Payment verification failed: {0}")]
    GatewayVerify(String),
    #[error("Payment was not successful")]
    PaymentNotSuccessful { gateway_status: String },
    #[error("Payment amount mismatch")]
    AmountMismatch { expected: i64, received: i64 },
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl BookingError {
    fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            message: message.into(),
        }
    }
}

/// Fee applied to custom consultations that are not backed by a catalogue service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingPolicy {
    /// NGN minor units.
    pub default_fee: i64,
}

/// Public booking request as submitted by the booking wizard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookingRequest {
    pub service_id: Option<Uuid>,
    pub custom_service_description: Option<String>,
    pub client_name: Option<String>,
    pub client_email: Option<String>,
    pub client_phone: Option<String>,
    pub client_company: Option<String>,
    #[serde(with = "iso_date::option")]
    pub preferred_date: Option<Date>,
    /// `HH:MM:SS`; `HH:MM` is accepted too.
    pub preferred_time: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingCheckout {
    pub reference: String,
    pub access_code: String,
    pub authorization_url: String,
    pub amount: i64,
    pub currency: Currency,
}

/// Public view of a booking looked up by its reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingStatusView {
    pub reference: String,
    pub service_name: String,
    pub amount: i64,
    pub currency: Currency,
    pub formatted_amount: String,
    pub status: BookingStatus,
    pub payment_verified: bool,
    #[serde(with = "iso_date")]
    pub preferred_date: Date,
    #[serde(with = "clock_time")]
    pub preferred_time: Time,
    pub client_name: String,
    pub client_email: String,
}

impl From<&BookingRecord> for BookingStatusView {
    fn from(record: &BookingRecord) -> Self {
        Self {
            reference: record.reference.clone(),
            service_name: record.service_name.clone(),
            amount: record.amount,
            currency: record.currency,
            formatted_amount: record.formatted_amount.clone(),
            status: record.status,
            payment_verified: record.payment_verified,
            preferred_date: record.preferred_date,
            preferred_time: record.preferred_time,
            client_name: record.client_name.clone(),
            client_email: record.client_email.clone(),
        }
    }
}

/// Admin patch; `assigned_associate: null` unassigns, an absent key leaves it alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookingAdminPatch {
    pub status: Option<BookingStatus>,
    pub admin_notes: Option<String>,
    #[serde(
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub assigned_associate: Option<Option<Uuid>>,
}

fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<Uuid>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Uuid>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingStats {
    pub total_bookings: u64,
    pub paid_bookings: u64,
    pub revenue: i64,
    pub formatted_revenue: String,
    pub pending_confirmations: u64,
    pub status_breakdown: Vec<StatusCount>,
    pub popular_services: Vec<ServicePopularity>,
}

impl From<BookingTotals> for BookingStats {
    fn from(totals: BookingTotals) -> Self {
        Self {
            total_bookings: totals.total,
            paid_bookings: totals.paid,
            revenue: totals.revenue,
            formatted_revenue: Currency::Ngn.format_minor(totals.revenue),
            pending_confirmations: totals.pending_confirmations,
            status_breakdown: totals.status_breakdown,
            popular_services: totals.popular_services,
        }
    }
}

#[derive(Clone)]
pub struct BookingService {
    bookings: Arc<dyn BookingsRepo>,
    services: Arc<dyn ServicesRepo>,
    associates: Arc<dyn AssociatesRepo>,
    gateway: Arc<dyn PaymentGateway>,
    audit: AdminAuditService,
    policy: BookingPolicy,
}

impl BookingService {
    pub fn new(
        bookings: Arc<dyn BookingsRepo>,
        services: Arc<dyn ServicesRepo>,
        associates: Arc<dyn AssociatesRepo>,
        gateway: Arc<dyn PaymentGateway>,
        audit: AdminAuditService,
        policy: BookingPolicy,
    ) -> Self {
        Self {
            bookings,
            services,
            associates,
            gateway,
            audit,
            policy,
        }
    }

    /// Store the booking and open a payment session for it.
    ///
    /// When the gateway refuses the session the booking is removed again so no unpaid
    /// orphan remains.
    pub async fn create(&self, request: BookingRequest) -> Result<BookingCheckout, BookingError> {
        let today = OffsetDateTime::now_utc().date();
        let params = self.validate_request(request, today).await?;
        let record = self.bookings.create_booking(params).await?;

        let init = PaymentInit {
            email: record.client_email.clone(),
            amount: record.amount,
            reference: record.reference.clone(),
            metadata: PaymentMetadata {
                booking_reference: record.reference.clone(),
                service_name: record.service_name.clone(),
                client_name: record.client_name.clone(),
            },
        };

        let session = match self.gateway.initialize(init).await {
            Ok(session) => session,
            Err(err) => {
                warn!(
                    target = "lightfield::application::bookings",
                    reference = %record.reference,
                    error = %err,
                    "Payment initialization failed; discarding booking"
                );
                if let Err(cleanup) = self.bookings.delete_booking(record.id).await {
                    error!(
                        target = "lightfield::application::bookings",
                        reference = %record.reference,
                        error = %cleanup,
                        "Failed to discard booking after gateway error"
                    );
                }
                return Err(BookingError::GatewayInit(gateway_message(err)));
            }
        };

        let gateway_reference = if session.reference.is_empty() {
            record.reference.clone()
        } else {
            session.reference.clone()
        };
        let record = self
            .bookings
            .attach_gateway_session(record.id, &gateway_reference, &session.access_code)
            .await?;

        counter!(METRIC_BOOKING_CREATED_TOTAL, "currency" => record.currency.as_str())
            .increment(1);
        info!(
            target = "lightfield::application::bookings",
            reference = %record.reference,
            amount = record.amount,
            currency = record.currency.as_str(),
            "Booking created"
        );

        Ok(BookingCheckout {
            reference: record.reference,
            access_code: session.access_code,
            authorization_url: session.authorization_url,
            amount: record.amount,
            currency: record.currency,
        })
    }

    async fn validate_request(
        &self,
        request: BookingRequest,
        today: Date,
    ) -> Result<NewBookingParams, BookingError> {
        let custom = trimmed(request.custom_service_description);
        if request.service_id.is_none() && custom.is_empty() {
            return Err(BookingError::invalid(
                "non_field_errors",
                "Either a service must be selected or a custom description provided.",
            ));
        }

        let client_name = required(request.client_name, "client_name")?;
        let client_email = required(request.client_email, "client_email")?;
        if !looks_like_email(&client_email) {
            return Err(BookingError::invalid(
                "client_email",
                "Enter a valid email address.",
            ));
        }
        let client_phone = required(request.client_phone, "client_phone")?;

        let preferred_date = request
            .preferred_date
            .ok_or_else(|| BookingError::invalid("preferred_date", "This field is required."))?;
        if preferred_date <= today {
            return Err(BookingError::invalid(
                "preferred_date",
                "Preferred date must be in the future.",
            ));
        }
        let time_text = required(request.preferred_time, "preferred_time")?;
        let preferred_time = parse_clock_time(&time_text).map_err(|_| {
            BookingError::invalid(
                "preferred_time",
                "Time has wrong format. Use one of these formats instead: hh:mm[:ss].",
            )
        })?;

        let (amount, currency) = match request.service_id {
            Some(service_id) => {
                let service = self
                    .services
                    .find_service(service_id)
                    .await?
                    .filter(|service| service.is_active)
                    .ok_or_else(|| {
                        BookingError::invalid("service_id", "Selected service not found or inactive.")
                    })?;
                (service.price, service.currency)
            }
            None => (self.policy.default_fee, Currency::Ngn),
        };

        Ok(NewBookingParams {
            reference: generate_reference(),
            service_id: request.service_id,
            custom_service_description: custom,
            client_name,
            client_email,
            client_phone,
            client_company: trimmed(request.client_company),
            preferred_date,
            preferred_time,
            notes: trimmed(request.notes),
            amount,
            currency,
        })
    }

    /// Confirm payment with the gateway. Verifying an already verified booking is a no-op.
    pub async fn verify_payment(&self, reference: &str) -> Result<BookingStatusView, BookingError> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(BookingError::invalid("reference", "Reference is required"));
        }

        let booking = self
            .bookings
            .find_booking_by_reference(reference)
            .await?
            .ok_or(BookingError::NotFound)?;

        if booking.payment_verified {
            return Ok(BookingStatusView::from(&booking));
        }

        let verification = self
            .gateway
            .verify(reference)
            .await
            .map_err(|err| BookingError::GatewayVerify(gateway_message(err)))?;

        if !verification.is_success() {
            return Err(BookingError::PaymentNotSuccessful {
                gateway_status: verification.status,
            });
        }
        if verification.amount != booking.amount {
            warn!(
                target = "lightfield::application::bookings",
                reference,
                expected = booking.amount,
                received = verification.amount,
                "Gateway reported a different amount"
            );
            return Err(BookingError::AmountMismatch {
                expected: booking.amount,
                received: verification.amount,
            });
        }

        let confirmation = PaymentConfirmation {
            channel: verification.channel.filter(|channel| !channel.is_empty()),
            verified_at: OffsetDateTime::now_utc(),
        };
        let updated = self.bookings.mark_paid(booking.id, confirmation).await?;

        counter!(METRIC_PAYMENT_VERIFIED_TOTAL, "currency" => updated.currency.as_str())
            .increment(1);
        info!(
            target = "lightfield::application::bookings",
            reference,
            "Payment verified"
        );

        Ok(BookingStatusView::from(&updated))
    }

    pub async fn status_by_reference(
        &self,
        reference: &str,
    ) -> Result<BookingStatusView, BookingError> {
        self.bookings
            .find_booking_by_reference(reference.trim())
            .await?
            .map(|record| BookingStatusView::from(&record))
            .ok_or(BookingError::NotFound)
    }

    pub async fn list(&self, filter: &BookingQueryFilter) -> Result<Vec<BookingRecord>, BookingError> {
        Ok(self.bookings.list_bookings(filter).await?)
    }

    pub async fn find(&self, id: Uuid) -> Result<BookingRecord, BookingError> {
        self.bookings
            .find_booking(id)
            .await?
            .ok_or(BookingError::NotFound)
    }

    pub async fn update(
        &self,
        actor: &str,
        id: Uuid,
        patch: BookingAdminPatch,
    ) -> Result<BookingRecord, BookingError> {
        if let Some(Some(associate_id)) = patch.assigned_associate {
            let active = self
                .associates
                .find_associate(associate_id)
                .await?
                .is_some_and(|associate| associate.is_active);
            if !active {
                return Err(BookingError::invalid(
                    "assigned_associate",
                    "Associate not found or inactive.",
                ));
            }
        }

        let mut attempts = 0;
        let (existing, record) = loop {
            attempts += 1;
            let existing = self.find(id).await?;
            let status = match patch.status {
                Some(next) => Some(StatusChange {
                    from: existing.status,
                    to: existing.status.transition(next).map_err(status_error)?,
                }),
                None => None,
            };
            let update = BookingAdminUpdate {
                status,
                admin_notes: patch.admin_notes.clone(),
                assigned_associate_id: patch.assigned_associate,
            };
            match self.bookings.update_booking(id, update).await {
                Ok(record) => break (existing, record),
                // Status moved underneath us; re-validate against the new one.
                Err(RepoError::NotFound) if status.is_some() && attempts < STATUS_WRITE_ATTEMPTS => {
                    warn!(
                        target = "lightfield::application::bookings",
                        booking_id = %id,
                        from = existing.status.as_str(),
                        "Booking status changed concurrently; retrying transition"
                    );
                }
                Err(RepoError::NotFound) if status.is_some() => {
                    return Err(BookingError::invalid(
                        "status",
                        "Booking status changed concurrently. Reload and try again.",
                    ));
                }
                Err(RepoError::NotFound) => return Err(BookingError::NotFound),
                Err(err) => return Err(err.into()),
            }
        };

        let snapshot = BookingSnapshot {
            reference: &record.reference,
            from: existing.status,
            to: record.status,
            assigned_associate_id: record.assigned_associate_id,
        };
        self.audit
            .record(
                actor,
                "booking.update",
                ENTITY,
                Some(&record.id.to_string()),
                Some(&snapshot),
            )
            .await?;

        Ok(record)
    }

    pub async fn stats(&self) -> Result<BookingStats, BookingError> {
        let totals = self.bookings.booking_totals(POPULAR_SERVICES_LIMIT).await?;
        Ok(totals.into())
    }
}

#[derive(Serialize)]
struct BookingSnapshot<'a> {
    reference: &'a str,
    from: BookingStatus,
    to: BookingStatus,
    assigned_associate_id: Option<Uuid>,
}

fn status_error(err: DomainError) -> BookingError {
    BookingError::invalid("status", err.detail())
}

fn gateway_message(err: GatewayError) -> String {
    match err {
        GatewayError::Rejected(message) => message,
        other => other.to_string(),
    }
}

fn trimmed(value: Option<String>) -> String {
    value.map(|text| text.trim().to_string()).unwrap_or_default()
}

fn required(value: Option<String>, field: &'static str) -> Result<String, BookingError> {
    let text = trimmed(value);
    if text.is_empty() {
        return Err(BookingError::invalid(field, "This field is required."));
    }
    Ok(text)
}
