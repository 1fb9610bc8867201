use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::application::bookings::{METRIC_BOOKING_CREATED_TOTAL, METRIC_PAYMENT_VERIFIED_TOTAL};
use crate::application::reorder::{METRIC_REORDER_CONFLICT_TOTAL, METRIC_REORDER_TOTAL};
use crate::config::{LogFormat, LoggingSettings};
use crate::infra::http::middleware::METRIC_HTTP_REQUEST_MS;

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_REORDER_TOTAL,
            Unit::Count,
            "Total number of accepted collection reorders."
        );
        describe_counter!(
            METRIC_REORDER_CONFLICT_TOTAL,
            Unit::Count,
            "Total number of reorders rejected for a stale base version."
        );
        describe_counter!(
            METRIC_BOOKING_CREATED_TOTAL,
            Unit::Count,
            "Total number of bookings handed off to the payment gateway."
        );
        describe_counter!(
            METRIC_PAYMENT_VERIFIED_TOTAL,
            Unit::Count,
            "Total number of booking payments verified with the gateway."
        );
        describe_histogram!(
            METRIC_HTTP_REQUEST_MS,
            Unit::Milliseconds,
            "API request latency in milliseconds."
        );
    });
}
