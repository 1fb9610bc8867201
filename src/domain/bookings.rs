//! Consultation booking lifecycle.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "booking_status", rename_all = "snake_case")]
pub enum BookingStatus {
    PendingPayment,
    Paid,
    Confirmed,
    Completed,
    Cancelled,
    Refunded,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 6] = [
        BookingStatus::PendingPayment,
        BookingStatus::Paid,
        BookingStatus::Confirmed,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
        BookingStatus::Refunded,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::PendingPayment => "pending_payment",
            BookingStatus::Paid => "paid",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Refunded => "refunded",
        }
    }

    /// Statuses reachable from `self` in one step.
    pub fn allowed_transitions(self) -> &'static [BookingStatus] {
        match self {
            BookingStatus::PendingPayment => &[BookingStatus::Cancelled],
            BookingStatus::Paid => &[
                BookingStatus::Confirmed,
                BookingStatus::Cancelled,
                BookingStatus::Refunded,
            ],
            BookingStatus::Confirmed => &[
                BookingStatus::Completed,
                BookingStatus::Cancelled,
                BookingStatus::Refunded,
            ],
            BookingStatus::Completed => &[BookingStatus::Refunded],
            BookingStatus::Cancelled | BookingStatus::Refunded => &[],
        }
    }

    pub fn is_terminal(self) -> bool {
        self.allowed_transitions().is_empty()
    }

    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        self == next || self.allowed_transitions().contains(&next)
    }

    /// Validate `self → next`; a same-status request is accepted as a no-op.
    pub fn transition(self, next: BookingStatus) -> Result<BookingStatus, DomainError> {
        if self.can_transition_to(next) {
            return Ok(next);
        }

        let allowed = self.allowed_transitions();
        let listed = if allowed.is_empty() {
            "none (terminal state)".to_string()
        } else {
            allowed
                .iter()
                .map(|status| status.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };

        Err(DomainError::validation(format!(
            "Cannot transition from '{}' to '{}'. Allowed transitions: {listed}",
            self.as_str(),
            next.as_str()
        )))
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        BookingStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| format!("unknown booking status `{value}`"))
    }
}

pub const REFERENCE_PREFIX: &str = "LF-";
const REFERENCE_SUFFIX_LEN: usize = 10;

/// Generate a booking reference of the form `LF-XXXXXXXXXX` (uppercase hex).
pub fn generate_reference() -> String {
    let raw = Uuid::new_v4().simple().to_string();
    format!(
        "{REFERENCE_PREFIX}{}",
        raw[..REFERENCE_SUFFIX_LEN].to_ascii_uppercase()
    )
}

pub fn is_reference(value: &str) -> bool {
    value
        .strip_prefix(REFERENCE_PREFIX)
        .is_some_and(|suffix| {
            suffix.len() == REFERENCE_SUFFIX_LEN
                && suffix
                    .chars()
                    .all(|ch| ch.is_ascii_digit() || ch.is_ascii_uppercase())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirmed_to_completed_is_allowed() {
        assert_eq!(
            BookingStatus::Confirmed.transition(BookingStatus::Completed),
            Ok(BookingStatus::Completed)
        );
    }

    #[test]
    fn confirmed_to_paid_is_rejected_with_allowed_list() {
        let err = BookingStatus::Confirmed
            .transition(BookingStatus::Paid)
            .expect_err("reverse transition");
        assert_eq!(
            err.detail(),
            "Cannot transition from 'confirmed' to 'paid'. Allowed transitions: completed, cancelled, refunded"
        );
    }

    #[test]
    fn terminal_states_report_none() {
        let err = BookingStatus::Refunded
            .transition(BookingStatus::Paid)
            .expect_err("terminal");
        assert!(err.detail().ends_with("Allowed transitions: none (terminal state)"));
        assert!(BookingStatus::Cancelled.is_terminal());
    }

    #[test]
    fn same_status_is_a_no_op() {
        for status in BookingStatus::ALL {
            assert_eq!(status.transition(status), Ok(status));
        }
    }

    #[test]
    fn pending_payment_can_only_be_cancelled() {
        for next in BookingStatus::ALL {
            let allowed = BookingStatus::PendingPayment.can_transition_to(next);
            let expected = matches!(
                next,
                BookingStatus::PendingPayment | BookingStatus::Cancelled
            );
            assert_eq!(allowed, expected, "pending_payment -> {next}");
        }
    }

    #[test]
    fn references_have_expected_shape() {
        let reference = generate_reference();
        assert!(is_reference(&reference), "{reference}");
        assert_eq!(reference.len(), 13);
        assert!(!is_reference("LF-abc"));
    }
}
