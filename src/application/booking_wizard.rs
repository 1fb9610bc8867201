//! Four-step intake flow that produces a public booking request.

use thiserror::Error;
use time::{Date, Duration, Time};
use uuid::Uuid;

use crate::application::bookings::BookingRequest;
use crate::domain::formats::TIME_FORMAT;

const MIN_CUSTOM_DESCRIPTION_CHARS: usize = 10;
const FIRST_SLOT_HOUR: u8 = 9;
const LAST_SLOT_HOUR: u8 = 17;
const SLOT_MINUTES: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WizardStep {
    Service,
    Details,
    Schedule,
    Review,
}

impl WizardStep {
    pub fn number(self) -> u8 {
        match self {
            WizardStep::Service => 1,
            WizardStep::Details => 2,
            WizardStep::Schedule => 3,
            WizardStep::Review => 4,
        }
    }

    fn next(self) -> Option<Self> {
        match self {
            WizardStep::Service => Some(WizardStep::Details),
            WizardStep::Details => Some(WizardStep::Schedule),
            WizardStep::Schedule => Some(WizardStep::Review),
            WizardStep::Review => None,
        }
    }

    fn previous(self) -> Option<Self> {
        match self {
            WizardStep::Service => None,
            WizardStep::Details => Some(WizardStep::Service),
            WizardStep::Schedule => Some(WizardStep::Details),
            WizardStep::Review => Some(WizardStep::Schedule),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceChoice {
    Catalogue(Uuid),
    Other { description: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("step {}: {message}", .step.number())]
pub struct WizardError {
    pub step: WizardStep,
    pub message: &'static str,
}

/// Contact details captured on step two.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientDetails {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub company: String,
    pub notes: String,
}

#[derive(Debug, Clone)]
pub struct BookingWizard {
    step: WizardStep,
    today: Date,
    service: Option<ServiceChoice>,
    details: ClientDetails,
    date: Option<Date>,
    slot: Option<Time>,
    terms_accepted: bool,
}

impl BookingWizard {
    pub fn new(today: Date) -> Self {
        Self {
            step: WizardStep::Service,
            today,
            service: None,
            details: ClientDetails::default(),
            date: None,
            slot: None,
            terms_accepted: false,
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    /// Earliest date the schedule step accepts.
    pub fn earliest_date(&self) -> Date {
        self.today.saturating_add(Duration::days(1))
    }

    pub fn select_service(&mut self, id: Uuid) {
        self.service = Some(ServiceChoice::Catalogue(id));
    }

    pub fn select_other(&mut self, description: impl Into<String>) {
        self.service = Some(ServiceChoice::Other {
            description: description.into(),
        });
    }

    pub fn set_details(&mut self, details: ClientDetails) {
        self.details = details;
    }

    pub fn set_schedule(&mut self, date: Date, slot: Time) {
        self.date = Some(date);
        self.slot = Some(slot);
    }

    pub fn accept_terms(&mut self, accepted: bool) {
        self.terms_accepted = accepted;
    }

    pub fn can_proceed(&self) -> bool {
        self.check(self.step).is_ok()
    }

    /// Validate the current step and move forward.
    pub fn advance(&mut self) -> Result<WizardStep, WizardError> {
        self.check(self.step)?;
        if let Some(next) = self.step.next() {
            self.step = next;
        }
        Ok(self.step)
    }

    pub fn back(&mut self) -> WizardStep {
        if let Some(previous) = self.step.previous() {
            self.step = previous;
        }
        self.step
    }

    /// Validate every step and build the request sent to `POST /bookings`.
    pub fn finish(&self) -> Result<BookingRequest, WizardError> {
        for step in [
            WizardStep::Service,
            WizardStep::Details,
            WizardStep::Schedule,
            WizardStep::Review,
        ] {
            self.check(step)?;
        }

        let (service_id, custom_service_description) = match &self.service {
            Some(ServiceChoice::Catalogue(id)) => (Some(*id), None),
            Some(ServiceChoice::Other { description }) => {
                (None, Some(description.trim().to_string()))
            }
            None => (None, None),
        };
        let preferred_time = self
            .slot
            .and_then(|slot| slot.format(TIME_FORMAT).ok());

        Ok(BookingRequest {
            service_id,
            custom_service_description,
            client_name: Some(self.details.name.trim().to_string()),
            client_email: Some(self.details.email.trim().to_string()),
            client_phone: Some(self.details.phone.trim().to_string()),
            client_company: non_empty(&self.details.company),
            preferred_date: self.date,
            preferred_time,
            notes: non_empty(&self.details.notes),
        })
    }

    fn check(&self, step: WizardStep) -> Result<(), WizardError> {
        let fail = |message: &'static str| -> Result<(), WizardError> {
            Err(WizardError { step, message })
        };
        match step {
            WizardStep::Service => match &self.service {
                Some(ServiceChoice::Catalogue(_)) => Ok(()),
                Some(ServiceChoice::Other { description })
                    if description.trim().chars().count() > MIN_CUSTOM_DESCRIPTION_CHARS =>
                {
                    Ok(())
                }
                Some(ServiceChoice::Other { .. }) => {
                    fail("Describe the consultation in more than 10 characters")
                }
                None => fail("Select a service or describe a custom consultation"),
            },
            WizardStep::Details => {
                let details = &self.details;
                if [&details.name, &details.email, &details.phone]
                    .iter()
                    .any(|value| value.trim().is_empty())
                {
                    return fail("Name, email and phone are required");
                }
                Ok(())
            }
            WizardStep::Schedule => {
                match self.date {
                    Some(date) if date >= self.earliest_date() => {}
                    Some(_) => return fail("Choose a date from tomorrow onwards"),
                    None => return fail("Choose a date"),
                }
                match self.slot {
                    Some(slot) if time_slots().contains(&slot) => Ok(()),
                    _ => fail("Choose one of the available time slots"),
                }
            }
            WizardStep::Review => {
                if self.terms_accepted {
                    Ok(())
                } else {
                    fail("Accept the terms to continue")
                }
            }
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Bookable slots: 09:00 to 17:00 every half hour.
pub fn time_slots() -> Vec<Time> {
    let mut slots = Vec::new();
    let Ok(mut slot) = Time::from_hms(FIRST_SLOT_HOUR, 0, 0) else {
        return slots;
    };
    let Ok(last) = Time::from_hms(LAST_SLOT_HOUR, 0, 0) else {
        return slots;
    };
    while slot <= last {
        slots.push(slot);
        slot += Duration::minutes(SLOT_MINUTES);
    }
    slots
}

/// `9:00 AM` style label shown for a slot.
pub fn slot_label(slot: Time) -> String {
    let (hour, minute) = (slot.hour(), slot.minute());
    let suffix = if hour < 12 { "AM" } else { "PM" };
    let display = match hour % 12 {
        0 => 12,
        other => other,
    };
    format!("{display}:{minute:02} {suffix}")
}

/// Parse a slot label such as `1:30 PM` back into a wall-clock time.
pub fn parse_slot_label(label: &str) -> Option<Time> {
    let (clock, suffix) = label.trim().split_once(' ')?;
    let (hour, minute) = clock.split_once(':')?;
    let mut hour: u8 = hour.parse().ok()?;
    let minute: u8 = minute.parse().ok()?;
    if !(1..=12).contains(&hour) {
        return None;
    }
    match suffix {
        "AM" if hour == 12 => hour = 0,
        "AM" => {}
        "PM" if hour != 12 => hour += 12,
        "PM" => {}
        _ => return None,
    }
    Time::from_hms(hour, minute, 0).ok()
}
