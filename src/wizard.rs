use std::collections::HashSet;

use chrono::{Datelike, NaiveDate, Weekday};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::models::{AddOnRow, ServiceRow};

/// The six linear stages of the booking flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WizardStep {
    ServiceSelection,
    AddOnSelection,
    DateTime,
    ClientInfo,
    Review,
    Confirmation,
}

impl WizardStep {
    pub fn number(self) -> u8 {
        match self {
            WizardStep::ServiceSelection => 1,
            WizardStep::AddOnSelection => 2,
            WizardStep::DateTime => 3,
            WizardStep::ClientInfo => 4,
            WizardStep::Review => 5,
            WizardStep::Confirmation => 6,
        }
    }

    pub fn from_number(number: u8) -> Option<Self> {
        match number {
            1 => Some(WizardStep::ServiceSelection),
            2 => Some(WizardStep::AddOnSelection),
            3 => Some(WizardStep::DateTime),
            4 => Some(WizardStep::ClientInfo),
            5 => Some(WizardStep::Review),
            6 => Some(WizardStep::Confirmation),
            _ => None,
        }
    }
}

/// Frozen copy of the chosen service, captured into the booking row so later
/// catalog edits never change historical pricing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSnapshot {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub duration_minutes: i64,
}

impl From<&ServiceRow> for ServiceSnapshot {
    fn from(row: &ServiceRow) -> Self {
        Self {
            id: row.id.clone(),
            name: row.name.clone(),
            price: row.price,
            duration_minutes: row.duration_minutes,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddOnSnapshot {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub description: String,
}

impl From<&AddOnRow> for AddOnSnapshot {
    fn from(row: &AddOnRow) -> Self {
        Self {
            id: row.id.clone(),
            name: row.name.clone(),
            price: row.price,
            description: row.description.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientDetails {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub notes: String,
}

/// In-memory booking-in-progress. Nothing here is persisted until the review
/// stage confirms; backward navigation never clears entered data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingDraft {
    pub step: WizardStep,
    pub service: Option<ServiceSnapshot>,
    pub add_ons: Vec<AddOnSnapshot>,
    pub appointment_date: Option<NaiveDate>,
    pub appointment_time: Option<String>,
    pub client: ClientDetails,
}

impl Default for BookingDraft {
    fn default() -> Self {
        Self::new()
    }
}

impl BookingDraft {
    pub fn new() -> Self {
        Self {
            step: WizardStep::ServiceSelection,
            service: None,
            add_ons: Vec::new(),
            appointment_date: None,
            appointment_time: None,
            client: ClientDetails::default(),
        }
    }

    /// Stage-local validation. The add-on stage always passes: skipping with
    /// an empty selection is a valid forward transition.
    pub fn validate_step(&self, step: WizardStep) -> Vec<String> {
        let mut errors = Vec::new();
        match step {
            WizardStep::ServiceSelection => {
                if self.service.is_none() {
                    errors.push("Please select a service.".to_string());
                }
            }
            WizardStep::AddOnSelection => {}
            WizardStep::DateTime => {
                if self.appointment_date.is_none() {
                    errors.push("Please pick a date.".to_string());
                }
                match self.appointment_time.as_deref() {
                    Some(time) if !time.trim().is_empty() => {}
                    _ => errors.push("Please pick a time.".to_string()),
                }
            }
            WizardStep::ClientInfo => {
                if self.client.name.trim().is_empty() {
                    errors.push("Full name is required.".to_string());
                }
                if !is_valid_email(&self.client.email) {
                    errors.push("A valid email address is required.".to_string());
                }
                if !is_valid_phone(&self.client.phone) {
                    errors.push("A valid phone number is required.".to_string());
                }
            }
            WizardStep::Review | WizardStep::Confirmation => {}
        }
        errors
    }

    /// Every stage up to and including the review stage, revalidated before
    /// the draft is allowed to persist.
    pub fn validate_all(&self) -> Vec<String> {
        let mut errors = Vec::new();
        for step in [
            WizardStep::ServiceSelection,
            WizardStep::DateTime,
            WizardStep::ClientInfo,
        ] {
            errors.extend(self.validate_step(step));
        }
        errors
    }

    /// Forward transition; gated on the current stage's validation. The
    /// review stage only leaves forward through [`BookingDraft::confirm`].
    pub fn next(&mut self) -> Result<WizardStep, Vec<String>> {
        let errors = self.validate_step(self.step);
        if !errors.is_empty() {
            return Err(errors);
        }
        let next = match self.step {
            WizardStep::ServiceSelection => WizardStep::AddOnSelection,
            WizardStep::AddOnSelection => WizardStep::DateTime,
            WizardStep::DateTime => WizardStep::ClientInfo,
            WizardStep::ClientInfo => WizardStep::Review,
            WizardStep::Review => {
                return Err(vec!["Confirm the booking to continue.".to_string()])
            }
            WizardStep::Confirmation => {
                return Err(vec!["The booking is already confirmed.".to_string()])
            }
        };
        self.step = next;
        Ok(next)
    }

    /// Backward transition; always allowed and never discards entered data.
    pub fn prev(&mut self) -> WizardStep {
        if let Some(step) = WizardStep::from_number(self.step.number().saturating_sub(1)) {
            if self.step != WizardStep::Confirmation {
                self.step = step;
            }
        }
        self.step
    }

    /// Jump used by the review stage's edit links; only earlier stages are
    /// reachable.
    pub fn go_to_step(&mut self, target: WizardStep) -> Result<WizardStep, Vec<String>> {
        if target >= self.step {
            return Err(vec!["Only earlier steps can be revisited.".to_string()]);
        }
        self.step = target;
        Ok(target)
    }

    /// Terminal transition after the booking row insert succeeded.
    pub fn confirm(&mut self) -> Result<(), Vec<String>> {
        let errors = self.validate_all();
        if !errors.is_empty() {
            return Err(errors);
        }
        self.step = WizardStep::Confirmation;
        Ok(())
    }

    pub fn add_ons_total(&self) -> f64 {
        self.add_ons.iter().map(|add_on| add_on.price).sum()
    }

    pub fn total(&self) -> f64 {
        self.service.as_ref().map(|service| service.price).unwrap_or(0.0) + self.add_ons_total()
    }
}

pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

pub fn is_valid_phone(phone: &str) -> bool {
    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
    digits >= 7 && phone.chars().all(|c| c.is_ascii_digit() || " ()+-.".contains(c))
}

/// Formats a price for display only; totals are never recomputed from the
/// formatted string.
pub fn format_price(value: f64) -> String {
    format!("${value:.2}")
}

const CONFIRMATION_PREFIX: &str = "FNA-";
const BASE36_UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Client-generated confirmation number, regenerated on every insert attempt.
pub fn new_confirmation_number() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| BASE36_UPPER[rng.gen_range(0..BASE36_UPPER.len())] as char)
        .collect();
    format!("{CONFIRMATION_PREFIX}{suffix}")
}

/// Short capability code for review links.
pub fn new_short_code() -> String {
    let mut rng = rand::thread_rng();
    (0..6)
        .map(|_| BASE36_UPPER[rng.gen_range(0..BASE36_UPPER.len())] as char)
        .collect()
}

/// Weekly template: open Monday through Saturday 07:00-17:00 on the hour,
/// closed Sunday. The lunch slot is blacked out.
pub const DAY_SLOTS: [&str; 10] = [
    "7:00 AM", "8:00 AM", "9:00 AM", "10:00 AM", "11:00 AM", "12:00 PM", "1:00 PM", "2:00 PM",
    "3:00 PM", "4:00 PM",
];

pub const LUNCH_SLOT: &str = "1:00 PM";

/// A slot is offered iff it is in the weekly template, not the lunch slot,
/// and not in the day's booked set. This is a static lookup; the slot unique
/// index on bookings is what actually prevents double-booking.
pub fn available_slots(date: NaiveDate, booked: &HashSet<String>) -> Vec<&'static str> {
    if date.weekday() == Weekday::Sun {
        return Vec::new();
    }
    DAY_SLOTS
        .iter()
        .copied()
        .filter(|slot| *slot != LUNCH_SLOT && !booked.contains(*slot))
        .collect()
}
