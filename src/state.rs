use serde::Serialize;
use sqlx::SqlitePool;
use tokio::sync::broadcast;

use crate::mailer::EmailClient;
use crate::models::BookingRow;
use crate::settings::SettingsCache;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub events: broadcast::Sender<ServerEvent>,
    pub mailer: EmailClient,
    pub settings: SettingsCache,
}

/// Change event pushed to SSE subscribers whenever a booking or the settings
/// row changes. Subscribers refetch the affected collection themselves.
#[derive(Clone, Debug, Serialize)]
pub struct ServerEvent {
    pub kind: String,
    pub booking_id: Option<String>,
    pub confirmation_number: Option<String>,
    pub status: Option<String>,
    pub client_name: Option<String>,
    pub service_name: Option<String>,
    pub appointment_date: Option<String>,
    pub appointment_time: Option<String>,
}

impl ServerEvent {
    pub fn from_booking(kind: &str, row: &BookingRow) -> Self {
        Self {
            kind: kind.to_string(),
            booking_id: Some(row.id.clone()),
            confirmation_number: Some(row.confirmation_number.clone()),
            status: Some(row.status.clone()),
            client_name: Some(row.client_name.clone()),
            service_name: Some(row.service_name.clone()),
            appointment_date: Some(row.appointment_date.clone()),
            appointment_time: Some(row.appointment_time.clone()),
        }
    }

    pub fn settings_updated() -> Self {
        Self {
            kind: "settings_updated".to_string(),
            booking_id: None,
            confirmation_number: None,
            status: None,
            client_name: None,
            service_name: None,
            appointment_date: None,
            appointment_time: None,
        }
    }
}
