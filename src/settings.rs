use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tokio::sync::RwLock;

/// One admin notification recipient. Wire shape matches the JSON stored in
/// the settings row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdminEmailConfig {
    pub id: String,
    pub email: String,
    pub name: String,
    pub is_active: bool,
    pub is_primary: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMethod {
    #[default]
    Inline,
    Separate,
    Both,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LocationConfig {
    pub delivery_method: DeliveryMethod,
    pub include_in_confirmation: bool,
    pub display_address: String,
    pub full_address: String,
    pub maps_link: String,
    pub parking_instructions: String,
    pub access_instructions: String,
    pub separate_email_subject: String,
    pub separate_email_delay_hours: u32,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            delivery_method: DeliveryMethod::Inline,
            include_in_confirmation: true,
            display_address: "Fancy Nails by Ana, Maple Row Studio".to_string(),
            full_address: "12 Maple Row, Suite 4, Portland, OR 97201".to_string(),
            maps_link: "https://maps.google.com/?q=12+Maple+Row+Portland+OR".to_string(),
            parking_instructions: "Free street parking on Maple Row after 9 AM.".to_string(),
            access_instructions: "Ring the bell for Suite 4 and take the stairs to the left."
                .to_string(),
            separate_email_subject: "Your appointment location details".to_string(),
            separate_email_delay_hours: 24,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PolicySection {
    pub title: String,
    pub items: Vec<String>,
}

/// Four named policy sections shown on the booking review step and in
/// confirmation emails.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BookingPolicies {
    pub preparation: PolicySection,
    pub cancellation: PolicySection,
    pub payment: PolicySection,
    pub studio_etiquette: PolicySection,
}

impl Default for BookingPolicies {
    fn default() -> Self {
        Self {
            preparation: PolicySection {
                title: "Before your appointment".to_string(),
                items: vec![
                    "Arrive with clean, polish-free nails when possible.".to_string(),
                    "Bring inspiration photos if you have a design in mind.".to_string(),
                ],
            },
            cancellation: PolicySection {
                title: "Cancellations".to_string(),
                items: vec![
                    "Please give at least 24 hours notice to cancel or reschedule.".to_string(),
                    "No-shows may be asked to prepay future appointments.".to_string(),
                ],
            },
            payment: PolicySection {
                title: "Payment".to_string(),
                items: vec![
                    "We accept card, cash, and all major contactless payments.".to_string(),
                    "Payment is due at the end of your appointment.".to_string(),
                ],
            },
            studio_etiquette: PolicySection {
                title: "Studio etiquette".to_string(),
                items: vec![
                    "Please arrive no more than 10 minutes early.".to_string(),
                    "Extra guests are welcome by arrangement only.".to_string(),
                ],
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudioSettings {
    pub studio_name: String,
    pub studio_phone: String,
    pub studio_email: String,
    pub website_url: String,
    pub admin_email_configs: Vec<AdminEmailConfig>,
    pub location_config: LocationConfig,
    pub booking_policies: BookingPolicies,
    pub service_notes: String,
}

impl Default for StudioSettings {
    fn default() -> Self {
        Self {
            studio_name: "Fancy Nails by Ana".to_string(),
            studio_phone: "(503) 555-0142".to_string(),
            studio_email: "hello@fancynailsbyana.com".to_string(),
            website_url: "https://fancynailsbyana.com".to_string(),
            admin_email_configs: vec![AdminEmailConfig {
                id: "default".to_string(),
                email: "ana@fancynailsbyana.com".to_string(),
                name: "Ana".to_string(),
                is_active: true,
                is_primary: true,
            }],
            location_config: LocationConfig::default(),
            booking_policies: BookingPolicies::default(),
            service_notes: String::new(),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SettingsRow {
    studio_name: String,
    studio_phone: String,
    studio_email: String,
    website_url: String,
    admin_email_configs: String,
    location_config: String,
    booking_policies: String,
    service_notes: String,
}

/// Exactly one entry may be primary. Zero primaries promotes the first
/// entry; several primaries demote all but the first encountered.
pub fn sanitize_admin_emails(configs: &mut Vec<AdminEmailConfig>) {
    if configs.is_empty() {
        return;
    }
    let mut seen_primary = false;
    for config in configs.iter_mut() {
        if config.is_primary {
            if seen_primary {
                config.is_primary = false;
            } else {
                seen_primary = true;
            }
        }
    }
    if !seen_primary {
        configs[0].is_primary = true;
    }
}

/// Parses the nested JSON columns, merging defaults over anything malformed.
/// Returns `(settings, repaired)`; `repaired` is true when any column had to
/// be replaced and the row should be written back.
fn parse_settings(row: SettingsRow) -> (StudioSettings, bool) {
    let defaults = StudioSettings::default();
    let mut repaired = false;

    let mut admin_email_configs: Vec<AdminEmailConfig> =
        match serde_json::from_str(&row.admin_email_configs) {
            Ok(configs) => configs,
            Err(err) => {
                log::warn!("Malformed admin_email_configs, restoring defaults: {err}");
                repaired = true;
                defaults.admin_email_configs.clone()
            }
        };
    let before = admin_email_configs.clone();
    sanitize_admin_emails(&mut admin_email_configs);
    if admin_email_configs != before {
        repaired = true;
    }

    let location_config: LocationConfig = match serde_json::from_str(&row.location_config) {
        Ok(config) => config,
        Err(err) => {
            log::warn!("Malformed location_config, restoring defaults: {err}");
            repaired = true;
            defaults.location_config.clone()
        }
    };

    let booking_policies: BookingPolicies = match serde_json::from_str(&row.booking_policies) {
        Ok(policies) => policies,
        Err(err) => {
            log::warn!("Malformed booking_policies, restoring defaults: {err}");
            repaired = true;
            defaults.booking_policies.clone()
        }
    };

    let settings = StudioSettings {
        studio_name: row.studio_name,
        studio_phone: row.studio_phone,
        studio_email: row.studio_email,
        website_url: row.website_url,
        admin_email_configs,
        location_config,
        booking_policies,
        service_notes: row.service_notes,
    };
    (settings, repaired)
}

/// Test seam for the repair path: feed raw JSON column values the way they
/// come out of the row.
pub fn settings_from_columns(
    admin_email_configs: &str,
    location_config: &str,
    booking_policies: &str,
) -> (StudioSettings, bool) {
    let defaults = StudioSettings::default();
    parse_settings(SettingsRow {
        studio_name: defaults.studio_name,
        studio_phone: defaults.studio_phone,
        studio_email: defaults.studio_email,
        website_url: defaults.website_url,
        admin_email_configs: admin_email_configs.to_string(),
        location_config: location_config.to_string(),
        booking_policies: booking_policies.to_string(),
        service_notes: defaults.service_notes,
    })
}

/// Loads the fixed-key settings row, creating it with defaults on first read
/// and repairing malformed nested config in place.
pub async fn load_or_create(pool: &SqlitePool) -> Result<StudioSettings, sqlx::Error> {
    let row = sqlx::query_as::<_, SettingsRow>(
        r#"SELECT studio_name, studio_phone, studio_email, website_url,
                  admin_email_configs, location_config, booking_policies, service_notes
           FROM studio_settings WHERE id = 1"#,
    )
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let (settings, repaired) = parse_settings(row);
            if repaired {
                if let Err(err) = save(pool, &settings).await {
                    log::warn!("Failed to persist repaired studio settings: {err}");
                }
            }
            Ok(settings)
        }
        None => {
            let settings = StudioSettings::default();
            save(pool, &settings).await?;
            Ok(settings)
        }
    }
}

pub async fn save(pool: &SqlitePool, settings: &StudioSettings) -> Result<(), sqlx::Error> {
    let admin_email_configs = serde_json::to_string(&settings.admin_email_configs)
        .map_err(|err| sqlx::Error::Protocol(err.to_string()))?;
    let location_config = serde_json::to_string(&settings.location_config)
        .map_err(|err| sqlx::Error::Protocol(err.to_string()))?;
    let booking_policies = serde_json::to_string(&settings.booking_policies)
        .map_err(|err| sqlx::Error::Protocol(err.to_string()))?;

    sqlx::query(
        r#"INSERT INTO studio_settings
           (id, studio_name, studio_phone, studio_email, website_url,
            admin_email_configs, location_config, booking_policies, service_notes, updated_at)
           VALUES (1, ?, ?, ?, ?, ?, ?, ?, ?, ?)
           ON CONFLICT(id) DO UPDATE SET
             studio_name = excluded.studio_name,
             studio_phone = excluded.studio_phone,
             studio_email = excluded.studio_email,
             website_url = excluded.website_url,
             admin_email_configs = excluded.admin_email_configs,
             location_config = excluded.location_config,
             booking_policies = excluded.booking_policies,
             service_notes = excluded.service_notes,
             updated_at = excluded.updated_at"#,
    )
    .bind(&settings.studio_name)
    .bind(&settings.studio_phone)
    .bind(&settings.studio_email)
    .bind(&settings.website_url)
    .bind(admin_email_configs)
    .bind(location_config)
    .bind(booking_policies)
    .bind(&settings.service_notes)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// In-process read-through cache over the settings row, invalidated on every
/// write. Replaces the local-storage mirror the admin UI used to keep.
#[derive(Clone, Default)]
pub struct SettingsCache {
    inner: Arc<RwLock<Option<StudioSettings>>>,
}

impl SettingsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, pool: &SqlitePool) -> Result<StudioSettings, sqlx::Error> {
        if let Some(settings) = self.inner.read().await.clone() {
            return Ok(settings);
        }
        let settings = load_or_create(pool).await?;
        *self.inner.write().await = Some(settings.clone());
        Ok(settings)
    }

    pub async fn invalidate(&self) {
        *self.inner.write().await = None;
    }
}
