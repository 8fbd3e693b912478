use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::SqlitePool;

use crate::models::{BookingRow, EmailTemplateRow};
use crate::settings::{DeliveryMethod, LocationConfig, SettingsCache, StudioSettings};
use crate::wizard::{format_price, AddOnSnapshot};

/// Last-resort admin recipient when the settings row carries no active ones.
pub const FALLBACK_ADMIN_EMAIL: &str = "ana@fancynailsbyana.com";

/// Inter-send delay between successive admin fan-out sends. The booking path
/// spaces sends out further to stay under the provider rate limit; the admin
/// test path only needs a token gap.
pub const BOOKING_FANOUT_DELAY: Duration = Duration::from_secs(5);
pub const TEST_FANOUT_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug)]
pub enum EmailError {
    Http(reqwest::Error),
    Api { status: u16, body: String },
}

impl fmt::Display for EmailError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmailError::Http(err) => write!(f, "http error: {err}"),
            EmailError::Api { status, body } => {
                write!(f, "email api error status={status} body={body}")
            }
        }
    }
}

impl From<reqwest::Error> for EmailError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value)
    }
}

/// Thin client for the transactional email provider. One POST per message,
/// bearer-token authenticated; the response is only checked for success.
#[derive(Clone)]
pub struct EmailClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    from_address: String,
}

impl EmailClient {
    pub fn new(api_url: String, api_key: String, from_address: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url,
            api_key,
            from_address,
        }
    }

    pub async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), EmailError> {
        let resp = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": self.from_address,
                "to": [to],
                "subject": subject,
                "html": html,
            }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(EmailError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationType {
    #[serde(rename = "confirmation")]
    Confirmation,
    #[serde(rename = "reminder-24h")]
    Reminder24h,
    #[serde(rename = "reminder-1h")]
    Reminder1h,
    #[serde(rename = "custom-reminder")]
    CustomReminder,
    #[serde(rename = "admin-notification")]
    AdminNotification,
}

pub const NOTIFICATION_TYPES: [NotificationType; 5] = [
    NotificationType::Confirmation,
    NotificationType::Reminder24h,
    NotificationType::Reminder1h,
    NotificationType::CustomReminder,
    NotificationType::AdminNotification,
];

impl NotificationType {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationType::Confirmation => "confirmation",
            NotificationType::Reminder24h => "reminder-24h",
            NotificationType::Reminder1h => "reminder-1h",
            NotificationType::CustomReminder => "custom-reminder",
            NotificationType::AdminNotification => "admin-notification",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        NOTIFICATION_TYPES
            .into_iter()
            .find(|candidate| candidate.as_str() == value)
    }

    /// Static copy used both as the render fallback and as the seed for the
    /// admin-editable template rows.
    pub fn default_copy(self) -> (&'static str, &'static str, &'static str) {
        match self {
            NotificationType::Confirmation => (
                "Your appointment is confirmed",
                "You're booked!",
                "Thank you for booking with us. Here is everything you need for your visit.",
            ),
            NotificationType::Reminder24h => (
                "Your appointment is tomorrow",
                "See you tomorrow",
                "A quick reminder that your appointment is coming up tomorrow.",
            ),
            NotificationType::Reminder1h => (
                "Your appointment starts soon",
                "Almost time",
                "Your appointment starts in about an hour.",
            ),
            NotificationType::CustomReminder => (
                "Appointment reminder",
                "Upcoming appointment",
                "A reminder about your upcoming appointment with us.",
            ),
            NotificationType::AdminNotification => (
                "New booking received",
                "New booking",
                "A new appointment was just booked through the website.",
            ),
        }
    }
}

/// Booking fields the templates interpolate. Mirrors the wire shape of the
/// send-notification request body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BookingEmail {
    pub confirmation_number: String,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: String,
    pub service_name: String,
    pub service_price: f64,
    pub add_ons: Vec<AddOnSnapshot>,
    pub add_ons_total: f64,
    pub appointment_date: String,
    pub appointment_time: String,
    pub notes: String,
}

impl BookingEmail {
    pub fn total(&self) -> f64 {
        self.service_price + self.add_ons_total
    }
}

impl From<&BookingRow> for BookingEmail {
    fn from(row: &BookingRow) -> Self {
        let add_ons: Vec<AddOnSnapshot> =
            serde_json::from_str(&row.selected_add_ons).unwrap_or_default();
        Self {
            confirmation_number: row.confirmation_number.clone(),
            client_name: row.client_name.clone(),
            client_email: row.client_email.clone(),
            client_phone: row.client_phone.clone(),
            service_name: row.service_name.clone(),
            service_price: row.service_price,
            add_ons,
            add_ons_total: row.add_ons_total,
            appointment_date: row.appointment_date.clone(),
            appointment_time: row.appointment_time.clone(),
            notes: row.notes.clone().unwrap_or_default(),
        }
    }
}

/// Caller-supplied studio fields, consulted only when the live settings row
/// leaves a field empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StudioOverride {
    pub studio_name: Option<String>,
    pub studio_phone: Option<String>,
    pub studio_email: Option<String>,
    pub website_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LocationOverride {
    pub delivery_method: Option<DeliveryMethod>,
    pub include_in_confirmation: Option<bool>,
    pub display_address: Option<String>,
    pub full_address: Option<String>,
    pub maps_link: Option<String>,
    pub parking_instructions: Option<String>,
    pub access_instructions: Option<String>,
    pub separate_email_subject: Option<String>,
    pub separate_email_delay_hours: Option<u32>,
}

/// Wire contract of the send-notification operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub booking: BookingEmail,
    #[serde(default)]
    pub admin_email: Option<String>,
    #[serde(default)]
    pub location_config: Option<LocationOverride>,
    #[serde(default)]
    pub studio_config: Option<StudioOverride>,
    #[serde(default)]
    pub hours_until: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudioProfile {
    pub studio_name: String,
    pub studio_phone: String,
    pub studio_email: String,
    pub website_url: String,
}

fn pick_field(live: Option<&str>, supplied: Option<&str>, default: &str) -> String {
    for candidate in [live, supplied] {
        if let Some(value) = candidate {
            if !value.trim().is_empty() {
                return value.to_string();
            }
        }
    }
    default.to_string()
}

/// Three-level fallback, applied per field: live settings, then the
/// caller-supplied override, then hard-coded defaults.
pub fn resolve_studio(
    settings: Option<&StudioSettings>,
    supplied: Option<&StudioOverride>,
) -> StudioProfile {
    let defaults = StudioSettings::default();
    StudioProfile {
        studio_name: pick_field(
            settings.map(|s| s.studio_name.as_str()),
            supplied.and_then(|s| s.studio_name.as_deref()),
            &defaults.studio_name,
        ),
        studio_phone: pick_field(
            settings.map(|s| s.studio_phone.as_str()),
            supplied.and_then(|s| s.studio_phone.as_deref()),
            &defaults.studio_phone,
        ),
        studio_email: pick_field(
            settings.map(|s| s.studio_email.as_str()),
            supplied.and_then(|s| s.studio_email.as_deref()),
            &defaults.studio_email,
        ),
        website_url: pick_field(
            settings.map(|s| s.website_url.as_str()),
            supplied.and_then(|s| s.website_url.as_deref()),
            &defaults.website_url,
        ),
    }
}

pub fn resolve_location(
    settings: Option<&StudioSettings>,
    supplied: Option<&LocationOverride>,
) -> LocationConfig {
    let defaults = LocationConfig::default();
    let live = settings.map(|s| &s.location_config);
    LocationConfig {
        delivery_method: live
            .map(|l| l.delivery_method)
            .or(supplied.and_then(|s| s.delivery_method))
            .unwrap_or(defaults.delivery_method),
        include_in_confirmation: live
            .map(|l| l.include_in_confirmation)
            .or(supplied.and_then(|s| s.include_in_confirmation))
            .unwrap_or(defaults.include_in_confirmation),
        display_address: pick_field(
            live.map(|l| l.display_address.as_str()),
            supplied.and_then(|s| s.display_address.as_deref()),
            &defaults.display_address,
        ),
        full_address: pick_field(
            live.map(|l| l.full_address.as_str()),
            supplied.and_then(|s| s.full_address.as_deref()),
            &defaults.full_address,
        ),
        maps_link: pick_field(
            live.map(|l| l.maps_link.as_str()),
            supplied.and_then(|s| s.maps_link.as_deref()),
            &defaults.maps_link,
        ),
        parking_instructions: pick_field(
            live.map(|l| l.parking_instructions.as_str()),
            supplied.and_then(|s| s.parking_instructions.as_deref()),
            &defaults.parking_instructions,
        ),
        access_instructions: pick_field(
            live.map(|l| l.access_instructions.as_str()),
            supplied.and_then(|s| s.access_instructions.as_deref()),
            &defaults.access_instructions,
        ),
        separate_email_subject: pick_field(
            live.map(|l| l.separate_email_subject.as_str()),
            supplied.and_then(|s| s.separate_email_subject.as_deref()),
            &defaults.separate_email_subject,
        ),
        separate_email_delay_hours: live
            .map(|l| l.separate_email_delay_hours)
            .or(supplied.and_then(|s| s.separate_email_delay_hours))
            .unwrap_or(defaults.separate_email_delay_hours),
    }
}

/// Active admin recipients, or the explicit test address, or the hard-coded
/// fallback when the settings row has none.
pub fn resolve_admin_recipients(
    settings: Option<&StudioSettings>,
    explicit: Option<&str>,
) -> Vec<String> {
    if let Some(address) = explicit {
        if !address.trim().is_empty() {
            return vec![address.trim().to_string()];
        }
    }
    let recipients: Vec<String> = settings
        .map(|s| {
            s.admin_email_configs
                .iter()
                .filter(|config| config.is_active)
                .map(|config| config.email.clone())
                .collect()
        })
        .unwrap_or_default();
    if recipients.is_empty() {
        vec![FALLBACK_ADMIN_EMAIL.to_string()]
    } else {
        recipients
    }
}

/// Location sub-block shared by every per-type template. Pure string
/// assembly; the variant is picked by the delivery method, and the
/// include-in-confirmation flag short-circuits everything else.
pub fn render_location_block(location: &LocationConfig) -> String {
    if !location.include_in_confirmation {
        return "<p>Location details will be provided separately before your appointment.</p>"
            .to_string();
    }

    let inline_block = format!(
        "<div class=\"location\">\
<h3>Where to find us</h3>\
<p><strong>{display}</strong><br>{full}</p>\
<p><a href=\"{maps}\">Open in Maps</a></p>\
<p>Parking: {parking}</p>\
<p>Access: {access}</p>\
</div>",
        display = location.display_address,
        full = location.full_address,
        maps = location.maps_link,
        parking = location.parking_instructions,
        access = location.access_instructions,
    );
    let separate_sentence = format!(
        "<p>The studio address will be sent separately about {hours} hours before your appointment.</p>",
        hours = location.separate_email_delay_hours,
    );

    match location.delivery_method {
        DeliveryMethod::Inline => inline_block,
        DeliveryMethod::Separate => separate_sentence,
        DeliveryMethod::Both => format!("{inline_block}{separate_sentence}"),
    }
}

#[derive(Debug, Clone)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
}

/// Booking fields come from the public submission form and must not be able
/// to inject markup into outbound mail.
fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn booking_details_block(booking: &BookingEmail) -> String {
    let mut add_on_items = String::new();
    for add_on in &booking.add_ons {
        add_on_items.push_str(&format!(
            "<li>{} ({})</li>",
            escape_html(&add_on.name),
            format_price(add_on.price)
        ));
    }
    let add_ons_html = if booking.add_ons.is_empty() {
        "<p>No add-ons selected.</p>".to_string()
    } else {
        format!(
            "<ul>{add_on_items}</ul><p>Add-ons total: {}</p>",
            format_price(booking.add_ons_total)
        )
    };
    let notes_html = if booking.notes.trim().is_empty() {
        String::new()
    } else {
        format!("<p>Notes: {}</p>", escape_html(&booking.notes))
    };

    format!(
        "<div class=\"details\">\
<p>Confirmation number: <strong>{number}</strong></p>\
<p>Service: {service} ({price})</p>\
{add_ons}\
<p>Total: <strong>{total}</strong></p>\
<p>Date: {date}</p>\
<p>Time: {time}</p>\
<p>Client: {name} ({email}, {phone})</p>\
{notes}\
</div>",
        number = booking.confirmation_number,
        service = escape_html(&booking.service_name),
        price = format_price(booking.service_price),
        add_ons = add_ons_html,
        total = format_price(booking.total()),
        date = escape_html(&booking.appointment_date),
        time = escape_html(&booking.appointment_time),
        name = escape_html(&booking.client_name),
        email = escape_html(&booking.client_email),
        phone = escape_html(&booking.client_phone),
        notes = notes_html,
    )
}

/// One rendering per dispatch; every recipient of the dispatch receives the
/// same document.
pub fn render_email(
    notification_type: NotificationType,
    booking: &BookingEmail,
    studio: &StudioProfile,
    location_html: &str,
    template: Option<&EmailTemplateRow>,
    hours_until: Option<i64>,
) -> RenderedEmail {
    let (default_subject, default_heading, default_intro) = notification_type.default_copy();
    let subject = template
        .map(|t| t.subject.trim())
        .filter(|s| !s.is_empty())
        .unwrap_or(default_subject)
        .to_string();
    let heading = template
        .map(|t| t.heading.trim())
        .filter(|s| !s.is_empty())
        .unwrap_or(default_heading)
        .to_string();
    let mut intro = template
        .map(|t| t.intro.trim())
        .filter(|s| !s.is_empty())
        .unwrap_or(default_intro)
        .to_string();

    if notification_type == NotificationType::CustomReminder {
        if let Some(hours) = hours_until {
            intro = format!("{intro} Your appointment is in about {hours} hours.");
        }
    }

    let html = format!(
        "<!doctype html>\
<html><body>\
<h1>{heading}</h1>\
<p>{intro}</p>\
{details}\
{location}\
<p>{studio_name}<br>{phone}<br>{email}<br><a href=\"{website}\">{website}</a></p>\
</body></html>",
        details = booking_details_block(booking),
        location = location_html,
        studio_name = studio.studio_name,
        phone = studio.studio_phone,
        email = studio.studio_email,
        website = studio.website_url,
    );

    RenderedEmail { subject, html }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipientRole {
    Client,
    Admin,
}

#[derive(Debug, Clone)]
pub struct PlannedEmail {
    pub to: String,
    pub role: RecipientRole,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendResult {
    pub recipient: String,
    pub role: RecipientRole,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
    pub success: bool,
    pub results: Vec<SendResult>,
}

/// Resolves configuration and recipients into the ordered send list: the
/// client first (every type except admin-notification), then the admin
/// fan-out (confirmation and admin-notification only).
pub fn plan_emails(
    req: &NotificationRequest,
    settings: Option<&StudioSettings>,
    template: Option<&EmailTemplateRow>,
) -> Vec<PlannedEmail> {
    let studio = resolve_studio(settings, req.studio_config.as_ref());
    let location = resolve_location(settings, req.location_config.as_ref());
    let location_html = render_location_block(&location);
    let rendered = render_email(
        req.notification_type,
        &req.booking,
        &studio,
        &location_html,
        template,
        req.hours_until,
    );

    let mut plan = Vec::new();
    if req.notification_type != NotificationType::AdminNotification
        && !req.booking.client_email.trim().is_empty()
    {
        plan.push(PlannedEmail {
            to: req.booking.client_email.clone(),
            role: RecipientRole::Client,
            subject: rendered.subject.clone(),
            html: rendered.html.clone(),
        });
    }

    if matches!(
        req.notification_type,
        NotificationType::Confirmation | NotificationType::AdminNotification
    ) {
        for recipient in resolve_admin_recipients(settings, req.admin_email.as_deref()) {
            plan.push(PlannedEmail {
                to: recipient,
                role: RecipientRole::Admin,
                subject: rendered.subject.clone(),
                html: rendered.html.clone(),
            });
        }
    }

    plan
}

async fn fetch_template(
    pool: &SqlitePool,
    notification_type: NotificationType,
) -> Option<EmailTemplateRow> {
    sqlx::query_as::<_, EmailTemplateRow>(
        "SELECT notification_type, subject, heading, intro, updated_at FROM email_templates WHERE notification_type = ?",
    )
    .bind(notification_type.as_str())
    .fetch_optional(pool)
    .await
    .unwrap_or(None)
}

/// Sends the planned emails sequentially, sleeping `fanout_delay` between
/// successive admin sends. A failed send is recorded and never aborts the
/// rest; overall success tracks the client send only.
pub async fn dispatch(
    client: &EmailClient,
    pool: &SqlitePool,
    settings_cache: &SettingsCache,
    req: &NotificationRequest,
    fanout_delay: Duration,
) -> DispatchReport {
    let settings = match settings_cache.get(pool).await {
        Ok(settings) => Some(settings),
        Err(err) => {
            log::warn!("Failed to load studio settings for notification: {err}");
            None
        }
    };
    let template = fetch_template(pool, req.notification_type).await;
    let plan = plan_emails(req, settings.as_ref(), template.as_ref());

    let mut results = Vec::new();
    let mut admin_sends = 0usize;
    for planned in plan {
        if planned.role == RecipientRole::Admin {
            if admin_sends > 0 {
                tokio::time::sleep(fanout_delay).await;
            }
            admin_sends += 1;
        }
        match client.send(&planned.to, &planned.subject, &planned.html).await {
            Ok(()) => results.push(SendResult {
                recipient: planned.to,
                role: planned.role,
                success: true,
                error: None,
            }),
            Err(err) => {
                log::warn!("Email send to {} failed: {err}", planned.to);
                results.push(SendResult {
                    recipient: planned.to,
                    role: planned.role,
                    success: false,
                    error: Some(err.to_string()),
                });
            }
        }
    }

    let success = results
        .iter()
        .filter(|result| result.role == RecipientRole::Client)
        .all(|result| result.success);
    DispatchReport { success, results }
}
