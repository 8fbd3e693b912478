use fna_studio::mailer::{
    plan_emails, render_email, render_location_block, resolve_admin_recipients, resolve_location,
    resolve_studio, BookingEmail, LocationOverride, NotificationRequest, NotificationType,
    RecipientRole, StudioOverride, FALLBACK_ADMIN_EMAIL,
};
use fna_studio::models::EmailTemplateRow;
use fna_studio::settings::{
    AdminEmailConfig, DeliveryMethod, LocationConfig, StudioSettings,
};
use fna_studio::wizard::AddOnSnapshot;

fn booking() -> BookingEmail {
    BookingEmail {
        confirmation_number: "FNA-A1B2C3D4E".to_string(),
        client_name: "Robin Doe".to_string(),
        client_email: "robin@example.com".to_string(),
        client_phone: "(503) 555-0101".to_string(),
        service_name: "Luxury Spa Pedicure".to_string(),
        service_price: 65.0,
        add_ons: vec![
            AddOnSnapshot {
                id: "a1".to_string(),
                name: "Nail Art Accent".to_string(),
                price: 15.0,
                description: String::new(),
            },
            AddOnSnapshot {
                id: "a2".to_string(),
                name: "Chrome Finish".to_string(),
                price: 35.0,
                description: String::new(),
            },
        ],
        add_ons_total: 50.0,
        appointment_date: "2026-09-01".to_string(),
        appointment_time: "10:00 AM".to_string(),
        notes: String::new(),
    }
}

fn request(notification_type: NotificationType) -> NotificationRequest {
    NotificationRequest {
        notification_type,
        booking: booking(),
        admin_email: None,
        location_config: None,
        studio_config: None,
        hours_until: None,
    }
}

fn settings_with_admins(configs: Vec<AdminEmailConfig>) -> StudioSettings {
    StudioSettings {
        admin_email_configs: configs,
        ..StudioSettings::default()
    }
}

fn admin(email: &str, is_active: bool) -> AdminEmailConfig {
    AdminEmailConfig {
        id: email.to_string(),
        email: email.to_string(),
        name: email.to_string(),
        is_active,
        is_primary: false,
    }
}

#[test]
fn location_block_fallback_when_not_included() {
    let location = LocationConfig {
        include_in_confirmation: false,
        delivery_method: DeliveryMethod::Inline,
        ..LocationConfig::default()
    };
    let html = render_location_block(&location);
    assert!(html.contains("provided separately"));
    assert!(!html.contains(&location.display_address));
}

#[test]
fn location_block_inline_shows_address_without_separate_sentence() {
    let location = LocationConfig::default();
    assert_eq!(location.delivery_method, DeliveryMethod::Inline);
    let html = render_location_block(&location);
    assert!(html.contains(&location.display_address));
    assert!(html.contains(&location.full_address));
    assert!(!html.contains("sent separately"));
}

#[test]
fn location_block_separate_omits_address() {
    let location = LocationConfig {
        delivery_method: DeliveryMethod::Separate,
        ..LocationConfig::default()
    };
    let html = render_location_block(&location);
    assert!(html.contains("sent separately"));
    assert!(!html.contains(&location.display_address));
    assert!(!html.contains(&location.full_address));
}

#[test]
fn location_block_both_has_address_and_separate_sentence() {
    let location = LocationConfig {
        delivery_method: DeliveryMethod::Both,
        ..LocationConfig::default()
    };
    let html = render_location_block(&location);
    assert!(html.contains(&location.display_address));
    assert!(html.contains("sent separately"));
}

#[test]
fn studio_fallback_chain_is_per_field() {
    let mut settings = StudioSettings::default();
    settings.studio_phone = String::new();
    let supplied = StudioOverride {
        studio_phone: Some("(111) 222-3333".to_string()),
        studio_name: Some("Ignored Name".to_string()),
        ..StudioOverride::default()
    };

    let profile = resolve_studio(Some(&settings), Some(&supplied));
    // Live value wins where present, the override fills the gap.
    assert_eq!(profile.studio_name, settings.studio_name);
    assert_eq!(profile.studio_phone, "(111) 222-3333");

    let defaults = resolve_studio(None, None);
    assert_eq!(defaults.studio_name, StudioSettings::default().studio_name);
}

#[test]
fn location_fallback_uses_override_then_defaults() {
    let supplied = LocationOverride {
        delivery_method: Some(DeliveryMethod::Separate),
        ..LocationOverride::default()
    };
    let resolved = fna_studio::mailer::resolve_location(None, Some(&supplied));
    assert_eq!(resolved.delivery_method, DeliveryMethod::Separate);
    assert_eq!(
        resolved.display_address,
        LocationConfig::default().display_address
    );
}

#[test]
fn admin_recipients_fall_back_to_hardcoded_address() {
    assert_eq!(
        resolve_admin_recipients(None, None),
        vec![FALLBACK_ADMIN_EMAIL.to_string()]
    );

    let settings = settings_with_admins(vec![admin("off@example.com", false)]);
    assert_eq!(
        resolve_admin_recipients(Some(&settings), None),
        vec![FALLBACK_ADMIN_EMAIL.to_string()]
    );
}

#[test]
fn explicit_admin_address_wins() {
    let settings = settings_with_admins(vec![admin("a@example.com", true)]);
    assert_eq!(
        resolve_admin_recipients(Some(&settings), Some("test@example.com")),
        vec!["test@example.com".to_string()]
    );
}

#[test]
fn confirmation_plan_covers_client_then_admin_fanout() {
    let settings = settings_with_admins(vec![
        admin("a@example.com", true),
        admin("b@example.com", true),
        admin("off@example.com", false),
    ]);
    let plan = plan_emails(&request(NotificationType::Confirmation), Some(&settings), None);

    assert_eq!(plan.len(), 3);
    assert_eq!(plan[0].role, RecipientRole::Client);
    assert_eq!(plan[0].to, "robin@example.com");
    assert_eq!(plan[1].role, RecipientRole::Admin);
    assert_eq!(plan[1].to, "a@example.com");
    assert_eq!(plan[2].to, "b@example.com");
}

#[test]
fn reminders_go_to_the_client_only() {
    let settings = settings_with_admins(vec![admin("a@example.com", true)]);
    for notification_type in [
        NotificationType::Reminder24h,
        NotificationType::Reminder1h,
        NotificationType::CustomReminder,
    ] {
        let plan = plan_emails(&request(notification_type), Some(&settings), None);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].role, RecipientRole::Client);
    }
}

#[test]
fn admin_notification_skips_the_client() {
    let settings = settings_with_admins(vec![admin("a@example.com", true)]);
    let plan = plan_emails(
        &request(NotificationType::AdminNotification),
        Some(&settings),
        None,
    );
    assert_eq!(plan.len(), 1);
    assert_eq!(plan[0].role, RecipientRole::Admin);
}

#[test]
fn rendered_email_carries_totals_and_confirmation_number() {
    let plan = plan_emails(&request(NotificationType::Confirmation), None, None);
    let client_email = &plan[0];
    assert!(client_email.html.contains("FNA-A1B2C3D4E"));
    assert!(client_email.html.contains("$115.00"));
    assert!(client_email.html.contains("$65.00"));
    assert!(client_email.html.contains("Nail Art Accent"));
    assert!(client_email.html.contains("$50.00"));
}

fn template(subject: &str, heading: &str, intro: &str) -> EmailTemplateRow {
    EmailTemplateRow {
        notification_type: "confirmation".to_string(),
        subject: subject.to_string(),
        heading: heading.to_string(),
        intro: intro.to_string(),
        updated_at: "2026-08-26T00:00:00Z".to_string(),
    }
}

#[test]
fn stored_template_copy_overrides_defaults() {
    let template = template(
        "See you soon at the studio",
        "Booking locked in",
        "We saved your spot.",
    );
    let studio = resolve_studio(None, None);
    let location_html = render_location_block(&resolve_location(None, None));
    let rendered = render_email(
        NotificationType::Confirmation,
        &booking(),
        &studio,
        &location_html,
        Some(&template),
        None,
    );

    assert_eq!(rendered.subject, "See you soon at the studio");
    assert!(rendered.html.contains("Booking locked in"));
    assert!(rendered.html.contains("We saved your spot."));
    assert!(!rendered.html.contains("You're booked!"));
}

#[test]
fn blank_template_fields_fall_back_to_default_copy() {
    let template = template("", "Booking locked in", "   ");
    let studio = resolve_studio(None, None);
    let location_html = render_location_block(&resolve_location(None, None));
    let rendered = render_email(
        NotificationType::Confirmation,
        &booking(),
        &studio,
        &location_html,
        Some(&template),
        None,
    );

    assert_eq!(rendered.subject, "Your appointment is confirmed");
    assert!(rendered.html.contains("Booking locked in"));
    assert!(rendered.html.contains("Thank you for booking with us."));
}

#[test]
fn client_fields_are_escaped_in_rendered_email() {
    let mut req = request(NotificationType::Confirmation);
    req.booking.client_name = "Robin <script>alert(1)</script>".to_string();
    req.booking.notes = "Loves <b>bold</b> & glitter".to_string();
    let plan = plan_emails(&req, None, None);

    assert!(plan[0].html.contains("Robin &lt;script&gt;"));
    assert!(!plan[0].html.contains("<script>"));
    assert!(plan[0].html.contains("&amp; glitter"));
    assert!(!plan[0].html.contains("<b>bold</b>"));
}

#[test]
fn custom_reminder_mentions_hours_until() {
    let mut req = request(NotificationType::CustomReminder);
    req.hours_until = Some(6);
    let plan = plan_emails(&req, None, None);
    assert!(plan[0].html.contains("about 6 hours"));
}
