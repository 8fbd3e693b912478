use std::collections::HashSet;
use std::{env, fs, path::Path};

use chrono::Utc;
use sqlx::SqlitePool;

use crate::{
    auth::{hash_password, new_id},
    mailer::NOTIFICATION_TYPES,
    models::{BookingRow, ROLE_ADMIN, STATUS_CANCELLED},
    settings,
};

pub const BOOKING_COLUMNS: &str = "id, confirmation_number, service_name, service_price, \
     selected_add_ons, add_ons_total, appointment_date, appointment_time, \
     client_name, client_email, client_phone, notes, admin_notes, status, created_at";

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

pub fn ensure_sqlite_dir(db_url: &str) -> std::io::Result<()> {
    let path = if let Some(path) = db_url.strip_prefix("sqlite://") {
        Some(path)
    } else if let Some(path) = db_url.strip_prefix("sqlite:") {
        Some(path)
    } else {
        None
    };

    let Some(path) = path else {
        return Ok(());
    };

    let path = path.split('?').next().unwrap_or(path);
    if path == ":memory:" || path.is_empty() {
        return Ok(());
    }

    let path = path.strip_prefix("file:").unwrap_or(path);
    let db_path = Path::new(path);
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

pub async fn seed_defaults(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    seed_admin(pool).await?;
    seed_catalog(pool).await?;
    seed_about(pool).await?;
    seed_email_templates(pool).await?;
    // Lazily creates the fixed-key settings row with defaults.
    settings::load_or_create(pool).await?;
    Ok(())
}

pub async fn fetch_booking(pool: &SqlitePool, booking_id: &str) -> Option<BookingRow> {
    sqlx::query_as::<_, BookingRow>(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ? LIMIT 1"
    ))
    .bind(booking_id)
    .fetch_optional(pool)
    .await
    .unwrap_or(None)
}

pub async fn fetch_booking_by_confirmation(
    pool: &SqlitePool,
    confirmation_number: &str,
) -> Option<BookingRow> {
    sqlx::query_as::<_, BookingRow>(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE confirmation_number = ? LIMIT 1"
    ))
    .bind(confirmation_number)
    .fetch_optional(pool)
    .await
    .unwrap_or(None)
}

/// Slot strings already taken on a date; cancelled bookings free their slot.
pub async fn booked_slots(pool: &SqlitePool, date: &str) -> Result<HashSet<String>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (String,)>(
        "SELECT appointment_time FROM bookings WHERE appointment_date = ? AND status != ?",
    )
    .bind(date)
    .bind(STATUS_CANCELLED)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|(time,)| time).collect())
}

async fn seed_admin(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let existing = sqlx::query_as::<_, (String,)>("SELECT id FROM users WHERE role = ? LIMIT 1")
        .bind(ROLE_ADMIN)
        .fetch_optional(pool)
        .await?;

    if existing.is_some() {
        return Ok(());
    }

    let username = env::var("ADMIN_USER").unwrap_or_else(|_| "admin".to_string());
    let password = env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin".to_string());
    let display_name = env::var("ADMIN_DISPLAY_NAME").unwrap_or_else(|_| "Ana".to_string());

    if password == "admin" {
        log::warn!("ADMIN_PASSWORD not set. Using default password 'admin'. Set ADMIN_PASSWORD in production.");
    }

    let password_hash = hash_password(&password)
        .map_err(|_| sqlx::Error::Protocol("password hash failed".into()))?;
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"INSERT INTO users (id, username, display_name, role, password_hash, active, created_at)
           VALUES (?, ?, ?, ?, ?, 1, ?)"#,
    )
    .bind(new_id())
    .bind(username)
    .bind(display_name)
    .bind(ROLE_ADMIN)
    .bind(password_hash)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(())
}

async fn seed_catalog(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let existing =
        sqlx::query_as::<_, (String,)>("SELECT id FROM services LIMIT 1")
            .fetch_optional(pool)
            .await?;
    if existing.is_some() {
        return Ok(());
    }

    let categories = [("Manicures", 1), ("Pedicures", 2), ("Nail Art", 3)];
    for (name, order) in categories {
        sqlx::query("INSERT INTO service_categories (id, name, display_order) VALUES (?, ?, ?)")
            .bind(new_id())
            .bind(name)
            .bind(order)
            .execute(pool)
            .await?;
    }

    let services = [
        (
            "Classic Manicure",
            "Shape, cuticle care, and polish of your choice.",
            35.0,
            45,
            "Manicures",
            1,
        ),
        (
            "Gel Manicure",
            "Long-wear gel polish with a glossy cure.",
            50.0,
            60,
            "Manicures",
            2,
        ),
        (
            "Luxury Spa Pedicure",
            "Soak, scrub, massage, and perfect polish.",
            65.0,
            90,
            "Pedicures",
            3,
        ),
        (
            "Full Set Extensions",
            "Sculpted extensions with your chosen finish.",
            85.0,
            120,
            "Nail Art",
            4,
        ),
    ];
    for (name, description, price, duration, category, order) in services {
        sqlx::query(
            r#"INSERT INTO services
               (id, name, description, price, duration_minutes, category, is_active, display_order)
               VALUES (?, ?, ?, ?, ?, ?, 1, ?)"#,
        )
        .bind(new_id())
        .bind(name)
        .bind(description)
        .bind(price)
        .bind(duration)
        .bind(category)
        .bind(order)
        .execute(pool)
        .await?;
    }

    let add_ons = [
        ("Nail Art Accent", "Hand-painted art on two accent nails.", 15.0, 1),
        ("Paraffin Treatment", "Warm paraffin dip for soft hands.", 20.0, 2),
        ("French Tips", "Classic french finish on any service.", 10.0, 3),
        ("Chrome Finish", "Mirror chrome powder over gel.", 35.0, 4),
    ];
    for (name, description, price, order) in add_ons {
        sqlx::query(
            r#"INSERT INTO add_ons (id, name, description, price, is_active, display_order)
               VALUES (?, ?, ?, ?, 1, ?)"#,
        )
        .bind(new_id())
        .bind(name)
        .bind(description)
        .bind(price)
        .bind(order)
        .execute(pool)
        .await?;
    }

    Ok(())
}

async fn seed_about(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let sections = [
        (
            "story",
            "Our story",
            "Fancy Nails by Ana is a one-chair studio focused on unhurried, detailed nail care.",
            1,
        ),
        (
            "approach",
            "Our approach",
            "Every appointment is one-on-one. No double booking, no rushing between chairs.",
            2,
        ),
    ];

    for (key, title, body, order) in sections {
        let exists = sqlx::query_as::<_, (String,)>(
            "SELECT id FROM about_content WHERE section_key = ? LIMIT 1",
        )
        .bind(key)
        .fetch_optional(pool)
        .await?;
        if exists.is_some() {
            continue;
        }
        sqlx::query(
            r#"INSERT INTO about_content (id, section_key, title, body, image_url, display_order)
               VALUES (?, ?, ?, ?, NULL, ?)"#,
        )
        .bind(new_id())
        .bind(key)
        .bind(title)
        .bind(body)
        .bind(order)
        .execute(pool)
        .await?;
    }

    Ok(())
}

async fn seed_email_templates(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for notification_type in NOTIFICATION_TYPES {
        let exists = sqlx::query_as::<_, (String,)>(
            "SELECT notification_type FROM email_templates WHERE notification_type = ? LIMIT 1",
        )
        .bind(notification_type.as_str())
        .fetch_optional(pool)
        .await?;
        if exists.is_some() {
            continue;
        }
        let (subject, heading, intro) = notification_type.default_copy();
        sqlx::query(
            r#"INSERT INTO email_templates (notification_type, subject, heading, intro, updated_at)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(notification_type.as_str())
        .bind(subject)
        .bind(heading)
        .bind(intro)
        .bind(Utc::now().to_rfc3339())
        .execute(pool)
        .await?;
    }

    Ok(())
}
