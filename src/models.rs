use chrono::{DateTime, Utc};
use serde::Serialize;

pub const ROLE_ADMIN: &str = "admin";

pub const STATUS_CONFIRMED: &str = "confirmed";
pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_CANCELLED: &str = "cancelled";

pub const MESSAGE_UNREAD: &str = "unread";
pub const MESSAGE_READ: &str = "read";
pub const MESSAGE_REPLIED: &str = "replied";

pub const BOOKING_STATUSES: [&str; 3] = [STATUS_CONFIRMED, STATUS_COMPLETED, STATUS_CANCELLED];
pub const MESSAGE_STATUSES: [&str; 3] = [MESSAGE_UNREAD, MESSAGE_READ, MESSAGE_REPLIED];

#[allow(dead_code)]
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub role: String,
    pub password_hash: String,
    pub active: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ServiceRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub duration_minutes: i64,
    pub category: String,
    pub is_active: i64,
    pub display_order: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CategoryRow {
    pub id: String,
    pub name: String,
    pub display_order: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AddOnRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub is_active: i64,
    pub display_order: i64,
}

/// A persisted booking. Pricing fields are a frozen snapshot taken at
/// submission time; later edits to services or add-ons never touch them.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BookingRow {
    pub id: String,
    pub confirmation_number: String,
    pub service_name: String,
    pub service_price: f64,
    pub selected_add_ons: String,
    pub add_ons_total: f64,
    pub appointment_date: String,
    pub appointment_time: String,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: String,
    pub notes: Option<String>,
    pub admin_notes: Option<String>,
    pub status: String,
    pub created_at: String,
}

impl BookingRow {
    pub fn total(&self) -> f64 {
        self.service_price + self.add_ons_total
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AboutContentRow {
    pub id: String,
    pub section_key: String,
    pub title: String,
    pub body: String,
    pub image_url: Option<String>,
    pub display_order: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct GalleryItemRow {
    pub id: String,
    pub title: String,
    pub category: String,
    pub image_url: String,
    pub description: String,
    pub is_active: i64,
    pub display_order: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ContactMessageRow {
    pub id: String,
    pub sender_name: String,
    pub sender_email: String,
    pub sender_phone: Option<String>,
    pub inquiry_type: String,
    pub subject: String,
    pub body: String,
    pub status: String,
    pub admin_notes: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TestimonialRow {
    pub id: String,
    pub client_name: String,
    pub rating: i64,
    pub body: String,
    pub photo_url: Option<String>,
    pub link_code: Option<String>,
    pub is_approved: i64,
    pub created_at: String,
}

/// Capability token gating public review submission.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TestimonialLinkRow {
    pub short_code: String,
    pub label: String,
    pub expires_at: Option<String>,
    pub max_uses: Option<i64>,
    pub use_count: i64,
    pub is_active: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Usable,
    Inactive,
    Expired,
    LimitReached,
}

impl LinkStatus {
    pub fn reason(&self) -> &'static str {
        match self {
            LinkStatus::Usable => "usable",
            LinkStatus::Inactive => "inactive",
            LinkStatus::Expired => "expired",
            LinkStatus::LimitReached => "limit-reached",
        }
    }
}

impl TestimonialLinkRow {
    /// Usable iff active, not expired, and below the use cap when one is set.
    pub fn status_at(&self, now: DateTime<Utc>) -> LinkStatus {
        if self.is_active == 0 {
            return LinkStatus::Inactive;
        }
        if let Some(expires_at) = self.expires_at.as_deref() {
            match DateTime::parse_from_rfc3339(expires_at) {
                Ok(expiry) if now >= expiry.with_timezone(&Utc) => return LinkStatus::Expired,
                Ok(_) => {}
                Err(_) => return LinkStatus::Expired,
            }
        }
        if let Some(max_uses) = self.max_uses {
            if self.use_count >= max_uses {
                return LinkStatus::LimitReached;
            }
        }
        LinkStatus::Usable
    }

    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.status_at(now) == LinkStatus::Usable
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct EmailTemplateRow {
    pub notification_type: String,
    pub subject: String,
    pub heading: String,
    pub intro: String,
    pub updated_at: String,
}
