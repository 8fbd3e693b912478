use actix_web::{web, HttpResponse, Result};
use actix_web_httpauth::middleware::HttpAuthentication;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::{admin_validator, new_id, AuthUser},
    db::{fetch_booking, BOOKING_COLUMNS},
    mailer::{self, NotificationRequest, NotificationType},
    models::{
        AboutContentRow, AddOnRow, BookingRow, CategoryRow, ContactMessageRow, EmailTemplateRow,
        GalleryItemRow, ServiceRow, TestimonialLinkRow, TestimonialRow, BOOKING_STATUSES,
        MESSAGE_STATUSES,
    },
    settings::{self, StudioSettings},
    state::{AppState, ServerEvent},
    wizard,
};

#[derive(Deserialize)]
struct BookingFilter {
    status: Option<String>,
    date: Option<String>,
}

#[derive(Deserialize)]
struct BookingUpdate {
    status: String,
    #[serde(default)]
    admin_notes: Option<String>,
}

#[derive(Deserialize)]
struct ServicePayload {
    name: String,
    #[serde(default)]
    description: String,
    price: f64,
    duration_minutes: i64,
    #[serde(default)]
    category: String,
    #[serde(default = "default_true")]
    is_active: bool,
    #[serde(default)]
    display_order: i64,
}

#[derive(Deserialize)]
struct CategoryPayload {
    name: String,
    #[serde(default)]
    display_order: i64,
}

#[derive(Deserialize)]
struct AddOnPayload {
    name: String,
    #[serde(default)]
    description: String,
    price: f64,
    #[serde(default = "default_true")]
    is_active: bool,
    #[serde(default)]
    display_order: i64,
}

#[derive(Deserialize)]
struct GalleryPayload {
    title: String,
    #[serde(default)]
    category: String,
    image_url: String,
    #[serde(default)]
    description: String,
    #[serde(default = "default_true")]
    is_active: bool,
    #[serde(default)]
    display_order: i64,
}

#[derive(Deserialize)]
struct AboutPayload {
    section_key: String,
    title: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    display_order: i64,
}

#[derive(Deserialize)]
struct MessageFilter {
    status: Option<String>,
}

#[derive(Deserialize)]
struct MessageUpdate {
    status: String,
    #[serde(default)]
    admin_notes: Option<String>,
}

#[derive(Deserialize)]
struct TestimonialUpdate {
    is_approved: bool,
}

#[derive(Deserialize)]
struct ReviewLinkPayload {
    #[serde(default)]
    label: String,
    #[serde(default)]
    expires_at: Option<String>,
    #[serde(default)]
    max_uses: Option<i64>,
}

#[derive(Deserialize)]
struct ReviewLinkUpdate {
    is_active: bool,
}

#[derive(Deserialize)]
struct EmailTemplateUpdate {
    subject: String,
    heading: String,
    intro: String,
}

fn default_true() -> bool {
    true
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .wrap(HttpAuthentication::basic(admin_validator))
            .service(web::resource("/dashboard").route(web::get().to(dashboard)))
            .service(web::resource("/bookings").route(web::get().to(list_bookings)))
            .service(
                web::resource("/bookings/{id}")
                    .route(web::get().to(booking_detail))
                    .route(web::put().to(update_booking)),
            )
            .service(
                web::resource("/services")
                    .route(web::get().to(list_services))
                    .route(web::post().to(create_service)),
            )
            .service(
                web::resource("/services/{id}")
                    .route(web::put().to(update_service))
                    .route(web::delete().to(delete_service)),
            )
            .service(
                web::resource("/categories")
                    .route(web::get().to(list_categories))
                    .route(web::post().to(create_category)),
            )
            .service(
                web::resource("/categories/{id}")
                    .route(web::put().to(update_category))
                    .route(web::delete().to(delete_category)),
            )
            .service(
                web::resource("/add-ons")
                    .route(web::get().to(list_add_ons))
                    .route(web::post().to(create_add_on)),
            )
            .service(
                web::resource("/add-ons/{id}")
                    .route(web::put().to(update_add_on))
                    .route(web::delete().to(delete_add_on)),
            )
            .service(
                web::resource("/gallery")
                    .route(web::get().to(list_gallery))
                    .route(web::post().to(create_gallery_item)),
            )
            .service(
                web::resource("/gallery/{id}")
                    .route(web::put().to(update_gallery_item))
                    .route(web::delete().to(delete_gallery_item)),
            )
            .service(
                web::resource("/about")
                    .route(web::get().to(list_about))
                    .route(web::post().to(create_about_section)),
            )
            .service(
                web::resource("/about/{id}")
                    .route(web::put().to(update_about_section))
                    .route(web::delete().to(delete_about_section)),
            )
            .service(web::resource("/messages").route(web::get().to(list_messages)))
            .service(web::resource("/messages/{id}").route(web::put().to(update_message)))
            .service(web::resource("/testimonials").route(web::get().to(list_testimonials)))
            .service(
                web::resource("/testimonials/{id}")
                    .route(web::put().to(update_testimonial))
                    .route(web::delete().to(delete_testimonial)),
            )
            .service(
                web::resource("/review-links")
                    .route(web::get().to(list_review_links))
                    .route(web::post().to(create_review_link)),
            )
            .service(
                web::resource("/review-links/{code}")
                    .route(web::put().to(update_review_link))
                    .route(web::delete().to(delete_review_link)),
            )
            .service(
                web::resource("/settings")
                    .route(web::get().to(get_settings))
                    .route(web::put().to(update_settings)),
            )
            .service(web::resource("/email-templates").route(web::get().to(list_email_templates)))
            .service(
                web::resource("/email-templates/{type}")
                    .route(web::put().to(update_email_template)),
            )
            .service(web::resource("/notifications/test").route(web::post().to(test_notification))),
    );
}

async fn count(state: &web::Data<AppState>, query: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(query)
        .fetch_one(&state.db)
        .await
        .unwrap_or(0)
}

async fn dashboard(state: web::Data<AppState>, auth: web::ReqData<AuthUser>) -> Result<HttpResponse> {
    let total = count(&state, "SELECT COUNT(*) FROM bookings").await;
    let confirmed =
        count(&state, "SELECT COUNT(*) FROM bookings WHERE status = 'confirmed'").await;
    let completed =
        count(&state, "SELECT COUNT(*) FROM bookings WHERE status = 'completed'").await;
    let cancelled =
        count(&state, "SELECT COUNT(*) FROM bookings WHERE status = 'cancelled'").await;
    let unread_messages =
        count(&state, "SELECT COUNT(*) FROM contact_messages WHERE status = 'unread'").await;
    let pending_testimonials =
        count(&state, "SELECT COUNT(*) FROM testimonials WHERE is_approved = 0").await;

    let recent = sqlx::query_as::<_, BookingRow>(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings ORDER BY created_at DESC LIMIT 6"
    ))
    .fetch_all(&state.db)
    .await
    .unwrap_or_default();

    Ok(HttpResponse::Ok().json(json!({
        "admin_name": auth.display_name,
        "stats": {
            "total_bookings": total,
            "confirmed": confirmed,
            "completed": completed,
            "cancelled": cancelled,
            "unread_messages": unread_messages,
            "pending_testimonials": pending_testimonials,
        },
        "recent_bookings": recent,
    })))
}

async fn list_bookings(
    state: web::Data<AppState>,
    query: web::Query<BookingFilter>,
) -> Result<HttpResponse> {
    let mut sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE 1 = 1");
    if query.status.is_some() {
        sql.push_str(" AND status = ?");
    }
    if query.date.is_some() {
        sql.push_str(" AND appointment_date = ?");
    }
    sql.push_str(" ORDER BY appointment_date DESC, appointment_time DESC");

    let mut rows = sqlx::query_as::<_, BookingRow>(&sql);
    if let Some(status) = &query.status {
        rows = rows.bind(status);
    }
    if let Some(date) = &query.date {
        rows = rows.bind(date);
    }
    let bookings = rows
        .fetch_all(&state.db)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;

    Ok(HttpResponse::Ok().json(bookings))
}

async fn booking_detail(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    match fetch_booking(&state.db, &path.into_inner()).await {
        Some(booking) => Ok(HttpResponse::Ok().json(booking)),
        None => Ok(HttpResponse::NotFound().json(json!({ "error": "Booking not found." }))),
    }
}

async fn update_booking(
    state: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<BookingUpdate>,
) -> Result<HttpResponse> {
    let booking_id = path.into_inner();
    let payload = payload.into_inner();
    if !BOOKING_STATUSES.contains(&payload.status.as_str()) {
        return Ok(HttpResponse::UnprocessableEntity()
            .json(json!({ "errors": ["Unknown booking status."] })));
    }

    let updated = sqlx::query("UPDATE bookings SET status = ?, admin_notes = ? WHERE id = ?")
        .bind(&payload.status)
        .bind(&payload.admin_notes)
        .bind(&booking_id)
        .execute(&state.db)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;

    if updated.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({ "error": "Booking not found." })));
    }

    let Some(row) = fetch_booking(&state.db, &booking_id).await else {
        return Ok(HttpResponse::NotFound().json(json!({ "error": "Booking not found." })));
    };
    let _ = state
        .events
        .send(ServerEvent::from_booking("booking_updated", &row));

    Ok(HttpResponse::Ok().json(row))
}

async fn list_services(state: web::Data<AppState>) -> Result<HttpResponse> {
    let services = sqlx::query_as::<_, ServiceRow>(
        "SELECT id, name, description, price, duration_minutes, category, is_active, display_order
         FROM services ORDER BY display_order, name",
    )
    .fetch_all(&state.db)
    .await
    .map_err(actix_web::error::ErrorInternalServerError)?;
    Ok(HttpResponse::Ok().json(services))
}

async fn create_service(
    state: web::Data<AppState>,
    payload: web::Json<ServicePayload>,
) -> Result<HttpResponse> {
    let payload = payload.into_inner();
    let service_id = new_id();
    sqlx::query(
        r#"INSERT INTO services
           (id, name, description, price, duration_minutes, category, is_active, display_order)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&service_id)
    .bind(payload.name.trim())
    .bind(&payload.description)
    .bind(payload.price)
    .bind(payload.duration_minutes)
    .bind(&payload.category)
    .bind(payload.is_active as i64)
    .bind(payload.display_order)
    .execute(&state.db)
    .await
    .map_err(actix_web::error::ErrorInternalServerError)?;

    Ok(HttpResponse::Created().json(json!({ "id": service_id })))
}

async fn update_service(
    state: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<ServicePayload>,
) -> Result<HttpResponse> {
    let payload = payload.into_inner();
    let updated = sqlx::query(
        r#"UPDATE services SET name = ?, description = ?, price = ?, duration_minutes = ?,
           category = ?, is_active = ?, display_order = ? WHERE id = ?"#,
    )
    .bind(payload.name.trim())
    .bind(&payload.description)
    .bind(payload.price)
    .bind(payload.duration_minutes)
    .bind(&payload.category)
    .bind(payload.is_active as i64)
    .bind(payload.display_order)
    .bind(path.into_inner())
    .execute(&state.db)
    .await
    .map_err(actix_web::error::ErrorInternalServerError)?;

    if updated.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({ "error": "Service not found." })));
    }
    Ok(HttpResponse::Ok().json(json!({ "ok": true })))
}

async fn delete_service(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse> {
    sqlx::query("DELETE FROM services WHERE id = ?")
        .bind(path.into_inner())
        .execute(&state.db)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;
    Ok(HttpResponse::Ok().json(json!({ "ok": true })))
}

async fn list_categories(state: web::Data<AppState>) -> Result<HttpResponse> {
    let categories = sqlx::query_as::<_, CategoryRow>(
        "SELECT id, name, display_order FROM service_categories ORDER BY display_order, name",
    )
    .fetch_all(&state.db)
    .await
    .map_err(actix_web::error::ErrorInternalServerError)?;
    Ok(HttpResponse::Ok().json(categories))
}

async fn create_category(
    state: web::Data<AppState>,
    payload: web::Json<CategoryPayload>,
) -> Result<HttpResponse> {
    let category_id = new_id();
    sqlx::query("INSERT INTO service_categories (id, name, display_order) VALUES (?, ?, ?)")
        .bind(&category_id)
        .bind(payload.name.trim())
        .bind(payload.display_order)
        .execute(&state.db)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;
    Ok(HttpResponse::Created().json(json!({ "id": category_id })))
}

async fn update_category(
    state: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<CategoryPayload>,
) -> Result<HttpResponse> {
    let updated =
        sqlx::query("UPDATE service_categories SET name = ?, display_order = ? WHERE id = ?")
            .bind(payload.name.trim())
            .bind(payload.display_order)
            .bind(path.into_inner())
            .execute(&state.db)
            .await
            .map_err(actix_web::error::ErrorInternalServerError)?;
    if updated.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({ "error": "Category not found." })));
    }
    Ok(HttpResponse::Ok().json(json!({ "ok": true })))
}

async fn delete_category(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    sqlx::query("DELETE FROM service_categories WHERE id = ?")
        .bind(path.into_inner())
        .execute(&state.db)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;
    Ok(HttpResponse::Ok().json(json!({ "ok": true })))
}

async fn list_add_ons(state: web::Data<AppState>) -> Result<HttpResponse> {
    let add_ons = sqlx::query_as::<_, AddOnRow>(
        "SELECT id, name, description, price, is_active, display_order
         FROM add_ons ORDER BY display_order, name",
    )
    .fetch_all(&state.db)
    .await
    .map_err(actix_web::error::ErrorInternalServerError)?;
    Ok(HttpResponse::Ok().json(add_ons))
}

async fn create_add_on(
    state: web::Data<AppState>,
    payload: web::Json<AddOnPayload>,
) -> Result<HttpResponse> {
    let payload = payload.into_inner();
    let add_on_id = new_id();
    sqlx::query(
        r#"INSERT INTO add_ons (id, name, description, price, is_active, display_order)
           VALUES (?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&add_on_id)
    .bind(payload.name.trim())
    .bind(&payload.description)
    .bind(payload.price)
    .bind(payload.is_active as i64)
    .bind(payload.display_order)
    .execute(&state.db)
    .await
    .map_err(actix_web::error::ErrorInternalServerError)?;
    Ok(HttpResponse::Created().json(json!({ "id": add_on_id })))
}

async fn update_add_on(
    state: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<AddOnPayload>,
) -> Result<HttpResponse> {
    let payload = payload.into_inner();
    let updated = sqlx::query(
        r#"UPDATE add_ons SET name = ?, description = ?, price = ?, is_active = ?, display_order = ?
           WHERE id = ?"#,
    )
    .bind(payload.name.trim())
    .bind(&payload.description)
    .bind(payload.price)
    .bind(payload.is_active as i64)
    .bind(payload.display_order)
    .bind(path.into_inner())
    .execute(&state.db)
    .await
    .map_err(actix_web::error::ErrorInternalServerError)?;
    if updated.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({ "error": "Add-on not found." })));
    }
    Ok(HttpResponse::Ok().json(json!({ "ok": true })))
}

async fn delete_add_on(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse> {
    sqlx::query("DELETE FROM add_ons WHERE id = ?")
        .bind(path.into_inner())
        .execute(&state.db)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;
    Ok(HttpResponse::Ok().json(json!({ "ok": true })))
}

async fn list_gallery(state: web::Data<AppState>) -> Result<HttpResponse> {
    let items = sqlx::query_as::<_, GalleryItemRow>(
        "SELECT id, title, category, image_url, description, is_active, display_order
         FROM gallery ORDER BY display_order, title",
    )
    .fetch_all(&state.db)
    .await
    .map_err(actix_web::error::ErrorInternalServerError)?;
    Ok(HttpResponse::Ok().json(items))
}

async fn create_gallery_item(
    state: web::Data<AppState>,
    payload: web::Json<GalleryPayload>,
) -> Result<HttpResponse> {
    let payload = payload.into_inner();
    let item_id = new_id();
    sqlx::query(
        r#"INSERT INTO gallery (id, title, category, image_url, description, is_active, display_order)
           VALUES (?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&item_id)
    .bind(payload.title.trim())
    .bind(&payload.category)
    .bind(&payload.image_url)
    .bind(&payload.description)
    .bind(payload.is_active as i64)
    .bind(payload.display_order)
    .execute(&state.db)
    .await
    .map_err(actix_web::error::ErrorInternalServerError)?;
    Ok(HttpResponse::Created().json(json!({ "id": item_id })))
}

async fn update_gallery_item(
    state: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<GalleryPayload>,
) -> Result<HttpResponse> {
    let payload = payload.into_inner();
    let updated = sqlx::query(
        r#"UPDATE gallery SET title = ?, category = ?, image_url = ?, description = ?,
           is_active = ?, display_order = ? WHERE id = ?"#,
    )
    .bind(payload.title.trim())
    .bind(&payload.category)
    .bind(&payload.image_url)
    .bind(&payload.description)
    .bind(payload.is_active as i64)
    .bind(payload.display_order)
    .bind(path.into_inner())
    .execute(&state.db)
    .await
    .map_err(actix_web::error::ErrorInternalServerError)?;
    if updated.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({ "error": "Gallery item not found." })));
    }
    Ok(HttpResponse::Ok().json(json!({ "ok": true })))
}

async fn delete_gallery_item(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    sqlx::query("DELETE FROM gallery WHERE id = ?")
        .bind(path.into_inner())
        .execute(&state.db)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;
    Ok(HttpResponse::Ok().json(json!({ "ok": true })))
}

async fn list_about(state: web::Data<AppState>) -> Result<HttpResponse> {
    let sections = sqlx::query_as::<_, AboutContentRow>(
        "SELECT id, section_key, title, body, image_url, display_order
         FROM about_content ORDER BY display_order",
    )
    .fetch_all(&state.db)
    .await
    .map_err(actix_web::error::ErrorInternalServerError)?;
    Ok(HttpResponse::Ok().json(sections))
}

async fn create_about_section(
    state: web::Data<AppState>,
    payload: web::Json<AboutPayload>,
) -> Result<HttpResponse> {
    let payload = payload.into_inner();
    let section_id = new_id();
    sqlx::query(
        r#"INSERT INTO about_content (id, section_key, title, body, image_url, display_order)
           VALUES (?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&section_id)
    .bind(payload.section_key.trim())
    .bind(payload.title.trim())
    .bind(&payload.body)
    .bind(&payload.image_url)
    .bind(payload.display_order)
    .execute(&state.db)
    .await
    .map_err(actix_web::error::ErrorInternalServerError)?;
    Ok(HttpResponse::Created().json(json!({ "id": section_id })))
}

async fn update_about_section(
    state: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<AboutPayload>,
) -> Result<HttpResponse> {
    let payload = payload.into_inner();
    let updated = sqlx::query(
        r#"UPDATE about_content SET section_key = ?, title = ?, body = ?, image_url = ?,
           display_order = ? WHERE id = ?"#,
    )
    .bind(payload.section_key.trim())
    .bind(payload.title.trim())
    .bind(&payload.body)
    .bind(&payload.image_url)
    .bind(payload.display_order)
    .bind(path.into_inner())
    .execute(&state.db)
    .await
    .map_err(actix_web::error::ErrorInternalServerError)?;
    if updated.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({ "error": "Section not found." })));
    }
    Ok(HttpResponse::Ok().json(json!({ "ok": true })))
}

async fn delete_about_section(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    sqlx::query("DELETE FROM about_content WHERE id = ?")
        .bind(path.into_inner())
        .execute(&state.db)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;
    Ok(HttpResponse::Ok().json(json!({ "ok": true })))
}

async fn list_messages(
    state: web::Data<AppState>,
    query: web::Query<MessageFilter>,
) -> Result<HttpResponse> {
    let messages = match &query.status {
        Some(status) => sqlx::query_as::<_, ContactMessageRow>(
            "SELECT id, sender_name, sender_email, sender_phone, inquiry_type, subject, body,
                    status, admin_notes, created_at
             FROM contact_messages WHERE status = ? ORDER BY created_at DESC",
        )
        .bind(status)
        .fetch_all(&state.db)
        .await,
        None => sqlx::query_as::<_, ContactMessageRow>(
            "SELECT id, sender_name, sender_email, sender_phone, inquiry_type, subject, body,
                    status, admin_notes, created_at
             FROM contact_messages ORDER BY created_at DESC",
        )
        .fetch_all(&state.db)
        .await,
    }
    .map_err(actix_web::error::ErrorInternalServerError)?;

    Ok(HttpResponse::Ok().json(messages))
}

async fn update_message(
    state: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<MessageUpdate>,
) -> Result<HttpResponse> {
    let payload = payload.into_inner();
    if !MESSAGE_STATUSES.contains(&payload.status.as_str()) {
        return Ok(HttpResponse::UnprocessableEntity()
            .json(json!({ "errors": ["Unknown message status."] })));
    }
    let updated =
        sqlx::query("UPDATE contact_messages SET status = ?, admin_notes = ? WHERE id = ?")
            .bind(&payload.status)
            .bind(&payload.admin_notes)
            .bind(path.into_inner())
            .execute(&state.db)
            .await
            .map_err(actix_web::error::ErrorInternalServerError)?;
    if updated.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({ "error": "Message not found." })));
    }
    Ok(HttpResponse::Ok().json(json!({ "ok": true })))
}

async fn list_testimonials(state: web::Data<AppState>) -> Result<HttpResponse> {
    let testimonials = sqlx::query_as::<_, TestimonialRow>(
        "SELECT id, client_name, rating, body, photo_url, link_code, is_approved, created_at
         FROM testimonials ORDER BY created_at DESC",
    )
    .fetch_all(&state.db)
    .await
    .map_err(actix_web::error::ErrorInternalServerError)?;
    Ok(HttpResponse::Ok().json(testimonials))
}

async fn update_testimonial(
    state: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<TestimonialUpdate>,
) -> Result<HttpResponse> {
    let updated = sqlx::query("UPDATE testimonials SET is_approved = ? WHERE id = ?")
        .bind(payload.is_approved as i64)
        .bind(path.into_inner())
        .execute(&state.db)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;
    if updated.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({ "error": "Testimonial not found." })));
    }
    Ok(HttpResponse::Ok().json(json!({ "ok": true })))
}

async fn delete_testimonial(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    sqlx::query("DELETE FROM testimonials WHERE id = ?")
        .bind(path.into_inner())
        .execute(&state.db)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;
    Ok(HttpResponse::Ok().json(json!({ "ok": true })))
}

async fn list_review_links(state: web::Data<AppState>) -> Result<HttpResponse> {
    let links = sqlx::query_as::<_, TestimonialLinkRow>(
        "SELECT short_code, label, expires_at, max_uses, use_count, is_active, created_at
         FROM testimonial_links ORDER BY created_at DESC",
    )
    .fetch_all(&state.db)
    .await
    .map_err(actix_web::error::ErrorInternalServerError)?;
    Ok(HttpResponse::Ok().json(links))
}

async fn create_review_link(
    state: web::Data<AppState>,
    payload: web::Json<ReviewLinkPayload>,
) -> Result<HttpResponse> {
    let payload = payload.into_inner();
    let short_code = wizard::new_short_code();
    sqlx::query(
        r#"INSERT INTO testimonial_links
           (short_code, label, expires_at, max_uses, use_count, is_active, created_at)
           VALUES (?, ?, ?, ?, 0, 1, ?)"#,
    )
    .bind(&short_code)
    .bind(&payload.label)
    .bind(&payload.expires_at)
    .bind(payload.max_uses)
    .bind(Utc::now().to_rfc3339())
    .execute(&state.db)
    .await
    .map_err(actix_web::error::ErrorInternalServerError)?;
    Ok(HttpResponse::Created().json(json!({ "short_code": short_code })))
}

async fn update_review_link(
    state: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<ReviewLinkUpdate>,
) -> Result<HttpResponse> {
    let updated = sqlx::query("UPDATE testimonial_links SET is_active = ? WHERE short_code = ?")
        .bind(payload.is_active as i64)
        .bind(path.into_inner())
        .execute(&state.db)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;
    if updated.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({ "error": "Review link not found." })));
    }
    Ok(HttpResponse::Ok().json(json!({ "ok": true })))
}

async fn delete_review_link(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    sqlx::query("DELETE FROM testimonial_links WHERE short_code = ?")
        .bind(path.into_inner())
        .execute(&state.db)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;
    Ok(HttpResponse::Ok().json(json!({ "ok": true })))
}

async fn get_settings(state: web::Data<AppState>) -> Result<HttpResponse> {
    let settings = state
        .settings
        .get(&state.db)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;
    Ok(HttpResponse::Ok().json(settings))
}

async fn update_settings(
    state: web::Data<AppState>,
    payload: web::Json<StudioSettings>,
) -> Result<HttpResponse> {
    let mut updated = payload.into_inner();
    settings::sanitize_admin_emails(&mut updated.admin_email_configs);

    settings::save(&state.db, &updated)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;
    state.settings.invalidate().await;
    let _ = state.events.send(ServerEvent::settings_updated());

    Ok(HttpResponse::Ok().json(updated))
}

async fn list_email_templates(state: web::Data<AppState>) -> Result<HttpResponse> {
    let templates = sqlx::query_as::<_, EmailTemplateRow>(
        "SELECT notification_type, subject, heading, intro, updated_at
         FROM email_templates ORDER BY notification_type",
    )
    .fetch_all(&state.db)
    .await
    .map_err(actix_web::error::ErrorInternalServerError)?;
    Ok(HttpResponse::Ok().json(templates))
}

async fn update_email_template(
    state: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<EmailTemplateUpdate>,
) -> Result<HttpResponse> {
    let raw_type = path.into_inner();
    let Some(notification_type) = NotificationType::parse(&raw_type) else {
        return Ok(HttpResponse::UnprocessableEntity()
            .json(json!({ "errors": ["Unknown notification type."] })));
    };

    sqlx::query(
        r#"INSERT INTO email_templates (notification_type, subject, heading, intro, updated_at)
           VALUES (?, ?, ?, ?, ?)
           ON CONFLICT(notification_type) DO UPDATE SET
             subject = excluded.subject,
             heading = excluded.heading,
             intro = excluded.intro,
             updated_at = excluded.updated_at"#,
    )
    .bind(notification_type.as_str())
    .bind(&payload.subject)
    .bind(&payload.heading)
    .bind(&payload.intro)
    .bind(Utc::now().to_rfc3339())
    .execute(&state.db)
    .await
    .map_err(actix_web::error::ErrorInternalServerError)?;

    Ok(HttpResponse::Ok().json(json!({ "ok": true })))
}

/// Admin test path: same dispatch pipeline as a live booking, with the short
/// inter-send delay.
async fn test_notification(
    state: web::Data<AppState>,
    payload: web::Json<NotificationRequest>,
) -> Result<HttpResponse> {
    let request = payload.into_inner();
    let report = mailer::dispatch(
        &state.mailer,
        &state.db,
        &state.settings,
        &request,
        mailer::TEST_FANOUT_DELAY,
    )
    .await;

    Ok(HttpResponse::Ok().json(report))
}
