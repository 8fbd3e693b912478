use actix_web::{web, HttpResponse, Result};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::new_id,
    db::{booked_slots, fetch_booking_by_confirmation, BOOKING_COLUMNS},
    mailer::{self, BookingEmail, NotificationRequest, NotificationType},
    models::{
        AboutContentRow, AddOnRow, BookingRow, CategoryRow, GalleryItemRow, LinkStatus,
        ServiceRow, TestimonialLinkRow, TestimonialRow, MESSAGE_UNREAD, STATUS_CONFIRMED,
    },
    state::{AppState, ServerEvent},
    wizard::{self, BookingDraft, ClientDetails},
};

#[derive(Deserialize)]
struct ClientPayload {
    name: String,
    email: String,
    phone: String,
    #[serde(default)]
    notes: String,
}

#[derive(Deserialize)]
struct BookingSubmission {
    service_id: String,
    #[serde(default)]
    add_on_ids: Vec<String>,
    appointment_date: String,
    appointment_time: String,
    client: ClientPayload,
}

#[derive(Deserialize)]
struct AvailabilityQuery {
    date: String,
}

#[derive(Deserialize)]
struct ContactForm {
    name: String,
    email: String,
    #[serde(default)]
    phone: String,
    #[serde(default = "default_inquiry_type")]
    inquiry_type: String,
    subject: String,
    body: String,
}

fn default_inquiry_type() -> String {
    "general".to_string()
}

#[derive(Deserialize)]
struct TestimonialForm {
    client_name: String,
    rating: i64,
    body: String,
    #[serde(default)]
    photo_url: Option<String>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/health").route(web::get().to(health)))
        .service(web::resource("/api/services").route(web::get().to(list_services)))
        .service(web::resource("/api/categories").route(web::get().to(list_categories)))
        .service(web::resource("/api/add-ons").route(web::get().to(list_add_ons)))
        .service(web::resource("/api/gallery").route(web::get().to(list_gallery)))
        .service(web::resource("/api/about").route(web::get().to(list_about)))
        .service(web::resource("/api/policies").route(web::get().to(booking_policies)))
        .service(web::resource("/api/availability").route(web::get().to(availability)))
        .service(web::resource("/api/bookings").route(web::post().to(submit_booking)))
        .service(
            web::resource("/api/bookings/{confirmation_number}")
                .route(web::get().to(booking_status)),
        )
        .service(web::resource("/api/messages").route(web::post().to(submit_message)))
        .service(web::resource("/api/testimonials").route(web::get().to(list_testimonials)))
        .service(web::resource("/api/review-links/{code}").route(web::get().to(check_review_link)))
        .service(
            web::resource("/api/review-links/{code}/testimonials")
                .route(web::post().to(submit_testimonial)),
        );
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().body("ok")
}

async fn list_services(state: web::Data<AppState>) -> Result<HttpResponse> {
    let services = sqlx::query_as::<_, ServiceRow>(
        "SELECT id, name, description, price, duration_minutes, category, is_active, display_order
         FROM services WHERE is_active = 1 ORDER BY display_order, name",
    )
    .fetch_all(&state.db)
    .await
    .map_err(actix_web::error::ErrorInternalServerError)?;

    Ok(HttpResponse::Ok().json(services))
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

async fn list_add_ons(state: web::Data<AppState>) -> Result<HttpResponse> {
    let add_ons = sqlx::query_as::<_, AddOnRow>(
        "SELECT id, name, description, price, is_active, display_order
         FROM add_ons WHERE is_active = 1 ORDER BY display_order, name",
    )
    .fetch_all(&state.db)
    .await
    .map_err(actix_web::error::ErrorInternalServerError)?;

    Ok(HttpResponse::Ok().json(add_ons))
}

async fn list_gallery(state: web::Data<AppState>) -> Result<HttpResponse> {
    let items = sqlx::query_as::<_, GalleryItemRow>(
        "SELECT id, title, category, image_url, description, is_active, display_order
         FROM gallery WHERE is_active = 1 ORDER BY display_order, title",
    )
    .fetch_all(&state.db)
    .await
    .map_err(actix_web::error::ErrorInternalServerError)?;

    Ok(HttpResponse::Ok().json(items))
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

async fn booking_policies(state: web::Data<AppState>) -> Result<HttpResponse> {
    let settings = state
        .settings
        .get(&state.db)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;

    Ok(HttpResponse::Ok().json(json!({
        "booking_policies": settings.booking_policies,
        "service_notes": settings.service_notes,
    })))
}

async fn availability(
    state: web::Data<AppState>,
    query: web::Query<AvailabilityQuery>,
) -> Result<HttpResponse> {
    let Ok(date) = NaiveDate::parse_from_str(&query.date, "%Y-%m-%d") else {
        return Ok(HttpResponse::BadRequest().json(json!({
            "error": "Invalid date, expected YYYY-MM-DD."
        })));
    };

    let booked = booked_slots(&state.db, &query.date)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;
    let slots = wizard::available_slots(date, &booked);

    Ok(HttpResponse::Ok().json(json!({ "date": query.date, "slots": slots })))
}

async fn submit_booking(
    state: web::Data<AppState>,
    payload: web::Json<BookingSubmission>,
) -> Result<HttpResponse> {
    let payload = payload.into_inner();

    let service = sqlx::query_as::<_, ServiceRow>(
        "SELECT id, name, description, price, duration_minutes, category, is_active, display_order
         FROM services WHERE id = ? AND is_active = 1 LIMIT 1",
    )
    .bind(&payload.service_id)
    .fetch_optional(&state.db)
    .await
    .map_err(actix_web::error::ErrorInternalServerError)?;

    let Some(service) = service else {
        return Ok(HttpResponse::UnprocessableEntity()
            .json(json!({ "errors": ["Please select a service."] })));
    };

    let active_add_ons = sqlx::query_as::<_, AddOnRow>(
        "SELECT id, name, description, price, is_active, display_order
         FROM add_ons WHERE is_active = 1",
    )
    .fetch_all(&state.db)
    .await
    .map_err(actix_web::error::ErrorInternalServerError)?;

    let mut selected = Vec::new();
    for add_on_id in &payload.add_on_ids {
        match active_add_ons.iter().find(|add_on| &add_on.id == add_on_id) {
            Some(add_on) => selected.push(wizard::AddOnSnapshot::from(add_on)),
            None => {
                return Ok(HttpResponse::UnprocessableEntity()
                    .json(json!({ "errors": ["Unknown add-on selected."] })));
            }
        }
    }

    let Ok(date) = NaiveDate::parse_from_str(&payload.appointment_date, "%Y-%m-%d") else {
        return Ok(HttpResponse::UnprocessableEntity()
            .json(json!({ "errors": ["Invalid appointment date."] })));
    };

    // Walk the submitted fields through the wizard stages so every stage's
    // validation gates the insert exactly as it gates forward navigation.
    let mut draft = BookingDraft::new();
    draft.service = Some(wizard::ServiceSnapshot::from(&service));
    draft.add_ons = selected;
    draft.appointment_date = Some(date);
    draft.appointment_time = Some(payload.appointment_time.clone());
    draft.client = ClientDetails {
        name: payload.client.name,
        email: payload.client.email,
        phone: payload.client.phone,
        notes: payload.client.notes,
    };
    for _ in 0..4 {
        if let Err(errors) = draft.next() {
            return Ok(HttpResponse::UnprocessableEntity().json(json!({ "errors": errors })));
        }
    }

    let booked = booked_slots(&state.db, &payload.appointment_date)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;
    let slots = wizard::available_slots(date, &booked);
    if !slots.contains(&payload.appointment_time.as_str()) {
        return Ok(HttpResponse::Conflict().json(json!({
            "error": "That time slot is no longer available."
        })));
    }

    // Regenerated on every attempt; a failed insert never reuses a number.
    let confirmation_number = wizard::new_confirmation_number();
    let booking_id = new_id();
    let selected_add_ons = serde_json::to_string(&draft.add_ons)
        .map_err(actix_web::error::ErrorInternalServerError)?;
    let now = Utc::now().to_rfc3339();

    let insert = sqlx::query(
        r#"INSERT INTO bookings
           (id, confirmation_number, service_name, service_price, selected_add_ons,
            add_ons_total, appointment_date, appointment_time, client_name, client_email,
            client_phone, notes, admin_notes, status, created_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL, ?, ?)"#,
    )
    .bind(&booking_id)
    .bind(&confirmation_number)
    .bind(&service.name)
    .bind(service.price)
    .bind(&selected_add_ons)
    .bind(draft.add_ons_total())
    .bind(&payload.appointment_date)
    .bind(&payload.appointment_time)
    .bind(&draft.client.name)
    .bind(&draft.client.email)
    .bind(&draft.client.phone)
    .bind(if draft.client.notes.trim().is_empty() {
        None
    } else {
        Some(draft.client.notes.clone())
    })
    .bind(STATUS_CONFIRMED)
    .bind(&now)
    .execute(&state.db)
    .await;

    if let Err(err) = insert {
        let slot_taken = err
            .as_database_error()
            .map(|db_err| db_err.is_unique_violation())
            .unwrap_or(false);
        if slot_taken {
            return Ok(HttpResponse::Conflict().json(json!({
                "error": "That time slot was just booked by someone else."
            })));
        }
        return Err(actix_web::error::ErrorInternalServerError(err));
    }

    // Insert succeeded, so the terminal transition is unconditional from
    // here; notification failure only degrades to a warning.
    let _ = draft.confirm();

    let row = sqlx::query_as::<_, BookingRow>(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ? LIMIT 1"
    ))
    .bind(&booking_id)
    .fetch_one(&state.db)
    .await
    .map_err(actix_web::error::ErrorInternalServerError)?;

    let _ = state
        .events
        .send(ServerEvent::from_booking("booking_created", &row));

    let notification = NotificationRequest {
        notification_type: NotificationType::Confirmation,
        booking: BookingEmail::from(&row),
        admin_email: None,
        location_config: None,
        studio_config: None,
        hours_until: None,
    };
    let report = mailer::dispatch(
        &state.mailer,
        &state.db,
        &state.settings,
        &notification,
        mailer::BOOKING_FANOUT_DELAY,
    )
    .await;

    if !report.success {
        log::warn!(
            "Booking {} recorded but the confirmation email failed",
            row.confirmation_number
        );
    }

    Ok(HttpResponse::Created().json(json!({
        "booking": row,
        "total": row.total(),
        "notification": report,
    })))
}

async fn booking_status(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let confirmation_number = path.into_inner();
    match fetch_booking_by_confirmation(&state.db, &confirmation_number).await {
        Some(row) => Ok(HttpResponse::Ok().json(json!({
            "confirmation_number": row.confirmation_number,
            "status": row.status,
            "service_name": row.service_name,
            "appointment_date": row.appointment_date,
            "appointment_time": row.appointment_time,
            "total": row.total(),
        }))),
        None => Ok(HttpResponse::NotFound().json(json!({ "error": "Booking not found." }))),
    }
}

async fn submit_message(
    state: web::Data<AppState>,
    form: web::Json<ContactForm>,
) -> Result<HttpResponse> {
    let form = form.into_inner();
    let mut errors = Vec::new();
    if form.name.trim().is_empty() {
        errors.push("Name is required.".to_string());
    }
    if !wizard::is_valid_email(&form.email) {
        errors.push("A valid email address is required.".to_string());
    }
    if form.subject.trim().is_empty() {
        errors.push("Subject is required.".to_string());
    }
    if form.body.trim().is_empty() {
        errors.push("Message body is required.".to_string());
    }
    if !errors.is_empty() {
        return Ok(HttpResponse::UnprocessableEntity().json(json!({ "errors": errors })));
    }

    let message_id = new_id();
    sqlx::query(
        r#"INSERT INTO contact_messages
           (id, sender_name, sender_email, sender_phone, inquiry_type, subject, body, status, admin_notes, created_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, NULL, ?)"#,
    )
    .bind(&message_id)
    .bind(form.name.trim())
    .bind(form.email.trim())
    .bind(if form.phone.trim().is_empty() {
        None
    } else {
        Some(form.phone.trim().to_string())
    })
    .bind(&form.inquiry_type)
    .bind(form.subject.trim())
    .bind(&form.body)
    .bind(MESSAGE_UNREAD)
    .bind(Utc::now().to_rfc3339())
    .execute(&state.db)
    .await
    .map_err(actix_web::error::ErrorInternalServerError)?;

    Ok(HttpResponse::Created().json(json!({ "id": message_id })))
}

async fn list_testimonials(state: web::Data<AppState>) -> Result<HttpResponse> {
    let testimonials = sqlx::query_as::<_, TestimonialRow>(
        "SELECT id, client_name, rating, body, photo_url, link_code, is_approved, created_at
         FROM testimonials WHERE is_approved = 1 ORDER BY created_at DESC",
    )
    .fetch_all(&state.db)
    .await
    .map_err(actix_web::error::ErrorInternalServerError)?;

    Ok(HttpResponse::Ok().json(testimonials))
}

async fn fetch_link(state: &AppState, code: &str) -> Option<TestimonialLinkRow> {
    sqlx::query_as::<_, TestimonialLinkRow>(
        "SELECT short_code, label, expires_at, max_uses, use_count, is_active, created_at
         FROM testimonial_links WHERE short_code = ? LIMIT 1",
    )
    .bind(code)
    .fetch_optional(&state.db)
    .await
    .unwrap_or(None)
}

async fn check_review_link(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let code = path.into_inner();
    match fetch_link(state.get_ref(), &code).await {
        Some(link) => {
            let status = link.status_at(Utc::now());
            Ok(HttpResponse::Ok().json(json!({
                "usable": status == LinkStatus::Usable,
                "reason": status.reason(),
            })))
        }
        None => Ok(HttpResponse::NotFound().json(json!({
            "usable": false,
            "reason": "invalid",
        }))),
    }
}

async fn submit_testimonial(
    state: web::Data<AppState>,
    path: web::Path<String>,
    form: web::Json<TestimonialForm>,
) -> Result<HttpResponse> {
    let code = path.into_inner();
    let Some(link) = fetch_link(state.get_ref(), &code).await else {
        return Ok(HttpResponse::NotFound().json(json!({
            "usable": false,
            "reason": "invalid",
        })));
    };

    let status = link.status_at(Utc::now());
    if status != LinkStatus::Usable {
        return Ok(HttpResponse::Forbidden().json(json!({
            "usable": false,
            "reason": status.reason(),
        })));
    }

    let form = form.into_inner();
    let mut errors = Vec::new();
    if form.client_name.trim().is_empty() {
        errors.push("Name is required.".to_string());
    }
    if !(1..=5).contains(&form.rating) {
        errors.push("Rating must be between 1 and 5.".to_string());
    }
    if form.body.trim().is_empty() {
        errors.push("Review text is required.".to_string());
    }
    if !errors.is_empty() {
        return Ok(HttpResponse::UnprocessableEntity().json(json!({ "errors": errors })));
    }

    let testimonial_id = new_id();
    sqlx::query(
        r#"INSERT INTO testimonials
           (id, client_name, rating, body, photo_url, link_code, is_approved, created_at)
           VALUES (?, ?, ?, ?, ?, ?, 0, ?)"#,
    )
    .bind(&testimonial_id)
    .bind(form.client_name.trim())
    .bind(form.rating)
    .bind(&form.body)
    .bind(&form.photo_url)
    .bind(&code)
    .bind(Utc::now().to_rfc3339())
    .execute(&state.db)
    .await
    .map_err(actix_web::error::ErrorInternalServerError)?;

    sqlx::query("UPDATE testimonial_links SET use_count = use_count + 1 WHERE short_code = ?")
        .bind(&code)
        .execute(&state.db)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;

    Ok(HttpResponse::Created().json(json!({ "id": testimonial_id })))
}
