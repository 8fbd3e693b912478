use actix_web::{test, web, App};
use chrono::{Datelike, NaiveDate, Weekday};
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tokio::sync::broadcast;

use fna_studio::{
    db, mailer::EmailClient, routes, settings::SettingsCache, state::AppState, wizard,
};

async fn test_state() -> AppState {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("connect in-memory db");
    db::run_migrations(&pool).await.expect("migrations");
    db::seed_defaults(&pool).await.expect("seed");

    let (events, _) = broadcast::channel(16);
    AppState {
        db: pool,
        events,
        // Unroutable provider; sends fail fast, bookings must still land.
        mailer: EmailClient::new(
            "http://127.0.0.1:9/emails".to_string(),
            "test-key".to_string(),
            "test@example.com".to_string(),
        ),
        settings: SettingsCache::new(),
    }
}

fn next_weekday(mut date: NaiveDate, weekday: Weekday) -> NaiveDate {
    while date.weekday() != weekday {
        date = date.succ_opt().expect("date overflow");
    }
    date
}

async fn service_id_by_name(pool: &SqlitePool, name: &str) -> String {
    sqlx::query_as::<_, (String,)>("SELECT id FROM services WHERE name = ?")
        .bind(name)
        .fetch_one(pool)
        .await
        .expect("seeded service")
        .0
}

async fn add_on_id_by_name(pool: &SqlitePool, name: &str) -> String {
    sqlx::query_as::<_, (String,)>("SELECT id FROM add_ons WHERE name = ?")
        .bind(name)
        .fetch_one(pool)
        .await
        .expect("seeded add-on")
        .0
}

fn submission(state_date: &str, service_id: &str, add_on_ids: Vec<String>) -> Value {
    json!({
        "service_id": service_id,
        "add_on_ids": add_on_ids,
        "appointment_date": state_date,
        "appointment_time": "10:00 AM",
        "client": {
            "name": "Robin Doe",
            "email": "robin@example.com",
            "phone": "(503) 555-0101",
            "notes": "Gel removal first, please."
        }
    })
}

#[actix_web::test]
async fn booking_flow_freezes_pricing_and_generates_confirmation() {
    let state = test_state().await;
    let pool = state.db.clone();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(routes::public::configure),
    )
    .await;

    let service_id = service_id_by_name(&pool, "Luxury Spa Pedicure").await;
    let accent = add_on_id_by_name(&pool, "Nail Art Accent").await;
    let chrome = add_on_id_by_name(&pool, "Chrome Finish").await;
    let tuesday = next_weekday(NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(), Weekday::Tue)
        .format("%Y-%m-%d")
        .to_string();

    let req = test::TestRequest::post()
        .uri("/api/bookings")
        .set_json(submission(&tuesday, &service_id, vec![accent, chrome]))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);

    let body: Value = test::read_body_json(resp).await;
    let booking = &body["booking"];
    assert_eq!(booking["service_price"], json!(65.0));
    assert_eq!(booking["add_ons_total"], json!(50.0));
    assert_eq!(body["total"], json!(115.0));

    let selected: Vec<Value> =
        serde_json::from_str(booking["selected_add_ons"].as_str().unwrap()).unwrap();
    assert_eq!(selected.len(), 2);

    let confirmation_number = booking["confirmation_number"].as_str().unwrap();
    assert!(confirmation_number.starts_with("FNA-"));
    assert_eq!(confirmation_number.len(), 13);
    assert!(confirmation_number[4..]
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));

    // Notification delivery failed (unroutable provider) without rolling
    // back the booking. The client failure did not stop the admin send;
    // every attempt lands in the per-recipient result list.
    assert_eq!(body["notification"]["success"], json!(false));
    let results = body["notification"]["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["role"], json!("client"));
    assert_eq!(results[0]["recipient"], json!("robin@example.com"));
    assert_eq!(results[0]["success"], json!(false));
    assert!(results[0]["error"].is_string());
    assert_eq!(results[1]["role"], json!("admin"));
    assert_eq!(results[1]["success"], json!(false));

    let req = test::TestRequest::get()
        .uri(&format!("/api/bookings/{confirmation_number}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let status: Value = test::read_body_json(resp).await;
    assert_eq!(status["status"], json!("confirmed"));
    assert_eq!(status["total"], json!(115.0));
}

#[actix_web::test]
async fn taken_slot_is_rejected_with_conflict() {
    let state = test_state().await;
    let pool = state.db.clone();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(routes::public::configure),
    )
    .await;

    let service_id = service_id_by_name(&pool, "Classic Manicure").await;
    let tuesday = next_weekday(NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(), Weekday::Tue)
        .format("%Y-%m-%d")
        .to_string();

    let req = test::TestRequest::post()
        .uri("/api/bookings")
        .set_json(submission(&tuesday, &service_id, vec![]))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);

    let req = test::TestRequest::post()
        .uri("/api/bookings")
        .set_json(submission(&tuesday, &service_id, vec![]))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 409);
}

#[actix_web::test]
async fn availability_reflects_template_and_booked_slots() {
    let state = test_state().await;
    let pool = state.db.clone();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(routes::public::configure),
    )
    .await;

    let tuesday = next_weekday(NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(), Weekday::Tue)
        .format("%Y-%m-%d")
        .to_string();

    // Occupy everything except the lunch slot.
    for slot in wizard::DAY_SLOTS {
        if slot == wizard::LUNCH_SLOT {
            continue;
        }
        sqlx::query(
            r#"INSERT INTO bookings
               (id, confirmation_number, service_name, service_price, selected_add_ons,
                add_ons_total, appointment_date, appointment_time, client_name, client_email,
                client_phone, notes, admin_notes, status, created_at)
               VALUES (?, ?, 'Classic Manicure', 35.0, '[]', 0, ?, ?, 'X', 'x@example.com',
                       '5035550100', NULL, NULL, 'confirmed', ?)"#,
        )
        .bind(fna_studio::auth::new_id())
        .bind(wizard::new_confirmation_number())
        .bind(&tuesday)
        .bind(slot)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&pool)
        .await
        .expect("insert booking");
    }

    let req = test::TestRequest::get()
        .uri(&format!("/api/availability?date={tuesday}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["slots"].as_array().unwrap().len(), 0);

    let sunday = next_weekday(NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(), Weekday::Sun)
        .format("%Y-%m-%d")
        .to_string();
    let req = test::TestRequest::get()
        .uri(&format!("/api/availability?date={sunday}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["slots"].as_array().unwrap().len(), 0);
}

#[actix_web::test]
async fn review_link_gate_tracks_uses() {
    let state = test_state().await;
    let pool = state.db.clone();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(routes::public::configure),
    )
    .await;

    sqlx::query(
        r#"INSERT INTO testimonial_links
           (short_code, label, expires_at, max_uses, use_count, is_active, created_at)
           VALUES ('ABC123', 'Summer clients', NULL, 1, 0, 1, ?)"#,
    )
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(&pool)
    .await
    .expect("insert link");

    let req = test::TestRequest::get()
        .uri("/api/review-links/ABC123")
        .to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["usable"], json!(true));

    let review = json!({
        "client_name": "Robin Doe",
        "rating": 5,
        "body": "Best gel set in town."
    });
    let req = test::TestRequest::post()
        .uri("/api/review-links/ABC123/testimonials")
        .set_json(&review)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);

    // Single-use link is exhausted now.
    let req = test::TestRequest::post()
        .uri("/api/review-links/ABC123/testimonials")
        .set_json(&review)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 403);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["reason"], json!("limit-reached"));

    let req = test::TestRequest::get()
        .uri("/api/review-links/MISSING")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["reason"], json!("invalid"));
}
