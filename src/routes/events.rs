use actix_web::{http::header, web, HttpResponse};
use actix_web_httpauth::middleware::HttpAuthentication;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::{
    auth::admin_validator,
    state::{AppState, ServerEvent},
};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/events")
            .wrap(HttpAuthentication::basic(admin_validator))
            .route(web::get().to(stream_events)),
    )
    .service(
        web::resource("/api/bookings/{confirmation_number}/events")
            .route(web::get().to(stream_booking_events)),
    );
}

/// Full change feed for the admin dashboard. Each event tells subscribers
/// which collection to refetch; no incremental patches.
async fn stream_events(state: web::Data<AppState>) -> HttpResponse {
    let rx = state.events.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(event) => Some(Ok::<web::Bytes, actix_web::Error>(event_to_bytes(&event))),
        Err(_) => None,
    });

    HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, "text/event-stream"))
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .streaming(stream)
}

fn event_to_bytes(event: &ServerEvent) -> web::Bytes {
    let payload = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    web::Bytes::from(format!("event: update\ndata: {}\n\n", payload))
}

#[derive(serde::Serialize)]
struct PublicBookingEvent {
    confirmation_number: Option<String>,
    status: Option<String>,
    service_name: Option<String>,
    appointment_date: Option<String>,
    appointment_time: Option<String>,
}

/// Public status feed for one booking, filtered by confirmation number.
async fn stream_booking_events(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> HttpResponse {
    let confirmation_number = path.into_inner();
    let rx = state.events.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |result| {
        let event = match result {
            Ok(event) => event,
            Err(_) => return None,
        };
        if event.confirmation_number.as_deref() != Some(&confirmation_number) {
            return None;
        }
        let public = PublicBookingEvent {
            confirmation_number: event.confirmation_number,
            status: event.status,
            service_name: event.service_name,
            appointment_date: event.appointment_date,
            appointment_time: event.appointment_time,
        };
        Some(Ok::<web::Bytes, actix_web::Error>(public_event_to_bytes(
            &public,
        )))
    });

    HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, "text/event-stream"))
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .streaming(stream)
}

fn public_event_to_bytes(event: &PublicBookingEvent) -> web::Bytes {
    let payload = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    web::Bytes::from(format!("event: update\ndata: {}\n\n", payload))
}
