use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::services::booking::BookingRequest;
use crate::services::validation::ValidationError;
use crate::services::{booking, notify, slots};
use crate::state::AppState;

// POST /api/bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BookingRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Json(req) = payload.map_err(|_| AppError::MalformedRequest)?;

    let booking = {
        let db = state.db.lock().unwrap();
        booking::create_booking(&db, &state.config.business_hours, &req)?
    };

    tracing::info!(
        booking_id = %booking.id,
        date = %booking.date,
        time = %booking.time,
        service = %booking.service.name,
        "booking created"
    );

    // Respond right away; notification latency and failures stay off the
    // request path.
    let notify_state = Arc::clone(&state);
    let notify_booking = booking.clone();
    tokio::spawn(async move {
        notify::dispatch_booking_notifications(&notify_state, &notify_booking).await;
    });

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Booking received! A confirmation email is on its way.",
        "bookingId": booking.id,
        "booking": {
            "date": booking.date.format("%Y-%m-%d").to_string(),
            "time": booking.time,
            "service": booking.service.name,
            "price": booking.service.price,
        },
    })))
}

// GET /api/bookings/slots
#[derive(Deserialize)]
pub struct SlotsQuery {
    pub date: String,
    pub duration: Option<i64>,
}

pub async fn get_available_slots(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let date = NaiveDate::parse_from_str(query.date.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::Validation(ValidationError::InvalidDateFormat))?;
    let duration = query.duration.unwrap_or(slots::SLOT_MINUTES);

    let free: Vec<String> = {
        let db = state.db.lock().unwrap();
        let booked = queries::booked_times(&db, &date)?;
        slots::available_slots(&date, duration, &state.config.business_hours)
            .into_iter()
            .filter(|slot| !booked.contains(slot))
            .collect()
    };

    Ok(Json(serde_json::json!({
        "success": true,
        "date": date.format("%Y-%m-%d").to_string(),
        "slots": free,
    })))
}
