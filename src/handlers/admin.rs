use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::BookingStatus;
use crate::services::validation::ValidationError;
use crate::state::AppState;

fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if token.is_empty() || token != expected_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

fn parse_date(s: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::Validation(ValidationError::InvalidDateFormat))
}

// GET /api/admin/bookings
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminBookingsQuery {
    pub date: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

pub async fn get_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<AdminBookingsQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    if let Some(date) = &query.date {
        let date = parse_date(date)?;
        let bookings = {
            let db = state.db.lock().unwrap();
            queries::get_bookings_by_date(&db, &date)?
        };
        return Ok(Json(serde_json::json!({
            "success": true,
            "count": bookings.len(),
            "bookings": bookings,
        })));
    }

    let start = query.start_date.as_deref().map(parse_date).transpose()?;
    let end = query.end_date.as_deref().map(parse_date).transpose()?;

    let (bookings, stats) = {
        let db = state.db.lock().unwrap();
        queries::get_bookings_for_dashboard(&db, start.as_ref(), end.as_ref())?
    };

    Ok(Json(serde_json::json!({
        "success": true,
        "bookings": bookings,
        "stats": stats,
    })))
}

// PUT /api/admin/bookings
#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub id: String,
    pub status: String,
}

pub async fn update_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    // Auth comes first so a bad body never leaks past the token check.
    check_auth(&headers, &state.config.admin_token)?;

    let Json(req) = payload.map_err(|_| AppError::MalformedRequest)?;

    let status = BookingStatus::parse(&req.status)
        .ok_or_else(|| AppError::InvalidStatus(req.status.clone()))?;

    let booking = {
        let db = state.db.lock().unwrap();
        queries::update_booking_status(&db, &req.id, status)?
    }
    .ok_or_else(|| AppError::NotFound(req.id.clone()))?;

    tracing::info!(booking_id = %booking.id, status = status.as_str(), "booking status updated");

    Ok(Json(serde_json::json!({
        "success": true,
        "booking": booking,
    })))
}

// DELETE /api/admin/bookings
#[derive(Deserialize)]
pub struct DeleteBookingQuery {
    pub id: String,
}

pub async fn delete_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<DeleteBookingQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let deleted = {
        let db = state.db.lock().unwrap();
        queries::delete_booking(&db, &query.id)?
    };
    if !deleted {
        return Err(AppError::NotFound(query.id));
    }

    tracing::info!(booking_id = %query.id, "booking deleted");

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Booking deleted",
    })))
}
