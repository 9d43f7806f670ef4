use chrono::{Datelike, Utc};
use rusqlite::Connection;
use serde::Deserialize;
use uuid::Uuid;

use crate::db::queries::{self, InsertError};
use crate::errors::AppError;
use crate::models::{Booking, BookingStatus, BusinessHours, ServiceSnapshot};
use crate::services::slots;
use crate::services::validation::{self, ValidationError};

/// Raw booking payload from the website form. Fields are optional so that
/// presence can be reported per field instead of a generic parse error.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub date: Option<String>,
    pub time: Option<String>,
    pub service: Option<ServicePayload>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub vehicle_type: Option<String>,
    pub special_requests: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ServicePayload {
    /// Finnish service title, the name the marketing site sends.
    #[serde(rename = "titleFi")]
    pub title_fi: Option<String>,
    pub price: Option<f64>,
    pub duration: Option<i64>,
}

fn required<'a>(value: &'a Option<String>, field: &'static str) -> Result<&'a str, AppError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(AppError::MissingField(field))
}

/// The "submit a booking" use case: field presence, validation, slot check,
/// insert. Runs under the caller-held connection lock, so the availability
/// check and the insert cannot interleave with another request; the partial
/// unique index backs this up at the storage layer.
pub fn create_booking(
    conn: &Connection,
    hours: &BusinessHours,
    req: &BookingRequest,
) -> Result<Booking, AppError> {
    let date_raw = required(&req.date, "date")?;
    let time_raw = required(&req.time, "time")?;
    let name_raw = required(&req.customer_name, "customerName")?;
    let phone_raw = required(&req.customer_phone, "customerPhone")?;
    let email_raw = required(&req.customer_email, "customerEmail")?;
    let vehicle_type = required(&req.vehicle_type, "vehicleType")?.to_string();

    let service = req
        .service
        .as_ref()
        .ok_or(AppError::MissingField("service"))?;
    let service_name = service
        .title_fi
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(AppError::MissingField("service.titleFi"))?
        .to_string();
    let price = service.price.ok_or(AppError::MissingField("service.price"))?;
    let duration_minutes = service
        .duration
        .ok_or(AppError::MissingField("service.duration"))?;

    let (date, time) = validation::validate_date_time(date_raw, time_raw, hours)?;
    let customer_name = validation::validate_name(name_raw)?;
    let customer_phone = validation::validate_phone(phone_raw)?;
    let customer_email = validation::validate_email(email_raw)?;

    if !slots::is_bookable(&date, &time, duration_minutes, hours) {
        return Err(ValidationError::OutsideOpeningHours {
            hours: hours.to_human_readable(),
        }
        .into());
    }

    let special_requests = req
        .special_requests
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    let now = Utc::now().naive_utc();
    let mut attempts = 0;
    loop {
        let booking = Booking {
            id: generate_booking_id(),
            date,
            time: time.clone(),
            service: ServiceSnapshot {
                name: service_name.clone(),
                price,
                duration_minutes,
            },
            customer_name: customer_name.clone(),
            customer_phone: customer_phone.clone(),
            customer_email: customer_email.clone(),
            vehicle_type: vehicle_type.clone(),
            special_requests: special_requests.clone(),
            status: BookingStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        match queries::insert_booking(conn, &booking) {
            Ok(()) => return Ok(booking),
            Err(InsertError::SlotTaken) => return Err(AppError::SlotUnavailable),
            Err(InsertError::DuplicateId) if attempts < 16 => {
                attempts += 1;
                tracing::debug!(attempts, "booking id collision, retrying");
            }
            Err(InsertError::DuplicateId) => {
                return Err(AppError::Internal(anyhow::anyhow!(
                    "exhausted booking id retries"
                )))
            }
            Err(InsertError::Db(e)) => return Err(AppError::Database(e)),
        }
    }
}

/// `BK-<year>-<4 digits>`. Collisions are resolved by the insert retry loop,
/// not left to chance.
fn generate_booking_id() -> String {
    let year = Utc::now().year();
    let n = (Uuid::new_v4().as_u128() % 10_000) as u16;
    format!("BK-{year}-{n:04}")
}
