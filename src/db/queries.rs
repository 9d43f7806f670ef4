use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, Connection, ErrorCode};
use serde::Serialize;

use crate::models::{Booking, BookingStatus, ServiceSnapshot};

const BOOKING_COLUMNS: &str = "id, date, time, service_name, service_price, service_duration, \
     customer_name, customer_phone, customer_email, vehicle_type, special_requests, \
     status, created_at, updated_at";

/// Why an insert was refused. The slot index makes double-booking a storage-
/// level conflict rather than a check-then-act race.
#[derive(Debug)]
pub enum InsertError {
    SlotTaken,
    DuplicateId,
    Db(rusqlite::Error),
}

impl std::fmt::Display for InsertError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InsertError::SlotTaken => write!(f, "time slot is already booked"),
            InsertError::DuplicateId => write!(f, "booking id already exists"),
            InsertError::Db(e) => write!(f, "database error: {e}"),
        }
    }
}

pub fn insert_booking(conn: &Connection, booking: &Booking) -> Result<(), InsertError> {
    let result = conn.execute(
        "INSERT INTO bookings (id, date, time, service_name, service_price, service_duration,
            customer_name, customer_phone, customer_email, vehicle_type, special_requests,
            status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            booking.id,
            booking.date.format("%Y-%m-%d").to_string(),
            booking.time,
            booking.service.name,
            booking.service.price,
            booking.service.duration_minutes,
            booking.customer_name,
            booking.customer_phone,
            booking.customer_email,
            booking.vehicle_type,
            booking.special_requests,
            booking.status.as_str(),
            booking.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            booking.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ],
    );

    match result {
        Ok(_) => Ok(()),
        Err(rusqlite::Error::SqliteFailure(err, Some(msg)))
            if err.code == ErrorCode::ConstraintViolation =>
        {
            // SQLite reports unique violations by column list, so the partial
            // slot index shows up as "bookings.date, bookings.time".
            if msg.contains("bookings.id") {
                Err(InsertError::DuplicateId)
            } else if msg.contains("bookings.date") {
                Err(InsertError::SlotTaken)
            } else {
                Err(InsertError::Db(rusqlite::Error::SqliteFailure(err, Some(msg))))
            }
        }
        Err(e) => Err(InsertError::Db(e)),
    }
}

pub fn get_all_bookings(conn: &Connection) -> anyhow::Result<Vec<Booking>> {
    let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings ORDER BY date DESC, time DESC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

/// All bookings on a date, any status, in slot order.
pub fn get_bookings_by_date(conn: &Connection, date: &NaiveDate) -> anyhow::Result<Vec<Booking>> {
    let date_str = date.format("%Y-%m-%d").to_string();
    let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE date = ?1 ORDER BY time ASC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![date_str], |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1");
    let result = conn.query_row(&sql, params![id], |row| Ok(parse_booking_row(row)));

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Sets the status and refreshes `updated_at`; `None` if the id is unknown.
pub fn update_booking_status(
    conn: &Connection,
    id: &str,
    status: BookingStatus,
) -> anyhow::Result<Option<Booking>> {
    let now = Utc::now()
        .naive_utc()
        .format("%Y-%m-%d %H:%M:%S")
        .to_string();
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), now, id],
    )?;
    if count == 0 {
        return Ok(None);
    }
    get_booking_by_id(conn, id)
}

pub fn delete_booking(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM bookings WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

pub fn is_time_slot_available(
    conn: &Connection,
    date: &NaiveDate,
    time: &str,
) -> anyhow::Result<bool> {
    let date_str = date.format("%Y-%m-%d").to_string();
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bookings WHERE date = ?1 AND time = ?2 AND status != 'cancelled'",
        params![date_str, time],
        |row| row.get(0),
    )?;
    Ok(count == 0)
}

/// Times already taken (non-cancelled) on a date, for slot-list subtraction.
pub fn booked_times(conn: &Connection, date: &NaiveDate) -> anyhow::Result<Vec<String>> {
    let date_str = date.format("%Y-%m-%d").to_string();
    let mut stmt = conn.prepare(
        "SELECT time FROM bookings WHERE date = ?1 AND status != 'cancelled' ORDER BY time ASC",
    )?;
    let rows = stmt.query_map(params![date_str], |row| row.get::<_, String>(0))?;

    let mut times = vec![];
    for row in rows {
        times.push(row?);
    }
    Ok(times)
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total: i64,
    pub pending: i64,
    pub confirmed: i64,
    pub completed: i64,
    pub cancelled: i64,
    pub total_revenue: f64,
}

/// Bookings (newest first) plus aggregate stats, optionally restricted to an
/// inclusive date range. The range only applies when both bounds are given.
pub fn get_bookings_for_dashboard(
    conn: &Connection,
    start: Option<&NaiveDate>,
    end: Option<&NaiveDate>,
) -> anyhow::Result<(Vec<Booking>, DashboardStats)> {
    let bookings = match (start, end) {
        (Some(start), Some(end)) => {
            let start_str = start.format("%Y-%m-%d").to_string();
            let end_str = end.format("%Y-%m-%d").to_string();
            let sql = format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings WHERE date >= ?1 AND date <= ?2 \
                 ORDER BY date DESC, time DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![start_str, end_str], |row| {
                Ok(parse_booking_row(row))
            })?;

            let mut bookings = vec![];
            for row in rows {
                bookings.push(row??);
            }
            bookings
        }
        _ => get_all_bookings(conn)?,
    };

    let mut stats = DashboardStats {
        total: bookings.len() as i64,
        pending: 0,
        confirmed: 0,
        completed: 0,
        cancelled: 0,
        total_revenue: 0.0,
    };
    for booking in &bookings {
        match booking.status {
            BookingStatus::Pending => stats.pending += 1,
            BookingStatus::Confirmed => stats.confirmed += 1,
            BookingStatus::Completed => stats.completed += 1,
            BookingStatus::Cancelled => stats.cancelled += 1,
        }
        if booking.status != BookingStatus::Cancelled {
            stats.total_revenue += booking.service.price;
        }
    }

    Ok((bookings, stats))
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let id: String = row.get(0)?;
    let date_str: String = row.get(1)?;
    let time: String = row.get(2)?;
    let service_name: String = row.get(3)?;
    let service_price: f64 = row.get(4)?;
    let service_duration: i64 = row.get(5)?;
    let customer_name: String = row.get(6)?;
    let customer_phone: String = row.get(7)?;
    let customer_email: String = row.get(8)?;
    let vehicle_type: String = row.get(9)?;
    let special_requests: Option<String> = row.get(10)?;
    let status_str: String = row.get(11)?;
    let created_at_str: String = row.get(12)?;
    let updated_at_str: String = row.get(13)?;

    let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
        .unwrap_or_else(|_| Utc::now().date_naive());
    let created_at = NaiveDateTime::parse_from_str(&created_at_str, "%Y-%m-%d %H:%M:%S")
        .unwrap_or_else(|_| Utc::now().naive_utc());
    let updated_at = NaiveDateTime::parse_from_str(&updated_at_str, "%Y-%m-%d %H:%M:%S")
        .unwrap_or_else(|_| Utc::now().naive_utc());

    Ok(Booking {
        id,
        date,
        time,
        service: ServiceSnapshot {
            name: service_name,
            price: service_price,
            duration_minutes: service_duration,
        },
        customer_name,
        customer_phone,
        customer_email,
        vehicle_type,
        special_requests,
        status: BookingStatus::parse(&status_str).unwrap_or(BookingStatus::Pending),
        created_at,
        updated_at,
    })
}
