use chrono::NaiveDate;

use crate::models::hours::{parse_time, BusinessHours};

/// Booking grid granularity in minutes.
pub const SLOT_MINUTES: i64 = 30;

/// Bookable slot starts (`HH:MM`, ascending) for a date: every grid point
/// from opening where the full service still fits before closing. Closed
/// weekdays yield an empty list.
pub fn available_slots(
    date: &NaiveDate,
    duration_minutes: i64,
    hours: &BusinessHours,
) -> Vec<String> {
    let Some(day) = hours.for_date(date) else {
        return vec![];
    };
    let (Ok(open), Ok(close)) = (parse_time(&day.open), parse_time(&day.close)) else {
        return vec![];
    };

    // A shorter service still occupies a whole slot.
    let duration = duration_minutes.max(SLOT_MINUTES);

    let mut slots = vec![];
    let mut start = open;
    while start + duration <= close {
        slots.push(format!("{:02}:{:02}", start / 60, start % 60));
        start += SLOT_MINUTES;
    }
    slots
}

/// Whether `time` is a valid slot start for this date and duration.
pub fn is_bookable(date: &NaiveDate, time: &str, duration_minutes: i64, hours: &BusinessHours) -> bool {
    available_slots(date, duration_minutes, hours)
        .iter()
        .any(|slot| slot == time)
}
