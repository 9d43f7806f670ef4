pub mod booking;
pub mod hours;

pub use booking::{Booking, BookingStatus, ServiceSnapshot};
pub use hours::{BusinessHours, OpeningHours};
