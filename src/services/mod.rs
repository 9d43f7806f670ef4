pub mod booking;
pub mod notify;
pub mod slots;
pub mod validation;
