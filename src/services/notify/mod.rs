pub mod resend;
pub mod twilio;

use std::sync::Arc;

use async_trait::async_trait;

use crate::models::Booking;
use crate::state::AppState;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()>;
}

#[async_trait]
pub trait MessagingProvider: Send + Sync {
    async fn send_message(&self, to: &str, body: &str) -> anyhow::Result<()>;
}

/// Fire-and-forget fan-out after a booking is created. Runs on a detached
/// task; each channel fails independently and the booking is never rolled
/// back or delayed because of a notification.
pub async fn dispatch_booking_notifications(state: &Arc<AppState>, booking: &Booking) {
    let mut sent = 0;
    let mut failed = 0;

    let subject = format!(
        "Booking confirmation {} - {}",
        booking.id, state.config.business_name
    );
    match state
        .mailer
        .send_email(&booking.customer_email, &subject, &customer_email_body(state, booking))
        .await
    {
        Ok(()) => sent += 1,
        Err(e) => {
            failed += 1;
            tracing::error!(error = %e, booking_id = %booking.id, "failed to send customer confirmation");
        }
    }

    if !state.config.business_email.is_empty() {
        let subject = format!("New booking {}", booking.id);
        match state
            .mailer
            .send_email(&state.config.business_email, &subject, &business_email_body(booking))
            .await
        {
            Ok(()) => sent += 1,
            Err(e) => {
                failed += 1;
                tracing::error!(error = %e, booking_id = %booking.id, "failed to send business notification");
            }
        }
    }

    if let Some(messaging) = &state.messaging {
        if !state.config.business_whatsapp.is_empty() {
            let alert = whatsapp_alert_body(booking);
            match messaging
                .send_message(&state.config.business_whatsapp, &alert)
                .await
            {
                Ok(()) => sent += 1,
                Err(e) => {
                    failed += 1;
                    tracing::error!(error = %e, booking_id = %booking.id, "failed to send WhatsApp alert");
                }
            }
        }
    }

    tracing::info!(booking_id = %booking.id, sent, failed, "booking notifications dispatched");
}

fn customer_email_body(state: &Arc<AppState>, booking: &Booking) -> String {
    format!(
        "Hi {},\n\n\
         Your booking at {} is confirmed.\n\n\
         Booking id: {}\n\
         Service: {} ({} min) - {:.2} EUR\n\
         Date: {}\n\
         Time: {}\n\
         Vehicle: {}\n\n\
         See you then!",
        booking.customer_name,
        state.config.business_name,
        booking.id,
        booking.service.name,
        booking.service.duration_minutes,
        booking.service.price,
        booking.date.format("%Y-%m-%d"),
        booking.time,
        booking.vehicle_type,
    )
}

fn business_email_body(booking: &Booking) -> String {
    format!(
        "New booking {}\n\n\
         {} on {} at {}\n\
         Service: {} ({} min) - {:.2} EUR\n\
         Vehicle: {}\n\
         Phone: {}\n\
         Email: {}\n\
         Requests: {}",
        booking.id,
        booking.customer_name,
        booking.date.format("%Y-%m-%d"),
        booking.time,
        booking.service.name,
        booking.service.duration_minutes,
        booking.service.price,
        booking.vehicle_type,
        booking.customer_phone,
        booking.customer_email,
        booking.special_requests.as_deref().unwrap_or("-"),
    )
}

fn whatsapp_alert_body(booking: &Booking) -> String {
    format!(
        "New booking {}: {} on {} at {} ({})",
        booking.id,
        booking.customer_name,
        booking.date.format("%Y-%m-%d"),
        booking.time,
        booking.service.name,
    )
}
