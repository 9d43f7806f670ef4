use std::env;

use crate::models::BusinessHours;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_token: String,
    pub business_name: String,
    pub business_email: String,
    pub business_hours: BusinessHours,
    pub resend_api_key: String,
    pub mail_from: String,
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    pub twilio_whatsapp_from: String,
    pub business_whatsapp: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "washbook.db".to_string()),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or_else(|_| "changeme".to_string()),
            business_name: env::var("BUSINESS_NAME")
                .unwrap_or_else(|_| "Premium Auto Wash".to_string()),
            business_email: env::var("BUSINESS_EMAIL").unwrap_or_default(),
            business_hours: business_hours_from_env(env::var("BUSINESS_HOURS").ok()),
            resend_api_key: env::var("RESEND_API_KEY").unwrap_or_default(),
            mail_from: env::var("MAIL_FROM")
                .unwrap_or_else(|_| "bookings@example.com".to_string()),
            twilio_account_sid: env::var("TWILIO_ACCOUNT_SID").unwrap_or_default(),
            twilio_auth_token: env::var("TWILIO_AUTH_TOKEN").unwrap_or_default(),
            twilio_whatsapp_from: env::var("TWILIO_WHATSAPP_FROM").unwrap_or_default(),
            business_whatsapp: env::var("BUSINESS_WHATSAPP").unwrap_or_default(),
        }
    }
}

fn business_hours_from_env(raw: Option<String>) -> BusinessHours {
    match raw {
        Some(json) => match BusinessHours::from_json(&json) {
            Ok(hours) => hours,
            Err(e) => {
                tracing::warn!("ignoring malformed BUSINESS_HOURS, using defaults: {e}");
                BusinessHours::default()
            }
        },
        None => BusinessHours::default(),
    }
}
