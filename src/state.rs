use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::services::notify::{Mailer, MessagingProvider};

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub mailer: Box<dyn Mailer>,
    /// WhatsApp alerts are optional; `None` when Twilio is not configured.
    pub messaging: Option<Box<dyn MessagingProvider>>,
}
