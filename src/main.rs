use std::sync::{Arc, Mutex};

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use washbook::config::AppConfig;
use washbook::db;
use washbook::handlers;
use washbook::services::notify::resend::ResendMailer;
use washbook::services::notify::twilio::TwilioWhatsAppProvider;
use washbook::services::notify::MessagingProvider;
use washbook::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;

    let mailer = ResendMailer::new(config.resend_api_key.clone(), config.mail_from.clone());

    let messaging: Option<Box<dyn MessagingProvider>> = if config.twilio_account_sid.is_empty() {
        tracing::info!("Twilio not configured, WhatsApp alerts disabled");
        None
    } else {
        Some(Box::new(TwilioWhatsAppProvider::new(
            config.twilio_account_sid.clone(),
            config.twilio_auth_token.clone(),
            config.twilio_whatsapp_from.clone(),
        )))
    };

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        mailer: Box::new(mailer),
        messaging,
    });

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/bookings", post(handlers::bookings::create_booking))
        .route(
            "/api/bookings/slots",
            get(handlers::bookings::get_available_slots),
        )
        .route(
            "/api/admin/bookings",
            get(handlers::admin::get_bookings)
                .put(handlers::admin::update_booking)
                .delete(handlers::admin::delete_booking),
        )
        .layer(TraceLayer::new_for_http())
        // The booking form lives on the static marketing site.
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
