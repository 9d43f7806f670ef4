use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use chrono::{Datelike, Days, NaiveDate, Utc, Weekday};
use tower::ServiceExt;

use washbook::config::AppConfig;
use washbook::db;
use washbook::handlers;
use washbook::models::BusinessHours;
use washbook::services::notify::{Mailer, MessagingProvider};
use washbook::state::AppState;

// ── Mock Providers ──

#[derive(Clone)]
struct MockMailer {
    sent: Arc<Mutex<Vec<(String, String, String)>>>,
    fail: bool,
}

impl MockMailer {
    fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(vec![])),
            fail: false,
        }
    }

    fn failing() -> Self {
        Self {
            sent: Arc::new(Mutex::new(vec![])),
            fail: true,
        }
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        if self.fail {
            return Err(anyhow::anyhow!("smtp relay unreachable"));
        }
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), subject.to_string(), body.to_string()));
        Ok(())
    }
}

#[derive(Clone)]
struct MockMessaging {
    sent: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockMessaging {
    fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(vec![])),
        }
    }
}

#[async_trait]
impl MessagingProvider for MockMessaging {
    async fn send_message(&self, to: &str, body: &str) -> anyhow::Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), body.to_string()));
        Ok(())
    }
}

// ── Helpers ──

fn test_config() -> AppConfig {
    AppConfig {
        port: 3000,
        database_url: ":memory:".to_string(),
        admin_token: "test-token".to_string(),
        business_name: "Premium Auto Wash".to_string(),
        business_email: "owner@example.com".to_string(),
        business_hours: BusinessHours::default(),
        resend_api_key: "".to_string(),
        mail_from: "bookings@example.com".to_string(),
        twilio_account_sid: "".to_string(),
        twilio_auth_token: "".to_string(),
        twilio_whatsapp_from: "+15551234567".to_string(),
        business_whatsapp: "+15559999999".to_string(),
    }
}

struct TestHarness {
    state: Arc<AppState>,
    mailer: MockMailer,
    messaging: MockMessaging,
}

fn test_harness() -> TestHarness {
    let config = test_config();
    let conn = db::init_db(":memory:").unwrap();
    let mailer = MockMailer::new();
    let messaging = MockMessaging::new();
    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config,
        mailer: Box::new(mailer.clone()),
        messaging: Some(Box::new(messaging.clone())),
    });
    TestHarness {
        state,
        mailer,
        messaging,
    }
}

fn test_app(state: Arc<AppState>) -> Router {
    Router::new()
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
        .with_state(state)
}

/// First date strictly after today that falls on `target`.
fn next_weekday(target: Weekday) -> NaiveDate {
    let mut d = Utc::now().date_naive() + Days::new(1);
    while d.weekday() != target {
        d = d + Days::new(1);
    }
    d
}

fn booking_payload(date: &str, time: &str) -> serde_json::Value {
    serde_json::json!({
        "date": date,
        "time": time,
        "service": { "titleFi": "Peruspesu", "price": 15, "duration": 30 },
        "customerName": "Matti Meikäläinen",
        "customerPhone": "+358 40 123 4567",
        "customerEmail": "matti@example.com",
        "vehicleType": "Sedan",
    })
}

fn post_booking(payload: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/bookings")
        .header("Content-Type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

async fn read_json(res: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn create_booking_ok(
    state: Arc<AppState>,
    date: &str,
    time: &str,
) -> serde_json::Value {
    let res = test_app(state)
        .oneshot(post_booking(&booking_payload(date, time)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    read_json(res).await
}

// ── Booking creation ──

#[tokio::test]
async fn test_health() {
    let harness = test_harness();
    let res = test_app(harness.state)
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_valid_booking_succeeds() {
    let harness = test_harness();
    let monday = next_weekday(Weekday::Mon).format("%Y-%m-%d").to_string();

    let json = create_booking_ok(harness.state.clone(), &monday, "10:00").await;

    assert_eq!(json["success"], true);
    let id = json["bookingId"].as_str().unwrap();
    let parts: Vec<&str> = id.split('-').collect();
    assert_eq!(parts[0], "BK");
    assert_eq!(parts[1].len(), 4);
    assert_eq!(parts[2].len(), 4);
    assert!(parts[2].chars().all(|c| c.is_ascii_digit()));

    assert_eq!(json["booking"]["date"], monday);
    assert_eq!(json["booking"]["time"], "10:00");
    assert_eq!(json["booking"]["service"], "Peruspesu");
    assert_eq!(json["booking"]["price"], 15.0);
}

#[tokio::test]
async fn test_booking_dispatches_notifications() {
    let harness = test_harness();
    let monday = next_weekday(Weekday::Mon).format("%Y-%m-%d").to_string();

    create_booking_ok(harness.state.clone(), &monday, "10:00").await;

    // The fan-out runs on a detached task after the response.
    tokio::time::sleep(Duration::from_millis(200)).await;

    let mails = harness.mailer.sent.lock().unwrap();
    assert_eq!(mails.len(), 2);
    assert_eq!(mails[0].0, "matti@example.com");
    assert!(mails[0].1.contains("Booking confirmation"));
    assert_eq!(mails[1].0, "owner@example.com");

    let messages = harness.messaging.sent.lock().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].0, "+15559999999");
    assert!(messages[0].1.contains("New booking"));
}

#[tokio::test]
async fn test_notification_failure_does_not_affect_booking() {
    let config = test_config();
    let conn = db::init_db(":memory:").unwrap();
    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config,
        mailer: Box::new(MockMailer::failing()),
        messaging: None,
    });
    let monday = next_weekday(Weekday::Mon).format("%Y-%m-%d").to_string();

    let json = create_booking_ok(state.clone(), &monday, "10:00").await;
    assert_eq!(json["success"], true);

    tokio::time::sleep(Duration::from_millis(200)).await;

    // The booking survived the failed notifications.
    let res = test_app(state)
        .oneshot(
            Request::builder()
                .uri(format!("/api/admin/bookings?date={monday}"))
                .header("Authorization", "Bearer test-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = read_json(res).await;
    assert_eq!(json["count"], 1);
}

#[tokio::test]
async fn test_double_booking_conflicts() {
    let harness = test_harness();
    let monday = next_weekday(Weekday::Mon).format("%Y-%m-%d").to_string();

    create_booking_ok(harness.state.clone(), &monday, "10:00").await;

    let res = test_app(harness.state)
        .oneshot(post_booking(&booking_payload(&monday, "10:00")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let json = read_json(res).await;
    assert!(json["error"].as_str().unwrap().contains("already booked"));
}

#[tokio::test]
async fn test_past_date_rejected() {
    let harness = test_harness();
    let yesterday = (Utc::now().date_naive() - Days::new(1))
        .format("%Y-%m-%d")
        .to_string();

    let res = test_app(harness.state)
        .oneshot(post_booking(&booking_payload(&yesterday, "10:00")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let json = read_json(res).await;
    assert!(json["error"].as_str().unwrap().contains("past"));
}

#[tokio::test]
async fn test_closed_day_rejected() {
    let harness = test_harness();
    let sunday = next_weekday(Weekday::Sun).format("%Y-%m-%d").to_string();

    let res = test_app(harness.state)
        .oneshot(post_booking(&booking_payload(&sunday, "10:00")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let json = read_json(res).await;
    assert!(json["error"].as_str().unwrap().contains("closed"));
}

#[tokio::test]
async fn test_time_past_closing_rejected() {
    let harness = test_harness();
    let monday = next_weekday(Weekday::Mon).format("%Y-%m-%d").to_string();

    // Well-formed time, but a 60-minute wash can't start at 23:45.
    let mut payload = booking_payload(&monday, "23:45");
    payload["service"] = serde_json::json!({
        "titleFi": "Premium-pesu", "price": 40, "duration": 60
    });

    let res = test_app(harness.state)
        .oneshot(post_booking(&payload))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_phone_rejected() {
    let harness = test_harness();
    let monday = next_weekday(Weekday::Mon).format("%Y-%m-%d").to_string();

    let mut payload = booking_payload(&monday, "10:00");
    payload["customerPhone"] = serde_json::json!("12345");

    let res = test_app(harness.state)
        .oneshot(post_booking(&payload))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let json = read_json(res).await;
    assert!(json["error"].as_str().unwrap().contains("phone"));
}

#[tokio::test]
async fn test_invalid_email_rejected() {
    let harness = test_harness();
    let monday = next_weekday(Weekday::Mon).format("%Y-%m-%d").to_string();

    let mut payload = booking_payload(&monday, "10:00");
    payload["customerEmail"] = serde_json::json!("not-an-email");

    let res = test_app(harness.state)
        .oneshot(post_booking(&payload))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_field_rejected() {
    let harness = test_harness();
    let monday = next_weekday(Weekday::Mon).format("%Y-%m-%d").to_string();

    let mut payload = booking_payload(&monday, "10:00");
    payload.as_object_mut().unwrap().remove("customerName");

    let res = test_app(harness.state)
        .oneshot(post_booking(&payload))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let json = read_json(res).await;
    assert!(json["error"]
        .as_str()
        .unwrap()
        .contains("Missing required field: customerName"));
}

#[tokio::test]
async fn test_malformed_json_rejected() {
    let harness = test_harness();

    let res = test_app(harness.state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/bookings")
                .header("Content-Type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

// ── Slot listing ──

#[tokio::test]
async fn test_slots_exclude_booked_times() {
    let harness = test_harness();
    let monday = next_weekday(Weekday::Mon).format("%Y-%m-%d").to_string();

    create_booking_ok(harness.state.clone(), &monday, "10:00").await;

    let res = test_app(harness.state)
        .oneshot(
            Request::builder()
                .uri(format!("/api/bookings/slots?date={monday}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = read_json(res).await;
    let slots: Vec<&str> = json["slots"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s.as_str().unwrap())
        .collect();
    assert!(!slots.contains(&"10:00"));
    assert!(slots.contains(&"08:00"));
    assert!(slots.contains(&"17:30"));
}

#[tokio::test]
async fn test_slots_empty_on_closed_day() {
    let harness = test_harness();
    let sunday = next_weekday(Weekday::Sun).format("%Y-%m-%d").to_string();

    let res = test_app(harness.state)
        .oneshot(
            Request::builder()
                .uri(format!("/api/bookings/slots?date={sunday}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = read_json(res).await;
    assert_eq!(json["slots"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_slots_bad_date_rejected() {
    let harness = test_harness();
    let res = test_app(harness.state)
        .oneshot(
            Request::builder()
                .uri("/api/bookings/slots?date=16.6.2025")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

// ── Admin API ──

#[tokio::test]
async fn test_admin_requires_auth() {
    let harness = test_harness();

    let res = test_app(harness.state)
        .oneshot(
            Request::builder()
                .uri("/api/admin/bookings")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let json = read_json(res).await;
    assert_eq!(json["error"], "Unauthorized");
}

#[tokio::test]
async fn test_admin_wrong_token() {
    let harness = test_harness();

    let res = test_app(harness.state)
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/admin/bookings?id=BK-2025-0001")
                .header("Authorization", "Bearer wrong-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_bookings_by_date() {
    let harness = test_harness();
    let monday = next_weekday(Weekday::Mon).format("%Y-%m-%d").to_string();

    create_booking_ok(harness.state.clone(), &monday, "10:00").await;
    create_booking_ok(harness.state.clone(), &monday, "14:00").await;

    let res = test_app(harness.state)
        .oneshot(
            Request::builder()
                .uri(format!("/api/admin/bookings?date={monday}"))
                .header("Authorization", "Bearer test-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = read_json(res).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["count"], 2);
    let bookings = json["bookings"].as_array().unwrap();
    assert_eq!(bookings[0]["time"], "10:00");
    assert_eq!(bookings[1]["time"], "14:00");
}

#[tokio::test]
async fn test_admin_dashboard_stats() {
    let harness = test_harness();
    let monday = next_weekday(Weekday::Mon).format("%Y-%m-%d").to_string();

    let first = create_booking_ok(harness.state.clone(), &monday, "10:00").await;
    create_booking_ok(harness.state.clone(), &monday, "14:00").await;

    // Cancel the first one; its price must drop out of revenue.
    let id = first["bookingId"].as_str().unwrap();
    let res = test_app(harness.state.clone())
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/api/admin/bookings")
                .header("Authorization", "Bearer test-token")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    serde_json::json!({ "id": id, "status": "cancelled" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = test_app(harness.state)
        .oneshot(
            Request::builder()
                .uri("/api/admin/bookings")
                .header("Authorization", "Bearer test-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = read_json(res).await;
    assert_eq!(json["stats"]["total"], 2);
    assert_eq!(json["stats"]["pending"], 1);
    assert_eq!(json["stats"]["cancelled"], 1);
    assert_eq!(json["stats"]["totalRevenue"], 15.0);
}

#[tokio::test]
async fn test_admin_update_status() {
    let harness = test_harness();
    let monday = next_weekday(Weekday::Mon).format("%Y-%m-%d").to_string();

    let created = create_booking_ok(harness.state.clone(), &monday, "10:00").await;
    let id = created["bookingId"].as_str().unwrap();

    let res = test_app(harness.state)
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/api/admin/bookings")
                .header("Authorization", "Bearer test-token")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    serde_json::json!({ "id": id, "status": "confirmed" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = read_json(res).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["booking"]["status"], "confirmed");
}

#[tokio::test]
async fn test_admin_update_invalid_status() {
    let harness = test_harness();

    let res = test_app(harness.state)
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/api/admin/bookings")
                .header("Authorization", "Bearer test-token")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    serde_json::json!({ "id": "BK-2025-0001", "status": "archived" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_update_bad_body_without_auth_is_unauthorized() {
    let harness = test_harness();

    let res = test_app(harness.state)
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/api/admin/bookings")
                .header("Content-Type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let json = read_json(res).await;
    assert_eq!(json["error"], "Unauthorized");
}

#[tokio::test]
async fn test_admin_update_malformed_body_with_auth_is_bad_request() {
    let harness = test_harness();

    let res = test_app(harness.state)
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/api/admin/bookings")
                .header("Authorization", "Bearer test-token")
                .header("Content-Type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let json = read_json(res).await;
    assert!(json["error"].as_str().is_some());
}

#[tokio::test]
async fn test_admin_update_unknown_id() {
    let harness = test_harness();

    let res = test_app(harness.state)
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/api/admin/bookings")
                .header("Authorization", "Bearer test-token")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    serde_json::json!({ "id": "BK-2025-9999", "status": "confirmed" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_delete_booking() {
    let harness = test_harness();
    let monday = next_weekday(Weekday::Mon).format("%Y-%m-%d").to_string();

    let created = create_booking_ok(harness.state.clone(), &monday, "10:00").await;
    let id = created["bookingId"].as_str().unwrap();

    let res = test_app(harness.state.clone())
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/admin/bookings?id={id}"))
                .header("Authorization", "Bearer test-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = read_json(res).await;
    assert_eq!(json["success"], true);

    // Deleting again is a 404.
    let res = test_app(harness.state)
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/admin/bookings?id={id}"))
                .header("Authorization", "Bearer test-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cancelled_slot_can_be_rebooked() {
    let harness = test_harness();
    let monday = next_weekday(Weekday::Mon).format("%Y-%m-%d").to_string();

    let created = create_booking_ok(harness.state.clone(), &monday, "10:00").await;
    let id = created["bookingId"].as_str().unwrap();

    let res = test_app(harness.state.clone())
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/api/admin/bookings")
                .header("Authorization", "Bearer test-token")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    serde_json::json!({ "id": id, "status": "cancelled" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    create_booking_ok(harness.state, &monday, "10:00").await;
}
