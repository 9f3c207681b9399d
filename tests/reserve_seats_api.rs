//! HTTP contract of `POST /api/bookings/reserve-seats`, served from the in-memory
//! ledger so no database is needed.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use sea_orm::DatabaseConnection;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use intercity_booking_backend::{
    entities::user::UserRole,
    reservation::{MemoryLedger, ReservationService},
    routes::create_router,
    storage::LocalDiskStorage,
    utils::jwt::create_token,
    AppState, Config,
};

const SECRET: &str = "api-test-secret";

fn config() -> Config {
    Config {
        database_url: "postgres://unused".to_string(),
        jwt_secret: SECRET.to_string(),
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        locations: ["Kathmandu".to_string(), "Pokhara".to_string()],
        service_utc_offset_minutes: 345,
        upload_dir: std::env::temp_dir().join("reserve-seats-api"),
        public_base_url: "http://localhost".to_string(),
        max_upload_bytes: 1024,
        reservation_max_attempts: 3,
    }
}

fn router(ledger: Arc<MemoryLedger>) -> Router {
    let config = config();

    let state = AppState {
        db: DatabaseConnection::Disconnected,
        storage: Arc::new(LocalDiskStorage::new(
            &config.upload_dir,
            &config.public_base_url,
            config.max_upload_bytes,
        )),
        reservations: ReservationService::new(ledger).with_service_offset(config.service_offset()),
        config,
    };

    create_router(state)
}

async fn app() -> (Router, Uuid) {
    let ledger = Arc::new(MemoryLedger::new());
    let ride_id = ledger.add_ride(9).await;
    (router(ledger), ride_id)
}

fn token_for(user_id: Uuid, role: UserRole) -> String {
    create_token(user_id, "rider@example.com", role, SECRET, 1).unwrap()
}

async fn reserve(app: &Router, token: Option<&str>, body: Value) -> (StatusCode, Value) {
    let mut request = Request::builder()
        .method("POST")
        .uri("/api/bookings/reserve-seats")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = request.body(Body::from(body.to_string())).unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn body(ride_id: &str, seats: Value) -> Value {
    json!({
        "rideId": ride_id,
        "seats": seats,
        "passengerName": "Sita Sharma",
        "passengerPhone": "9841234567",
    })
}

#[tokio::test]
async fn test_reserve_then_conflict() {
    let (app, ride_id) = app().await;
    let token = token_for(Uuid::new_v4(), UserRole::User);

    let (status, first) = reserve(&app, Some(&token), body(&ride_id.to_string(), json!([6]))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["success"], true);
    assert_eq!(first["booking"]["seat_numbers"], json!([6]));
    assert_eq!(first["booking"]["status"], "confirmed");

    let (status, second) =
        reserve(&app, Some(&token), body(&ride_id.to_string(), json!([5, 6]))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(second["success"], false);
    assert_eq!(second["kind"], "seats_unavailable");
    assert_eq!(second["unavailableSeats"], json!([6]));
    assert_eq!(second["retryable"], false);
    assert_eq!(second["reason"], "Seat 6 is not available");
}

#[tokio::test]
async fn test_unknown_ride_is_not_found() {
    let (app, _) = app().await;
    let token = token_for(Uuid::new_v4(), UserRole::User);

    for ride_id in [Uuid::new_v4().to_string(), "nonexistent-ride".to_string()] {
        let (status, body) = reserve(&app, Some(&token), body(&ride_id, json!([1]))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["kind"], "ride_not_found");
        assert_eq!(body["success"], false);
    }
}

#[tokio::test]
async fn test_invalid_input_is_bad_request() {
    let (app, ride_id) = app().await;
    let token = token_for(Uuid::new_v4(), UserRole::User);
    let ride_id = ride_id.to_string();

    let (status, _) = reserve(&app, Some(&token), body(&ride_id, json!([]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = reserve(&app, Some(&token), body(&ride_id, json!([0, 2]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut bad_phone = body(&ride_id, json!([1]));
    bad_phone["passengerPhone"] = json!("98-4123");
    let (status, response) = reserve(&app, Some(&token), bad_phone).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["kind"], "invalid_request");
}

#[tokio::test]
async fn test_booking_for_someone_else_needs_admin() {
    let (app, ride_id) = app().await;
    let other = Uuid::new_v4().to_string();

    let mut request = body(&ride_id.to_string(), json!([2]));
    request["userId"] = json!(other);

    let rider = token_for(Uuid::new_v4(), UserRole::User);
    let (status, response) = reserve(&app, Some(&rider), request.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(response["success"], false);
    assert_eq!(response["kind"], "forbidden");
    assert_eq!(response["retryable"], false);

    let admin = token_for(Uuid::new_v4(), UserRole::Admin);
    let (status, response) = reserve(&app, Some(&admin), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["booking"]["user_id"], json!(other));
}

#[tokio::test]
async fn test_unreadable_body_keeps_the_failure_shape() {
    let (app, ride_id) = app().await;
    let token = token_for(Uuid::new_v4(), UserRole::User);

    let mut no_ride = body(&ride_id.to_string(), json!([1]));
    no_ride.as_object_mut().unwrap().remove("rideId");
    let no_passenger = json!({ "rideId": ride_id.to_string(), "seats": [1] });
    let seats_as_text = body(&ride_id.to_string(), json!("1,2"));

    for request in [no_ride, no_passenger, seats_as_text] {
        let (status, response) = reserve(&app, Some(&token), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["success"], false);
        assert_eq!(response["kind"], "invalid_request");
        assert_eq!(response["retryable"], false);
        assert!(response["reason"].as_str().unwrap().starts_with("Malformed request body"));
    }
}

#[tokio::test]
async fn test_malformed_user_id_is_invalid_request() {
    let (app, ride_id) = app().await;
    let token = token_for(Uuid::new_v4(), UserRole::User);

    let mut request = body(&ride_id.to_string(), json!([3]));
    request["userId"] = json!("not-a-uuid");

    let (status, response) = reserve(&app, Some(&token), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["success"], false);
    assert_eq!(response["kind"], "invalid_request");
    assert_eq!(response["reason"], "userId must be a valid id");
}

#[tokio::test]
async fn test_departed_ride_cannot_be_reserved() {
    let ledger = Arc::new(MemoryLedger::new());
    let last_week = chrono::Utc::now().date_naive() - chrono::Duration::days(7);
    let ride_id = ledger.add_ride_departing(9, last_week, "07:00").await;
    let app = router(ledger.clone());
    let token = token_for(Uuid::new_v4(), UserRole::User);

    let (status, response) = reserve(&app, Some(&token), body(&ride_id.to_string(), json!([2]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["kind"], "ride_departed");
    assert_eq!(response["success"], false);
    assert!(ledger.bookings().await.is_empty());
}

#[tokio::test]
async fn test_missing_or_bad_token_is_rejected() {
    let (app, ride_id) = app().await;

    let (status, _) = reserve(&app, None, body(&ride_id.to_string(), json!([1]))).await;
    assert!(status.is_client_error());

    let (status, _) = reserve(&app, Some("not-a-token"), body(&ride_id.to_string(), json!([1]))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
