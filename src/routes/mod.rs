use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::services::ServeDir;

use crate::handlers::{account, admin, bookings, rides, uploads};
use crate::middleware::auth::{auth_middleware, require_admin};
use crate::middleware::rate_limit::create_public_governor;
use crate::middleware::role_rate_limit::{create_user_governor, RateLimitTier};
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    let passenger_governor = create_user_governor(RateLimitTier::Passenger);
    let upload_governor = create_user_governor(RateLimitTier::Upload);
    let public_governor = create_public_governor();

    // Public catalogue (per-IP limit)
    let public_routes = Router::new()
        .route("/rides", get(rides::list_rides))
        .route("/rides/{id}", get(rides::get_ride))
        .route("/locations", get(rides::list_locations))
        .route("/content", get(rides::get_content))
        .layer(public_governor);

    // Passenger routes (requires auth, per-user limit)
    let booking_routes = Router::new()
        .route("/reserve-seats", post(bookings::reserve_seats))
        .route("/", get(bookings::my_bookings))
        .route("/{id}", delete(bookings::cancel_booking))
        .route("/{id}/payment-screenshot", put(bookings::attach_payment_screenshot))
        .layer(passenger_governor.clone())
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let account_routes = Router::new()
        .route("/", get(account::get_me))
        .route("/", put(account::update_me))
        .route("/avatar", put(account::update_avatar))
        .layer(passenger_governor)
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let upload_routes = Router::new()
        .route("/", post(uploads::upload_image))
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .layer(upload_governor)
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Admin routes (requires auth + admin role); only the global limiter applies
    let admin_routes = Router::new()
        // Rides
        .route("/rides", get(admin::list_rides))
        .route("/rides", post(admin::create_ride))
        .route("/rides/{id}", put(admin::update_ride))
        .route("/rides/{id}", delete(admin::delete_ride))
        .route("/rides/{id}/passengers", get(admin::ride_passengers))
        .route("/rides/{id}/seats/{seat_number}", put(admin::set_seat_status))
        // Templates
        .route("/templates", get(admin::list_templates))
        .route("/templates", post(admin::create_template))
        .route("/templates/generate", post(admin::generate_for_date))
        .route("/templates/{id}", put(admin::update_template))
        .route("/templates/{id}", delete(admin::delete_template))
        .route("/templates/{id}/generate", post(admin::generate_from_template))
        // Bookings
        .route("/bookings", get(admin::list_all_bookings))
        .route("/bookings/reset", post(admin::reset_bookings))
        .route("/bookings/{id}/status", put(admin::update_booking_status))
        // Users
        .route("/users", get(admin::list_all_users))
        .route("/users/{id}/role", put(admin::update_user_role))
        // Site content
        .route("/content", put(admin::update_content))
        .layer(middleware::from_fn_with_state(state.clone(), require_admin))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let upload_dir = state.config.upload_dir.clone();

    Router::new()
        .nest("/api", public_routes)
        .nest("/api/bookings", booking_routes)
        .nest("/api/me", account_routes)
        .nest("/api/uploads", upload_routes)
        .nest("/api/admin", admin_routes)
        .nest_service("/uploads", ServeDir::new(upload_dir))
        .with_state(state)
}
