use std::sync::Arc;

use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/promote", patch(handlers::auth::promote))
        .route(
            "/api/centres",
            post(handlers::centres::create_centre).get(handlers::centres::list_centres),
        )
        .route(
            "/api/centres/:id",
            get(handlers::centres::get_centre)
                .put(handlers::centres::update_centre)
                .delete(handlers::centres::delete_centre),
        )
        .route(
            "/api/sports",
            post(handlers::sports::create_sport).get(handlers::sports::list_sports),
        )
        .route(
            "/api/sports/:id",
            get(handlers::sports::get_sport)
                .put(handlers::sports::update_sport)
                .delete(handlers::sports::delete_sport),
        )
        .route(
            "/api/resources",
            post(handlers::resources::create_resource).get(handlers::resources::list_resources),
        )
        .route(
            "/api/resources/:id",
            get(handlers::resources::get_resource)
                .put(handlers::resources::update_resource)
                .delete(handlers::resources::delete_resource),
        )
        .route(
            "/api/bookings",
            post(handlers::bookings::create_booking).get(handlers::bookings::list_bookings),
        )
        .route(
            "/api/bookings/available",
            get(handlers::bookings::available_slots),
        )
        .route("/api/bookings/sweep", post(handlers::bookings::run_sweep))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
