use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;

use super::auth::{authenticate, require_staff};
use super::extract::{AppJson, AppQuery};
use crate::db::queries;
use crate::errors::AppError;
use crate::models::{BookingView, SlotAvailability};
use crate::services::validation::{
    validate_booking_request, validate_day_query, CreateBookingRequest, DayQuery,
};
use crate::services::{availability, lifecycle, scheduling};
use crate::state::AppState;

// POST /api/bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    AppJson(payload): AppJson<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingView>), AppError> {
    let identity = authenticate(&state, &headers)?;
    let request = validate_booking_request(&payload)?;

    let view = {
        let mut db = state.conn()?;
        scheduling::create_booking(
            &mut db,
            state.picker.as_ref(),
            state.clock.as_ref(),
            Some(identity.user_id.as_str()),
            &request,
        )?
    };

    Ok((StatusCode::CREATED, Json(view)))
}

// GET /api/bookings?centreId=&sportId=&date=
pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    AppQuery(query): AppQuery<DayQuery>,
) -> Result<Json<Vec<BookingView>>, AppError> {
    require_staff(&state, &headers)?;
    let scope = validate_day_query(&query)?;

    let db = state.conn()?;
    lifecycle::complete_elapsed_for_day(&db, state.clock.as_ref(), &scope)?;
    let bookings = queries::list_booking_views(&db, &scope.centre_id, &scope.sport_id, &scope.date)?;

    Ok(Json(bookings))
}

// GET /api/bookings/available?centreId=&sportId=&date=
pub async fn available_slots(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    AppQuery(query): AppQuery<DayQuery>,
) -> Result<Json<Vec<SlotAvailability>>, AppError> {
    authenticate(&state, &headers)?;
    let scope = validate_day_query(&query)?;

    let db = state.conn()?;
    let slots = availability::available_slots(&db, &scope)?;
    Ok(Json(slots))
}

// POST /api/bookings/sweep
pub async fn run_sweep(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    require_staff(&state, &headers)?;

    let db = state.conn()?;
    let completed = lifecycle::complete_all_elapsed(&db, state.clock.as_ref())?;
    Ok(Json(serde_json::json!({ "completed": completed })))
}
