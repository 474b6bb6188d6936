use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use rusqlite::TransactionBehavior;
use serde::Deserialize;
use uuid::Uuid;

use super::auth::require_staff;
use super::extract::AppJson;
use super::{delete_error, id_list, merge, path_id, required_text, write_error};
use crate::db::queries;
use crate::errors::AppError;
use crate::models::Centre;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CentrePayload {
    pub name: Option<String>,
    pub location: Option<String>,
    pub sports: Option<Vec<String>>,
}

// POST /api/centres
pub async fn create_centre(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    AppJson(payload): AppJson<CentrePayload>,
) -> Result<(StatusCode, Json<Centre>), AppError> {
    require_staff(&state, &headers)?;

    let name = required_text("name", &payload.name);
    let location = required_text("location", &payload.location);
    let sports = id_list("sports", payload.sports.as_deref().unwrap_or_default());
    let (name, location, sports) = match (name, location, sports) {
        (Ok(name), Ok(location), Ok(sports)) => (name, location, sports),
        (name, location, sports) => {
            return Err(merge(vec![name.err(), location.err(), sports.err()]));
        }
    };

    let now = state.clock.now();
    let centre = Centre {
        id: Uuid::new_v4().to_string(),
        name,
        location,
        sports,
        created_at: now,
        updated_at: now,
    };

    let mut db = state.conn()?;
    let tx = db.transaction_with_behavior(TransactionBehavior::Immediate)?;
    queries::insert_centre(&tx, &centre).map_err(|e| write_error(e, "sport not found"))?;
    let centre = queries::get_centre(&tx, &centre.id)?
        .ok_or_else(|| AppError::Internal("created centre vanished".to_string()))?;
    tx.commit()?;

    tracing::info!(centre_id = %centre.id, name = %centre.name, "centre created");
    Ok((StatusCode::CREATED, Json(centre)))
}

// GET /api/centres
pub async fn list_centres(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Centre>>, AppError> {
    require_staff(&state, &headers)?;
    let db = state.conn()?;
    Ok(Json(queries::list_centres(&db)?))
}

// GET /api/centres/:id
pub async fn get_centre(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
) -> Result<Json<Centre>, AppError> {
    require_staff(&state, &headers)?;
    let id = path_id(&raw_id)?;

    let db = state.conn()?;
    queries::get_centre(&db, &id)?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("centre {id}")))
}

// PUT /api/centres/:id
pub async fn update_centre(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
    AppJson(payload): AppJson<CentrePayload>,
) -> Result<Json<Centre>, AppError> {
    require_staff(&state, &headers)?;
    let id = path_id(&raw_id)?;

    if payload.name.is_none() && payload.location.is_none() && payload.sports.is_none() {
        return Err(AppError::invalid("body", "at least one field must be provided"));
    }

    let mut db = state.conn()?;
    let tx = db.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let mut centre = queries::get_centre(&tx, &id)?
        .ok_or_else(|| AppError::NotFound(format!("centre {id}")))?;

    if payload.name.is_some() {
        centre.name = required_text("name", &payload.name)?;
    }
    if payload.location.is_some() {
        centre.location = required_text("location", &payload.location)?;
    }
    if let Some(sports) = &payload.sports {
        centre.sports = id_list("sports", sports)?;
    }
    centre.updated_at = state.clock.now();

    queries::update_centre(&tx, &centre).map_err(|e| write_error(e, "sport not found"))?;
    let centre = queries::get_centre(&tx, &id)?
        .ok_or_else(|| AppError::NotFound(format!("centre {id}")))?;
    tx.commit()?;

    tracing::info!(centre_id = %centre.id, "centre updated");
    Ok(Json(centre))
}

// DELETE /api/centres/:id
pub async fn delete_centre(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, AppError> {
    require_staff(&state, &headers)?;
    let id = path_id(&raw_id)?;

    let db = state.conn()?;
    if !queries::delete_centre(&db, &id).map_err(|e| delete_error(e, "centre"))? {
        return Err(AppError::NotFound(format!("centre {id}")));
    }

    tracing::info!(centre_id = %id, "centre deleted");
    Ok(StatusCode::NO_CONTENT)
}
