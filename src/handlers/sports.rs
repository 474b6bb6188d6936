use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use rusqlite::TransactionBehavior;
use serde::Deserialize;
use uuid::Uuid;

use super::auth::require_staff;
use super::extract::{AppJson, AppQuery};
use super::{delete_error, id_list, merge, path_id, required_text, write_error};
use crate::db::queries;
use crate::errors::AppError;
use crate::models::Sport;
use crate::services::validation::parse_id;
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SportPayload {
    pub name: Option<String>,
    pub resource_name: Option<String>,
    pub centres: Option<Vec<String>>,
}

// POST /api/sports
pub async fn create_sport(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    AppJson(payload): AppJson<SportPayload>,
) -> Result<(StatusCode, Json<Sport>), AppError> {
    require_staff(&state, &headers)?;

    let name = required_text("name", &payload.name);
    let resource_name = required_text("resourceName", &payload.resource_name);
    let centres = id_list("centres", payload.centres.as_deref().unwrap_or_default());
    let (name, resource_name, centres) = match (name, resource_name, centres) {
        (Ok(name), Ok(resource_name), Ok(centres)) => (name, resource_name, centres),
        (name, resource_name, centres) => {
            return Err(merge(vec![name.err(), resource_name.err(), centres.err()]));
        }
    };

    let now = state.clock.now();
    let sport = Sport {
        id: Uuid::new_v4().to_string(),
        name,
        resource_name,
        centres,
        created_at: now,
        updated_at: now,
    };

    let mut db = state.conn()?;
    let tx = db.transaction_with_behavior(TransactionBehavior::Immediate)?;
    queries::insert_sport(&tx, &sport).map_err(|e| write_error(e, "centre not found"))?;
    let sport = queries::get_sport(&tx, &sport.id)?
        .ok_or_else(|| AppError::Internal("created sport vanished".to_string()))?;
    tx.commit()?;

    tracing::info!(sport_id = %sport.id, name = %sport.name, "sport created");
    Ok((StatusCode::CREATED, Json(sport)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SportsQuery {
    pub centre_id: Option<String>,
}

// GET /api/sports?centreId=
pub async fn list_sports(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    AppQuery(query): AppQuery<SportsQuery>,
) -> Result<Json<Vec<Sport>>, AppError> {
    require_staff(&state, &headers)?;
    let centre_id = match query.centre_id.as_deref() {
        Some(raw) => Some(
            parse_id(raw.trim())
                .ok_or_else(|| AppError::invalid("centreId", "is not a valid identifier"))?,
        ),
        None => None,
    };

    let db = state.conn()?;
    Ok(Json(queries::list_sports(&db, centre_id.as_deref())?))
}

// GET /api/sports/:id
pub async fn get_sport(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
) -> Result<Json<Sport>, AppError> {
    require_staff(&state, &headers)?;
    let id = path_id(&raw_id)?;

    let db = state.conn()?;
    queries::get_sport(&db, &id)?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("sport {id}")))
}

// PUT /api/sports/:id
pub async fn update_sport(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
    AppJson(payload): AppJson<SportPayload>,
) -> Result<Json<Sport>, AppError> {
    require_staff(&state, &headers)?;
    let id = path_id(&raw_id)?;

    if payload.name.is_none() && payload.resource_name.is_none() && payload.centres.is_none() {
        return Err(AppError::invalid("body", "at least one field must be provided"));
    }

    let mut db = state.conn()?;
    let tx = db.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let mut sport = queries::get_sport(&tx, &id)?
        .ok_or_else(|| AppError::NotFound(format!("sport {id}")))?;

    if payload.name.is_some() {
        sport.name = required_text("name", &payload.name)?;
    }
    if payload.resource_name.is_some() {
        sport.resource_name = required_text("resourceName", &payload.resource_name)?;
    }
    if let Some(centres) = &payload.centres {
        sport.centres = id_list("centres", centres)?;
    }
    sport.updated_at = state.clock.now();

    queries::update_sport(&tx, &sport).map_err(|e| write_error(e, "centre not found"))?;
    let sport = queries::get_sport(&tx, &id)?
        .ok_or_else(|| AppError::NotFound(format!("sport {id}")))?;
    tx.commit()?;

    tracing::info!(sport_id = %sport.id, "sport updated");
    Ok(Json(sport))
}

// DELETE /api/sports/:id
pub async fn delete_sport(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, AppError> {
    require_staff(&state, &headers)?;
    let id = path_id(&raw_id)?;

    let db = state.conn()?;
    if !queries::delete_sport(&db, &id).map_err(|e| delete_error(e, "sport"))? {
        return Err(AppError::NotFound(format!("sport {id}")));
    }

    tracing::info!(sport_id = %id, "sport deleted");
    Ok(StatusCode::NO_CONTENT)
}
