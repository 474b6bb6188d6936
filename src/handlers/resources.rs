use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use super::auth::require_staff;
use super::extract::{AppJson, AppQuery};
use super::{delete_error, merge, path_id, write_error};
use crate::db::queries;
use crate::errors::AppError;
use crate::models::Resource;
use crate::services::validation::parse_id;
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcePayload {
    pub name: Option<String>,
    pub sport_id: Option<String>,
    pub centre_id: Option<String>,
}

fn reference(field: &str, value: &Option<String>) -> Result<String, AppError> {
    match value.as_deref() {
        None | Some("") => Err(AppError::invalid(field, "is required")),
        Some(raw) => {
            parse_id(raw).ok_or_else(|| AppError::invalid(field, "is not a valid identifier"))
        }
    }
}

fn optional_reference(field: &str, raw: Option<&str>) -> Result<Option<String>, AppError> {
    raw.map(|raw| {
        parse_id(raw).ok_or_else(|| AppError::invalid(field, "is not a valid identifier"))
    })
    .transpose()
}

// POST /api/resources
pub async fn create_resource(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    AppJson(payload): AppJson<ResourcePayload>,
) -> Result<(StatusCode, Json<Resource>), AppError> {
    require_staff(&state, &headers)?;

    let (sport_id, centre_id) = match (
        reference("sportId", &payload.sport_id),
        reference("centreId", &payload.centre_id),
    ) {
        (Ok(sport_id), Ok(centre_id)) => (sport_id, centre_id),
        (sport_id, centre_id) => return Err(merge(vec![sport_id.err(), centre_id.err()])),
    };

    let now = state.clock.now();
    let resource = Resource {
        id: Uuid::new_v4().to_string(),
        name: payload.name.as_deref().map(str::trim).unwrap_or_default().to_string(),
        sport_id,
        centre_id,
        created_at: now,
        updated_at: now,
    };

    let db = state.conn()?;
    queries::insert_resource(&db, &resource)
        .map_err(|e| write_error(e, "sport or centre not found"))?;

    tracing::info!(
        resource_id = %resource.id,
        sport_id = %resource.sport_id,
        centre_id = %resource.centre_id,
        "resource created"
    );
    Ok((StatusCode::CREATED, Json(resource)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcesQuery {
    pub centre_id: Option<String>,
    pub sport_id: Option<String>,
}

// GET /api/resources?centreId=&sportId=
pub async fn list_resources(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    AppQuery(query): AppQuery<ResourcesQuery>,
) -> Result<Json<Vec<Resource>>, AppError> {
    require_staff(&state, &headers)?;
    let centre_id = optional_reference("centreId", query.centre_id.as_deref())?;
    let sport_id = optional_reference("sportId", query.sport_id.as_deref())?;

    let db = state.conn()?;
    let resources = queries::list_resources(&db, centre_id.as_deref(), sport_id.as_deref())?;
    Ok(Json(resources))
}

// GET /api/resources/:id
pub async fn get_resource(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
) -> Result<Json<Resource>, AppError> {
    require_staff(&state, &headers)?;
    let id = path_id(&raw_id)?;

    let db = state.conn()?;
    queries::get_resource(&db, &id)?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("resource {id}")))
}

// PUT /api/resources/:id
pub async fn update_resource(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
    AppJson(payload): AppJson<ResourcePayload>,
) -> Result<Json<Resource>, AppError> {
    require_staff(&state, &headers)?;
    let id = path_id(&raw_id)?;

    if payload.name.is_none() && payload.sport_id.is_none() && payload.centre_id.is_none() {
        return Err(AppError::invalid("body", "at least one field must be provided"));
    }
    let sport_id = optional_reference("sportId", payload.sport_id.as_deref())?;
    let centre_id = optional_reference("centreId", payload.centre_id.as_deref())?;

    let db = state.conn()?;
    let mut resource = queries::get_resource(&db, &id)?
        .ok_or_else(|| AppError::NotFound(format!("resource {id}")))?;

    if let Some(name) = &payload.name {
        resource.name = name.trim().to_string();
    }
    if let Some(sport_id) = sport_id {
        resource.sport_id = sport_id;
    }
    if let Some(centre_id) = centre_id {
        resource.centre_id = centre_id;
    }
    resource.updated_at = state.clock.now();

    if !queries::update_resource(&db, &resource)
        .map_err(|e| write_error(e, "sport or centre not found"))?
    {
        return Err(AppError::NotFound(format!("resource {id}")));
    }

    tracing::info!(resource_id = %resource.id, "resource updated");
    Ok(Json(resource))
}

// DELETE /api/resources/:id
pub async fn delete_resource(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, AppError> {
    require_staff(&state, &headers)?;
    let id = path_id(&raw_id)?;

    let db = state.conn()?;
    if !queries::delete_resource(&db, &id).map_err(|e| delete_error(e, "resource"))? {
        return Err(AppError::NotFound(format!("resource {id}")));
    }

    tracing::info!(resource_id = %id, "resource deleted");
    Ok(StatusCode::NO_CONTENT)
}
