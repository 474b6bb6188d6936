pub mod auth;
pub mod bookings;
pub mod centres;
pub mod extract;
pub mod health;
pub mod resources;
pub mod sports;

use crate::db::{self, Constraint};
use crate::errors::{AppError, FieldError};
use crate::services::validation::parse_id;

/// Parses an `:id` path segment.
fn path_id(raw: &str) -> Result<String, AppError> {
    parse_id(raw).ok_or_else(|| AppError::invalid("id", "is not a valid identifier"))
}

/// Parses every id in an optional list field.
fn id_list(field: &str, values: &[String]) -> Result<Vec<String>, AppError> {
    values
        .iter()
        .map(|v| parse_id(v.trim()))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| AppError::invalid(field, "contains an invalid identifier"))
}

fn required_text(field: &str, value: &Option<String>) -> Result<String, AppError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::invalid(field, "is required"))
}

/// Translates a rejected insert or update into the caller-facing error.
fn write_error(e: rusqlite::Error, referenced: &str) -> AppError {
    match db::violated_constraint(&e) {
        Some(Constraint::ForeignKey) => AppError::NotFound(referenced.to_string()),
        Some(Constraint::Unique) => AppError::Conflict("record already exists".to_string()),
        _ => AppError::Store(e),
    }
}

/// Translates a rejected delete into the caller-facing error.
fn delete_error(e: rusqlite::Error, what: &str) -> AppError {
    match db::violated_constraint(&e) {
        Some(Constraint::ForeignKey) => {
            AppError::Conflict(format!("{what} is still referenced by resources or bookings"))
        }
        _ => AppError::Store(e),
    }
}

/// Folds the failed single-field checks into one validation error.
fn merge(errors: Vec<Option<AppError>>) -> AppError {
    let fields: Vec<FieldError> = errors
        .into_iter()
        .flatten()
        .flat_map(|e| match e {
            AppError::Validation(fields) => fields,
            _ => Vec::new(),
        })
        .collect();
    AppError::Validation(fields)
}
