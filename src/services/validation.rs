use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::{AppError, FieldError};
use crate::models::{BookingType, HourRange, CLOSING_HOUR, OPENING_HOUR};

/// Booking creation payload as it arrives on the wire. Everything is optional
/// here so that missing fields are reported alongside malformed ones.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub centre_id: Option<String>,
    pub sport_id: Option<String>,
    pub resource_id: Option<String>,
    pub date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    #[serde(rename = "type")]
    pub booking_type: Option<String>,
    pub note: Option<String>,
}

/// A booking request that passed every input check.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingRequest {
    pub centre_id: String,
    pub sport_id: String,
    pub resource_id: Option<String>,
    pub date: NaiveDate,
    pub hours: HourRange,
    pub booking_type: BookingType,
    pub note: String,
}

/// Query parameters naming one centre, sport and day.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayQuery {
    pub centre_id: Option<String>,
    pub sport_id: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayScope {
    pub centre_id: String,
    pub sport_id: String,
    pub date: NaiveDate,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Parses a store identifier and returns it in canonical (lowercase, hyphenated) form.
pub fn parse_id(value: &str) -> Option<String> {
    Uuid::parse_str(value).ok().map(|id| id.to_string())
}

/// Accepts exactly `YYYY-MM-DD`; no single-digit months, no trailing time.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let bytes = value.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    let digits_ok = bytes
        .iter()
        .enumerate()
        .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
    if !digits_ok {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

/// Accepts exactly `HH:00` and returns the hour.
pub fn parse_hour(value: &str) -> Option<u8> {
    let bytes = value.as_bytes();
    if bytes.len() != 5 || bytes[2] != b':' {
        return None;
    }
    let (hour, minute) = (&value[..2], &value[3..]);
    if !hour.bytes().all(|b| b.is_ascii_digit()) || !minute.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hour: u8 = hour.parse().ok()?;
    let minute: u8 = minute.parse().ok()?;
    if minute != 0 || hour > 23 {
        return None;
    }
    Some(hour)
}

fn required_id(field: &str, value: &Option<String>, errors: &mut Vec<FieldError>) -> Option<String> {
    match present(value) {
        None => {
            errors.push(FieldError::new(field, "is required"));
            None
        }
        Some(raw) => {
            let id = parse_id(raw);
            if id.is_none() {
                errors.push(FieldError::new(field, "is not a valid identifier"));
            }
            id
        }
    }
}

fn required_date(value: &Option<String>, errors: &mut Vec<FieldError>) -> Option<NaiveDate> {
    match present(value) {
        None => {
            errors.push(FieldError::new("date", "is required"));
            None
        }
        Some(raw) => {
            let date = parse_date(raw);
            if date.is_none() {
                errors.push(FieldError::new("date", "must be a calendar date in YYYY-MM-DD format"));
            }
            date
        }
    }
}

fn required_hour(field: &str, value: &Option<String>, errors: &mut Vec<FieldError>) -> Option<u8> {
    match value.as_deref().filter(|v| !v.is_empty()) {
        None => {
            errors.push(FieldError::new(field, "is required"));
            None
        }
        Some(raw) => {
            let hour = parse_hour(raw);
            if hour.is_none() {
                errors.push(FieldError::new(field, "must be a whole hour in HH:00 format"));
            }
            hour
        }
    }
}

fn hour_range(start: u8, end: u8, errors: &mut Vec<FieldError>) -> Option<HourRange> {
    let before = errors.len();
    if start < OPENING_HOUR || start >= CLOSING_HOUR {
        errors.push(FieldError::new(
            "startTime",
            format!("must be between {OPENING_HOUR:02}:00 and {:02}:00", CLOSING_HOUR - 1),
        ));
    }
    if end <= OPENING_HOUR || end > CLOSING_HOUR {
        errors.push(FieldError::new(
            "endTime",
            format!("must be between {:02}:00 and {CLOSING_HOUR:02}:00", OPENING_HOUR + 1),
        ));
    } else if end <= start {
        errors.push(FieldError::new("endTime", "must be after startTime"));
    }

    if errors.len() > before {
        return None;
    }
    HourRange::new(start, end)
}

/// Checks every field of a creation request, reporting all offending fields at once.
pub fn validate_booking_request(req: &CreateBookingRequest) -> Result<BookingRequest, AppError> {
    let mut errors = Vec::new();

    let centre_id = required_id("centreId", &req.centre_id, &mut errors);
    let sport_id = required_id("sportId", &req.sport_id, &mut errors);

    let resource_id = match present(&req.resource_id) {
        None => None,
        Some(raw) => {
            let id = parse_id(raw);
            if id.is_none() {
                errors.push(FieldError::new("resourceId", "is not a valid identifier"));
            }
            id
        }
    };

    let date = required_date(&req.date, &mut errors);
    let start = required_hour("startTime", &req.start_time, &mut errors);
    let end = required_hour("endTime", &req.end_time, &mut errors);
    let hours = match (start, end) {
        (Some(start), Some(end)) => hour_range(start, end, &mut errors),
        _ => None,
    };

    let booking_type = match present(&req.booking_type) {
        None => {
            errors.push(FieldError::new("type", "is required"));
            None
        }
        Some(raw) => {
            let parsed = BookingType::parse(raw);
            if parsed.is_none() {
                let allowed = BookingType::ALL
                    .iter()
                    .map(|t| t.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                errors.push(FieldError::new("type", format!("must be one of: {allowed}")));
            }
            parsed
        }
    };

    match (centre_id, sport_id, date, hours, booking_type) {
        (Some(centre_id), Some(sport_id), Some(date), Some(hours), Some(booking_type))
            if errors.is_empty() =>
        {
            Ok(BookingRequest {
                centre_id,
                sport_id,
                resource_id,
                date,
                hours,
                booking_type,
                note: req.note.clone().unwrap_or_default(),
            })
        }
        _ => Err(AppError::Validation(errors)),
    }
}

pub fn validate_day_query(query: &DayQuery) -> Result<DayScope, AppError> {
    let mut errors = Vec::new();
    let centre_id = required_id("centreId", &query.centre_id, &mut errors);
    let sport_id = required_id("sportId", &query.sport_id, &mut errors);
    let date = required_date(&query.date, &mut errors);

    match (centre_id, sport_id, date) {
        (Some(centre_id), Some(sport_id), Some(date)) if errors.is_empty() => Ok(DayScope {
            centre_id,
            sport_id,
            date,
        }),
        _ => Err(AppError::Validation(errors)),
    }
}
