use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use super::slot::HourRange;
use super::user::UserSummary;
use super::UnknownVariant;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub user_id: Option<String>,
    pub resource_id: String,
    pub centre_id: String,
    pub sport_id: String,
    pub date: NaiveDate,
    pub start_hour: u8,
    pub end_hour: u8,
    #[serde(rename = "type")]
    pub booking_type: BookingType,
    pub note: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Booking {
    pub fn hours(&self) -> HourRange {
        HourRange {
            start: self.start_hour,
            end: self.end_hour,
        }
    }
}

/// A booking joined with the display fields callers need.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookingView {
    #[serde(flatten)]
    pub booking: Booking,
    pub resource_name: Option<String>,
    pub user: Option<UserSummary>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum BookingType {
    #[serde(rename = "Booking")]
    Booking,
    #[serde(rename = "Checked-in")]
    CheckedIn,
    #[serde(rename = "Coaching")]
    Coaching,
    #[serde(rename = "Blocked / Tournament")]
    BlockedTournament,
    #[serde(rename = "Completed")]
    Completed,
    #[serde(rename = "Pending Payment")]
    PendingPayment,
}

impl BookingType {
    pub const ALL: [BookingType; 6] = [
        BookingType::Booking,
        BookingType::CheckedIn,
        BookingType::Coaching,
        BookingType::BlockedTournament,
        BookingType::Completed,
        BookingType::PendingPayment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingType::Booking => "Booking",
            BookingType::CheckedIn => "Checked-in",
            BookingType::Coaching => "Coaching",
            BookingType::BlockedTournament => "Blocked / Tournament",
            BookingType::Completed => "Completed",
            BookingType::PendingPayment => "Pending Payment",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

impl ToSql for BookingType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for BookingType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        BookingType::parse(s)
            .ok_or_else(|| FromSqlError::Other(Box::new(UnknownVariant(s.to_string()))))
    }
}
