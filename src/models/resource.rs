use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One bookable unit (a single court) of a sport at a centre.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: String,
    pub name: String,
    pub sport_id: String,
    pub centre_id: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
