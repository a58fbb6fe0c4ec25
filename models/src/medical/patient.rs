// models/src/medical/patient.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A patient keyed by phone number. Each booking overwrites the demographic
/// fields with the latest values supplied for that phone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub phone_number: String,
    pub name: String,
    pub age: u32,
    pub gender: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
