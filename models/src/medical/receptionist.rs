// models/src/medical/receptionist.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::department::Department;
use super::user::UserProfile;

/// Front-desk staff. `department_ids` is the set of departments whose
/// appointments the receptionist may see; it never contains duplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receptionist {
    pub id: String,
    pub name: String,
    pub contact_number: String,
    pub shift: String,
    pub description: Option<String>,
    pub profile_image_url: Option<String>,
    pub user_id: String,
    pub department_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceptionistRecord {
    #[serde(flatten)]
    pub receptionist: Receptionist,
    pub departments: Vec<Department>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
}
