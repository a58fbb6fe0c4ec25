// models/src/medical/appointment.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::department::Department;
use super::doctor::DoctorRecord;
use super::patient::Patient;

pub const STATUS_NEW: &str = "new";
pub const STATUS_FOLLOW_UP: &str = "follow-up";
pub const STATUS_COMPLETE: &str = "complete";

/// A booking. Patient fields are a snapshot taken at booking time and are not
/// rewritten when the patient record changes later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    pub patient_name: String,
    pub patient_phone: String,
    pub patient_age: u32,
    pub patient_gender: String,
    pub patient_notes: Option<String>,
    pub department_id: String,
    pub doctor_id: String,
    pub appointment_date: NaiveDate,
    pub appointment_time: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    pub fn is_complete(&self) -> bool {
        self.status == STATUS_COMPLETE
    }
}

/// An appointment joined with its patient, department and doctor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentRecord {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub patient: Option<Patient>,
    pub department: Department,
    pub doctor: DoctorRecord,
}
