// models/src/medical/doctor.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::department::{Department, Specialty};
use super::user::UserProfile;
use crate::errors::ClinicError;

/// Day of the week for recurring schedule slots, ordered Monday first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Weekday {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl Weekday {
    /// Accepts any casing and full day names; only the first three letters count.
    pub fn parse(raw: &str) -> Result<Self, ClinicError> {
        let prefix: String = raw.trim().chars().take(3).collect::<String>().to_lowercase();
        match prefix.as_str() {
            "mon" => Ok(Weekday::Mon),
            "tue" => Ok(Weekday::Tue),
            "wed" => Ok(Weekday::Wed),
            "thu" => Ok(Weekday::Thu),
            "fri" => Ok(Weekday::Fri),
            "sat" => Ok(Weekday::Sat),
            "sun" => Ok(Weekday::Sun),
            _ => Err(ClinicError::Validation(format!(
                "Invalid day '{raw}'. Use Mon/Tue/Wed/Thu/Fri/Sat/Sun."
            ))),
        }
    }
}

/// One weekly working window. `start_time < end_time`, both `HH:mm`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSlot {
    pub day: Weekday,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    pub id: String,
    pub name: String,
    pub department_id: String,
    pub specialty_id: String,
    pub contact_number: String,
    pub description: Option<String>,
    pub profile_image_url: Option<String>,
    pub user_id: Option<String>,
    pub schedules: Vec<ScheduleSlot>,
    pub created_at: DateTime<Utc>,
}

/// A doctor joined with its department and specialty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorRecord {
    #[serde(flatten)]
    pub doctor: Doctor,
    pub department: Department,
    pub specialty: Specialty,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
}

#[cfg(test)]
mod tests {
    use super::Weekday;

    #[test]
    fn weekday_parsing_is_lenient_about_case_and_length() {
        assert_eq!(Weekday::parse("Monday").unwrap(), Weekday::Mon);
        assert_eq!(Weekday::parse(" THU ").unwrap(), Weekday::Thu);
        assert_eq!(Weekday::parse("sun").unwrap(), Weekday::Sun);
        assert!(Weekday::parse("Mo").is_err());
        assert!(Weekday::parse("Funday").is_err());
    }

    #[test]
    fn weekdays_sort_monday_first() {
        let mut days = vec![Weekday::Sun, Weekday::Wed, Weekday::Mon];
        days.sort();
        assert_eq!(days, vec![Weekday::Mon, Weekday::Wed, Weekday::Sun]);
    }
}
