// lib/src/services/doctors.rs

use std::collections::BTreeMap;

use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use models::identifiers::non_blank;
use models::validation::is_clock_time;
use models::{new_id, ClinicError, ClinicResult, Doctor, DoctorRecord, Role, ScheduleSlot, User, Weekday};
use security::{hash_password, AuthUser};

use crate::clinic_store::{ClinicStore, DoctorFilter};
use crate::services::access_scope::AccessScope;
use crate::services::listing::{DirectoryQuery, Page};
use crate::uploads::{store_optional_image, ImageStore, ImageUpload};

/// Doctor creation fields, from a JSON body or multipart text parts.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DoctorInput {
    pub name: Option<String>,
    #[serde(alias = "departmentId")]
    pub department_id: Option<String>,
    /// Specialty name, resolved within the department.
    pub specialty: Option<String>,
    #[serde(alias = "contactNumber")]
    pub contact_number: Option<String>,
    pub description: Option<String>,
    /// `[{ "Mon": [{ "start_time": "09:00", "end_time": "12:00" }] }]`, or the
    /// same document as a JSON string.
    pub schedules: Option<Value>,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SlotInput {
    #[serde(alias = "startTime")]
    start_time: Option<String>,
    #[serde(alias = "endTime")]
    end_time: Option<String>,
}

/// Flattens the day-keyed schedule document into slots ordered by day and
/// start time. Every slot must be `HH:mm` with start before end.
pub fn parse_schedules(raw: Option<&Value>) -> ClinicResult<Vec<ScheduleSlot>> {
    let document = match raw {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(Vec::new()),
        Some(Value::String(s)) => serde_json::from_str::<Value>(s)
            .map_err(|_| ClinicError::validation("schedules must be valid JSON"))?,
        Some(other) => other.clone(),
    };

    let entries: Vec<BTreeMap<String, Vec<SlotInput>>> = serde_json::from_value(document)
        .map_err(|_| ClinicError::validation("schedules must be an array of {day: [{start_time, end_time}]} objects"))?;

    let mut slots = Vec::new();
    for entry in entries {
        for (raw_day, windows) in entry {
            let day = Weekday::parse(&raw_day)?;
            for window in windows {
                let start = window.start_time.unwrap_or_default();
                let end = window.end_time.unwrap_or_default();
                if !is_clock_time(&start) || !is_clock_time(&end) {
                    return Err(ClinicError::Validation(format!(
                        "Invalid time range '{} - {}'. Use HH:mm format.",
                        start, end
                    )));
                }
                if start >= end {
                    return Err(ClinicError::Validation(format!(
                        "start_time must be before end_time for {}.",
                        raw_day
                    )));
                }
                slots.push(ScheduleSlot { day, start_time: start, end_time: end });
            }
        }
    }
    slots.sort_by(|a, b| a.day.cmp(&b.day).then_with(|| a.start_time.cmp(&b.start_time)));
    Ok(slots)
}

pub async fn create_doctor(
    store: &dyn ClinicStore,
    images: Option<&dyn ImageStore>,
    input: DoctorInput,
    image: Option<ImageUpload>,
) -> ClinicResult<DoctorRecord> {
    let (name, department_id, specialty_name, contact_number) = match (
        non_blank(input.name.as_deref()),
        non_blank(input.department_id.as_deref()),
        non_blank(input.specialty.as_deref()),
        non_blank(input.contact_number.as_deref()),
    ) {
        (Some(n), Some(d), Some(s), Some(c)) => (n, d, s, c),
        _ => {
            return Err(ClinicError::validation(
                "name, department_id, specialty, and contact_number are required",
            ))
        }
    };

    let credentials = match (non_blank(input.username.as_deref()), non_blank(input.password.as_deref())) {
        (Some(username), Some(password)) => Some((username, password)),
        (None, None) => None,
        _ => return Err(ClinicError::validation("username and password must be provided together")),
    };
    let schedules = parse_schedules(input.schedules.as_ref())?;

    if store.find_department(&department_id).await?.is_none() {
        return Err(ClinicError::validation("Department not found"));
    }
    let specialty = store
        .find_specialty_by_name(&department_id, &specialty_name)
        .await?
        .ok_or_else(|| ClinicError::validation("Specialty not found in the given department"))?;

    let profile_image_url = store_optional_image(images, image).await?;

    let now = Utc::now();
    let doctor_id = new_id();
    let user = match credentials {
        Some((username, password)) => Some(User {
            // the login shares the doctor's id so tokens resolve straight to the doctor
            id: doctor_id.clone(),
            username: Some(username),
            email: None,
            phone: None,
            name: name.clone(),
            password_hash: hash_password(&password)?,
            role: Role::Doctor,
            created_at: now,
        }),
        None => None,
    };

    let doctor = Doctor {
        id: doctor_id,
        name,
        department_id,
        specialty_id: specialty.id,
        contact_number,
        description: non_blank(input.description.as_deref()),
        profile_image_url,
        user_id: user.as_ref().map(|u| u.id.clone()),
        schedules,
        created_at: now,
    };
    let record = store.create_doctor(doctor, user).await?;
    info!("Created doctor {} ({})", record.doctor.name, record.doctor.id);
    Ok(record)
}

pub async fn list_doctors(
    store: &dyn ClinicStore,
    actor: &AuthUser,
    query: DirectoryQuery,
) -> ClinicResult<Page<DoctorRecord>> {
    let scope = AccessScope::resolve(store, actor).await?;
    let Some(filter) = scope.restrict_doctors(DoctorFilter { search: query.search, ..Default::default() }) else {
        return Ok(Page::empty(query.paging));
    };
    let data = store.list_doctors(filter.clone(), query.paging.request()).await?;
    let total = store.count_doctors(filter).await?;
    Ok(Page::new(data, query.paging, total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use crate::services::listing::Paging;
    use crate::test_support::*;
    use serde_json::json;

    fn input() -> DoctorInput {
        DoctorInput {
            name: Some("Greg".into()),
            department_id: Some("d1".into()),
            specialty: Some("interventional".into()),
            contact_number: Some("555".into()),
            ..Default::default()
        }
    }

    #[test]
    fn schedules_accept_objects_or_json_strings() {
        let doc = json!([{ "Wednesday": [{ "start_time": "13:00", "end_time": "17:00" }] },
                         { "mon": [{ "start_time": "09:00", "end_time": "12:00" }] }]);
        let from_value = parse_schedules(Some(&doc)).unwrap();
        let from_string = parse_schedules(Some(&Value::String(doc.to_string()))).unwrap();
        assert_eq!(from_value, from_string);
        assert_eq!(from_value[0].day, Weekday::Mon);
        assert_eq!(from_value[1].day, Weekday::Wed);
    }

    #[test]
    fn schedules_reject_bad_days_times_and_ranges() {
        let bad_day = json!([{ "Caturday": [{ "start_time": "09:00", "end_time": "10:00" }] }]);
        let bad_time = json!([{ "Mon": [{ "start_time": "9:00", "end_time": "10:00" }] }]);
        let inverted = json!([{ "Mon": [{ "start_time": "10:00", "end_time": "10:00" }] }]);
        for doc in [bad_day, bad_time, inverted, json!("{oops"), json!({"Mon": []})] {
            assert!(matches!(parse_schedules(Some(&doc)), Err(ClinicError::Validation(_))), "{doc}");
        }
    }

    #[tokio::test]
    async fn creates_doctor_with_login_sharing_its_id() {
        let db = seeded_database().await;
        let doctor = create_doctor(
            &db,
            None,
            DoctorInput { username: Some("greg".into()), password: Some("pw".into()), ..input() },
            None,
        )
        .await
        .unwrap();

        assert_eq!(doctor.specialty.id, "s1");
        assert_eq!(doctor.doctor.user_id.as_deref(), Some(doctor.doctor.id.as_str()));
        let login = db.find_user_by_identifier("greg").await.unwrap().unwrap();
        assert_eq!(login.id, doctor.doctor.id);
        assert_eq!(login.role, Role::Doctor);
    }

    #[tokio::test]
    async fn creation_rejects_partial_credentials_and_foreign_specialties() {
        let db = seeded_database().await;
        let half = DoctorInput { username: Some("greg".into()), ..input() };
        assert!(matches!(create_doctor(&db, None, half, None).await, Err(ClinicError::Validation(_))));

        let foreign = DoctorInput { specialty: Some("Stroke".into()), ..input() };
        let err = create_doctor(&db, None, foreign, None).await.unwrap_err();
        assert!(matches!(err, ClinicError::Validation(m) if m.contains("Specialty not found")));

        let image = ImageUpload { bytes: vec![0], filename: "a.png".into(), content_type: "image/png".into() };
        let err = create_doctor(&db, None, input(), Some(image)).await.unwrap_err();
        assert!(matches!(err, ClinicError::Unavailable(_)));
        assert_eq!(db.snapshot().await.doctors.len(), 2);
    }

    #[tokio::test]
    async fn listing_is_scoped_searchable_and_paginated() {
        let db: Database = seeded_database().await;
        let admin = AuthUser::new("a", Role::Admin);

        let query = DirectoryQuery { paging: Paging { page: 1, page_size: 1 }, search: None };
        let page = list_doctors(&db, &admin, query).await.unwrap();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.meta.total, 2);
        assert_eq!(page.data[0].doctor.name, "Alice Smith");

        let query = DirectoryQuery { paging: Paging::default(), search: Some("stroke".into()) };
        let page = list_doctors(&db, &admin, query).await.unwrap();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].doctor.id, "doc-2");

        let unassigned = AuthUser::new("r-none", Role::Receptionist);
        let page = list_doctors(&db, &unassigned, DirectoryQuery::default()).await.unwrap();
        assert!(page.data.is_empty());
    }
}
