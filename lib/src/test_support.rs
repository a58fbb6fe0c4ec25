// lib/src/test_support.rs
// Fixtures shared by the store and service tests.

use chrono::{NaiveDate, Utc};

use models::{Department, Doctor, Role, Specialty, User};

use crate::clinic_store::{ClinicStore, NewAppointment};
use crate::database::Database;

pub fn date(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
}

pub fn department(id: &str, name: &str) -> Department {
    Department { id: id.into(), name: name.into(), created_at: Utc::now() }
}

pub fn specialty(id: &str, name: &str, department_id: &str) -> Specialty {
    Specialty { id: id.into(), name: name.into(), department_id: department_id.into() }
}

pub fn doctor(id: &str, name: &str, department_id: &str, specialty_id: &str) -> Doctor {
    Doctor {
        id: id.into(),
        name: name.into(),
        department_id: department_id.into(),
        specialty_id: specialty_id.into(),
        contact_number: format!("555-{id}"),
        description: None,
        profile_image_url: None,
        user_id: None,
        schedules: Vec::new(),
        created_at: Utc::now(),
    }
}

pub fn user(id: &str, username: &str, role: Role) -> User {
    User {
        id: id.into(),
        username: Some(username.into()),
        email: None,
        phone: None,
        name: username.into(),
        password_hash: String::new(),
        role,
        created_at: Utc::now(),
    }
}

pub fn booking(phone: &str, name: &str, department_id: &str, doctor_id: &str, day: NaiveDate, time: &str) -> NewAppointment {
    NewAppointment {
        patient_name: name.into(),
        patient_phone: phone.into(),
        patient_age: 40,
        patient_gender: "female".into(),
        patient_notes: None,
        department_id: department_id.into(),
        doctor_id: doctor_id.into(),
        appointment_date: day,
        appointment_time: time.into(),
    }
}

/// Two departments with one doctor each:
/// `d1` Cardiology / `doc-1` Alice Smith, `d2` Neurology / `doc-2` Bob Jones.
pub async fn seeded_database() -> Database {
    let db = Database::in_memory();
    db.create_department(department("d1", "Cardiology"), vec![specialty("s1", "Interventional", "d1")])
        .await
        .unwrap();
    db.create_department(department("d2", "Neurology"), vec![specialty("s2", "Stroke", "d2")])
        .await
        .unwrap();
    db.create_doctor(doctor("doc-1", "Alice Smith", "d1", "s1"), None).await.unwrap();
    db.create_doctor(doctor("doc-2", "Bob Jones", "d2", "s2"), None).await.unwrap();
    db
}
