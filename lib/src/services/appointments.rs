// lib/src/services/appointments.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use models::identifiers::non_blank;
use models::validation::{parse_calendar_date, parse_clock_time, required};
use models::{AppointmentRecord, ClinicError, ClinicResult, STATUS_COMPLETE};
use security::AuthUser;

use crate::clinic_store::{AppointmentFilter, AppointmentOrder, ClinicStore, NewAppointment};
use crate::notifications::{Notifier, RealtimeEvent};
use crate::services::access_scope::AccessScope;
use crate::services::listing::{AppointmentQuery, Page};

/// Booking request body as submitted by clients.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentInput {
    pub patient_name: Option<String>,
    pub patient_phone: Option<String>,
    /// A JSON number or a numeric string.
    pub patient_age: Option<Value>,
    pub patient_gender: Option<String>,
    pub patient_notes: Option<String>,
    #[serde(alias = "department")]
    pub department_id: Option<String>,
    pub doctor_id: Option<String>,
    pub appointment_date: Option<String>,
    pub appointment_time: Option<String>,
}

fn parse_age(value: &Option<Value>) -> ClinicResult<u32> {
    let invalid = || ClinicError::validation("patientAge must be a positive integer");
    let age = match value {
        None | Some(Value::Null) => return Err(ClinicError::validation("patientAge is required")),
        Some(Value::Number(n)) => n.as_u64().ok_or_else(invalid)?,
        Some(Value::String(s)) if s.trim().is_empty() => return Err(ClinicError::validation("patientAge is required")),
        Some(Value::String(s)) => s.trim().parse::<u64>().map_err(|_| invalid())?,
        Some(_) => return Err(invalid()),
    };
    match u32::try_from(age) {
        Ok(age) if age > 0 => Ok(age),
        _ => Err(invalid()),
    }
}

impl AppointmentInput {
    /// Full validation; nothing touches the store before this passes.
    pub fn validate(self) -> ClinicResult<NewAppointment> {
        let patient_name = required("patientName", self.patient_name.as_deref())?;
        let patient_phone = required("patientPhone", self.patient_phone.as_deref())?;
        let patient_age = parse_age(&self.patient_age)?;
        let patient_gender = required("patientGender", self.patient_gender.as_deref())?;
        let department_id = required("departmentId", self.department_id.as_deref())?;
        let doctor_id = required("doctorId", self.doctor_id.as_deref())?;
        let date = required("appointmentDate", self.appointment_date.as_deref())?;
        let time = required("appointmentTime", self.appointment_time.as_deref())?;

        Ok(NewAppointment {
            patient_name,
            patient_phone,
            patient_age,
            patient_gender,
            patient_notes: non_blank(self.patient_notes.as_deref()),
            department_id,
            doctor_id,
            appointment_date: parse_calendar_date("appointmentDate", &date)?,
            appointment_time: parse_clock_time("appointmentTime", &time)?,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TodayStats {
    pub total: u64,
    pub completed: u64,
    pub pending: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NextPatient {
    pub name: String,
    pub age: u32,
    pub gender: String,
    pub contact: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueDoctor {
    pub id: String,
    pub name: String,
    pub specialty: NamedRef,
}

/// Per-doctor head of today's pending queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    pub next_patient: NextPatient,
    pub department: NamedRef,
    pub doctor: QueueDoctor,
    pub left_for_doctor: u32,
}

/// Last known details for a phone number; every field is null when unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientLookup {
    pub patient_name: Option<String>,
    pub patient_age: Option<u32>,
    pub patient_gender: Option<String>,
    pub department: Option<String>,
    pub department_id: Option<String>,
    pub doctor_id: Option<String>,
}

pub async fn list_appointments(
    store: &dyn ClinicStore,
    actor: &AuthUser,
    query: AppointmentQuery,
) -> ClinicResult<Page<AppointmentRecord>> {
    let scope = AccessScope::resolve(store, actor).await?;
    let requested = AppointmentFilter {
        doctor_id: query.doctor_id,
        department_ids: query.department_id.map(|id| vec![id]),
        search: query.search,
        date_from: query.start_date,
        date_to: query.end_date,
        ..Default::default()
    };
    let Some(filter) = scope.restrict(requested) else {
        debug!("Scope of {} admits no appointments", actor.id);
        return Ok(Page::empty(query.paging));
    };

    let (data, total) = store
        .page_appointments(filter, AppointmentOrder::Schedule, query.paging.request())
        .await?;
    Ok(Page::new(data, query.paging, total))
}

/// Books an appointment, upserting the patient in the same transaction, and
/// announces it once committed. Announcement failures are logged only.
pub async fn create_appointment(
    store: &dyn ClinicStore,
    notifier: &dyn Notifier,
    input: AppointmentInput,
) -> ClinicResult<AppointmentRecord> {
    let booking = input.validate()?;
    let record = store.book_appointment(booking).await?;
    info!(
        "Booked appointment {} ({}) for doctor {} on {} {}",
        record.appointment.id,
        record.appointment.status,
        record.appointment.doctor_id,
        record.appointment.appointment_date,
        record.appointment.appointment_time
    );

    match RealtimeEvent::for_booking(&record) {
        Ok(events) => events.into_iter().for_each(|event| notifier.publish(event)),
        Err(e) => warn!("Could not encode booking {} for subscribers: {}", record.appointment.id, e),
    }
    Ok(record)
}

pub async fn today_stats(store: &dyn ClinicStore, actor: &AuthUser, today: NaiveDate) -> ClinicResult<TodayStats> {
    let scope = AccessScope::resolve(store, actor).await?;
    let Some(filter) = scope.restrict(AppointmentFilter::on_date(today)) else {
        return Ok(TodayStats::default());
    };

    let total = store.count_appointments(filter.clone()).await?;
    let completed = store
        .count_appointments(AppointmentFilter { status_is: Some(STATUS_COMPLETE.to_string()), ..filter })
        .await?;
    Ok(TodayStats { total, completed, pending: total.saturating_sub(completed) })
}

/// Groups today's pending appointments by doctor, in the order doctors are
/// first met when sorted by doctor, time and booking time.
pub async fn next_patient_queue(
    store: &dyn ClinicStore,
    actor: &AuthUser,
    today: NaiveDate,
) -> ClinicResult<Vec<QueueEntry>> {
    let scope = AccessScope::resolve(store, actor).await?;
    let pending = AppointmentFilter { status_not: Some(STATUS_COMPLETE.to_string()), ..AppointmentFilter::on_date(today) };
    let Some(filter) = scope.restrict(pending) else {
        return Ok(Vec::new());
    };

    let appointments = store.find_appointments(filter, AppointmentOrder::Queue, None).await?;
    let mut queue: Vec<QueueEntry> = Vec::new();
    for record in appointments {
        if let Some(entry) = queue.iter_mut().find(|e| e.doctor.id == record.appointment.doctor_id) {
            entry.left_for_doctor += 1;
            continue;
        }
        let doctor = &record.doctor;
        queue.push(QueueEntry {
            next_patient: NextPatient {
                name: record.appointment.patient_name.clone(),
                age: record.appointment.patient_age,
                gender: record.appointment.patient_gender.clone(),
                contact: record.appointment.patient_phone.clone(),
            },
            department: NamedRef { id: record.department.id.clone(), name: record.department.name.clone() },
            doctor: QueueDoctor {
                id: doctor.doctor.id.clone(),
                name: doctor.doctor.name.clone(),
                specialty: NamedRef { id: doctor.specialty.id.clone(), name: doctor.specialty.name.clone() },
            },
            left_for_doctor: 1,
        });
    }
    Ok(queue)
}

pub async fn find_patient_by_contact(store: &dyn ClinicStore, contact_number: Option<&str>) -> ClinicResult<PatientLookup> {
    let phone = required("contactNumber", contact_number)?;
    let Some(patient) = store.find_patient(&phone).await? else {
        return Ok(PatientLookup::default());
    };

    let latest = store
        .find_appointments(
            AppointmentFilter { patient_phone: Some(phone), ..Default::default() },
            AppointmentOrder::MostRecent,
            Some(crate::clinic_store::PageRequest { skip: 0, take: 1 }),
        )
        .await?
        .into_iter()
        .next();

    Ok(PatientLookup {
        patient_name: Some(patient.name),
        patient_age: Some(patient.age),
        patient_gender: Some(patient.gender),
        department: latest.as_ref().map(|r| r.department.name.clone()),
        department_id: latest.as_ref().map(|r| r.appointment.department_id.clone()),
        doctor_id: latest.as_ref().map(|r| r.appointment.doctor_id.clone()),
    })
}

/// Sets a free-text status on an appointment the actor can see.
pub async fn update_status(
    store: &dyn ClinicStore,
    actor: &AuthUser,
    appointment_id: &str,
    status: Option<&str>,
) -> ClinicResult<AppointmentRecord> {
    let status = required("status", status)?;
    let scope = AccessScope::resolve(store, actor).await?;
    let visible = store
        .find_appointment(appointment_id)
        .await?
        .is_some_and(|record| scope.permits(&record.appointment));
    if !visible {
        return Err(ClinicError::NotFound("Appointment not found".to_string()));
    }
    let record = store.update_appointment_status(appointment_id, status).await?;
    info!("Appointment {} moved to status {}", appointment_id, record.appointment.status);
    Ok(record)
}
