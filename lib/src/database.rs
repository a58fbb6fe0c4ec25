// lib/src/database.rs

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use models::{
    Appointment, AppointmentRecord, ClinicError, ClinicResult, Department, DepartmentRecord, Doctor,
    DoctorRecord, Patient, Receptionist, ReceptionistRecord, Specialty, User, STATUS_FOLLOW_UP, STATUS_NEW,
};

use crate::clinic_store::{
    AppointmentFilter, AppointmentOrder, ClinicStore, DoctorFilter, NewAppointment, PageRequest,
};
use crate::config::{StorageConfig, StorageEngineType};
use crate::storage_engine::{create_storage, Catalog, ChangeSet, InMemoryStorage, Mutation, StorageEngine};

/// The clinic database: an in-memory catalog of committed rows in front of a
/// durable [`StorageEngine`].
///
/// Writes are serialized through the catalog's write lock. A transaction plans
/// its change set against the current catalog, commits it through the engine,
/// and only then applies it in memory, so a failed commit leaves no trace.
/// Reads take the shared lock and never observe a half-applied transaction.
pub struct Database {
    catalog: RwLock<Catalog>,
    engine: Arc<dyn StorageEngine>,
}

impl Database {
    /// Creates a new database instance based on the provided storage configuration.
    pub async fn new(config: &StorageConfig) -> ClinicResult<Self> {
        let engine = create_storage(config)?;
        Self::with_engine(engine).await
    }

    pub async fn with_engine(engine: Arc<dyn StorageEngine>) -> ClinicResult<Self> {
        let catalog = engine.load().await?;
        info!(
            "Database ready on {} engine ({} users, {} appointments)",
            engine.get_type(),
            catalog.users.len(),
            catalog.appointments.len()
        );
        Ok(Database { catalog: RwLock::new(catalog), engine })
    }

    pub fn in_memory() -> Self {
        Database { catalog: RwLock::new(Catalog::default()), engine: Arc::new(InMemoryStorage::new()) }
    }

    pub fn engine_type(&self) -> StorageEngineType {
        self.engine.get_type()
    }

    /// A copy of the committed state.
    pub async fn snapshot(&self) -> Catalog {
        self.catalog.read().await.clone()
    }

    pub async fn flush(&self) -> ClinicResult<()> {
        self.engine.flush().await
    }

    async fn read<R, F>(&self, f: F) -> ClinicResult<R>
    where
        F: FnOnce(&Catalog) -> ClinicResult<R> + Send,
        R: Send,
    {
        let catalog = self.catalog.read().await;
        f(&catalog)
    }

    /// Runs one all-or-nothing write. `plan` inspects the catalog and returns
    /// the change set plus a context value; `view` builds the result from the
    /// catalog after the change set has been applied.
    pub async fn transaction<C, R, P, V>(&self, plan: P, view: V) -> ClinicResult<R>
    where
        P: FnOnce(&Catalog) -> ClinicResult<(ChangeSet, C)> + Send,
        V: FnOnce(&Catalog, C) -> ClinicResult<R> + Send,
        C: Send,
        R: Send,
    {
        let mut catalog = self.catalog.write().await;
        let (changes, context) = plan(&catalog)?;
        if !changes.is_empty() {
            debug!("Committing change set of {} mutations", changes.len());
            self.engine.commit(&changes).await.map_err(|e| {
                warn!("Commit failed, catalog left unchanged: {}", e);
                e
            })?;
            catalog.apply_all(changes);
        }
        let catalog = catalog.downgrade();
        view(&catalog, context)
    }
}

fn dangling(kind: &str, id: &str, missing: &str) -> ClinicError {
    ClinicError::Internal(format!("{} {} references a missing {}", kind, id, missing))
}

fn needle(search: &Option<String>) -> Option<String> {
    search.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_lowercase)
}

fn contains_any(needle: &str, fields: &[&str]) -> bool {
    fields.iter().any(|field| field.to_lowercase().contains(needle))
}

fn paginate<T>(rows: Vec<T>, page: Option<PageRequest>) -> Vec<T> {
    match page {
        Some(page) => rows.into_iter().skip(page.skip).take(page.take).collect(),
        None => rows,
    }
}

fn department_record(catalog: &Catalog, department: &Department) -> DepartmentRecord {
    DepartmentRecord { department: department.clone(), specialties: catalog.specialties_of(&department.id) }
}

fn doctor_record(catalog: &Catalog, doctor: &Doctor) -> ClinicResult<DoctorRecord> {
    let department = catalog
        .departments
        .get(&doctor.department_id)
        .cloned()
        .ok_or_else(|| dangling("doctor", &doctor.id, "department"))?;
    let specialty = catalog
        .specialties
        .get(&doctor.specialty_id)
        .cloned()
        .ok_or_else(|| dangling("doctor", &doctor.id, "specialty"))?;
    let user = doctor.user_id.as_ref().and_then(|id| catalog.users.get(id)).map(User::profile);

    let mut doctor = doctor.clone();
    doctor.schedules.sort_by(|a, b| a.day.cmp(&b.day).then_with(|| a.start_time.cmp(&b.start_time)));
    Ok(DoctorRecord { doctor, department, specialty, user })
}

fn receptionist_record(catalog: &Catalog, receptionist: &Receptionist) -> ClinicResult<ReceptionistRecord> {
    let departments = receptionist
        .department_ids
        .iter()
        .map(|id| {
            catalog
                .departments
                .get(id)
                .cloned()
                .ok_or_else(|| dangling("receptionist", &receptionist.id, "department"))
        })
        .collect::<ClinicResult<Vec<_>>>()?;
    let user = catalog.users.get(&receptionist.user_id).map(User::profile);
    Ok(ReceptionistRecord { receptionist: receptionist.clone(), departments, user })
}

fn appointment_record(catalog: &Catalog, appointment: &Appointment) -> ClinicResult<AppointmentRecord> {
    let department = catalog
        .departments
        .get(&appointment.department_id)
        .cloned()
        .ok_or_else(|| dangling("appointment", &appointment.id, "department"))?;
    let doctor = catalog
        .doctors
        .get(&appointment.doctor_id)
        .ok_or_else(|| dangling("appointment", &appointment.id, "doctor"))?;
    Ok(AppointmentRecord {
        appointment: appointment.clone(),
        patient: catalog.patients.get(&appointment.patient_phone).cloned(),
        department,
        doctor: doctor_record(catalog, doctor)?,
    })
}

fn appointment_matches(catalog: &Catalog, a: &Appointment, filter: &AppointmentFilter, needle: Option<&str>) -> bool {
    if filter.doctor_id.as_ref().is_some_and(|id| *id != a.doctor_id) {
        return false;
    }
    if filter.department_ids.as_ref().is_some_and(|ids| !ids.contains(&a.department_id)) {
        return false;
    }
    if filter.date_from.is_some_and(|from| a.appointment_date < from) {
        return false;
    }
    if filter.date_to.is_some_and(|to| a.appointment_date > to) {
        return false;
    }
    if filter.status_is.as_ref().is_some_and(|s| *s != a.status) {
        return false;
    }
    if filter.status_not.as_ref().is_some_and(|s| *s == a.status) {
        return false;
    }
    if filter.patient_phone.as_ref().is_some_and(|p| *p != a.patient_phone) {
        return false;
    }
    match needle {
        None => true,
        Some(needle) => {
            let department = catalog.departments.get(&a.department_id).map(|d| d.name.as_str()).unwrap_or("");
            let doctor = catalog.doctors.get(&a.doctor_id).map(|d| d.name.as_str()).unwrap_or("");
            contains_any(
                needle,
                &[a.patient_name.as_str(), a.patient_phone.as_str(), a.status.as_str(), department, doctor],
            )
        }
    }
}

fn compare_appointments(order: AppointmentOrder, a: &Appointment, b: &Appointment) -> Ordering {
    let schedule = |x: &Appointment, y: &Appointment| {
        x.appointment_date
            .cmp(&y.appointment_date)
            .then_with(|| x.appointment_time.cmp(&y.appointment_time))
            .then_with(|| x.created_at.cmp(&y.created_at))
            .then_with(|| x.id.cmp(&y.id))
    };
    match order {
        AppointmentOrder::Schedule => schedule(a, b),
        AppointmentOrder::MostRecent => schedule(b, a),
        AppointmentOrder::Queue => a
            .doctor_id
            .cmp(&b.doctor_id)
            .then_with(|| a.appointment_time.cmp(&b.appointment_time))
            .then_with(|| a.created_at.cmp(&b.created_at))
            .then_with(|| a.id.cmp(&b.id)),
    }
}

fn select_appointments<'a>(catalog: &'a Catalog, filter: &AppointmentFilter) -> Vec<&'a Appointment> {
    let needle = needle(&filter.search);
    catalog
        .appointments
        .values()
        .filter(|a| appointment_matches(catalog, a, filter, needle.as_deref()))
        .collect()
}

fn select_doctors<'a>(catalog: &'a Catalog, filter: &DoctorFilter) -> Vec<&'a Doctor> {
    let needle = needle(&filter.search);
    let mut doctors: Vec<&Doctor> = catalog
        .doctors
        .values()
        .filter(|d| filter.doctor_id.as_ref().map_or(true, |id| *id == d.id))
        .filter(|d| filter.department_ids.as_ref().map_or(true, |ids| ids.contains(&d.department_id)))
        .filter(|d| match needle.as_deref() {
            None => true,
            Some(needle) => {
                let department = catalog.departments.get(&d.department_id).map(|x| x.name.as_str()).unwrap_or("");
                let specialty = catalog.specialties.get(&d.specialty_id).map(|x| x.name.as_str()).unwrap_or("");
                contains_any(needle, &[d.name.as_str(), d.contact_number.as_str(), department, specialty])
            }
        })
        .collect();
    doctors.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
    doctors
}

fn select_receptionists<'a>(catalog: &'a Catalog, search: &Option<String>) -> Vec<&'a Receptionist> {
    let needle = needle(search);
    let mut receptionists: Vec<&Receptionist> = catalog
        .receptionists
        .values()
        .filter(|r| match needle.as_deref() {
            None => true,
            Some(needle) => {
                let departments: Vec<&str> = r
                    .department_ids
                    .iter()
                    .filter_map(|id| catalog.departments.get(id))
                    .map(|d| d.name.as_str())
                    .collect();
                contains_any(needle, &[r.name.as_str(), r.contact_number.as_str()]) || contains_any(needle, &departments)
            }
        })
        .collect();
    receptionists.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
    receptionists
}

#[async_trait]
impl ClinicStore for Database {
    async fn find_user_by_id(&self, id: &str) -> ClinicResult<Option<User>> {
        self.read(|catalog| Ok(catalog.users.get(id).cloned())).await
    }

    async fn find_user_by_identifier(&self, identifier: &str) -> ClinicResult<Option<User>> {
        self.read(|catalog| Ok(catalog.user_by_identifier(identifier).cloned())).await
    }

    async fn create_user(&self, user: User) -> ClinicResult<User> {
        self.transaction(
            move |catalog| {
                if catalog.users.contains_key(&user.id) {
                    return Err(ClinicError::Conflict("A user with this id already exists".to_string()));
                }
                catalog.ensure_identifiers_free(&user, None)?;
                Ok((ChangeSet::from(vec![Mutation::PutUser(user.clone())]), user))
            },
            |_, user| Ok(user),
        )
        .await
    }

    async fn upsert_user_by_username(&self, user: User) -> ClinicResult<User> {
        self.transaction(
            move |catalog| {
                let username = user
                    .username
                    .clone()
                    .ok_or_else(|| ClinicError::validation("username is required"))?;
                let user = match catalog.user_by_username(&username) {
                    Some(existing) => User { id: existing.id.clone(), created_at: existing.created_at, ..user },
                    None => user,
                };
                catalog.ensure_identifiers_free(&user, Some(&user.id))?;
                Ok((ChangeSet::from(vec![Mutation::PutUser(user.clone())]), user))
            },
            |_, user| Ok(user),
        )
        .await
    }

    async fn list_users(&self) -> ClinicResult<Vec<User>> {
        self.read(|catalog| {
            let mut users: Vec<User> = catalog.users.values().cloned().collect();
            users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
            Ok(users)
        })
        .await
    }

    async fn list_departments(&self, ids: Option<Vec<String>>) -> ClinicResult<Vec<DepartmentRecord>> {
        self.read(move |catalog| {
            let mut departments: Vec<&Department> = catalog
                .departments
                .values()
                .filter(|d| ids.as_ref().map_or(true, |ids| ids.contains(&d.id)))
                .collect();
            departments.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
            Ok(departments.into_iter().map(|d| department_record(catalog, d)).collect())
        })
        .await
    }

    async fn find_department(&self, id: &str) -> ClinicResult<Option<Department>> {
        self.read(|catalog| Ok(catalog.departments.get(id).cloned())).await
    }

    async fn create_department(&self, department: Department, specialties: Vec<Specialty>) -> ClinicResult<DepartmentRecord> {
        self.transaction(
            move |catalog| {
                if catalog.department_by_name(&department.name).is_some() {
                    return Err(ClinicError::Conflict("Department name already exists".to_string()));
                }
                let id = department.id.clone();
                let mut changes = ChangeSet::from(vec![Mutation::PutDepartment(department)]);
                for specialty in specialties {
                    changes.push(Mutation::PutSpecialty(specialty));
                }
                Ok((changes, id))
            },
            |catalog, id| {
                let department = catalog.departments.get(&id).ok_or_else(|| dangling("department", &id, "row"))?;
                Ok(department_record(catalog, department))
            },
        )
        .await
    }

    async fn delete_department(&self, id: &str) -> ClinicResult<()> {
        let id = id.to_string();
        self.transaction(
            move |catalog| {
                if !catalog.departments.contains_key(&id) {
                    return Err(ClinicError::NotFound("Department not found".to_string()));
                }
                if catalog.doctors.values().any(|d| d.department_id == id) {
                    return Err(ClinicError::Conflict("Department still has doctors assigned".to_string()));
                }
                if catalog.receptionists.values().any(|r| r.department_ids.contains(&id)) {
                    return Err(ClinicError::Conflict("Department still has receptionists assigned".to_string()));
                }
                if catalog.appointments.values().any(|a| a.department_id == id) {
                    return Err(ClinicError::Conflict("Department still has appointments".to_string()));
                }
                let mut changes = ChangeSet::new();
                for specialty in catalog.specialties.values().filter(|s| s.department_id == id) {
                    changes.push(Mutation::DeleteSpecialty(specialty.id.clone()));
                }
                changes.push(Mutation::DeleteDepartment(id));
                Ok((changes, ()))
            },
            |_, ()| Ok(()),
        )
        .await
    }

    async fn list_specialties(&self, department_id: &str) -> ClinicResult<Vec<Specialty>> {
        self.read(|catalog| Ok(catalog.specialties_of(department_id))).await
    }

    async fn create_specialty(&self, specialty: Specialty) -> ClinicResult<Specialty> {
        self.transaction(
            move |catalog| {
                if !catalog.departments.contains_key(&specialty.department_id) {
                    return Err(ClinicError::NotFound("Department not found".to_string()));
                }
                let taken = catalog
                    .specialties
                    .values()
                    .any(|s| s.department_id == specialty.department_id && s.name.eq_ignore_ascii_case(&specialty.name));
                if taken {
                    return Err(ClinicError::Conflict("Specialty already exists in this department".to_string()));
                }
                Ok((ChangeSet::from(vec![Mutation::PutSpecialty(specialty.clone())]), specialty))
            },
            |_, specialty| Ok(specialty),
        )
        .await
    }

    async fn find_specialty_by_name(&self, department_id: &str, name: &str) -> ClinicResult<Option<Specialty>> {
        self.read(|catalog| {
            Ok(catalog
                .specialties
                .values()
                .find(|s| s.department_id == department_id && s.name.eq_ignore_ascii_case(name))
                .cloned())
        })
        .await
    }

    async fn create_doctor(&self, doctor: Doctor, user: Option<User>) -> ClinicResult<DoctorRecord> {
        self.transaction(
            move |catalog| {
                if !catalog.departments.contains_key(&doctor.department_id) {
                    return Err(ClinicError::validation("Department not found"));
                }
                let specialty_in_department = catalog
                    .specialties
                    .get(&doctor.specialty_id)
                    .is_some_and(|s| s.department_id == doctor.department_id);
                if !specialty_in_department {
                    return Err(ClinicError::validation("Specialty not found in the given department"));
                }
                if catalog.doctors.contains_key(&doctor.id) {
                    return Err(ClinicError::Conflict("A doctor with this id already exists".to_string()));
                }
                let mut changes = ChangeSet::new();
                if let Some(user) = user {
                    if catalog.users.contains_key(&user.id) {
                        return Err(ClinicError::Conflict("A user with this id already exists".to_string()));
                    }
                    catalog.ensure_identifiers_free(&user, None)?;
                    changes.push(Mutation::PutUser(user));
                }
                let id = doctor.id.clone();
                changes.push(Mutation::PutDoctor(doctor));
                Ok((changes, id))
            },
            |catalog, id| {
                let doctor = catalog.doctors.get(&id).ok_or_else(|| dangling("doctor", &id, "row"))?;
                doctor_record(catalog, doctor)
            },
        )
        .await
    }

    async fn find_doctor(&self, id: &str) -> ClinicResult<Option<DoctorRecord>> {
        self.read(|catalog| catalog.doctors.get(id).map(|d| doctor_record(catalog, d)).transpose()).await
    }

    async fn list_doctors(&self, filter: DoctorFilter, page: PageRequest) -> ClinicResult<Vec<DoctorRecord>> {
        self.read(move |catalog| {
            paginate(select_doctors(catalog, &filter), Some(page))
                .into_iter()
                .map(|d| doctor_record(catalog, d))
                .collect()
        })
        .await
    }

    async fn count_doctors(&self, filter: DoctorFilter) -> ClinicResult<u64> {
        self.read(move |catalog| Ok(select_doctors(catalog, &filter).len() as u64)).await
    }

    async fn create_receptionist(&self, receptionist: Receptionist, user: User) -> ClinicResult<ReceptionistRecord> {
        self.transaction(
            move |catalog| {
                for (index, id) in receptionist.department_ids.iter().enumerate() {
                    if !catalog.departments.contains_key(id) {
                        return Err(ClinicError::Validation(format!("Department not found: {}", id)));
                    }
                    if receptionist.department_ids[..index].contains(id) {
                        return Err(ClinicError::validation("department_ids must not contain duplicates"));
                    }
                }
                if catalog.users.contains_key(&user.id) {
                    return Err(ClinicError::Conflict("A user with this id already exists".to_string()));
                }
                catalog.ensure_identifiers_free(&user, None)?;
                let id = receptionist.id.clone();
                let changes = ChangeSet::from(vec![Mutation::PutUser(user), Mutation::PutReceptionist(receptionist)]);
                Ok((changes, id))
            },
            |catalog, id| {
                let receptionist = catalog.receptionists.get(&id).ok_or_else(|| dangling("receptionist", &id, "row"))?;
                receptionist_record(catalog, receptionist)
            },
        )
        .await
    }

    async fn list_receptionists(&self, search: Option<String>, page: PageRequest) -> ClinicResult<Vec<ReceptionistRecord>> {
        self.read(move |catalog| {
            paginate(select_receptionists(catalog, &search), Some(page))
                .into_iter()
                .map(|r| receptionist_record(catalog, r))
                .collect()
        })
        .await
    }

    async fn count_receptionists(&self, search: Option<String>) -> ClinicResult<u64> {
        self.read(move |catalog| Ok(select_receptionists(catalog, &search).len() as u64)).await
    }

    async fn receptionist_department_ids(&self, user_id: &str) -> ClinicResult<Vec<String>> {
        self.read(|catalog| {
            Ok(catalog
                .receptionist_by_user(user_id)
                .map(|r| r.department_ids.clone())
                .unwrap_or_default())
        })
        .await
    }

    async fn find_patient(&self, phone_number: &str) -> ClinicResult<Option<Patient>> {
        self.read(|catalog| Ok(catalog.patients.get(phone_number).cloned())).await
    }

    async fn book_appointment(&self, booking: NewAppointment) -> ClinicResult<AppointmentRecord> {
        self.transaction(
            move |catalog| {
                if !catalog.departments.contains_key(&booking.department_id) {
                    return Err(ClinicError::validation("Department not found"));
                }
                if !catalog.doctors.contains_key(&booking.doctor_id) {
                    return Err(ClinicError::validation("Doctor not found"));
                }

                let now = Utc::now();
                let (patient, status) = match catalog.patients.get(&booking.patient_phone) {
                    Some(existing) => (
                        Patient {
                            name: booking.patient_name.clone(),
                            age: booking.patient_age,
                            gender: booking.patient_gender.clone(),
                            notes: booking.patient_notes.clone(),
                            updated_at: now,
                            ..existing.clone()
                        },
                        STATUS_FOLLOW_UP,
                    ),
                    None => (
                        Patient {
                            phone_number: booking.patient_phone.clone(),
                            name: booking.patient_name.clone(),
                            age: booking.patient_age,
                            gender: booking.patient_gender.clone(),
                            notes: booking.patient_notes.clone(),
                            created_at: now,
                            updated_at: now,
                        },
                        STATUS_NEW,
                    ),
                };

                let appointment = Appointment {
                    id: models::new_id(),
                    patient_name: booking.patient_name,
                    patient_phone: booking.patient_phone,
                    patient_age: booking.patient_age,
                    patient_gender: booking.patient_gender,
                    patient_notes: booking.patient_notes,
                    department_id: booking.department_id,
                    doctor_id: booking.doctor_id,
                    appointment_date: booking.appointment_date,
                    appointment_time: booking.appointment_time,
                    status: status.to_string(),
                    created_at: now,
                };
                let id = appointment.id.clone();
                let changes = ChangeSet::from(vec![Mutation::PutPatient(patient), Mutation::PutAppointment(appointment)]);
                Ok((changes, id))
            },
            |catalog, id| {
                let appointment = catalog.appointments.get(&id).ok_or_else(|| dangling("appointment", &id, "row"))?;
                appointment_record(catalog, appointment)
            },
        )
        .await
    }

    async fn find_appointment(&self, id: &str) -> ClinicResult<Option<AppointmentRecord>> {
        self.read(|catalog| catalog.appointments.get(id).map(|a| appointment_record(catalog, a)).transpose())
            .await
    }

    async fn find_appointments(
        &self,
        filter: AppointmentFilter,
        order: AppointmentOrder,
        page: Option<PageRequest>,
    ) -> ClinicResult<Vec<AppointmentRecord>> {
        self.read(move |catalog| {
            let mut rows = select_appointments(catalog, &filter);
            rows.sort_by(|a, b| compare_appointments(order, a, b));
            paginate(rows, page).into_iter().map(|a| appointment_record(catalog, a)).collect()
        })
        .await
    }

    async fn count_appointments(&self, filter: AppointmentFilter) -> ClinicResult<u64> {
        self.read(move |catalog| Ok(select_appointments(catalog, &filter).len() as u64)).await
    }

    async fn page_appointments(
        &self,
        filter: AppointmentFilter,
        order: AppointmentOrder,
        page: PageRequest,
    ) -> ClinicResult<(Vec<AppointmentRecord>, u64)> {
        self.read(move |catalog| {
            let mut rows = select_appointments(catalog, &filter);
            let total = rows.len() as u64;
            rows.sort_by(|a, b| compare_appointments(order, a, b));
            let data = paginate(rows, Some(page))
                .into_iter()
                .map(|a| appointment_record(catalog, a))
                .collect::<ClinicResult<Vec<_>>>()?;
            Ok((data, total))
        })
        .await
    }

    async fn update_appointment_status(&self, id: &str, status: String) -> ClinicResult<AppointmentRecord> {
        let id = id.to_string();
        self.transaction(
            move |catalog| {
                let existing = catalog
                    .appointments
                    .get(&id)
                    .ok_or_else(|| ClinicError::NotFound("Appointment not found".to_string()))?;
                let updated = Appointment { status, ..existing.clone() };
                Ok((ChangeSet::from(vec![Mutation::PutAppointment(updated)]), id))
            },
            |catalog, id| {
                let appointment = catalog.appointments.get(&id).ok_or_else(|| dangling("appointment", &id, "row"))?;
                appointment_record(catalog, appointment)
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage_engine::storage_engine::MockStorageEngine;
    use crate::test_support::*;
    use models::Role;

    #[tokio::test]
    async fn should_mark_first_booking_new_and_repeat_follow_up() {
        let db = seeded_database().await;
        let first = db.book_appointment(booking("0700", "Jane", "d1", "doc-1", date("2024-05-01"), "09:00")).await.unwrap();
        assert_eq!(first.appointment.status, STATUS_NEW);

        let mut again = booking("0700", "Jane Doe", "d2", "doc-2", date("2024-05-02"), "10:00");
        again.patient_age = 41;
        again.patient_notes = Some("allergic".into());
        let second = db.book_appointment(again).await.unwrap();
        assert_eq!(second.appointment.status, STATUS_FOLLOW_UP);

        let catalog = db.snapshot().await;
        assert_eq!(catalog.patients.len(), 1);
        let patient = &catalog.patients["0700"];
        assert_eq!(patient.name, "Jane Doe");
        assert_eq!(patient.age, 41);
        assert_eq!(patient.notes.as_deref(), Some("allergic"));
        // the first appointment keeps its snapshot
        assert_eq!(catalog.appointments[&first.appointment.id].patient_name, "Jane");
    }

    #[tokio::test]
    async fn should_reject_dangling_references_without_writing() {
        let db = seeded_database().await;
        let err = db
            .book_appointment(booking("0700", "Jane", "d1", "nobody", date("2024-05-01"), "09:00"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::Validation(m) if m == "Doctor not found"));
        let catalog = db.snapshot().await;
        assert!(catalog.patients.is_empty());
        assert!(catalog.appointments.is_empty());
    }

    #[tokio::test]
    async fn failed_commit_leaves_catalog_untouched() {
        let mut engine = MockStorageEngine::new();
        engine.expect_load().returning(|| Ok(Catalog::default()));
        engine.expect_get_type().return_const(StorageEngineType::InMemory);
        engine
            .expect_commit()
            .returning(|_| Err(ClinicError::Storage("disk full".into())));
        let db = Database::with_engine(Arc::new(engine)).await.unwrap();

        let err = db.create_department(department("d1", "Cardiology"), vec![]).await.unwrap_err();
        assert!(matches!(err, ClinicError::Storage(_)));
        assert!(db.snapshot().await.departments.is_empty());
    }

    #[tokio::test]
    async fn should_order_and_paginate_schedule() {
        let db = seeded_database().await;
        db.book_appointment(booking("1", "Late", "d1", "doc-1", date("2024-05-02"), "08:00")).await.unwrap();
        db.book_appointment(booking("2", "Early", "d1", "doc-1", date("2024-05-01"), "11:00")).await.unwrap();
        db.book_appointment(booking("3", "Earlier", "d2", "doc-2", date("2024-05-01"), "09:30")).await.unwrap();

        let all = db
            .find_appointments(AppointmentFilter::default(), AppointmentOrder::Schedule, None)
            .await
            .unwrap();
        let names: Vec<_> = all.iter().map(|r| r.appointment.patient_name.as_str()).collect();
        assert_eq!(names, vec!["Earlier", "Early", "Late"]);

        let page = db
            .find_appointments(AppointmentFilter::default(), AppointmentOrder::Schedule, Some(PageRequest::new(2, 2)))
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].appointment.patient_name, "Late");
        assert_eq!(db.count_appointments(AppointmentFilter::default()).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn page_reports_unpaged_total_with_window() {
        let db = seeded_database().await;
        for (phone, time) in [("1", "08:00"), ("2", "09:00"), ("3", "10:00")] {
            db.book_appointment(booking(phone, phone, "d1", "doc-1", date("2024-05-01"), time)).await.unwrap();
        }
        db.book_appointment(booking("4", "Other", "d2", "doc-2", date("2024-05-01"), "07:00")).await.unwrap();

        let filter = AppointmentFilter { department_ids: Some(vec!["d1".into()]), ..Default::default() };
        let (rows, total) = db
            .page_appointments(filter, AppointmentOrder::Schedule, PageRequest::new(2, 2))
            .await
            .unwrap();
        assert_eq!(total, 3);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].appointment.appointment_time, "10:00");
    }

    #[tokio::test]
    async fn search_spans_patient_doctor_and_department_names() {
        let db = seeded_database().await;
        db.book_appointment(booking("1", "John Smith", "d2", "doc-2", date("2024-05-01"), "09:00")).await.unwrap();
        db.book_appointment(booking("2", "Mary", "d1", "doc-1", date("2024-05-01"), "09:00")).await.unwrap();
        db.book_appointment(booking("3", "Zed", "d2", "doc-2", date("2024-05-01"), "10:00")).await.unwrap();

        let filter = AppointmentFilter { search: Some("SMITH".into()), ..Default::default() };
        let found = db.find_appointments(filter.clone(), AppointmentOrder::Schedule, None).await.unwrap();
        let mut names: Vec<_> = found.iter().map(|r| r.appointment.patient_name.clone()).collect();
        names.sort();
        // John by patient name, Mary through her doctor Alice Smith
        assert_eq!(names, vec!["John Smith", "Mary"]);

        let by_department = AppointmentFilter { search: Some("neuro".into()), ..Default::default() };
        assert_eq!(db.count_appointments(by_department).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn department_delete_cascades_and_guards_references() {
        let db = seeded_database().await;
        db.create_department(department("d3", "Dermatology"), vec![specialty("s3", "Acne", "d3")])
            .await
            .unwrap();

        assert!(matches!(db.delete_department("d1").await, Err(ClinicError::Conflict(_))));
        assert!(matches!(db.delete_department("missing").await, Err(ClinicError::NotFound(_))));

        db.delete_department("d3").await.unwrap();
        let catalog = db.snapshot().await;
        assert!(!catalog.departments.contains_key("d3"));
        assert!(!catalog.specialties.contains_key("s3"));
    }

    #[tokio::test]
    async fn doctor_specialty_must_belong_to_department() {
        let db = seeded_database().await;
        let err = db.create_doctor(doctor("doc-3", "Eve", "d1", "s2"), None).await.unwrap_err();
        assert!(matches!(err, ClinicError::Validation(_)));
    }

    #[tokio::test]
    async fn duplicate_identifiers_are_conflicts() {
        let db = Database::in_memory();
        db.create_user(user("u1", "desk", Role::Receptionist)).await.unwrap();
        let err = db.create_user(user("u2", "desk", Role::Admin)).await.unwrap_err();
        assert!(matches!(err, ClinicError::Conflict(_)));
    }

    #[tokio::test]
    async fn upsert_by_username_keeps_id_and_refreshes_fields() {
        let db = Database::in_memory();
        let original = db.upsert_user_by_username(user("u1", "admin", Role::Receptionist)).await.unwrap();
        let mut refreshed = user("u2", "admin", Role::Admin);
        refreshed.name = "Root".into();
        let refreshed = db.upsert_user_by_username(refreshed).await.unwrap();

        assert_eq!(refreshed.id, original.id);
        assert_eq!(refreshed.role, Role::Admin);
        assert_eq!(db.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn sled_backed_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig::sled(dir.path());
        {
            let db = Database::new(&config).await.unwrap();
            db.create_department(department("d1", "Cardiology"), vec![specialty("s1", "Echo", "d1")])
                .await
                .unwrap();
            db.create_doctor(doctor("doc-1", "Alice", "d1", "s1"), None).await.unwrap();
            db.book_appointment(booking("0700", "Jane", "d1", "doc-1", date("2024-05-01"), "09:00"))
                .await
                .unwrap();
        }

        let db = Database::new(&config).await.unwrap();
        assert_eq!(db.engine_type(), StorageEngineType::Sled);
        let rows = db
            .find_appointments(AppointmentFilter::default(), AppointmentOrder::Schedule, None)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].doctor.specialty.name, "Echo");
        assert!(db.find_patient("0700").await.unwrap().is_some());
    }
}
