// lib/src/clinic_store.rs

use async_trait::async_trait;
use chrono::NaiveDate;

use models::{
    AppointmentRecord, ClinicResult, Department, DepartmentRecord, Doctor, DoctorRecord, Patient,
    Receptionist, ReceptionistRecord, Specialty, User,
};

/// Row window for paginated reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub skip: usize,
    pub take: usize,
}

impl PageRequest {
    /// `page` is 1-based.
    pub fn new(page: u32, page_size: u32) -> Self {
        PageRequest {
            skip: (page.saturating_sub(1) as usize) * page_size as usize,
            take: page_size as usize,
        }
    }
}

/// Predicate over appointments. Every populated field narrows the result;
/// `search` is a case-insensitive substring match across patient name,
/// patient phone, status, department name and doctor name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppointmentFilter {
    pub doctor_id: Option<String>,
    pub department_ids: Option<Vec<String>>,
    pub search: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub status_is: Option<String>,
    pub status_not: Option<String>,
    pub patient_phone: Option<String>,
}

impl AppointmentFilter {
    pub fn on_date(date: NaiveDate) -> Self {
        AppointmentFilter { date_from: Some(date), date_to: Some(date), ..Default::default() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentOrder {
    /// appointmentDate, appointmentTime, createdAt, id ascending.
    Schedule,
    /// doctorId, appointmentTime, createdAt, id ascending.
    Queue,
    /// appointmentDate, appointmentTime, createdAt descending.
    MostRecent,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DoctorFilter {
    pub doctor_id: Option<String>,
    pub department_ids: Option<Vec<String>>,
    pub search: Option<String>,
}

/// A validated booking, ready to be written. Status is decided by the store
/// inside the booking transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAppointment {
    pub patient_name: String,
    pub patient_phone: String,
    pub patient_age: u32,
    pub patient_gender: String,
    pub patient_notes: Option<String>,
    pub department_id: String,
    pub doctor_id: String,
    pub appointment_date: NaiveDate,
    pub appointment_time: String,
}

/// Data access used by the clinic services. Every write runs as one
/// all-or-nothing transaction; reads see committed state only.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClinicStore: Send + Sync {
    async fn find_user_by_id(&self, id: &str) -> ClinicResult<Option<User>>;
    async fn find_user_by_identifier(&self, identifier: &str) -> ClinicResult<Option<User>>;
    async fn create_user(&self, user: User) -> ClinicResult<User>;
    /// Creates the user, or refreshes name, email, hash and role of the user
    /// holding the same username.
    async fn upsert_user_by_username(&self, user: User) -> ClinicResult<User>;
    /// Newest first.
    async fn list_users(&self) -> ClinicResult<Vec<User>>;

    /// `None` lists every department; `Some(ids)` only those.
    async fn list_departments(&self, ids: Option<Vec<String>>) -> ClinicResult<Vec<DepartmentRecord>>;
    async fn find_department(&self, id: &str) -> ClinicResult<Option<Department>>;
    async fn create_department(&self, department: Department, specialties: Vec<Specialty>) -> ClinicResult<DepartmentRecord>;
    async fn delete_department(&self, id: &str) -> ClinicResult<()>;
    async fn list_specialties(&self, department_id: &str) -> ClinicResult<Vec<Specialty>>;
    async fn create_specialty(&self, specialty: Specialty) -> ClinicResult<Specialty>;
    async fn find_specialty_by_name(&self, department_id: &str, name: &str) -> ClinicResult<Option<Specialty>>;

    async fn create_doctor(&self, doctor: Doctor, user: Option<User>) -> ClinicResult<DoctorRecord>;
    async fn find_doctor(&self, id: &str) -> ClinicResult<Option<DoctorRecord>>;
    async fn list_doctors(&self, filter: DoctorFilter, page: PageRequest) -> ClinicResult<Vec<DoctorRecord>>;
    async fn count_doctors(&self, filter: DoctorFilter) -> ClinicResult<u64>;

    async fn create_receptionist(&self, receptionist: Receptionist, user: User) -> ClinicResult<ReceptionistRecord>;
    async fn list_receptionists(&self, search: Option<String>, page: PageRequest) -> ClinicResult<Vec<ReceptionistRecord>>;
    async fn count_receptionists(&self, search: Option<String>) -> ClinicResult<u64>;
    /// Departments assigned to the receptionist linked to `user_id`; empty
    /// when the user has no receptionist record.
    async fn receptionist_department_ids(&self, user_id: &str) -> ClinicResult<Vec<String>>;

    async fn find_patient(&self, phone_number: &str) -> ClinicResult<Option<Patient>>;
    async fn book_appointment(&self, booking: NewAppointment) -> ClinicResult<AppointmentRecord>;
    async fn find_appointment(&self, id: &str) -> ClinicResult<Option<AppointmentRecord>>;
    async fn find_appointments(
        &self,
        filter: AppointmentFilter,
        order: AppointmentOrder,
        page: Option<PageRequest>,
    ) -> ClinicResult<Vec<AppointmentRecord>>;
    async fn count_appointments(&self, filter: AppointmentFilter) -> ClinicResult<u64>;
    /// One page of matches plus the unpaged total, read from a single snapshot.
    async fn page_appointments(
        &self,
        filter: AppointmentFilter,
        order: AppointmentOrder,
        page: PageRequest,
    ) -> ClinicResult<(Vec<AppointmentRecord>, u64)>;
    async fn update_appointment_status(&self, id: &str, status: String) -> ClinicResult<AppointmentRecord>;
}

#[cfg(test)]
mod tests {
    use super::PageRequest;

    #[test]
    fn should_compute_skip_from_one_based_page() {
        assert_eq!(PageRequest::new(1, 20), PageRequest { skip: 0, take: 20 });
        assert_eq!(PageRequest::new(3, 10), PageRequest { skip: 20, take: 10 });
    }
}
