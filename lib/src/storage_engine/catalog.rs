// lib/src/storage_engine/catalog.rs

use std::collections::BTreeMap;

use serde::Serialize;

use models::{
    Appointment, ClinicError, ClinicResult, Department, Doctor, Patient, Receptionist, Specialty, User,
};

/// The tables the store keeps. Each maps to one sled tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    Users,
    Departments,
    Specialties,
    Doctors,
    Receptionists,
    Patients,
    Appointments,
}

impl Table {
    pub const ALL: [Table; 7] = [
        Table::Users,
        Table::Departments,
        Table::Specialties,
        Table::Doctors,
        Table::Receptionists,
        Table::Patients,
        Table::Appointments,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Table::Users => "users",
            Table::Departments => "departments",
            Table::Specialties => "specialties",
            Table::Doctors => "doctors",
            Table::Receptionists => "receptionists",
            Table::Patients => "patients",
            Table::Appointments => "appointments",
        }
    }

    /// Position in [`Table::ALL`].
    pub fn index(&self) -> usize {
        *self as usize
    }
}

/// A single row write.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    PutUser(User),
    PutDepartment(Department),
    DeleteDepartment(String),
    PutSpecialty(Specialty),
    DeleteSpecialty(String),
    PutDoctor(Doctor),
    PutReceptionist(Receptionist),
    PutPatient(Patient),
    PutAppointment(Appointment),
}

impl Mutation {
    pub fn table(&self) -> Table {
        match self {
            Mutation::PutUser(_) => Table::Users,
            Mutation::PutDepartment(_) | Mutation::DeleteDepartment(_) => Table::Departments,
            Mutation::PutSpecialty(_) | Mutation::DeleteSpecialty(_) => Table::Specialties,
            Mutation::PutDoctor(_) => Table::Doctors,
            Mutation::PutReceptionist(_) => Table::Receptionists,
            Mutation::PutPatient(_) => Table::Patients,
            Mutation::PutAppointment(_) => Table::Appointments,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Mutation::PutUser(u) => &u.id,
            Mutation::PutDepartment(d) => &d.id,
            Mutation::DeleteDepartment(id) | Mutation::DeleteSpecialty(id) => id,
            Mutation::PutSpecialty(s) => &s.id,
            Mutation::PutDoctor(d) => &d.id,
            Mutation::PutReceptionist(r) => &r.id,
            Mutation::PutPatient(p) => &p.phone_number,
            Mutation::PutAppointment(a) => &a.id,
        }
    }

    /// Serialized row for puts, `None` for deletes.
    pub fn encode(&self) -> ClinicResult<Option<Vec<u8>>> {
        fn json<T: Serialize>(value: &T) -> ClinicResult<Option<Vec<u8>>> {
            Ok(Some(serde_json::to_vec(value)?))
        }
        match self {
            Mutation::PutUser(v) => json(v),
            Mutation::PutDepartment(v) => json(v),
            Mutation::PutSpecialty(v) => json(v),
            Mutation::PutDoctor(v) => json(v),
            Mutation::PutReceptionist(v) => json(v),
            Mutation::PutPatient(v) => json(v),
            Mutation::PutAppointment(v) => json(v),
            Mutation::DeleteDepartment(_) | Mutation::DeleteSpecialty(_) => Ok(None),
        }
    }
}

/// The ordered writes of one transaction. Engines commit a change set
/// atomically; the catalog applies it only after the commit succeeded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    mutations: Vec<Mutation>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, mutation: Mutation) -> &mut Self {
        self.mutations.push(mutation);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Mutation> {
        self.mutations.iter()
    }
}

impl From<Vec<Mutation>> for ChangeSet {
    fn from(mutations: Vec<Mutation>) -> Self {
        ChangeSet { mutations }
    }
}

/// Committed state of every table, keyed by primary key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    pub users: BTreeMap<String, User>,
    pub departments: BTreeMap<String, Department>,
    pub specialties: BTreeMap<String, Specialty>,
    pub doctors: BTreeMap<String, Doctor>,
    pub receptionists: BTreeMap<String, Receptionist>,
    pub patients: BTreeMap<String, Patient>,
    pub appointments: BTreeMap<String, Appointment>,
}

impl Catalog {
    pub fn apply(&mut self, mutation: Mutation) {
        match mutation {
            Mutation::PutUser(v) => { self.users.insert(v.id.clone(), v); }
            Mutation::PutDepartment(v) => { self.departments.insert(v.id.clone(), v); }
            Mutation::DeleteDepartment(id) => { self.departments.remove(&id); }
            Mutation::PutSpecialty(v) => { self.specialties.insert(v.id.clone(), v); }
            Mutation::DeleteSpecialty(id) => { self.specialties.remove(&id); }
            Mutation::PutDoctor(v) => { self.doctors.insert(v.id.clone(), v); }
            Mutation::PutReceptionist(v) => { self.receptionists.insert(v.id.clone(), v); }
            Mutation::PutPatient(v) => { self.patients.insert(v.phone_number.clone(), v); }
            Mutation::PutAppointment(v) => { self.appointments.insert(v.id.clone(), v); }
        }
    }

    pub fn apply_all(&mut self, changes: ChangeSet) {
        for mutation in changes.mutations {
            self.apply(mutation);
        }
    }

    pub fn user_by_identifier(&self, identifier: &str) -> Option<&User> {
        self.users.values().find(|u| u.matches_identifier(identifier))
    }

    pub fn user_by_username(&self, username: &str) -> Option<&User> {
        self.users.values().find(|u| u.username.as_deref() == Some(username))
    }

    /// Fails with `Conflict` when another user already holds any of the
    /// candidate's identifiers. `except` skips the row being updated.
    pub fn ensure_identifiers_free(&self, candidate: &User, except: Option<&str>) -> ClinicResult<()> {
        fn clash(a: &Option<String>, b: &Option<String>) -> bool {
            matches!((a, b), (Some(x), Some(y)) if x == y)
        }
        for user in self.users.values().filter(|u| Some(u.id.as_str()) != except) {
            let field = if clash(&user.username, &candidate.username) {
                "username"
            } else if clash(&user.email, &candidate.email) {
                "email"
            } else if clash(&user.phone, &candidate.phone) {
                "phone"
            } else {
                continue;
            };
            return Err(ClinicError::Conflict(format!("A user with this {} already exists", field)));
        }
        Ok(())
    }

    pub fn department_by_name(&self, name: &str) -> Option<&Department> {
        self.departments.values().find(|d| d.name == name)
    }

    pub fn specialties_of(&self, department_id: &str) -> Vec<Specialty> {
        let mut specialties: Vec<Specialty> = self
            .specialties
            .values()
            .filter(|s| s.department_id == department_id)
            .cloned()
            .collect();
        specialties.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        specialties
    }

    pub fn receptionist_by_user(&self, user_id: &str) -> Option<&Receptionist> {
        self.receptionists.values().find(|r| r.user_id == user_id)
    }
}
