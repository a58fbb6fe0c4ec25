// models/src/medical/mod.rs
pub mod appointment;
pub mod department;
pub mod doctor;
pub mod patient;
pub mod receptionist;
pub mod role;
pub mod user;

pub use appointment::{
    Appointment, AppointmentRecord, STATUS_COMPLETE, STATUS_FOLLOW_UP, STATUS_NEW,
};
pub use department::{Department, DepartmentRecord, Specialty};
pub use doctor::{Doctor, DoctorRecord, ScheduleSlot, Weekday};
pub use patient::Patient;
pub use receptionist::{Receptionist, ReceptionistRecord};
pub use role::Role;
pub use user::{User, UserProfile};
