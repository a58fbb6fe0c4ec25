// lib/src/services/mod.rs
//! Use-case layer. Every operation takes the store as `&dyn ClinicStore` and
//! the caller's identity where scoping applies; HTTP concerns stay out.

pub mod access_scope;
pub mod appointments;
pub mod auth;
pub mod departments;
pub mod doctors;
pub mod listing;
pub mod receptionists;
pub mod users;

pub use access_scope::AccessScope;
pub use listing::{AppointmentQuery, DirectoryQuery, ListingParams, Page, PageMeta, Paging};
