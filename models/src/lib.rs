// models/src/lib.rs
//! Shared domain types for the clinic backend: entities, joined read models,
//! the error taxonomy and input validation helpers.

pub mod errors;
pub mod identifiers;
pub mod medical;
pub mod validation;

pub use errors::{ClinicError, ClinicResult};
pub use identifiers::new_id;
pub use medical::*;
