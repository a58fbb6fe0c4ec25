// lib/src/services/access_scope.rs

use tracing::debug;

use models::{Appointment, ClinicResult, Role};
use security::AuthUser;

use crate::clinic_store::{AppointmentFilter, ClinicStore, DoctorFilter};

/// What an actor may see. Resolved from the store on every request and
/// never cached, since department assignments change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessScope {
    Unrestricted,
    /// Only appointments of this doctor. The id doubles as the user id.
    Doctor { doctor_id: String },
    /// Only these departments. May be empty, in which case nothing is visible.
    Departments(Vec<String>),
}

impl AccessScope {
    pub async fn resolve(store: &dyn ClinicStore, actor: &AuthUser) -> ClinicResult<Self> {
        let scope = match actor.role {
            Role::Admin => AccessScope::Unrestricted,
            Role::Doctor => AccessScope::Doctor { doctor_id: actor.id.clone() },
            Role::Receptionist => AccessScope::Departments(store.receptionist_department_ids(&actor.id).await?),
        };
        debug!("Resolved access scope for {} {}: {:?}", actor.role, actor.id, scope);
        Ok(scope)
    }

    /// True when the scope admits no rows at all.
    pub fn is_empty(&self) -> bool {
        matches!(self, AccessScope::Departments(ids) if ids.is_empty())
    }

    /// Narrows a requested filter to this scope. `None` means the result is
    /// known to be empty and the store need not be asked.
    ///
    /// A doctor's own id replaces any requested doctor; a receptionist's
    /// requested departments are intersected with the assigned set.
    pub fn restrict(&self, mut filter: AppointmentFilter) -> Option<AppointmentFilter> {
        match self {
            AccessScope::Unrestricted => Some(filter),
            AccessScope::Doctor { doctor_id } => {
                filter.doctor_id = Some(doctor_id.clone());
                Some(filter)
            }
            AccessScope::Departments(allowed) => {
                let effective: Vec<String> = match filter.department_ids.take() {
                    Some(requested) => requested.into_iter().filter(|id| allowed.contains(id)).collect(),
                    None => allowed.clone(),
                };
                if effective.is_empty() {
                    return None;
                }
                filter.department_ids = Some(effective);
                Some(filter)
            }
        }
    }

    /// Same narrowing for doctor listings.
    pub fn restrict_doctors(&self, mut filter: DoctorFilter) -> Option<DoctorFilter> {
        if self.is_empty() {
            return None;
        }
        match self {
            AccessScope::Unrestricted => Some(filter),
            AccessScope::Doctor { doctor_id } => {
                filter.doctor_id = Some(doctor_id.clone());
                Some(filter)
            }
            AccessScope::Departments(allowed) => {
                filter.department_ids = Some(allowed.clone());
                Some(filter)
            }
        }
    }

    pub fn permits(&self, appointment: &Appointment) -> bool {
        match self {
            AccessScope::Unrestricted => true,
            AccessScope::Doctor { doctor_id } => appointment.doctor_id == *doctor_id,
            AccessScope::Departments(allowed) => allowed.contains(&appointment.department_id),
        }
    }
}
