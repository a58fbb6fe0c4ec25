// lib/src/services/departments.rs

use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use models::identifiers::non_blank;
use models::validation::required;
use models::{new_id, ClinicError, ClinicResult, Department, DepartmentRecord, Specialty};
use security::AuthUser;

use crate::clinic_store::ClinicStore;
use crate::services::access_scope::AccessScope;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DepartmentInput {
    pub name: Option<String>,
    #[serde(default)]
    pub specialties: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpecialtyInput {
    pub name: Option<String>,
}

/// Departments visible to the actor, ordered by name.
pub async fn list_departments(store: &dyn ClinicStore, actor: &AuthUser) -> ClinicResult<Vec<DepartmentRecord>> {
    let scope = AccessScope::resolve(store, actor).await?;
    if scope.is_empty() {
        return Ok(Vec::new());
    }
    let ids = match scope {
        AccessScope::Unrestricted => None,
        AccessScope::Departments(ids) => Some(ids),
        AccessScope::Doctor { doctor_id } => match store.find_doctor(&doctor_id).await? {
            Some(record) => Some(vec![record.department.id]),
            None => return Ok(Vec::new()),
        },
    };
    store.list_departments(ids).await
}

pub async fn create_department(store: &dyn ClinicStore, input: DepartmentInput) -> ClinicResult<DepartmentRecord> {
    let name = required("name", input.name.as_deref())?;
    let department = Department { id: new_id(), name, created_at: Utc::now() };

    let mut names: Vec<String> = Vec::new();
    for raw in &input.specialties {
        if let Some(specialty) = non_blank(Some(raw.as_str())) {
            if !names.iter().any(|n| n.eq_ignore_ascii_case(&specialty)) {
                names.push(specialty);
            }
        }
    }
    let specialties = names
        .into_iter()
        .map(|name| Specialty { id: new_id(), name, department_id: department.id.clone() })
        .collect();

    let record = store.create_department(department, specialties).await?;
    info!("Created department {} with {} specialties", record.department.name, record.specialties.len());
    Ok(record)
}

pub async fn delete_department(store: &dyn ClinicStore, department_id: &str) -> ClinicResult<()> {
    store.delete_department(department_id).await?;
    info!("Deleted department {}", department_id);
    Ok(())
}

pub async fn list_specialties(store: &dyn ClinicStore, department_id: &str) -> ClinicResult<Vec<Specialty>> {
    if store.find_department(department_id).await?.is_none() {
        return Err(ClinicError::NotFound("Department not found".to_string()));
    }
    store.list_specialties(department_id).await
}

pub async fn create_specialty(store: &dyn ClinicStore, department_id: &str, input: SpecialtyInput) -> ClinicResult<Specialty> {
    let name = required("name", input.name.as_deref())?;
    store
        .create_specialty(Specialty { id: new_id(), name, department_id: department_id.to_string() })
        .await
}
