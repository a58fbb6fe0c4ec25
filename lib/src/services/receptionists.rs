// lib/src/services/receptionists.rs

use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use models::identifiers::non_blank;
use models::{new_id, ClinicError, ClinicResult, Receptionist, ReceptionistRecord, Role, User};
use security::hash_password;

use crate::clinic_store::ClinicStore;
use crate::services::listing::{DirectoryQuery, Page};
use crate::uploads::{store_optional_image, ImageStore, ImageUpload};

const REQUIRED_FIELDS: &str = "name, department_ids, contact_number, shift, username, and password are required";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReceptionistInput {
    pub name: Option<String>,
    /// A JSON array, a JSON array encoded as a string, or a comma separated list.
    #[serde(alias = "departmentIds")]
    pub department_ids: Option<Value>,
    #[serde(alias = "contactNumber")]
    pub contact_number: Option<String>,
    pub shift: Option<String>,
    pub description: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Normalizes the accepted department id shapes into trimmed, non-blank ids.
/// Duplicates are kept so the store can reject them.
pub fn parse_department_ids(raw: Option<&Value>) -> ClinicResult<Vec<String>> {
    let items: Vec<Value> = match raw {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(Value::String(s)) if s.trim_start().starts_with('[') => serde_json::from_str(s)
            .map_err(|_| ClinicError::validation("department_ids must be a JSON array of ids"))?,
        Some(Value::String(s)) => s.split(',').map(|id| Value::String(id.to_string())).collect(),
        Some(_) => return Err(ClinicError::validation("department_ids must be an array of ids")),
    };
    items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(id) => non_blank(Some(id.as_str())).map(Ok),
            Value::Null => None,
            _ => Some(Err(ClinicError::validation("department_ids must contain only strings"))),
        })
        .collect()
}

pub async fn create_receptionist(
    store: &dyn ClinicStore,
    images: Option<&dyn ImageStore>,
    input: ReceptionistInput,
    image: Option<ImageUpload>,
) -> ClinicResult<ReceptionistRecord> {
    let department_ids = parse_department_ids(input.department_ids.as_ref())?;
    let fields = (
        non_blank(input.name.as_deref()),
        non_blank(input.contact_number.as_deref()),
        non_blank(input.shift.as_deref()),
        non_blank(input.username.as_deref()),
        non_blank(input.password.as_deref()),
    );
    let (Some(name), Some(contact_number), Some(shift), Some(username), Some(password)) = fields else {
        return Err(ClinicError::validation(REQUIRED_FIELDS));
    };
    if department_ids.is_empty() {
        return Err(ClinicError::validation(REQUIRED_FIELDS));
    }
    // checked again inside the write, but before any image leaves the process
    for (index, id) in department_ids.iter().enumerate() {
        if department_ids[..index].contains(id) {
            return Err(ClinicError::validation("department_ids must not contain duplicates"));
        }
        if store.find_department(id).await?.is_none() {
            return Err(ClinicError::Validation(format!("Department not found: {}", id)));
        }
    }

    let profile_image_url = store_optional_image(images, image).await?;
    let now = Utc::now();
    let user = User {
        id: new_id(),
        username: Some(username),
        email: None,
        phone: None,
        name: name.clone(),
        password_hash: hash_password(&password)?,
        role: Role::Receptionist,
        created_at: now,
    };
    let receptionist = Receptionist {
        id: new_id(),
        name,
        contact_number,
        shift,
        description: non_blank(input.description.as_deref()),
        profile_image_url,
        user_id: user.id.clone(),
        department_ids,
        created_at: now,
    };

    let record = store.create_receptionist(receptionist, user).await?;
    info!(
        "Created receptionist {} for {} department(s)",
        record.receptionist.id,
        record.departments.len()
    );
    Ok(record)
}

pub async fn list_receptionists(store: &dyn ClinicStore, query: DirectoryQuery) -> ClinicResult<Page<ReceptionistRecord>> {
    let data = store.list_receptionists(query.search.clone(), query.paging.request()).await?;
    let total = store.count_receptionists(query.search).await?;
    Ok(Page::new(data, query.paging, total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::seeded_database;
    use crate::uploads::MockImageStore;
    use serde_json::json;

    fn input(department_ids: Value) -> ReceptionistInput {
        ReceptionistInput {
            name: Some("Dana".into()),
            department_ids: Some(department_ids),
            contact_number: Some("0700".into()),
            shift: Some("morning".into()),
            description: None,
            username: Some("dana".into()),
            password: Some("secret".into()),
        }
    }

    #[test]
    fn department_ids_accept_every_client_shape() {
        let expected = vec!["d1".to_string(), "d2".to_string()];
        assert_eq!(parse_department_ids(Some(&json!(["d1", " d2 "]))).unwrap(), expected);
        assert_eq!(parse_department_ids(Some(&json!("[\"d1\",\"d2\"]"))).unwrap(), expected);
        assert_eq!(parse_department_ids(Some(&json!("d1, d2,"))).unwrap(), expected);
        assert!(parse_department_ids(None).unwrap().is_empty());
        assert!(parse_department_ids(Some(&json!([1]))).is_err());
    }

    #[tokio::test]
    async fn creates_receptionist_with_login_and_departments() {
        let db = seeded_database().await;
        let record = create_receptionist(&db, None, input(json!(["d2", "d1"])), None).await.unwrap();

        assert_eq!(record.departments.len(), 2);
        assert_eq!(record.user.as_ref().map(|u| u.role), Some(Role::Receptionist));
        let ids = db.receptionist_department_ids(&record.receptionist.user_id).await.unwrap();
        assert_eq!(ids.len(), 2);
    }

    #[tokio::test]
    async fn rejects_missing_fields_unknown_and_duplicate_departments() {
        let db = seeded_database().await;

        let err = create_receptionist(&db, None, input(json!([])), None).await.unwrap_err();
        assert!(matches!(err, ClinicError::Validation(m) if m == REQUIRED_FIELDS));

        let err = create_receptionist(&db, None, input(json!(["d9"])), None).await.unwrap_err();
        assert!(matches!(err, ClinicError::Validation(m) if m.contains("d9")));

        let err = create_receptionist(&db, None, input(json!(["d1", "d1"])), None).await.unwrap_err();
        assert!(matches!(err, ClinicError::Validation(m) if m.contains("duplicates")));

        let catalog = db.snapshot().await;
        assert!(catalog.receptionists.is_empty());
        assert!(catalog.users.is_empty());
    }

    #[tokio::test]
    async fn bad_departments_are_rejected_before_any_upload() {
        let db = seeded_database().await;
        let mut images = MockImageStore::new();
        images.expect_upload().times(0);
        let image = || ImageUpload { bytes: vec![1], filename: "dana.png".into(), content_type: "image/png".into() };

        let err = create_receptionist(&db, Some(&images), input(json!(["d1", "d9"])), Some(image()))
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::Validation(m) if m == "Department not found: d9"));

        let err = create_receptionist(&db, Some(&images), input(json!(["d2", "d2"])), Some(image()))
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::Validation(m) if m.contains("duplicates")));
    }

    #[tokio::test]
    async fn duplicate_usernames_conflict() {
        let db = seeded_database().await;
        create_receptionist(&db, None, input(json!(["d1"])), None).await.unwrap();
        let err = create_receptionist(&db, None, input(json!(["d2"])), None).await.unwrap_err();
        assert!(matches!(err, ClinicError::Conflict(_)));
    }

    #[tokio::test]
    async fn listing_searches_department_names() {
        let db = seeded_database().await;
        create_receptionist(&db, None, input(json!(["d2"])), None).await.unwrap();
        let query = DirectoryQuery { search: Some("neuro".into()), ..Default::default() };
        let page = list_receptionists(&db, query).await.unwrap();
        assert_eq!(page.meta.total, 1);
        assert_eq!(page.data[0].receptionist.name, "Dana");

        let query = DirectoryQuery { search: Some("cardio".into()), ..Default::default() };
        assert!(list_receptionists(&db, query).await.unwrap().data.is_empty());
    }
}
