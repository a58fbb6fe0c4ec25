// lib/src/services/users.rs

use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use models::identifiers::non_blank;
use models::validation::required;
use models::{new_id, ClinicError, ClinicResult, Role, User, UserProfile};
use security::{hash_password, AuthUser};

use crate::clinic_store::ClinicStore;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserInput {
    pub username: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

pub async fn me(store: &dyn ClinicStore, actor: &AuthUser) -> ClinicResult<UserProfile> {
    store
        .find_user_by_id(&actor.id)
        .await?
        .map(|user| user.profile())
        .ok_or_else(|| ClinicError::NotFound("User not found".to_string()))
}

pub async fn create_user(store: &dyn ClinicStore, input: UserInput) -> ClinicResult<UserProfile> {
    let name = required("name", input.name.as_deref())?;
    let password = required("password", input.password.as_deref())?;
    let role: Role = required("role", input.role.as_deref())?.parse()?;

    let username = non_blank(input.username.as_deref());
    let email = non_blank(input.email.as_deref());
    let phone = non_blank(input.phone.as_deref());
    if username.is_none() && email.is_none() && phone.is_none() {
        return Err(ClinicError::validation("one of username, email or phone is required"));
    }

    let user = User {
        id: new_id(),
        username,
        email,
        phone,
        name,
        password_hash: hash_password(&password)?,
        role,
        created_at: Utc::now(),
    };
    let user = store.create_user(user).await?;
    info!("Created {} user {}", user.role, user.id);
    Ok(user.profile())
}

pub async fn list_users(store: &dyn ClinicStore) -> ClinicResult<Vec<UserProfile>> {
    Ok(store.list_users().await?.iter().map(User::profile).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clinic_store::MockClinicStore;
    use crate::database::Database;

    fn input() -> UserInput {
        UserInput {
            username: Some("desk".into()),
            name: Some("Front Desk".into()),
            password: Some("secret".into()),
            role: Some("receptionist".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn created_users_are_returned_without_hash() {
        let db = Database::in_memory();
        let profile = create_user(&db, input()).await.unwrap();
        assert_eq!(profile.role, Role::Receptionist);

        let stored = db.find_user_by_id(&profile.id).await.unwrap().unwrap();
        assert!(security::verify_password("secret", &stored.password_hash).unwrap());

        let me = me(&db, &AuthUser::new(profile.id.clone(), Role::Receptionist)).await.unwrap();
        assert_eq!(me, profile);
        assert_eq!(list_users(&db).await.unwrap(), vec![profile]);
    }

    #[tokio::test]
    async fn rejects_bad_roles_missing_identifiers_and_duplicates() {
        let db = Database::in_memory();
        let bad_role = UserInput { role: Some("NURSE".into()), ..input() };
        assert!(matches!(create_user(&db, bad_role).await, Err(ClinicError::Validation(_))));

        let anonymous = UserInput { username: None, ..input() };
        assert!(matches!(create_user(&db, anonymous).await, Err(ClinicError::Validation(_))));

        create_user(&db, input()).await.unwrap();
        assert!(matches!(create_user(&db, input()).await, Err(ClinicError::Conflict(_))));
    }

    #[tokio::test]
    async fn me_is_not_found_for_vanished_users() {
        let mut store = MockClinicStore::new();
        store.expect_find_user_by_id().returning(|_| Ok(None));
        let err = me(&store, &AuthUser::new("gone", Role::Admin)).await.unwrap_err();
        assert!(matches!(err, ClinicError::NotFound(m) if m == "User not found"));
    }
}
