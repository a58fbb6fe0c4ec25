// lib/src/services/auth.rs

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use models::validation::required;
use models::{new_id, ClinicError, ClinicResult, Role, User, UserProfile};
use security::{hash_password, verify_password, TokenIssuer};

use crate::clinic_store::ClinicStore;
use crate::config::AdminSeed;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginInput {
    #[serde(alias = "email", alias = "username", alias = "phone")]
    pub identifier: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserProfile,
}

fn invalid_credentials() -> ClinicError {
    ClinicError::Unauthenticated("Invalid credentials".to_string())
}

/// Exchanges any of a user's identifiers plus password for a signed token.
/// Unknown identifiers and wrong passwords fail identically.
pub async fn login(store: &dyn ClinicStore, tokens: &TokenIssuer, input: LoginInput) -> ClinicResult<LoginResponse> {
    let identifier = required("identifier", input.identifier.as_deref())?;
    let password = input
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ClinicError::validation("password is required"))?;

    let Some(user) = store.find_user_by_identifier(&identifier).await? else {
        warn!("Login attempt for unknown identifier");
        return Err(invalid_credentials());
    };
    if !verify_password(&password, &user.password_hash)? {
        warn!("Rejected password for user {}", user.id);
        return Err(invalid_credentials());
    }

    let token = tokens.issue(&user)?;
    info!("User {} logged in as {}", user.id, user.role);
    Ok(LoginResponse { token, user: user.profile() })
}

/// Creates the configured admin account, or refreshes its name, email,
/// password and role when the username already exists.
pub async fn seed_admin(store: &dyn ClinicStore, seed: &AdminSeed) -> ClinicResult<UserProfile> {
    let username = required("admin username", Some(seed.username.as_str()))?;
    if seed.password.is_empty() {
        return Err(ClinicError::Configuration("admin password must not be empty".to_string()));
    }
    let user = User {
        id: new_id(),
        username: Some(username),
        email: seed.email.clone(),
        phone: None,
        name: seed.name.clone(),
        password_hash: hash_password(&seed.password)?,
        role: Role::Admin,
        created_at: Utc::now(),
    };
    let user = store.upsert_user_by_username(user).await?;
    info!("Admin user {} seeded ({})", user.identifier(), user.id);
    Ok(user.profile())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clinic_store::MockClinicStore;
    use crate::database::Database;

    fn seed(password: &str) -> AdminSeed {
        AdminSeed {
            username: "admin".into(),
            email: Some("admin@clinic.local".into()),
            password: password.into(),
            name: "Administrator".into(),
        }
    }

    fn credentials(identifier: &str, password: &str) -> LoginInput {
        LoginInput { identifier: Some(identifier.into()), password: Some(password.into()) }
    }

    #[tokio::test]
    async fn seeded_admin_can_log_in_by_username_or_email() {
        let db = Database::in_memory();
        let tokens = TokenIssuer::new("test-secret");
        seed_admin(&db, &seed("pw")).await.unwrap();

        let by_name = login(&db, &tokens, credentials("admin", "pw")).await.unwrap();
        let by_email = login(&db, &tokens, credentials("admin@clinic.local", "pw")).await.unwrap();
        assert_eq!(by_name.user.id, by_email.user.id);
        assert_eq!(by_name.user.role, Role::Admin);

        let actor = tokens.verify(&by_name.token).unwrap();
        assert_eq!(actor.id, by_name.user.id);
        assert_eq!(actor.role, Role::Admin);
    }

    #[tokio::test]
    async fn reseeding_keeps_the_id_and_rotates_the_password() {
        let db = Database::in_memory();
        let tokens = TokenIssuer::new("test-secret");
        let first = seed_admin(&db, &seed("old")).await.unwrap();
        let second = seed_admin(&db, &seed("new")).await.unwrap();
        assert_eq!(first.id, second.id);

        assert!(login(&db, &tokens, credentials("admin", "new")).await.is_ok());
        let err = login(&db, &tokens, credentials("admin", "old")).await.unwrap_err();
        assert!(matches!(err, ClinicError::Unauthenticated(m) if m == "Invalid credentials"));
    }

    #[tokio::test]
    async fn unknown_identifiers_look_like_bad_passwords() {
        let mut store = MockClinicStore::new();
        store.expect_find_user_by_identifier().returning(|_| Ok(None));
        let tokens = TokenIssuer::new("test-secret");
        let err = login(&store, &tokens, credentials("ghost", "pw")).await.unwrap_err();
        assert!(matches!(err, ClinicError::Unauthenticated(m) if m == "Invalid credentials"));
    }

    #[test]
    fn login_accepts_identifier_aliases() {
        let input: LoginInput = serde_json::from_str(r#"{"email":"a@b.c","password":"x"}"#).unwrap();
        assert_eq!(input.identifier.as_deref(), Some("a@b.c"));
        let input: LoginInput = serde_json::from_str(r#"{"phone":"0700","password":"x"}"#).unwrap();
        assert_eq!(input.identifier.as_deref(), Some("0700"));
    }

    #[tokio::test]
    async fn missing_fields_are_validation_errors() {
        let db = Database::in_memory();
        let tokens = TokenIssuer::new("test-secret");
        let err = login(&db, &tokens, LoginInput::default()).await.unwrap_err();
        assert!(matches!(err, ClinicError::Validation(_)));
    }
}
