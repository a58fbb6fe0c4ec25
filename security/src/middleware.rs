// security/src/middleware.rs
use tracing::debug;

use crate::{AuthError, AuthUser, TokenIssuer};

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    header
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::MissingToken)
}

/// Resolves the caller from an `Authorization` header value.
pub fn authenticate_bearer(issuer: &TokenIssuer, header: Option<&str>) -> Result<AuthUser, AuthError> {
    let token = bearer_token(header)?;
    let user = issuer.verify(token).map_err(|e| {
        debug!("Rejected bearer token: {:?}", e);
        e
    })?;
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::Role;

    #[test]
    fn missing_or_malformed_headers_yield_missing_token() {
        assert_eq!(bearer_token(None), Err(AuthError::MissingToken));
        assert_eq!(bearer_token(Some("Basic abc")), Err(AuthError::MissingToken));
        assert_eq!(bearer_token(Some("Bearer ")), Err(AuthError::MissingToken));
        assert_eq!(bearer_token(Some("Bearer abc.def")), Ok("abc.def"));
    }

    #[test]
    fn valid_header_authenticates() {
        let issuer = TokenIssuer::new("secret");
        let token = issuer.sign("u-9", Role::Admin, "admin").unwrap();
        let header = format!("Bearer {token}");
        let user = authenticate_bearer(&issuer, Some(&header)).unwrap();
        assert_eq!(user.id, "u-9");
        assert_eq!(user.role, Role::Admin);
    }

    #[test]
    fn garbage_token_is_invalid_not_missing() {
        let issuer = TokenIssuer::new("secret");
        assert!(matches!(
            authenticate_bearer(&issuer, Some("Bearer garbage")),
            Err(AuthError::InvalidToken(_))
        ));
    }
}
