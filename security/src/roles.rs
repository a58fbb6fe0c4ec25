// security/src/roles.rs
use models::Role;

use crate::{AuthError, AuthUser};

/// Every role; used by routes open to any authenticated caller.
pub const ANY_ROLE: &[Role] = &[Role::Admin, Role::Receptionist, Role::Doctor];
pub const ADMIN_ONLY: &[Role] = &[Role::Admin];
pub const FRONT_DESK: &[Role] = &[Role::Admin, Role::Receptionist];

/// Fails with `Forbidden` unless the caller holds one of `allowed`.
pub fn require_role(user: &AuthUser, allowed: &[Role]) -> Result<(), AuthError> {
    if allowed.contains(&user.role) {
        Ok(())
    } else {
        Err(AuthError::Forbidden(format!("role {} may not perform this action", user.role)))
    }
}
