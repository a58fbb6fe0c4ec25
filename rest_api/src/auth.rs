// rest_api/src/auth.rs

use std::marker::PhantomData;

use axum::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use models::Role;
use security::roles::{ADMIN_ONLY, ANY_ROLE, FRONT_DESK};
use security::{authenticate_bearer, require_role, AuthUser};

use crate::error::RestApiError;
use crate::AppState;

/// The authenticated caller, with no role check. Extraction fails with 401.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub AuthUser);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = RestApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app = AppState::from_ref(state);
        let header = parts.headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok());
        let user = authenticate_bearer(&app.tokens, header)?;
        Ok(CurrentUser(user))
    }
}

/// Roles a route admits, fixed at the type level.
pub trait RoleSet: Send + Sync + 'static {
    const ROLES: &'static [Role];
}

#[derive(Debug, Clone, Copy)]
pub struct AnyRole;

#[derive(Debug, Clone, Copy)]
pub struct AdminOnly;

#[derive(Debug, Clone, Copy)]
pub struct FrontDesk;

impl RoleSet for AnyRole {
    const ROLES: &'static [Role] = ANY_ROLE;
}

impl RoleSet for AdminOnly {
    const ROLES: &'static [Role] = ADMIN_ONLY;
}

impl RoleSet for FrontDesk {
    const ROLES: &'static [Role] = FRONT_DESK;
}

/// An authenticated caller holding one of `R::ROLES`. This is a parts
/// extractor, so it must precede any body extractor in a handler: a caller
/// with the wrong role gets 403 before the body is read.
#[derive(Debug, Clone)]
pub struct Authorized<R: RoleSet>(pub AuthUser, pub PhantomData<R>);

#[async_trait]
impl<S, R> FromRequestParts<S> for Authorized<R>
where
    AppState: FromRef<S>,
    S: Send + Sync,
    R: RoleSet,
{
    type Rejection = RestApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        require_role(&user, R::ROLES)?;
        Ok(Authorized(user, PhantomData))
    }
}
