//! Axum extractors for authentication.

use std::marker::PhantomData;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use super::errors::{ApiAuthError, AuthErrorKind};
use super::state::HasAuthBackend;
use super::types::AuthenticatedUser;
use crate::db::Role;

/// Role requirement checked by [`Auth`] after the token is verified.
pub trait RoleConstraint {
    fn allows(roles: &[Role]) -> bool;
}

/// Any authenticated account.
pub struct AnyRole;

impl RoleConstraint for AnyRole {
    fn allows(_roles: &[Role]) -> bool {
        true
    }
}

/// Accounts holding `Manager` or `Admin`.
pub struct ManagerOrAdmin;

impl RoleConstraint for ManagerOrAdmin {
    fn allows(roles: &[Role]) -> bool {
        roles.contains(&Role::Manager) || roles.contains(&Role::Admin)
    }
}

/// Accounts holding `Admin`.
pub struct AdminOnly;

impl RoleConstraint for AdminOnly {
    fn allows(roles: &[Role]) -> bool {
        roles.contains(&Role::Admin)
    }
}

/// Extractor for endpoints that require a bearer access token.
///
/// Verification is stateless: signature, expiry and token type are checked
/// against the access secret and nothing else is consulted.
pub struct Auth<R: RoleConstraint = AnyRole> {
    pub user: AuthenticatedUser,
    _role: PhantomData<fn() -> R>,
}

/// Token from an `Authorization: Bearer <token>` header.
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

/// Verify the request's bearer token and return the identity it carries.
fn authenticate_request<S>(parts: &Parts, state: &S) -> Result<AuthenticatedUser, AuthErrorKind>
where
    S: HasAuthBackend,
{
    let token = bearer_token(parts).ok_or(AuthErrorKind::MissingCredentials)?;

    let claims = state.jwt().validate_access_token(token).map_err(|e| {
        tracing::debug!(error = %e, "Rejected access token");
        AuthErrorKind::InvalidToken
    })?;

    Ok(AuthenticatedUser::from(claims))
}

impl<S, R> FromRequestParts<S> for Auth<R>
where
    S: HasAuthBackend + Send + Sync,
    R: RoleConstraint,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = authenticate_request(parts, state).map_err(ApiAuthError::new)?;

        if !R::allows(&user.roles) {
            tracing::debug!(username = %user.username, "Role constraint not met");
            return Err(ApiAuthError::new(AuthErrorKind::InsufficientRole));
        }

        Ok(Auth {
            user,
            _role: PhantomData,
        })
    }
}
