//! Authentication user types.

use crate::db::Role;
use crate::jwt::AccessClaims;

/// Identity and roles taken from a verified access token.
/// Lives only as long as the request that carried the token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub username: String,
    pub roles: Vec<Role>,
}

impl AuthenticatedUser {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

impl From<AccessClaims> for AuthenticatedUser {
    fn from(claims: AccessClaims) -> Self {
        Self {
            username: claims.user_info.username,
            roles: claims.user_info.roles,
        }
    }
}
