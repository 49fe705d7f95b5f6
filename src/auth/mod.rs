//! JWT authentication with role-based access control.
//!
//! Short-lived access tokens travel as bearer tokens and are verified
//! statelessly. Refresh tokens travel in the `jwt` cookie and are only
//! accepted by the refresh endpoint. Neither is stored server-side.

mod cookie;
mod errors;
mod extractors;
mod ip;
mod state;
mod types;

pub use cookie::{REFRESH_COOKIE_NAME, clear_refresh_cookie, get_cookie, refresh_cookie};
pub use errors::{ApiAuthError, AuthErrorKind};
pub use extractors::{AdminOnly, AnyRole, Auth, ManagerOrAdmin, RoleConstraint};
pub use ip::extract_client_ip;
pub use state::HasAuthBackend;
pub use types::AuthenticatedUser;
