//! Authentication error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Why a protected request was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    /// No `Authorization: Bearer` header
    MissingCredentials,
    /// Bad signature, expired or wrong token type
    InvalidToken,
    /// Token is valid but the roles do not satisfy the route
    InsufficientRole,
}

/// API authentication error, rendered as the same JSON shape as `ApiError`.
#[derive(Debug)]
pub struct ApiAuthError {
    pub(super) kind: AuthErrorKind,
}

impl ApiAuthError {
    pub(super) fn new(kind: AuthErrorKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> AuthErrorKind {
        self.kind
    }

    fn status_code(&self) -> StatusCode {
        match self.kind {
            AuthErrorKind::MissingCredentials => StatusCode::UNAUTHORIZED,
            AuthErrorKind::InvalidToken | AuthErrorKind::InsufficientRole => StatusCode::FORBIDDEN,
        }
    }

    fn message(&self) -> &'static str {
        match self.kind {
            AuthErrorKind::MissingCredentials => "Unauthorized",
            AuthErrorKind::InvalidToken => "Invalid or expired token",
            AuthErrorKind::InsufficientRole => "Insufficient permissions",
        }
    }

    fn kind_str(&self) -> &'static str {
        match self.kind {
            AuthErrorKind::MissingCredentials => "unauthorized",
            AuthErrorKind::InvalidToken | AuthErrorKind::InsufficientRole => "forbidden",
        }
    }
}

impl IntoResponse for ApiAuthError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            message: &'static str,
            kind: &'static str,
        }

        (
            self.status_code(),
            Json(ErrorResponse {
                message: self.message(),
                kind: self.kind_str(),
            }),
        )
            .into_response()
    }
}
