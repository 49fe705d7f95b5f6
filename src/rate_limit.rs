//! Rate limiting for the login endpoint.
//!
//! Uses a per-IP token bucket that admits at most `max_attempts` logins in
//! any window.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use std::{num::NonZeroU32, sync::Arc, time::Duration};
use tracing::warn;

use crate::api::ApiError;
use crate::auth::extract_client_ip;
use crate::cli::IpSource;

/// Per-IP rate limiter.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Default login attempts allowed per window.
pub const DEFAULT_LOGIN_ATTEMPTS: u32 = 5;

/// Default login rate limit window.
pub const DEFAULT_LOGIN_WINDOW: Duration = Duration::from_secs(60);

/// Login attempts allowed per client address within a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginLimit {
    pub max_attempts: NonZeroU32,
    pub window: Duration,
}

impl Default for LoginLimit {
    fn default() -> Self {
        Self {
            max_attempts: NonZeroU32::new(DEFAULT_LOGIN_ATTEMPTS).unwrap_or(NonZeroU32::MIN),
            window: DEFAULT_LOGIN_WINDOW,
        }
    }
}

impl LoginLimit {
    /// A burst of `max_attempts`, with one attempt returned per full window.
    /// No window ever admits more than `max_attempts`.
    fn quota(&self) -> Quota {
        Quota::with_period(self.window)
            .unwrap_or_else(|| Quota::per_second(self.max_attempts))
            .allow_burst(self.max_attempts)
    }
}

/// Rate limiting state for the login endpoint.
pub struct RateLimitConfig {
    pub login: IpLimiter,
    limit: LoginLimit,
    ip_source: IpSource,
}

impl RateLimitConfig {
    pub fn new(limit: LoginLimit, ip_source: IpSource) -> Self {
        Self {
            login: RateLimiter::keyed(limit.quota()),
            limit,
            ip_source,
        }
    }

    fn rejection_message(&self) -> String {
        format!(
            "Too many login attempts from this IP, please try again after {} seconds",
            self.limit.window.as_secs()
        )
    }

    /// Drop keys whose buckets are full again, and release the memory.
    pub fn prune(&self) -> usize {
        let before = self.login.len();
        self.login.retain_recent();
        self.login.shrink_to_fit();
        before.saturating_sub(self.login.len())
    }
}

/// Middleware for rate limiting login attempts.
pub async fn rate_limit_login(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let ip = match extract_client_ip(&request, config.ip_source) {
        Ok(ip) => ip,
        Err(reason) => {
            warn!(reason, "Unable to determine client IP");
            return ApiError::forbidden("Unable to determine client IP").into_response();
        }
    };

    match config.login.check_key(&ip) {
        Ok(_) => next.run(request).await,
        Err(_) => {
            let origin = request
                .headers()
                .get(header::ORIGIN)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-");
            warn!(
                method = %request.method(),
                path = %request.uri().path(),
                origin,
                ip = %ip,
                "Too many login attempts"
            );
            ApiError::too_many_requests(config.rejection_message()).into_response()
        }
    }
}
