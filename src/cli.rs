//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::db::{Database, Role};
use crate::jwt::TokenLifetimes;
use crate::names::generate_name;
use crate::password::{DEFAULT_PASSWORD_COST, generate_password, hash_password};
use crate::rate_limit::LoginLimit;
use clap::Parser;
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const MIN_SECRET_LENGTH: usize = 32;

const ACCESS_SECRET_ENV: &str = "ACCESS_TOKEN_SECRET";
const REFRESH_SECRET_ENV: &str = "REFRESH_TOKEN_SECRET";

/// Longest token lifetime accepted on the command line: one year.
const MAX_TOKEN_TTL_SECS: u64 = 365 * 24 * 60 * 60;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

/// Where the client address used for rate limiting comes from.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IpSource {
    /// TCP peer address
    #[default]
    Socket,
    /// Left-most `X-Forwarded-For` entry (only behind a trusted proxy)
    XForwardedFor,
    /// `X-Real-IP` header (only behind a trusted proxy)
    XRealIp,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "notekeep", about = "Notes API with JWT authentication")]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "3500")]
    pub port: u16,

    /// Path to SQLite database file (":memory:" for a throwaway database)
    #[arg(short, long, env = "DATABASE_PATH", default_value = "notekeep.db")]
    pub database: String,

    /// Path to file containing the access token secret. Prefer ACCESS_TOKEN_SECRET instead
    #[arg(long)]
    pub access_token_secret_file: Option<String>,

    /// Path to file containing the refresh token secret. Prefer REFRESH_TOKEN_SECRET instead
    #[arg(long)]
    pub refresh_token_secret_file: Option<String>,

    /// Access token lifetime in seconds
    #[arg(long, default_value = "60", value_parser = clap::value_parser!(u64).range(1..=MAX_TOKEN_TTL_SECS))]
    pub access_token_ttl: u64,

    /// Refresh token lifetime in seconds
    #[arg(long, default_value = "900", value_parser = clap::value_parser!(u64).range(1..=MAX_TOKEN_TTL_SECS))]
    pub refresh_token_ttl: u64,

    /// Login attempts allowed per client address within the login window
    #[arg(long, default_value = "5")]
    pub login_attempts: NonZeroU32,

    /// Login rate limit window in seconds
    #[arg(long, default_value = "60", value_parser = clap::value_parser!(u64).range(1..))]
    pub login_window: u64,

    /// Source of the client address for rate limiting
    #[arg(long, value_enum, default_value = "socket")]
    pub ip_source: IpSource,

    /// bcrypt cost for new password hashes
    #[arg(long, default_value_t = DEFAULT_PASSWORD_COST,
        value_parser = clap::value_parser!(u32).range(4..=31))]
    pub password_cost: u32,

    /// Create an admin account on startup if no active admin exists, and print its password
    #[arg(long)]
    pub create_admin: bool,

    /// Log output format
    #[arg(short, long, value_enum, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
/// Verbosity follows `RUST_LOG`, defaulting to `info`.
pub fn init_logging(format: &LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
        LogFormat::Compact => builder.compact().init(),
    }
}

/// Load a token secret from an environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_secret(env_var: &str, secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var(env_var) {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var(env_var) };
        secret
    } else if let Some(path) = secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read secret file");
                return None;
            }
        }
    } else {
        error!(
            env_var,
            "Token secret is required. Set the environment variable (recommended) or pass a secret file"
        );
        return None;
    };

    if secret.len() < MIN_SECRET_LENGTH {
        error!(
            env_var,
            "Token secret is shorter than {} characters. Use a longer secret", MIN_SECRET_LENGTH
        );
        return None;
    }

    Some(secret)
}

/// Load both token secrets and check that they differ.
pub fn load_secrets(args: &Args) -> Option<(String, String)> {
    let access = load_secret(ACCESS_SECRET_ENV, args.access_token_secret_file.as_deref())?;
    let refresh = load_secret(REFRESH_SECRET_ENV, args.refresh_token_secret_file.as_deref())?;
    validate_secrets(&access, &refresh)?;
    Some((access, refresh))
}

/// Access and refresh tokens must not share a signing secret.
pub fn validate_secrets(access: &str, refresh: &str) -> Option<()> {
    if access == refresh {
        error!("Access and refresh token secrets must be different");
        return None;
    }
    Some(())
}

/// Handle the --create-admin flag: create an admin unless an active one exists.
pub async fn handle_create_admin(db: &Database, password_cost: u32) -> Result<(), String> {
    match db.accounts().get_active_admin().await {
        Ok(Some(existing)) => {
            println!();
            println!("Active admin already exists: {}", existing.username);
            println!();
            Ok(())
        }
        Ok(None) => {
            let uuid = Uuid::new_v4().to_string();
            let username = generate_name();
            let password = generate_password();

            let password_hash = hash_password(&password, password_cost)
                .await
                .map_err(|e| format!("Failed to hash admin password: {}", e))?;

            db.accounts()
                .create(&uuid, &username, &password_hash, &[Role::Admin])
                .await
                .map_err(|e| format!("Failed to create admin account: {}", e))?;

            info!(account = %uuid, username = %username, "Admin account created");
            println!();
            println!("Admin account created: {}", username);
            println!("Password: {}", password);
            println!("This password is shown only once.");
            println!();
            Ok(())
        }
        Err(e) => Err(format!("Failed to check for existing admin: {}", e)),
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(
    args: &Args,
    db: Database,
    access_secret: String,
    refresh_secret: String,
) -> ServerConfig {
    ServerConfig {
        db,
        access_secret: access_secret.into_bytes(),
        refresh_secret: refresh_secret.into_bytes(),
        token_lifetimes: TokenLifetimes {
            access_secs: args.access_token_ttl,
            refresh_secs: args.refresh_token_ttl,
        },
        login_limit: LoginLimit {
            max_attempts: args.login_attempts,
            window: Duration::from_secs(args.login_window),
        },
        ip_source: args.ip_source,
        password_cost: args.password_cost,
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
