//! CLI argument parsing, validation, and startup helpers.

use std::time::Duration;

use crate::ServerConfig;
use crate::auth::CookieConfig;
use crate::db::Database;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use url::Url;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const HOST_COOKIE_PREFIX: &str = "__Host-";

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "Filmstrip", about = "Movie catalog API with stateless token sessions")]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "8080")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, env = "DATABASE", default_value = "filmstrip.db")]
    pub database: String,

    /// Path to file containing JWT secret. Prefer using JWT_SECRET env var instead
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Issuer claim written into and required of every access token
    #[arg(long, env = "JWT_ISSUER", default_value = "filmstrip")]
    pub jwt_issuer: String,

    /// Audience claim written into and required of every access token
    #[arg(long, env = "JWT_AUDIENCE", default_value = "filmstrip")]
    pub jwt_audience: String,

    /// Access token lifetime in minutes, at most one day
    #[arg(long, env = "JWT_TOKEN_EXP", default_value = "15",
        value_parser = clap::value_parser!(u64).range(1..=24 * 60))]
    pub access_ttl_minutes: u64,

    /// Refresh token lifetime in hours, at most one year
    #[arg(long, env = "JWT_REFRESH_TOKEN_EXP", default_value = "168",
        value_parser = clap::value_parser!(u64).range(1..=365 * 24))]
    pub refresh_ttl_hours: u64,

    /// Name of the refresh cookie
    #[arg(long, env = "COOKIE_NAME", default_value = crate::auth::REFRESH_COOKIE_NAME)]
    pub cookie_name: String,

    /// Domain attribute of the refresh cookie. Not allowed with a __Host- name
    #[arg(long, env = "JWT_COOKIE_DOMAIN")]
    pub cookie_domain: Option<String>,

    /// Path attribute of the refresh cookie
    #[arg(long, env = "COOKIE_PATH", default_value = "/")]
    pub cookie_path: String,

    /// Deadline for a single user lookup, in seconds
    #[arg(long, env = "QUERY_TIMEOUT", default_value = "3",
        value_parser = clap::value_parser!(u64).range(1..))]
    pub lookup_timeout_secs: u64,

    /// Origin allowed to call the API from a browser
    #[arg(long, env = "FRONTEND_URL", default_value = "http://localhost:3000")]
    pub frontend_url: String,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format. `RUST_LOG` overrides the
/// default `info` level.
pub fn init_logging(format: &LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
        LogFormat::Compact => builder.compact().init(),
    }
}

/// Load JWT secret from environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var("JWT_SECRET") {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var("JWT_SECRET") };
        secret
    } else if let Some(path) = jwt_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read JWT secret file");
                return None;
            }
        }
    } else {
        error!(
            "JWT secret is required. Set JWT_SECRET environment variable (recommended) or use --jwt-secret-file"
        );
        return None;
    };

    validate_jwt_secret(secret)
}

fn validate_jwt_secret(secret: String) -> Option<String> {
    if secret.len() < MIN_JWT_SECRET_LENGTH {
        error!(
            "JWT secret is shorter than {} characters. Use a longer secret",
            MIN_JWT_SECRET_LENGTH
        );
        return None;
    }
    Some(secret)
}

/// Build the refresh cookie settings, enforcing the `__Host-` prefix rules
/// browsers apply: no Domain attribute and Path exactly `/`.
/// Returns None and logs an error if validation fails.
pub fn validate_cookie_config(
    name: String,
    domain: Option<String>,
    path: String,
) -> Option<CookieConfig> {
    if name.is_empty() || name.contains([';', '=', ' ']) {
        error!(name = %name, "Invalid cookie name");
        return None;
    }

    let domain = domain.filter(|d| !d.is_empty());

    if name.starts_with(HOST_COOKIE_PREFIX) {
        if domain.is_some() {
            error!(name = %name, "__Host- cookies must not set a domain");
            return None;
        }
        if path != "/" {
            error!(name = %name, path = %path, "__Host- cookies must use path /");
            return None;
        }
    }

    if !path.starts_with('/') {
        error!(path = %path, "Cookie path must start with '/'");
        return None;
    }

    Some(CookieConfig { name, domain, path })
}

/// Parse the frontend URL used as the allowed CORS origin.
/// Returns None and logs an error if validation fails.
pub fn validate_frontend_url(frontend_url: &str) -> Option<Url> {
    match Url::parse(frontend_url) {
        Ok(url) if url.has_host() => Some(url),
        Ok(_) => {
            error!(url = %frontend_url, "Frontend URL has no host");
            None
        }
        Err(e) => {
            error!(url = %frontend_url, error = %e, "Invalid frontend URL");
            None
        }
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(
    args: &Args,
    db: Database,
    jwt_secret: String,
    cookie: CookieConfig,
    frontend_url: Url,
) -> ServerConfig {
    ServerConfig {
        db,
        jwt_secret: jwt_secret.into_bytes(),
        issuer: args.jwt_issuer.clone(),
        audience: args.jwt_audience.clone(),
        access_ttl: Duration::from_secs(args.access_ttl_minutes * 60),
        refresh_ttl: Duration::from_secs(args.refresh_ttl_hours * 60 * 60),
        cookie,
        lookup_timeout: Duration::from_secs(args.lookup_timeout_secs),
        frontend_url,
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
