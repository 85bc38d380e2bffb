use crate::auth::jwt::JwtConfig;

/// Default cap on request bodies (snapshot restores, CSV uploads).
const DEFAULT_MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    pub request_timeout_secs: u64,
    /// Largest accepted request body, in bytes.
    pub max_upload_bytes: usize,
    pub jwt: JwtConfig,
    /// Admin account created at startup when missing.
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub username: String,
    pub password: String,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                 |
    /// |------------------------|-------------------------|
    /// | `HOST`                 | `0.0.0.0`               |
    /// | `PORT`                 | `3000`                  |
    /// | `CORS_ORIGINS`         | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                    |
    /// | `MAX_UPLOAD_BYTES`     | `67108864` (64 MiB)     |
    /// | `ADMIN_USERNAME`       | unset                   |
    /// | `ADMIN_PASSWORD`       | unset                   |
    ///
    /// JWT settings come from [`JwtConfig::from_env`].
    ///
    /// # Panics
    ///
    /// Panics on unparsable numeric values; misconfiguration should stop the
    /// process at startup.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins = parse_origins(
            &std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "http://localhost:5173".into()),
        );

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let max_upload_bytes: usize = std::env::var("MAX_UPLOAD_BYTES")
            .map(|v| v.parse().expect("MAX_UPLOAD_BYTES must be a valid usize"))
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

        let bootstrap_admin = match (
            std::env::var("ADMIN_USERNAME").ok().filter(|s| !s.is_empty()),
            std::env::var("ADMIN_PASSWORD").ok().filter(|s| !s.is_empty()),
        ) {
            (Some(username), Some(password)) => Some(BootstrapAdmin { username, password }),
            _ => None,
        };

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            max_upload_bytes,
            jwt: JwtConfig::from_env(),
            bootstrap_admin,
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
