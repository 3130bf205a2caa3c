use std::fmt;
use std::str::FromStr;

use jsonwebtoken::Algorithm;
use serde::Serialize;

use crate::api::error::SystemError;

const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024; // 10MB
const DEFAULT_WEBHOOK_TOLERANCE_SECS: u64 = 300;

/// Filestack settings the browser picker is allowed to see.
#[derive(Debug, Clone, Serialize)]
pub struct PublicUploadConfig {
    pub api_key: String,
    /// MIME allow-list. Empty means any type is accepted.
    pub accept: Vec<String>,
    pub max_size: u64,
}

impl PublicUploadConfig {
    pub fn permits_mime(&self, mime_type: &str) -> bool {
        self.accept.is_empty() || self.accept.iter().any(|m| m.eq_ignore_ascii_case(mime_type))
    }
}

/// Shared secret used to sign Filestack webhooks. Server side only.
#[derive(Clone)]
pub struct WebhookSecret(String);

impl WebhookSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WebhookSecret(***)")
    }
}

#[derive(Debug, Clone)]
pub struct FilestackConfig {
    pub public: PublicUploadConfig,
    pub webhook_secret: WebhookSecret,
    /// Allowed clock skew for `FS-Timestamp`, `None` when disabled.
    pub webhook_tolerance_secs: Option<u64>,
}

#[derive(Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub algorithm: Algorithm,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"***")
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

#[derive(Clone)]
pub struct Env {
    pub database_url: String,
    pub log_level: String,
    pub jwt: JwtConfig,
    pub filestack: FilestackConfig,
    pub frontend_url: String,
    pub ip: String,
    pub port: u16,
}

impl Env {
    pub fn load() -> Result<Self, SystemError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, SystemError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = match var("DATABASE_URL") {
            Some(url) => url,
            None => build_database_url(&var)?,
        };

        let log_level = var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()).to_lowercase();

        let secret = var("SECRET_KEY").or_else(|| var("JWT_SECRET")).ok_or_else(|| {
            SystemError::config(
                "SECRET_KEY (or JWT_SECRET) must be set in .env file or environment",
            )
        })?;
        let algorithm_name = var("ALGORITHM")
            .or_else(|| var("JWT_ALGORITHM"))
            .unwrap_or_else(|| "HS256".to_string());
        let algorithm = Algorithm::from_str(algorithm_name.trim())
            .ok()
            .filter(|a| matches!(a, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512))
            .ok_or_else(|| {
                SystemError::config(format!("Unsupported JWT algorithm '{algorithm_name}'"))
            })?;

        let api_key = var("FILESTACK_API_KEY").ok_or_else(|| {
            SystemError::config("FILESTACK_API_KEY must be set in .env file or environment")
        })?;
        let webhook_secret = var("FILESTACK_WEBHOOK_SECRET").ok_or_else(|| {
            SystemError::config("FILESTACK_WEBHOOK_SECRET must be set in .env file or environment")
        })?;
        let accept = var("UPLOAD_ALLOWED_MIME_TYPES")
            .map(|list| {
                list.split(',')
                    .map(|m| m.trim().to_string())
                    .filter(|m| !m.is_empty())
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        let max_size =
            parse_or("UPLOAD_MAX_FILE_SIZE", var("UPLOAD_MAX_FILE_SIZE"), DEFAULT_MAX_FILE_SIZE)?;
        let webhook_tolerance_secs = parse_or(
            "FILESTACK_WEBHOOK_TOLERANCE_SECS",
            var("FILESTACK_WEBHOOK_TOLERANCE_SECS"),
            DEFAULT_WEBHOOK_TOLERANCE_SECS,
        )?;

        let frontend_url =
            var("FRONTEND_URL").unwrap_or_else(|| "http://localhost:5173".to_string());
        let ip = var("IP").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = parse_or("PORT", var("PORT"), 8080u16)?;

        Ok(Env {
            database_url,
            log_level,
            jwt: JwtConfig { secret, algorithm },
            filestack: FilestackConfig {
                public: PublicUploadConfig { api_key, accept, max_size },
                webhook_secret: WebhookSecret::new(webhook_secret),
                webhook_tolerance_secs: Some(webhook_tolerance_secs).filter(|secs| *secs > 0),
            },
            frontend_url,
            ip,
            port,
        })
    }

    /// Database URL with the password masked, safe for logs.
    pub fn redacted_database_url(&self) -> String {
        redact_url(&self.database_url)
    }
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Env")
            .field("database_url", &self.redacted_database_url())
            .field("log_level", &self.log_level)
            .field("jwt", &self.jwt)
            .field("filestack", &self.filestack)
            .field("frontend_url", &self.frontend_url)
            .field("ip", &self.ip)
            .field("port", &self.port)
            .finish()
    }
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T, SystemError> {
    match raw {
        Some(v) => v
            .trim()
            .parse::<T>()
            .map_err(|_| SystemError::config(format!("{key} must be a valid number, got '{v}'"))),
        None => Ok(default),
    }
}

fn build_database_url(var: &dyn Fn(&str) -> Option<String>) -> Result<String, SystemError> {
    let part = |key: &str| var(key).map(|v| v.trim().to_string()).unwrap_or_default();

    let user = part("DB_USER");
    let password = part("DB_PASS");
    let name = part("DB_NAME");
    let host = part("DB_HOST");
    let port = var("DB_PORT").map(|p| p.trim().to_string()).unwrap_or_else(|| "5432".to_string());

    if host.is_empty() || name.is_empty() {
        return Err(SystemError::config(
            "DATABASE_URL or DB_HOST and DB_NAME must be set in .env file or environment",
        ));
    }

    let creds = match (user.is_empty(), password.is_empty()) {
        (false, false) => {
            format!("{}:{}@", urlencoding::encode(&user), urlencoding::encode(&password))
        }
        (false, true) => format!("{}@", urlencoding::encode(&user)),
        _ => String::new(),
    };

    Ok(format!("postgres://{creds}{host}:{port}/{name}"))
}

fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((creds, host)) = rest.rsplit_once('@') else {
        return url.to_string();
    };
    match creds.split_once(':') {
        Some((user, _)) => format!("{scheme}://{user}:***@{host}"),
        None => url.to_string(),
    }
}
