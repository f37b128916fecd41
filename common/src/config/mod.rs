//! Application configuration.
//!
//! Everything is read from environment variables (after an optional `.env`
//! file). Loading goes through a lookup function so tests can feed a map
//! instead of mutating the process environment.

pub mod db;

use std::fmt;
use std::str::FromStr;

pub use db::{
    DbConfig, DbEnv, DbSettings, DbVariantSettings, Dialect, MySqlConfig, PoolSettings,
    ProjectDbSettings, KNOWN_PROJECTS,
};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3001;
const DEFAULT_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://localhost:5500"];
const DEFAULT_BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Deployment environment of the HTTP process (not of a project database).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn is_production(&self) -> bool {
        matches!(self, AppEnv::Production)
    }
}

impl FromStr for AppEnv {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(AppEnv::Development),
            "production" | "prod" => Ok(AppEnv::Production),
            other => Err(format!("unknown environment: {}", other)),
        }
    }
}

impl fmt::Display for AppEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppEnv::Development => write!(f, "development"),
            AppEnv::Production => write!(f, "production"),
        }
    }
}

/// SMTP settings for notification mail.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub host: String,
    pub port: u16,
    /// Implicit TLS when true, STARTTLS otherwise.
    pub secure: bool,
    pub user: Option<String>,
    pub pass: Option<String>,
    pub from: String,
    pub to: String,
}

impl MailConfig {
    /// Mail is only sent when credentials are present.
    pub fn is_configured(&self) -> bool {
        self.user.is_some() && self.pass.is_some()
    }
}

/// Process-wide application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub env: AppEnv,
    pub allowed_origins: Vec<String>,
    pub body_limit: usize,
    /// Projects initialized (connect, register models, sync) on the first API request.
    pub bootstrap_projects: Vec<String>,
    pub mail: MailConfig,
}

impl AppConfig {
    /// Loads configuration from the process environment, reading `.env` first.
    pub fn load() -> Self {
        load_dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let env = get("APP_ENV")
            .or_else(|| get("NODE_ENV"))
            .and_then(|v| v.parse().ok())
            .unwrap_or(AppEnv::Development);

        let allowed_origins = get("ALLOWED_ORIGINS")
            .map(|v| split_list(&v))
            .unwrap_or_else(|| DEFAULT_ORIGINS.iter().map(|s| s.to_string()).collect());

        let bootstrap_projects = get("BOOTSTRAP_PROJECTS")
            .map(|v| split_list(&v))
            .unwrap_or_else(|| vec!["hsnweb".to_string()]);

        let mail = MailConfig {
            host: get("SMTP_HOST").unwrap_or_else(|| "smtp.gmail.com".to_string()),
            port: get("SMTP_PORT").and_then(|v| v.parse().ok()).unwrap_or(587),
            secure: get("SMTP_SECURE").map(|v| v == "true").unwrap_or(false),
            user: get("SMTP_USER"),
            pass: get("SMTP_PASS"),
            from: get("EMAIL_FROM").unwrap_or_else(|| "noreply@hsntech.in".to_string()),
            to: get("EMAIL_TO").unwrap_or_else(|| "info@hsntech.in".to_string()),
        };

        Self {
            host: get("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: get("PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            env,
            allowed_origins,
            body_limit: DEFAULT_BODY_LIMIT,
            bootstrap_projects,
            mail,
        }
    }

    /// Socket address string to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Loads `.env` from the working directory if present. Existing variables win.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "failed to read .env"),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
