//! Per-project database configuration.
//!
//! Each project has a `local` and a `prod` variant. Raw settings are read from
//! `<PROJECT>_<LOCAL|PROD>_DB_*` variables; [`DbSettings::resolve`] turns them
//! into a typed [`DbConfig`] and rejects incomplete combinations.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;
use utoipa::ToSchema;

use crate::errors::{AppError, AppResult};

/// Projects with built-in configuration.
pub const KNOWN_PROJECTS: [&str; 2] = ["hsnweb", "aihunar"];

/// Database environment of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DbEnv {
    Local,
    #[serde(rename = "prod")]
    Production,
}

impl DbEnv {
    fn env_segment(&self) -> &'static str {
        match self {
            DbEnv::Local => "LOCAL",
            DbEnv::Production => "PROD",
        }
    }
}

impl FromStr for DbEnv {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(DbEnv::Local),
            "prod" | "production" => Ok(DbEnv::Production),
            other => Err(AppError::Config(format!(
                "invalid DB_ENV: {} (expected local or prod)",
                other
            ))),
        }
    }
}

impl fmt::Display for DbEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbEnv::Local => write!(f, "local"),
            DbEnv::Production => write!(f, "prod"),
        }
    }
}

/// Supported database backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Embedded, file-backed.
    Sqlite,
    /// Networked server (MySQL or MariaDB).
    #[serde(rename = "mysql")]
    MySql,
}

impl FromStr for Dialect {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Ok(Dialect::Sqlite),
            "mysql" | "mariadb" => Ok(Dialect::MySql),
            other => Err(AppError::Config(format!("unsupported dialect: {}", other))),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Sqlite => write!(f, "sqlite"),
            Dialect::MySql => write!(f, "mysql"),
        }
    }
}

/// Connection pool bounds for networked databases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
}

impl PoolSettings {
    pub fn local() -> Self {
        Self {
            max_connections: 5,
            min_connections: 0,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(10),
        }
    }

    pub fn production() -> Self {
        Self {
            max_connections: 10,
            min_connections: 2,
            ..Self::local()
        }
    }
}

/// Connection parameters for a networked MySQL server.
#[derive(Clone, PartialEq, Eq)]
pub struct MySqlConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub pool: PoolSettings,
}

impl fmt::Debug for MySqlConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MySqlConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"***")
            .field("pool", &self.pool)
            .finish()
    }
}

/// Resolved, validated connection parameters for one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbConfig {
    Sqlite { storage: PathBuf },
    MySql(MySqlConfig),
}

impl DbConfig {
    pub fn dialect(&self) -> Dialect {
        match self {
            DbConfig::Sqlite { .. } => Dialect::Sqlite,
            DbConfig::MySql(_) => Dialect::MySql,
        }
    }
}

/// Raw settings for one environment of one project, as read from env vars.
#[derive(Debug, Clone)]
pub struct DbVariantSettings {
    pub dialect: String,
    pub storage: Option<String>,
    pub host: Option<String>,
    pub port: u16,
    pub database: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub pool: PoolSettings,
}

impl DbVariantSettings {
    /// SQLite file at `storage`.
    pub fn sqlite(storage: impl Into<String>) -> Self {
        Self {
            dialect: "sqlite".to_string(),
            storage: Some(storage.into()),
            host: None,
            port: 3306,
            database: None,
            username: None,
            password: None,
            pool: PoolSettings::local(),
        }
    }

    /// MySQL server; pool bounds follow the production defaults.
    pub fn mysql(
        host: impl Into<String>,
        port: u16,
        database: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            dialect: "mysql".to_string(),
            storage: None,
            host: Some(host.into()),
            port,
            database: Some(database.into()),
            username: Some(username.into()),
            password: Some(password.into()),
            pool: PoolSettings::production(),
        }
    }

    fn from_lookup<F>(project: &str, env: DbEnv, lookup: &F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let prefix = format!("{}_{}_DB_", project.to_uppercase(), env.env_segment());
        let get = |suffix: &str| lookup(&format!("{}{}", prefix, suffix)).filter(|v| !v.is_empty());

        let (default_dialect, default_storage, default_db, default_user, pool) = match env {
            DbEnv::Local => (
                "sqlite",
                Some(format!("./data/{}_local.sqlite", project)),
                Some(format!("{}_local", project)),
                Some("root".to_string()),
                PoolSettings::local(),
            ),
            DbEnv::Production => ("mysql", None, None, None, PoolSettings::production()),
        };

        Self {
            dialect: get("DIALECT").unwrap_or_else(|| default_dialect.to_string()),
            storage: get("STORAGE").or(default_storage),
            host: get("HOST").or_else(|| Some("localhost".to_string())),
            port: get("PORT").and_then(|v| v.parse().ok()).unwrap_or(3306),
            database: get("NAME").or(default_db),
            username: get("USER").or(default_user),
            password: get("PASS"),
            pool,
        }
    }

    /// Validates the combination and produces a typed config.
    pub fn build(&self, project: &str) -> AppResult<DbConfig> {
        match self.dialect.parse::<Dialect>()? {
            Dialect::Sqlite => {
                let storage = self.storage.as_deref().ok_or_else(|| {
                    AppError::Config(format!("{}: SQLite requires a storage path", project))
                })?;
                Ok(DbConfig::Sqlite {
                    storage: PathBuf::from(storage),
                })
            }
            Dialect::MySql => {
                let missing = |what: &str| {
                    AppError::Config(format!("{}: MySQL requires {}", project, what))
                };
                Ok(DbConfig::MySql(MySqlConfig {
                    host: self.host.clone().ok_or_else(|| missing("a host"))?,
                    port: self.port,
                    database: self.database.clone().ok_or_else(|| missing("a database name"))?,
                    username: self.username.clone().ok_or_else(|| missing("a user"))?,
                    password: self.password.clone().unwrap_or_default(),
                    pool: self.pool.clone(),
                }))
            }
        }
    }
}

/// Both environment variants of a project.
#[derive(Debug, Clone)]
pub struct ProjectDbSettings {
    pub local: DbVariantSettings,
    pub production: DbVariantSettings,
}

impl ProjectDbSettings {
    /// Same settings for both environments.
    pub fn uniform(settings: DbVariantSettings) -> Self {
        Self {
            local: settings.clone(),
            production: settings,
        }
    }

    fn variant(&self, env: DbEnv) -> &DbVariantSettings {
        match env {
            DbEnv::Local => &self.local,
            DbEnv::Production => &self.production,
        }
    }
}

/// Config resolver: project name + environment to connection parameters.
#[derive(Debug, Clone)]
pub struct DbSettings {
    default_env: DbEnv,
    projects: BTreeMap<String, ProjectDbSettings>,
}

impl DbSettings {
    /// Empty settings; projects are added with [`DbSettings::with_project`].
    pub fn new(default_env: DbEnv) -> Self {
        Self {
            default_env,
            projects: BTreeMap::new(),
        }
    }

    /// Settings for all known projects from the process environment.
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Settings for all known projects from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let default_env = match lookup("DB_ENV").filter(|v| !v.is_empty()) {
            Some(v) => v.parse()?,
            None => DbEnv::Local,
        };

        let mut settings = Self::new(default_env);
        for project in KNOWN_PROJECTS {
            settings = settings.with_project(
                project,
                ProjectDbSettings {
                    local: DbVariantSettings::from_lookup(project, DbEnv::Local, &lookup),
                    production: DbVariantSettings::from_lookup(
                        project,
                        DbEnv::Production,
                        &lookup,
                    ),
                },
            );
        }
        Ok(settings)
    }

    pub fn with_project(mut self, name: impl Into<String>, project: ProjectDbSettings) -> Self {
        self.projects.insert(name.into(), project);
        self
    }

    /// Environment used when no override is given.
    pub fn default_env(&self) -> DbEnv {
        self.default_env
    }

    /// Resolves the typed configuration for `project` in `env` (or the default env).
    pub fn resolve(&self, project: &str, env: Option<DbEnv>) -> AppResult<DbConfig> {
        let env = env.unwrap_or(self.default_env);
        let settings = self
            .projects
            .get(project)
            .ok_or_else(|| AppError::ProjectNotFound(project.to_string()))?;
        settings.variant(env).build(project)
    }
}
