use std::env;
use std::fmt;
use std::path::PathBuf;

const DEFAULT_PORT: u16 = 3001;
const DEFAULT_DB_PORT: u16 = 5432;
const DEFAULT_JWT_SECRET: &str = "dev-secret-change-in-production";
const DEFAULT_ADMIN_USERNAME: &str = "admin";
const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_lowercase()).as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            _ => Environment::Development,
        }
    }

    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

/// Where the database lives, after resolving the configuration sources.
#[derive(Clone, PartialEq, Eq)]
pub enum DatabaseTarget {
    Uri(String),
    Discrete {
        host: String,
        port: u16,
        database: String,
        user: String,
        password: String,
    },
}

impl DatabaseTarget {
    pub fn host(&self) -> Option<String> {
        match self {
            DatabaseTarget::Uri(uri) => url::Url::parse(uri)
                .ok()
                .and_then(|u| u.host_str().map(str::to_string)),
            DatabaseTarget::Discrete { host, .. } => Some(host.clone()),
        }
    }

    /// `host:port/database`, never including credentials.
    pub fn describe(&self) -> String {
        match self {
            DatabaseTarget::Uri(uri) => match url::Url::parse(uri) {
                Ok(parsed) => format!(
                    "{}:{}{}",
                    parsed.host_str().unwrap_or("localhost"),
                    parsed.port().unwrap_or(DEFAULT_DB_PORT),
                    parsed.path()
                ),
                Err(_) => "<unparseable DATABASE_URL>".to_string(),
            },
            DatabaseTarget::Discrete { host, port, database, .. } => {
                format!("{}:{}/{}", host, port, database)
            }
        }
    }
}

impl fmt::Debug for DatabaseTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DatabaseTarget({})", self.describe())
    }
}

#[derive(Clone, Default)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub host: Option<String>,
    pub port: u16,
    pub name: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub ssl_hint: bool,
}

impl DatabaseSettings {
    /// A full URI wins; otherwise all discrete fields must be present.
    pub fn target(&self) -> Option<DatabaseTarget> {
        if let Some(url) = &self.url {
            return Some(DatabaseTarget::Uri(url.clone()));
        }

        match (&self.host, &self.name, &self.user, &self.password) {
            (Some(host), Some(name), Some(user), Some(password)) => Some(DatabaseTarget::Discrete {
                host: host.clone(),
                port: self.port,
                database: name.clone(),
                user: user.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.target().is_some()
    }
}

impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("target", &self.target())
            .field("ssl_hint", &self.ssl_hint)
            .finish()
    }
}

#[derive(Clone)]
pub struct AdminBootstrap {
    pub enabled: bool,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for AdminBootstrap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminBootstrap")
            .field("enabled", &self.enabled)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_host: String,
    pub server_port: u16,
    pub port_search_attempts: u16,
    pub port_file: PathBuf,
    pub environment: Environment,
    pub database: DatabaseSettings,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub admin: AdminBootstrap,
    pub cors_allowed_origins: Vec<String>,
    pub apk_path: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database = DatabaseSettings {
            url: get("DATABASE_URL"),
            host: get("DB_HOST"),
            port: get("DB_PORT").and_then(|p| p.parse().ok()).unwrap_or(DEFAULT_DB_PORT),
            name: get("DB_NAME"),
            user: get("DB_USER"),
            password: get("DB_PASSWORD"),
            ssl_hint: get("DB_SSL").map(|v| parse_flag(&v)).unwrap_or(false),
        };

        let cors_allowed_origins = get("CORS_ALLOWED_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            server_host: get("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            server_port: get("PORT")
                .or_else(|| get("SERVER_PORT"))
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            port_search_attempts: get("PORT_SEARCH_ATTEMPTS")
                .and_then(|p| p.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(10),
            port_file: get("PORT_FILE").unwrap_or_else(|| ".server-port".to_string()).into(),
            environment: Environment::parse(get("APP_ENV").as_deref()),
            database,
            jwt_secret: get("JWT_SECRET").unwrap_or_else(|| DEFAULT_JWT_SECRET.to_string()),
            token_ttl_hours: get("TOKEN_TTL_HOURS")
                .and_then(|h| h.parse().ok())
                .filter(|h| *h > 0)
                .unwrap_or(12),
            admin: AdminBootstrap {
                enabled: get("CREATE_DEFAULT_ADMIN").map(|v| parse_flag(&v)).unwrap_or(true),
                username: get("ADMIN_USERNAME").unwrap_or_else(|| DEFAULT_ADMIN_USERNAME.to_string()),
                password: get("ADMIN_PASSWORD").unwrap_or_else(|| DEFAULT_ADMIN_PASSWORD.to_string()),
            },
            cors_allowed_origins,
            apk_path: get("APK_PATH").unwrap_or_else(|| "public/apk/app.apk".to_string()).into(),
        }
    }

    /// Emits startup warnings for settings that are unsafe outside development.
    pub fn log_warnings(&self) {
        if self.jwt_secret == DEFAULT_JWT_SECRET && self.environment.is_production() {
            tracing::warn!("⚠️ CONFIG: JWT_SECRET is the development default in production");
        }
        if self.admin.enabled && self.admin.password == DEFAULT_ADMIN_PASSWORD {
            tracing::warn!("⚠️ CONFIG: ADMIN_PASSWORD is the default; change it after first login");
        }
        if !self.database.is_configured() {
            tracing::warn!("⚠️ CONFIG: no database configured (set DATABASE_URL or DB_HOST/DB_NAME/DB_USER/DB_PASSWORD)");
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes" | "require")
}
