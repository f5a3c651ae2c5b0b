use serde::{Deserialize, Serialize};

/// Connection settings for the PostgreSQL store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_dbname")]
    pub dbname: String,

    #[serde(default = "default_user")]
    pub user: String,

    #[serde(default)]
    pub password: Option<String>,

    /// Pool size
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Applied to every pooled connection; zero disables it
    #[serde(default = "default_statement_timeout_ms")]
    pub statement_timeout_ms: u64,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    5432
}

fn default_dbname() -> String {
    "lightbnb".to_string()
}

fn default_user() -> String {
    "vagrant".to_string()
}

fn default_max_connections() -> usize {
    10
}

fn default_statement_timeout_ms() -> u64 {
    30_000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            dbname: default_dbname(),
            user: default_user(),
            password: None,
            max_connections: default_max_connections(),
            statement_timeout_ms: default_statement_timeout_ms(),
        }
    }
}

impl StoreConfig {
    /// Reads `LIGHTBNB_PG_*` variables, keeping defaults for anything unset or
    /// unparsable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: lookup("LIGHTBNB_PG_HOST").unwrap_or(defaults.host),
            port: lookup("LIGHTBNB_PG_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            dbname: lookup("LIGHTBNB_PG_DBNAME").unwrap_or(defaults.dbname),
            user: lookup("LIGHTBNB_PG_USER").unwrap_or(defaults.user),
            password: lookup("LIGHTBNB_PG_PASSWORD"),
            max_connections: lookup("LIGHTBNB_PG_MAX_CONNECTIONS")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.max_connections),
            statement_timeout_ms: lookup("LIGHTBNB_PG_STATEMENT_TIMEOUT_MS")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.statement_timeout_ms),
        }
    }
}
