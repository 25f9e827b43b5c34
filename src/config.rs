use serde::Deserialize;

use crate::auth::Role;

#[derive(Debug, Default, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub activity: ActivityConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebConfig {
    #[serde(default = "default_web_address")]
    pub address: String,
    #[serde(default = "default_web_port")]
    pub port: u16,
    /// Directory with the browser bundle, served under `/`
    pub static_dir: Option<String>,
    /// Allowed CORS origins. Empty allows any origin.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_storage_path")]
    pub path: String,
    /// Pretty-print the JSON document on every write
    #[serde(default = "default_true")]
    pub pretty: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    /// Accounts inserted into the store on startup when their email is unknown
    #[serde(default)]
    pub users: Vec<SeedUser>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SeedUser {
    pub email: String,
    pub password: String,
    pub role: Role,
    pub name: String,
    #[serde(default)]
    pub department: String,
    /// Links an `employee` account to its employee record
    pub employee_id: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ActivityConfig {
    /// Max activity entries kept in the store before the oldest are dropped
    #[serde(default = "default_activity_max")]
    pub max_entries: usize,
    #[serde(default = "default_activity_limit")]
    pub default_limit: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    /// "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            address: default_web_address(),
            port: default_web_port(),
            static_dir: None,
            cors_origins: Vec::new(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            pretty: true,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_secs: default_session_ttl(),
            sweep_interval_secs: default_sweep_interval(),
            users: Vec::new(),
        }
    }
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            max_entries: default_activity_max(),
            default_limit: default_activity_limit(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
            filter: default_log_filter(),
        }
    }
}

// Default value functions
fn default_true() -> bool { true }
fn default_web_address() -> String { "127.0.0.1".to_string() }
fn default_web_port() -> u16 { 8080 }
fn default_storage_path() -> String { "data/db.json".to_string() }
fn default_session_ttl() -> u64 { 86400 }
fn default_sweep_interval() -> u64 { 300 }
fn default_activity_max() -> usize { 1000 }
fn default_activity_limit() -> usize { 20 }
fn default_log_format() -> String { "pretty".to_string() }
fn default_log_filter() -> String { "perf_review=info".to_string() }

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path, e))?;
        Self::parse(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config '{}': {}", path, e))
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        for user in &config.auth.users {
            if user.role == Role::Employee && user.employee_id.is_none() {
                anyhow::bail!("seed user '{}' has role employee but no employee_id", user.email);
            }
        }
        Ok(config)
    }
}
