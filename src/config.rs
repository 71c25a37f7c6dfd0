use serde::{Deserialize, Serialize};

use std::{env, fs, path::Path, path::PathBuf, time::Duration};

use crate::session::{DEFAULT_FRESH_SESSION_TTL, DEFAULT_MAX_SESSIONS};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Postgres DSN. Notes are kept in memory when absent.
    #[serde(default)]
    pub database_dsn: Option<String>,
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,
    #[serde(default = "default_session_ttl", with = "humantime_serde")]
    pub session_ttl: Duration,
    /// Lifetime of a session whose cookie has not come back yet.
    #[serde(default = "default_fresh_session_ttl", with = "humantime_serde")]
    pub fresh_session_ttl: Duration,
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
    #[serde(default)]
    pub hasher: HasherConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HasherConfig {
    pub m_cost: u32,
    pub t_cost: u32,
    pub p_cost: u32,
}

impl Default for HasherConfig {
    fn default() -> Self {
        Self {
            m_cost: argon2::Params::DEFAULT_M_COST,
            t_cost: argon2::Params::DEFAULT_T_COST,
            p_cost: argon2::Params::DEFAULT_P_COST,
        }
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

const fn default_page_size() -> u64 {
    10
}

fn default_session_cookie() -> String {
    "sessionid".to_string()
}

const fn default_session_ttl() -> Duration {
    Duration::from_secs(14 * 24 * 60 * 60)
}

const fn default_fresh_session_ttl() -> Duration {
    DEFAULT_FRESH_SESSION_TTL
}

const fn default_max_sessions() -> usize {
    DEFAULT_MAX_SESSIONS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            database_dsn: None,
            static_dir: default_static_dir(),
            page_size: default_page_size(),
            session_cookie: default_session_cookie(),
            session_ttl: default_session_ttl(),
            fresh_session_ttl: default_fresh_session_ttl(),
            max_sessions: default_max_sessions(),
            hasher: HasherConfig::default(),
        }
    }
}

fn load_from_env() -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = Config::default();

    if let Ok(listen_addr) = env::var("LISTEN_ADDR") {
        config.listen_addr = listen_addr;
    }
    config.database_dsn = env::var("PG_DSN").ok();
    if let Ok(static_dir) = env::var("STATIC_DIR") {
        config.static_dir = PathBuf::from(static_dir);
    }
    if let Ok(page_size) = env::var("PAGE_SIZE") {
        config.page_size = page_size
            .parse::<u64>()
            .map_err(|e| format!("Failed to parse PAGE_SIZE: {e}"))?;
    }

    Ok(config)
}

fn read_config(path: &str) -> Result<Config, Box<dyn std::error::Error>> {
    let contents = fs::read_to_string(path)?;
    let config: Config = serde_yaml::from_str(&contents)?;
    if config.page_size == 0 {
        return Err(format!("page_size in '{path}' must be positive").into());
    }
    Ok(config)
}

pub fn load_config() -> Result<Config, Box<dyn std::error::Error>> {
    // Retrieve env variable
    let config_path = env::var("NOTES_APP_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());

    // Try env path
    if Path::new(&config_path).exists() {
        return read_config(&config_path);
    }

    // Fallback to config.yaml
    if Path::new("config.yaml").exists() {
        tracing::warn!(
            "Config file '{}' not found, falling back to 'config.yaml'",
            config_path
        );
        return read_config("config.yaml");
    }

    // Fallback to config.example.yaml
    if Path::new("config.example.yaml").exists() {
        tracing::warn!(
            "Config file '{}' and 'config.yaml' not found, falling back to 'config.example.yaml'",
            config_path
        );
        return read_config("config.example.yaml");
    }

    // Fallback to environment variables
    tracing::info!(
        "No config file found, attempting to load configuration from environment variables"
    );
    let config = load_from_env()?;
    if config.page_size == 0 {
        return Err("PAGE_SIZE must be positive".into());
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.page_size, 10);
        assert_eq!(config.session_cookie, "sessionid");
    }

    #[test]
    fn parses_full_document() {
        let config: Config = serde_yaml::from_str(
            r"
listen_addr: 127.0.0.1:9000
database_dsn: host=localhost user=notes
static_dir: /srv/notes/static
page_size: 25
session_cookie: notes_session
session_ttl: 2h 30m
fresh_session_ttl: 5m
max_sessions: 5000
hasher:
  m_cost: 4096
  t_cost: 3
  p_cost: 2
",
        )
        .unwrap();

        assert_eq!(config.listen_addr, "127.0.0.1:9000");
        assert_eq!(config.database_dsn.as_deref(), Some("host=localhost user=notes"));
        assert_eq!(config.static_dir, PathBuf::from("/srv/notes/static"));
        assert_eq!(config.page_size, 25);
        assert_eq!(config.session_ttl, Duration::from_secs(9000));
        assert_eq!(config.fresh_session_ttl, Duration::from_secs(300));
        assert_eq!(config.max_sessions, 5000);
        assert_eq!(config.hasher.m_cost, 4096);
    }
}
