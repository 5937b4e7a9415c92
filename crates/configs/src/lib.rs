use std::{fmt, net::SocketAddr, path::PathBuf, time::Duration};

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    MissingEnvVar(&'static str),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Process configuration.
///
/// An optional TOML file provides defaults; environment variables (usually
/// loaded from `.env`) always win.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub keepalive: KeepaliveConfig,
    #[serde(default)]
    pub http: HttpClientConfig,
    /// Where the browser lands after a successful authorization.
    #[serde(default)]
    pub external_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".into(), port: 3000 }
    }
}

#[derive(Clone, Deserialize)]
pub struct DiscordConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub redirect_uri: String,
    #[serde(default)]
    pub bot_token: String,
    /// Hex encoded Ed25519 key used to verify interaction requests.
    #[serde(default)]
    pub public_key: Option<String>,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: String::new(),
            bot_token: String::new(),
            public_key: None,
            api_base: default_api_base(),
        }
    }
}

impl fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("redirect_uri", &self.redirect_uri)
            .field("bot_token", &"[REDACTED]")
            .field("public_key", &self.public_key)
            .field("api_base", &self.api_base)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { db_path: default_db_path() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeepaliveConfig {
    /// `0` disables the self ping.
    #[serde(default = "default_keepalive_interval")]
    pub interval_secs: u64,
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self { interval_secs: default_keepalive_interval() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpClientConfig {
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self { timeout_secs: default_timeout() }
    }
}

fn default_api_base() -> String { DEFAULT_API_BASE.to_string() }
fn default_db_path() -> PathBuf { PathBuf::from("./db.json") }
fn default_keepalive_interval() -> u64 { 300 }
fn default_timeout() -> u64 { 15 }

pub fn load_from_file(path: &str) -> Result<AppConfig, ConfigError> {
    let content = std::fs::read_to_string(path)
        .map_err(|source| ConfigError::Io { path: path.to_string(), source })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse { path: path.to_string(), source })
}

impl AppConfig {
    /// Read `CONFIG_PATH` (default `config.toml`) if present, overlay the
    /// process environment, then validate.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        let mut cfg = if std::path::Path::new(&path).exists() {
            load_from_file(&path)?
        } else {
            AppConfig::default()
        };
        cfg.apply_env(|key| std::env::var(key).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Overlay values from an environment lookup. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("CLIENT_ID") { self.discord.client_id = v; }
        if let Some(v) = get("CLIENT_SECRET") { self.discord.client_secret = v; }
        if let Some(v) = get("REDIRECT_URI") { self.discord.redirect_uri = v; }
        if let Some(v) = get("BOT_TOKEN") { self.discord.bot_token = v; }
        if let Some(v) = get("DISCORD_PUBLIC_KEY") { self.discord.public_key = Some(v); }
        if let Some(v) = get("DISCORD_API_BASE") { self.discord.api_base = v; }
        if let Some(v) = get("EXTERNAL_URL") { self.external_url = v; }
        if let Some(v) = get("HOST") { self.server.host = v; }
        if let Some(v) = get("PORT") { self.server.port = parse_num("PORT", &v)?; }
        if let Some(v) = get("DB_PATH") { self.storage.db_path = PathBuf::from(v); }
        if let Some(v) = get("KEEPALIVE_INTERVAL_SECS") {
            self.keepalive.interval_secs = parse_num("KEEPALIVE_INTERVAL_SECS", &v)?;
        }
        if let Some(v) = get("HTTP_TIMEOUT_SECS") {
            self.http.timeout_secs = parse_num("HTTP_TIMEOUT_SECS", &v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("CLIENT_ID", &self.discord.client_id),
            ("CLIENT_SECRET", &self.discord.client_secret),
            ("REDIRECT_URI", &self.discord.redirect_uri),
            ("BOT_TOKEN", &self.discord.bot_token),
            ("EXTERNAL_URL", &self.external_url),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingEnvVar(name));
            }
        }
        self.server.validate()?;
        if self.http.timeout_secs == 0 {
            return Err(ConfigError::Invalid("HTTP_TIMEOUT_SECS must be >= 1".into()));
        }
        Ok(())
    }
}

impl ServerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Invalid("PORT must be in 1..=65535".into()));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let host = if self.host.trim().is_empty() { "0.0.0.0" } else { self.host.trim() };
        format!("{}:{}", host, self.port)
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("bind address {host}:{}: {e}", self.port)))
    }
}

impl KeepaliveConfig {
    pub fn interval(&self) -> Duration { Duration::from_secs(self.interval_secs) }
}

impl HttpClientConfig {
    pub fn timeout(&self) -> Duration { Duration::from_secs(self.timeout_secs) }
}

fn parse_num<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{name} is not a valid number: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn full_env() -> HashMap<String, String> {
        env(&[
            ("CLIENT_ID", "123"),
            ("CLIENT_SECRET", "shh"),
            ("REDIRECT_URI", "http://localhost:3000/callback"),
            ("BOT_TOKEN", "bot-token"),
            ("EXTERNAL_URL", "https://example.com/welcome"),
        ])
    }

    #[test]
    fn env_overlay_fills_required_fields() {
        let vars = full_env();
        let mut cfg = AppConfig::default();
        cfg.apply_env(|k| vars.get(k).cloned()).unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.discord.client_id, "123");
        assert_eq!(cfg.external_url, "https://example.com/welcome");
        assert_eq!(cfg.server.port, 3000);
        assert_eq!(cfg.storage.db_path, PathBuf::from("./db.json"));
        assert_eq!(cfg.discord.api_base, DEFAULT_API_BASE);
        assert_eq!(cfg.keepalive.interval(), Duration::from_secs(300));
    }

    #[test]
    fn missing_required_value_is_reported_by_name() {
        let mut vars = full_env();
        vars.remove("BOT_TOKEN");
        let mut cfg = AppConfig::default();
        cfg.apply_env(|k| vars.get(k).cloned()).unwrap();
        match cfg.validate() {
            Err(ConfigError::MissingEnvVar(name)) => assert_eq!(name, "BOT_TOKEN"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn port_and_intervals_are_parsed() {
        let mut vars = full_env();
        vars.insert("PORT".into(), "8088".into());
        vars.insert("KEEPALIVE_INTERVAL_SECS".into(), "0".into());
        vars.insert("HOST".into(), "127.0.0.1".into());
        let mut cfg = AppConfig::default();
        cfg.apply_env(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(cfg.server.bind_addr().unwrap().to_string(), "127.0.0.1:8088");
        assert!(cfg.keepalive.interval().is_zero());
    }

    #[test]
    fn bad_port_is_rejected() {
        let mut vars = full_env();
        vars.insert("PORT".into(), "http".into());
        let mut cfg = AppConfig::default();
        assert!(matches!(cfg.apply_env(|k| vars.get(k).cloned()), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn toml_file_provides_defaults_env_wins() {
        let path = std::env::temp_dir().join(format!("joinbot_cfg_{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            "external_url = \"https://from-file\"\n[server]\nhost = \"127.0.0.1\"\nport = 9000\n[storage]\ndb_path = \"data/users.json\"\n",
        )
        .unwrap();
        let mut cfg = load_from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.storage.db_path, PathBuf::from("data/users.json"));

        let vars = full_env();
        cfg.apply_env(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.external_url, "https://example.com/welcome");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn debug_output_hides_secrets() {
        let vars = full_env();
        let mut cfg = AppConfig::default();
        cfg.apply_env(|k| vars.get(k).cloned()).unwrap();
        let printed = format!("{:?}", cfg.discord);
        assert!(!printed.contains("shh"));
        assert!(!printed.contains("bot-token"));
    }
}
