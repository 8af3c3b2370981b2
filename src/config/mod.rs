use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Base URL used when building links in outgoing email
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            data_dir: default_data_dir(),
            public_url: default_public_url(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_public_url() -> String {
    "http://localhost:8000".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Every registered email must end with this suffix
    #[serde(default = "default_email_domain_suffix")]
    pub email_domain_suffix: String,
    /// Seconds an unverified registration is kept before it is discarded
    #[serde(default = "default_pending_registration_ttl")]
    pub pending_registration_ttl_secs: u64,
    /// Interval of the background purge of expired registrations
    #[serde(default = "default_pending_cleanup_interval")]
    pub pending_cleanup_interval_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            email_domain_suffix: default_email_domain_suffix(),
            pending_registration_ttl_secs: default_pending_registration_ttl(),
            pending_cleanup_interval_secs: default_pending_cleanup_interval(),
        }
    }
}

fn default_email_domain_suffix() -> String {
    ".edu".to_string()
}

fn default_pending_registration_ttl() -> u64 {
    24 * 60 * 60
}

fn default_pending_cleanup_interval() -> u64 {
    600
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    /// Implicit TLS (usually port 465)
    #[serde(default)]
    pub smtp_tls: bool,
    /// Upgrade a plain connection with STARTTLS; ignored when `smtp_tls` is set
    #[serde(default = "default_smtp_starttls")]
    pub smtp_starttls: bool,
    pub from_address: Option<String>,
    #[serde(default = "default_from_name")]
    pub from_name: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: None,
            smtp_port: default_smtp_port(),
            smtp_username: None,
            smtp_password: None,
            smtp_tls: false,
            smtp_starttls: default_smtp_starttls(),
            from_address: None,
            from_name: default_from_name(),
        }
    }
}

impl EmailConfig {
    pub fn is_configured(&self) -> bool {
        self.smtp_host.is_some() && self.from_address.is_some()
    }
}

fn default_smtp_port() -> u16 {
    587
}

fn default_smtp_starttls() -> bool {
    true
}

fn default_from_name() -> String {
    "Peerly".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            email: EmailConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::parse(&content)?
        } else {
            info!("No config file found, using defaults");
            Config::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).with_context(|| "Failed to parse configuration file")
    }

    /// `MAIL_USER` doubles as the sender address, matching the old `.env` layout.
    fn apply_env_overrides(&mut self) {
        if let Ok(user) = std::env::var("MAIL_USER") {
            if self.email.from_address.is_none() {
                self.email.from_address = Some(user.clone());
            }
            self.email.smtp_username = Some(user);
        }
        if let Ok(pass) = std::env::var("MAIL_PASS") {
            self.email.smtp_password = Some(pass);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_sections_missing() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.auth.email_domain_suffix, ".edu");
        assert_eq!(config.auth.pending_registration_ttl_secs, 86_400);
        assert!(!config.email.is_configured());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_sections_keep_field_defaults() {
        let config = Config::parse(
            r#"
            [server]
            port = 9100

            [email]
            smtp_host = "smtp.example.edu"
            from_address = "noreply@example.edu"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.email.smtp_port, 587);
        assert!(config.email.is_configured());
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(Config::parse("[server\nport = ").is_err());
    }
}
