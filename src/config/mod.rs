//! Configuration management for the mailer
//!
//! Sender credentials are read from the environment once per process and
//! cached in [`sender_info`]. Logging options live in [`LogConfig`].

use crate::error::MailError;
use anyhow::{Context, Result};
use std::env;
use std::fmt;

/// Environment variable holding the SMTP username (also the From address)
pub const ENV_USERNAME: &str = "EMAIL_USER";
/// Environment variable holding the SMTP password
pub const ENV_PASSWORD: &str = "EMAIL_PASSWORD";
/// Environment variable holding the SMTP server host
pub const ENV_SERVER: &str = "EMAIL_SERVER";
/// Environment variable holding the SMTP server port
pub const ENV_PORT: &str = "EMAIL_PORT";

lazy_static::lazy_static! {
    /// Process-wide sender credentials, populated on first access
    static ref SENDER_INFO: CredentialSet = {
        let creds = CredentialSet::from_env();
        tracing::debug!(
            username = %creds.username,
            server = %creds.address(),
            "Loaded sender credentials from environment"
        );
        creds
    };
}

/// Returns the sender credentials read from the environment.
///
/// The first call reads `EMAIL_USER`, `EMAIL_PASSWORD`, `EMAIL_SERVER` and
/// `EMAIL_PORT`; every later call returns the same cached record, even if
/// the environment has changed since. Missing variables become empty
/// strings. This never fails.
pub fn sender_info() -> &'static CredentialSet {
    &SENDER_INFO
}

/// SMTP sender credentials
#[derive(Clone, PartialEq, Eq, Default)]
pub struct CredentialSet {
    /// SMTP username, also used as the envelope From address
    pub username: String,
    /// SMTP password (never logged)
    pub password: String,
    /// SMTP server host
    pub server_host: String,
    /// SMTP server port, kept as text until send time
    pub port: String,
}

impl CredentialSet {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        server_host: impl Into<String>,
        port: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            server_host: server_host.into(),
            port: port.into(),
        }
    }

    /// Read credentials from the environment without touching the cache
    pub fn from_env() -> Self {
        Self {
            username: env::var(ENV_USERNAME).unwrap_or_default(),
            password: env::var(ENV_PASSWORD).unwrap_or_default(),
            server_host: env::var(ENV_SERVER).unwrap_or_default(),
            port: env::var(ENV_PORT).unwrap_or_default(),
        }
    }

    /// Transport target as `host:port`
    pub fn address(&self) -> String {
        format!("{}:{}", self.server_host, self.port)
    }

    /// Parse the port into a number
    pub fn port_number(&self) -> Result<u16, MailError> {
        self.port
            .trim()
            .parse()
            .map_err(|_| MailError::InvalidPort(self.port.clone()))
    }

    /// Check that the fields needed to open a session are present.
    ///
    /// The password may be empty; the server decides whether that is
    /// acceptable.
    pub fn validate(&self) -> Result<(), MailError> {
        if self.server_host.trim().is_empty() {
            return Err(MailError::CredentialMissing(ENV_SERVER));
        }
        if self.port.trim().is_empty() {
            return Err(MailError::CredentialMissing(ENV_PORT));
        }
        if self.username.trim().is_empty() {
            return Err(MailError::CredentialMissing(ENV_USERNAME));
        }
        Ok(())
    }
}

impl fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSet")
            .field("username", &self.username)
            .field("password", &"***")
            .field("server_host", &self.server_host)
            .field("port", &self.port)
            .finish()
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Output format, from `LOG_FORMAT`
    pub format: LogFormat,
    /// Filter directives used when `RUST_LOG` is not set
    pub default_filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            default_filter: "smtp_mailer=info".to_string(),
        }
    }
}

impl LogConfig {
    /// Load logging configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let format = match env::var("LOG_FORMAT") {
            Ok(value) => parse_log_format(&value).context("Invalid LOG_FORMAT")?,
            Err(_) => LogFormat::Pretty,
        };

        Ok(Self {
            format,
            ..Self::default()
        })
    }
}

fn parse_log_format(value: &str) -> Result<LogFormat> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "pretty" | "text" => Ok(LogFormat::Pretty),
        "json" => Ok(LogFormat::Json),
        other => anyhow::bail!("expected `pretty` or `json`, got `{}`", other),
    }
}
