//! SMTP routing configuration.
//!
//! Bound from the `SMTP` section of an application settings document, or from
//! `SMTP_*` environment variables. Keys are PascalCase to stay compatible with
//! existing settings files:
//!
//! ```yaml
//! SMTP:
//!   Sender: noreply@example.com
//!   FriendlyName: Build Bot
//!   SendActive: true
//!   Host: { HostName: smtp.example.com, Port: 587, UserName: bot, Password: s3cret, EnableSsl: true }
//!   DebugActive: false
//!   DebugTag: QA
//!   DebugHost: { HostName: localhost, Port: 1025 }
//!   MaxMessageSizeInMb: 10
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Name of the settings section holding the routing configuration.
pub const SECTION: &str = "SMTP";

const ENV_PREFIX: &str = "SMTP_";

/// Which configured endpoint a transmission targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointRole {
    Primary,
    Debug,
}

impl fmt::Display for EndpointRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointRole::Primary => f.write_str("primary"),
            EndpointRole::Debug => f.write_str("debug"),
        }
    }
}

/// One mail-transport destination.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Endpoint {
    pub host_name: String,
    pub port: u16,
    pub user_name: String,
    #[serde(skip_serializing)]
    pub password: SecretString,
    pub enable_ssl: bool,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            host_name: String::new(),
            port: 0,
            user_name: String::new(),
            password: SecretString::new(String::new()),
            enable_ssl: false,
        }
    }
}

impl Endpoint {
    pub fn new(host_name: impl Into<String>, port: u16) -> Self {
        Self {
            host_name: host_name.into(),
            port,
            ..Default::default()
        }
    }

    pub fn with_credentials(mut self, user_name: impl Into<String>, password: impl Into<String>) -> Self {
        self.user_name = user_name.into();
        self.password = SecretString::new(password.into());
        self
    }

    pub fn with_ssl(mut self, enable_ssl: bool) -> Self {
        self.enable_ssl = enable_ssl;
        self
    }
}

/// Routing flags, sender identity and endpoints, read-only after load.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RoutingConfig {
    pub sender: String,
    pub friendly_name: String,
    pub send_active: bool,
    pub host: Option<Endpoint>,
    pub debug_active: bool,
    pub debug_tag: Option<String>,
    pub debug_host: Option<Endpoint>,
    pub max_message_size_in_mb: u32,
}

impl RoutingConfig {
    /// Binds an already parsed `SMTP` section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when a key holds a value of the wrong type.
    pub fn from_section(section: &serde_json::Value) -> Result<Self, ConfigError> {
        Self::deserialize(section).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Reads a JSON or YAML settings document and binds its `SMTP` section.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read, has an unknown extension, does not
    /// parse, or has no `SMTP` section.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        let document: serde_json::Value = match extension.as_deref() {
            Some("json") => {
                serde_json::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))?
            }
            Some("yaml" | "yml") => {
                serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))?
            }
            _ => return Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        };

        let section = document
            .get(SECTION)
            .ok_or(ConfigError::MissingSection(SECTION))?;
        Self::from_section(section)
    }

    /// Load routing configuration from `SMTP_*` environment variables
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for flags or numbers that do not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for flags or numbers that do not parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvReader { lookup };

        Ok(Self {
            sender: env.string("SENDER").unwrap_or_default(),
            friendly_name: env.string("FRIENDLY_NAME").unwrap_or_default(),
            send_active: env.parsed("SEND_ACTIVE")?.unwrap_or(false),
            host: env.endpoint("")?,
            debug_active: env.parsed("DEBUG_ACTIVE")?.unwrap_or(false),
            debug_tag: env.string("DEBUG_TAG"),
            debug_host: env.endpoint("DEBUG_")?,
            max_message_size_in_mb: env.parsed("MAX_MESSAGE_SIZE_IN_MB")?.unwrap_or(0),
        })
    }

    /// Debug tag, treating an empty string as unset.
    pub fn active_debug_tag(&self) -> Option<&str> {
        self.debug_tag.as_deref().filter(|tag| !tag.is_empty())
    }

    pub fn endpoint(&self, role: EndpointRole) -> Option<&Endpoint> {
        match role {
            EndpointRole::Primary => self.host.as_ref(),
            EndpointRole::Debug => self.debug_host.as_ref(),
        }
    }

    /// Size cap in bytes, `None` when unlimited.
    pub fn max_message_bytes(&self) -> Option<usize> {
        match self.max_message_size_in_mb {
            0 => None,
            mb => usize::try_from(mb)
                .ok()
                .and_then(|mb| mb.checked_mul(1024 * 1024)),
        }
    }
}

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, key: &str) -> Option<String> {
        (self.lookup)(&format!("{ENV_PREFIX}{key}"))
    }

    fn parsed<T: FromStr>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        match self.string(key) {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .to_ascii_lowercase()
                .parse()
                .map(Some)
                .map_err(|_| ConfigError::InvalidValue {
                    key: format!("{ENV_PREFIX}{key}"),
                    value: raw,
                }),
        }
    }

    fn endpoint(&self, prefix: &str) -> Result<Option<Endpoint>, ConfigError> {
        let Some(host_name) = self.string(&format!("{prefix}HOST_NAME")) else {
            return Ok(None);
        };

        Ok(Some(Endpoint {
            host_name,
            port: self.parsed(&format!("{prefix}PORT"))?.unwrap_or(0),
            user_name: self.string(&format!("{prefix}USER_NAME")).unwrap_or_default(),
            password: SecretString::new(self.string(&format!("{prefix}PASSWORD")).unwrap_or_default()),
            enable_ssl: self.parsed(&format!("{prefix}ENABLE_SSL"))?.unwrap_or(false),
        }))
    }
}
