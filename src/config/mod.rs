//! Runtime configuration from the environment.
//!
//! Every setting is an environment variable. When the job runs as a Cloud
//! Foundry app, credentials usually arrive through bound services instead, so
//! `VCAP_SERVICES` is consulted for anything the environment leaves unset:
//!
//! 1. environment variables (highest priority)
//! 2. `credentials` of every bound service in `VCAP_SERVICES`, keys matched
//!    case-insensitively; a `sqlite:` `uri` credential stands in for
//!    `DATABASE_URL`, any other `uri` belongs to an unrelated service
//! 3. built-in defaults
//!
//! Values are validated lazily by mode-specific accessors. A health-check-only
//! process therefore starts without SMTP settings, and a dry run does not need
//! them either.
//!
//! | Variable        | Used by        | Default       |
//! |-----------------|----------------|---------------|
//! | `CF_API`        | [`Config::platform`] | required |
//! | `CLIENT_ID`     | [`Config::platform`] | required |
//! | `CLIENT_SECRET` | [`Config::platform`] | required |
//! | `INSECURE`      | [`Config::platform`] | off      |
//! | `SMTP_FROM`     | [`Config::smtp`]     | required |
//! | `SMTP_HOST`     | [`Config::smtp`]     | required |
//! | `SMTP_PORT`     | [`Config::smtp`]     | `25`     |
//! | `SMTP_USER`     | [`Config::smtp`]     | none     |
//! | `SMTP_PASS`     | [`Config::smtp`]     | none     |
//! | `SMTP_CERT`     | [`Config::smtp`]     | none     |
//! | `DATABASE_URL`  | [`Config::database`] | in-memory records |
//! | `TEMPLATE_DIR`  | [`Config::template_dir`] | `templates` |
//! | `PORT`          | [`Config::port`]     | `8080`   |

mod vcap;

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::constants::{DEFAULT_HTTP_PORT, DEFAULT_SMTP_PORT, DEFAULT_TEMPLATE_DIR};
use crate::core::ConfigError;

/// Every variable this job reads, apart from `VCAP_SERVICES`.
pub const VARIABLES: &[&str] = &[
    "CF_API",
    "CLIENT_ID",
    "CLIENT_SECRET",
    "INSECURE",
    "SMTP_FROM",
    "SMTP_HOST",
    "SMTP_PORT",
    "SMTP_USER",
    "SMTP_PASS",
    "SMTP_CERT",
    "DATABASE_URL",
    "TEMPLATE_DIR",
    "PORT",
];

/// Resolved configuration values.
#[derive(Clone, Default)]
pub struct Config {
    values: BTreeMap<&'static str, String>,
}

/// Platform API connection settings.
#[derive(Clone)]
pub struct PlatformConfig {
    /// API root, e.g. `https://api.fr.cloud.gov`
    pub api_address: String,
    /// OAuth2 client id
    pub client_id: String,
    /// OAuth2 client secret
    pub client_secret: String,
    /// Accept invalid TLS certificates
    pub skip_ssl_validation: bool,
}

impl fmt::Debug for PlatformConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformConfig")
            .field("api_address", &self.api_address)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("skip_ssl_validation", &self.skip_ssl_validation)
            .finish()
    }
}

/// SMTP settings.
#[derive(Clone)]
pub struct SmtpConfig {
    /// Sender address
    pub from: String,
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Login user, if the server requires authentication
    pub user: Option<String>,
    /// Login password
    pub password: Option<String>,
    /// PEM certificate to trust; enables implicit TLS
    pub cert: Option<String>,
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("from", &self.from)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("cert", &self.cert.is_some())
            .finish()
    }
}

/// Where freshness records are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    /// SQLite database file
    File(PathBuf),
    /// SQLite database that lives for the process only
    InMemory,
}

impl DatabaseLocation {
    /// Parse a `DATABASE_URL` value.
    ///
    /// Accepts `sqlite://path`, `sqlite:path`, `:memory:` and plain paths.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for any other URL scheme or an empty path.
    pub fn parse(url: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::Invalid {
            variable: "DATABASE_URL".to_string(),
            reason: reason.to_string(),
        };

        let path = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))
            .unwrap_or(url);

        if path == ":memory:" {
            return Ok(Self::InMemory);
        }
        if path.is_empty() {
            return Err(invalid("no database path given"));
        }
        if let Some((scheme, _)) = path.split_once("://") {
            return Err(invalid(&format!(
                "unsupported scheme '{scheme}'; use sqlite://<path>"
            )));
        }
        Ok(Self::File(PathBuf::from(path)))
    }
}

impl Config {
    /// Load from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::VcapServices`] if `VCAP_SERVICES` is set but is
    /// not valid JSON.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load through `lookup`, which returns the raw value of a variable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::VcapServices`] if `VCAP_SERVICES` is set but is
    /// not valid JSON.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut values = BTreeMap::new();
        for &name in VARIABLES {
            if let Some(value) = lookup(name).filter(|value| !value.trim().is_empty()) {
                values.insert(name, value);
            }
        }

        if let Some(raw) = lookup("VCAP_SERVICES").filter(|raw| !raw.trim().is_empty()) {
            let credentials = vcap::credentials(&raw)?;
            for &name in VARIABLES {
                if values.contains_key(name) {
                    continue;
                }
                if let Some(value) = credentials.get(name) {
                    values.insert(name, value.clone());
                }
            }
            if !values.contains_key("DATABASE_URL")
                && let Some(uri) = credentials.get("URI")
            {
                values.insert("DATABASE_URL", uri.clone());
            }
        }

        Ok(Self { values })
    }

    /// Raw value of `name`, if set.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Platform API settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] naming every absent required variable.
    pub fn platform(&self) -> Result<PlatformConfig, ConfigError> {
        let [api_address, client_id, client_secret] =
            self.require(["CF_API", "CLIENT_ID", "CLIENT_SECRET"])?;
        Ok(PlatformConfig {
            api_address,
            client_id,
            client_secret,
            skip_ssl_validation: self.flag("INSECURE"),
        })
    }

    /// SMTP settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] naming every absent required variable
    /// and [`ConfigError::Invalid`] for an unparseable `SMTP_PORT`.
    pub fn smtp(&self) -> Result<SmtpConfig, ConfigError> {
        let [from, host] = self.require(["SMTP_FROM", "SMTP_HOST"])?;
        Ok(SmtpConfig {
            from,
            host,
            port: self.parse_port("SMTP_PORT", DEFAULT_SMTP_PORT)?,
            user: self.get("SMTP_USER").map(str::to_string),
            password: self.get("SMTP_PASS").map(str::to_string),
            cert: self.get("SMTP_CERT").map(str::to_string),
        })
    }

    /// Freshness database location; `None` when no database is configured.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for an unsupported `DATABASE_URL`.
    pub fn database(&self) -> Result<Option<DatabaseLocation>, ConfigError> {
        self.get("DATABASE_URL").map(DatabaseLocation::parse).transpose()
    }

    /// Port of the health-check listener.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for an unparseable `PORT`.
    pub fn port(&self) -> Result<u16, ConfigError> {
        self.parse_port("PORT", DEFAULT_HTTP_PORT)
    }

    /// Directory holding the email templates.
    pub fn template_dir(&self) -> PathBuf {
        PathBuf::from(self.get("TEMPLATE_DIR").unwrap_or(DEFAULT_TEMPLATE_DIR))
    }

    fn require<const N: usize>(
        &self,
        names: [&'static str; N],
    ) -> Result<[String; N], ConfigError> {
        let missing: Vec<String> = names
            .iter()
            .filter(|name| self.get(name).is_none())
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Missing { variables: missing });
        }
        Ok(names.map(|name| self.get(name).unwrap_or_default().to_string()))
    }

    fn flag(&self, name: &str) -> bool {
        self.get(name)
            .is_some_and(|value| value == "1" || value.eq_ignore_ascii_case("true"))
    }

    fn parse_port(&self, name: &str, default: u16) -> Result<u16, ConfigError> {
        match self.get(name) {
            None => Ok(default),
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                variable: name.to_string(),
                reason: format!("'{raw}' is not a port number"),
            }),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.values.keys().collect();
        f.debug_struct("Config").field("set", &names).finish()
    }
}
