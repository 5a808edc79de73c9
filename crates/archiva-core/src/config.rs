//! Configuration for Archiva

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArchivaConfig {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub ldap: DirectoryConfig,

    #[serde(default)]
    pub provisioning: ProvisioningConfig,
}

impl ArchivaConfig {
    pub fn from_file(path: &str) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::InternalError(format!("Failed to read config: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| crate::Error::InvalidConfig(format!("Failed to parse config: {}", e)))
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from `ARCHIVA_*` variables resolved through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("ARCHIVA_DATABASE_URL") {
            config.database.url = url;
        }
        if let Some(level) = lookup("ARCHIVA_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Some(format) = lookup("ARCHIVA_LOG_FORMAT") {
            config.logging.format = format;
        }

        // Directory from environment
        if let Some(host) = lookup("ARCHIVA_LDAP_HOST") {
            config.ldap.enabled = true;
            config.ldap.host = host;
        }
        if let Some(port) = lookup("ARCHIVA_LDAP_PORT") {
            if let Ok(p) = port.parse() {
                config.ldap.port = Some(p);
            }
        }
        if let Some(kind) = lookup("ARCHIVA_LDAP_TYPE") {
            match kind.parse() {
                Ok(server_type) => config.ldap.server_type = server_type,
                Err(e) => warn!("Ignoring ARCHIVA_LDAP_TYPE: {}", e),
            }
        }
        if let Some(base_dn) = lookup("ARCHIVA_LDAP_BASE_DN") {
            config.ldap.base_dn = base_dn;
        }
        if let Some(bind_dn) = lookup("ARCHIVA_LDAP_BIND_DN") {
            config.ldap.bind_dn = Some(bind_dn);
        }
        if let Some(password) = lookup("ARCHIVA_LDAP_BIND_PASSWORD") {
            config.ldap.bind_password = Some(password);
        }
        if let Some(filter) = lookup("ARCHIVA_LDAP_FILTER") {
            config.ldap.search_filter = Some(filter);
        }
        if let Some(attr) = lookup("ARCHIVA_LDAP_GROUP_ATTRIBUTE") {
            config.ldap.group_attribute = Some(attr);
        }
        if let Some(domain) = lookup("ARCHIVA_LDAP_ACCOUNT_DOMAIN") {
            config.ldap.account_domain = Some(domain);
        }
        if lookup("ARCHIVA_LDAP_RESTRICTED").map(|v| v == "true").unwrap_or(false) {
            config.ldap.restricted = true;
        }
        if lookup("ARCHIVA_LDAP_START_TLS").map(|v| v == "true").unwrap_or(false) {
            config.ldap.start_tls = true;
        }

        if let Some(language) = lookup("ARCHIVA_DEFAULT_LANGUAGE") {
            config.provisioning.default_language = language;
        }
        if let Some(theme) = lookup("ARCHIVA_DEFAULT_THEME") {
            config.provisioning.default_theme = theme;
        }

        config
    }

    pub fn validate(&self) -> crate::Result<()> {
        self.ldap.validate()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://archiva.db?mode=rwc".to_string(),
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Defaults applied to users created from directory entries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisioningConfig {
    #[serde(default = "default_language")]
    pub default_language: String,

    #[serde(default = "default_theme")]
    pub default_theme: String,
}

fn default_language() -> String {
    "en_GB".to_string()
}

fn default_theme() -> String {
    "bootstrap".to_string()
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            default_language: default_language(),
            default_theme: default_theme(),
        }
    }
}

/// Directory server flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServerType {
    /// Generic LDAP server (OpenLDAP, 389 Directory Server, ...)
    #[default]
    Ldap,
    /// Microsoft Active Directory
    #[serde(alias = "ad")]
    ActiveDirectory,
}

impl ServerType {
    /// Attribute holding the login name
    pub fn search_attribute(&self) -> &'static str {
        match self {
            ServerType::Ldap => "uid",
            ServerType::ActiveDirectory => "sAMAccountName",
        }
    }
}

impl FromStr for ServerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ldap" | "openldap" | "0" => Ok(ServerType::Ldap),
            "active_directory" | "ad" | "1" => Ok(ServerType::ActiveDirectory),
            _ => Err(format!("Invalid directory server type: {}", s)),
        }
    }
}

impl fmt::Display for ServerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerType::Ldap => write!(f, "ldap"),
            ServerType::ActiveDirectory => write!(f, "active_directory"),
        }
    }
}

/// LDAP/Active Directory Configuration Section
///
/// Empty strings in optional fields are treated the same as absent values,
/// so `search_filter = ""` in a config file disables the filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Enable directory authentication
    #[serde(default)]
    pub enabled: bool,

    /// Host name, or a full `ldap://` / `ldaps://` URL
    #[serde(default)]
    pub host: String,

    /// Port; the scheme default is used when absent
    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub server_type: ServerType,

    /// Subtree searched for user entries
    #[serde(default)]
    pub base_dn: String,

    /// Service account DN; anonymous bind when absent
    #[serde(default)]
    pub bind_dn: Option<String>,

    #[serde(default)]
    pub bind_password: Option<String>,

    /// Extra filter ANDed with the login attribute match, e.g. `(mail=*)`
    #[serde(default)]
    pub search_filter: Option<String>,

    /// Attribute listing group DNs, e.g. `memberOf`
    #[serde(default)]
    pub group_attribute: Option<String>,

    /// Account domain for `user@domain` binds (Active Directory only)
    #[serde(default)]
    pub account_domain: Option<String>,

    /// Never create local users from directory entries
    #[serde(default)]
    pub restricted: bool,

    /// Use STARTTLS
    #[serde(default)]
    pub start_tls: bool,

    /// Connection timeout in seconds
    #[serde(default = "default_ldap_timeout")]
    pub timeout_seconds: u64,
}

fn default_ldap_timeout() -> u64 {
    10
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: "localhost".to_string(),
            port: None,
            server_type: ServerType::default(),
            base_dn: String::new(),
            bind_dn: None,
            bind_password: None,
            search_filter: None,
            group_attribute: None,
            account_domain: None,
            restricted: false,
            start_tls: false,
            timeout_seconds: default_ldap_timeout(),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

impl DirectoryConfig {
    pub fn bind_dn(&self) -> Option<&str> {
        non_empty(&self.bind_dn)
    }

    pub fn bind_password(&self) -> Option<&str> {
        self.bind_password.as_deref()
    }

    pub fn search_filter(&self) -> Option<&str> {
        non_empty(&self.search_filter)
    }

    pub fn group_attribute(&self) -> Option<&str> {
        non_empty(&self.group_attribute)
    }

    pub fn account_domain(&self) -> Option<&str> {
        non_empty(&self.account_domain)
    }

    pub fn validate(&self) -> crate::Result<()> {
        if !self.enabled {
            return Ok(());
        }

        if self.host.trim().is_empty() {
            return Err(crate::Error::InvalidConfig("Directory host is required".into()));
        }

        if self.port == Some(0) {
            return Err(crate::Error::InvalidConfig("Directory port must not be 0".into()));
        }

        if self.base_dn.trim().is_empty() {
            return Err(crate::Error::InvalidConfig("Base DN is required".into()));
        }

        if self.timeout_seconds == 0 {
            return Err(crate::Error::InvalidConfig(
                "Directory timeout must be at least one second".into(),
            ));
        }

        if let Some(filter) = self.search_filter() {
            let filter = filter.trim();
            if !(filter.starts_with('(') && filter.ends_with(')')) {
                return Err(crate::Error::InvalidConfig(format!(
                    "Search filter must be parenthesized: {}",
                    filter
                )));
            }
        }

        if self.server_type == ServerType::ActiveDirectory && self.account_domain().is_none() {
            warn!("Active Directory configured without account_domain; direct binds by login are disabled");
        }

        Ok(())
    }
}
