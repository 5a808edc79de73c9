//! Directory authentication types
//!
//! - Directory entries returned by searches
//! - Transport errors
//! - Authentication outcomes and phases

use archiva_core::types::LocalUser;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

// ============================================================================
// Directory Entry
// ============================================================================

/// A search result: the entry's DN and its attributes.
///
/// Attribute names are matched case-insensitively, as LDAP attribute
/// descriptions are.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub dn: String,
    pub attributes: HashMap<String, Vec<String>>,
}

impl DirectoryEntry {
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes
            .insert(name.into(), values.into_iter().map(Into::into).collect());
        self
    }

    /// All values of an attribute, in directory order
    pub fn values(&self, name: &str) -> Option<&[String]> {
        self.attributes
            .get(name)
            .or_else(|| {
                self.attributes
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(name))
                    .map(|(_, values)| values)
            })
            .map(Vec::as_slice)
    }

    /// First value of an attribute
    pub fn first(&self, name: &str) -> Option<&str> {
        self.values(name)
            .and_then(|v| v.first())
            .map(|s| s.as_str())
    }

    pub fn has_attributes(&self) -> bool {
        !self.attributes.is_empty()
    }
}

impl From<ldap3::SearchEntry> for DirectoryEntry {
    fn from(entry: ldap3::SearchEntry) -> Self {
        Self {
            dn: entry.dn,
            attributes: entry.attrs,
        }
    }
}

// ============================================================================
// Directory Errors
// ============================================================================

/// Faults raised by a directory connection.
///
/// A rejected bind is not an error; see [`DirectoryConnection::bind`](super::DirectoryConnection::bind).
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Failed to connect to directory server {url}: {message}")]
    Connect { url: String, message: String },

    #[error("Directory transport error: {0}")]
    Transport(String),

    #[error("Directory protocol error: {0}")]
    Protocol(String),

    #[error("Directory search failed with code {code}: {message}")]
    Search { code: u32, message: String },
}

impl DirectoryError {
    /// Protocol-level search failures carry no information about reachability
    pub fn is_search_failure(&self) -> bool {
        matches!(self, DirectoryError::Search { .. })
    }
}

impl From<ldap3::LdapError> for DirectoryError {
    fn from(err: ldap3::LdapError) -> Self {
        match err {
            ldap3::LdapError::FilterParsing => DirectoryError::Search {
                code: 87,
                message: "Invalid search filter".to_string(),
            },
            other => DirectoryError::Transport(other.to_string()),
        }
    }
}

impl From<DirectoryError> for archiva_core::Error {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::Connect { .. } => archiva_core::Error::DirectoryUnavailable(err.to_string()),
            other => archiva_core::Error::Directory(other.to_string()),
        }
    }
}

// ============================================================================
// Authentication Outcome
// ============================================================================

/// Why a login attempt produced no user. None of these are system faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// No directory entry and no usable fallback DN
    NotFound,
    /// The verification bind failed
    InvalidCredentials,
    /// Verified by the directory but no local user exists or could be provisioned
    NotProvisioned,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::NotFound => write!(f, "user not found in directory"),
            RejectReason::InvalidCredentials => write!(f, "invalid credentials"),
            RejectReason::NotProvisioned => write!(f, "no local user for directory account"),
        }
    }
}

/// Result of a directory login attempt
#[derive(Debug)]
pub enum AuthOutcome {
    /// Authenticated, possibly newly provisioned
    Authenticated(LocalUser),
    /// Ordinary refusal
    Rejected(RejectReason),
    /// Directory unreachable or local storage failure
    SystemError(archiva_core::Error),
}

impl AuthOutcome {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthOutcome::Authenticated(_))
    }

    pub fn user(&self) -> Option<&LocalUser> {
        match self {
            AuthOutcome::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    /// Collapse into `Ok(Some(user))`, `Ok(None)` for rejections, or the system error
    pub fn into_result(self) -> archiva_core::Result<Option<LocalUser>> {
        match self {
            AuthOutcome::Authenticated(user) => Ok(Some(user)),
            AuthOutcome::Rejected(_) => Ok(None),
            AuthOutcome::SystemError(err) => Err(err),
        }
    }
}

// ============================================================================
// Authentication Phases
// ============================================================================

/// Progress of a single authentication attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPhase {
    Init,
    Connected,
    DnDiscovered,
    UserVerified,
    Provisioned,
    Skipped,
}

impl fmt::Display for AuthPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuthPhase::Init => "init",
            AuthPhase::Connected => "connected",
            AuthPhase::DnDiscovered => "dn_discovered",
            AuthPhase::UserVerified => "user_verified",
            AuthPhase::Provisioned => "provisioned",
            AuthPhase::Skipped => "skipped",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_lookup_ignores_case() {
        let entry = DirectoryEntry::new("uid=jdoe,dc=example,dc=org")
            .with_attribute("memberOf", ["cn=a,dc=example", "cn=b,dc=example"])
            .with_attribute("cn", ["John Doe"]);

        assert_eq!(entry.values("memberof").map(|v| v.len()), Some(2));
        assert_eq!(entry.first("CN"), Some("John Doe"));
        assert_eq!(entry.first("mail"), None);
        assert!(entry.has_attributes());
        assert!(!DirectoryEntry::new("uid=x").has_attributes());
    }

    #[test]
    fn test_outcome_into_result() {
        assert!(matches!(
            AuthOutcome::Rejected(RejectReason::InvalidCredentials).into_result(),
            Ok(None)
        ));

        let err = AuthOutcome::SystemError(archiva_core::Error::DatabaseError("locked".into()))
            .into_result()
            .unwrap_err();
        assert_eq!(err.code(), "StorageError");
    }

    #[test]
    fn test_directory_error_conversion() {
        let err: archiva_core::Error = DirectoryError::Connect {
            url: "ldap://dc1:389".into(),
            message: "connection refused".into(),
        }
        .into();
        assert!(matches!(err, archiva_core::Error::DirectoryUnavailable(_)));

        let err: archiva_core::Error = DirectoryError::Transport("reset".into()).into();
        assert!(matches!(err, archiva_core::Error::Directory(_)));
    }
}
