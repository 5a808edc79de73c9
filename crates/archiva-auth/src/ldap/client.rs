//! LDAP Client implementation
//!
//! Handles LDAP connections, binds and searches. Supports LDAP, LDAPS (SSL)
//! and STARTTLS connections.

use crate::ldap::types::{DirectoryEntry, DirectoryError};
use archiva_core::{DirectoryConfig, DEFAULT_LDAPS_PORT, DEFAULT_LDAP_PORT};
use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry};
use std::time::Duration;
use tracing::{debug, warn};

/// The only protocol version spoken
pub const LDAP_PROTOCOL_VERSION: u8 = 3;

// Result codes (RFC 4511)
const RC_SUCCESS: u32 = 0;
const RC_SIZE_LIMIT_EXCEEDED: u32 = 4;
const RC_REFERRAL: u32 = 10;

/// Opens connections to a directory server
#[async_trait]
pub trait DirectoryConnector: Send + Sync {
    /// Connect without binding. `port: None` uses the scheme default.
    async fn connect(
        &self,
        host: &str,
        port: Option<u16>,
    ) -> Result<Box<dyn DirectoryConnection>, DirectoryError>;
}

/// A single open directory connection
#[async_trait]
pub trait DirectoryConnection: Send {
    /// Must be called with `3` before the first bind
    fn set_protocol_version(&mut self, version: u8) -> Result<(), DirectoryError>;

    /// Ignore referrals instead of failing searches on them (Active Directory)
    fn disable_referrals(&mut self);

    /// Anonymous bind when `dn` is `None`, simple bind otherwise.
    ///
    /// A bind the server refuses is `Ok(false)`; only transport faults are errors.
    async fn bind(&mut self, dn: Option<&str>, password: Option<&str>)
        -> Result<bool, DirectoryError>;

    /// Subtree search below `base_dn` returning all user attributes
    async fn search(
        &mut self,
        base_dn: &str,
        filter: &str,
    ) -> Result<Vec<DirectoryEntry>, DirectoryError>;

    /// Unbind and release the connection. Safe to call more than once.
    async fn close(&mut self);
}

/// Build the server URL from a configured host (bare name or URL) and port
pub fn server_url(host: &str, port: Option<u16>) -> String {
    let host = host.trim().trim_end_matches('/');
    let (scheme, authority) = match host.split_once("://") {
        Some((scheme, rest)) => (scheme.to_lowercase(), rest),
        None => ("ldap".to_string(), host),
    };

    let has_port = match authority.rfind(':') {
        Some(colon) => {
            authority.rfind(']').map_or(true, |bracket| colon > bracket)
                && authority[colon + 1..].parse::<u16>().is_ok()
        }
        None => false,
    };

    if has_port {
        return format!("{}://{}", scheme, authority);
    }

    let port = port.unwrap_or(if scheme == "ldaps" {
        DEFAULT_LDAPS_PORT
    } else {
        DEFAULT_LDAP_PORT
    });

    format!("{}://{}:{}", scheme, authority, port)
}

/// Escape a value for use inside a search filter (RFC 4515)
pub fn escape_filter_value(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '*' => out.push_str(r"\2a"),
            '(' => out.push_str(r"\28"),
            ')' => out.push_str(r"\29"),
            '\\' => out.push_str(r"\5c"),
            '\0' => out.push_str(r"\00"),
            c => out.push(c),
        }
    }
    out
}

// ============================================================================
// ldap3 implementation
// ============================================================================

/// Connector backed by `ldap3`
#[derive(Debug, Clone)]
pub struct LdapConnector {
    timeout: Duration,
    start_tls: bool,
}

impl LdapConnector {
    pub fn new(config: &DirectoryConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.timeout_seconds),
            start_tls: config.start_tls,
        }
    }
}

#[async_trait]
impl DirectoryConnector for LdapConnector {
    async fn connect(
        &self,
        host: &str,
        port: Option<u16>,
    ) -> Result<Box<dyn DirectoryConnection>, DirectoryError> {
        let url = server_url(host, port);
        let settings = LdapConnSettings::new()
            .set_conn_timeout(self.timeout)
            .set_starttls(self.start_tls);

        debug!(url = %url, "Connecting to directory server");

        let (conn, ldap) = LdapConnAsync::with_settings(settings, &url)
            .await
            .map_err(|e| DirectoryError::Connect {
                url: url.clone(),
                message: e.to_string(),
            })?;

        ldap3::drive!(conn);

        Ok(Box::new(LdapConnection {
            ldap,
            url,
            protocol_set: false,
            follow_referrals: true,
            closed: false,
        }))
    }
}

/// Connection handle created by [`LdapConnector`]
pub struct LdapConnection {
    ldap: Ldap,
    url: String,
    protocol_set: bool,
    follow_referrals: bool,
    closed: bool,
}

#[async_trait]
impl DirectoryConnection for LdapConnection {
    fn set_protocol_version(&mut self, version: u8) -> Result<(), DirectoryError> {
        if version != LDAP_PROTOCOL_VERSION {
            return Err(DirectoryError::Protocol(format!(
                "unsupported protocol version {}",
                version
            )));
        }
        self.protocol_set = true;
        Ok(())
    }

    fn disable_referrals(&mut self) {
        self.follow_referrals = false;
    }

    async fn bind(
        &mut self,
        dn: Option<&str>,
        password: Option<&str>,
    ) -> Result<bool, DirectoryError> {
        if !self.protocol_set {
            return Err(DirectoryError::Protocol(
                "protocol version must be set before binding".to_string(),
            ));
        }

        // an empty DN with an empty password is an anonymous simple bind
        let (dn, password) = match dn {
            Some(dn) => (dn, password.unwrap_or("")),
            None => ("", ""),
        };

        let result = self.ldap.simple_bind(dn, password).await?;

        if result.rc != RC_SUCCESS {
            debug!(dn = %dn, rc = result.rc, text = %result.text, "Bind refused");
            return Ok(false);
        }

        Ok(true)
    }

    async fn search(
        &mut self,
        base_dn: &str,
        filter: &str,
    ) -> Result<Vec<DirectoryEntry>, DirectoryError> {
        debug!(base_dn = %base_dn, filter = %filter, "Searching directory");

        let ldap3::SearchResult(rs, res) = self
            .ldap
            .search(base_dn, Scope::Subtree, filter, vec!["*"])
            .await?;

        match res.rc {
            RC_SUCCESS => {}
            RC_REFERRAL if !self.follow_referrals => {
                debug!(base_dn = %base_dn, "Ignoring referral");
            }
            RC_SIZE_LIMIT_EXCEEDED => {
                warn!(base_dn = %base_dn, "Size limit exceeded, using partial results");
            }
            rc => {
                return Err(DirectoryError::Search {
                    code: rc,
                    message: res.text,
                })
            }
        }

        let entries: Vec<DirectoryEntry> = rs
            .into_iter()
            // continuation references cannot be chased over this connection
            .filter(|entry| !entry.is_ref() && !entry.is_intermediate())
            .map(|entry| DirectoryEntry::from(SearchEntry::construct(entry)))
            .collect();

        debug!("Found {} entries", entries.len());
        Ok(entries)
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Err(e) = self.ldap.unbind().await {
            debug!(url = %self.url, error = %e, "Unbind failed");
        }
    }
}
