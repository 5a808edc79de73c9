//! Directory authenticator
//!
//! Authenticates a login against LDAP or Active Directory with a two-phase
//! bind and reconciles the local user record:
//!
//! 1. Bind with the service account (or anonymously) and search for the
//!    user's DN, falling back to a DN built from the login when no search
//!    filter is configured.
//! 2. Bind as that DN with the supplied password.
//! 3. Unless restricted, create or update the local user from the directory
//!    entry and mirror its group memberships.
//!
//! Every attempt opens exactly one connection and closes it before returning.

use crate::ldap::client::{
    escape_filter_value, DirectoryConnection, DirectoryConnector, LDAP_PROTOCOL_VERSION,
};
use crate::ldap::dn::escape_dn_value;
use crate::ldap::sync::GroupSynchronizer;
use crate::ldap::types::{AuthOutcome, AuthPhase, DirectoryEntry, RejectReason};
use archiva_core::types::{LocalUser, NewUser};
use archiva_core::{DirectoryConfig, ProvisioningConfig, Result, ServerType};
use archiva_metadata::UserStore;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Comment stored on users created from a directory entry
pub const USER_CREATED_COMMENT: &str = "User was added from LDAP";

const FULL_NAME_ATTRIBUTE: &str = "cn";
const EMAIL_ATTRIBUTE: &str = "mail";

pub struct DirectoryAuthenticator {
    config: DirectoryConfig,
    provisioning: ProvisioningConfig,
    connector: Arc<dyn DirectoryConnector>,
    store: Arc<dyn UserStore>,
    groups: GroupSynchronizer,
}

impl DirectoryAuthenticator {
    pub fn new(
        config: DirectoryConfig,
        provisioning: ProvisioningConfig,
        connector: Arc<dyn DirectoryConnector>,
        store: Arc<dyn UserStore>,
    ) -> Self {
        Self {
            config,
            provisioning,
            connector,
            groups: GroupSynchronizer::new(store.clone()),
            store,
        }
    }

    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    /// Authenticate `username` with `password`
    pub async fn authenticate(&self, username: &str, password: &str) -> AuthOutcome {
        debug!(phase = %AuthPhase::Init, user = %username, "Starting directory authentication");

        if username.trim().is_empty() {
            debug!("Empty login rejected");
            return AuthOutcome::Rejected(RejectReason::NotFound);
        }

        let mut conn = match self
            .connector
            .connect(&self.config.host, self.config.port)
            .await
        {
            Ok(conn) => conn,
            Err(e) => {
                error!(host = %self.config.host, error = %e, "Directory server unreachable");
                return AuthOutcome::SystemError(e.into());
            }
        };
        debug!(phase = %AuthPhase::Connected, host = %self.config.host);

        let outcome = match self.run(conn.as_mut(), username, password).await {
            Ok(outcome) => outcome,
            Err(e) => AuthOutcome::SystemError(e),
        };

        conn.close().await;

        match &outcome {
            AuthOutcome::Authenticated(user) => {
                info!(user = %user.login, "Directory authentication succeeded");
            }
            AuthOutcome::Rejected(reason) => {
                info!(user = %username, reason = %reason, "Directory authentication rejected");
            }
            AuthOutcome::SystemError(e) => {
                warn!(user = %username, error = %e, code = e.code(), "Directory authentication failed");
            }
        }

        outcome
    }

    async fn run(
        &self,
        conn: &mut dyn DirectoryConnection,
        username: &str,
        password: &str,
    ) -> Result<AuthOutcome> {
        if self.config.server_type == ServerType::ActiveDirectory {
            conn.disable_referrals();
        }
        conn.set_protocol_version(LDAP_PROTOCOL_VERSION)?;

        let service_bound = conn
            .bind(self.config.bind_dn(), self.config.bind_password())
            .await?;

        let filter = self.user_filter(username);
        let mut user_dn = None;

        if service_bound {
            user_dn = self
                .search_entries(conn, &filter)
                .await?
                .into_iter()
                .next()
                .map(|entry| entry.dn);
        } else {
            warn!(
                bind_dn = self.config.bind_dn().unwrap_or("<anonymous>"),
                "Service bind refused, skipping DN discovery"
            );
        }

        // a configured filter is a policy: never bypass it with a guessed DN
        if user_dn.is_none() && self.config.search_filter().is_none() {
            user_dn = self.fallback_dn(username);
            if let Some(dn) = &user_dn {
                debug!(dn = %dn, "Using fallback DN");
            }
        }

        let Some(user_dn) = user_dn else {
            return Ok(AuthOutcome::Rejected(RejectReason::NotFound));
        };
        debug!(phase = %AuthPhase::DnDiscovered, dn = %user_dn);

        let local_user = self.store.get_user_by_login(username).await?;

        if password.is_empty() {
            debug!(dn = %user_dn, "Empty password rejected");
            return Ok(AuthOutcome::Rejected(RejectReason::InvalidCredentials));
        }

        if !conn.bind(Some(&user_dn), Some(password)).await? {
            return Ok(AuthOutcome::Rejected(RejectReason::InvalidCredentials));
        }
        debug!(phase = %AuthPhase::UserVerified, dn = %user_dn);

        let local_user = if self.config.restricted {
            debug!(phase = %AuthPhase::Skipped, "Provisioning disabled");
            local_user
        } else {
            self.provision(conn, username, &filter, local_user).await?
        };

        Ok(match local_user {
            Some(user) => AuthOutcome::Authenticated(user),
            None => AuthOutcome::Rejected(RejectReason::NotProvisioned),
        })
    }

    /// Create or refresh the local user from its directory entry and sync groups
    async fn provision(
        &self,
        conn: &mut dyn DirectoryConnection,
        username: &str,
        filter: &str,
        local_user: Option<LocalUser>,
    ) -> Result<Option<LocalUser>> {
        let entries = self.search_entries(conn, filter).await?;

        let entry = match entries.as_slice() {
            [entry] if entry.has_attributes() => entry,
            _ => {
                debug!(
                    entries = entries.len(),
                    "No single directory entry with attributes, leaving local user as is"
                );
                return Ok(local_user);
            }
        };

        let user = match local_user {
            Some(user) => self.update_user(user, entry).await?,
            None => self.create_user(username, entry).await?,
        };

        if let Some(attribute) = self.config.group_attribute() {
            match entry.values(attribute) {
                Some(group_dns) => {
                    self.groups.sync(&user, group_dns).await?;
                }
                None => debug!(attribute = %attribute, "Entry has no group attribute"),
            }
        }

        debug!(phase = %AuthPhase::Provisioned, user = %user.login);
        Ok(Some(user))
    }

    async fn create_user(&self, username: &str, entry: &DirectoryEntry) -> Result<LocalUser> {
        let full_name = entry
            .first(FULL_NAME_ATTRIBUTE)
            .filter(|name| !name.is_empty())
            .unwrap_or(username);
        let email = entry.first(EMAIL_ATTRIBUTE).unwrap_or_default();

        let user = self
            .store
            .add_user(NewUser {
                login: username.to_string(),
                password_hash: None,
                full_name: full_name.to_string(),
                email: email.to_string(),
                language: self.provisioning.default_language.clone(),
                theme: self.provisioning.default_theme.clone(),
                comment: USER_CREATED_COMMENT.to_string(),
            })
            .await?;

        info!(user = %user.login, dn = %entry.dn, "Provisioned local user from directory");
        Ok(user)
    }

    /// Write back only the attributes the directory holds and that changed
    async fn update_user(&self, mut user: LocalUser, entry: &DirectoryEntry) -> Result<LocalUser> {
        if let Some(full_name) = entry.first(FULL_NAME_ATTRIBUTE) {
            if !full_name.is_empty() && full_name != user.full_name {
                self.store.set_full_name(&user.id, full_name).await?;
                debug!(user = %user.login, "Updated full name from directory");
                user.full_name = full_name.to_string();
            }
        }

        if let Some(email) = entry.first(EMAIL_ATTRIBUTE) {
            if email != user.email {
                self.store.set_email(&user.id, email).await?;
                debug!(user = %user.login, "Updated email from directory");
                user.email = email.to_string();
            }
        }

        Ok(user)
    }

    /// Search the base DN. A search the server refuses finds nothing; transport
    /// faults propagate.
    async fn search_entries(
        &self,
        conn: &mut dyn DirectoryConnection,
        filter: &str,
    ) -> Result<Vec<DirectoryEntry>> {
        match conn.search(&self.config.base_dn, filter).await {
            Ok(entries) => Ok(entries),
            Err(e) if e.is_search_failure() => {
                debug!(filter = %filter, error = %e, "Directory search failed");
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// `(attr=login)`, or `(&(attr=login)<filter>)` when a search filter is configured
    pub fn user_filter(&self, username: &str) -> String {
        let attribute = self.config.server_type.search_attribute();
        let value = escape_filter_value(username);

        match self.config.search_filter() {
            Some(filter) => format!("(&({}={}){})", attribute, value, filter.trim()),
            None => format!("({}={})", attribute, value),
        }
    }

    /// DN to try when the search found nothing
    pub fn fallback_dn(&self, username: &str) -> Option<String> {
        match self.config.server_type {
            ServerType::Ldap => Some(format!(
                "uid={},{}",
                escape_dn_value(username),
                self.config.base_dn
            )),
            ServerType::ActiveDirectory => self
                .config
                .account_domain()
                .map(|domain| format!("{}@{}", username, domain)),
        }
    }
}
