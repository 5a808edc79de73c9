//! LDAP/Active Directory authentication module
//!
//! Provides directory authentication via:
//! - LDAP (OpenLDAP, 389 Directory Server)
//! - Microsoft Active Directory
//!
//! Features:
//! - Two-phase bind (DN discovery, then password verification)
//! - Local user provisioning from directory attributes
//! - Group membership synchronization
//! - TLS/STARTTLS support

mod authenticator;
mod client;
pub mod dn;
mod sync;
mod types;

#[cfg(test)]
mod testing;

pub use authenticator::{DirectoryAuthenticator, USER_CREATED_COMMENT};
pub use client::{
    escape_filter_value, server_url, DirectoryConnection, DirectoryConnector, LdapConnection,
    LdapConnector, LDAP_PROTOCOL_VERSION,
};
pub use sync::{group_names, GroupSyncReport, GroupSynchronizer, GROUP_CREATED_COMMENT};
pub use types::*;
