//! Directory authentication for Archiva

pub mod ldap;

pub use ldap::{
    AuthOutcome, AuthPhase, DirectoryAuthenticator, DirectoryConnection, DirectoryConnector,
    DirectoryEntry, DirectoryError, GroupSynchronizer, LdapConnector, RejectReason,
};
