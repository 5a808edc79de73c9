//! Archiva Core Library
//!
//! Configuration, error types and domain records shared by the Archiva
//! document-management crates.

pub mod config;
pub mod error;
pub mod types;

pub use config::{ArchivaConfig, DirectoryConfig, ProvisioningConfig, ServerType};
pub use error::{Error, Result};

/// Archiva version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default port for plain `ldap://` connections
pub const DEFAULT_LDAP_PORT: u16 = 389;

/// Default port for `ldaps://` connections
pub const DEFAULT_LDAPS_PORT: u16 = 636;
