//! Metadata storage for Archiva
//!
//! Local users, groups and group memberships. Currently supports a SQLite
//! backend.

pub mod repository;
pub mod traits;

pub use repository::MetadataStore;
pub use traits::*;
