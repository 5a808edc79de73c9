//! Access right descriptors
//!
//! Read-only pairs of a principal (user or group) and the access mode it
//! holds. They are built by whatever computes effective access and cannot be
//! used to change access rights.

use super::{LocalGroup, LocalUser};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ============================================================================
// Access Modes
// ============================================================================

/// Access levels, ordered from least to most privileged
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    /// No access
    None,
    /// Read documents and folders
    Read,
    /// Read and modify documents and folders
    ReadWrite,
    /// Full control including access management
    All,
    /// Administrative access
    Admin,
}

impl FromStr for AccessMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(AccessMode::None),
            "read" => Ok(AccessMode::Read),
            "readwrite" | "read_write" => Ok(AccessMode::ReadWrite),
            "all" => Ok(AccessMode::All),
            "admin" => Ok(AccessMode::Admin),
            _ => Err(format!("Invalid access mode: {}", s)),
        }
    }
}

impl std::fmt::Display for AccessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessMode::None => write!(f, "none"),
            AccessMode::Read => write!(f, "read"),
            AccessMode::ReadWrite => write!(f, "readwrite"),
            AccessMode::All => write!(f, "all"),
            AccessMode::Admin => write!(f, "admin"),
        }
    }
}

impl AccessMode {
    pub fn is_admin(&self) -> bool {
        matches!(self, AccessMode::Admin)
    }
}

// ============================================================================
// Descriptors
// ============================================================================

/// Access right held by a single user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserAccess<'a> {
    user: &'a LocalUser,
    mode: AccessMode,
}

impl<'a> UserAccess<'a> {
    pub fn new(user: &'a LocalUser, mode: AccessMode) -> Self {
        Self { user, mode }
    }

    pub fn user(&self) -> &'a LocalUser {
        self.user
    }

    pub fn user_id(&self) -> &'a str {
        &self.user.id
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    pub fn is_admin(&self) -> bool {
        self.mode.is_admin()
    }
}

/// Access right held by a group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupAccess<'a> {
    group: &'a LocalGroup,
    mode: AccessMode,
}

impl<'a> GroupAccess<'a> {
    pub fn new(group: &'a LocalGroup, mode: AccessMode) -> Self {
        Self { group, mode }
    }

    pub fn group(&self) -> &'a LocalGroup {
        self.group
    }

    pub fn group_id(&self) -> &'a str {
        &self.group.id
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    pub fn is_admin(&self) -> bool {
        self.mode.is_admin()
    }
}
