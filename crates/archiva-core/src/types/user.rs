//! User and group types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user record held by the local store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalUser {
    pub id: String,
    pub login: String,
    /// Absent for users authenticated against a directory
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub full_name: String,
    pub email: String,
    pub language: String,
    pub theme: String,
    pub comment: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl LocalUser {
    pub fn new(new_user: NewUser) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            login: new_user.login,
            password_hash: new_user.password_hash,
            full_name: new_user.full_name,
            email: new_user.email,
            language: new_user.language,
            theme: new_user.theme,
            comment: new_user.comment,
            is_admin: false,
            created_at: Utc::now(),
        }
    }
}

/// Fields required to create a [`LocalUser`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewUser {
    pub login: String,
    pub password_hash: Option<String>,
    pub full_name: String,
    pub email: String,
    pub language: String,
    pub theme: String,
    pub comment: String,
}

/// A group record held by the local store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalGroup {
    pub id: String,
    pub name: String,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

impl LocalGroup {
    pub fn new(name: impl Into<String>, comment: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            comment: comment.into(),
            created_at: Utc::now(),
        }
    }
}
