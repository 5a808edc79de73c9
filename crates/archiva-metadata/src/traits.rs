//! User store trait
//!
//! Defines the interface the authentication layer uses to read and reconcile
//! local user and group records.

use archiva_core::types::{LocalGroup, LocalUser, NewUser};
use archiva_core::Result;
use async_trait::async_trait;

/// Local user and group storage
#[async_trait]
pub trait UserStore: Send + Sync {
    // ============= User Operations =============

    /// Look up a user by login name. `Ok(None)` means no such user.
    async fn get_user_by_login(&self, login: &str) -> Result<Option<LocalUser>>;
    async fn add_user(&self, user: NewUser) -> Result<LocalUser>;
    async fn set_full_name(&self, user_id: &str, full_name: &str) -> Result<()>;
    async fn set_email(&self, user_id: &str, email: &str) -> Result<()>;

    // ============= Group Operations =============

    async fn get_group_by_name(&self, name: &str) -> Result<Option<LocalGroup>>;
    async fn add_group(&self, name: &str, comment: &str) -> Result<LocalGroup>;

    // ============= Membership Operations =============

    /// Groups the user currently belongs to
    async fn user_groups(&self, user_id: &str) -> Result<Vec<LocalGroup>>;

    /// Add the user to a group. Joining a group twice is a no-op.
    async fn join_group(&self, user_id: &str, group_id: &str) -> Result<()>;

    /// Remove the user from a group. Leaving a group the user is not in is a no-op.
    async fn leave_group(&self, user_id: &str, group_id: &str) -> Result<()>;
}
