//! Metadata repository

use archiva_core::types::{LocalGroup, LocalUser, NewUser};
use archiva_core::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use crate::traits::UserStore;

type UserRow = (
    String,
    String,
    Option<String>,
    String,
    String,
    String,
    String,
    String,
    bool,
    String,
);

type GroupRow = (String, String, String, String);

const USER_COLUMNS: &str =
    "id, login, password_hash, full_name, email, language, theme, comment, is_admin, created_at";

pub struct MetadataStore {
    pool: SqlitePool,
}

impl MetadataStore {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| Error::DatabaseError(e.to_string()))?;

        let store = Self { pool };
        store.init().await?;

        info!("Metadata store ready at {}", database_url);
        Ok(store)
    }

    /// Private in-memory database, mostly for tests and dry runs
    pub async fn in_memory() -> Result<Self> {
        // every pooled connection would otherwise open its own empty database
        Self::new("sqlite::memory:", 1).await
    }

    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                login TEXT UNIQUE NOT NULL,
                password_hash TEXT,
                full_name TEXT NOT NULL DEFAULT '',
                email TEXT NOT NULL DEFAULT '',
                language TEXT NOT NULL DEFAULT '',
                theme TEXT NOT NULL DEFAULT '',
                comment TEXT NOT NULL DEFAULT '',
                is_admin INTEGER DEFAULT 0,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| Error::DatabaseError(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS groups (
                id TEXT PRIMARY KEY,
                name TEXT UNIQUE NOT NULL,
                comment TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| Error::DatabaseError(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS group_members (
                group_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                PRIMARY KEY (group_id, user_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| Error::DatabaseError(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_group_members_user ON group_members(user_id)
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| Error::DatabaseError(e.to_string()))?;

        Ok(())
    }

    // User operations
    pub async fn create_user(&self, user: &LocalUser) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, login, password_hash, full_name, email, language, theme, comment, is_admin, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.login)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(&user.email)
        .bind(&user.language)
        .bind(&user.theme)
        .bind(&user.comment)
        .bind(user.is_admin)
        .bind(user.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| Error::DatabaseError(e.to_string()))?;

        debug!("Created user: {}", user.login);
        Ok(())
    }

    pub async fn get_user_by_login(&self, login: &str) -> Result<Option<LocalUser>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {} FROM users WHERE login = ?", USER_COLUMNS))
                .bind(login)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| Error::DatabaseError(e.to_string()))?;

        row.map(user_from_row).transpose()
    }

    pub async fn list_users(&self) -> Result<Vec<LocalUser>> {
        let rows: Vec<UserRow> =
            sqlx::query_as(&format!("SELECT {} FROM users ORDER BY login", USER_COLUMNS))
                .fetch_all(&self.pool)
                .await
                .map_err(|e| Error::DatabaseError(e.to_string()))?;

        rows.into_iter().map(user_from_row).collect()
    }

    async fn update_user_column(&self, user_id: &str, column: &str, value: &str) -> Result<()> {
        let result = sqlx::query(&format!("UPDATE users SET {} = ? WHERE id = ?", column))
            .bind(value)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(Error::NoSuchUser(user_id.to_string()));
        }

        debug!("Updated {} of user {}", column, user_id);
        Ok(())
    }

    // Group operations
    pub async fn create_group(&self, group: &LocalGroup) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO groups (id, name, comment, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&group.id)
        .bind(&group.name)
        .bind(&group.comment)
        .bind(group.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| Error::DatabaseError(e.to_string()))?;

        debug!("Created group: {}", group.name);
        Ok(())
    }

    pub async fn get_group_by_name(&self, name: &str) -> Result<Option<LocalGroup>> {
        let row: Option<GroupRow> = sqlx::query_as(
            r#"
            SELECT id, name, comment, created_at FROM groups WHERE name = ?
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::DatabaseError(e.to_string()))?;

        row.map(group_from_row).transpose()
    }

    pub async fn get_user_groups(&self, user_id: &str) -> Result<Vec<LocalGroup>> {
        let rows: Vec<GroupRow> = sqlx::query_as(
            r#"
            SELECT g.id, g.name, g.comment, g.created_at
            FROM groups g
            JOIN group_members m ON m.group_id = g.id
            WHERE m.user_id = ?
            ORDER BY g.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::DatabaseError(e.to_string()))?;

        rows.into_iter().map(group_from_row).collect()
    }

    pub async fn add_member(&self, user_id: &str, group_id: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO group_members (group_id, user_id) VALUES (?, ?)
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::DatabaseError(e.to_string()))?;

        Ok(())
    }

    pub async fn remove_member(&self, user_id: &str, group_id: &str) -> Result<()> {
        sqlx::query(
            r#"
            DELETE FROM group_members WHERE group_id = ? AND user_id = ?
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::DatabaseError(e.to_string()))?;

        Ok(())
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::DatabaseError(format!("Invalid timestamp '{}': {}", value, e)))
}

fn user_from_row(r: UserRow) -> Result<LocalUser> {
    Ok(LocalUser {
        id: r.0,
        login: r.1,
        password_hash: r.2,
        full_name: r.3,
        email: r.4,
        language: r.5,
        theme: r.6,
        comment: r.7,
        is_admin: r.8,
        created_at: parse_timestamp(&r.9)?,
    })
}

fn group_from_row(r: GroupRow) -> Result<LocalGroup> {
    Ok(LocalGroup {
        id: r.0,
        name: r.1,
        comment: r.2,
        created_at: parse_timestamp(&r.3)?,
    })
}

// ============================================================================
// UserStore implementation
// ============================================================================

#[async_trait]
impl UserStore for MetadataStore {
    async fn get_user_by_login(&self, login: &str) -> Result<Option<LocalUser>> {
        MetadataStore::get_user_by_login(self, login).await
    }

    async fn add_user(&self, user: NewUser) -> Result<LocalUser> {
        let user = LocalUser::new(user);
        self.create_user(&user).await?;
        Ok(user)
    }

    async fn set_full_name(&self, user_id: &str, full_name: &str) -> Result<()> {
        self.update_user_column(user_id, "full_name", full_name).await
    }

    async fn set_email(&self, user_id: &str, email: &str) -> Result<()> {
        self.update_user_column(user_id, "email", email).await
    }

    async fn get_group_by_name(&self, name: &str) -> Result<Option<LocalGroup>> {
        MetadataStore::get_group_by_name(self, name).await
    }

    async fn add_group(&self, name: &str, comment: &str) -> Result<LocalGroup> {
        let group = LocalGroup::new(name, comment);
        self.create_group(&group).await?;
        Ok(group)
    }

    async fn user_groups(&self, user_id: &str) -> Result<Vec<LocalGroup>> {
        self.get_user_groups(user_id).await
    }

    async fn join_group(&self, user_id: &str, group_id: &str) -> Result<()> {
        self.add_member(user_id, group_id).await
    }

    async fn leave_group(&self, user_id: &str, group_id: &str) -> Result<()> {
        self.remove_member(user_id, group_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(login: &str) -> NewUser {
        NewUser {
            login: login.to_string(),
            password_hash: None,
            full_name: "Jane Roe".to_string(),
            email: "jane@example.org".to_string(),
            language: "en_GB".to_string(),
            theme: "bootstrap".to_string(),
            comment: "User was added from LDAP".to_string(),
        }
    }

    #[tokio::test]
    async fn test_user_roundtrip() {
        let store = MetadataStore::in_memory().await.unwrap();

        assert!(UserStore::get_user_by_login(&store, "jroe").await.unwrap().is_none());

        let created = store.add_user(new_user("jroe")).await.unwrap();
        let loaded = UserStore::get_user_by_login(&store, "jroe")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(loaded.id, created.id);
        assert_eq!(loaded.full_name, "Jane Roe");
        assert_eq!(loaded.password_hash, None);
        assert!(!loaded.is_admin);
    }

    #[tokio::test]
    async fn test_duplicate_login_rejected() {
        let store = MetadataStore::in_memory().await.unwrap();

        store.add_user(new_user("jroe")).await.unwrap();
        let err = store.add_user(new_user("jroe")).await.unwrap_err();
        assert!(matches!(err, Error::DatabaseError(_)));
    }

    #[tokio::test]
    async fn test_profile_updates() {
        let store = MetadataStore::in_memory().await.unwrap();
        let user = store.add_user(new_user("jroe")).await.unwrap();

        store.set_full_name(&user.id, "Jane Q. Roe").await.unwrap();
        store.set_email(&user.id, "jqr@example.org").await.unwrap();

        let loaded = store.get_user_by_login("jroe").await.unwrap().unwrap();
        assert_eq!(loaded.full_name, "Jane Q. Roe");
        assert_eq!(loaded.email, "jqr@example.org");

        let err = store.set_email("missing", "x@example.org").await.unwrap_err();
        assert!(matches!(err, Error::NoSuchUser(_)));
    }

    #[tokio::test]
    async fn test_group_membership() {
        let store = MetadataStore::in_memory().await.unwrap();
        let user = store.add_user(new_user("jroe")).await.unwrap();
        let editors = store.add_group("editors", "").await.unwrap();
        let readers = store.add_group("readers", "").await.unwrap();

        store.join_group(&user.id, &readers.id).await.unwrap();
        store.join_group(&user.id, &editors.id).await.unwrap();
        store.join_group(&user.id, &editors.id).await.unwrap();

        let names: Vec<String> = store
            .user_groups(&user.id)
            .await
            .unwrap()
            .into_iter()
            .map(|g| g.name)
            .collect();
        assert_eq!(names, vec!["editors", "readers"]);

        store.leave_group(&user.id, &editors.id).await.unwrap();
        store.leave_group(&user.id, &editors.id).await.unwrap();

        let groups = store.user_groups(&user.id).await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "readers");

        let found = UserStore::get_group_by_name(&store, "editors").await.unwrap();
        assert_eq!(found.map(|g| g.id), Some(editors.id));
    }

    #[tokio::test]
    async fn test_list_users_sorted() {
        let store = MetadataStore::in_memory().await.unwrap();
        store.add_user(new_user("zed")).await.unwrap();
        store.add_user(new_user("amy")).await.unwrap();

        let logins: Vec<String> = store
            .list_users()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.login)
            .collect();
        assert_eq!(logins, vec!["amy", "zed"]);
    }
}
