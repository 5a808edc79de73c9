//! In-process directory server and user store used by the unit tests

use crate::ldap::client::{DirectoryConnection, DirectoryConnector, LDAP_PROTOCOL_VERSION};
use crate::ldap::types::{DirectoryEntry, DirectoryError};
use archiva_core::types::{LocalGroup, LocalUser, NewUser};
use archiva_core::{Error, Result};
use archiva_metadata::UserStore;
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};

// ============================================================================
// Fake directory
// ============================================================================

#[derive(Debug, Clone)]
pub struct FakeAccount {
    pub login: String,
    pub password: String,
    /// Names accepted by bind: the DN plus any aliases such as a UPN
    pub bind_names: Vec<String>,
    /// Whether the account matches the configured extra search filter
    pub matches_filter: bool,
    pub entry: DirectoryEntry,
}

impl FakeAccount {
    pub fn new(login: &str, dn: &str, password: &str) -> Self {
        Self {
            login: login.to_string(),
            password: password.to_string(),
            bind_names: vec![dn.to_string()],
            matches_filter: true,
            entry: DirectoryEntry::new(dn),
        }
    }

    pub fn attribute(mut self, name: &str, values: &[&str]) -> Self {
        self.entry = self.entry.with_attribute(name, values.iter().copied());
        self
    }

    pub fn alias(mut self, name: &str) -> Self {
        self.bind_names.push(name.to_string());
        self
    }

    /// Exists in the directory but cannot be found by searching
    pub fn unsearchable(mut self) -> Self {
        self.matches_filter = false;
        self.entry.dn.clear();
        self
    }

    pub fn outside_filter(mut self) -> Self {
        self.matches_filter = false;
        self
    }
}

#[derive(Debug, Clone)]
pub enum SearchFault {
    Protocol(u32),
    Transport,
}

#[derive(Debug, Default)]
pub struct FakeState {
    pub accounts: Vec<FakeAccount>,
    pub service: Option<(String, String)>,
    pub allow_anonymous: bool,
    pub refuse_connect: bool,
    pub search_fault: Option<SearchFault>,

    pub connects: usize,
    pub closes: usize,
    pub binds: Vec<Option<String>>,
    pub searches: Vec<String>,
    pub referrals_disabled: bool,
}

#[derive(Clone, Default)]
pub struct FakeDirectory {
    state: Arc<Mutex<FakeState>>,
}

impl FakeDirectory {
    pub fn new() -> Self {
        let dir = Self::default();
        dir.state().allow_anonymous = true;
        dir
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn with_account(self, account: FakeAccount) -> Self {
        self.state().accounts.push(account);
        self
    }

    pub fn bound_names(&self) -> Vec<Option<String>> {
        self.state().binds.clone()
    }
}

#[async_trait]
impl DirectoryConnector for FakeDirectory {
    async fn connect(
        &self,
        host: &str,
        port: Option<u16>,
    ) -> std::result::Result<Box<dyn DirectoryConnection>, DirectoryError> {
        let mut state = self.state();
        if state.refuse_connect {
            return Err(DirectoryError::Connect {
                url: crate::ldap::client::server_url(host, port),
                message: "connection refused".to_string(),
            });
        }
        state.connects += 1;

        Ok(Box::new(FakeConnection {
            state: self.state.clone(),
            protocol: None,
        }))
    }
}

struct FakeConnection {
    state: Arc<Mutex<FakeState>>,
    protocol: Option<u8>,
}

impl FakeConnection {
    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }
}

#[async_trait]
impl DirectoryConnection for FakeConnection {
    fn set_protocol_version(&mut self, version: u8) -> std::result::Result<(), DirectoryError> {
        if version != LDAP_PROTOCOL_VERSION {
            return Err(DirectoryError::Protocol(format!("version {}", version)));
        }
        self.protocol = Some(version);
        Ok(())
    }

    fn disable_referrals(&mut self) {
        self.state().referrals_disabled = true;
    }

    async fn bind(
        &mut self,
        dn: Option<&str>,
        password: Option<&str>,
    ) -> std::result::Result<bool, DirectoryError> {
        if self.protocol.is_none() {
            return Err(DirectoryError::Protocol("bind before version".into()));
        }

        let mut state = self.state();
        state.binds.push(dn.map(str::to_string));

        let Some(dn) = dn else {
            return Ok(state.allow_anonymous);
        };
        let password = password.unwrap_or("");

        if let Some((service_dn, service_pw)) = &state.service {
            if service_dn == dn && service_pw == password {
                return Ok(true);
            }
        }

        Ok(state
            .accounts
            .iter()
            .any(|a| a.bind_names.iter().any(|n| n == dn) && a.password == password))
    }

    async fn search(
        &mut self,
        _base_dn: &str,
        filter: &str,
    ) -> std::result::Result<Vec<DirectoryEntry>, DirectoryError> {
        let mut state = self.state();
        state.searches.push(filter.to_string());

        match state.search_fault {
            Some(SearchFault::Protocol(code)) => {
                return Err(DirectoryError::Search {
                    code,
                    message: "refused".to_string(),
                })
            }
            Some(SearchFault::Transport) => {
                return Err(DirectoryError::Transport("connection reset".to_string()))
            }
            None => {}
        }

        let compound = filter.starts_with("(&");
        Ok(state
            .accounts
            .iter()
            .filter(|a| !a.entry.dn.is_empty())
            .filter(|a| filter.contains(&format!("={})", a.login)))
            .filter(|a| !compound || a.matches_filter)
            .map(|a| a.entry.clone())
            .collect())
    }

    async fn close(&mut self) {
        self.state().closes += 1;
    }
}

// ============================================================================
// In-memory user store
// ============================================================================

#[derive(Debug, Default)]
struct StoreState {
    users: Vec<LocalUser>,
    groups: Vec<LocalGroup>,
    members: Vec<(String, String)>,
    mutations: usize,
    failing: bool,
}

/// User store that counts every mutating call
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap()
    }

    fn check(&self) -> Result<MutexGuard<'_, StoreState>> {
        let state = self.state();
        if state.failing {
            return Err(Error::DatabaseError("database is locked".to_string()));
        }
        Ok(state)
    }

    /// Seed a user without counting a mutation
    pub fn insert_user(&self, login: &str, full_name: &str, email: &str) -> LocalUser {
        let user = LocalUser::new(NewUser {
            login: login.to_string(),
            full_name: full_name.to_string(),
            email: email.to_string(),
            ..Default::default()
        });
        self.state().users.push(user.clone());
        user
    }

    pub fn user(&self, login: &str) -> Option<LocalUser> {
        self.state().users.iter().find(|u| u.login == login).cloned()
    }

    pub fn user_count(&self) -> usize {
        self.state().users.len()
    }

    pub fn group_names_of(&self, user_id: &str) -> Vec<String> {
        let state = self.state();
        let mut names: Vec<String> = state
            .members
            .iter()
            .filter(|(u, _)| u == user_id)
            .filter_map(|(_, g)| state.groups.iter().find(|group| &group.id == g))
            .map(|g| g.name.clone())
            .collect();
        names.sort();
        names
    }

    pub fn group_comment(&self, name: &str) -> Option<String> {
        self.state()
            .groups
            .iter()
            .find(|g| g.name == name)
            .map(|g| g.comment.clone())
    }

    pub fn mutations(&self) -> usize {
        self.state().mutations
    }

    pub fn reset_mutations(&self) {
        self.state().mutations = 0;
    }

    pub fn set_failing(&self, failing: bool) {
        self.state().failing = failing;
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn get_user_by_login(&self, login: &str) -> Result<Option<LocalUser>> {
        let state = self.check()?;
        Ok(state.users.iter().find(|u| u.login == login).cloned())
    }

    async fn add_user(&self, user: NewUser) -> Result<LocalUser> {
        let mut state = self.check()?;
        if state.users.iter().any(|u| u.login == user.login) {
            return Err(Error::DatabaseError(format!("duplicate login {}", user.login)));
        }
        let user = LocalUser::new(user);
        state.users.push(user.clone());
        state.mutations += 1;
        Ok(user)
    }

    async fn set_full_name(&self, user_id: &str, full_name: &str) -> Result<()> {
        let mut state = self.check()?;
        let user = state
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| Error::NoSuchUser(user_id.to_string()))?;
        user.full_name = full_name.to_string();
        state.mutations += 1;
        Ok(())
    }

    async fn set_email(&self, user_id: &str, email: &str) -> Result<()> {
        let mut state = self.check()?;
        let user = state
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| Error::NoSuchUser(user_id.to_string()))?;
        user.email = email.to_string();
        state.mutations += 1;
        Ok(())
    }

    async fn get_group_by_name(&self, name: &str) -> Result<Option<LocalGroup>> {
        let state = self.check()?;
        Ok(state.groups.iter().find(|g| g.name == name).cloned())
    }

    async fn add_group(&self, name: &str, comment: &str) -> Result<LocalGroup> {
        let mut state = self.check()?;
        let group = LocalGroup::new(name, comment);
        state.groups.push(group.clone());
        state.mutations += 1;
        Ok(group)
    }

    async fn user_groups(&self, user_id: &str) -> Result<Vec<LocalGroup>> {
        let state = self.check()?;
        Ok(state
            .members
            .iter()
            .filter(|(u, _)| u == user_id)
            .filter_map(|(_, g)| state.groups.iter().find(|group| &group.id == g).cloned())
            .collect())
    }

    async fn join_group(&self, user_id: &str, group_id: &str) -> Result<()> {
        let mut state = self.check()?;
        let pair = (user_id.to_string(), group_id.to_string());
        if !state.members.contains(&pair) {
            state.members.push(pair);
        }
        state.mutations += 1;
        Ok(())
    }

    async fn leave_group(&self, user_id: &str, group_id: &str) -> Result<()> {
        let mut state = self.check()?;
        state
            .members
            .retain(|(u, g)| !(u == user_id && g == group_id));
        state.mutations += 1;
        Ok(())
    }
}
