//! Group synchronization
//!
//! Local group membership mirrors the groups listed in the directory entry:
//! groups missing from the directory are left, listed groups are joined and
//! created when they do not exist yet.

use crate::ldap::dn::leading_rdn_value;
use archiva_core::types::LocalUser;
use archiva_core::Result;
use archiva_metadata::UserStore;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Comment stored on groups created during synchronization
pub const GROUP_CREATED_COMMENT: &str = "Added during LDAP Authentication";

/// Store mutations performed by one synchronization run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupSyncReport {
    pub joined: usize,
    pub left: usize,
    pub created: usize,
}

impl GroupSyncReport {
    pub fn is_noop(&self) -> bool {
        self.joined == 0 && self.left == 0 && self.created == 0
    }
}

/// Group names from a list of group DNs, first occurrence order, duplicates
/// and unparseable DNs dropped
pub fn group_names<S: AsRef<str>>(group_dns: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut names = Vec::new();

    for dn in group_dns {
        let dn = dn.as_ref();
        match leading_rdn_value(dn) {
            Ok(name) if name.is_empty() => {
                warn!(dn = %dn, "Skipping group DN with empty name");
            }
            Ok(name) => {
                if seen.insert(name.clone()) {
                    names.push(name);
                }
            }
            Err(e) => {
                warn!(dn = %dn, error = %e, "Skipping unparseable group DN");
            }
        }
    }

    names
}

pub struct GroupSynchronizer {
    store: Arc<dyn UserStore>,
}

impl GroupSynchronizer {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Make the user's local groups match `group_dns`
    pub async fn sync<S: AsRef<str> + Sync>(
        &self,
        user: &LocalUser,
        group_dns: &[S],
    ) -> Result<GroupSyncReport> {
        let wanted = group_names(group_dns);
        let wanted_set: HashSet<&str> = wanted.iter().map(String::as_str).collect();
        let mut report = GroupSyncReport::default();

        let current = self.store.user_groups(&user.id).await?;
        let mut member_of: HashSet<String> = HashSet::new();

        for group in current {
            if wanted_set.contains(group.name.as_str()) {
                member_of.insert(group.name);
            } else {
                self.store.leave_group(&user.id, &group.id).await?;
                debug!(user = %user.login, group = %group.name, "Left group");
                report.left += 1;
            }
        }

        for name in &wanted {
            if member_of.contains(name) {
                continue;
            }

            let group = match self.store.get_group_by_name(name).await? {
                Some(group) => group,
                None => {
                    let group = self.store.add_group(name, GROUP_CREATED_COMMENT).await?;
                    info!(group = %name, "Created group from directory");
                    report.created += 1;
                    group
                }
            };

            self.store.join_group(&user.id, &group.id).await?;
            debug!(user = %user.login, group = %name, "Joined group");
            report.joined += 1;
        }

        if !report.is_noop() {
            info!(
                user = %user.login,
                joined = report.joined,
                left = report.left,
                created = report.created,
                "Synchronized directory groups"
            );
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ldap::testing::MemoryStore;

    fn dns(names: &[&str]) -> Vec<String> {
        names
            .iter()
            .map(|n| format!("CN={},OU=groups,DC=example,DC=org", n))
            .collect()
    }

    async fn setup(initial: &[&str]) -> (Arc<MemoryStore>, LocalUser) {
        let store = Arc::new(MemoryStore::default());
        let user = store.insert_user("jdoe", "John Doe", "jdoe@example.org");
        for name in initial {
            let group = store.add_group(name, "").await.unwrap();
            store.join_group(&user.id, &group.id).await.unwrap();
        }
        store.reset_mutations();
        (store, user)
    }

    #[test]
    fn test_group_names_dedup_in_order() {
        let input = vec![
            "CN=b,OU=groups,DC=example,DC=org".to_string(),
            "CN=a,OU=groups,DC=example,DC=org".to_string(),
            "cn=b,ou=other,dc=example,dc=org".to_string(),
            "not a dn".to_string(),
            r"CN=Smith\, John,OU=groups,DC=example,DC=org".to_string(),
            "CN=#0C036f7073,OU=groups,DC=example,DC=org".to_string(),
            "CN=#02012A,OU=groups,DC=example,DC=org".to_string(),
        ];

        assert_eq!(group_names(&input), vec!["b", "a", "Smith, John", "ops"]);
    }

    #[tokio::test]
    async fn test_sync_mirrors_directory() {
        let (store, user) = setup(&["A", "B", "C"]).await;
        let sync = GroupSynchronizer::new(store.clone());

        let report = sync.sync(&user, &dns(&["B", "C", "D"])).await.unwrap();

        assert_eq!(store.group_names_of(&user.id), vec!["B", "C", "D"]);
        assert_eq!(
            report,
            GroupSyncReport {
                joined: 1,
                left: 1,
                created: 1
            }
        );
        assert_eq!(
            store.group_comment("D").as_deref(),
            Some(GROUP_CREATED_COMMENT)
        );
    }

    #[tokio::test]
    async fn test_sync_is_idempotent() {
        let (store, user) = setup(&["A"]).await;
        let sync = GroupSynchronizer::new(store.clone());
        let input = dns(&["B", "C", "B"]);

        sync.sync(&user, &input).await.unwrap();
        let after_first = store.group_names_of(&user.id);
        store.reset_mutations();

        let report = sync.sync(&user, &input).await.unwrap();

        assert!(report.is_noop());
        assert_eq!(store.mutations(), 0);
        assert_eq!(store.group_names_of(&user.id), after_first);
    }

    #[tokio::test]
    async fn test_sync_joins_existing_group_without_creating() {
        let (store, user) = setup(&[]).await;
        store.add_group("editors", "managed locally").await.unwrap();
        store.reset_mutations();

        let report = GroupSynchronizer::new(store.clone())
            .sync(&user, &dns(&["editors"]))
            .await
            .unwrap();

        assert_eq!(report.created, 0);
        assert_eq!(report.joined, 1);
        assert_eq!(store.group_comment("editors").as_deref(), Some("managed locally"));
    }

    #[tokio::test]
    async fn test_empty_directory_list_leaves_everything() {
        let (store, user) = setup(&["A", "B"]).await;

        let report = GroupSynchronizer::new(store.clone())
            .sync::<String>(&user, &[])
            .await
            .unwrap();

        assert_eq!(report.left, 2);
        assert!(store.group_names_of(&user.id).is_empty());
    }
}
