//! In-memory directory and repository doubles shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use stockroom_core::db::repository::{GroupSyncAuditRepository, StockroomRepository};
use stockroom_core::error::{Result, StockroomError};
use stockroom_core::models::directory::{DirectoryMembership, DirectoryUser};
use stockroom_core::models::group_sync::SyncAuditRecord;

use crate::client::DirectoryClient;
use crate::dn::dn_key;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Add { group: String, user: String },
    Remove { group: String, user: String },
}

/// Directory double. Membership edits succeed unless the group DN is listed in `failing`.
#[derive(Default)]
pub struct MockDirectory {
    pub users: Mutex<HashMap<String, DirectoryMembership>>,
    pub failing: Mutex<HashSet<String>>,
    pub slow: Mutex<HashSet<String>>,
    pub unreachable: Mutex<bool>,
    pub calls: Mutex<Vec<Call>>,
    pub searches: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl MockDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, username: &str, display: &str, groups: &[&str]) -> Self {
        let membership = DirectoryMembership {
            user: DirectoryUser {
                username: username.to_string(),
                display_name: display.to_string(),
                dn: Some(user_dn(display)),
            },
            groups: groups.iter().map(|g| g.to_string()).collect(),
        };
        self.users
            .lock()
            .unwrap()
            .insert(username.to_lowercase(), membership);
        self
    }

    pub fn fail_on(self, group_dn: &str) -> Self {
        self.failing.lock().unwrap().insert(dn_key(group_dn));
        self
    }

    pub fn slow_on(self, group_dn: &str) -> Self {
        self.slow.lock().unwrap().insert(dn_key(group_dn));
        self
    }

    pub fn unreachable(self) -> Self {
        self.go_offline();
        self
    }

    /// Make every later call fail as if the directory went away.
    pub fn go_offline(&self) {
        *self.unreachable.lock().unwrap() = true;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    async fn edit(&self, call: Call, group_dn: &str) -> Result<()> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.calls.lock().unwrap().push(call);

        let slow = self.slow.lock().unwrap().contains(&dn_key(group_dn));
        if slow {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        } else {
            tokio::task::yield_now().await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(&dn_key(group_dn)) {
            return Err(StockroomError::Directory(format!(
                "insufficient access rights on {group_dn}"
            )));
        }
        Ok(())
    }

    fn check_reachable(&self) -> Result<()> {
        if *self.unreachable.lock().unwrap() {
            return Err(StockroomError::DirectoryUnavailable(
                "LDAP connect failed: connection refused".into(),
            ));
        }
        Ok(())
    }
}

pub fn user_dn(display: &str) -> String {
    format!("CN={display},OU=Staff,DC=acme,DC=local")
}

pub fn group_dn(cn: &str) -> String {
    format!("CN={cn},OU=Groups,DC=acme,DC=local")
}

#[async_trait]
impl DirectoryClient for MockDirectory {
    async fn test_connection(&self) -> Result<()> {
        self.check_reachable()
    }

    async fn search_users(&self, query: &str, limit: usize) -> Result<Vec<DirectoryUser>> {
        self.check_reachable()?;
        self.searches.lock().unwrap().push(query.to_string());
        let needle = query.to_lowercase();
        let mut users: Vec<DirectoryUser> = self
            .users
            .lock()
            .unwrap()
            .values()
            .filter(|m| {
                m.user.username.to_lowercase().contains(&needle)
                    || m.user.display_name.to_lowercase().contains(&needle)
            })
            .map(|m| m.user.clone())
            .collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        users.truncate(limit);
        Ok(users)
    }

    async fn find_user(&self, username: &str) -> Result<Option<DirectoryMembership>> {
        self.check_reachable()?;
        Ok(self
            .users
            .lock()
            .unwrap()
            .get(&username.to_lowercase())
            .cloned())
    }

    async fn add_user_to_group(&self, group_dn: &str, user_dn: &str) -> Result<()> {
        self.check_reachable()?;
        let call = Call::Add {
            group: group_dn.to_string(),
            user: user_dn.to_string(),
        };
        self.edit(call, group_dn).await
    }

    async fn remove_user_from_group(&self, group_dn: &str, user_dn: &str) -> Result<()> {
        self.check_reachable()?;
        let call = Call::Remove {
            group: group_dn.to_string(),
            user: user_dn.to_string(),
        };
        self.edit(call, group_dn).await
    }
}

/// Audit repository double keeping records in memory.
#[derive(Default)]
pub struct MockRepo {
    pub records: Mutex<Vec<SyncAuditRecord>>,
    pub fail_writes: bool,
}

impl MockRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            fail_writes: true,
        }
    }

    pub fn records(&self) -> Vec<SyncAuditRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl GroupSyncAuditRepository for MockRepo {
    async fn record_group_sync(&self, record: &SyncAuditRecord) -> Result<String> {
        if self.fail_writes {
            return Err(StockroomError::Audit("disk I/O error".into()));
        }
        let mut records = self.records.lock().unwrap();
        let id = format!("rec-{}", records.len() + 1);
        let mut stored = record.clone();
        stored.id = Some(id.clone());
        records.push(stored);
        Ok(id)
    }

    async fn get_group_sync(&self, id: &str) -> Result<Option<SyncAuditRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id.as_deref() == Some(id))
            .cloned())
    }

    async fn list_group_syncs(&self, limit: i64) -> Result<Vec<SyncAuditRecord>> {
        let records = self.records.lock().unwrap();
        Ok(records.iter().rev().take(limit as usize).cloned().collect())
    }

    async fn list_group_syncs_for_user(
        &self,
        username: &str,
        limit: i64,
    ) -> Result<Vec<SyncAuditRecord>> {
        let records = self.records.lock().unwrap();
        Ok(records
            .iter()
            .rev()
            .filter(|r| {
                r.from_user.eq_ignore_ascii_case(username)
                    || r.to_user.eq_ignore_ascii_case(username)
            })
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

impl StockroomRepository for MockRepo {}
