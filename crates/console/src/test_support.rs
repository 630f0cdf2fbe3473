//! Test state: in-memory SQLite audit trail and a scripted directory.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use stockroom_ad_sync::client::DirectoryClient;
use stockroom_core::config::StockroomConfig;
use stockroom_core::db::sqlite::SqliteRepository;
use stockroom_core::db::DatabasePool;
use stockroom_core::error::{Result, StockroomError};
use stockroom_core::models::directory::{DirectoryMembership, DirectoryUser};

use crate::AppState;

pub const TARGET_DN: &str = "CN=John Doe,OU=Staff,DC=acme,DC=local";

pub fn group_dn(cn: &str) -> String {
    format!("CN={cn},OU=Groups,DC=acme,DC=local")
}

#[derive(Default)]
pub struct ScriptedDirectory {
    users: HashMap<String, DirectoryMembership>,
    failing: HashSet<String>,
    unreachable: bool,
    pub edits: Mutex<Vec<String>>,
}

impl ScriptedDirectory {
    pub fn acme() -> Self {
        let mut users = HashMap::new();
        users.insert(
            "jsmith".to_string(),
            DirectoryMembership {
                user: DirectoryUser {
                    username: "jsmith".to_string(),
                    display_name: "Jane Smith".to_string(),
                    dn: Some("CN=Jane Smith,OU=Staff,DC=acme,DC=local".to_string()),
                },
                groups: vec![group_dn("VPN"), group_dn("Finance"), group_dn("Domain Admins")],
            },
        );
        users.insert(
            "jdoe".to_string(),
            DirectoryMembership {
                user: DirectoryUser {
                    username: "jdoe".to_string(),
                    display_name: "John Doe".to_string(),
                    dn: Some(TARGET_DN.to_string()),
                },
                groups: vec![group_dn("VPN"), group_dn("Interns")],
            },
        );
        Self {
            users,
            ..Self::default()
        }
    }

    pub fn failing_on(mut self, group_dn: &str) -> Self {
        self.failing.insert(group_dn.to_lowercase());
        self
    }

    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    fn reachable(&self) -> Result<()> {
        if self.unreachable {
            return Err(StockroomError::DirectoryUnavailable(
                "LDAP connect failed: connection refused".into(),
            ));
        }
        Ok(())
    }

    fn edit(&self, tag: String, group_dn: &str) -> Result<()> {
        self.reachable()?;
        self.edits.lock().unwrap().push(tag);
        if self.failing.contains(&group_dn.to_lowercase()) {
            return Err(StockroomError::Directory("insufficient access rights".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl DirectoryClient for ScriptedDirectory {
    async fn test_connection(&self) -> Result<()> {
        self.reachable()
    }

    async fn search_users(&self, query: &str, limit: usize) -> Result<Vec<DirectoryUser>> {
        self.reachable()?;
        let needle = query.to_lowercase();
        let mut users: Vec<DirectoryUser> = self
            .users
            .values()
            .filter(|m| {
                m.user.username.contains(&needle)
                    || m.user.display_name.to_lowercase().contains(&needle)
            })
            .map(|m| m.user.clone())
            .collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        users.truncate(limit);
        Ok(users)
    }

    async fn find_user(&self, username: &str) -> Result<Option<DirectoryMembership>> {
        self.reachable()?;
        Ok(self.users.get(&username.to_lowercase()).cloned())
    }

    async fn add_user_to_group(&self, group_dn: &str, _user_dn: &str) -> Result<()> {
        self.edit(format!("ADD:{group_dn}"), group_dn)
    }

    async fn remove_user_from_group(&self, group_dn: &str, _user_dn: &str) -> Result<()> {
        self.edit(format!("REMOVE:{group_dn}"), group_dn)
    }
}

pub async fn test_state() -> Arc<AppState> {
    test_state_with(ScriptedDirectory::acme()).await
}

pub async fn test_state_with(directory: ScriptedDirectory) -> Arc<AppState> {
    let pool = DatabasePool::new_sqlite_memory().await.unwrap();
    let repo = match pool {
        DatabasePool::Sqlite(p) => SqliteRepository::new(p),
    };
    let config = StockroomConfig::generate_default();
    Arc::new(AppState::new(Arc::new(repo), Arc::new(directory), config))
}

pub async fn get_body(response: axum::http::Response<Body>) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}
