//! LDAP client wrapper for Active Directory group membership operations.

use std::collections::HashSet;

use async_trait::async_trait;
use ldap3::{
    ldap_escape, Ldap, LdapConnAsync, LdapConnSettings, LdapResult, Mod, ResultEntry, Scope,
    SearchEntry, SearchOptions, SearchResult,
};
use stockroom_core::config::DirectoryConfig;
use stockroom_core::error::{Result, StockroomError};
use stockroom_core::models::directory::{DirectoryMembership, DirectoryUser};
use tracing::{debug, info};

const USER_FILTER: &str = "(&(objectCategory=person)(objectClass=user))";

const RC_SUCCESS: u32 = 0;
const RC_SIZE_LIMIT_EXCEEDED: u32 = 4;

/// Directory operations needed by group compare & sync.
///
/// Every call stands alone: one failing never affects another.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Bind and unbind, failing with `DirectoryUnavailable` if the directory cannot be reached.
    async fn test_connection(&self) -> Result<()>;

    /// Users whose account name or display name contains `query`.
    async fn search_users(&self, query: &str, limit: usize) -> Result<Vec<DirectoryUser>>;

    /// Resolve a user by account name together with their group DNs.
    async fn find_user(&self, username: &str) -> Result<Option<DirectoryMembership>>;

    async fn add_user_to_group(&self, group_dn: &str, user_dn: &str) -> Result<()>;

    async fn remove_user_from_group(&self, group_dn: &str, user_dn: &str) -> Result<()>;
}

/// LDAP client for Active Directory.
pub struct AdClient {
    server: String,
    bind_dn: String,
    bind_password: String,
    base_dn: String,
    tls_verify: bool,
    /// Bounds the TCP connect and every bind or search after it.
    connect_timeout: std::time::Duration,
}

impl AdClient {
    /// Create a new AD client from connection configuration.
    pub fn new(config: &DirectoryConfig) -> Self {
        Self {
            server: config.server.clone(),
            bind_dn: config.bind_dn.clone(),
            bind_password: config.bind_password.clone(),
            base_dn: config.base_dn.clone(),
            tls_verify: config.tls_verify,
            connect_timeout: config.connect_timeout(),
        }
    }

    /// Return the configured base DN.
    pub fn base_dn(&self) -> &str {
        &self.base_dn
    }

    async fn connect(&self) -> Result<Ldap> {
        let settings = LdapConnSettings::new()
            .set_no_tls_verify(!self.tls_verify)
            .set_conn_timeout(self.connect_timeout);
        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &self.server)
            .await
            .map_err(|e| StockroomError::DirectoryUnavailable(format!("LDAP connect failed: {e}")))?;

        ldap3::drive!(conn);

        ldap.with_timeout(self.connect_timeout)
            .simple_bind(&self.bind_dn, &self.bind_password)
            .await
            .map_err(|e| StockroomError::DirectoryUnavailable(format!("LDAP bind failed: {e}")))?
            .success()
            .map_err(|e| {
                StockroomError::DirectoryUnavailable(format!("LDAP bind rejected: {e}"))
            })?;

        debug!(server = %self.server, "LDAP bind successful");
        Ok(ldap)
    }

    async fn modify_membership(
        &self,
        group_dn: &str,
        user_dn: &str,
        change: Mod<String>,
        verb: &str,
    ) -> Result<()> {
        let mut ldap = self.connect().await?;
        ldap.modify(group_dn, vec![change])
            .await
            .map_err(|e| StockroomError::Directory(format!("LDAP {verb} failed: {e}")))?
            .success()
            .map_err(|e| StockroomError::Directory(format!("LDAP {verb} rejected: {e}")))?;
        debug!(group = %group_dn, user = %user_dn, verb, "group membership modified");
        ldap.unbind().await.ok();
        Ok(())
    }
}

#[async_trait]
impl DirectoryClient for AdClient {
    async fn test_connection(&self) -> Result<()> {
        let mut ldap = self.connect().await?;
        ldap.unbind().await.map_err(|e| {
            StockroomError::DirectoryUnavailable(format!("LDAP unbind failed: {e}"))
        })?;
        info!("AD connection test successful");
        Ok(())
    }

    async fn search_users(&self, query: &str, limit: usize) -> Result<Vec<DirectoryUser>> {
        let mut ldap = self.connect().await?;
        let filter = user_search_filter(query);
        let size_limit = i32::try_from(limit).unwrap_or(i32::MAX);
        let result = ldap
            .with_search_options(SearchOptions::new().sizelimit(size_limit))
            .with_timeout(self.connect_timeout)
            .search(
                &self.base_dn,
                Scope::Subtree,
                &filter,
                vec!["sAMAccountName", "displayName"],
            )
            .await
            .map_err(|e| StockroomError::Directory(format!("LDAP search failed: {e}")))?;
        let results = search_entries(result, "search")?;

        let mut users: Vec<DirectoryUser> = results
            .into_iter()
            .map(|entry| entry_to_user(&SearchEntry::construct(entry)))
            .filter(|u| !u.username.is_empty())
            .collect();
        users.sort_by(|a, b| a.display_name.to_lowercase().cmp(&b.display_name.to_lowercase()));
        users.truncate(limit);

        ldap.unbind().await.ok();
        Ok(users)
    }

    async fn find_user(&self, username: &str) -> Result<Option<DirectoryMembership>> {
        let mut ldap = self.connect().await?;
        let filter = format!(
            "(&{USER_FILTER}(sAMAccountName={}))",
            ldap_escape(username)
        );
        let result = ldap
            .with_timeout(self.connect_timeout)
            .search(
                &self.base_dn,
                Scope::Subtree,
                &filter,
                vec!["sAMAccountName", "displayName", "memberOf"],
            )
            .await
            .map_err(|e| StockroomError::Directory(format!("LDAP user lookup failed: {e}")))?;
        let results = search_entries(result, "user lookup")?;

        let membership = results.into_iter().next().map(|entry| {
            let se = SearchEntry::construct(entry);
            DirectoryMembership {
                user: entry_to_user(&se),
                groups: se.attrs.get("memberOf").cloned().unwrap_or_default(),
            }
        });

        ldap.unbind().await.ok();
        Ok(membership)
    }

    async fn add_user_to_group(&self, group_dn: &str, user_dn: &str) -> Result<()> {
        let change = Mod::Add("member".to_string(), HashSet::from([user_dn.to_string()]));
        self.modify_membership(group_dn, user_dn, change, "add to group")
            .await
    }

    async fn remove_user_from_group(&self, group_dn: &str, user_dn: &str) -> Result<()> {
        let change = Mod::Delete("member".to_string(), HashSet::from([user_dn.to_string()]));
        self.modify_membership(group_dn, user_dn, change, "remove from group")
            .await
    }
}

/// Entries of a finished search.
///
/// `sizeLimitExceeded` still carries the entries returned up to the limit, so
/// it counts as a truncated success rather than an error.
fn search_entries(result: SearchResult, what: &str) -> Result<Vec<ResultEntry>> {
    let SearchResult(entries, status) = result;
    match status.rc {
        RC_SUCCESS => Ok(entries),
        RC_SIZE_LIMIT_EXCEEDED => {
            debug!(entries = entries.len(), "LDAP {what} truncated at size limit");
            Ok(entries)
        }
        _ => Err(StockroomError::Directory(format!(
            "LDAP {what} error: {}",
            describe(&status)
        ))),
    }
}

fn describe(status: &LdapResult) -> String {
    if status.text.is_empty() {
        format!("rc={}", status.rc)
    } else {
        format!("rc={} ({})", status.rc, status.text)
    }
}

/// LDAP filter matching users by account or display name substring.
fn user_search_filter(query: &str) -> String {
    let escaped = ldap_escape(query.trim());
    format!("(&{USER_FILTER}(|(sAMAccountName=*{escaped}*)(displayName=*{escaped}*)))")
}

fn entry_to_user(se: &SearchEntry) -> DirectoryUser {
    let username = first_attr(se, "sAMAccountName");
    let display_name = optional_attr(se, "displayName").unwrap_or_else(|| username.clone());
    DirectoryUser {
        username,
        display_name,
        dn: Some(se.dn.clone()).filter(|dn| !dn.is_empty()),
    }
}

/// Extract the first value of an attribute, returning empty string if missing.
fn first_attr(entry: &SearchEntry, attr: &str) -> String {
    optional_attr(entry, attr).unwrap_or_default()
}

/// Extract the first value of an attribute as Option.
fn optional_attr(entry: &SearchEntry, attr: &str) -> Option<String> {
    entry.attrs.get(attr).and_then(|v| v.first()).cloned()
}
