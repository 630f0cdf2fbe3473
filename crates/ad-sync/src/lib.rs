//! Stockroom AD group sync -- compare two users' Active Directory groups and
//! bring the target in line with the reference.
//!
//! This crate holds the LDAP directory client, the group diff engine, the
//! batch executor that applies membership edits, and the reconciliation
//! controller used by the console and CLI.

pub mod client;
pub mod debounce;
pub mod diff;
pub mod dn;
pub mod executor;
pub mod reconcile;
pub mod remote;
pub mod report;
pub mod service;

#[cfg(test)]
mod test_support;
