//! Group diff engine: three-way partition of two users' group memberships.

use std::collections::HashSet;

use stockroom_core::models::directory::{DirectoryMembership, GroupEntry};
use stockroom_core::models::group_sync::ComparisonResult;

use crate::dn::{dn_key, group_entry};

/// Built-in groups whose membership grants domain-wide control.
pub const PRIVILEGED_GROUP_PATTERNS: &[&str] = &[
    "domain admins",
    "schema admins",
    "enterprise admins",
    "group policy creator owners",
    "dns admins",
    "backup operators",
    "account operators",
    "server operators",
    "print operators",
];

/// The three partitions produced by [`diff`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupDiff {
    /// In both lists, in reference order.
    pub shared: Vec<GroupEntry>,
    /// Only in the reference list, in reference order.
    pub missing_in_target: Vec<GroupEntry>,
    /// Only in the target list, in target order.
    pub extra_in_target: Vec<GroupEntry>,
}

/// Partition `reference` and `target` group DNs.
///
/// DNs are compared case-insensitively and each list is deduplicated first,
/// keeping the first spelling seen. Output order follows input order.
pub fn diff(reference: &[String], target: &[String]) -> GroupDiff {
    let reference = dedupe(reference);
    let target = dedupe(target);

    let target_keys: HashSet<String> = target.iter().map(|dn| dn_key(dn)).collect();
    let reference_keys: HashSet<String> = reference.iter().map(|dn| dn_key(dn)).collect();

    let mut result = GroupDiff::default();
    for dn in &reference {
        if target_keys.contains(&dn_key(dn)) {
            result.shared.push(group_entry(dn));
        } else {
            result.missing_in_target.push(group_entry(dn));
        }
    }
    result.extra_in_target = target
        .iter()
        .filter(|dn| !reference_keys.contains(&dn_key(dn)))
        .map(|dn| group_entry(dn))
        .collect();

    result
}

/// Diff two resolved users into a full [`ComparisonResult`].
pub fn compare(reference: DirectoryMembership, target: DirectoryMembership) -> ComparisonResult {
    let GroupDiff {
        shared,
        missing_in_target,
        extra_in_target,
    } = diff(&reference.groups, &target.groups);

    ComparisonResult {
        reference_user: reference.user,
        target_user: target.user,
        shared,
        missing_in_target,
        extra_in_target,
        reference_groups: reference.groups,
        target_groups: target.groups,
    }
}

/// Whether a group common name matches one of [`PRIVILEGED_GROUP_PATTERNS`].
///
/// Whitespace is ignored on both sides, so `DnsAdmins` matches `dns admins`.
/// Advisory only: used to highlight rows, never to block an operation.
pub fn is_privileged_group(cn: &str) -> bool {
    let name = compact(cn);
    PRIVILEGED_GROUP_PATTERNS
        .iter()
        .any(|pattern| name.contains(&compact(pattern)))
}

fn compact(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn dedupe(dns: &[String]) -> Vec<&String> {
    let mut seen = HashSet::new();
    dns.iter().filter(|dn| seen.insert(dn_key(dn))).collect()
}
