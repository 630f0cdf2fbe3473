//! Distinguished name helpers for directory groups.

use stockroom_core::models::directory::GroupEntry;

/// Comparison key for a DN. Directory DNs are case-insensitive, so two DNs
/// refer to the same object exactly when their keys are equal.
pub fn dn_key(dn: &str) -> String {
    dn.to_lowercase()
}

/// Whether two DNs name the same object.
pub fn dn_eq(a: &str, b: &str) -> bool {
    dn_key(a) == dn_key(b)
}

/// Extract the common name from a DN.
///
/// `CN=Domain Admins,OU=Groups,DC=example,DC=com` yields `Domain Admins`. The
/// `CN=` prefix is matched case-insensitively and the value ends at the first
/// unescaped comma; RFC 4514 escapes inside the value are removed. A DN that
/// does not start with `CN=` is returned unchanged.
pub fn common_name(dn: &str) -> String {
    let has_cn_prefix = dn
        .get(..3)
        .map(|p| p.eq_ignore_ascii_case("cn="))
        .unwrap_or(false);
    if !has_cn_prefix {
        return dn.to_string();
    }

    let mut cn = String::new();
    let mut chars = dn[3..].chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    cn.push(escaped);
                }
            }
            ',' => break,
            other => cn.push(other),
        }
    }
    cn
}

/// Build a [`GroupEntry`] for a group DN.
pub fn group_entry(dn: &str) -> GroupEntry {
    GroupEntry {
        dn: dn.to_string(),
        cn: common_name(dn),
    }
}
