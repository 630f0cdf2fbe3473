//! Read-only projections of directory principals and groups.

use serde::{Deserialize, Serialize};

/// A directory group, identified by its distinguished name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupEntry {
    pub dn: String,
    /// Display name taken from the leading `CN=` component of the DN.
    pub cn: String,
}

/// A directory user as returned by search or lookup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryUser {
    pub username: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dn: Option<String>,
}

/// A resolved user together with the group DNs they belong to, in directory order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryMembership {
    pub user: DirectoryUser,
    pub groups: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_user_serializes_camel_case() {
        let user = DirectoryUser {
            username: "jdoe".to_string(),
            display_name: "John Doe".to_string(),
            dn: Some("CN=John Doe,OU=Staff,DC=acme,DC=local".to_string()),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["username"], "jdoe");
        assert_eq!(json["displayName"], "John Doe");
        assert_eq!(json["dn"], "CN=John Doe,OU=Staff,DC=acme,DC=local");
    }

    #[test]
    fn directory_user_omits_missing_dn() {
        let user = DirectoryUser {
            username: "svc".to_string(),
            display_name: "Service".to_string(),
            dn: None,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("\"dn\""));
        let back: DirectoryUser = serde_json::from_str(&json).unwrap();
        assert_eq!(back, user);
    }

    #[test]
    fn group_entry_json_shape() {
        let entry = GroupEntry {
            dn: "CN=VPN Users,OU=Groups,DC=acme,DC=local".to_string(),
            cn: "VPN Users".to_string(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["dn"], "CN=VPN Users,OU=Groups,DC=acme,DC=local");
        assert_eq!(json["cn"], "VPN Users");
    }
}
