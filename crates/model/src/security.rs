//! The per-database security object (`/{db}/_security`).

use serde::{Deserialize, Serialize};

/// Names and roles holding one level of access.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroup {
    /// User names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<String>,
    /// Role names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
}

impl SecurityGroup {
    /// Adds a user name. Returns `false` if it was already present.
    pub fn add_name(&mut self, name: &str) -> bool {
        insert_unique(&mut self.names, name)
    }

    /// Removes a user name. Returns `false` if it was not present.
    pub fn remove_name(&mut self, name: &str) -> bool {
        remove_all(&mut self.names, name)
    }

    /// Adds a role. Returns `false` if it was already present.
    pub fn add_role(&mut self, role: &str) -> bool {
        insert_unique(&mut self.roles, role)
    }

    /// Removes a role. Returns `false` if it was not present.
    pub fn remove_role(&mut self, role: &str) -> bool {
        remove_all(&mut self.roles, role)
    }
}

fn insert_unique(list: &mut Vec<String>, value: &str) -> bool {
    if list.iter().any(|v| v == value) {
        return false;
    }
    list.push(value.to_string());
    true
}

fn remove_all(list: &mut Vec<String>, value: &str) -> bool {
    let before = list.len();
    list.retain(|v| v != value);
    list.len() != before
}

/// The default security object: admins and members.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityObject {
    /// Database administrators.
    #[serde(default)]
    pub admins: SecurityGroup,
    /// Database members (readers/writers).
    #[serde(default)]
    pub members: SecurityGroup,
}
