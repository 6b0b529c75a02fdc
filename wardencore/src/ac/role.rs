use serde::{Deserialize, Serialize};

use super::resource::Record;

#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub parent_role_id: Option<i64>,
    pub owner_firm_id: Option<i64>,
}

impl Role {
    pub const CLASS_NAME: &'static str = "Role";
}

impl From<&Role> for Record {
    fn from(role: &Role) -> Self {
        let record = Record::new(Role::CLASS_NAME)
            .id(role.id)
            .name(role.name.as_str());
        let record = match role.parent_role_id {
            Some(id) => record.attr("parent_role_id", id),
            None => record,
        };
        match role.owner_firm_id {
            Some(id) => record.attr("owner_firm_id", id),
            None => record,
        }
    }
}

/// Links a user to a role, optionally until some instant.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct RoleAssignment {
    pub id: i64,
    pub user_id: i64,
    pub role_id: i64,
    /// Unix timestamp (seconds) after which the assignment lapses.
    pub invalid_after: Option<i64>,
}

impl RoleAssignment {
    pub const CLASS_NAME: &'static str = "RoleAssignment";

    /// An assignment is current when it has no expiry or the expiry is
    /// strictly later than `as_of`.
    pub fn is_current(&self, as_of: i64) -> bool {
        self.invalid_after
            .map(|ts| ts > as_of)
            .unwrap_or(true)
    }
}
