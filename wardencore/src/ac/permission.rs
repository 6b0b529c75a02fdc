use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{
    privilege::{Privilege, ResourceClass},
    value::Value,
};

/// A rule attached to a role.  When `is_grant` is set the permission does
/// not confer access; it authorizes the holder to create matching
/// permissions instead.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct Permission {
    pub id: Option<i64>,
    pub role_id: i64,
    pub privilege: Privilege,
    pub class_name: ResourceClass,
    #[serde(default)]
    pub is_grant: bool,
    #[serde(default)]
    pub has_grant_option: bool,
    #[serde(default)]
    pub target_owned_by_self: bool,
    /// Access-control key to required value; absent keys are unconstrained.
    #[serde(default)]
    pub targets: BTreeMap<String, Value>,
}

impl Permission {
    pub fn new(
        role_id: i64,
        privilege: impl Into<Privilege>,
        class_name: impl Into<ResourceClass>,
    ) -> Self {
        Self {
            id: None,
            role_id,
            privilege: privilege.into(),
            class_name: class_name.into(),
            is_grant: false,
            has_grant_option: false,
            target_owned_by_self: false,
            targets: BTreeMap::new(),
        }
    }

    pub fn id(mut self, val: i64) -> Self {
        self.id = Some(val);
        self
    }

    pub fn grant(mut self, val: bool) -> Self {
        self.is_grant = val;
        self
    }

    pub fn grant_option(mut self, val: bool) -> Self {
        self.has_grant_option = val;
        self
    }

    pub fn owned_by_self(mut self, val: bool) -> Self {
        self.target_owned_by_self = val;
        self
    }

    pub fn target(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.targets.insert(key.into(), value.into());
        self
    }

    pub fn target_value(&self, key: &str) -> Option<&Value> {
        self.targets.get(key)
    }

    /// A copy of this permission under a different privilege.
    pub fn with_privilege(&self, privilege: Privilege) -> Self {
        Self {
            privilege,
            .. self.clone()
        }
    }
}
