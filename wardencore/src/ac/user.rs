use serde::{Deserialize, Serialize};

use super::{
    resource::AccessControlled,
    value::Value,
};

#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub firm_id: Option<i64>,
}

impl User {
    /// The class name under which users are themselves access controlled.
    pub const CLASS_NAME: &'static str = "User";
}

impl AccessControlled for User {
    fn class_name(&self) -> &str {
        Self::CLASS_NAME
    }

    fn id(&self) -> Option<i64> {
        Some(self.id)
    }

    fn display_name(&self) -> Option<&str> {
        Some(&self.name)
    }

    fn attribute(&self, key: &str) -> Option<Value> {
        match key {
            "id" => Some(Value::Integer(self.id)),
            "name" => Some(Value::Text(self.name.clone())),
            "firm_id" => self.firm_id.map(Value::Integer),
            _ => None,
        }
    }
}
