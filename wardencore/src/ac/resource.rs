use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::value::Value;

/// Read access to the parts of a host object that access control needs.
pub trait AccessControlled {
    /// The concrete class of the object; specializations are collapsed to
    /// their base class by the catalog.
    fn class_name(&self) -> &str;
    /// `None` while the object is unsaved.
    fn id(&self) -> Option<i64>;
    fn display_name(&self) -> Option<&str> {
        None
    }
    /// The value of an access-control key, `None` when null.
    fn attribute(&self, key: &str) -> Option<Value>;
    /// The object referenced by the named belongs-to association.
    fn associate(&self, _name: &str) -> Option<&dyn AccessControlled> {
        None
    }
}

/// A plain snapshot of an access-controlled object.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Record {
    pub class_name: String,
    pub id: Option<i64>,
    pub name: Option<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
    #[serde(default)]
    pub associates: BTreeMap<String, Record>,
}

impl Record {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            .. Default::default()
        }
    }

    pub fn id(mut self, val: i64) -> Self {
        self.id = Some(val);
        self
    }

    pub fn name(mut self, val: impl Into<String>) -> Self {
        self.name = Some(val.into());
        self
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn associate(mut self, name: impl Into<String>, record: Record) -> Self {
        self.associates.insert(name.into(), record);
        self
    }
}

impl AccessControlled for Record {
    fn class_name(&self) -> &str {
        &self.class_name
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn display_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn attribute(&self, key: &str) -> Option<Value> {
        match key {
            "id" => self.id.map(Value::Integer),
            key => self.attributes.get(key).cloned(),
        }
    }

    fn associate(&self, name: &str) -> Option<&dyn AccessControlled> {
        self.associates.get(name)
            .map(|r| r as &dyn AccessControlled)
    }
}
