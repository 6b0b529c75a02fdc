use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use wardencore::ac::{
    privilege::is_identifier,
    Permission,
    Privilege,
    ResourceClass,
};

use crate::error::{
    ConfigurationError,
    Error,
    ScopeError,
};

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Find,
    Update,
    Destroy,
}

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeOp {
    /// Setting the attribute on an unsaved object.
    Initialize,
    /// Changing the attribute on a saved object.
    Update,
    Read,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Find => "find",
            Action::Update => "update",
            Action::Destroy => "destroy",
        }
    }
}

/// A privilege to check, either on the object itself or on the object
/// referenced by one of its belongs-to associations.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
pub struct PrivilegeRef {
    pub privilege: Privilege,
    #[serde(default)]
    pub association: Option<String>,
}

impl PrivilegeRef {
    pub fn new(privilege: impl Into<Privilege>) -> Self {
        Self {
            privilege: privilege.into(),
            association: None,
        }
    }

    pub fn on(privilege: impl Into<Privilege>, association: impl Into<String>) -> Self {
        Self {
            privilege: privilege.into(),
            association: Some(association.into()),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct Association {
    pub name: String,
    pub foreign_key: String,
    pub class_name: String,
    #[serde(default)]
    pub nullable: bool,
}

#[derive(Clone, Debug, Default)]
pub struct ClassSchema {
    pub(crate) name: String,
    pub(crate) table: String,
    pub(crate) privileges: BTreeSet<String>,
    pub(crate) implies: HashMap<String, BTreeSet<Privilege>>,
    pub(crate) implied_by: HashMap<String, BTreeSet<Privilege>>,
    pub(crate) access_control_keys: Vec<String>,
    pub(crate) owner_key: Option<String>,
    pub(crate) actions: HashMap<Action, PrivilegeRef>,
    pub(crate) attribute_guards: HashMap<(AttributeOp, String), PrivilegeRef>,
    pub(crate) associations: Vec<Association>,
    // keyed by "ReferencingClass#association"
    pub(crate) associate_privileges: HashMap<String, Privilege>,
    pub(crate) dissociate_privileges: HashMap<String, Privilege>,
}

impl ClassSchema {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn access_control_keys(&self) -> &[String] {
        &self.access_control_keys
    }

    pub fn owner_key(&self) -> Option<&str> {
        self.owner_key.as_deref()
    }

    pub fn associations(&self) -> &[Association] {
        &self.associations
    }

    pub fn association(&self, name: &str) -> Option<&Association> {
        self.associations.iter().find(|a| a.name == name)
    }

    pub fn is_declared(&self, privilege: &str) -> bool {
        self.privileges.contains(privilege)
    }
}

/// The immutable registry of access-controlled classes.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    pub(crate) classes: HashMap<String, ClassSchema>,
    // specialization -> base
    pub(crate) specializations: HashMap<String, String>,
    pub(crate) user_table: String,
    pub(crate) all_keys: BTreeSet<String>,
}

fn assoc_ref(class_name: &str, association: &str) -> String {
    format!("{class_name}#{association}")
}

impl Catalog {
    /// Collapses a specialization to its base class; `None` for classes
    /// that are not access controlled.
    pub fn base_class<'a>(&'a self, class_name: &'a str) -> Option<&'a str> {
        if self.classes.contains_key(class_name) {
            Some(class_name)
        } else {
            self.specializations.get(class_name).map(String::as_str)
        }
    }

    pub fn schema(&self, class_name: &str) -> Option<&ClassSchema> {
        self.base_class(class_name)
            .and_then(|base| self.classes.get(base))
    }

    pub fn user_table(&self) -> &str {
        &self.user_table
    }

    pub fn declared_privileges(&self, class_name: &str) -> BTreeSet<Privilege> {
        self.schema(class_name)
            .map(|schema| schema.privileges.iter()
                .map(|p| Privilege::Named(p.clone()))
                .collect()
            )
            .unwrap_or_default()
    }

    /// Privileges conferred automatically by holding `privilege` on the
    /// class; one hop only.
    pub fn implied_privileges(&self, class_name: &str, privilege: &Privilege) -> BTreeSet<Privilege> {
        self.lookup(class_name, privilege, |schema| &schema.implies)
    }

    /// Privileges that, when held on the class, confer `privilege`.
    pub fn implied_by(&self, class_name: &str, privilege: &Privilege) -> BTreeSet<Privilege> {
        self.lookup(class_name, privilege, |schema| &schema.implied_by)
    }

    pub fn implies(&self, class_name: &str, held: &Privilege, requested: &Privilege) -> bool {
        match (self.schema(class_name), held) {
            (Some(schema), Privilege::Named(name)) => schema.implies.get(name)
                .map(|set| set.contains(requested))
                .unwrap_or(false),
            _ => false,
        }
    }

    fn lookup(
        &self,
        class_name: &str,
        privilege: &Privilege,
        map: impl Fn(&ClassSchema) -> &HashMap<String, BTreeSet<Privilege>>,
    ) -> BTreeSet<Privilege> {
        match (self.schema(class_name), privilege) {
            (Some(schema), Privilege::Named(name)) => map(schema)
                .get(name)
                .cloned()
                .unwrap_or_default(),
            _ => BTreeSet::new(),
        }
    }

    pub fn access_control_keys(&self, class_name: &str) -> &[String] {
        self.schema(class_name)
            .map(ClassSchema::access_control_keys)
            .unwrap_or(&[])
    }

    pub fn owner_key(&self, class_name: &str) -> Option<&str> {
        self.schema(class_name)
            .and_then(ClassSchema::owner_key)
    }

    pub fn action_privilege(&self, class_name: &str, action: Action) -> Option<&PrivilegeRef> {
        self.schema(class_name)
            .and_then(|schema| schema.actions.get(&action))
    }

    pub fn attribute_guard(
        &self,
        class_name: &str,
        op: AttributeOp,
        attribute: &str,
    ) -> Option<&PrivilegeRef> {
        self.schema(class_name)
            .and_then(|schema| schema.attribute_guards.get(&(op, attribute.to_string())))
    }

    /// The privilege required on an object of `class_name` to make it the
    /// target of `referencing_class`'s `association`.
    pub fn associate_privilege(
        &self,
        class_name: &str,
        referencing_class: &str,
        association: &str,
    ) -> Option<&Privilege> {
        let referencing = self.base_class(referencing_class).unwrap_or(referencing_class);
        self.schema(class_name)
            .and_then(|schema| schema.associate_privileges.get(&assoc_ref(referencing, association)))
    }

    pub fn dissociate_privilege(
        &self,
        class_name: &str,
        referencing_class: &str,
        association: &str,
    ) -> Option<&Privilege> {
        let referencing = self.base_class(referencing_class).unwrap_or(referencing_class);
        self.schema(class_name)
            .and_then(|schema| schema.dissociate_privileges.get(&assoc_ref(referencing, association)))
    }

    /// Checks that a permission record is well formed with respect to the
    /// declared classes, privileges and keys.
    pub fn validate_permission(&self, permission: &Permission) -> Result<(), Error> {
        if permission.has_grant_option && !permission.is_grant {
            Err(ScopeError::GrantOptionWithoutGrant)?
        }
        match &permission.privilege {
            Privilege::Forbidden => Err(ScopeError::ForbiddenPrivilege)?,
            Privilege::Named(name) if !is_identifier(name) => {
                Err(ConfigurationError::InvalidIdentifier(name.clone()))?
            }
            _ => (),
        }
        let class_name = match &permission.class_name {
            ResourceClass::Any => {
                // keys must at least exist somewhere
                for key in permission.targets.keys() {
                    if !self.all_keys.contains(key) {
                        Err(ScopeError::UndeclaredKey {
                            class_name: Privilege::ANY.to_string(),
                            key: key.clone(),
                        })?
                    }
                }
                return Ok(());
            }
            ResourceClass::Named(name) => name,
        };
        if let Some(base) = self.specializations.get(class_name) {
            Err(ScopeError::SpecializedClass {
                class_name: class_name.clone(),
                base: base.clone(),
            })?
        }
        let schema = self.classes.get(class_name)
            .ok_or_else(|| ScopeError::UnknownClass(class_name.clone()))?;
        if let Privilege::Named(privilege) = &permission.privilege {
            if !schema.is_declared(privilege) {
                Err(ConfigurationError::UndeclaredPrivilege {
                    class_name: class_name.clone(),
                    privilege: privilege.clone(),
                })?
            }
        }
        for key in permission.targets.keys() {
            if !schema.access_control_keys.contains(key) {
                Err(ScopeError::UndeclaredKey {
                    class_name: class_name.clone(),
                    key: key.clone(),
                })?
            }
        }
        Ok(())
    }
}
