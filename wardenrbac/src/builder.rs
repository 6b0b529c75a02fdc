use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use wardencore::ac::{privilege::is_identifier, Privilege, User};

use crate::{
    catalog::{
        Action,
        Association,
        AttributeOp,
        Catalog,
        ClassSchema,
        PrivilegeRef,
    },
    error::ConfigurationError,
};

/// Guard on the write (or read) of a single attribute.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct AttributeGuard {
    pub op: AttributeOp,
    pub attribute: String,
    #[serde(flatten)]
    pub privilege: PrivilegeRef,
}

/// Declarations for one access-controlled class.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ClassBuilder {
    name: String,
    table: Option<String>,
    privileges: Vec<String>,
    implications: Vec<(String, String)>,
    access_control_keys: Option<Vec<String>>,
    owner_key: Option<String>,
    actions: BTreeMap<Action, PrivilegeRef>,
    attributes: Vec<AttributeGuard>,
    associations: Vec<Association>,
    associate_privileges: BTreeMap<String, String>,
    dissociate_privileges: BTreeMap<String, String>,
}

/// Collects class declarations and resolves them into a [`Catalog`].
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Builder {
    classes: Vec<ClassBuilder>,
    specializations: BTreeMap<String, String>,
    user_table: Option<String>,
}

fn snake_case(name: &str) -> String {
    let mut result = String::new();
    for (i, c) in name.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.extend(c.to_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}

fn check_identifier(ident: &str) -> Result<(), ConfigurationError> {
    if is_identifier(ident) {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidIdentifier(ident.to_string()))
    }
}

// the reserved names are never declared
fn check_privilege_name(name: &str) -> Result<(), ConfigurationError> {
    match name {
        Privilege::ANY | Privilege::FORBIDDEN => {
            Err(ConfigurationError::InvalidIdentifier(name.to_string()))
        }
        name => check_identifier(name),
    }
}

impl ClassBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            .. Default::default()
        }
    }

    pub fn table(mut self, val: impl Into<String>) -> Self {
        self.table = Some(val.into());
        self
    }

    pub fn declare<I, S>(mut self, privileges: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for privilege in privileges {
            let privilege = privilege.into();
            if !self.privileges.contains(&privilege) {
                self.privileges.push(privilege);
            }
        }
        self
    }

    /// Holding `privilege` on this class also confers `implies`.
    pub fn implies(mut self, privilege: impl Into<String>, implies: impl Into<String>) -> Self {
        self.implications.push((privilege.into(), implies.into()));
        self
    }

    pub fn access_control_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.access_control_keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn owner_key(mut self, val: impl Into<String>) -> Self {
        self.owner_key = Some(val.into());
        self
    }

    /// Requires a privilege for an action on this class; a privilege on the
    /// object itself is declared as a side effect.
    pub fn require_for_action(mut self, action: Action, privilege: PrivilegeRef) -> Self {
        if let (None, Privilege::Named(name)) = (&privilege.association, &privilege.privilege) {
            self = self.declare([name.clone()]);
        }
        self.actions.insert(action, privilege);
        self
    }

    /// Requires the privilege named after each action, e.g. `update` to
    /// update.
    pub fn require_eponymous(mut self, actions: impl IntoIterator<Item = Action>) -> Self {
        for action in actions {
            self = self.require_for_action(action, PrivilegeRef::new(action.as_str()));
        }
        self
    }

    pub fn never_permit(mut self, action: Action) -> Self {
        self.actions.insert(action, PrivilegeRef::new(Privilege::Forbidden));
        self
    }

    pub fn guard_attribute(
        mut self,
        op: AttributeOp,
        attribute: impl Into<String>,
        privilege: PrivilegeRef,
    ) -> Self {
        if let (None, Privilege::Named(name)) = (&privilege.association, &privilege.privilege) {
            self = self.declare([name.clone()]);
        }
        self.attributes.push(AttributeGuard {
            op,
            attribute: attribute.into(),
            privilege,
        });
        self
    }

    pub fn belongs_to(
        mut self,
        name: impl Into<String>,
        foreign_key: impl Into<String>,
        class_name: impl Into<String>,
        nullable: bool,
    ) -> Self {
        self.associations.push(Association {
            name: name.into(),
            foreign_key: foreign_key.into(),
            class_name: class_name.into(),
            nullable,
        });
        self
    }

    /// Requires `privilege` on an object of this class to make it the
    /// target of `referencing_class`'s `association`.
    pub fn associate_privilege(
        mut self,
        referencing_class: &str,
        association: &str,
        privilege: impl Into<String>,
    ) -> Self {
        let privilege = privilege.into();
        self = self.declare([privilege.clone()]);
        self.associate_privileges.insert(format!("{referencing_class}#{association}"), privilege);
        self
    }

    pub fn dissociate_privilege(
        mut self,
        referencing_class: &str,
        association: &str,
        privilege: impl Into<String>,
    ) -> Self {
        let privilege = privilege.into();
        self = self.declare([privilege.clone()]);
        self.dissociate_privileges.insert(format!("{referencing_class}#{association}"), privilege);
        self
    }

    fn check_declared(&self, privilege: &Privilege) -> Result<(), ConfigurationError> {
        match privilege {
            Privilege::Named(name) if !self.privileges.contains(name) => {
                Err(ConfigurationError::UndeclaredPrivilege {
                    class_name: self.name.clone(),
                    privilege: name.clone(),
                })
            }
            _ => Ok(()),
        }
    }

    fn resolve(self) -> Result<ClassSchema, ConfigurationError> {
        check_identifier(&self.name)?;
        let table = self.table.clone().unwrap_or_else(|| snake_case(&self.name));
        check_identifier(&table)?;

        for privilege in self.privileges.iter() {
            check_privilege_name(privilege)?;
        }
        let privileges = self.privileges.iter().cloned().collect::<BTreeSet<_>>();
        let mut implies: HashMap<String, BTreeSet<Privilege>> = HashMap::new();
        let mut implied_by: HashMap<String, BTreeSet<Privilege>> = HashMap::new();
        for (privilege, implied) in self.implications.iter() {
            if !privileges.contains(privilege) || !privileges.contains(implied) {
                return Err(ConfigurationError::UndeclaredImplication {
                    class_name: self.name.clone(),
                    privilege: privilege.clone(),
                    implies: implied.clone(),
                });
            }
            implies.entry(privilege.clone())
                .or_default()
                .insert(Privilege::Named(implied.clone()));
            implied_by.entry(implied.clone())
                .or_default()
                .insert(Privilege::Named(privilege.clone()));
        }

        let mut access_control_keys = self.access_control_keys.clone()
            .unwrap_or_else(|| vec!["id".to_string()]);
        if let Some(owner_key) = &self.owner_key {
            if !access_control_keys.contains(owner_key) {
                access_control_keys.push(owner_key.clone());
            }
        }
        for key in access_control_keys.iter() {
            check_identifier(key)?;
        }
        for association in self.associations.iter() {
            check_identifier(&association.foreign_key)?;
        }

        let mut attribute_guards = HashMap::new();
        // an id is never reassigned
        attribute_guards.insert(
            (AttributeOp::Update, "id".to_string()),
            PrivilegeRef::new(Privilege::Forbidden),
        );
        for guard in self.attributes.iter() {
            if guard.privilege.association.is_none() {
                self.check_declared(&guard.privilege.privilege)?;
            }
            attribute_guards.insert((guard.op, guard.attribute.clone()), guard.privilege.clone());
        }
        for privilege in self.actions.values() {
            if privilege.association.is_none() {
                self.check_declared(&privilege.privilege)?;
            }
        }
        let to_privileges = |map: &BTreeMap<String, String>| -> Result<HashMap<String, Privilege>, ConfigurationError> {
            map.iter()
                .map(|(k, v)| {
                    let privilege = Privilege::Named(v.clone());
                    self.check_declared(&privilege)?;
                    Ok((k.clone(), privilege))
                })
                .collect()
        };
        let associate_privileges = to_privileges(&self.associate_privileges)?;
        let dissociate_privileges = to_privileges(&self.dissociate_privileges)?;

        Ok(ClassSchema {
            name: self.name,
            table,
            privileges,
            implies,
            implied_by,
            access_control_keys,
            owner_key: self.owner_key,
            actions: self.actions.into_iter().collect(),
            attribute_guards,
            associations: self.associations,
            associate_privileges,
            dissociate_privileges,
        })
    }
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads declarations from a JSON document.
    pub fn from_json(s: &str) -> Result<Self, ConfigurationError> {
        serde_json::from_str(s)
            .map_err(|e| ConfigurationError::Malformed(e.to_string()))
    }

    pub fn class(mut self, val: ClassBuilder) -> Self {
        self.classes.push(val);
        self
    }

    /// Declares `class_name` as a specialization of `base`; objects of the
    /// specialization are governed by the base class's permissions.
    pub fn specialize(mut self, class_name: impl Into<String>, base: impl Into<String>) -> Self {
        self.specializations.insert(class_name.into(), base.into());
        self
    }

    pub fn user_table(mut self, val: impl Into<String>) -> Self {
        self.user_table = Some(val.into());
        self
    }

    pub fn build(self) -> Result<Catalog, ConfigurationError> {
        let mut classes = HashMap::new();
        for class in self.classes.into_iter() {
            let schema = class.resolve()?;
            if classes.contains_key(&schema.name) {
                return Err(ConfigurationError::DuplicateClass(schema.name));
            }
            classes.insert(schema.name.clone(), schema);
        }

        for schema in classes.values() {
            for association in schema.associations.iter() {
                if !classes.contains_key(&association.class_name) {
                    return Err(ConfigurationError::UnknownClass(association.class_name.clone()));
                }
            }
            let refs = schema.actions.values()
                .chain(schema.attribute_guards.values())
                .filter_map(|r| r.association.as_ref().map(|a| (a, &r.privilege)));
            for (association, privilege) in refs {
                let target = schema.association(association)
                    .and_then(|a| classes.get(&a.class_name))
                    .ok_or_else(|| ConfigurationError::UnknownAssociation {
                        class_name: schema.name.clone(),
                        association: association.clone(),
                    })?;
                if let Privilege::Named(name) = privilege {
                    if !target.is_declared(name) {
                        return Err(ConfigurationError::UndeclaredPrivilege {
                            class_name: target.name.clone(),
                            privilege: name.clone(),
                        });
                    }
                }
            }
        }

        for (class_name, base) in self.specializations.iter() {
            if classes.contains_key(class_name) {
                return Err(ConfigurationError::DuplicateClass(class_name.clone()));
            }
            if !classes.contains_key(base) {
                return Err(ConfigurationError::UnknownClass(base.clone()));
            }
        }

        let user_table = self.user_table
            .unwrap_or_else(|| snake_case(User::CLASS_NAME));
        check_identifier(&user_table)?;
        let all_keys = classes.values()
            .flat_map(|schema| schema.access_control_keys.iter().cloned())
            .collect();
        log::debug!("catalog built with {} classes", classes.len());

        Ok(Catalog {
            classes,
            specializations: self.specializations.into_iter().collect(),
            user_table,
            all_keys,
        })
    }
}
