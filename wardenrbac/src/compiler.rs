//! Compilation of privilege checks into predicates.
//!
//! Every filter compiled here agrees with the corresponding in-memory
//! decision of the engine for every object of the class.

use std::collections::BTreeSet;
use wardencore::ac::{
    predicate::{IdFilter, Predicate, SqlFragment},
    AccessControlled,
    Permission,
    Privilege,
    Value,
};

use crate::{
    catalog::{Action, AttributeOp, Catalog, ClassSchema, PrivilegeRef},
    engine::Engine,
    matcher,
    principal::{Principal, Snapshot},
};

fn permission_clause(schema: &ClassSchema, permission: &Permission, user_id: i64) -> Predicate {
    let mut clauses = Vec::new();
    if permission.target_owned_by_self {
        match schema.owner_key() {
            Some(key) => clauses.push(Predicate::eq(key, user_id)),
            None => return Predicate::False,
        }
    }
    for key in schema.access_control_keys() {
        if let Some(value) = permission.target_value(key) {
            clauses.push(Predicate::eq(key.as_str(), value.clone()));
        }
    }
    Predicate::and(clauses)
}

impl Engine {
    /// A predicate selecting exactly the objects of the class on which the
    /// user holds `privilege`.
    pub fn compile_object_filter(
        &self,
        who: &Principal,
        privilege: &Privilege,
        class_name: &str,
    ) -> Predicate {
        let schema = match self.catalog().schema(class_name) {
            Some(schema) => schema,
            None => return Predicate::False,
        };
        let user_id = who.user().id;
        Predicate::or(self.all_permissions(who, privilege, class_name)
            .into_iter()
            .map(|p| permission_clause(schema, p, user_id))
        )
    }

    /// The ids of the objects of the class on which the user holds
    /// `privilege`, as a sub-select.
    pub fn compile_id_filter(
        &self,
        who: &Principal,
        privilege: &Privilege,
        class_name: &str,
    ) -> IdFilter {
        let table = self.catalog().schema(class_name)
            .map(|schema| schema.table().to_string())
            .unwrap_or_else(|| class_name.to_string());
        IdFilter::new(table, self.compile_object_filter(who, privilege, class_name))
    }

    /// Compiles a privilege reference; a privilege on an associate becomes
    /// `foreign_key IN (ids of permitted associates)`.
    pub fn compile_ref_filter(
        &self,
        who: &Principal,
        privilege: &PrivilegeRef,
        class_name: &str,
    ) -> Predicate {
        let association = match &privilege.association {
            None => return self.compile_object_filter(who, &privilege.privilege, class_name),
            Some(association) => association,
        };
        match self.catalog().schema(class_name).and_then(|s| s.association(association)) {
            Some(association) => Predicate::In {
                column: association.foreign_key.clone(),
                association: association.name.clone(),
                filter: Box::new(self.compile_id_filter(
                    who,
                    &privilege.privilege,
                    &association.class_name,
                )),
            },
            None => Predicate::False,
        }
    }

    /// The filter counterpart of [`Engine::permits_action`].
    pub fn where_permits_action(
        &self,
        who: &Principal,
        action: Action,
        class_name: &str,
    ) -> Predicate {
        let schema = match self.catalog().schema(class_name) {
            Some(schema) => schema,
            None => return Predicate::True,
        };
        let own = schema.actions.get(&action)
            .map(|privilege| self.compile_ref_filter(who, privilege, class_name))
            .unwrap_or(Predicate::True);
        if action != Action::Destroy {
            return own;
        }
        let dissociations = schema.associations()
            .iter()
            .filter_map(|a| {
                let privilege = self.catalog().dissociate_privilege(&a.class_name, schema.name(), &a.name)?;
                // absent associates are not checked
                Some(Predicate::or([
                    Predicate::is_null(a.foreign_key.as_str()),
                    Predicate::In {
                        column: a.foreign_key.clone(),
                        association: a.name.clone(),
                        filter: Box::new(self.compile_id_filter(who, privilege, &a.class_name)),
                    },
                ]))
            })
            .collect::<Vec<_>>();
        Predicate::and(std::iter::once(own).chain(dissociations))
    }

    /// The filter counterpart of [`Engine::permits_update_attr`] for saved
    /// objects.
    pub fn where_permits_update_attr(
        &self,
        who: &Principal,
        class_name: &str,
        attribute: &str,
    ) -> Predicate {
        self.catalog().attribute_guard(class_name, AttributeOp::Update, attribute)
            .map(|privilege| self.compile_ref_filter(who, privilege, class_name))
            .unwrap_or(Predicate::True)
    }

    /// The candidates the user may pick as the associate `association` of
    /// `object`, as a sub-select over the associate's table; `None` for an
    /// unknown association.
    ///
    /// The restrictions that apply are combined:
    ///
    /// * if the associate class declares a dissociate privilege for the
    ///   association and the user lacks it on the current associate, that
    ///   associate is the only choice;
    /// * if it declares an associate privilege, only associates the user
    ///   holds it on qualify;
    /// * if the foreign key is an access control key of the object's class,
    ///   only the values named by the user's permissions for the pending
    ///   save (create when unsaved, update otherwise) qualify.  On the owner
    ///   key an owned-by-self permission names the user, and a permission
    ///   leaving the key open lifts the restriction.
    pub fn associate_choices(
        &self,
        who: &Principal,
        object: &dyn AccessControlled,
        association: &str,
    ) -> Option<IdFilter> {
        let catalog: &Catalog = self.catalog();
        let schema = catalog.schema(object.class_name())?;
        let association = schema.association(association)?;
        let table = catalog.schema(&association.class_name)?.table().to_string();
        let mut clauses = Vec::new();

        if let Some(privilege) = catalog.dissociate_privilege(
            &association.class_name,
            schema.name(),
            &association.name,
        ) {
            if let Some(current) = object.associate(&association.name) {
                if !self.can(who, privilege, current) {
                    clauses.push(match current.id() {
                        Some(id) => Predicate::eq("id", id),
                        None => Predicate::False,
                    });
                }
            }
        }

        if let Some(privilege) = catalog.associate_privilege(
            &association.class_name,
            schema.name(),
            &association.name,
        ) {
            clauses.push(self.compile_object_filter(who, privilege, &association.class_name));
        }

        if schema.access_control_keys().contains(&association.foreign_key) {
            let action = match object.id() {
                None => Action::Create,
                Some(_) => Action::Update,
            };
            // privileges checked on an associate say nothing of the key
            if let Some(PrivilegeRef { privilege, association: None }) = schema.actions.get(&action) {
                clauses.extend(self.key_choices(who, schema, privilege, &association.foreign_key));
            }
        }

        log::trace!(
            "associate choices for {} {:?} as {}",
            object.class_name(),
            object.id(),
            association.name,
        );
        Some(IdFilter::new(table, Predicate::and(clauses)))
    }

    // the values of `key` the user's permissions allow; `None` when one of
    // them leaves it open
    fn key_choices(
        &self,
        who: &Principal,
        schema: &ClassSchema,
        privilege: &Privilege,
        key: &str,
    ) -> Option<Predicate> {
        let on_owner_key = schema.owner_key() == Some(key);
        let mut values = Vec::new();
        for permission in self.all_permissions(who, privilege, schema.name()) {
            if on_owner_key && permission.target_owned_by_self {
                values.push(Value::Integer(who.user().id));
            } else {
                values.push(permission.target_value(key)?.clone());
            }
        }
        Some(Predicate::any_of("id", values))
    }

    /// The objects of the class a permission coined off `grant` could
    /// target: those meeting each of the grant's key conditions.  Nothing
    /// qualifies unless `grant` is a grant on the class (or on any class)
    /// without the owned-by-self restriction.
    pub fn compile_grant_target_filter(
        &self,
        grant: &Permission,
        class_name: &str,
    ) -> IdFilter {
        let schema = match self.catalog().schema(class_name) {
            Some(schema) => schema,
            None => return IdFilter::new(class_name, Predicate::False),
        };
        let table = schema.table().to_string();
        if !grant.is_grant
            || grant.target_owned_by_self
            || !grant.class_name.covers(schema.name())
        {
            return IdFilter::new(table, Predicate::False);
        }
        IdFilter::new(table, Predicate::and(schema.access_control_keys()
            .iter()
            .filter_map(|key| grant.target_value(key)
                .map(|value| Predicate::eq(key.as_str(), value.clone())))
        ))
    }

    /// The objects of the class that some grant the user holds could
    /// target.
    pub fn grant_target_choices(
        &self,
        who: &Principal,
        class_name: &str,
    ) -> IdFilter {
        let table = self.catalog().schema(class_name)
            .map(|schema| schema.table().to_string())
            .unwrap_or_else(|| class_name.to_string());
        IdFilter::new(table, Predicate::or(who.grants()
            .iter()
            .map(|grant| self.compile_grant_target_filter(grant, class_name).predicate)
        ))
    }

    /// The users who hold `privilege` on the object, as a predicate over
    /// users.
    ///
    /// For each permission conferring the privilege and matching the
    /// object's keys, the holders are the users currently assigned to the
    /// permission's role or to any role descending from it; when the
    /// permission is owned-by-self only the object's owner can qualify.
    pub fn users_permitted(
        &self,
        snapshot: &Snapshot,
        privilege: &Privilege,
        object: &dyn AccessControlled,
    ) -> Predicate {
        let schema = match self.catalog().schema(object.class_name()) {
            Some(schema) => schema,
            None => return Predicate::False,
        };
        let owner = schema.owner_key()
            .and_then(|key| object.attribute(key))
            .and_then(|v| v.as_integer());
        let mut user_ids = BTreeSet::new();
        let relevant = snapshot.permissions.iter()
            .filter(|p| !p.is_grant)
            .filter(|p| p.class_name.covers(schema.name()))
            .filter(|p| matcher::covers(self.catalog(), p, privilege, schema.name()))
            .filter(|p| matcher::scope_matches(self.catalog(), p, object));
        for permission in relevant {
            let roles = snapshot.graph.descendants([permission.role_id]);
            let holders = snapshot.assignments.iter()
                .filter(|ra| ra.is_current(snapshot.as_of) && roles.contains(&ra.role_id))
                .map(|ra| ra.user_id);
            if permission.target_owned_by_self {
                if let Some(owner) = owner {
                    if holders.into_iter().any(|id| id == owner) {
                        user_ids.insert(owner);
                    }
                }
            } else {
                user_ids.extend(holders);
            }
        }
        log::trace!(
            "users permitted to {privilege} {} {:?}: {user_ids:?}",
            object.class_name(),
            object.id(),
        );
        Predicate::any_of("id", user_ids.into_iter().map(Value::Integer))
    }

    /// [`Engine::users_permitted`] rendered against the users table.
    pub fn users_permitted_sql(
        &self,
        snapshot: &Snapshot,
        privilege: &Privilege,
        object: &dyn AccessControlled,
    ) -> SqlFragment {
        self.users_permitted(snapshot, privilege, object)
            .to_sql(self.catalog().user_table())
    }
}
