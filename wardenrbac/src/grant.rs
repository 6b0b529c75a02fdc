//! The grant algebra: whether one permission may authorize the creation,
//! update or destruction of another.

use std::{collections::BTreeSet, fmt};
use wardencore::ac::{
    Permission,
    Privilege,
    ResourceClass,
    Value,
};

use crate::{
    catalog::Catalog,
    engine::Engine,
    error::{Denial, Error, Target, TargetId},
    principal::Context,
};

/// The mutation of a permission record being verified.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Operation {
    Create,
    Update,
    Destroy,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Destroy => "destroy",
        })
    }
}

/// The class name and privilege under which grant checks are recorded.
pub const GRANT_CLASS: &str = "Permission";
pub const GRANT_PRIVILEGE: &str = "grant";

fn privilege_grantable(
    catalog: &Catalog,
    grant: &Permission,
    candidate: &Permission,
) -> bool {
    match (&grant.privilege, &candidate.privilege) {
        (Privilege::Any, _) => true,
        (Privilege::Forbidden, _) => false,
        // a named grant never hands out the wildcard
        (Privilege::Named(_), Privilege::Any | Privilege::Forbidden) => false,
        (held, requested) => held == requested || match &candidate.class_name {
            // implications are only known for a named class
            ResourceClass::Named(class_name) => catalog.implies(class_name, held, requested),
            ResourceClass::Any => false,
        },
    }
}

fn class_grantable(grant: &Permission, candidate: &Permission) -> bool {
    match (&grant.class_name, &candidate.class_name) {
        (ResourceClass::Any, _) => true,
        (ResourceClass::Named(held), ResourceClass::Named(requested)) => held == requested,
        (ResourceClass::Named(_), ResourceClass::Any) => false,
    }
}

fn keys_grantable(grant: &Permission, candidate: &Permission) -> bool {
    grant.targets.iter()
        .all(|(key, value): (&String, &Value)| candidate.target_value(key) == Some(value))
}

/// Whether `grant` authorizes the existence of `candidate`: it must be a
/// grant, carry the grant option if the candidate is itself a grant, keep
/// the candidate owned-by-self if it is, cover the candidate's class and
/// privilege, and constrain the candidate at least as narrowly on every
/// access-control key it sets.
pub fn can_grant(catalog: &Catalog, grant: &Permission, candidate: &Permission) -> bool {
    grant.is_grant
        && (!candidate.is_grant || grant.has_grant_option)
        && (!grant.target_owned_by_self || candidate.target_owned_by_self)
        && class_grantable(grant, candidate)
        && privilege_grantable(catalog, grant, candidate)
        && keys_grantable(grant, candidate)
}

/// The privileges `grant` could hand out on `class_name`.
pub fn grantable_privileges_for_class(
    catalog: &Catalog,
    grant: &Permission,
    class_name: &str,
) -> BTreeSet<Privilege> {
    if !grant.class_name.covers(class_name) {
        return BTreeSet::new();
    }
    match &grant.privilege {
        Privilege::Any => std::iter::once(Privilege::Any)
            .chain(catalog.declared_privileges(class_name))
            .collect(),
        Privilege::Forbidden => BTreeSet::new(),
        named => std::iter::once(named.clone())
            .chain(catalog.implied_privileges(class_name, named))
            .collect(),
    }
}

/// The privileges `grant` could hand out on its own class; a wildcard class
/// grant reports only what it grants regardless of class.
pub fn grantable_privileges(catalog: &Catalog, grant: &Permission) -> BTreeSet<Privilege> {
    match &grant.class_name {
        ResourceClass::Named(class_name) => grantable_privileges_for_class(catalog, grant, class_name),
        ResourceClass::Any => match &grant.privilege {
            Privilege::Forbidden => BTreeSet::new(),
            privilege => BTreeSet::from([privilege.clone()]),
        },
    }
}

/// The privileges `permission` could be switched to when edited: those
/// related to its privilege by implication in either direction, kept only
/// where one of `grants` authorizes the substituted permission.
pub fn alternate_privileges_for_edit(
    catalog: &Catalog,
    grants: &[Permission],
    permission: &Permission,
) -> Vec<Privilege> {
    let mut related = BTreeSet::from([permission.privilege.clone()]);
    if let ResourceClass::Named(class_name) = &permission.class_name {
        related.extend(catalog.implied_privileges(class_name, &permission.privilege));
        related.extend(catalog.implied_by(class_name, &permission.privilege));
    }
    related.into_iter()
        .filter(|privilege| {
            let candidate = permission.with_privilege(privilege.clone());
            grants.iter().any(|grant| can_grant(catalog, grant, &candidate))
        })
        .collect()
}

impl Engine {
    pub fn can_grant(&self, grant: &Permission, candidate: &Permission) -> bool {
        can_grant(self.catalog(), grant, candidate)
    }

    /// Raises unless a grant held by the acting user authorizes the
    /// candidate.  Created or updated candidates are validated against the
    /// catalog first.
    pub fn verify_grant(
        &self,
        ctx: &Context,
        candidate: &Permission,
        operation: Operation,
    ) -> Result<(), Error> {
        let privilege = Privilege::named(GRANT_PRIVILEGE);
        let who = ctx.require_acting(GRANT_PRIVILEGE)?;
        if operation != Operation::Destroy {
            self.catalog().validate_permission(candidate)?;
        }
        let success = who.grants()
            .iter()
            .any(|grant| self.can_grant(grant, candidate));
        self.record_grant(who, candidate, success);
        if success {
            log::debug!("user {} may {operation} permission {:?}", who.user().id, candidate.id);
            Ok(())
        } else {
            Err(Denial {
                privilege: privilege.to_string(),
                target: Target {
                    class_name: GRANT_CLASS.to_string(),
                    id: candidate.id
                        .map(TargetId::Saved)
                        .unwrap_or(TargetId::Unsaved),
                    name: Some(format!(
                        "{} on {}",
                        candidate.privilege,
                        candidate.class_name,
                    )),
                },
            }.into())
        }
    }
}
