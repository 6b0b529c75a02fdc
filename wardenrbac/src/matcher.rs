//! Matching of a single permission against an object and a privilege.

use wardencore::ac::{
    AccessControlled,
    Permission,
    Privilege,
    ResourceClass,
    Value,
};

use crate::catalog::Catalog;

/// Whether the permission's scope covers the object for the acting user,
/// regardless of privilege.
pub fn matches(
    catalog: &Catalog,
    permission: &Permission,
    object: &dyn AccessControlled,
    user_id: i64,
) -> bool {
    let schema = match catalog.schema(object.class_name()) {
        Some(schema) => schema,
        None => return false,
    };
    if !permission.class_name.covers(schema.name()) {
        return false;
    }
    if permission.target_owned_by_self {
        let owner = schema.owner_key()
            .and_then(|key| object.attribute(key));
        if owner != Some(Value::Integer(user_id)) {
            return false;
        }
    }
    scope_matches(catalog, permission, object)
}

/// The target-key part of [`matches`]: every declared key the permission
/// constrains must equal the object's value.
pub fn scope_matches(
    catalog: &Catalog,
    permission: &Permission,
    object: &dyn AccessControlled,
) -> bool {
    catalog.access_control_keys(object.class_name())
        .iter()
        .all(|key| match permission.target_value(key) {
            None => true,
            Some(target) => object.attribute(key).as_ref() == Some(target),
        })
}

/// Whether holding the permission's privilege confers `requested` on
/// objects of `class_name`.
pub fn covers(
    catalog: &Catalog,
    permission: &Permission,
    requested: &Privilege,
    class_name: &str,
) -> bool {
    if *requested == Privilege::Forbidden {
        return false;
    }
    match &permission.privilege {
        Privilege::Any => true,
        Privilege::Forbidden => false,
        held => held == requested || match &permission.class_name {
            ResourceClass::Named(c) => catalog.implies(c, held, requested),
            ResourceClass::Any => catalog.implies(class_name, held, requested),
        },
    }
}

/// A non-grant permission conferring `privilege` on `object`.
pub fn allows(
    catalog: &Catalog,
    permission: &Permission,
    object: &dyn AccessControlled,
    privilege: &Privilege,
    user_id: i64,
) -> bool {
    !permission.is_grant
        && covers(catalog, permission, privilege, object.class_name())
        && matches(catalog, permission, object, user_id)
}
