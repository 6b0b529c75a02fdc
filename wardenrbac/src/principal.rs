use std::sync::Arc;
use wardencore::ac::{
    Permission,
    Role,
    RoleAssignment,
    User,
};

use crate::{
    error::Error,
    resolver::{RoleGraph, RoleSet},
};

/// One user's access, materialized as of an instant.
#[derive(Clone, Debug)]
pub struct Principal {
    user: User,
    as_of: i64,
    graph: Arc<RoleGraph>,
    assignments: Vec<RoleAssignment>,
    roles: RoleSet,
    permissions: Vec<Permission>,
    grants: Vec<Permission>,
}

impl Principal {
    /// Resolves the user's effective roles and keeps the permissions that
    /// belong to them; permissions of other roles are discarded.
    pub fn new(
        user: User,
        graph: Arc<RoleGraph>,
        assignments: impl IntoIterator<Item = RoleAssignment>,
        as_of: i64,
        permissions: impl IntoIterator<Item = Permission>,
    ) -> Self {
        let assignments = assignments.into_iter()
            .filter(|ra| ra.user_id == user.id)
            .collect::<Vec<_>>();
        let roles = graph.resolve(&assignments, as_of);
        let (grants, permissions): (Vec<_>, Vec<_>) = permissions.into_iter()
            .filter(|p| roles.contains(&p.role_id))
            .partition(|p| p.is_grant);
        log::trace!("user {} resolved to roles {roles:?} as of {as_of}", user.id);
        Self {
            user,
            as_of,
            graph,
            assignments,
            roles,
            permissions,
            grants,
        }
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn as_of(&self) -> i64 {
        self.as_of
    }

    pub fn graph(&self) -> &RoleGraph {
        &self.graph
    }

    /// All of the user's assignments, lapsed ones included.
    pub fn assignments(&self) -> &[RoleAssignment] {
        &self.assignments
    }

    /// The earliest instant at which a current assignment lapses, after
    /// which the resolved roles no longer hold.
    pub fn valid_until(&self) -> Option<i64> {
        self.assignments.iter()
            .filter(|ra| ra.is_current(self.as_of))
            .filter_map(|ra| ra.invalid_after)
            .min()
    }

    pub fn roles(&self) -> &RoleSet {
        &self.roles
    }

    /// Permissions conferring access, grants excluded.
    pub fn permissions(&self) -> &[Permission] {
        &self.permissions
    }

    pub fn grants(&self) -> &[Permission] {
        &self.grants
    }
}

/// Role and permission data for every user as of an instant, as needed to
/// answer which users may access an object.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub graph: Arc<RoleGraph>,
    pub assignments: Vec<RoleAssignment>,
    pub permissions: Vec<Permission>,
    pub as_of: i64,
}

impl Snapshot {
    pub fn new(
        roles: impl IntoIterator<Item = Role>,
        assignments: impl IntoIterator<Item = RoleAssignment>,
        permissions: impl IntoIterator<Item = Permission>,
        as_of: i64,
    ) -> Self {
        Self {
            graph: Arc::new(roles.into_iter().collect()),
            assignments: assignments.into_iter().collect(),
            permissions: permissions.into_iter().collect(),
            as_of,
        }
    }

    pub fn principal(&self, user: User) -> Principal {
        Principal::new(
            user,
            self.graph.clone(),
            self.assignments.iter().cloned(),
            self.as_of,
            self.permissions.iter().cloned(),
        )
    }
}

/// The principals a call chain runs on behalf of.
///
/// The user of record is who initiated the work; the acting user is whose
/// privileges are checked, which differs only while acting as someone else.
#[derive(Clone, Copy, Debug, Default)]
pub struct Context<'a> {
    of_record: Option<&'a Principal>,
    acting: Option<&'a Principal>,
}

impl<'a> Context<'a> {
    /// A context with nobody bound; every imperative check fails.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_user(principal: &'a Principal) -> Self {
        Self {
            of_record: Some(principal),
            acting: Some(principal),
        }
    }

    pub fn acting_as(&self, principal: &'a Principal) -> Self {
        Self {
            of_record: self.of_record,
            acting: Some(principal),
        }
    }

    pub fn as_user_of_record(&self) -> Self {
        Self {
            of_record: self.of_record,
            acting: self.of_record,
        }
    }

    pub fn acting(&self) -> Option<&'a Principal> {
        self.acting
    }

    pub fn of_record(&self) -> Option<&'a Principal> {
        self.of_record
    }

    pub(crate) fn require_acting(&self, privilege: &str) -> Result<&'a Principal, Error> {
        self.acting.ok_or_else(|| Error::UnresolvedUser {
            privilege: privilege.to_string(),
        })
    }
}

#[cfg(test)]
mod test {
    use wardencore::ac::{Permission, Role, RoleAssignment, User};
    use super::*;

    fn snapshot() -> Snapshot {
        Snapshot::new(
            [
                Role { id: 1, name: "parent".into(), parent_role_id: None, owner_firm_id: None },
                Role { id: 2, name: "child".into(), parent_role_id: Some(1), owner_firm_id: None },
                Role { id: 3, name: "other".into(), parent_role_id: None, owner_firm_id: None },
            ],
            [
                RoleAssignment { id: 1, user_id: 1, role_id: 2, invalid_after: None },
                RoleAssignment { id: 2, user_id: 2, role_id: 3, invalid_after: None },
            ],
            [
                Permission::new(1, "post", "Blog").id(1),
                Permission::new(2, "edit", "Blog").id(2).grant(true),
                Permission::new(3, "edit", "Blog").id(3),
            ],
            0,
        )
    }

    fn user(id: i64) -> User {
        User { id, name: format!("user{id}"), firm_id: None }
    }

    #[test]
    fn principal() {
        let principal = snapshot().principal(user(1));
        assert_eq!(principal.roles(), &RoleSet::from([1, 2]));
        assert_eq!(principal.assignments().len(), 1);
        assert_eq!(principal.permissions().iter().map(|p| p.id).collect::<Vec<_>>(), [Some(1)]);
        assert_eq!(principal.grants().iter().map(|p| p.id).collect::<Vec<_>>(), [Some(2)]);

        assert_eq!(principal.valid_until(), None);

        let principal = snapshot().principal(user(9));
        assert!(principal.roles().is_empty());
        assert!(principal.permissions().is_empty());
    }

    #[test]
    fn context() {
        let snapshot = snapshot();
        let fred = snapshot.principal(user(1));
        let ethel = snapshot.principal(user(2));

        assert!(matches!(
            Context::new().require_acting("post"),
            Err(Error::UnresolvedUser { privilege }) if privilege == "post",
        ));

        let ctx = Context::for_user(&fred);
        let acting = ctx.acting_as(&ethel);
        assert_eq!(acting.acting().map(|p| p.user().id), Some(2));
        assert_eq!(acting.of_record().map(|p| p.user().id), Some(1));
        let restored = acting.as_user_of_record();
        assert_eq!(restored.acting().map(|p| p.user().id), Some(1));
    }
}
