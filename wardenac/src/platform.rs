use std::sync::Arc;
use wardencore::{
    ac::{
        predicate::Predicate,
        AccessControlled,
        Permission,
        Privilege,
        Record,
        ResourceClass,
        Role,
        RoleAssignment,
        User,
    },
    clock::{Clock, SystemClock},
    platform::AccessPlatform,
};
use wardenrbac::{
    cache::PrincipalCache,
    catalog::Action,
    grant::Operation,
    resolver::RoleGraph,
    Catalog,
    Context,
    Engine,
    Principal,
    Snapshot,
};

use crate::error::Error;

#[derive(Default)]
pub struct Builder {
    // platform
    access_platform: Option<Box<dyn AccessPlatform>>,
    engine: Option<Engine>,
    clock: Option<Arc<dyn Clock>>,
    // resolved principals are kept until invalidated
    disable_cache: bool,
}

pub struct Platform {
    access_platform: Box<dyn AccessPlatform>,
    engine: Engine,
    clock: Arc<dyn Clock>,
    cache: Option<PrincipalCache>,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn access_platform(mut self, val: impl AccessPlatform + 'static) -> Self {
        self.access_platform = Some(Box::new(val));
        self
    }

    pub fn boxed_access_platform(mut self, val: Box<dyn AccessPlatform>) -> Self {
        self.access_platform = Some(val);
        self
    }

    pub fn engine(mut self, val: Engine) -> Self {
        self.engine = Some(val);
        self
    }

    /// Shorthand for an engine over the catalog logging its decisions.
    pub fn catalog(self, val: Catalog) -> Self {
        self.engine(Engine::new(val))
    }

    pub fn clock(mut self, val: impl Clock + 'static) -> Self {
        self.clock = Some(Arc::new(val));
        self
    }

    pub fn disable_cache(mut self, val: bool) -> Self {
        self.disable_cache = val;
        self
    }

    pub fn build(self) -> Result<Arc<Platform>, Error> {
        Ok(Arc::new(Platform {
            access_platform: self.access_platform
                .ok_or(Error::MissingArgument("access_platform"))?,
            engine: self.engine
                .ok_or(Error::MissingArgument("engine"))?,
            clock: self.clock
                .unwrap_or_else(|| Arc::new(SystemClock)),
            cache: (!self.disable_cache).then(PrincipalCache::new),
        }))
    }
}

fn assignment_record(
    id: Option<i64>,
    user_id: i64,
    role: &Role,
    invalid_after: Option<i64>,
) -> Record {
    let mut record = Record::new(RoleAssignment::CLASS_NAME)
        .attr("user_id", user_id)
        .attr("role_id", role.id)
        .associate("role", Record::from(role));
    record.id = id;
    match invalid_after {
        Some(ts) => record.attr("invalid_after", ts),
        None => record,
    }
}

impl Platform {
    pub fn access_platform(&self) -> &dyn AccessPlatform {
        self.access_platform.as_ref()
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn now(&self) -> i64 {
        self.clock.now()
    }

    fn invalidate(&self, user_id: i64) {
        if let Some(cache) = &self.cache {
            cache.invalidate(user_id);
        }
    }

    fn invalidate_all(&self) {
        if let Some(cache) = &self.cache {
            log::trace!("dropping all cached principals");
            cache.invalidate_all();
        }
    }

    async fn role(&self, id: i64) -> Result<Role, Error> {
        self.access_platform.get_role_by_id(id).await?
            .ok_or(Error::UnknownRecord { class_name: Role::CLASS_NAME, id })
    }

    async fn role_assignment(&self, id: i64) -> Result<RoleAssignment, Error> {
        self.access_platform.get_role_assignment(id).await?
            .ok_or(Error::UnknownRecord { class_name: RoleAssignment::CLASS_NAME, id })
    }
}

// Principal resolution.
impl Platform {
    async fn load_principal(&self, user: User, as_of: i64) -> Result<Principal, Error> {
        let (roles, assignments) = futures::try_join!(
            self.access_platform.list_roles(),
            self.access_platform.list_role_assignments_for_user(user.id),
        )?;
        let graph: Arc<RoleGraph> = Arc::new(roles.into_iter().collect());
        let role_ids = graph.resolve(&assignments, as_of)
            .into_iter()
            .collect::<Vec<_>>();
        let permissions = self.access_platform
            .list_permissions_for_roles(&role_ids)
            .await?;
        log::debug!(
            "loaded principal for user {} with {} permissions as of {as_of}",
            user.id,
            permissions.len(),
        );
        Ok(Principal::new(user, graph, assignments, as_of, permissions))
    }

    async fn resolve_principal(&self, user: User, force_reload: bool) -> Result<Arc<Principal>, Error> {
        let as_of = self.now();
        let cache = match &self.cache {
            Some(cache) => cache,
            None => return Ok(Arc::new(self.load_principal(user, as_of).await?)),
        };
        if !force_reload {
            if let Some(principal) = cache.get(user.id, as_of) {
                return Ok(principal);
            }
        }
        Ok(cache.insert(self.load_principal(user, as_of).await?))
    }

    /// The user's access as of now, from the cache unless `force_reload`
    /// is set or the cached entry has lapsed.
    pub async fn principal(
        &self,
        user_id: i64,
        force_reload: bool,
    ) -> Result<Arc<Principal>, Error> {
        let user = self.access_platform.get_user_by_id(user_id).await?
            .ok_or(Error::UnknownUser(user_id))?;
        self.resolve_principal(user, force_reload).await
    }

    pub async fn principal_by_name(
        &self,
        name: &str,
        force_reload: bool,
    ) -> Result<Arc<Principal>, Error> {
        let user = self.access_platform.get_user_by_name(name).await?
            .ok_or_else(|| Error::UnknownUserName(name.to_string()))?;
        self.resolve_principal(user, force_reload).await
    }

    /// Everything needed to find the users holding privileges on objects of
    /// the class: its permissions (wildcard ones included), the role graph,
    /// and the assignments to every role that inherits those permissions.
    pub async fn snapshot_for(&self, class_name: &ResourceClass) -> Result<Snapshot, Error> {
        let as_of = self.now();
        let (roles, permissions) = futures::try_join!(
            self.access_platform.list_roles(),
            self.access_platform.list_permissions_for_class(class_name),
        )?;
        let graph: RoleGraph = roles.into_iter().collect();
        let role_ids = graph.descendants(permissions.iter().map(|p| p.role_id))
            .into_iter()
            .collect::<Vec<_>>();
        let assignments = self.access_platform
            .list_role_assignments_for_roles(&role_ids)
            .await?;
        Ok(Snapshot {
            graph: Arc::new(graph),
            assignments,
            permissions,
            as_of,
        })
    }

    /// The users holding `privilege` on the object, as a predicate over
    /// the users table.
    pub async fn users_permitted(
        &self,
        privilege: &Privilege,
        object: &dyn AccessControlled,
    ) -> Result<Predicate, Error> {
        let base = match self.engine.catalog().base_class(object.class_name()) {
            Some(base) => ResourceClass::named(base),
            None => return Ok(Predicate::False),
        };
        let snapshot = self.snapshot_for(&base).await?;
        Ok(self.engine.users_permitted(&snapshot, privilege, object))
    }
}

// Permission management; every change must be covered by a grant held by
// the acting user.
impl Platform {
    pub async fn create_permission(
        &self,
        ctx: &Context<'_>,
        permission: Permission,
    ) -> Result<Permission, Error> {
        self.engine.verify_grant(ctx, &permission, Operation::Create)?;
        let id = self.access_platform.add_permission(&permission).await?;
        self.invalidate_all();
        Ok(permission.id(id))
    }

    /// Rewrites a stored permission.  The granter must hold a grant
    /// covering both the stored values and the new ones.
    pub async fn update_permission(
        &self,
        ctx: &Context<'_>,
        permission: &Permission,
    ) -> Result<(), Error> {
        let id = permission.id
            .ok_or(Error::MissingArgument("id"))?;
        let current = self.access_platform.get_permission(id).await?
            .ok_or(Error::UnknownRecord { class_name: "Permission", id })?;
        // the stored values may predate the catalog, so they are only
        // checked for coverage
        self.engine.verify_grant(ctx, &current, Operation::Destroy)?;
        self.engine.verify_grant(ctx, permission, Operation::Update)?;
        if !self.access_platform.update_permission(permission).await? {
            return Err(Error::UnknownRecord { class_name: "Permission", id });
        }
        self.invalidate_all();
        Ok(())
    }

    /// Removes the permission, returning what was removed.
    pub async fn destroy_permission(
        &self,
        ctx: &Context<'_>,
        id: i64,
    ) -> Result<Permission, Error> {
        let permission = self.access_platform.get_permission(id).await?
            .ok_or(Error::UnknownRecord { class_name: "Permission", id })?;
        self.engine.verify_grant(ctx, &permission, Operation::Destroy)?;
        self.access_platform.remove_permission(id).await?;
        self.invalidate_all();
        Ok(permission)
    }
}

// Role assignment.
impl Platform {
    pub async fn assign_role(
        &self,
        ctx: &Context<'_>,
        user_id: i64,
        role_id: i64,
        invalid_after: Option<i64>,
    ) -> Result<RoleAssignment, Error> {
        self.access_platform.get_user_by_id(user_id).await?
            .ok_or(Error::UnknownUser(user_id))?;
        let role = self.role(role_id).await?;
        let record = assignment_record(None, user_id, &role, invalid_after);
        self.engine.require_action(ctx, Action::Create, &record)?;
        let id = self.access_platform
            .add_role_assignment(user_id, role_id, invalid_after)
            .await?;
        self.invalidate(user_id);
        Ok(RoleAssignment {
            id,
            user_id,
            role_id,
            invalid_after,
        })
    }

    /// Sets (or clears) the instant after which the assignment lapses.
    pub async fn expire_role_assignment(
        &self,
        ctx: &Context<'_>,
        id: i64,
        invalid_after: Option<i64>,
    ) -> Result<RoleAssignment, Error> {
        let assignment = self.role_assignment(id).await?;
        let role = self.role(assignment.role_id).await?;
        let record = assignment_record(
            Some(id),
            assignment.user_id,
            &role,
            assignment.invalid_after,
        );
        self.engine.require_action(ctx, Action::Update, &record)?;
        self.engine.check_attribute_write(ctx, &record, "invalid_after", None)?;
        self.access_platform
            .set_role_assignment_invalid_after(id, invalid_after)
            .await?;
        self.invalidate(assignment.user_id);
        Ok(RoleAssignment {
            invalid_after,
            .. assignment
        })
    }

    /// Removes the assignment, returning what was removed.
    pub async fn remove_role_assignment(
        &self,
        ctx: &Context<'_>,
        id: i64,
    ) -> Result<RoleAssignment, Error> {
        let assignment = self.role_assignment(id).await?;
        let role = self.role(assignment.role_id).await?;
        let record = assignment_record(
            Some(id),
            assignment.user_id,
            &role,
            assignment.invalid_after,
        );
        self.engine.require_action(ctx, Action::Destroy, &record)?;
        self.access_platform.remove_role_assignment(id).await?;
        self.invalidate(assignment.user_id);
        Ok(assignment)
    }
}
