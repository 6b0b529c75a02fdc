//! A small blogging world: two firms, their blogs and entries, and users
//! holding a spread of roles, permissions and grants.

use std::sync::Arc;
use wardencore::ac::{
    Permission,
    Record,
    Role,
    RoleAssignment,
    User,
};
use wardenrbac::{
    catalog::{Action, AttributeOp, PrivilegeRef},
    Builder,
    Catalog,
    ClassBuilder,
    Engine,
    Principal,
    Snapshot,
};

pub const MERTZ: i64 = 1;
pub const RICARDO: i64 = 2;

pub const FRED: i64 = 1;
pub const ETHEL: i64 = 2;
pub const RICKY: i64 = 3;
pub const LUCY: i64 = 4;
pub const UNIVERSAL_GRANT_GUY: i64 = 5;
pub const NOBODY: i64 = 6;

pub const MERTZ_POSTER: i64 = 1;
pub const MERTZ_EDITOR: i64 = 2;
pub const OWN_BLOG_POSTER: i64 = 3;
pub const UNIVERSAL_GRANTER: i64 = 4;
pub const MERTZ_GRANTER: i64 = 5;
pub const FIRM_ADMIN: i64 = 6;

pub const MERTZ_BLOG: i64 = 1;
pub const RICARDO_BLOG: i64 = 2;
pub const LUCY_BLOG: i64 = 3;

/// An entry belonging to no blog.
pub const ORPHAN_ENTRY: i64 = 10;

/// The instant the world is observed at.
pub const NOW: i64 = 1_500_000_000;
/// When ethel's poster assignment lapses.
pub const ETHEL_EXPIRY: i64 = 1_600_000_000;

pub fn catalog() -> Catalog {
    Builder::new()
        .class(ClassBuilder::new("Firm")
            .declare(["administer"])
            .associate_privilege("Blog", "owner_firm", "administer")
        )
        .class(ClassBuilder::new("User")
            .declare(["edit_profile"])
            .access_control_keys(["id", "firm_id"])
            .owner_key("id")
        )
        .class(ClassBuilder::new("Blog")
            .declare(["post", "edit", "messwith", "add_post", "kill_post", "grok", "blurfl"])
            .implies("add_post", "messwith")
            .access_control_keys(["id", "owner_firm_id"])
            .owner_key("owner_id")
            .require_for_action(Action::Update, PrivilegeRef::new("edit"))
            .require_eponymous([Action::Destroy])
            .guard_attribute(AttributeOp::Update, "name", PrivilegeRef::new("edit"))
            .belongs_to("owner_firm", "owner_firm_id", "Firm", false)
            .associate_privilege("BlogEntry", "blog", "add_post")
            .dissociate_privilege("BlogEntry", "blog", "kill_post")
        )
        .class(ClassBuilder::new("BlogEntry")
            .owner_key("entry_owner_id")
            .require_for_action(Action::Create, PrivilegeRef::on("post", "blog"))
            .require_eponymous([Action::Update])
            .guard_attribute(AttributeOp::Update, "body", PrivilegeRef::on("edit", "blog"))
            .belongs_to("blog", "blog_id", "Blog", false)
        )
        .class(ClassBuilder::new("Role")
            .declare(["assign"])
            .access_control_keys(["id", "owner_firm_id"])
            .associate_privilege("RoleAssignment", "role", "assign")
            .dissociate_privilege("RoleAssignment", "role", "assign")
        )
        .class(ClassBuilder::new("RoleAssignment")
            .guard_attribute(AttributeOp::Update, "invalid_after", PrivilegeRef::on("assign", "role"))
            .belongs_to("role", "role_id", "Role", false)
        )
        .specialize("SpecialBlog", "Blog")
        .build()
        .expect("the blog world catalog is valid")
}

pub fn users() -> Vec<User> {
    [
        (FRED, "fred", Some(MERTZ)),
        (ETHEL, "ethel", Some(MERTZ)),
        (RICKY, "ricky", Some(RICARDO)),
        (LUCY, "lucy", Some(RICARDO)),
        (UNIVERSAL_GRANT_GUY, "universal_grant_guy", None),
        (NOBODY, "nobody", None),
    ]
    .into_iter()
    .map(|(id, name, firm_id)| User {
        id,
        name: name.to_string(),
        firm_id,
    })
    .collect()
}

pub fn roles() -> Vec<Role> {
    [
        (MERTZ_POSTER, "mertz_poster", None, Some(MERTZ)),
        // editors are posters too
        (MERTZ_EDITOR, "mertz_editor", Some(MERTZ_POSTER), Some(MERTZ)),
        (OWN_BLOG_POSTER, "own_blog_poster", None, None),
        (UNIVERSAL_GRANTER, "universal_granter", None, None),
        (MERTZ_GRANTER, "mertz_granter", None, Some(MERTZ)),
        (FIRM_ADMIN, "firm_admin", None, None),
    ]
    .into_iter()
    .map(|(id, name, parent_role_id, owner_firm_id)| Role {
        id,
        name: name.to_string(),
        parent_role_id,
        owner_firm_id,
    })
    .collect()
}

pub fn assignments() -> Vec<RoleAssignment> {
    [
        (FRED, MERTZ_EDITOR, None),
        (FRED, MERTZ_GRANTER, None),
        (ETHEL, MERTZ_POSTER, Some(ETHEL_EXPIRY)),
        (RICKY, OWN_BLOG_POSTER, None),
        (LUCY, OWN_BLOG_POSTER, None),
        (LUCY, FIRM_ADMIN, Some(NOW - 1)),
        (UNIVERSAL_GRANT_GUY, UNIVERSAL_GRANTER, None),
    ]
    .into_iter()
    .enumerate()
    .map(|(i, (user_id, role_id, invalid_after))| RoleAssignment {
        id: i as i64 + 1,
        user_id,
        role_id,
        invalid_after,
    })
    .collect()
}

/// Permissions without ids, in insertion order; ids are assigned from 1.
pub fn permissions() -> Vec<Permission> {
    vec![
        Permission::new(MERTZ_POSTER, "post", "Blog")
            .target("owner_firm_id", MERTZ),
        Permission::new(MERTZ_EDITOR, "edit", "Blog")
            .target("owner_firm_id", MERTZ),
        Permission::new(MERTZ_EDITOR, "add_post", "Blog")
            .target("owner_firm_id", MERTZ),
        Permission::new(OWN_BLOG_POSTER, "any", "Blog")
            .owned_by_self(true),
        Permission::new(OWN_BLOG_POSTER, "edit_profile", "User")
            .owned_by_self(true),
        Permission::new(UNIVERSAL_GRANTER, "any", "any")
            .grant(true)
            .grant_option(true),
        Permission::new(MERTZ_GRANTER, "post", "Blog")
            .grant(true)
            .target("owner_firm_id", MERTZ),
        Permission::new(FIRM_ADMIN, "administer", "Firm"),
        Permission::new(MERTZ_GRANTER, "assign", "Role")
            .target("owner_firm_id", MERTZ),
    ]
}

pub fn firm(id: i64) -> Record {
    let name = match id {
        MERTZ => "mertz",
        RICARDO => "ricardo",
        _ => "unknown",
    };
    Record::new("Firm").id(id).name(name)
}

pub fn blogs() -> Vec<Record> {
    [
        (MERTZ_BLOG, "mertz blog", MERTZ, FRED),
        (RICARDO_BLOG, "ricardo blog", RICARDO, RICKY),
        (LUCY_BLOG, "lucy blog", RICARDO, LUCY),
    ]
    .into_iter()
    .map(|(id, name, owner_firm_id, owner_id)| Record::new("Blog")
        .id(id)
        .name(name)
        .attr("owner_firm_id", owner_firm_id)
        .attr("owner_id", owner_id)
        .associate("owner_firm", firm(owner_firm_id))
    )
    .collect()
}

pub fn blog(id: i64) -> Record {
    blogs().into_iter()
        .find(|b| b.id == Some(id))
        .expect("no such blog")
}

pub fn entry(id: Option<i64>, blog_id: i64, entry_owner_id: i64) -> Record {
    let mut record = Record::new("BlogEntry")
        .attr("blog_id", blog_id)
        .attr("entry_owner_id", entry_owner_id)
        .associate("blog", blog(blog_id));
    record.id = id;
    record
}

/// Three entries on each blog, by fred, ricky and lucy in turn, numbered
/// from 1; then ricky's orphan.
pub fn entries() -> Vec<Record> {
    let mut entries = Vec::new();
    for blog in blogs() {
        let blog_id = blog.id.unwrap_or_default();
        for owner in [FRED, RICKY, LUCY] {
            entries.push(entry(Some(entries.len() as i64 + 1), blog_id, owner));
        }
    }
    entries.push(Record::new("BlogEntry")
        .id(ORPHAN_ENTRY)
        .attr("entry_owner_id", RICKY));
    entries
}

/// The whole world, materialized as of [`NOW`].
pub struct World {
    pub engine: Engine,
    pub snapshot: Snapshot,
    pub users: Vec<User>,
}

impl World {
    pub fn new() -> Self {
        Self::with_engine(Engine::new(Arc::new(catalog())))
    }

    pub fn with_engine(engine: Engine) -> Self {
        Self::at(engine, NOW)
    }

    pub fn at(engine: Engine, as_of: i64) -> Self {
        let permissions = permissions()
            .into_iter()
            .enumerate()
            .map(|(i, p)| p.id(i as i64 + 1));
        Self {
            engine,
            snapshot: Snapshot::new(roles(), assignments(), permissions, as_of),
            users: users(),
        }
    }

    pub fn user(&self, id: i64) -> User {
        self.users.iter()
            .find(|u| u.id == id)
            .cloned()
            .expect("no such user")
    }

    pub fn principal(&self, id: i64) -> Principal {
        self.snapshot.principal(self.user(id))
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
