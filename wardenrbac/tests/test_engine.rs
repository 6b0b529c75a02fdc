use std::sync::Arc;
use wardencore::ac::{
    Permission,
    Privilege,
    Record,
    Role,
    RoleAssignment,
    User,
};
use wardenrbac::{
    catalog::{Action, PrivilegeRef},
    error::{Denial, Error, Target, TargetId},
    Context,
    Engine,
    Snapshot,
};

use test_warden::{
    sink::RecordingSink,
    world::{self, World},
};

fn p(name: &str) -> Privilege {
    Privilege::from(name)
}

fn user(id: i64, name: &str) -> User {
    User {
        id,
        name: name.to_string(),
        firm_id: None,
    }
}

#[test]
fn scoped_to_firm() {
    let world = World::new();
    let fred = world.principal(world::FRED);
    let engine = &world.engine;

    assert!(engine.can(&fred, &p("post"), &world::blog(world::MERTZ_BLOG)));
    assert!(!engine.can(&fred, &p("post"), &world::blog(world::RICARDO_BLOG)));
    assert!(!engine.can(&fred, &p("post"), &world::blog(world::LUCY_BLOG)));

    // specializations are governed by their base class
    let special = Record::new("SpecialBlog")
        .id(9)
        .attr("owner_firm_id", world::MERTZ)
        .attr("owner_id", world::ETHEL);
    assert!(engine.can(&fred, &p("post"), &special));

    // an object missing the key is outside a permission constraining it
    let unscoped = Record::new("Blog").id(10);
    assert!(!engine.can(&fred, &p("post"), &unscoped));

    // classes outside the catalog are never permitted
    let stranger = Record::new("Stranger")
        .id(1)
        .attr("owner_firm_id", world::MERTZ);
    assert!(!engine.can(&fred, &p("post"), &stranger));
}

#[test]
fn implication_is_one_way() {
    let world = World::new();
    let engine = &world.engine;
    let blog = world::blog(world::MERTZ_BLOG);

    // fred holds add_post, which implies messwith
    let fred = world.principal(world::FRED);
    assert!(engine.can(&fred, &p("messwith"), &blog));
    assert!(engine.can(&fred, &p("add_post"), &blog));

    let snapshot = Snapshot::new(
        [Role { id: 1, name: "messer".into(), parent_role_id: None, owner_firm_id: None }],
        [RoleAssignment { id: 1, user_id: 1, role_id: 1, invalid_after: None }],
        [Permission::new(1, "messwith", "Blog").id(1)],
        world::NOW,
    );
    let messer = snapshot.principal(user(1, "messer"));
    assert!(engine.can(&messer, &p("messwith"), &blog));
    assert!(!engine.can(&messer, &p("add_post"), &blog));
}

#[test]
fn wildcard_and_owned_by_self() {
    let world = World::new();
    let engine = &world.engine;
    let ricky = world.principal(world::RICKY);

    for privilege in ["post", "edit", "kill_post", "blurfl"] {
        assert!(engine.can(&ricky, &p(privilege), &world::blog(world::RICARDO_BLOG)));
        // lucy's blog shares the firm but not the owner
        assert!(!engine.can(&ricky, &p(privilege), &world::blog(world::LUCY_BLOG)));
    }
    // nobody may ever do the forbidden operation, wildcards included
    assert!(!engine.can(&ricky, &Privilege::Forbidden, &world::blog(world::RICARDO_BLOG)));

    // users are their own owners
    assert!(engine.can(&ricky, &p("edit_profile"), &world.user(world::RICKY)));
    assert!(!engine.can(&ricky, &p("edit_profile"), &world.user(world::LUCY)));
}

#[test]
fn hierarchy_resolution() {
    let world = World::new();
    let snapshot = Snapshot::new(
        [
            Role { id: 1, name: "parent".into(), parent_role_id: None, owner_firm_id: None },
            Role { id: 2, name: "child".into(), parent_role_id: Some(1), owner_firm_id: None },
        ],
        [RoleAssignment { id: 1, user_id: 1, role_id: 2, invalid_after: None }],
        [
            Permission::new(1, "grok", "Blog").id(1),
            Permission::new(2, "blurfl", "Blog").id(2),
        ],
        world::NOW,
    );
    let principal = snapshot.principal(user(1, "kid"));
    assert!(principal.roles().contains(&1));
    assert!(principal.roles().contains(&2));

    let blog = world::blog(world::MERTZ_BLOG);
    assert!(world.engine.can(&principal, &p("grok"), &blog));
    assert!(world.engine.can(&principal, &p("blurfl"), &blog));
    assert!(!world.engine.can(&principal, &p("post"), &blog));

    // both permissions depend on the single assignment to the child
    assert!(!world.engine.could_without_role(&principal, 2, &p("grok"), &blog));
    assert!(!world.engine.could_without_role(&principal, 2, &p("blurfl"), &blog));
}

#[test]
fn could_without_role() {
    let world = World::new();
    let engine = &world.engine;
    let permissions = world.snapshot.permissions.clone();
    // ethel is made an editor on top of her poster assignment
    let snapshot = Snapshot::new(
        world::roles(),
        world::assignments()
            .into_iter()
            .chain([RoleAssignment {
                id: 100,
                user_id: world::ETHEL,
                role_id: world::MERTZ_EDITOR,
                invalid_after: None,
            }]),
        permissions,
        world::NOW,
    );
    let ethel = snapshot.principal(world.user(world::ETHEL));
    let blog = world::blog(world::MERTZ_BLOG);

    assert!(engine.can(&ethel, &p("edit"), &blog));
    assert!(!engine.could_without_role(&ethel, world::MERTZ_EDITOR, &p("edit"), &blog));
    // still a poster through the direct assignment
    assert!(engine.could_without_role(&ethel, world::MERTZ_EDITOR, &p("post"), &blog));

    // fred is a poster only by way of being an editor
    let fred = world.principal(world::FRED);
    assert!(engine.can(&fred, &p("post"), &blog));
    assert!(!engine.could_without_role(&fred, world::MERTZ_EDITOR, &p("post"), &blog));
}

#[test]
fn expired_assignments() {
    let world = World::new();
    let engine = &world.engine;
    let firm = world::firm(world::RICARDO);

    let lucy = world.principal(world::LUCY);
    assert!(!lucy.roles().contains(&world::FIRM_ADMIN));
    assert!(!engine.can(&lucy, &p("administer"), &firm));
    assert!(!engine.could_ever(&lucy, &p("administer"), "Firm"));
    // the lapsed assignment is still reported
    assert!(lucy.assignments().iter().any(|ra| ra.role_id == world::FIRM_ADMIN));

    // before it lapsed
    let earlier = World::at(engine.clone(), world::NOW - 10);
    let lucy = earlier.principal(world::LUCY);
    assert!(engine.can(&lucy, &p("administer"), &firm));
    assert_eq!(lucy.valid_until(), Some(world::NOW - 1));

    // ethel's posting rights end with her assignment
    let blog = world::blog(world::MERTZ_BLOG);
    let ethel = world.principal(world::ETHEL);
    assert!(engine.can(&ethel, &p("post"), &blog));
    let later = World::at(engine.clone(), world::ETHEL_EXPIRY);
    let ethel = later.principal(world::ETHEL);
    assert!(!engine.can(&ethel, &p("post"), &blog));
    assert!(ethel.roles().is_empty());
}

#[test]
fn hierarchy_monotonicity() {
    let world = World::new();
    let engine = &world.engine;
    let privileges = engine.catalog().declared_privileges("Blog");
    let extra = RoleAssignment {
        id: 100,
        user_id: world::ETHEL,
        role_id: world::OWN_BLOG_POSTER,
        invalid_after: None,
    };
    let with_extra = Snapshot::new(
        world::roles(),
        world::assignments().into_iter().chain([extra]),
        world.snapshot.permissions.clone(),
        world::NOW,
    );
    // plus a blog of ethel's own
    let blogs = world::blogs()
        .into_iter()
        .chain([Record::new("Blog")
            .id(4)
            .attr("owner_firm_id", world::RICARDO)
            .attr("owner_id", world::ETHEL)
        ])
        .collect::<Vec<_>>();

    let before = world.principal(world::ETHEL);
    let after = with_extra.principal(world.user(world::ETHEL));
    let mut gained = 0;
    for privilege in privileges.iter() {
        for blog in blogs.iter() {
            let had = engine.can(&before, privilege, blog);
            let has = engine.can(&after, privilege, blog);
            assert!(!had || has, "lost {privilege} on {:?}", blog.id);
            if has && !had {
                gained += 1;
            }
        }
    }
    assert!(gained > 0);
}

#[test]
fn permits_create() {
    let world = World::new();
    let engine = &world.engine;

    // creating an entry needs post on some blog and add_post to attach it
    assert!(engine.permits_create(&world.principal(world::FRED), "BlogEntry"));
    assert!(!engine.permits_create(&world.principal(world::ETHEL), "BlogEntry"));
    assert!(engine.permits_create(&world.principal(world::RICKY), "BlogEntry"));
    assert!(!engine.permits_create(&world.principal(world::NOBODY), "BlogEntry"));

    // blogs must be attached to a firm the user administers
    assert!(!engine.permits_create(&world.principal(world::FRED), "Blog"));
    assert!(!engine.permits_create(&world.principal(world::LUCY), "Blog"));
    let earlier = World::at(engine.clone(), world::NOW - 10);
    assert!(engine.permits_create(&earlier.principal(world::LUCY), "Blog"));

    // unguarded classes impose nothing
    assert!(engine.permits_create(&world.principal(world::NOBODY), "Firm"));
}

#[test]
fn permits_action() {
    let world = World::new();
    let engine = &world.engine;
    let fred = world.principal(world::FRED);
    let ethel = world.principal(world::ETHEL);
    let ricky = world.principal(world::RICKY);
    let mertz_blog = world::blog(world::MERTZ_BLOG);
    let ricardo_blog = world::blog(world::RICARDO_BLOG);

    assert!(engine.permits_action(&fred, Action::Update, &mertz_blog));
    assert!(!engine.permits_action(&ethel, Action::Update, &mertz_blog));
    assert!(!engine.permits_action(&fred, Action::Destroy, &mertz_blog));
    assert!(engine.permits_action(&ricky, Action::Destroy, &ricardo_blog));
    // no privilege is required to find blogs
    assert!(engine.permits_action(&ethel, Action::Find, &ricardo_blog));

    // destroying an entry dissociates it from its blog
    let entry = world::entry(Some(1), world::RICARDO_BLOG, world::RICKY);
    assert!(engine.permits_action(&ricky, Action::Destroy, &entry));
    let entry = world::entry(Some(2), world::MERTZ_BLOG, world::FRED);
    assert!(!engine.permits_action(&fred, Action::Destroy, &entry));
    // updating an entry requires the eponymous privilege on the entry
    assert!(!engine.permits_action(&fred, Action::Update, &entry));

    assert!(engine.permits_update_attr(&fred, &mertz_blog, "name"));
    assert!(!engine.permits_update_attr(&ethel, &mertz_blog, "name"));
    assert!(!engine.permits_update_attr(&ricky, &ricardo_blog, "id"));
    // unsaved objects are initialized, not updated
    let unsaved = Record::new("Blog").attr("owner_firm_id", world::RICARDO);
    assert!(engine.permits_update_attr(&ethel, &unsaved, "name"));
    assert!(engine.permits_read_attr(&ethel, &mertz_blog, "name"));

    let entry = world::entry(Some(1), world::MERTZ_BLOG, world::ETHEL);
    assert!(engine.permits_ref(&fred, &PrivilegeRef::on("edit", "blog"), &entry));
    assert!(!engine.permits_ref(&ethel, &PrivilegeRef::on("edit", "blog"), &entry));
    let orphan = Record::new("BlogEntry").id(5).attr("blog_id", world::MERTZ_BLOG);
    assert!(!engine.permits_ref(&fred, &PrivilegeRef::on("edit", "blog"), &orphan));
}

#[test]
fn require_records_events() {
    let sink = RecordingSink::new();
    let world = World::with_engine(Engine::new(Arc::new(world::catalog()))
        .sink(Arc::new(sink.clone())));
    let fred = world.principal(world::FRED);
    let ethel = world.principal(world::ETHEL);
    let blog = world::blog(world::MERTZ_BLOG);

    world.engine.require(&Context::for_user(&fred), &p("edit"), &blog).expect("fred may edit");
    let result = world.engine.require(&Context::for_user(&ethel), &p("edit"), &blog);
    assert_eq!(result, Err(Error::AuthorizationDenied(Denial {
        privilege: "edit".to_string(),
        target: Target {
            class_name: "Blog".to_string(),
            id: TargetId::Saved(world::MERTZ_BLOG),
            name: Some("mertz blog".to_string()),
        },
    })));

    let events = sink.take();
    assert_eq!(events.len(), 2);
    assert!(events[0].success);
    assert_eq!(events[0].to_string(), "edit on Blog (1) by fred (1)");
    assert!(!events[1].success);
    assert_eq!(events[1].user_name.as_deref(), Some("ethel"));

    // the missing user is a different failure, and records nothing
    assert_eq!(
        world.engine.require(&Context::new(), &p("edit"), &blog),
        Err(Error::UnresolvedUser { privilege: "edit".to_string() }),
    );
    assert!(sink.events().is_empty());
}

#[test]
fn require_action_with_associates() -> anyhow::Result<()> {
    let sink = RecordingSink::new();
    let world = World::with_engine(Engine::new(Arc::new(world::catalog()))
        .sink(Arc::new(sink.clone())));
    let fred = world.principal(world::FRED);
    let ethel = world.principal(world::ETHEL);
    let engine = &world.engine;

    let entry = world::entry(None, world::MERTZ_BLOG, world::FRED);
    engine.require_action(&Context::for_user(&fred), Action::Create, &entry)?;
    assert_eq!(sink.take().len(), 2);

    let result = engine.require_action(&Context::for_user(&ethel), Action::Create, &entry);
    assert!(matches!(
        result,
        Err(Error::AuthorizationDenied(Denial { ref privilege, .. })) if privilege == "add_post"
    ));
    let events = sink.take();
    assert_eq!(
        events.iter().map(|e| (e.privilege.as_str(), e.success)).collect::<Vec<_>>(),
        [("post", true), ("add_post", false)],
    );

    let create = engine.require_create(&Context::for_user(&ethel), "BlogEntry");
    assert!(matches!(
        create,
        Err(Error::AuthorizationDenied(Denial { target: Target { id: TargetId::Unsaved, .. }, .. }))
    ));

    // the blog to post on is absent
    let orphan = Record::new("BlogEntry");
    let result = engine.require_action(&Context::for_user(&fred), Action::Create, &orphan);
    assert_eq!(
        result.map_err(|e| e.to_string()),
        Err("not authorized to post MISSING Blog".to_string()),
    );
    Ok(())
}

#[test]
fn attribute_writes() -> anyhow::Result<()> {
    let world = World::new();
    let engine = &world.engine;
    let fred = world.principal(world::FRED);
    let ricky = world.principal(world::RICKY);
    let fred = Context::for_user(&fred);
    let ricky = Context::for_user(&ricky);

    let entry = world::entry(Some(1), world::MERTZ_BLOG, world::ETHEL);
    engine.check_attribute_write(&fred, &entry, "body", None)?;
    // moving the entry away needs kill_post on its current blog
    let result = engine.check_attribute_write(
        &fred,
        &entry,
        "blog_id",
        Some(&world::blog(world::MERTZ_BLOG)),
    );
    assert!(matches!(
        result,
        Err(Error::AuthorizationDenied(Denial { ref privilege, .. })) if privilege == "kill_post"
    ));

    let entry = world::entry(Some(2), world::RICARDO_BLOG, world::RICKY);
    engine.check_attribute_write(&ricky, &entry, "blog_id", Some(&world::blog(world::RICARDO_BLOG)))?;
    let result = engine.check_attribute_write(
        &ricky,
        &entry,
        "blog_id",
        Some(&world::blog(world::LUCY_BLOG)),
    );
    assert!(matches!(
        result,
        Err(Error::AuthorizationDenied(Denial { ref privilege, ref target })) if privilege == "add_post"
            && target.id == TargetId::Saved(world::LUCY_BLOG)
    ));

    // a new entry has nothing to be dissociated from
    let entry = world::entry(None, world::MERTZ_BLOG, world::FRED);
    engine.check_attribute_write(&fred, &entry, "blog_id", Some(&world::blog(world::MERTZ_BLOG)))?;

    // ids never change, whatever the permissions
    let blog = world::blog(world::RICARDO_BLOG);
    let result = engine.check_attribute_write(&ricky, &blog, "id", None);
    assert!(matches!(
        result,
        Err(Error::AuthorizationDenied(Denial { ref privilege, .. })) if privilege == Privilege::FORBIDDEN
    ));
    Ok(())
}

#[test]
fn acting_as() {
    let sink = RecordingSink::new();
    let world = World::with_engine(Engine::new(Arc::new(world::catalog()))
        .sink(Arc::new(sink.clone())));
    let fred = world.principal(world::FRED);
    let ethel = world.principal(world::ETHEL);
    let blog = world::blog(world::MERTZ_BLOG);

    let ctx = Context::for_user(&ethel);
    assert!(world.engine.require(&ctx, &p("edit"), &blog).is_err());
    let acting = ctx.acting_as(&fred);
    assert!(world.engine.require(&acting, &p("edit"), &blog).is_ok());
    assert!(world.engine.require(&acting.as_user_of_record(), &p("edit"), &blog).is_err());

    let events = sink.take();
    assert_eq!(
        events.iter().map(|e| e.user_id).collect::<Vec<_>>(),
        [Some(world::ETHEL), Some(world::FRED), Some(world::ETHEL)],
    );
}
