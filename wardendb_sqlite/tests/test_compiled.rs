use wardencore::ac::{
    predicate::IdFilter,
    traits::{PermissionBackend, RoleAssignmentBackend, RoleBackend, UserBackend},
    AccessControlled,
    Privilege,
    Record,
    User,
};
use wardendb_sqlite::SqliteBackend;
use wardenrbac::{
    catalog::{Action, PrivilegeRef},
    Engine,
    Snapshot,
};

use test_warden::{
    sqlite::{create_blog_entry_table, create_blog_table, create_seeded_sqlite_backend},
    world,
};

// the snapshot as stored, rather than as the world declares it
async fn load_snapshot(backend: &SqliteBackend) -> anyhow::Result<Snapshot> {
    let roles = backend.list_roles().await?;
    let role_ids = roles.iter().map(|role| role.id).collect::<Vec<_>>();
    let assignments = backend.list_role_assignments_for_roles(&role_ids).await?;
    let permissions = backend.list_permissions_for_roles(&role_ids).await?;
    Ok(Snapshot::new(roles, assignments, permissions, world::NOW))
}

async fn load_users(backend: &SqliteBackend) -> anyhow::Result<Vec<User>> {
    let mut users = Vec::new();
    for id in world::users().into_iter().map(|user| user.id) {
        let user = backend.get_user_by_id(id).await?
            .ok_or_else(|| anyhow::anyhow!("user {id} not stored"))?;
        users.push(user);
    }
    Ok(users)
}

fn privileges(engine: &Engine) -> Vec<Privilege> {
    engine.catalog()
        .declared_privileges("Blog")
        .into_iter()
        .chain([Privilege::Any, Privilege::from("undeclared")])
        .collect()
}

#[async_std::test]
async fn stored_snapshot_matches_world() -> anyhow::Result<()> {
    let backend = create_seeded_sqlite_backend().await?;
    let snapshot = load_snapshot(&backend).await?;
    let world = world::World::new();
    assert_eq!(snapshot.permissions, world.snapshot.permissions);
    assert_eq!(snapshot.assignments.len(), world::assignments().len());
    Ok(())
}

#[async_std::test]
async fn id_filters_select_permitted_blogs() -> anyhow::Result<()> {
    let backend = create_seeded_sqlite_backend().await?;
    create_blog_table(&backend).await?;
    let engine = Engine::new(world::catalog());
    let snapshot = load_snapshot(&backend).await?;

    for user in load_users(&backend).await? {
        let name = user.name.clone();
        let who = snapshot.principal(user);
        for privilege in privileges(&engine) {
            let filter = engine.compile_id_filter(&who, &privilege, "Blog");
            let selected = backend.select_ids(&filter).await?;
            let expected = world::blogs()
                .into_iter()
                .filter(|blog| engine.can(&who, &privilege, blog))
                .filter_map(|blog| blog.id)
                .collect::<Vec<_>>();
            assert_eq!(selected, expected, "{name} {privilege}");
        }
    }
    Ok(())
}

#[async_std::test]
async fn users_permitted_selects_permitted_users() -> anyhow::Result<()> {
    let backend = create_seeded_sqlite_backend().await?;
    let engine = Engine::new(world::catalog());
    let snapshot = load_snapshot(&backend).await?;
    let users = load_users(&backend).await?;
    let user_table = engine.catalog().user_table().to_string();

    for blog in world::blogs() {
        for privilege in privileges(&engine) {
            let predicate = engine.users_permitted(&snapshot, &privilege, &blog);
            let selected = backend.select_ids(&IdFilter::new(user_table.as_str(), predicate)).await?;
            let expected = users.iter()
                .filter(|user| engine.can(&snapshot.principal((*user).clone()), &privilege, &blog))
                .map(|user| user.id)
                .collect::<Vec<_>>();
            assert_eq!(selected, expected, "{privilege} {:?}", blog.id);
        }
    }

    // fred and ethel post on the mertz blog
    let predicate = engine.users_permitted(
        &snapshot,
        &Privilege::from("post"),
        &world::blog(world::MERTZ_BLOG),
    );
    assert_eq!(
        backend.select_ids_where(&user_table, &predicate).await?,
        [world::FRED, world::ETHEL],
    );
    Ok(())
}

fn entry_ids(decide: impl Fn(&Record) -> bool) -> Vec<i64> {
    world::entries()
        .iter()
        .filter(|entry| decide(entry))
        .filter_map(|entry| entry.id())
        .collect()
}

#[async_std::test]
async fn entry_filters_select_permitted_entries() -> anyhow::Result<()> {
    let backend = create_seeded_sqlite_backend().await?;
    create_blog_table(&backend).await?;
    create_blog_entry_table(&backend).await?;
    let engine = Engine::new(world::catalog());
    let snapshot = load_snapshot(&backend).await?;
    let refs = [
        PrivilegeRef::on("post", "blog"),
        PrivilegeRef::on("edit", "blog"),
        PrivilegeRef::on("kill_post", "blog"),
        PrivilegeRef::new("update"),
    ];

    for user in load_users(&backend).await? {
        let name = user.name.clone();
        let who = snapshot.principal(user);
        for privilege in refs.iter() {
            let predicate = engine.compile_ref_filter(&who, privilege, "BlogEntry");
            assert_eq!(
                backend.select_ids_where("blog_entry", &predicate).await?,
                entry_ids(|entry| engine.permits_ref(&who, privilege, entry)),
                "{name} {privilege:?}",
            );
        }

        // entries off any blog need no dissociation
        let destroy = engine.where_permits_action(&who, Action::Destroy, "BlogEntry");
        let selected = backend.select_ids_where("blog_entry", &destroy).await?;
        assert!(selected.contains(&world::ORPHAN_ENTRY));
        assert_eq!(
            selected,
            entry_ids(|entry| engine.permits_action(&who, Action::Destroy, entry)),
            "{name} destroy",
        );

        let update = engine.where_permits_update_attr(&who, "BlogEntry", "body");
        let selected = backend.select_ids_where("blog_entry", &update).await?;
        assert!(!selected.contains(&world::ORPHAN_ENTRY));
        assert_eq!(
            selected,
            entry_ids(|entry| engine.permits_update_attr(&who, entry, "body")),
            "{name} body",
        );
    }

    // ricky kills posts on his own blog only
    let ricky = snapshot.principal(backend.get_user_by_id(world::RICKY).await?
        .ok_or_else(|| anyhow::anyhow!("ricky not stored"))?);
    let destroy = engine.where_permits_action(&ricky, Action::Destroy, "BlogEntry");
    assert_eq!(
        backend.select_ids_where("blog_entry", &destroy).await?,
        [4, 5, 6, world::ORPHAN_ENTRY],
    );
    Ok(())
}

#[async_std::test]
async fn choices_select_from_tables() -> anyhow::Result<()> {
    let backend = create_seeded_sqlite_backend().await?;
    create_blog_table(&backend).await?;
    let engine = Engine::new(world::catalog());
    let snapshot = load_snapshot(&backend).await?;
    let users = load_users(&backend).await?;
    let principal = |id: i64| users.iter()
        .find(|user| user.id == id)
        .cloned()
        .map(|user| snapshot.principal(user))
        .ok_or_else(|| anyhow::anyhow!("user {id} not stored"));

    let fred = principal(world::FRED)?;
    let choices = engine.associate_choices(&fred, &Record::new("BlogEntry"), "blog")
        .ok_or_else(|| anyhow::anyhow!("blog is not an association"))?;
    assert_eq!(backend.select_ids(&choices).await?, [world::MERTZ_BLOG]);
    let stuck = world::entry(Some(4), world::RICARDO_BLOG, world::RICKY);
    let choices = engine.associate_choices(&fred, &stuck, "blog")
        .ok_or_else(|| anyhow::anyhow!("blog is not an association"))?;
    assert!(backend.select_ids(&choices).await?.is_empty());

    for user in users.iter() {
        let who = principal(user.id)?;
        let expected = world::blogs()
            .into_iter()
            .filter(|blog| who.grants()
                .iter()
                .any(|grant| engine.compile_grant_target_filter(grant, "Blog").predicate.evaluate(blog)))
            .filter_map(|blog| blog.id)
            .collect::<Vec<_>>();
        assert_eq!(
            backend.select_ids(&engine.grant_target_choices(&who, "Blog")).await?,
            expected,
            "{}",
            user.name,
        );
    }
    assert_eq!(
        backend.select_ids(&engine.grant_target_choices(&fred, "Blog")).await?,
        [world::MERTZ_BLOG],
    );
    assert_eq!(
        backend.select_ids(&engine.grant_target_choices(&principal(world::UNIVERSAL_GRANT_GUY)?, "Blog")).await?,
        [world::MERTZ_BLOG, world::RICARDO_BLOG, world::LUCY_BLOG],
    );
    Ok(())
}
