use wardencore::platform::AccessPlatform;
use wardendb_sqlite::SqliteBackend;

use crate::world;

pub async fn create_sqlite_backend() -> anyhow::Result<SqliteBackend> {
    Ok(SqliteBackend::access("sqlite::memory:").await?)
}

/// Stores the whole world through the platform.  Rows are inserted in the
/// order the world lists them so the assigned ids match its constants.
pub async fn seed(platform: &dyn AccessPlatform) -> anyhow::Result<()> {
    for user in world::users() {
        let id = platform.add_user(&user.name, user.firm_id).await?;
        anyhow::ensure!(id == user.id, "user {} stored as {id}", user.name);
    }
    // parents are listed before their children
    for role in world::roles() {
        let id = platform.add_role(&role.name, role.parent_role_id, role.owner_firm_id).await?;
        anyhow::ensure!(id == role.id, "role {} stored as {id}", role.name);
    }
    for assignment in world::assignments() {
        let id = platform.add_role_assignment(
            assignment.user_id,
            assignment.role_id,
            assignment.invalid_after,
        ).await?;
        anyhow::ensure!(id == assignment.id, "assignment {} stored as {id}", assignment.id);
    }
    for (i, permission) in world::permissions().into_iter().enumerate() {
        let id = platform.add_permission(&permission).await?;
        anyhow::ensure!(id == i as i64 + 1, "permission {} stored as {id}", i + 1);
    }
    Ok(())
}

pub async fn create_seeded_sqlite_backend() -> anyhow::Result<SqliteBackend> {
    let backend = create_sqlite_backend().await?;
    seed(&backend).await?;
    Ok(backend)
}

/// Adds the blog table holding the world's blogs.
pub async fn create_blog_table(backend: &SqliteBackend) -> anyhow::Result<()> {
    sqlx::query(
        r#"
CREATE TABLE blog (
    id INTEGER PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    owner_firm_id INTEGER NOT NULL,
    owner_id INTEGER NOT NULL
)
        "#,
    )
    .execute(backend.pool())
    .await?;
    for blog in world::blogs() {
        sqlx::query("INSERT INTO blog (id, name, owner_firm_id, owner_id) VALUES (?1, ?2, ?3, ?4)")
            .bind(blog.id)
            .bind(blog.name.clone())
            .bind(blog.attributes.get("owner_firm_id").and_then(|v| v.as_integer()))
            .bind(blog.attributes.get("owner_id").and_then(|v| v.as_integer()))
            .execute(backend.pool())
            .await?;
    }
    Ok(())
}

/// Adds the blog_entry table holding the world's entries.
pub async fn create_blog_entry_table(backend: &SqliteBackend) -> anyhow::Result<()> {
    sqlx::query(
        r#"
CREATE TABLE blog_entry (
    id INTEGER PRIMARY KEY NOT NULL,
    blog_id INTEGER REFERENCES blog(id),
    entry_owner_id INTEGER NOT NULL
)
        "#,
    )
    .execute(backend.pool())
    .await?;
    for entry in world::entries() {
        sqlx::query("INSERT INTO blog_entry (id, blog_id, entry_owner_id) VALUES (?1, ?2, ?3)")
            .bind(entry.id)
            .bind(entry.attributes.get("blog_id").and_then(|v| v.as_integer()))
            .bind(entry.attributes.get("entry_owner_id").and_then(|v| v.as_integer()))
            .execute(backend.pool())
            .await?;
    }
    Ok(())
}
