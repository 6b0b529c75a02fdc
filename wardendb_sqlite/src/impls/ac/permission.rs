use async_trait::async_trait;
use sqlx::{sqlite::SqliteRow, Row};
use std::str::FromStr;
use wardencore::{
    ac::{
        traits::PermissionBackend,
        Permission,
        Privilege,
        ResourceClass,
    },
    error::BackendError,
};

use crate::{
    impls::placeholders,
    SqliteBackend,
};

fn to_permission(row: SqliteRow) -> Result<Permission, sqlx::Error> {
    let privilege: String = row.try_get("privilege")?;
    let class_name: String = row.try_get("class_name")?;
    let targets: String = row.try_get("targets")?;
    Ok(Permission {
        id: row.try_get("id")?,
        role_id: row.try_get("role_id")?,
        privilege: Privilege::from_str(&privilege)
            .map_err(|e| sqlx::Error::Decode(e.into()))?,
        class_name: ResourceClass::from_str(&class_name)
            .map_err(|e| sqlx::Error::Decode(e.into()))?,
        is_grant: row.try_get("is_grant")?,
        has_grant_option: row.try_get("has_grant_option")?,
        target_owned_by_self: row.try_get("target_owned_by_self")?,
        targets: serde_json::from_str(&targets)
            .map_err(|e| sqlx::Error::Decode(e.into()))?,
    })
}

const SELECT_PERMISSION: &str = r#"
SELECT
    id,
    role_id,
    privilege,
    class_name,
    is_grant,
    has_grant_option,
    target_owned_by_self,
    targets
FROM
    permission
"#;

async fn add_permission_sqlite(
    backend: &SqliteBackend,
    permission: &Permission,
) -> Result<i64, BackendError> {
    let targets = serde_json::to_string(&permission.targets)?;
    let id = sqlx::query(
        r#"
INSERT INTO permission (
    role_id,
    privilege,
    class_name,
    is_grant,
    has_grant_option,
    target_owned_by_self,
    targets
)
VALUES ( ?1, ?2, ?3, ?4, ?5, ?6, ?7 )
        "#,
    )
    .bind(permission.role_id)
    .bind(permission.privilege.as_str())
    .bind(permission.class_name.as_str())
    .bind(permission.is_grant)
    .bind(permission.has_grant_option)
    .bind(permission.target_owned_by_self)
    .bind(targets)
    .execute(&*backend.pool)
    .await?
    .last_insert_rowid();
    Ok(id)
}

async fn get_permission_sqlite(
    backend: &SqliteBackend,
    id: i64,
) -> Result<Option<Permission>, BackendError> {
    let sql = format!("{SELECT_PERMISSION} WHERE id = ?1");
    let rec = sqlx::query(&sql)
        .bind(id)
        .try_map(to_permission)
        .fetch_optional(&*backend.pool)
        .await?;
    Ok(rec)
}

async fn update_permission_sqlite(
    backend: &SqliteBackend,
    permission: &Permission,
) -> Result<bool, BackendError> {
    let id = permission.id.ok_or_else(|| BackendError::AppInvariantViolation(
        "cannot update a permission without an id".to_string()
    ))?;
    let targets = serde_json::to_string(&permission.targets)?;
    let rows_affected = sqlx::query(
        r#"
UPDATE permission
SET
    role_id = ?2,
    privilege = ?3,
    class_name = ?4,
    is_grant = ?5,
    has_grant_option = ?6,
    target_owned_by_self = ?7,
    targets = ?8
WHERE
    id = ?1
        "#,
    )
    .bind(id)
    .bind(permission.role_id)
    .bind(permission.privilege.as_str())
    .bind(permission.class_name.as_str())
    .bind(permission.is_grant)
    .bind(permission.has_grant_option)
    .bind(permission.target_owned_by_self)
    .bind(targets)
    .execute(&*backend.pool)
    .await?
    .rows_affected();
    Ok(rows_affected > 0)
}

async fn remove_permission_sqlite(
    backend: &SqliteBackend,
    id: i64,
) -> Result<bool, BackendError> {
    let rows_affected = sqlx::query(
        r#"
DELETE FROM
    permission
WHERE
    id = ?1
        "#,
    )
    .bind(id)
    .execute(&*backend.pool)
    .await?
    .rows_affected();
    Ok(rows_affected > 0)
}

async fn list_permissions_for_roles_sqlite(
    backend: &SqliteBackend,
    role_ids: &[i64],
) -> Result<Vec<Permission>, BackendError> {
    if role_ids.is_empty() {
        return Ok(Vec::new());
    }
    let sql = format!(
        "{SELECT_PERMISSION} WHERE role_id IN ({}) ORDER BY id",
        placeholders(role_ids.len()),
    );
    let recs = role_ids.iter()
        .fold(sqlx::query(&sql), |query, id| query.bind(*id))
        .try_map(to_permission)
        .fetch_all(&*backend.pool)
        .await?;
    Ok(recs)
}

async fn list_permissions_for_class_sqlite(
    backend: &SqliteBackend,
    class_name: &ResourceClass,
) -> Result<Vec<Permission>, BackendError> {
    let sql = format!("{SELECT_PERMISSION} WHERE class_name = ?1 OR class_name = ?2 ORDER BY id");
    let recs = sqlx::query(&sql)
        .bind(class_name.as_str())
        .bind(ResourceClass::Any.as_str())
        .try_map(to_permission)
        .fetch_all(&*backend.pool)
        .await?;
    Ok(recs)
}

#[async_trait]
impl PermissionBackend for SqliteBackend {
    async fn add_permission(
        &self,
        permission: &Permission,
    ) -> Result<i64, BackendError> {
        add_permission_sqlite(&self, permission).await
    }

    async fn get_permission(
        &self,
        id: i64,
    ) -> Result<Option<Permission>, BackendError> {
        get_permission_sqlite(&self, id).await
    }

    async fn update_permission(
        &self,
        permission: &Permission,
    ) -> Result<bool, BackendError> {
        update_permission_sqlite(&self, permission).await
    }

    async fn remove_permission(
        &self,
        id: i64,
    ) -> Result<bool, BackendError> {
        remove_permission_sqlite(&self, id).await
    }

    async fn list_permissions_for_roles(
        &self,
        role_ids: &[i64],
    ) -> Result<Vec<Permission>, BackendError> {
        list_permissions_for_roles_sqlite(&self, role_ids).await
    }

    async fn list_permissions_for_class(
        &self,
        class_name: &ResourceClass,
    ) -> Result<Vec<Permission>, BackendError> {
        list_permissions_for_class_sqlite(&self, class_name).await
    }
}
