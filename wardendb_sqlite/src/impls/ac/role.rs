use async_trait::async_trait;
use sqlx::{sqlite::SqliteRow, Row};
use wardencore::{
    ac::{
        traits::RoleBackend,
        Role,
    },
    error::BackendError,
};

use crate::SqliteBackend;

fn to_role(row: SqliteRow) -> Result<Role, sqlx::Error> {
    Ok(Role {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        parent_role_id: row.try_get("parent_role_id")?,
        owner_firm_id: row.try_get("owner_firm_id")?,
    })
}

async fn add_role_sqlite(
    backend: &SqliteBackend,
    name: &str,
    parent_role_id: Option<i64>,
    owner_firm_id: Option<i64>,
) -> Result<i64, BackendError> {
    let id = sqlx::query(
        r#"
INSERT INTO role (
    name,
    parent_role_id,
    owner_firm_id
)
VALUES ( ?1, ?2, ?3 )
        "#,
    )
    .bind(name)
    .bind(parent_role_id)
    .bind(owner_firm_id)
    .execute(&*backend.pool)
    .await?
    .last_insert_rowid();
    Ok(id)
}

async fn get_role_by_id_sqlite(
    backend: &SqliteBackend,
    id: i64,
) -> Result<Option<Role>, BackendError> {
    let rec = sqlx::query(
        r#"
SELECT
    id,
    name,
    parent_role_id,
    owner_firm_id
FROM
    role
WHERE
    id = ?1
        "#,
    )
    .bind(id)
    .try_map(to_role)
    .fetch_optional(&*backend.pool)
    .await?;
    Ok(rec)
}

async fn set_role_parent_sqlite(
    backend: &SqliteBackend,
    id: i64,
    parent_role_id: Option<i64>,
) -> Result<bool, BackendError> {
    let rows_affected = sqlx::query(
        r#"
UPDATE role
SET
    parent_role_id = ?2
WHERE
    id = ?1
        "#,
    )
    .bind(id)
    .bind(parent_role_id)
    .execute(&*backend.pool)
    .await?
    .rows_affected();
    Ok(rows_affected > 0)
}

async fn list_roles_sqlite(
    backend: &SqliteBackend,
) -> Result<Vec<Role>, BackendError> {
    let recs = sqlx::query(
        r#"
SELECT
    id,
    name,
    parent_role_id,
    owner_firm_id
FROM
    role
ORDER BY
    id
        "#,
    )
    .try_map(to_role)
    .fetch_all(&*backend.pool)
    .await?;
    Ok(recs)
}

#[async_trait]
impl RoleBackend for SqliteBackend {
    async fn add_role(
        &self,
        name: &str,
        parent_role_id: Option<i64>,
        owner_firm_id: Option<i64>,
    ) -> Result<i64, BackendError> {
        add_role_sqlite(&self, name, parent_role_id, owner_firm_id).await
    }

    async fn get_role_by_id(
        &self,
        id: i64,
    ) -> Result<Option<Role>, BackendError> {
        get_role_by_id_sqlite(&self, id).await
    }

    async fn set_role_parent(
        &self,
        id: i64,
        parent_role_id: Option<i64>,
    ) -> Result<bool, BackendError> {
        set_role_parent_sqlite(&self, id, parent_role_id).await
    }

    async fn list_roles(
        &self,
    ) -> Result<Vec<Role>, BackendError> {
        list_roles_sqlite(&self).await
    }
}
