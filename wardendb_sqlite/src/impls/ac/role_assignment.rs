use async_trait::async_trait;
use sqlx::{sqlite::SqliteRow, Row};
use wardencore::{
    ac::{
        traits::RoleAssignmentBackend,
        RoleAssignment,
    },
    error::BackendError,
};

use crate::{
    impls::placeholders,
    SqliteBackend,
};

fn to_role_assignment(row: SqliteRow) -> Result<RoleAssignment, sqlx::Error> {
    Ok(RoleAssignment {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        role_id: row.try_get("role_id")?,
        invalid_after: row.try_get("invalid_after")?,
    })
}

async fn add_role_assignment_sqlite(
    backend: &SqliteBackend,
    user_id: i64,
    role_id: i64,
    invalid_after: Option<i64>,
) -> Result<i64, BackendError> {
    let id = sqlx::query(
        r#"
INSERT INTO role_assignment (
    user_id,
    role_id,
    invalid_after
)
VALUES ( ?1, ?2, ?3 )
        "#,
    )
    .bind(user_id)
    .bind(role_id)
    .bind(invalid_after)
    .execute(&*backend.pool)
    .await?
    .last_insert_rowid();
    Ok(id)
}

async fn get_role_assignment_sqlite(
    backend: &SqliteBackend,
    id: i64,
) -> Result<Option<RoleAssignment>, BackendError> {
    let rec = sqlx::query(
        r#"
SELECT
    id,
    user_id,
    role_id,
    invalid_after
FROM
    role_assignment
WHERE
    id = ?1
        "#,
    )
    .bind(id)
    .try_map(to_role_assignment)
    .fetch_optional(&*backend.pool)
    .await?;
    Ok(rec)
}

async fn set_role_assignment_invalid_after_sqlite(
    backend: &SqliteBackend,
    id: i64,
    invalid_after: Option<i64>,
) -> Result<bool, BackendError> {
    let rows_affected = sqlx::query(
        r#"
UPDATE role_assignment
SET
    invalid_after = ?2
WHERE
    id = ?1
        "#,
    )
    .bind(id)
    .bind(invalid_after)
    .execute(&*backend.pool)
    .await?
    .rows_affected();
    Ok(rows_affected > 0)
}

async fn remove_role_assignment_sqlite(
    backend: &SqliteBackend,
    id: i64,
) -> Result<bool, BackendError> {
    let rows_affected = sqlx::query(
        r#"
DELETE FROM
    role_assignment
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

async fn list_role_assignments_for_user_sqlite(
    backend: &SqliteBackend,
    user_id: i64,
) -> Result<Vec<RoleAssignment>, BackendError> {
    let recs = sqlx::query(
        r#"
SELECT
    id,
    user_id,
    role_id,
    invalid_after
FROM
    role_assignment
WHERE
    user_id = ?1
ORDER BY
    id
        "#,
    )
    .bind(user_id)
    .try_map(to_role_assignment)
    .fetch_all(&*backend.pool)
    .await?;
    Ok(recs)
}

async fn list_role_assignments_for_roles_sqlite(
    backend: &SqliteBackend,
    role_ids: &[i64],
) -> Result<Vec<RoleAssignment>, BackendError> {
    if role_ids.is_empty() {
        return Ok(Vec::new());
    }
    let sql = format!(
        r#"
SELECT
    id,
    user_id,
    role_id,
    invalid_after
FROM
    role_assignment
WHERE
    role_id IN ({})
ORDER BY
    id
        "#,
        placeholders(role_ids.len()),
    );
    let recs = role_ids.iter()
        .fold(sqlx::query(&sql), |query, id| query.bind(*id))
        .try_map(to_role_assignment)
        .fetch_all(&*backend.pool)
        .await?;
    Ok(recs)
}

#[async_trait]
impl RoleAssignmentBackend for SqliteBackend {
    async fn add_role_assignment(
        &self,
        user_id: i64,
        role_id: i64,
        invalid_after: Option<i64>,
    ) -> Result<i64, BackendError> {
        add_role_assignment_sqlite(&self, user_id, role_id, invalid_after).await
    }

    async fn get_role_assignment(
        &self,
        id: i64,
    ) -> Result<Option<RoleAssignment>, BackendError> {
        get_role_assignment_sqlite(&self, id).await
    }

    async fn set_role_assignment_invalid_after(
        &self,
        id: i64,
        invalid_after: Option<i64>,
    ) -> Result<bool, BackendError> {
        set_role_assignment_invalid_after_sqlite(&self, id, invalid_after).await
    }

    async fn remove_role_assignment(
        &self,
        id: i64,
    ) -> Result<bool, BackendError> {
        remove_role_assignment_sqlite(&self, id).await
    }

    async fn list_role_assignments_for_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<RoleAssignment>, BackendError> {
        list_role_assignments_for_user_sqlite(&self, user_id).await
    }

    async fn list_role_assignments_for_roles(
        &self,
        role_ids: &[i64],
    ) -> Result<Vec<RoleAssignment>, BackendError> {
        list_role_assignments_for_roles_sqlite(&self, role_ids).await
    }
}

#[cfg(test)]
mod testing {
    use wardencore::ac::traits::{
        RoleAssignmentBackend,
        RoleBackend,
        UserBackend,
    };
    use crate::SqliteBackend;

    #[async_std::test]
    async fn test_basic() -> anyhow::Result<()> {
        let backend = SqliteBackend::access("sqlite::memory:").await?;
        let fred = backend.add_user("fred", None).await?;
        let ethel = backend.add_user("ethel", None).await?;
        let poster = backend.add_role("poster", None, None).await?;
        let editor = backend.add_role("editor", None, None).await?;

        let a1 = backend.add_role_assignment(fred, poster, None).await?;
        let a2 = backend.add_role_assignment(ethel, poster, Some(1234567890)).await?;
        let a3 = backend.add_role_assignment(ethel, editor, None).await?;

        let assignment = backend.get_role_assignment(a2).await?
            .expect("assignment is missing?");
        assert_eq!(assignment.invalid_after, Some(1234567890));
        assert!(backend.set_role_assignment_invalid_after(a2, None).await?);
        assert_eq!(backend.get_role_assignment(a2).await?.and_then(|a| a.invalid_after), None);

        let for_ethel = backend.list_role_assignments_for_user(ethel).await?;
        assert_eq!(for_ethel.iter().map(|a| a.id).collect::<Vec<_>>(), [a2, a3]);
        let for_poster = backend.list_role_assignments_for_roles(&[poster]).await?;
        assert_eq!(for_poster.iter().map(|a| a.id).collect::<Vec<_>>(), [a1, a2]);
        assert!(backend.list_role_assignments_for_roles(&[]).await?.is_empty());

        assert!(backend.remove_role_assignment(a1).await?);
        assert!(!backend.remove_role_assignment(a1).await?);
        assert!(backend.list_role_assignments_for_user(fred).await?.is_empty());

        // assignments must reference existing users and roles
        assert!(backend.add_role_assignment(99, poster, None).await.is_err());
        Ok(())
    }
}
